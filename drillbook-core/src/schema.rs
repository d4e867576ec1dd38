//! Schema-tolerant document decode and encode
//!
//! Persisted documents come in more than one historical shape (lessons with
//! a singular `rudimentId`, rudiments without a `subdivision`), and partial
//! writes can leave any field missing or mistyped. Every decode here is a
//! total function from an arbitrary raw JSON document to one canonical
//! entity; a future schema version is one additional decode branch in this
//! module, never shape-sniffing at call sites.
//!
//! The encode half builds raw write payloads from canonical or partial
//! entities. Two asymmetries are intentional and load-bearing:
//! - `rudimentIds` is always written, empty array included, so a
//!   merge-update can never resurrect the legacy scalar field on read
//!   (decode precedence keys on the field's *presence*).
//! - `suggestedBpm` is omitted, not nulled, when absent, so a merge-update
//!   preserves the stored value.

use crate::model::{Course, CourseRudiment, Lesson};
use crate::pattern::{self, PatternCell, Subdivision};
use crate::reference::RudimentRef;
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};

/// Current timestamp in the stored `updatedAt` format (ISO-8601 UTC)
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn string_field(data: &Value, key: &str) -> String {
    data.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// `order` defaults to 0 for anything that is not an integer-valued number.
/// Documents written by earlier tooling can carry `3.0` where `3` is meant;
/// a whole-valued float decodes to its integer.
fn order_field(data: &Value) -> i64 {
    let raw = data.get("order");
    if let Some(n) = raw.and_then(Value::as_i64) {
        return n;
    }
    raw.and_then(Value::as_f64)
        .filter(|f| f.fract() == 0.0)
        .map(|f| f as i64)
        .unwrap_or(0)
}

// ============================================================================
// Decode (read path)
// ============================================================================

/// Decode a raw course document. Total; never fails.
pub fn course_from_doc(id: &str, data: &Value) -> Course {
    Course {
        id: id.to_string(),
        title: string_field(data, "title"),
        description: string_field(data, "description"),
        order: order_field(data),
        updated_at: string_field(data, "updatedAt"),
    }
}

/// Decode a raw lesson document. Total; never fails.
///
/// Reference precedence: a `rudimentIds` array field wins whenever present,
/// even when empty; otherwise a non-null legacy `rudimentId` scalar becomes
/// a one-element list; otherwise no references. The legacy shape stays
/// readable indefinitely but is never written back.
pub fn lesson_from_doc(id: &str, data: &Value) -> Lesson {
    let rudiment_refs = if let Some(ids) = data.get("rudimentIds").and_then(Value::as_array) {
        ids.iter()
            .filter_map(Value::as_str)
            .map(RudimentRef::parse)
            .collect()
    } else if let Some(legacy) = data.get("rudimentId").and_then(Value::as_str) {
        vec![RudimentRef::parse(legacy)]
    } else {
        Vec::new()
    };

    Lesson {
        id: id.to_string(),
        course_id: string_field(data, "courseId"),
        title: string_field(data, "title"),
        body: string_field(data, "body"),
        order: order_field(data),
        rudiment_refs,
        suggested_bpm: data.get("suggestedBpm").and_then(Value::as_i64),
        updated_at: string_field(data, "updatedAt"),
    }
}

/// Decode a raw course-rudiment document. Total; never fails.
///
/// The pattern always comes out at exactly `subdivision.cell_count()` cells,
/// whatever length (or type) the stored array had.
pub fn rudiment_from_doc(id: &str, data: &Value) -> CourseRudiment {
    let subdivision = Subdivision::from_doc_value(data.get("subdivision"));
    let empty = Vec::new();
    let raw_pattern = data
        .get("pattern")
        .and_then(Value::as_array)
        .unwrap_or(&empty);

    CourseRudiment {
        id: id.to_string(),
        name: string_field(data, "name"),
        pattern: pattern::normalize_pattern(raw_pattern, subdivision),
        subdivision,
        order: order_field(data),
        updated_at: string_field(data, "updatedAt"),
    }
}

// ============================================================================
// Encode (write path)
// ============================================================================

/// Fields for a new course
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
}

/// Merge-update for a course; `None` preserves the stored value
#[derive(Debug, Clone, Default)]
pub struct CoursePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<i64>,
}

/// Fields for a new lesson
#[derive(Debug, Clone)]
pub struct NewLesson {
    pub course_id: String,
    pub title: String,
    pub body: String,
    pub rudiment_refs: Vec<RudimentRef>,
    pub suggested_bpm: Option<i64>,
}

/// Merge-update for a lesson.
///
/// `course_id` is absent on purpose: a lesson's owning course is immutable
/// after creation. `rudiment_refs` is not optional because updates always
/// rewrite the stored array; `suggested_bpm == None` leaves the stored
/// value untouched.
#[derive(Debug, Clone)]
pub struct LessonPatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub order: Option<i64>,
    pub rudiment_refs: Vec<RudimentRef>,
    pub suggested_bpm: Option<i64>,
}

/// Fields for a new course rudiment
#[derive(Debug, Clone)]
pub struct NewRudiment {
    pub name: String,
    pub pattern: Vec<PatternCell>,
    pub subdivision: Subdivision,
}

/// Merge-update for a course rudiment; `None` preserves the stored value.
///
/// `subdivision` and `pattern` travel together: the written pattern is
/// re-fitted to the written subdivision's length.
#[derive(Debug, Clone, Default)]
pub struct RudimentPatch {
    pub name: Option<String>,
    pub pattern: Option<Vec<PatternCell>>,
    pub subdivision: Option<Subdivision>,
    pub order: Option<i64>,
}

fn pattern_values(cells: &[PatternCell]) -> Vec<Value> {
    cells.iter().map(|c| json!(c.as_str())).collect()
}

/// Re-fit an in-memory pattern to the grid before it reaches storage, so a
/// wrong-length array can never be persisted.
fn fitted_pattern_value(cells: &[PatternCell], subdivision: Subdivision) -> Value {
    let normalized = pattern::normalize_pattern(&pattern_values(cells), subdivision);
    Value::Array(pattern_values(&normalized))
}

fn refs_value(refs: &[RudimentRef]) -> Value {
    Value::Array(refs.iter().map(|r| json!(r.to_string())).collect())
}

/// Build the raw document for a new course
pub fn course_create_doc(new: &NewCourse, order: i64, updated_at: &str) -> Value {
    json!({
        "title": new.title,
        "description": new.description,
        "order": order,
        "updatedAt": updated_at,
    })
}

/// Build the merge payload for a course update
pub fn course_update_doc(patch: &CoursePatch, updated_at: &str) -> Map<String, Value> {
    let mut doc = Map::new();
    if let Some(title) = &patch.title {
        doc.insert("title".to_string(), json!(title));
    }
    if let Some(description) = &patch.description {
        doc.insert("description".to_string(), json!(description));
    }
    if let Some(order) = patch.order {
        doc.insert("order".to_string(), json!(order));
    }
    doc.insert("updatedAt".to_string(), json!(updated_at));
    doc
}

/// Build the raw document for a new lesson
pub fn lesson_create_doc(new: &NewLesson, order: i64, updated_at: &str) -> Value {
    let mut doc = Map::new();
    doc.insert("courseId".to_string(), json!(new.course_id));
    doc.insert("title".to_string(), json!(new.title));
    doc.insert("body".to_string(), json!(new.body));
    doc.insert("order".to_string(), json!(order));
    doc.insert("rudimentIds".to_string(), refs_value(&new.rudiment_refs));
    if let Some(bpm) = new.suggested_bpm {
        doc.insert("suggestedBpm".to_string(), json!(bpm));
    }
    doc.insert("updatedAt".to_string(), json!(updated_at));
    Value::Object(doc)
}

/// Build the merge payload for a lesson update
pub fn lesson_update_doc(patch: &LessonPatch, updated_at: &str) -> Map<String, Value> {
    let mut doc = Map::new();
    if let Some(title) = &patch.title {
        doc.insert("title".to_string(), json!(title));
    }
    if let Some(body) = &patch.body {
        doc.insert("body".to_string(), json!(body));
    }
    if let Some(order) = patch.order {
        doc.insert("order".to_string(), json!(order));
    }
    // Always rewritten, empty included
    doc.insert("rudimentIds".to_string(), refs_value(&patch.rudiment_refs));
    if let Some(bpm) = patch.suggested_bpm {
        doc.insert("suggestedBpm".to_string(), json!(bpm));
    }
    doc.insert("updatedAt".to_string(), json!(updated_at));
    doc
}

/// Build the raw document for a new course rudiment
pub fn rudiment_create_doc(new: &NewRudiment, order: i64, updated_at: &str) -> Value {
    json!({
        "name": new.name,
        "pattern": fitted_pattern_value(&new.pattern, new.subdivision),
        "subdivision": new.subdivision.as_str(),
        "order": order,
        "updatedAt": updated_at,
    })
}

/// Build the merge payload for a rudiment update.
///
/// When the patch carries a pattern it is fitted against the patched
/// subdivision, or `current_subdivision` when the patch leaves the
/// subdivision alone.
pub fn rudiment_update_doc(
    patch: &RudimentPatch,
    current_subdivision: Subdivision,
    updated_at: &str,
) -> Map<String, Value> {
    let mut doc = Map::new();
    if let Some(name) = &patch.name {
        doc.insert("name".to_string(), json!(name));
    }
    let subdivision = patch.subdivision.unwrap_or(current_subdivision);
    if let Some(sub) = patch.subdivision {
        doc.insert("subdivision".to_string(), json!(sub.as_str()));
    }
    if let Some(cells) = &patch.pattern {
        doc.insert("pattern".to_string(), fitted_pattern_value(cells, subdivision));
    }
    if let Some(order) = patch.order {
        doc.insert("order".to_string(), json!(order));
    }
    doc.insert("updatedAt".to_string(), json!(updated_at));
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn course_decode_defaults_missing_fields() {
        let course = course_from_doc("c1", &json!({}));
        assert_eq!(course.id, "c1");
        assert_eq!(course.title, "");
        assert_eq!(course.description, "");
        assert_eq!(course.order, 0);
        assert_eq!(course.updated_at, "");
    }

    #[test]
    fn course_decode_defends_against_mistyped_fields() {
        let course = course_from_doc(
            "c1",
            &json!({ "title": 7, "description": null, "order": "3", "updatedAt": [] }),
        );
        assert_eq!(course.title, "");
        assert_eq!(course.order, 0);
        assert_eq!(course.updated_at, "");
    }

    #[test]
    fn order_accepts_integer_valued_floats() {
        assert_eq!(course_from_doc("c", &json!({ "order": 3.0 })).order, 3);
        assert_eq!(course_from_doc("c", &json!({ "order": 3.5 })).order, 0);
        assert_eq!(course_from_doc("c", &json!({ "order": -2.0 })).order, -2);
        assert_eq!(course_from_doc("c", &json!({ "order": "3" })).order, 0);
    }

    #[test]
    fn lesson_decode_prefers_array_refs() {
        let lesson = lesson_from_doc(
            "l1",
            &json!({
                "courseId": "c1",
                "rudimentIds": ["paradiddle-1", "course:c1:r1"],
                "rudimentId": "stale-legacy",
            }),
        );
        assert_eq!(
            lesson.rudiment_refs,
            vec![
                RudimentRef::Global("paradiddle-1".to_string()),
                RudimentRef::CourseScoped {
                    course_id: "c1".to_string(),
                    rudiment_id: "r1".to_string(),
                },
            ]
        );
    }

    #[test]
    fn lesson_decode_empty_array_shadows_legacy_scalar() {
        // Presence of the array field wins even when it is empty; this is
        // what keeps updates from resurrecting the legacy scalar.
        let lesson = lesson_from_doc(
            "l1",
            &json!({ "rudimentIds": [], "rudimentId": "paradiddle-1" }),
        );
        assert!(lesson.rudiment_refs.is_empty());
    }

    #[test]
    fn lesson_decode_falls_back_to_legacy_scalar() {
        let lesson = lesson_from_doc("l1", &json!({ "rudimentId": "paradiddle-1" }));
        assert_eq!(
            lesson.rudiment_refs,
            vec![RudimentRef::Global("paradiddle-1".to_string())]
        );

        let lesson = lesson_from_doc("l1", &json!({ "rudimentId": null }));
        assert!(lesson.rudiment_refs.is_empty());

        let lesson = lesson_from_doc("l1", &json!({}));
        assert!(lesson.rudiment_refs.is_empty());
    }

    #[test]
    fn lesson_decode_bpm_is_optional_integer() {
        assert_eq!(
            lesson_from_doc("l", &json!({ "suggestedBpm": 80 })).suggested_bpm,
            Some(80)
        );
        assert_eq!(lesson_from_doc("l", &json!({ "suggestedBpm": "80" })).suggested_bpm, None);
        assert_eq!(lesson_from_doc("l", &json!({})).suggested_bpm, None);
    }

    #[test]
    fn rudiment_decode_normalizes_pattern_to_grid() {
        let rudiment = rudiment_from_doc(
            "r1",
            &json!({ "name": "Singles", "pattern": ["L", "R"], "subdivision": "eighthTriplet" }),
        );
        assert_eq!(rudiment.subdivision, Subdivision::EighthTriplet);
        assert_eq!(rudiment.pattern.len(), 24);
        assert_eq!(rudiment.pattern[0], PatternCell::Left);
        assert_eq!(rudiment.pattern[1], PatternCell::Right);
        assert_eq!(rudiment.pattern[2], PatternCell::Rest);
    }

    #[test]
    fn rudiment_decode_missing_subdivision_means_sixteenth() {
        let rudiment = rudiment_from_doc("r1", &json!({ "pattern": ["L"] }));
        assert_eq!(rudiment.subdivision, Subdivision::Sixteenth);
        assert_eq!(rudiment.pattern.len(), 32);
    }

    #[test]
    fn lesson_update_always_writes_refs_and_omits_absent_bpm() {
        let patch = LessonPatch {
            title: Some("Title".to_string()),
            body: None,
            order: None,
            rudiment_refs: Vec::new(),
            suggested_bpm: None,
        };
        let doc = lesson_update_doc(&patch, "2026-01-01T00:00:00.000Z");
        assert_eq!(doc.get("rudimentIds"), Some(&json!([])));
        assert!(!doc.contains_key("suggestedBpm"));
        assert!(!doc.contains_key("body"));
        assert!(!doc.contains_key("courseId"));
        assert_eq!(doc.get("updatedAt"), Some(&json!("2026-01-01T00:00:00.000Z")));
    }

    #[test]
    fn lesson_create_serializes_refs_as_strings() {
        let new = NewLesson {
            course_id: "c1".to_string(),
            title: "t".to_string(),
            body: "b".to_string(),
            rudiment_refs: vec![RudimentRef::CourseScoped {
                course_id: "c2".to_string(),
                rudiment_id: "r9".to_string(),
            }],
            suggested_bpm: Some(80),
        };
        let doc = lesson_create_doc(&new, 3, "now");
        assert_eq!(doc["rudimentIds"], json!(["course:c2:r9"]));
        assert_eq!(doc["suggestedBpm"], json!(80));
        assert_eq!(doc["order"], json!(3));
    }

    #[test]
    fn rudiment_write_refits_wrong_length_pattern() {
        // In-memory pattern of the wrong length must never reach storage
        let new = NewRudiment {
            name: "Singles".to_string(),
            pattern: vec![PatternCell::Left; 40],
            subdivision: Subdivision::Sixteenth,
        };
        let doc = rudiment_create_doc(&new, 0, "now");
        assert_eq!(doc["pattern"].as_array().unwrap().len(), 32);

        let patch = RudimentPatch {
            pattern: Some(vec![PatternCell::Right; 2]),
            subdivision: Some(Subdivision::EighthTriplet),
            ..Default::default()
        };
        let doc = rudiment_update_doc(&patch, Subdivision::Sixteenth, "now");
        let cells = doc["pattern"].as_array().unwrap();
        assert_eq!(cells.len(), 24);
        assert_eq!(cells[0], json!("R"));
        assert_eq!(cells[2], json!(""));
    }
}
