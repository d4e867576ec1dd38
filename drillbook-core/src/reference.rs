//! Rudiment references
//!
//! A lesson points at a rudiment through a single stored string that is
//! either a global catalog ID (`"paradiddle-1"`) or a course-scoped
//! composite (`"course:<courseId>:<rudimentId>"`). The raw string never
//! travels past this module: it is parsed into [`RudimentRef`] immediately
//! on read and only serialized back at the write boundary.

use crate::db::store::CurriculumStore;
use crate::model::CourseRudiment;
use crate::Result;
use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference from a lesson to a rudiment.
///
/// A pure value type: a stable pointer-by-identifier, not a denormalized
/// copy. Resolution happens at read time and may find nothing (the target
/// was deleted); a dangling reference is a normal state, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RudimentRef {
    /// Entry in the fixed global catalog, addressed by catalog ID
    Global(String),

    /// Rudiment nested under a course. The course need not be the one that
    /// owns the referencing lesson; cross-course references are legal.
    CourseScoped {
        course_id: String,
        rudiment_id: String,
    },
}

impl RudimentRef {
    /// Parse a stored reference string.
    ///
    /// Exactly three `:`-separated segments with first segment the literal
    /// `course` and both remaining segments non-empty parse as
    /// [`RudimentRef::CourseScoped`]; every other string is an opaque
    /// [`RudimentRef::Global`] catalog key (no existence check here).
    ///
    /// Total; never fails. Known collision: a *catalog* ID that itself looks
    /// like `course:<x>:<y>` would parse as course-scoped. Catalog IDs must
    /// avoid the `course:` prefix by convention.
    pub fn parse(raw: &str) -> Self {
        let mut parts = raw.split(':');
        if let (Some("course"), Some(course_id), Some(rudiment_id), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        {
            if !course_id.is_empty() && !rudiment_id.is_empty() {
                return RudimentRef::CourseScoped {
                    course_id: course_id.to_string(),
                    rudiment_id: rudiment_id.to_string(),
                };
            }
        }
        RudimentRef::Global(raw.to_string())
    }
}

impl fmt::Display for RudimentRef {
    /// Inverse of [`RudimentRef::parse`]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RudimentRef::Global(id) => f.write_str(id),
            RudimentRef::CourseScoped { course_id, rudiment_id } => {
                write!(f, "course:{}:{}", course_id, rudiment_id)
            }
        }
    }
}

impl Serialize for RudimentRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RudimentRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RefVisitor;

        impl<'de> Visitor<'de> for RefVisitor {
            type Value = RudimentRef;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a rudiment reference string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<RudimentRef, E> {
                Ok(RudimentRef::parse(v))
            }
        }

        deserializer.deserialize_str(RefVisitor)
    }
}

/// One entry of the global rudiment catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub label: String,
}

/// Fixed global rudiment catalog: catalog ID → display label.
///
/// Passed into the resolver at construction (tests substitute their own)
/// rather than living as a process-wide constant.
#[derive(Debug, Clone, Default)]
pub struct RudimentCatalog {
    entries: Vec<CatalogEntry>,
}

impl RudimentCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Compiled-in catalog used when configuration supplies none
    pub fn compiled_default() -> Self {
        Self::new(vec![CatalogEntry {
            id: "paradiddle-1".to_string(),
            label: "Paradiddle".to_string(),
        }])
    }

    pub fn label_for(&self, id: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.label.as_str())
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }
}

/// Displayable data a reference resolves to
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ResolvedRudiment {
    /// Global catalog hit: ID plus display label
    #[serde(rename_all = "camelCase")]
    Catalog { id: String, label: String },

    /// Course-scoped hit: the full rudiment document
    #[serde(rename_all = "camelCase")]
    CourseScoped {
        course_id: String,
        rudiment: CourseRudiment,
    },
}

/// Resolves [`RudimentRef`] values against a catalog and the document store.
#[derive(Debug, Clone)]
pub struct ReferenceResolver {
    catalog: RudimentCatalog,
}

impl ReferenceResolver {
    pub fn new(catalog: RudimentCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &RudimentCatalog {
        &self.catalog
    }

    /// Resolve a reference to displayable data.
    ///
    /// `Global` refs are looked up in the catalog; `CourseScoped` refs cost
    /// one point read against the course-rudiment sub-scope. A missing
    /// target yields `Ok(None)` — resolution never fails a containing read
    /// because of a dangling reference. Only store I/O can error.
    pub async fn resolve(
        &self,
        store: &CurriculumStore,
        reference: &RudimentRef,
    ) -> Result<Option<ResolvedRudiment>> {
        match reference {
            RudimentRef::Global(id) => Ok(self.catalog.label_for(id).map(|label| {
                ResolvedRudiment::Catalog {
                    id: id.clone(),
                    label: label.to_string(),
                }
            })),
            RudimentRef::CourseScoped { course_id, rudiment_id } => {
                let rudiment = store.get_rudiment(course_id, rudiment_id).await?;
                Ok(rudiment.map(|r| ResolvedRudiment::CourseScoped {
                    course_id: course_id.clone(),
                    rudiment: r,
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_course_scoped_composite() {
        assert_eq!(
            RudimentRef::parse("course:abc123:rud9"),
            RudimentRef::CourseScoped {
                course_id: "abc123".to_string(),
                rudiment_id: "rud9".to_string(),
            }
        );
    }

    #[test]
    fn parses_anything_else_as_global() {
        assert_eq!(
            RudimentRef::parse("paradiddle-1"),
            RudimentRef::Global("paradiddle-1".to_string())
        );
        // Wrong segment count or empty segments fall back to global
        for raw in ["course:only-two", "course:a:b:c", "course::r", "course:c:", "Course:a:b"] {
            assert_eq!(RudimentRef::parse(raw), RudimentRef::Global(raw.to_string()));
        }
    }

    #[test]
    fn serialize_parse_round_trip() {
        let refs = [
            RudimentRef::Global("paradiddle-1".to_string()),
            RudimentRef::Global("flam-tap".to_string()),
            RudimentRef::CourseScoped {
                course_id: "c1".to_string(),
                rudiment_id: "r1".to_string(),
            },
        ];
        for r in refs {
            assert_eq!(RudimentRef::parse(&r.to_string()), r);
        }
    }

    #[test]
    fn course_prefix_collision_stays_ambiguous() {
        // A catalog ID shaped like a composite misparses by design; catalog
        // IDs avoid the "course:" prefix by convention. Pin the behavior.
        assert_eq!(
            RudimentRef::parse("course:fake:catalog-id"),
            RudimentRef::CourseScoped {
                course_id: "fake".to_string(),
                rudiment_id: "catalog-id".to_string(),
            }
        );
    }

    #[test]
    fn serde_uses_the_wire_string() {
        let r = RudimentRef::CourseScoped {
            course_id: "c1".to_string(),
            rudiment_id: "r1".to_string(),
        };
        assert_eq!(serde_json::to_string(&r).unwrap(), r#""course:c1:r1""#);
        let back: RudimentRef = serde_json::from_str(r#""course:c1:r1""#).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn catalog_lookup() {
        let catalog = RudimentCatalog::compiled_default();
        assert_eq!(catalog.label_for("paradiddle-1"), Some("Paradiddle"));
        assert_eq!(catalog.label_for("unknown"), None);
    }
}
