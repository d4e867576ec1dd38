//! Sticking pattern codec
//!
//! A rudiment pattern is a fixed-length grid of cells, one per note of the
//! selected subdivision. The codec owns the subdivision → length mapping and
//! the normalization of raw stored arrays to exactly that length.

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Rhythmic grid a pattern is drawn on; determines pattern length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subdivision {
    /// Sixteenth notes: 32 cells (2 bars of 4/4)
    #[serde(rename = "sixteenth")]
    Sixteenth,

    /// Eighth-note triplets: 24 cells (2 bars of 4/4)
    #[serde(rename = "eighthTriplet")]
    EighthTriplet,
}

impl Subdivision {
    /// Fixed number of cells in a pattern drawn on this grid
    pub fn cell_count(self) -> usize {
        match self {
            Subdivision::Sixteenth => 32,
            Subdivision::EighthTriplet => 24,
        }
    }

    /// Wire literal stored in documents
    pub fn as_str(self) -> &'static str {
        match self {
            Subdivision::Sixteenth => "sixteenth",
            Subdivision::EighthTriplet => "eighthTriplet",
        }
    }

    /// Decode a raw document field.
    ///
    /// Anything other than the recognized `"eighthTriplet"` literal (wrong
    /// type, unknown string, missing field) decodes as `Sixteenth` so that
    /// documents written before subdivisions existed keep their implicit
    /// 32-cell grid.
    pub fn from_doc_value(raw: Option<&Value>) -> Self {
        match raw.and_then(Value::as_str) {
            Some("eighthTriplet") => Subdivision::EighthTriplet,
            _ => Subdivision::Sixteenth,
        }
    }
}

/// One cell of a sticking pattern: left hand, right hand, or rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternCell {
    Rest,
    Left,
    Right,
}

impl PatternCell {
    /// Wire literal stored in documents (`""` for a rest)
    pub fn as_str(self) -> &'static str {
        match self {
            PatternCell::Rest => "",
            PatternCell::Left => "L",
            PatternCell::Right => "R",
        }
    }

    /// Decode one raw cell value.
    ///
    /// Only the exact strings `"L"` and `"R"` map to hits; any other value
    /// (other strings, numbers, null, missing) is a rest. Total by design.
    pub fn from_doc_value(raw: &Value) -> Self {
        match raw.as_str() {
            Some("L") => PatternCell::Left,
            Some("R") => PatternCell::Right,
            _ => PatternCell::Rest,
        }
    }
}

impl Serialize for PatternCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PatternCell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct CellVisitor;

        impl<'de> Visitor<'de> for CellVisitor {
            type Value = PatternCell;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a pattern cell string (\"L\", \"R\", or rest)")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<PatternCell, E> {
                Ok(match v {
                    "L" => PatternCell::Left,
                    "R" => PatternCell::Right,
                    _ => PatternCell::Rest,
                })
            }
        }

        deserializer.deserialize_str(CellVisitor)
    }
}

/// Normalize a raw stored pattern to exactly `subdivision.cell_count()` cells.
///
/// Cells past the grid length are silently dropped (a deliberate lossy
/// policy: shrinking the subdivision shrinks the pattern); missing cells are
/// filled with rests. Total over any input array; never errors.
pub fn normalize_pattern(raw: &[Value], subdivision: Subdivision) -> Vec<PatternCell> {
    let len = subdivision.cell_count();
    (0..len)
        .map(|i| raw.get(i).map_or(PatternCell::Rest, PatternCell::from_doc_value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cells(raw: &Value) -> Vec<Value> {
        raw.as_array().cloned().unwrap()
    }

    #[test]
    fn cell_counts_are_fixed_per_subdivision() {
        assert_eq!(Subdivision::Sixteenth.cell_count(), 32);
        assert_eq!(Subdivision::EighthTriplet.cell_count(), 24);
    }

    #[test]
    fn normalize_always_returns_exact_length() {
        for raw_len in [0usize, 5, 24, 32, 40, 100] {
            let raw: Vec<Value> = vec![json!("L"); raw_len];
            assert_eq!(normalize_pattern(&raw, Subdivision::Sixteenth).len(), 32);
            assert_eq!(normalize_pattern(&raw, Subdivision::EighthTriplet).len(), 24);
        }
    }

    #[test]
    fn normalize_truncates_overlong_input() {
        // 40 raw cells on a 32-cell grid: first 32 kept, 33-40 dropped
        let raw: Vec<Value> = (0..40)
            .map(|i| json!(if i % 2 == 0 { "L" } else { "R" }))
            .collect();
        let out = normalize_pattern(&raw, Subdivision::Sixteenth);
        assert_eq!(out.len(), 32);
        for (i, cell) in out.iter().enumerate() {
            let want = if i % 2 == 0 { PatternCell::Left } else { PatternCell::Right };
            assert_eq!(*cell, want, "cell {}", i);
        }
    }

    #[test]
    fn normalize_pads_short_input_with_rests() {
        let raw = cells(&json!(["L", "R", "L", "x", "R"]));
        let out = normalize_pattern(&raw, Subdivision::EighthTriplet);
        assert_eq!(out.len(), 24);
        assert_eq!(
            &out[..5],
            &[
                PatternCell::Left,
                PatternCell::Right,
                PatternCell::Left,
                PatternCell::Rest, // "x" is neither "L" nor "R"
                PatternCell::Right,
            ]
        );
        assert!(out[5..].iter().all(|c| *c == PatternCell::Rest));
    }

    #[test]
    fn cell_match_is_exact_and_case_sensitive() {
        for v in [json!("l"), json!("r"), json!("LL"), json!(1), json!(null), json!(["L"])] {
            assert_eq!(PatternCell::from_doc_value(&v), PatternCell::Rest);
        }
        assert_eq!(PatternCell::from_doc_value(&json!("L")), PatternCell::Left);
        assert_eq!(PatternCell::from_doc_value(&json!("R")), PatternCell::Right);
    }

    #[test]
    fn subdivision_decode_defaults_to_sixteenth() {
        assert_eq!(Subdivision::from_doc_value(None), Subdivision::Sixteenth);
        assert_eq!(
            Subdivision::from_doc_value(Some(&json!("thirtysecond"))),
            Subdivision::Sixteenth
        );
        assert_eq!(Subdivision::from_doc_value(Some(&json!(24))), Subdivision::Sixteenth);
        assert_eq!(
            Subdivision::from_doc_value(Some(&json!("eighthTriplet"))),
            Subdivision::EighthTriplet
        );
    }

    #[test]
    fn pattern_cell_serde_round_trip() {
        let json = serde_json::to_string(&[PatternCell::Left, PatternCell::Rest, PatternCell::Right]).unwrap();
        assert_eq!(json, r#"["L","","R"]"#);
        let back: Vec<PatternCell> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![PatternCell::Left, PatternCell::Rest, PatternCell::Right]);
    }
}
