//! Canonical curriculum entities
//!
//! The normalized, schema-version-independent in-memory shape of the
//! persisted documents. Raw documents only become these through
//! [`crate::schema`]; code past that boundary never sees legacy fields.

use crate::ordering::Orderable;
use crate::pattern::{PatternCell, Subdivision};
use crate::reference::RudimentRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub order: i64,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    /// Owning course; immutable after creation
    pub course_id: String,
    pub title: String,
    pub body: String,
    pub order: i64,
    pub rudiment_refs: Vec<RudimentRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_bpm: Option<i64>,
    pub updated_at: String,
}

/// Rudiment owned by (nested under) exactly one course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRudiment {
    pub id: String,
    pub name: String,
    /// Always exactly `subdivision.cell_count()` cells after normalization
    pub pattern: Vec<PatternCell>,
    pub subdivision: Subdivision,
    pub order: i64,
    pub updated_at: String,
}

impl Orderable for Course {
    fn doc_id(&self) -> &str {
        &self.id
    }
    fn order(&self) -> i64 {
        self.order
    }
    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

impl Orderable for Lesson {
    fn doc_id(&self) -> &str {
        &self.id
    }
    fn order(&self) -> i64 {
        self.order
    }
    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

impl Orderable for CourseRudiment {
    fn doc_id(&self) -> &str {
        &self.id
    }
    fn order(&self) -> i64 {
        self.order
    }
    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}
