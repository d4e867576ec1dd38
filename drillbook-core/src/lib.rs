//! # Drillbook Core Library
//!
//! Content model layer for the drum-curriculum admin editor:
//! - Canonical entities (Course, Lesson, CourseRudiment) and their
//!   schema-tolerant decode from persisted JSON documents
//! - Sticking pattern codec keyed by musical subdivision
//! - Composite rudiment references (global catalog or course-scoped)
//! - Manual ordering via adjacent-swap
//! - SQLite-backed document store

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod ordering;
pub mod pattern;
pub mod reference;
pub mod schema;

pub use error::{Error, Result};
pub use pattern::{PatternCell, Subdivision};
pub use reference::RudimentRef;
