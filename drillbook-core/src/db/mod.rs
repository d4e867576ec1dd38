//! Document store: SQLite-backed JSON collections

pub mod init;
pub mod store;

pub use init::init_database;
pub use store::{CurriculumStore, ReorderConsistency};
