//! Common error types for Drillbook

use thiserror::Error;

/// Common result type for Drillbook operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core.
///
/// Decoding, reference parsing, and the pattern codec are total functions
/// and never produce these; only store I/O and configuration can fail.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),
}
