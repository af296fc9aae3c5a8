//! Error kinds shared across the engine
//!
//! Every operation returns `Result<T, EngineError>`; the variants map onto
//! the four failure classes callers are expected to distinguish:
//! missing entities, wrong entity shapes, lost concurrent races, and
//! malformed caller input. Store backends fold their own failures into
//! `Store`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Entity lookup failed: language code, project id, sentence id, book
    /// code, or a phrase that could not be located in its source sentence.
    #[error("not available: {0}")]
    NotAvailable(String),

    /// Wrong entity shape: non-Bible table used for Bible operations,
    /// unsupported export format, sentence id outside the Bible range.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// A concurrent draft write won the race; the caller should reload
    /// and retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Caller-supplied data was invalid: bad offsets, rows with the wrong
    /// arity, token not present in its own context window.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Backend-specific store failure.
    #[error("store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(feature = "database")]
impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => EngineError::NotAvailable("row not found".into()),
            other => EngineError::Store(other.to_string()),
        }
    }
}
