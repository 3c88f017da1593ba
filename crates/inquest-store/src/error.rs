use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A query expected exactly one row but found none.
    #[error("Record not found")]
    NotFound,

    /// A uniqueness constraint rejected the write.
    #[error("Duplicate {0}")]
    Duplicate(String),

    /// A transactional guard found the row changed under us.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// Payload (de)serialization error.
    #[error("Payload error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Classify an insert failure: uniqueness violations become
    /// [`StoreError::Duplicate`] so callers can surface a conflict instead
    /// of a generic database error.
    pub(crate) fn on_insert(err: rusqlite::Error, what: &str) -> StoreError {
        if let rusqlite::Error::SqliteFailure(e, _) = &err {
            if e.code == rusqlite::ErrorCode::ConstraintViolation {
                return StoreError::Duplicate(what.to_string());
            }
        }
        StoreError::Sqlite(err)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
