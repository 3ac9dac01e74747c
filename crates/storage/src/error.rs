//! Storage error type.

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error (catalog seed file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A row holds a value the schema should never contain
    #[error("corrupt row: {0}")]
    Corrupt(String),
}
