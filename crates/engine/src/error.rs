//! Engine error taxonomy.

use sprout_storage::StoreError;

/// Error type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the progression and aggregation engines.
///
/// There is deliberately no `Conflict` variant: concurrent transitions
/// degrade to zero-row no-ops or `NotFound`, which keeps retried client
/// calls safe.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Missing or malformed input
    #[error("validation: {0}")]
    Validation(String),

    /// No catalog entry, attempt or live state matches
    #[error("not found: {0}")]
    NotFound(String),

    /// Underlying store failure
    #[error(transparent)]
    Store(#[from] StoreError),
}
