use thiserror::Error;

/// Result type for entity operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while merging or restoring entities.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Two different entities were handed to one merge. Neither side was modified.
    #[error("cannot merge {found} into {expected}")]
    MismatchedEntity { expected: String, found: String },

    /// A persisted blob decoded but describes an impossible entity.
    #[error("malformed entity state: {0}")]
    Malformed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
