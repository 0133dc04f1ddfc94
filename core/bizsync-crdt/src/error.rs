use thiserror::Error;

/// Result type alias for CRDT operations.
pub type Result<T> = std::result::Result<T, CrdtError>;

/// Errors raised while decoding replicated state.
#[derive(Debug, Error)]
pub enum CrdtError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("malformed state: {0}")]
    Malformed(String),

    #[error(transparent)]
    Types(#[from] bizsync_types::Error),
}
