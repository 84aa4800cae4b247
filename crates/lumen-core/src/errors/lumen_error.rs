use super::{EmbeddingError, GraphError, StorageError};

/// Top-level error for every Lumen operation.
#[derive(Debug, thiserror::Error)]
pub enum LumenError {
    #[error("validation failed: {0}")]
    ValidationError(String),

    #[error("storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("embedding error: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    #[error("graph error: {0}")]
    GraphError(#[from] GraphError),

    #[error("document not found: {id}")]
    DocumentNotFound { id: String },

    #[error("{operation} timed out after {millis}ms")]
    Timeout { operation: String, millis: u64 },

    #[error("degraded mode: {component} fell back to {fallback}")]
    DegradedMode { component: String, fallback: String },

    #[error("concurrency error: {0}")]
    ConcurrencyError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Convenience alias used throughout the workspace.
pub type LumenResult<T> = Result<T, LumenError>;

impl LumenError {
    /// Whether the caller may retry the same request and expect a different outcome.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LumenError::Timeout { .. }
                | LumenError::ConcurrencyError(_)
                | LumenError::StorageError(StorageError::Unavailable { .. })
        )
    }
}
