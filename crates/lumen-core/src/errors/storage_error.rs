/// Errors raised by the vector index and knowledge graph stores.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("store unavailable: {store}")]
    Unavailable { store: String },

    #[error("snapshot corrupted: {details}")]
    Corrupted { details: String },

    #[error("unsupported {format} schema version {found} (max supported {supported})")]
    UnsupportedSchema {
        format: String,
        found: u32,
        supported: u32,
    },

    #[error("snapshot format mismatch: expected {expected}, found {found}")]
    FormatMismatch { expected: String, found: String },

    #[error("i/o error on {path}: {message}")]
    Io { path: String, message: String },
}
