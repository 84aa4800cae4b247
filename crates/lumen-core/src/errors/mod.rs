mod embedding_error;
mod graph_error;
mod lumen_error;
mod storage_error;

pub use embedding_error::EmbeddingError;
pub use graph_error::GraphError;
pub use lumen_error::{LumenError, LumenResult};
pub use storage_error::StorageError;
