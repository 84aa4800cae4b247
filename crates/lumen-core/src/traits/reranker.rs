use crate::errors::LumenResult;

/// Fine-grained pairwise relevance scorer run over a small candidate set.
pub trait IReranker: Send + Sync {
    /// One relevance score in [0, 1] per passage, in input order.
    fn rerank(&self, query: &str, passages: &[&str]) -> LumenResult<Vec<f64>>;

    fn name(&self) -> &str;
}
