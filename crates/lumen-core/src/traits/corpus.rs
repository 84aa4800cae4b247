use crate::errors::LumenResult;

/// A passage from the existing corpus, similar to some query text.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusPassage {
    pub document_id: String,
    pub text: String,
    pub similarity: f64,
}

/// Read-only view of the active corpus used for cross-document checks.
pub trait ICorpusView: Send + Sync {
    /// Up to `limit` passages most similar to `text`, excluding `exclude_document`.
    fn similar_passages(
        &self,
        text: &str,
        exclude_document: &str,
        limit: usize,
    ) -> LumenResult<Vec<CorpusPassage>>;
}
