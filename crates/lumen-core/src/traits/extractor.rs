use std::collections::BTreeMap;

use crate::errors::LumenResult;

/// A source file as received from a caller, before text extraction.
#[derive(Debug, Clone)]
pub struct SourceInput {
    pub id: String,
    pub bytes: Vec<u8>,
    pub media_type: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

/// Plain text plus metadata produced by an extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedContent {
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

/// External content-extraction collaborator (source file to plain text).
pub trait IContentExtractor: Send + Sync {
    fn extract(&self, input: &SourceInput) -> LumenResult<ExtractedContent>;

    /// Whether this extractor handles the given media type.
    fn supports(&self, media_type: Option<&str>) -> bool;
}
