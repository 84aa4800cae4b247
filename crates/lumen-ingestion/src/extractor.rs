//! Passthrough extractor for sources that already are text.

use lumen_core::errors::{LumenError, LumenResult};
use lumen_core::traits::{ExtractedContent, IContentExtractor, SourceInput};

const SUPPORTED: &[&str] = &["text/plain", "text/markdown", "text/html"];

/// Decodes bytes as UTF-8 (lossily) and passes metadata through. HTML is
/// left as markup; the normalize stage strips it.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl IContentExtractor for PlainTextExtractor {
    fn extract(&self, input: &SourceInput) -> LumenResult<ExtractedContent> {
        if !self.supports(input.media_type.as_deref()) {
            return Err(LumenError::ValidationError(format!(
                "unsupported media type {:?}",
                input.media_type
            )));
        }
        Ok(ExtractedContent {
            text: String::from_utf8_lossy(&input.bytes).into_owned(),
            metadata: input.metadata.clone(),
        })
    }

    fn supports(&self, media_type: Option<&str>) -> bool {
        match media_type {
            None => true,
            Some(m) => {
                let essence = m.split(';').next().unwrap_or(m).trim().to_ascii_lowercase();
                SUPPORTED.contains(&essence.as_str())
            }
        }
    }
}
