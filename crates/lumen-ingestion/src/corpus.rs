//! Corpus view over indexed chunks, used by cross-document credibility checks.

use std::sync::Arc;

use lumen_core::errors::LumenResult;
use lumen_core::traits::{CorpusPassage, ICorpusView, IEmbeddingProvider};
use lumen_index::{IndexFilter, VectorIndex};

use crate::registry::DocumentRegistry;

pub struct IndexCorpusView {
    embedder: Arc<dyn IEmbeddingProvider>,
    index: Arc<VectorIndex>,
    registry: Arc<DocumentRegistry>,
}

impl IndexCorpusView {
    pub fn new(
        embedder: Arc<dyn IEmbeddingProvider>,
        index: Arc<VectorIndex>,
        registry: Arc<DocumentRegistry>,
    ) -> Self {
        Self {
            embedder,
            index,
            registry,
        }
    }
}

impl ICorpusView for IndexCorpusView {
    fn similar_passages(
        &self,
        text: &str,
        exclude_document: &str,
        limit: usize,
    ) -> LumenResult<Vec<CorpusPassage>> {
        if limit == 0 || self.index.is_empty()? {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed(text)?;
        let filter = IndexFilter {
            exclude_document: Some(exclude_document.to_string()),
            ..IndexFilter::chunks()
        };
        let hits = self.index.search(&vector, limit, &filter)?;
        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                let chunk = self.registry.chunk(&hit.id)?;
                Some(CorpusPassage {
                    document_id: chunk.document_id,
                    text: chunk.text,
                    similarity: hit.score,
                })
            })
            .collect())
    }
}
