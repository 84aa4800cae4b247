//! LumenRuntime: one process-wide set of stores and engines.

use std::path::Path;
use std::sync::Arc;

use lumen_core::config::LumenConfig;
use lumen_core::errors::{LumenError, LumenResult, StorageError};
use lumen_core::models::{RawDocument, SearchRequest, SearchResponse, SubmitResult};
use lumen_core::traits::IEmbeddingProvider;
use lumen_embeddings::EmbeddingEngine;
use lumen_graph::KnowledgeGraph;
use lumen_index::VectorIndex;
use lumen_ingestion::{CancellationToken, DocumentRegistry, IngestionGateway};
use lumen_retrieval::RetrievalEngine;
use serde::{Deserialize, Serialize};
use tracing::info;

const INDEX_FILE: &str = "index.snapshot";
const GRAPH_FILE: &str = "graph.snapshot";
const DOCUMENTS_FILE: &str = "documents.snapshot";

/// What `load_all` brought back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreReport {
    pub index_entries: usize,
    pub documents: usize,
    /// Content hashes re-registered with semantic dedup.
    pub claims: usize,
}

/// Owns the vector index, knowledge graph, embedder, ingestion gateway, and
/// retrieval engine, all sharing one configuration.
pub struct LumenRuntime {
    config: LumenConfig,
    embedder: Arc<EmbeddingEngine>,
    index: Arc<VectorIndex>,
    graph: Arc<KnowledgeGraph>,
    gateway: IngestionGateway,
    retrieval: RetrievalEngine,
}

impl LumenRuntime {
    pub fn new(config: LumenConfig) -> LumenResult<Self> {
        config.validate()?;
        let embedder = Arc::new(EmbeddingEngine::new(
            &config.embedding,
            config.index.dimensions,
        ));
        let index = Arc::new(VectorIndex::new(config.index.clone()));
        let graph = Arc::new(KnowledgeGraph::new(config.graph.clone()));
        let provider: Arc<dyn IEmbeddingProvider> = embedder.clone();

        let gateway = IngestionGateway::new(
            &config,
            Arc::clone(&provider),
            Arc::clone(&index),
            Some(Arc::clone(&graph)),
        )?;
        let retrieval = RetrievalEngine::new(
            &config,
            provider,
            Arc::clone(&index),
            Some(Arc::clone(&graph)),
            Arc::clone(gateway.registry()),
        )?;

        info!(
            dims = config.index.dimensions,
            provider = embedder.active_provider(),
            cache = config.cache.enabled,
            "lumen runtime ready"
        );
        Ok(Self {
            config,
            embedder,
            index,
            graph,
            gateway,
            retrieval,
        })
    }

    pub fn from_toml(toml_str: &str) -> LumenResult<Self> {
        Self::new(LumenConfig::from_toml(toml_str)?)
    }

    pub fn from_file(path: &Path) -> LumenResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            LumenError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    pub fn config(&self) -> &LumenConfig {
        &self.config
    }

    pub fn embedder(&self) -> &Arc<EmbeddingEngine> {
        &self.embedder
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    pub fn graph(&self) -> &Arc<KnowledgeGraph> {
        &self.graph
    }

    pub fn gateway(&self) -> &IngestionGateway {
        &self.gateway
    }

    pub fn retrieval(&self) -> &RetrievalEngine {
        &self.retrieval
    }

    pub async fn submit(&self, raw: RawDocument) -> LumenResult<SubmitResult> {
        self.gateway.submit(raw).await
    }

    pub async fn submit_batch(
        &self,
        docs: Vec<RawDocument>,
        cancel: &CancellationToken,
    ) -> Vec<SubmitResult> {
        self.gateway.submit_batch(docs, cancel).await
    }

    pub async fn search(&self, request: SearchRequest) -> LumenResult<SearchResponse> {
        self.retrieval.search(request).await
    }

    /// Snapshot the index, graph, and document registry into `dir`.
    pub fn save_all(&self, dir: &Path) -> LumenResult<()> {
        std::fs::create_dir_all(dir).map_err(|e| StorageError::Io {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;
        self.index.save(&dir.join(INDEX_FILE))?;
        self.graph.save(&dir.join(GRAPH_FILE))?;
        self.gateway.registry().save(&dir.join(DOCUMENTS_FILE))?;
        info!(dir = %dir.display(), "runtime state saved");
        Ok(())
    }

    /// Restore a `save_all` snapshot and re-register the content hashes of
    /// active documents so duplicates of restored content are caught.
    ///
    /// All three snapshots are read and checked before any store changes, so
    /// a missing or corrupt file leaves the runtime as it was.
    pub fn load_all(&self, dir: &Path) -> LumenResult<RestoreReport> {
        let index = self.index.stage_load(&dir.join(INDEX_FILE))?;
        let graph = self.graph.stage_load(&dir.join(GRAPH_FILE))?;
        let documents = DocumentRegistry::stage_load(&dir.join(DOCUMENTS_FILE))?;

        let index = self.index.commit_load(index)?;
        self.graph.commit_load(graph)?;
        let documents = self.gateway.registry().commit_load(documents);
        let claims = self.gateway.restore_claims();
        let report = RestoreReport {
            index_entries: index.entries,
            documents: documents.entries,
            claims,
        };
        info!(
            dir = %dir.display(),
            index_entries = report.index_entries,
            documents = report.documents,
            claims = report.claims,
            "runtime state restored"
        );
        Ok(report)
    }
}
