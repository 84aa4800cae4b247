// Single source of truth for all default values.

// --- Preprocess ---
pub const DEFAULT_DEDUP_THRESHOLD: f64 = 0.95;
pub const DEFAULT_DEDUP_MAX_CANDIDATES: usize = 64;
pub const DEFAULT_QUALITY_THRESHOLD: f64 = 0.4;
pub const DEFAULT_MIN_CONTENT_CHARS: usize = 20;
pub const DEFAULT_MAX_CONTENT_BYTES: usize = 2_000_000;

// --- Credibility ---
pub const DEFAULT_WEIGHT_SOURCE: f64 = 0.25;
pub const DEFAULT_WEIGHT_INTERNAL: f64 = 0.20;
pub const DEFAULT_WEIGHT_CROSS_DOCUMENT: f64 = 0.20;
pub const DEFAULT_WEIGHT_QUALITY: f64 = 0.15;
pub const DEFAULT_WEIGHT_TIMESTAMP: f64 = 0.20;
pub const DEFAULT_MAX_AGE_DAYS: i64 = 3_650; // 10 years
pub const DEFAULT_CLOCK_SKEW_SECS: i64 = 300;
pub const DEFAULT_CROSS_DOCUMENT_SAMPLE: usize = 8;

// --- Vector index ---
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 256;
pub const DEFAULT_ANN_THRESHOLD: usize = 2_000;
pub const DEFAULT_HNSW_M: usize = 16;
pub const DEFAULT_HNSW_EF_CONSTRUCTION: usize = 100;
pub const DEFAULT_HNSW_EF_SEARCH: usize = 64;

// --- Knowledge graph ---
pub const DEFAULT_MERGE_THRESHOLD: f64 = 0.2;
pub const DEFAULT_COOCCURRENCE_SCALE: f64 = 3.0;
pub const DEFAULT_PROXIMITY_SCALE: f64 = 10.0;
pub const DEFAULT_MAX_TRAVERSAL_DEPTH: usize = 4;
pub const DEFAULT_NEIGHBOR_LIMIT: usize = 25;
pub const DEFAULT_SENTENCE_WINDOW: usize = 1;
pub const DEFAULT_GRAPH_QUERY_TIMEOUT_MS: u64 = 2_000;

// --- Cache ---
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300; // 5 minutes
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

// --- Ingestion ---
pub const DEFAULT_INGEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_BATCH_CONCURRENCY: usize = 8;
pub const DEFAULT_CHUNK_SIZE_CHARS: usize = 800;
pub const DEFAULT_CHUNK_OVERLAP_CHARS: usize = 100;

// --- Retrieval ---
pub const DEFAULT_TOP_K: usize = 10;
pub const DEFAULT_CANDIDATE_MULTIPLIER: usize = 4;
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_NEAR_DUPLICATE_THRESHOLD: f64 = 0.9;
pub const DEFAULT_MAX_PER_DOCUMENT: usize = 3;
pub const DEFAULT_KG_EXPANSION_LIMIT: usize = 10;
pub const DEFAULT_RERANK_WEIGHT: f64 = 0.6;
pub const DEFAULT_QUERY_EXPANSION: bool = true;

// --- Embeddings ---
pub const DEFAULT_EMBEDDING_PROVIDER: &str = "hashed-tfidf";
pub const DEFAULT_L1_CACHE_SIZE: u64 = 10_000;

// --- Observability ---
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_FORMAT: &str = "json";
