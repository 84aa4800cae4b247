/// Lumen version string.
pub const LUMEN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Snapshot format identifier for the vector index.
pub const INDEX_SNAPSHOT_FORMAT: &str = "lumen-vector-index";
/// Current vector index snapshot schema version.
pub const INDEX_SCHEMA_VERSION: u32 = 1;

/// Snapshot format identifier for the knowledge graph.
pub const GRAPH_SNAPSHOT_FORMAT: &str = "lumen-knowledge-graph";
/// Current knowledge graph snapshot schema version.
pub const GRAPH_SCHEMA_VERSION: u32 = 1;

/// zstd level used for snapshot bodies.
pub const SNAPSHOT_COMPRESSION_LEVEL: i32 = 3;

/// Neutral score assigned to a credibility component whose check errored.
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Maximum number of query expansions appended to a search query.
pub const MAX_QUERY_EXPANSIONS: usize = 5;

/// Maximum characters kept in a search result snippet.
pub const SNIPPET_MAX_CHARS: usize = 240;

/// Separator between a document id and the chunk ordinal in chunk ids.
pub const CHUNK_ID_SEPARATOR: char = '#';

/// Suffix of the index id holding a document-level vector.
pub const DOCUMENT_VECTOR_SUFFIX: &str = "#doc";

/// Snapshot format identifier for the ingestion document registry.
pub const DOCUMENT_SNAPSHOT_FORMAT: &str = "lumen-document-registry";
/// Current document registry snapshot schema version.
pub const DOCUMENT_SCHEMA_VERSION: u32 = 1;
