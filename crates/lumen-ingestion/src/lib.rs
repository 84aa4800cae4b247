//! # lumen-ingestion
//!
//! Ingestion gateway. Each submitted document runs the preprocessor,
//! credibility verification, chunk indexing, and graph extraction on the
//! blocking pool under a timeout. Batches run with bounded concurrency and
//! can be cancelled; one document's failure never affects another.

pub mod cancellation;
pub mod chunking;
pub mod corpus;
pub mod engine;
pub mod extractor;
pub mod registry;

pub use cancellation::CancellationToken;
pub use corpus::IndexCorpusView;
pub use engine::{GatewayStats, IngestionGateway};
pub use extractor::PlainTextExtractor;
pub use registry::{DocumentEntry, DocumentRegistry, LifecycleCounts, StagedRegistry};
