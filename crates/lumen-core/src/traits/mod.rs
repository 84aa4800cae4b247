mod corpus;
mod embedding;
mod extractor;
mod mutation;
mod reranker;

pub use corpus::{CorpusPassage, ICorpusView};
pub use embedding::IEmbeddingProvider;
pub use extractor::{ExtractedContent, IContentExtractor, SourceInput};
pub use mutation::IMutationListener;
pub use reranker::IReranker;
