//! # lumen-preprocess
//!
//! Multi-stage preprocessor. A document passes through an ordered list of
//! stages (normalize, safety filter, quality assessment, metadata unification,
//! semantic dedup by default); the first stage that does not accept it ends
//! the run. Every outcome is appended to the document's stage trail.

pub mod dedup;
pub mod engine;
pub mod language;
pub mod metadata;
pub mod normalize;
pub mod quality;
pub mod safety;
pub mod stage;

pub use dedup::SemanticDedup;
pub use engine::{Preprocessor, PreprocessorBuilder};
pub use metadata::MetadataUnify;
pub use normalize::Normalize;
pub use quality::QualityAssess;
pub use safety::SafetyFilter;
pub use stage::{Stage, StageContext};
