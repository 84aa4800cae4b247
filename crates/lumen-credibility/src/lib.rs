//! # lumen-credibility
//!
//! Composite credibility score: five weighted checks (source reliability,
//! internal consistency, cross-document consistency, quality, timestamp
//! validity). A check that errors contributes the neutral 0.5 and is marked
//! `errored` in the report.

pub mod consistency;
pub mod engine;
pub mod source;
pub mod statements;
pub mod timestamp;

pub use engine::CredibilityVerifier;
