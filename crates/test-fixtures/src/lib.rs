//! Loader for the JSON corpora and golden queries under `test-fixtures/`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use lumen_core::models::RawDocument;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Root directory of the test-fixtures folder.
fn fixtures_root() -> PathBuf {
    // Walk up from whichever crate is running the test.
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let mut path = PathBuf::from(&manifest_dir);
    while !path.join("test-fixtures").join("corpora").exists() {
        if !path.pop() {
            panic!(
                "Could not find test-fixtures directory from CARGO_MANIFEST_DIR={}",
                manifest_dir
            );
        }
    }
    path.join("test-fixtures")
}

/// Load and deserialize a JSON fixture file.
///
/// # Panics
/// Panics if the file doesn't exist or can't be deserialized.
pub fn load_fixture<T: DeserializeOwned>(relative_path: &str) -> T {
    let path = fixtures_root().join(relative_path);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e))
}

pub fn fixture_exists(relative_path: &str) -> bool {
    fixtures_root().join(relative_path).exists()
}

pub fn fixture_path(relative_path: &str) -> PathBuf {
    fixtures_root().join(relative_path)
}

/// One document of a corpus file.
#[derive(Debug, Clone, Deserialize)]
pub struct CorpusDocument {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl CorpusDocument {
    pub fn to_raw(&self) -> RawDocument {
        RawDocument {
            id: self.id.clone(),
            content: self.content.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// A query with the document expected to rank first.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryCase {
    pub query: String,
    pub expected_top: String,
    #[serde(default)]
    pub kg_expansion: bool,
}

/// `test-fixtures/corpora/<name>.json`.
pub fn load_corpus(name: &str) -> Vec<CorpusDocument> {
    load_fixture(&format!("corpora/{name}.json"))
}

/// `test-fixtures/corpora/<name>.json` as raw submissions.
pub fn raw_corpus(name: &str) -> Vec<RawDocument> {
    load_corpus(name).iter().map(CorpusDocument::to_raw).collect()
}

/// `test-fixtures/queries/<name>.json`.
pub fn load_queries(name: &str) -> Vec<QueryCase> {
    load_fixture(&format!("queries/{name}.json"))
}
