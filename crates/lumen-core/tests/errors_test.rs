use lumen_core::errors::*;

#[test]
fn timeout_carries_operation_and_millis() {
    let err = LumenError::Timeout {
        operation: "ingest doc-1".into(),
        millis: 250,
    };
    let msg = err.to_string();
    assert!(msg.contains("ingest doc-1"));
    assert!(msg.contains("250"));
    assert!(err.is_transient());
}

#[test]
fn degraded_mode_carries_component_and_fallback() {
    let err = LumenError::DegradedMode {
        component: "rerank".into(),
        fallback: "vector order".into(),
    };
    let msg = err.to_string();
    assert!(msg.contains("rerank"));
    assert!(msg.contains("vector order"));
}

// --- From impls ---

#[test]
fn storage_error_converts_to_lumen_error() {
    let err: LumenError = StorageError::Unavailable {
        store: "vector-index".into(),
    }
    .into();
    assert!(matches!(err, LumenError::StorageError(_)));
    assert!(err.is_transient());
}

#[test]
fn corrupted_snapshot_is_not_transient() {
    let err: LumenError = StorageError::Corrupted {
        details: "checksum mismatch".into(),
    }
    .into();
    assert!(!err.is_transient());
    assert!(err.to_string().contains("checksum mismatch"));
}

#[test]
fn embedding_error_converts_to_lumen_error() {
    let err: LumenError = EmbeddingError::DimensionMismatch {
        expected: 256,
        actual: 128,
    }
    .into();
    assert!(matches!(err, LumenError::EmbeddingError(_)));
}

#[test]
fn graph_error_converts_to_lumen_error() {
    let err: LumenError = GraphError::EntityNotFound {
        name: "Atlantis".into(),
    }
    .into();
    assert!(matches!(err, LumenError::GraphError(_)));
    assert!(err.to_string().contains("Atlantis"));
}

#[test]
fn serde_error_converts_to_serialization_error() {
    let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
    let err: LumenError = parse.unwrap_err().into();
    assert!(matches!(err, LumenError::SerializationError(_)));
}
