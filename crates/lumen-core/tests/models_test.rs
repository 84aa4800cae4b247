use chrono::Utc;
use lumen_core::models::*;
use proptest::prelude::*;

#[test]
fn stage_result_serializes_tagged() {
    let dup = StageResult::Duplicate {
        of_id: "doc-a".into(),
    };
    let json = serde_json::to_value(&dup).unwrap();
    assert_eq!(json["outcome"], "duplicate");
    assert_eq!(json["of_id"], "doc-a");
}

fn component_scores() -> impl Strategy<Value = Vec<ComponentScore>> {
    prop::collection::vec((0.0f64..1.0, 0.0f64..1.0, any::<bool>()), 5).prop_map(|parts| {
        let total: f64 = parts.iter().map(|(w, _, _)| w).sum::<f64>().max(1e-9);
        CredibilityComponent::ALL
            .iter()
            .zip(parts)
            .map(|(&component, (weight, score, flagged))| ComponentScore {
                component,
                weight: weight / total,
                score,
                errored: false,
                flagged,
                detail: String::new(),
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn credibility_report_is_weighted_sum(components in component_scores()) {
        let expected: f64 = components.iter().map(|c| c.weight * c.score).sum();
        let flagged: Vec<bool> = components.iter().map(|c| c.flagged).collect();
        let report = CredibilityReport::from_components(components, Utc::now());

        prop_assert!((report.score - expected.clamp(0.0, 1.0)).abs() < 1e-12);
        prop_assert!((0.0..=1.0).contains(&report.score));
        for (component, flagged) in CredibilityComponent::ALL.iter().zip(flagged) {
            prop_assert_eq!(report.component(*component).map(|c| c.flagged), Some(flagged));
        }
    }
}

#[test]
fn new_document_is_pending_with_raw_hash() {
    let raw = RawDocument::new("doc-1", "Hello world").with_meta("author", "Ada");
    let doc = Document::from_raw(&raw, Utc::now());
    assert_eq!(doc.lifecycle, Lifecycle::Pending);
    assert_eq!(doc.raw_hash, content_hash("Hello world"));
    assert_eq!(doc.raw_metadata.get("author").map(String::as_str), Some("Ada"));
    assert_eq!(doc.credibility_score(), 0.5);
}

#[test]
fn chunk_ids_embed_document_and_ordinal() {
    let chunk = Chunk::new("doc-1", 3, 120, "text".into());
    assert_eq!(chunk.id, "doc-1#3");
}

#[test]
fn mutation_events_report_domain_and_version() {
    let e = MutationEvent::GraphMerged {
        document_id: "d".into(),
        version: 7,
    };
    assert_eq!(e.domain(), MutationDomain::Graph);
    assert_eq!(e.version(), 7);
    let e = MutationEvent::IndexDeleted {
        id: "c".into(),
        version: 3,
    };
    assert_eq!(e.domain(), MutationDomain::Index);
}
