use std::collections::BTreeMap;

use lumen_core::config::GraphConfig;
use lumen_core::models::EvidenceStats;
use lumen_graph::strength::{compute, StrengthParams};
use lumen_graph::KnowledgeGraph;
use proptest::prelude::*;

fn evidence_strategy() -> impl Strategy<Value = BTreeMap<String, EvidenceStats>> {
    prop::collection::vec((0u32..500, -1.0f64..2.0), 0..60).prop_map(|items| {
        items
            .into_iter()
            .enumerate()
            .map(|(i, (distance, credibility))| {
                (
                    format!("doc-{i}"),
                    EvidenceStats {
                        mentions: 1,
                        min_distance: distance,
                        credibility,
                        valid_time: None,
                    },
                )
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn strength_is_always_in_unit_interval(evidence in evidence_strategy()) {
        let s = compute(&evidence, StrengthParams::from(&GraphConfig::default()));
        prop_assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn adding_evidence_never_weakens_equal_quality_relations(n in 1usize..40, distance in 0u32..50) {
        let params = StrengthParams::from(&GraphConfig::default());
        let make = |count: usize| -> BTreeMap<String, EvidenceStats> {
            (0..count)
                .map(|i| (format!("d{i}"), EvidenceStats {
                    mentions: 1,
                    min_distance: distance,
                    credibility: 0.5,
                    valid_time: None,
                }))
                .collect()
        };
        prop_assert!(compute(&make(n + 1), params) >= compute(&make(n), params));
    }

    #[test]
    fn merged_relations_stay_in_bounds(words in prop::collection::vec("[A-Z][a-z]{2,8}", 2..6), cred in -5.0f64..5.0) {
        let kg = KnowledgeGraph::new(GraphConfig::default());
        let text = format!("{} met in {}.", words.join(" and "), words[0]);
        kg.merge_document("doc", &text, cred).unwrap();
        let answer = kg.query(&lumen_graph::GraphQuery::Relations {
            entity: None,
            relation_type: None,
            window: lumen_graph::TimeWindow::Any,
            include_untimed: true,
        }).unwrap();
        if let lumen_graph::GraphQueryResult::Relations { items } = answer.result {
            for r in items {
                prop_assert!((0.0..=1.0).contains(&r.strength));
            }
        }
    }
}
