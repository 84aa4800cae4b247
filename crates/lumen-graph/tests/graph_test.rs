use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use lumen_core::config::GraphConfig;
use lumen_core::errors::{LumenError, StorageError};
use lumen_core::models::{EntityType, MergeReason};
use lumen_graph::{GraphQuery, GraphQueryCache, GraphQueryResult, KnowledgeGraph, TimeWindow};

fn graph() -> KnowledgeGraph {
    KnowledgeGraph::new(GraphConfig::default())
}

/// 50 documents, 40 of which put the Eiffel Tower in Paris.
fn paris_corpus(kg: &KnowledgeGraph) {
    for i in 0..50 {
        let text = if i % 5 == 4 {
            format!("Paris hosted conference number {i} this spring.")
        } else {
            format!("The Eiffel Tower is in Paris and welcomed group {i} this week.")
        };
        kg.merge_document(&format!("doc-{i}"), &text, 0.6).unwrap();
    }
}

// =============================================================================
// CO-OCCURRENCE STRENGTH
// =============================================================================

#[test]
fn frequent_cooccurrence_yields_strong_relation() {
    let kg = graph();
    paris_corpus(&kg);

    let relation = kg.relation_between("Paris", "Eiffel Tower").unwrap().unwrap();
    assert!(relation.strength > 0.7, "strength {}", relation.strength);
    assert!(relation.strength <= 1.0);
    assert_eq!(relation.evidence.len(), 40);
    assert_eq!(relation.relation_type, "located_in");
}

#[test]
fn neighbor_query_surfaces_paris_first() {
    let kg = graph();
    paris_corpus(&kg);

    let answer = kg.query(&GraphQuery::neighbors("Eiffel Tower")).unwrap();
    let GraphQueryResult::Neighbors { items } = answer.result else {
        panic!("wrong result kind");
    };
    assert_eq!(items[0].entity.name, "Paris");
    assert!(items[0].strength > 0.7);
}

#[test]
fn single_mention_documents_merge_without_context() {
    let kg = graph();
    paris_corpus(&kg);

    let paris = kg.entity("Paris").unwrap().unwrap();
    assert_eq!(paris.evidence.len(), 50);
    let audit = kg.merge_audit(Some("doc-4")).unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].reason, MergeReason::NoContext);
    assert!(audit[0].merged);
}

// =============================================================================
// DISAMBIGUATION
// =============================================================================

#[test]
fn homonyms_of_different_type_stay_distinct() {
    let kg = graph();
    kg.merge_document("a", "Jordan said the NBA season was long.", 0.5)
        .unwrap();
    kg.merge_document("b", "Many tourists visit Petra in Jordan.", 0.5)
        .unwrap();

    let stats = kg.stats().unwrap();
    assert_eq!(stats.entities, 4);

    let audit = kg.merge_audit_for_name("Jordan").unwrap();
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[0].reason, MergeReason::NoCandidate);
    assert_eq!(audit[1].reason, MergeReason::TypeMismatch);
    assert!(!audit[1].merged);
    assert_ne!(audit[0].chosen_id, audit[1].chosen_id);
}

#[test]
fn disjoint_context_creates_homonym_and_rebuild_repairs_it() {
    let kg = graph();
    kg.merge_document("a", "Jordan said the NBA season was long.", 0.5)
        .unwrap();
    kg.merge_document("b", "Jordan said the Bulls won again.", 0.5)
        .unwrap();
    let audit = kg.merge_audit(Some("b")).unwrap();
    let jordan = audit.iter().find(|d| d.normalized_name == "jordan").unwrap();
    assert_eq!(jordan.reason, MergeReason::BelowThreshold);

    kg.merge_document("c", "Jordan said the Bulls and the NBA agreed.", 0.5)
        .unwrap();
    let before = kg.stats().unwrap().entities;

    let report = kg.rebuild().unwrap();
    assert_eq!(report.entities_merged, 1);
    assert_eq!(kg.stats().unwrap().entities, before - 1);

    let merged = kg.entity("Jordan").unwrap().unwrap();
    assert_eq!(merged.evidence.len(), 3);
    assert_eq!(merged.entity_type, EntityType::Person);
    let rebuild_entries: Vec<_> = kg
        .merge_audit(None)
        .unwrap()
        .into_iter()
        .filter(|d| d.reason == MergeReason::Rebuild)
        .collect();
    assert_eq!(rebuild_entries.len(), 1);
}

#[test]
fn audit_is_append_only() {
    let kg = graph();
    kg.merge_document("a", "The Eiffel Tower is in Paris.", 0.5).unwrap();
    let first = kg.merge_audit(None).unwrap();
    kg.merge_document("b", "The Eiffel Tower is in Paris.", 0.5).unwrap();
    let second = kg.merge_audit(None).unwrap();
    assert_eq!(&second[..first.len()], &first[..]);
    assert!(second.len() > first.len());
}

// =============================================================================
// TEMPORAL RELATIONS
// =============================================================================

fn employment_graph() -> KnowledgeGraph {
    let kg = graph();
    kg.merge_document("a", "Bob Stone worked for Acme Corp from 2001 to 2005.", 0.7)
        .unwrap();
    kg.merge_document("b", "Alice Moore worked for Globex Corp since 2010.", 0.7)
        .unwrap();
    kg.merge_document("c", "The Eiffel Tower is in Paris.", 0.7)
        .unwrap();
    kg
}

fn relations_at(kg: &KnowledgeGraph, y: i32, include_untimed: bool) -> Vec<String> {
    let answer = kg
        .query(&GraphQuery::Relations {
            entity: None,
            relation_type: None,
            window: TimeWindow::At {
                date: NaiveDate::from_ymd_opt(y, 6, 1).unwrap(),
            },
            include_untimed,
        })
        .unwrap();
    let GraphQueryResult::Relations { items } = answer.result else {
        panic!("wrong result kind");
    };
    items.into_iter().map(|r| r.target.name).collect()
}

#[test]
fn point_in_time_filter() {
    let kg = employment_graph();
    assert_eq!(relations_at(&kg, 2003, false), vec!["Acme Corp"]);
    assert_eq!(relations_at(&kg, 2015, false), vec!["Globex Corp"]);
    assert!(relations_at(&kg, 1995, false).is_empty());
    assert_eq!(relations_at(&kg, 1995, true), vec!["Paris"]);
}

#[test]
fn range_filter_and_label_filter() {
    let kg = employment_graph();
    let answer = kg
        .query(&GraphQuery::Relations {
            entity: Some("Bob Stone".into()),
            relation_type: Some("works_for".into()),
            window: TimeWindow::Range {
                from: NaiveDate::from_ymd_opt(2004, 1, 1).unwrap(),
                to: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            },
            include_untimed: false,
        })
        .unwrap();
    let GraphQueryResult::Relations { items } = answer.result else {
        panic!("wrong result kind");
    };
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].source.name, "Bob Stone");
}

// =============================================================================
// QUERY TYPES
// =============================================================================

#[test]
fn path_between_entities() {
    let kg = KnowledgeGraph::new(GraphConfig {
        sentence_window: 0,
        ..GraphConfig::default()
    });
    kg.merge_document("a", "The Eiffel Tower is in Paris.", 0.6).unwrap();
    kg.merge_document(
        "b",
        "Paris is the capital of France. Many visitors love the Eiffel Tower.",
        0.6,
    )
    .unwrap();

    let answer = kg.query(&GraphQuery::path("Eiffel Tower", "France")).unwrap();
    let GraphQueryResult::Path { path: Some(path) } = answer.result else {
        panic!("expected a path");
    };
    let names: Vec<_> = path.entities.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["Eiffel Tower", "Paris", "France"]);
    assert_eq!(path.relations.len(), 2);

    let answer = kg
        .query(&GraphQuery::Path {
            from: "Eiffel Tower".into(),
            to: "France".into(),
            max_depth: 1,
        })
        .unwrap();
    assert!(matches!(answer.result, GraphQueryResult::Path { path: None }));
}

#[test]
fn entity_detail_lists_evidence() {
    let kg = graph();
    paris_corpus(&kg);
    let answer = kg
        .query(&GraphQuery::EntityDetail {
            entity: "eiffel tower".into(),
        })
        .unwrap();
    let GraphQueryResult::EntityDetail { detail: Some(detail) } = answer.result else {
        panic!("expected detail");
    };
    assert_eq!(detail.documents.len(), 40);
    assert_eq!(detail.relations.len(), 1);
}

#[test]
fn entities_by_type() {
    let kg = employment_graph();
    let answer = kg
        .query(&GraphQuery::EntitiesByType {
            entity_type: EntityType::Organization,
            name_prefix: None,
            limit: 0,
        })
        .unwrap();
    let GraphQueryResult::Entities { items } = answer.result else {
        panic!("wrong result kind");
    };
    let mut names: Vec<_> = items.into_iter().map(|e| e.name).collect();
    names.sort();
    assert_eq!(names, vec!["Acme Corp", "Globex Corp"]);
}

#[test]
fn unknown_entity_yields_empty_results() {
    let kg = graph();
    let answer = kg.query(&GraphQuery::neighbors("Atlantis")).unwrap();
    assert_eq!(answer.result, GraphQueryResult::Neighbors { items: vec![] });
}

// =============================================================================
// CACHING
// =============================================================================

#[test]
fn repeated_query_is_served_from_cache_until_mutation() {
    let cache = Arc::new(GraphQueryCache::new("graph", Duration::from_secs(60), 100));
    let kg = KnowledgeGraph::new(GraphConfig::default()).with_query_cache(cache.clone());
    kg.merge_document("a", "The Eiffel Tower is in Paris.", 0.6).unwrap();

    let q = GraphQuery::neighbors("Paris");
    let first = kg.query(&q).unwrap();
    assert!(!first.cached);
    let second = kg.query(&q).unwrap();
    assert!(second.cached);
    assert_eq!(first.result, second.result);

    kg.merge_document("b", "Paris is the capital of France.", 0.6).unwrap();
    let third = kg.query(&q).unwrap();
    assert!(!third.cached);
    assert!(third.graph_version > first.graph_version);
}

// =============================================================================
// BOUNDED QUERIES
// =============================================================================

#[tokio::test]
async fn query_with_timeout_matches_blocking_query() {
    let kg = Arc::new(graph());
    paris_corpus(&kg);

    let q = GraphQuery::neighbors("Eiffel Tower");
    let bounded = kg.query_with_timeout(q.clone()).await.unwrap();
    let direct = kg.query(&q).unwrap();
    assert_eq!(bounded.result, direct.result);
    assert_eq!(bounded.graph_version, direct.graph_version);
}

#[tokio::test]
async fn query_with_timeout_propagates_store_errors() {
    let kg = Arc::new(graph());
    kg.set_available(false);
    let err = kg
        .query_with_timeout(GraphQuery::neighbors("Paris"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LumenError::StorageError(StorageError::Unavailable { .. })
    ));
}

// =============================================================================
// RETRACTION, SNAPSHOTS, AVAILABILITY
// =============================================================================

#[test]
fn retract_removes_unsupported_entities_and_relations() {
    let kg = graph();
    kg.merge_document("a", "The Eiffel Tower is in Paris.", 0.6).unwrap();
    kg.merge_document("b", "Paris is the capital of France.", 0.6).unwrap();

    assert!(kg.retract_document("b").unwrap());
    assert!(!kg.retract_document("b").unwrap());
    let stats = kg.stats().unwrap();
    assert_eq!(stats.entities, 2);
    assert_eq!(stats.relations, 1);
    assert!(kg.entity("France").unwrap().is_none());
}

#[test]
fn remerging_a_document_replaces_its_contribution() {
    let kg = graph();
    kg.merge_document("a", "The Eiffel Tower is in Paris.", 0.6).unwrap();
    let report = kg
        .merge_document("a", "The Eiffel Tower is in Paris.", 0.6)
        .unwrap();
    assert!(report.replaced);
    let relation = kg.relation_between("Paris", "Eiffel Tower").unwrap().unwrap();
    assert_eq!(relation.evidence.len(), 1);
}

#[test]
fn snapshot_round_trip_preserves_graph() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.lumen");
    let kg = graph();
    paris_corpus(&kg);
    kg.save(&path).unwrap();

    let restored = graph();
    restored.load(&path).unwrap();
    let (a, b) = (kg.stats().unwrap(), restored.stats().unwrap());
    assert_eq!(a.entities, b.entities);
    assert_eq!(a.relations, b.relations);
    assert_eq!(a.documents, b.documents);
    assert_eq!(
        kg.relation_between("Paris", "Eiffel Tower").unwrap(),
        restored.relation_between("Paris", "Eiffel Tower").unwrap()
    );
    assert!(b.version > 0);
}

#[test]
fn bad_snapshot_is_rejected_before_the_live_graph_changes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.snapshot");
    std::fs::write(&path, b"garbage").unwrap();

    let kg = graph();
    kg.merge_document("a", "The Eiffel Tower is in Paris.", 0.6).unwrap();
    let before = kg.stats().unwrap();

    assert!(kg.stage_load(&path).is_err());
    assert!(kg.load(&path).is_err());
    assert_eq!(kg.stats().unwrap(), before);
}

#[test]
fn unavailable_store_is_a_storage_error() {
    let kg = graph();
    kg.set_available(false);
    let err = kg.query(&GraphQuery::neighbors("Paris")).unwrap_err();
    assert!(matches!(
        err,
        LumenError::StorageError(StorageError::Unavailable { .. })
    ));
    assert!(kg.merge_document("a", "Paris.", 0.5).is_err());
}

#[test]
fn empty_document_id_is_rejected() {
    let kg = graph();
    assert!(matches!(
        kg.merge_document(" ", "Paris.", 0.5),
        Err(LumenError::ValidationError(_))
    ));
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[test]
fn concurrent_merges_lose_no_updates() {
    let kg = Arc::new(graph());
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let kg = kg.clone();
            thread::spawn(move || {
                for i in 0..10 {
                    kg.merge_document(
                        &format!("t{t}-{i}"),
                        "The Eiffel Tower is in Paris.",
                        0.6,
                    )
                    .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let stats = kg.stats().unwrap();
    assert_eq!(stats.documents, 80);
    assert_eq!(stats.version, 80);
    let relation = kg.relation_between("Paris", "Eiffel Tower").unwrap().unwrap();
    assert_eq!(relation.evidence.len(), 80);
}
