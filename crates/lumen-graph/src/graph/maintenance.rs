//! Evidence bookkeeping shared by incremental merge, retraction, and rebuild.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use lumen_core::models::{EvidenceStats, Relation};
use petgraph::stable_graph::EdgeIndex;

use super::{DocumentRecord, IndexedGraph};
use crate::extraction::RELATED_TO;
use crate::strength::{self, StrengthParams};

/// Confidence grows with the number of documents attesting an entity.
pub fn entity_confidence(evidence_docs: usize) -> f64 {
    1.0 - 0.5f64.powi(evidence_docs.min(64) as i32)
}

/// Fold two evidence records for the same document.
pub fn combine_evidence(a: EvidenceStats, b: EvidenceStats) -> EvidenceStats {
    EvidenceStats {
        mentions: a.mentions.saturating_add(b.mentions),
        min_distance: a.min_distance.min(b.min_distance),
        credibility: a.credibility.max(b.credibility),
        valid_time: match (a.valid_time, b.valid_time) {
            (Some(x), Some(y)) => Some(x.union(&y)),
            (x, y) => x.or(y),
        },
    }
}

/// A specific label replaces the generic co-occurrence label, never the
/// other way round.
pub fn upgrade_label(current: &mut String, incoming: &str) {
    if current == RELATED_TO && incoming != RELATED_TO {
        *current = incoming.to_string();
    }
}

/// Recompute strength and valid-time from the relation's evidence.
pub fn refresh_relation(relation: &mut Relation, params: StrengthParams, now: DateTime<Utc>) {
    relation.strength = strength::compute(&relation.evidence, params);
    relation.valid_time = relation
        .evidence
        .values()
        .filter_map(|e| e.valid_time)
        .reduce(|a, b| a.union(&b));
    relation.updated_at = now;
}

/// Recompute an entity's context, mention count, and confidence from the
/// documents that mention it.
pub fn refresh_entity(
    graph: &mut IndexedGraph,
    documents: &BTreeMap<String, DocumentRecord>,
    id: &str,
    now: DateTime<Utc>,
) {
    let Some(entity) = graph.entity_mut(id) else {
        return;
    };
    entity.context.clear();
    entity.mentions = 0;
    for doc in &entity.evidence {
        if let Some(m) = documents.get(doc).and_then(|r| r.mentions.get(id)) {
            entity.context.extend(m.context.iter().cloned());
            entity.mentions += m.count;
        }
    }
    entity.context.remove(&entity.key);
    entity.confidence = entity_confidence(entity.evidence.len());
    entity.updated_at = now;
}

/// Fold `victim` into `survivor`: evidence, aliases, and relations move over,
/// and the victim node is removed. Returns false if either entity is missing.
pub fn merge_entities(
    graph: &mut IndexedGraph,
    documents: &mut BTreeMap<String, DocumentRecord>,
    survivor: &str,
    victim: &str,
    params: StrengthParams,
    now: DateTime<Utc>,
) -> bool {
    if survivor == victim || graph.entity(survivor).is_none() {
        return false;
    }
    let Some(absorbed) = graph.entity(victim).cloned() else {
        return false;
    };

    for (edge, other, outgoing) in graph.incident(victim) {
        let Some(mut relation) = graph.remove_relation(edge) else {
            continue;
        };
        if other == survivor {
            continue;
        }
        match graph.find_relation(survivor, &other) {
            Some(existing) => {
                if let Some(target) = graph.relation_mut(existing) {
                    for (doc, stats) in relation.evidence {
                        target
                            .evidence
                            .entry(doc)
                            .and_modify(|e| *e = combine_evidence(*e, stats))
                            .or_insert(stats);
                    }
                    upgrade_label(&mut target.relation_type, &relation.relation_type);
                    refresh_relation(target, params, now);
                }
            }
            None => {
                if outgoing {
                    relation.source = survivor.to_string();
                } else {
                    relation.target = survivor.to_string();
                }
                refresh_relation(&mut relation, params, now);
                graph.add_relation(relation);
            }
        }
    }

    for doc in &absorbed.evidence {
        let Some(record) = documents.get_mut(doc) else {
            continue;
        };
        if let Some(moved) = record.mentions.remove(victim) {
            let entry = record.mentions.entry(survivor.to_string()).or_default();
            entry.count += moved.count;
            entry.context.extend(moved.context);
        }
        let rename = |id: &String| {
            if id == victim {
                survivor.to_string()
            } else {
                id.clone()
            }
        };
        record.relations = record
            .relations
            .iter()
            .map(|(s, t)| (rename(s), rename(t)))
            .filter(|(s, t)| s != t)
            .collect();
    }

    if let Some(entity) = graph.entity_mut(survivor) {
        entity.aliases.extend(absorbed.aliases.iter().cloned());
        entity.aliases.insert(absorbed.name.clone());
        entity.evidence.extend(absorbed.evidence.iter().cloned());
        if entity.entity_type == lumen_core::models::EntityType::Other {
            entity.entity_type = absorbed.entity_type;
        }
    }
    graph.remove_entity(victim);
    refresh_entity(graph, documents, survivor, now);
    true
}

/// Remove entities no document mentions any more. Returns how many went.
pub fn remove_orphans(graph: &mut IndexedGraph) -> usize {
    let orphans: Vec<String> = graph
        .entities()
        .filter(|e| e.evidence.is_empty())
        .map(|e| e.id.clone())
        .collect();
    for id in &orphans {
        graph.remove_entity(id);
    }
    orphans.len()
}

/// Recompute every relation. Returns how many were visited.
pub fn refresh_all(graph: &mut IndexedGraph, params: StrengthParams, now: DateTime<Utc>) -> usize {
    let edges: Vec<EdgeIndex> = graph.edge_ids();
    for edge in &edges {
        if let Some(relation) = graph.relation_mut(*edge) {
            refresh_relation(relation, params, now);
        }
    }
    edges.len()
}
