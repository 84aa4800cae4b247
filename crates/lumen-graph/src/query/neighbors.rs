//! Direct neighbors, both incoming and outgoing.

use super::{resolve_entity, EntityRef, Neighbor};
use crate::graph::IndexedGraph;

/// Entities one hop from `reference` with strength at least `min_strength`,
/// strongest first. Ties break on name, then id.
pub fn get(graph: &IndexedGraph, reference: &str, min_strength: f64, limit: usize) -> Vec<Neighbor> {
    let Some(origin) = resolve_entity(graph, reference) else {
        return Vec::new();
    };

    let mut out: Vec<Neighbor> = graph
        .incident(&origin.id)
        .into_iter()
        .filter_map(|(edge, other, outgoing)| {
            let relation = graph.relation(edge)?;
            if relation.strength < min_strength {
                return None;
            }
            Some(Neighbor {
                entity: EntityRef::from(graph.entity(&other)?),
                relation_type: relation.relation_type.clone(),
                strength: relation.strength,
                outgoing,
                evidence_count: relation.evidence.len(),
            })
        })
        .collect();

    out.sort_by(|a, b| {
        b.strength
            .total_cmp(&a.strength)
            .then_with(|| a.entity.name.cmp(&b.entity.name))
            .then_with(|| a.entity.id.cmp(&b.entity.id))
    });
    out.truncate(limit);
    out
}
