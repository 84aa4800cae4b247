//! Entity detail, type-filtered entity search, and time-filtered relation search.

use lumen_core::models::EntityType;

use super::{resolve_entity, EntityDetail, EntityRef, RelationView, TimeWindow};
use crate::extraction::normalize_name;
use crate::graph::IndexedGraph;

fn by_strength(a: &RelationView, b: &RelationView) -> std::cmp::Ordering {
    b.strength
        .total_cmp(&a.strength)
        .then_with(|| a.source.id.cmp(&b.source.id))
        .then_with(|| a.target.id.cmp(&b.target.id))
}

pub fn detail(graph: &IndexedGraph, reference: &str) -> Option<EntityDetail> {
    let entity = resolve_entity(graph, reference)?;
    let mut relations: Vec<RelationView> = graph
        .incident(&entity.id)
        .into_iter()
        .filter_map(|(edge, _, _)| RelationView::build(graph, graph.relation(edge)?))
        .collect();
    relations.sort_by(by_strength);
    Some(EntityDetail {
        entity: entity.clone(),
        relations,
        documents: entity.evidence.iter().cloned().collect(),
    })
}

/// Entities of `entity_type` whose normalized name starts with `name_prefix`,
/// most mentioned first. `limit` 0 means no limit.
pub fn by_type(
    graph: &IndexedGraph,
    entity_type: EntityType,
    name_prefix: Option<&str>,
    limit: usize,
) -> Vec<EntityRef> {
    let prefix = name_prefix.map(normalize_name);
    let mut hits: Vec<_> = graph
        .entities()
        .filter(|e| e.entity_type == entity_type)
        .filter(|e| prefix.as_deref().map_or(true, |p| e.key.starts_with(p)))
        .collect();
    hits.sort_by(|a, b| {
        b.mentions
            .cmp(&a.mentions)
            .then_with(|| a.key.cmp(&b.key))
            .then_with(|| a.id.cmp(&b.id))
    });
    if limit > 0 {
        hits.truncate(limit);
    }
    hits.into_iter().map(EntityRef::from).collect()
}

pub fn relations(
    graph: &IndexedGraph,
    entity: Option<&str>,
    relation_type: Option<&str>,
    window: TimeWindow,
    include_untimed: bool,
) -> Vec<RelationView> {
    let anchor = match entity {
        Some(reference) => match resolve_entity(graph, reference) {
            Some(e) => Some(e.id.clone()),
            None => return Vec::new(),
        },
        None => None,
    };
    let label = relation_type.map(str::to_lowercase);

    let mut out: Vec<RelationView> = graph
        .relations()
        .filter(|r| {
            anchor
                .as_ref()
                .map_or(true, |id| &r.source == id || &r.target == id)
        })
        .filter(|r| label.as_ref().map_or(true, |l| &r.relation_type == l))
        .filter(|r| window.matches(r.valid_time, include_untimed))
        .filter_map(|r| RelationView::build(graph, r))
        .collect();
    out.sort_by(by_strength);
    out
}
