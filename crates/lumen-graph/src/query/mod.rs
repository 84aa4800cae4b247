//! Typed graph queries.
//!
//! Every query has a cache key derived from its parameters, so identical
//! queries against the same graph version share one cached result.

pub mod neighbors;
pub mod path;
pub mod search;

use chrono::NaiveDate;
use lumen_core::config::GraphConfig;
use lumen_core::models::{Entity, EntityType, Relation, ValidTime};
use serde::{Deserialize, Serialize};

use crate::extraction::normalize_name;
use crate::graph::IndexedGraph;

/// Time filter for relation search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "window", rename_all = "snake_case")]
pub enum TimeWindow {
    Any,
    /// Relations valid on this day.
    At { date: NaiveDate },
    /// Relations whose validity intersects `[from, to]`.
    Range { from: NaiveDate, to: NaiveDate },
}

impl TimeWindow {
    /// Relations with no valid-time range match only when `include_untimed`.
    pub fn matches(&self, valid_time: Option<ValidTime>, include_untimed: bool) -> bool {
        match (self, valid_time) {
            (TimeWindow::Any, _) => true,
            (_, None) => include_untimed,
            (TimeWindow::At { date }, Some(vt)) => vt.contains(*date),
            (TimeWindow::Range { from, to }, Some(vt)) => vt.overlaps(*from, *to),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum GraphQuery {
    /// Entities one hop away, strongest first. `limit` 0 uses the configured default.
    Neighbors {
        entity: String,
        min_strength: f64,
        limit: usize,
    },
    /// Fewest-hop path. `max_depth` 0 uses the configured default.
    Path {
        from: String,
        to: String,
        max_depth: usize,
    },
    /// One entity with its relations and evidence documents.
    EntityDetail { entity: String },
    /// Entities of one type, most mentioned first.
    EntitiesByType {
        entity_type: EntityType,
        name_prefix: Option<String>,
        limit: usize,
    },
    /// Relations filtered by validity window, optionally by entity and label.
    Relations {
        entity: Option<String>,
        relation_type: Option<String>,
        window: TimeWindow,
        include_untimed: bool,
    },
}

impl GraphQuery {
    pub fn neighbors(entity: impl Into<String>) -> Self {
        GraphQuery::Neighbors {
            entity: entity.into(),
            min_strength: 0.0,
            limit: 0,
        }
    }

    pub fn path(from: impl Into<String>, to: impl Into<String>) -> Self {
        GraphQuery::Path {
            from: from.into(),
            to: to.into(),
            max_depth: 0,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GraphQuery::Neighbors { .. } => "neighbors",
            GraphQuery::Path { .. } => "path",
            GraphQuery::EntityDetail { .. } => "entity_detail",
            GraphQuery::EntitiesByType { .. } => "entities_by_type",
            GraphQuery::Relations { .. } => "relations",
        }
    }

    /// Same query, with entity references case- and space-folded.
    fn canonical(&self) -> GraphQuery {
        let fold = |s: &String| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        match self {
            GraphQuery::Neighbors {
                entity,
                min_strength,
                limit,
            } => GraphQuery::Neighbors {
                entity: fold(entity),
                min_strength: *min_strength,
                limit: *limit,
            },
            GraphQuery::Path {
                from,
                to,
                max_depth,
            } => GraphQuery::Path {
                from: fold(from),
                to: fold(to),
                max_depth: *max_depth,
            },
            GraphQuery::EntityDetail { entity } => GraphQuery::EntityDetail {
                entity: fold(entity),
            },
            GraphQuery::EntitiesByType {
                entity_type,
                name_prefix,
                limit,
            } => GraphQuery::EntitiesByType {
                entity_type: *entity_type,
                name_prefix: name_prefix.as_ref().map(|p| normalize_name(p)),
                limit: *limit,
            },
            GraphQuery::Relations {
                entity,
                relation_type,
                window,
                include_untimed,
            } => GraphQuery::Relations {
                entity: entity.as_ref().map(fold),
                relation_type: relation_type.as_ref().map(|r| r.to_lowercase()),
                window: *window,
                include_untimed: *include_untimed,
            },
        }
    }

    pub fn cache_key(&self) -> String {
        lumen_cache::fingerprint("graph-query", &self.canonical())
    }
}

/// Compact reference to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
    pub name: String,
    pub entity_type: EntityType,
}

impl From<&Entity> for EntityRef {
    fn from(e: &Entity) -> Self {
        Self {
            id: e.id.clone(),
            name: e.name.clone(),
            entity_type: e.entity_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationView {
    pub source: EntityRef,
    pub target: EntityRef,
    pub relation_type: String,
    pub strength: f64,
    pub evidence: Vec<String>,
    pub valid_time: Option<ValidTime>,
}

impl RelationView {
    pub(crate) fn build(graph: &IndexedGraph, relation: &Relation) -> Option<Self> {
        Some(Self {
            source: graph.entity(&relation.source)?.into(),
            target: graph.entity(&relation.target)?.into(),
            relation_type: relation.relation_type.clone(),
            strength: relation.strength,
            evidence: relation.evidence_ids().cloned().collect(),
            valid_time: relation.valid_time,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub entity: EntityRef,
    pub relation_type: String,
    pub strength: f64,
    /// Whether the relation points from the queried entity to this one.
    pub outgoing: bool,
    pub evidence_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphPath {
    pub entities: Vec<EntityRef>,
    pub relations: Vec<RelationView>,
    /// Product of relation strengths along the path.
    pub strength: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDetail {
    pub entity: Entity,
    pub relations: Vec<RelationView>,
    pub documents: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum GraphQueryResult {
    Neighbors { items: Vec<Neighbor> },
    Path { path: Option<GraphPath> },
    EntityDetail { detail: Option<EntityDetail> },
    Entities { items: Vec<EntityRef> },
    Relations { items: Vec<RelationView> },
}

/// A query result with cache provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphAnswer {
    pub result: GraphQueryResult,
    pub cached: bool,
    pub cache_key: String,
    pub graph_version: u64,
}

/// Resolve an entity reference: an entity id, else the most-mentioned entity
/// with that normalized name.
pub fn resolve_entity<'g>(graph: &'g IndexedGraph, reference: &str) -> Option<&'g Entity> {
    let trimmed = reference.trim();
    if let Some(e) = graph.entity(trimmed) {
        return Some(e);
    }
    graph
        .candidates(&normalize_name(trimmed))
        .into_iter()
        .max_by(|a, b| a.mentions.cmp(&b.mentions).then_with(|| b.id.cmp(&a.id)))
}

/// Run `query` against `graph`.
pub fn execute(graph: &IndexedGraph, query: &GraphQuery, config: &GraphConfig) -> GraphQueryResult {
    match query {
        GraphQuery::Neighbors {
            entity,
            min_strength,
            limit,
        } => {
            let limit = if *limit == 0 { config.neighbor_limit } else { *limit };
            GraphQueryResult::Neighbors {
                items: neighbors::get(graph, entity, *min_strength, limit),
            }
        }
        GraphQuery::Path {
            from,
            to,
            max_depth,
        } => {
            let depth = if *max_depth == 0 {
                config.max_traversal_depth
            } else {
                *max_depth
            };
            GraphQueryResult::Path {
                path: path::shortest(graph, from, to, depth),
            }
        }
        GraphQuery::EntityDetail { entity } => GraphQueryResult::EntityDetail {
            detail: search::detail(graph, entity),
        },
        GraphQuery::EntitiesByType {
            entity_type,
            name_prefix,
            limit,
        } => GraphQueryResult::Entities {
            items: search::by_type(graph, *entity_type, name_prefix.as_deref(), *limit),
        },
        GraphQuery::Relations {
            entity,
            relation_type,
            window,
            include_untimed,
        } => GraphQueryResult::Relations {
            items: search::relations(
                graph,
                entity.as_deref(),
                relation_type.as_deref(),
                *window,
                *include_untimed,
            ),
        },
    }
}
