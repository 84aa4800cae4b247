//! StableGraph wrapper with id and name indices.

use std::collections::{BTreeSet, HashMap};

use lumen_core::models::{Entity, Relation};
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};

/// Entity graph with O(1) lookup by entity id and by normalized name.
///
/// Relations are stored once per unordered entity pair; the edge direction
/// records which entity was mentioned first.
#[derive(Debug, Default)]
pub struct IndexedGraph {
    pub graph: StableGraph<Entity, Relation, Directed>,
    pub node_index: HashMap<String, NodeIndex>,
    /// Normalized name to ids of entities carrying it (homonyms).
    pub by_key: HashMap<String, BTreeSet<String>>,
}

impl IndexedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&mut self, entity: Entity) -> NodeIndex {
        let id = entity.id.clone();
        let key = entity.key.clone();
        let idx = self.graph.add_node(entity);
        self.node_index.insert(id.clone(), idx);
        self.by_key.entry(key).or_default().insert(id);
        idx
    }

    pub fn get_node(&self, id: &str) -> Option<NodeIndex> {
        self.node_index.get(id).copied()
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.get_node(id).and_then(|idx| self.graph.node_weight(idx))
    }

    pub fn entity_mut(&mut self, id: &str) -> Option<&mut Entity> {
        let idx = self.get_node(id)?;
        self.graph.node_weight_mut(idx)
    }

    /// Remove an entity and every relation touching it.
    pub fn remove_entity(&mut self, id: &str) -> Option<Entity> {
        let idx = self.node_index.remove(id)?;
        let entity = self.graph.remove_node(idx)?;
        if let Some(ids) = self.by_key.get_mut(&entity.key) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_key.remove(&entity.key);
            }
        }
        Some(entity)
    }

    /// Entities sharing the normalized name `key`.
    pub fn candidates(&self, key: &str) -> Vec<&Entity> {
        self.by_key
            .get(key)
            .map(|ids| ids.iter().filter_map(|id| self.entity(id)).collect())
            .unwrap_or_default()
    }

    /// The relation between `a` and `b` in either direction.
    pub fn find_relation(&self, a: &str, b: &str) -> Option<EdgeIndex> {
        let (ia, ib) = (self.get_node(a)?, self.get_node(b)?);
        self.graph
            .find_edge(ia, ib)
            .or_else(|| self.graph.find_edge(ib, ia))
    }

    pub fn relation(&self, edge: EdgeIndex) -> Option<&Relation> {
        self.graph.edge_weight(edge)
    }

    pub fn relation_mut(&mut self, edge: EdgeIndex) -> Option<&mut Relation> {
        self.graph.edge_weight_mut(edge)
    }

    /// Insert `relation` between its source and target. Both must exist.
    pub fn add_relation(&mut self, relation: Relation) -> Option<EdgeIndex> {
        let s = self.get_node(&relation.source)?;
        let t = self.get_node(&relation.target)?;
        Some(self.graph.add_edge(s, t, relation))
    }

    pub fn remove_relation(&mut self, edge: EdgeIndex) -> Option<Relation> {
        self.graph.remove_edge(edge)
    }

    /// Relations touching `id` in both directions, with the id of the entity
    /// on the other end and whether the edge points away from `id`.
    pub fn incident(&self, id: &str) -> Vec<(EdgeIndex, String, bool)> {
        let Some(idx) = self.get_node(id) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for (direction, outgoing) in [(Direction::Outgoing, true), (Direction::Incoming, false)] {
            for edge in self.graph.edges_directed(idx, direction) {
                let other = if outgoing { edge.target() } else { edge.source() };
                if let Some(node) = self.graph.node_weight(other) {
                    out.push((edge.id(), node.id.clone(), outgoing));
                }
            }
        }
        out
    }

    pub fn entity_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn relation_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.graph
            .node_indices()
            .filter_map(move |idx| self.graph.node_weight(idx))
    }

    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.graph
            .edge_indices()
            .filter_map(move |idx| self.graph.edge_weight(idx))
    }

    pub fn edge_ids(&self) -> Vec<EdgeIndex> {
        self.graph.edge_indices().collect()
    }
}
