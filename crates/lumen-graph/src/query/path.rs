//! Fewest-hop path between two entities, ignoring edge direction.

use std::collections::{HashMap, VecDeque};

use super::{resolve_entity, EntityRef, GraphPath, RelationView};
use crate::graph::IndexedGraph;
use petgraph::stable_graph::EdgeIndex;

/// Breadth-first search up to `max_depth` hops. Neighbors are visited in id
/// order so equal-length alternatives resolve the same way every time.
pub fn shortest(graph: &IndexedGraph, from: &str, to: &str, max_depth: usize) -> Option<GraphPath> {
    let start = resolve_entity(graph, from)?;
    let goal = resolve_entity(graph, to)?;
    if start.id == goal.id {
        return Some(GraphPath {
            entities: vec![start.into()],
            relations: Vec::new(),
            strength: 1.0,
        });
    }

    let mut parent: HashMap<String, (String, EdgeIndex)> = HashMap::new();
    let mut queue: VecDeque<(String, usize)> = VecDeque::from([(start.id.clone(), 0)]);
    let mut found = false;

    'search: while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        let mut next = graph.incident(&current);
        next.sort_by(|a, b| a.1.cmp(&b.1));
        for (edge, other, _) in next {
            if other == start.id || parent.contains_key(&other) {
                continue;
            }
            parent.insert(other.clone(), (current.clone(), edge));
            if other == goal.id {
                found = true;
                break 'search;
            }
            queue.push_back((other, depth + 1));
        }
    }
    if !found {
        return None;
    }

    let mut entities = vec![EntityRef::from(goal)];
    let mut relations = Vec::new();
    let mut cursor = goal.id.clone();
    while let Some((prev, edge)) = parent.get(&cursor) {
        let relation = graph.relation(*edge)?;
        relations.push(RelationView::build(graph, relation)?);
        entities.push(EntityRef::from(graph.entity(prev)?));
        cursor = prev.clone();
    }
    entities.reverse();
    relations.reverse();
    let strength = relations.iter().map(|r| r.strength).product();
    Some(GraphPath {
        entities,
        relations,
        strength,
    })
}
