//! Decide whether a mention joins an existing same-named entity.
//!
//! A candidate qualifies only with a compatible type. Among qualifying
//! candidates the one with the highest context overlap (overlap coefficient of
//! co-mentioned names) wins if it reaches the threshold. When either side has
//! no context yet, type agreement alone decides.

use std::collections::BTreeSet;

use lumen_core::models::{Entity, EntityType, MergeReason};
use lumen_core::similarity::overlap_coefficient;

/// Outcome of resolving one mention against its candidates.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Entity to merge into, or `None` to create a new one.
    pub merge_into: Option<String>,
    /// Best candidate considered, merged or not.
    pub candidate: Option<String>,
    pub overlap: f64,
    pub reason: MergeReason,
}

fn rank(a: &(&Entity, f64), b: &(&Entity, f64)) -> std::cmp::Ordering {
    b.1.total_cmp(&a.1)
        .then_with(|| b.0.mentions.cmp(&a.0.mentions))
        .then_with(|| a.0.id.cmp(&b.0.id))
}

/// Resolve a mention of type `mention_type` with co-mention `context` against
/// entities sharing its normalized name.
pub fn resolve(
    candidates: &[&Entity],
    mention_type: EntityType,
    context: &BTreeSet<String>,
    threshold: f64,
) -> Resolution {
    if candidates.is_empty() {
        return Resolution {
            merge_into: None,
            candidate: None,
            overlap: 0.0,
            reason: MergeReason::NoCandidate,
        };
    }

    let compatible: Vec<&Entity> = candidates
        .iter()
        .copied()
        .filter(|c| c.entity_type.is_compatible(&mention_type))
        .collect();
    if compatible.is_empty() {
        let best = candidates
            .iter()
            .max_by(|a, b| a.mentions.cmp(&b.mentions).then_with(|| b.id.cmp(&a.id)));
        return Resolution {
            merge_into: None,
            candidate: best.map(|c| c.id.clone()),
            overlap: 0.0,
            reason: MergeReason::TypeMismatch,
        };
    }

    let mut with_context: Vec<(&Entity, f64)> = compatible
        .iter()
        .filter(|c| !c.context.is_empty() && !context.is_empty())
        .map(|c| (*c, overlap_coefficient(&c.context, context)))
        .collect();
    with_context.sort_by(rank);

    if let Some((best, overlap)) = with_context.first() {
        if *overlap >= threshold {
            return Resolution {
                merge_into: Some(best.id.clone()),
                candidate: Some(best.id.clone()),
                overlap: *overlap,
                reason: MergeReason::ContextOverlap,
            };
        }
    }

    let mut contextless: Vec<(&Entity, f64)> = compatible
        .iter()
        .filter(|c| c.context.is_empty() || context.is_empty())
        .map(|c| (*c, 0.0))
        .collect();
    contextless.sort_by(rank);
    if let Some((best, _)) = contextless.first() {
        return Resolution {
            merge_into: Some(best.id.clone()),
            candidate: Some(best.id.clone()),
            overlap: 0.0,
            reason: MergeReason::NoContext,
        };
    }

    let (best, overlap) = with_context
        .first()
        .map(|(e, o)| (Some(e.id.clone()), *o))
        .unwrap_or((None, 0.0));
    Resolution {
        merge_into: None,
        candidate: best,
        overlap,
        reason: MergeReason::BelowThreshold,
    }
}

/// Overlap between two same-named entities if they may be merged during a
/// rebuild, `None` otherwise.
pub fn homonym_overlap(a: &Entity, b: &Entity, threshold: f64) -> Option<f64> {
    if a.key != b.key || !a.entity_type.is_compatible(&b.entity_type) {
        return None;
    }
    if a.context.is_empty() || b.context.is_empty() {
        return Some(0.0);
    }
    let overlap = overlap_coefficient(&a.context, &b.context).max(overlap_coefficient(&a.evidence, &b.evidence));
    (overlap >= threshold).then_some(overlap)
}
