use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Coarse entity type used for disambiguation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Person,
    Organization,
    Location,
    Concept,
    Other,
}

impl EntityType {
    /// `Other` is an unknown type and is compatible with anything.
    pub fn is_compatible(&self, other: &EntityType) -> bool {
        self == other || *self == EntityType::Other || *other == EntityType::Other
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Person => "person",
            EntityType::Organization => "organization",
            EntityType::Location => "location",
            EntityType::Concept => "concept",
            EntityType::Other => "other",
        }
    }
}

/// A node of the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    /// Canonical display name (the first spelling seen).
    pub name: String,
    /// Normalized name used for candidate lookup.
    pub key: String,
    pub entity_type: EntityType,
    pub aliases: BTreeSet<String>,
    pub confidence: f64,
    /// Ids of documents mentioning this entity.
    pub evidence: BTreeSet<String>,
    /// Normalized names of entities co-mentioned with this one.
    pub context: BTreeSet<String>,
    pub mentions: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-document evidence backing a relation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvidenceStats {
    pub mentions: u32,
    /// Smallest token distance between the two mentions in the document.
    pub min_distance: u32,
    /// Credibility score of the evidence document.
    pub credibility: f64,
    /// Temporal range stated in the evidence sentence, if any.
    pub valid_time: Option<ValidTime>,
}

/// Interval during which a relation holds. Open ends are unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidTime {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl ValidTime {
    pub fn contains(&self, at: NaiveDate) -> bool {
        self.start.map_or(true, |s| s <= at) && self.end.map_or(true, |e| at <= e)
    }

    /// Whether this interval intersects `[from, to]`.
    pub fn overlaps(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.start.map_or(true, |s| s <= to) && self.end.map_or(true, |e| from <= e)
    }

    /// Smallest interval covering both.
    pub fn union(&self, other: &ValidTime) -> ValidTime {
        let start = match (self.start, other.start) {
            (Some(a), Some(b)) => Some(a.min(b)),
            _ => None,
        };
        let end = match (self.end, other.end) {
            (Some(a), Some(b)) => Some(a.max(b)),
            _ => None,
        };
        ValidTime { start, end }
    }
}

/// A directed, typed, weighted edge between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub target: String,
    pub relation_type: String,
    /// In [0, 1].
    pub strength: f64,
    /// Evidence keyed by document id.
    pub evidence: BTreeMap<String, EvidenceStats>,
    pub valid_time: Option<ValidTime>,
    pub updated_at: DateTime<Utc>,
}

impl Relation {
    pub fn evidence_ids(&self) -> impl Iterator<Item = &String> {
        self.evidence.keys()
    }

    /// A relation without a valid-time range holds at every point.
    pub fn valid_at(&self, at: NaiveDate) -> bool {
        self.valid_time.map_or(true, |vt| vt.contains(at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn other_is_compatible_with_everything() {
        assert!(EntityType::Other.is_compatible(&EntityType::Person));
        assert!(EntityType::Location.is_compatible(&EntityType::Other));
        assert!(!EntityType::Location.is_compatible(&EntityType::Person));
    }

    #[test]
    fn valid_time_open_ends() {
        let since = ValidTime {
            start: Some(d(1889, 3, 31)),
            end: None,
        };
        assert!(since.contains(d(2020, 1, 1)));
        assert!(!since.contains(d(1880, 1, 1)));
        assert!(since.overlaps(d(1800, 1, 1), d(1890, 1, 1)));
        assert!(!since.overlaps(d(1800, 1, 1), d(1850, 1, 1)));
    }

    #[test]
    fn union_widens_and_opens() {
        let a = ValidTime {
            start: Some(d(2000, 1, 1)),
            end: Some(d(2005, 1, 1)),
        };
        let b = ValidTime {
            start: Some(d(2003, 1, 1)),
            end: None,
        };
        let u = a.union(&b);
        assert_eq!(u.start, Some(d(2000, 1, 1)));
        assert_eq!(u.end, None);
    }
}
