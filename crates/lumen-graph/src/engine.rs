//! KnowledgeGraph: owns the entity graph behind a single RwLock.
//!
//! Text extraction runs before any lock is taken; only the commit of a
//! document's entities and relations holds the write lock. Queries share the
//! read lock. Each committed mutation bumps the graph version under the lock
//! and is then published to listeners.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use lumen_cache::{Dependencies, TtlCache};
use lumen_core::config::GraphConfig;
use lumen_core::constants::{GRAPH_SCHEMA_VERSION, GRAPH_SNAPSHOT_FORMAT};
use lumen_core::errors::{LumenError, LumenResult, StorageError};
use lumen_core::models::{
    Entity, EntityType, EvidenceStats, MergeDecision, MergeReason, MutationEvent, Relation,
};
use lumen_core::snapshot;
use lumen_core::traits::IMutationListener;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::disambiguation::{homonym_overlap, resolve};
use crate::extraction::{extract, normalize_name, Extraction};
use crate::graph::maintenance::{
    combine_evidence, entity_confidence, merge_entities, refresh_all, refresh_entity,
    refresh_relation, remove_orphans, upgrade_label,
};
use crate::graph::{DocumentRecord, IndexedGraph};
use crate::query::{self, resolve_entity, EntityRef, GraphAnswer, GraphQuery, GraphQueryResult, RelationView};
use crate::strength::StrengthParams;

const STORE_NAME: &str = "knowledge-graph";

/// Cache for graph query results, shared with the retrieval layer's cache
/// invalidation wiring.
pub type GraphQueryCache = TtlCache<String, GraphQueryResult>;

#[derive(Debug, Default)]
struct GraphState {
    graph: IndexedGraph,
    documents: BTreeMap<String, DocumentRecord>,
    audit: Vec<MergeDecision>,
    next_entity: u64,
}

/// Outcome of merging one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeReport {
    pub document_id: String,
    pub entities_created: usize,
    pub entities_merged: usize,
    pub relations_touched: usize,
    /// Whether an earlier contribution of the same document was replaced.
    pub replaced: bool,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebuildReport {
    pub entities_merged: usize,
    pub orphans_removed: usize,
    pub relations_recomputed: usize,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub entities: usize,
    pub relations: usize,
    pub documents: usize,
    pub audit_entries: usize,
    pub version: u64,
    pub available: bool,
}

#[derive(Serialize, Deserialize)]
struct GraphSnapshot {
    version: u64,
    next_entity: u64,
    entities: Vec<Entity>,
    relations: Vec<Relation>,
    documents: BTreeMap<String, DocumentRecord>,
    audit: Vec<MergeDecision>,
}

/// A checked graph snapshot waiting to replace the live graph.
pub struct StagedGraph {
    path: String,
    version: u64,
    state: GraphState,
}

impl StagedGraph {
    pub fn entity_count(&self) -> usize {
        self.state.graph.entity_count()
    }
}

/// Per-document view of one normalized name.
struct KeyGroup {
    name: String,
    entity_type: EntityType,
    surfaces: BTreeSet<String>,
    count: u64,
}

pub struct KnowledgeGraph {
    config: GraphConfig,
    state: RwLock<GraphState>,
    version: AtomicU64,
    available: AtomicBool,
    listeners: RwLock<Vec<Arc<dyn IMutationListener>>>,
    query_cache: Option<Arc<GraphQueryCache>>,
}

impl KnowledgeGraph {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            state: RwLock::new(GraphState::default()),
            version: AtomicU64::new(0),
            available: AtomicBool::new(true),
            listeners: RwLock::new(Vec::new()),
            query_cache: None,
        }
    }

    /// Cache query results in `cache`. The cache is also subscribed to this
    /// graph's mutations.
    pub fn with_query_cache(mut self, cache: Arc<GraphQueryCache>) -> Self {
        if let Ok(listeners) = self.listeners.get_mut() {
            listeners.push(cache.clone());
        }
        self.query_cache = Some(cache);
        self
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }

    /// Mark the store (un)available. While unavailable every operation fails
    /// with `StorageError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    pub fn subscribe(&self, listener: Arc<dyn IMutationListener>) -> LumenResult<()> {
        self.listeners
            .write()
            .map_err(|e| LumenError::ConcurrencyError(e.to_string()))?
            .push(listener);
        Ok(())
    }

    fn params(&self) -> StrengthParams {
        StrengthParams::from(&self.config)
    }

    fn ensure_available(&self) -> LumenResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(StorageError::Unavailable {
                store: STORE_NAME.to_string(),
            }
            .into())
        }
    }

    fn read(&self) -> LumenResult<RwLockReadGuard<'_, GraphState>> {
        self.ensure_available()?;
        self.state
            .read()
            .map_err(|e| LumenError::ConcurrencyError(e.to_string()))
    }

    fn write(&self) -> LumenResult<RwLockWriteGuard<'_, GraphState>> {
        self.ensure_available()?;
        self.state
            .write()
            .map_err(|e| LumenError::ConcurrencyError(e.to_string()))
    }

    fn next_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn publish(&self, event: MutationEvent) {
        match self.listeners.read() {
            Ok(listeners) => {
                for l in listeners.iter() {
                    l.on_mutation(&event);
                }
            }
            Err(e) => warn!(error = %e, "listener registry poisoned, event dropped"),
        }
    }

    // ── Incremental merge ────────────────────────────────────────────────

    /// Merge one document's entities and relations into the graph.
    ///
    /// Merging a document id that is already present replaces its earlier
    /// contribution.
    pub fn merge_document(
        &self,
        document_id: &str,
        text: &str,
        credibility: f64,
    ) -> LumenResult<MergeReport> {
        if document_id.trim().is_empty() {
            return Err(LumenError::ValidationError(
                "document id must not be empty".into(),
            ));
        }
        let _span = info_span!("lumen.graph.merge", document_id).entered();
        let extraction = extract(text, self.config.sentence_window);
        let credibility = if credibility.is_finite() {
            credibility.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let (report, version) = {
            let mut state = self.write()?;
            let now = Utc::now();
            let replaced = retract_locked(&mut state, document_id, self.params(), now);
            let mut report = self.commit(&mut state, document_id, &extraction, credibility, now);
            report.replaced = replaced;
            let version = self.next_version();
            report.version = version;
            (report, version)
        };

        debug!(
            document_id,
            created = report.entities_created,
            merged = report.entities_merged,
            relations = report.relations_touched,
            version,
            "document merged into graph"
        );
        self.publish(MutationEvent::GraphMerged {
            document_id: document_id.to_string(),
            version,
        });
        Ok(report)
    }

    fn commit(
        &self,
        state: &mut GraphState,
        document_id: &str,
        extraction: &Extraction,
        credibility: f64,
        now: DateTime<Utc>,
    ) -> MergeReport {
        let mut groups: BTreeMap<String, KeyGroup> = BTreeMap::new();
        for m in &extraction.mentions {
            let group = groups.entry(m.key.clone()).or_insert_with(|| KeyGroup {
                name: m.name.clone(),
                entity_type: EntityType::Other,
                surfaces: BTreeSet::new(),
                count: 0,
            });
            if group.entity_type == EntityType::Other {
                group.entity_type = m.entity_type;
            }
            group.surfaces.insert(m.name.clone());
            group.count += 1;
        }
        let keys: BTreeSet<String> = groups.keys().cloned().collect();

        let mut record = DocumentRecord {
            credibility,
            ..DocumentRecord::default()
        };
        let mut key_to_entity: BTreeMap<String, String> = BTreeMap::new();
        let mut created = 0;
        let mut merged = 0;

        for (key, group) in &groups {
            let mut context = keys.clone();
            context.remove(key);

            let resolution = {
                let candidates = state.graph.candidates(key);
                resolve(&candidates, group.entity_type, &context, self.config.merge_threshold)
            };
            let chosen = match &resolution.merge_into {
                Some(id) => {
                    merged += 1;
                    if let Some(entity) = state.graph.entity_mut(id) {
                        entity.aliases.extend(group.surfaces.iter().cloned());
                        entity.evidence.insert(document_id.to_string());
                        if entity.entity_type == EntityType::Other {
                            entity.entity_type = group.entity_type;
                        }
                    }
                    id.clone()
                }
                None => {
                    created += 1;
                    state.next_entity += 1;
                    let id = format!("ent-{:06}", state.next_entity);
                    state.graph.add_entity(Entity {
                        id: id.clone(),
                        name: group.name.clone(),
                        key: key.clone(),
                        entity_type: group.entity_type,
                        aliases: group.surfaces.clone(),
                        confidence: entity_confidence(1),
                        evidence: BTreeSet::from([document_id.to_string()]),
                        context: BTreeSet::new(),
                        mentions: 0,
                        created_at: now,
                        updated_at: now,
                    });
                    id
                }
            };

            state.audit.push(MergeDecision {
                normalized_name: key.clone(),
                mention_type: group.entity_type,
                document_id: Some(document_id.to_string()),
                candidate_id: resolution.candidate.clone(),
                chosen_id: chosen.clone(),
                merged: resolution.merge_into.is_some(),
                overlap: resolution.overlap,
                reason: resolution.reason,
                timestamp: now,
            });
            let mention = record.mentions.entry(chosen.clone()).or_default();
            mention.count += group.count;
            mention.context.extend(context);
            key_to_entity.insert(key.clone(), chosen);
        }

        // Fold pair evidence per entity pair, in first-seen orientation.
        let mut pairs: BTreeMap<(String, String), (EvidenceStats, String)> = BTreeMap::new();
        for pair in &extraction.pairs {
            let (Some(a), Some(b)) = (
                extraction.mentions.get(pair.first).and_then(|m| key_to_entity.get(&m.key)),
                extraction.mentions.get(pair.second).and_then(|m| key_to_entity.get(&m.key)),
            ) else {
                continue;
            };
            if a == b {
                continue;
            }
            let stats = EvidenceStats {
                mentions: 1,
                min_distance: pair.distance,
                credibility,
                valid_time: pair.valid_time,
            };
            let reversed = (b.clone(), a.clone());
            let key = if pairs.contains_key(&reversed) {
                reversed
            } else {
                (a.clone(), b.clone())
            };
            pairs
                .entry(key)
                .and_modify(|(e, label)| {
                    *e = combine_evidence(*e, stats);
                    upgrade_label(label, &pair.relation_type);
                })
                .or_insert((stats, pair.relation_type.clone()));
        }

        let params = self.params();
        for ((a, b), (stats, label)) in &pairs {
            match state.graph.find_relation(a, b) {
                Some(edge) => {
                    if let Some(relation) = state.graph.relation_mut(edge) {
                        relation.evidence.insert(document_id.to_string(), *stats);
                        upgrade_label(&mut relation.relation_type, label);
                        refresh_relation(relation, params, now);
                    }
                }
                None => {
                    let mut relation = Relation {
                        source: a.clone(),
                        target: b.clone(),
                        relation_type: label.clone(),
                        strength: 0.0,
                        evidence: BTreeMap::from([(document_id.to_string(), *stats)]),
                        valid_time: None,
                        updated_at: now,
                    };
                    refresh_relation(&mut relation, params, now);
                    state.graph.add_relation(relation);
                }
            }
            record.relations.insert((a.clone(), b.clone()));
        }

        let touched: Vec<String> = record.mentions.keys().cloned().collect();
        state.documents.insert(document_id.to_string(), record);
        for id in &touched {
            refresh_entity(&mut state.graph, &state.documents, id, now);
        }

        MergeReport {
            document_id: document_id.to_string(),
            entities_created: created,
            entities_merged: merged,
            relations_touched: pairs.len(),
            replaced: false,
            version: 0,
        }
    }

    /// Remove one document's contribution. Entities and relations left with
    /// no evidence are removed. Returns false if the document was never merged.
    pub fn retract_document(&self, document_id: &str) -> LumenResult<bool> {
        let version = {
            let mut state = self.write()?;
            if !retract_locked(&mut state, document_id, self.params(), Utc::now()) {
                return Ok(false);
            }
            self.next_version()
        };
        debug!(document_id, version, "document retracted from graph");
        self.publish(MutationEvent::GraphRetracted {
            document_id: document_id.to_string(),
            version,
        });
        Ok(true)
    }

    // ── Rebuild ──────────────────────────────────────────────────────────

    /// Global disambiguation and strength repair under an exclusive lock.
    ///
    /// Same-named entities whose accumulated contexts or evidence now overlap
    /// are merged; every relation strength and valid-time is recomputed.
    pub fn rebuild(&self) -> LumenResult<RebuildReport> {
        let _span = info_span!("lumen.graph.rebuild").entered();
        let params = self.params();
        let report = {
            let mut state = self.write()?;
            let now = Utc::now();
            let GraphState {
                graph,
                documents,
                audit,
                ..
            } = &mut *state;

            let mut keys: Vec<String> = graph
                .by_key
                .iter()
                .filter(|(_, ids)| ids.len() > 1)
                .map(|(k, _)| k.clone())
                .collect();
            keys.sort();

            let mut entities_merged = 0;
            for key in keys {
                // Most-mentioned first, so it survives.
                let mut ranked: Vec<(u64, String)> = graph
                    .candidates(&key)
                    .into_iter()
                    .map(|e| (e.mentions, e.id.clone()))
                    .collect();
                ranked.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
                let ids: Vec<String> = ranked.into_iter().map(|(_, id)| id).collect();

                for i in 0..ids.len() {
                    for j in (i + 1)..ids.len() {
                        let (survivor, victim) = (&ids[i], &ids[j]);
                        let overlap = match (graph.entity(survivor), graph.entity(victim)) {
                            (Some(s), Some(v)) => homonym_overlap(s, v, self.config.merge_threshold),
                            _ => None,
                        };
                        let Some(overlap) = overlap else {
                            continue;
                        };
                        let mention_type = graph
                            .entity(victim)
                            .map_or(EntityType::Other, |e| e.entity_type);
                        if merge_entities(graph, documents, survivor, victim, params, now) {
                            entities_merged += 1;
                            audit.push(MergeDecision {
                                normalized_name: key.clone(),
                                mention_type,
                                document_id: None,
                                candidate_id: Some(victim.clone()),
                                chosen_id: survivor.clone(),
                                merged: true,
                                overlap,
                                reason: MergeReason::Rebuild,
                                timestamp: now,
                            });
                        }
                    }
                }
            }

            let orphans_removed = remove_orphans(graph);
            let relations_recomputed = refresh_all(graph, params, now);
            let version = self.next_version();
            RebuildReport {
                entities_merged,
                orphans_removed,
                relations_recomputed,
                version,
            }
        };

        info!(
            merged = report.entities_merged,
            orphans = report.orphans_removed,
            relations = report.relations_recomputed,
            version = report.version,
            "graph rebuilt"
        );
        self.publish(MutationEvent::GraphRebuilt {
            version: report.version,
        });
        Ok(report)
    }

    // ── Queries ──────────────────────────────────────────────────────────

    /// Run a query on the blocking pool, bounded by `query_timeout_ms`.
    pub async fn query_with_timeout(self: &Arc<Self>, query: GraphQuery) -> LumenResult<GraphAnswer> {
        let millis = self.config.query_timeout_ms;
        let graph = Arc::clone(self);
        let task = tokio::task::spawn_blocking(move || graph.query(&query));
        match tokio::time::timeout(Duration::from_millis(millis), task).await {
            Ok(joined) => joined
                .map_err(|e| LumenError::ConcurrencyError(format!("graph query task failed: {e}")))?,
            Err(_) => Err(LumenError::Timeout {
                operation: "graph query".into(),
                millis,
            }),
        }
    }

    /// Run a typed query, consulting the query cache when one is attached.
    pub fn query(&self, query: &GraphQuery) -> LumenResult<GraphAnswer> {
        let cache_key = query.cache_key();
        let state = self.read()?;
        let graph_version = self.version();
        let deps = Dependencies::graph(graph_version);

        if let Some(cache) = &self.query_cache {
            if let Some(result) = cache.get(&cache_key, &deps) {
                return Ok(GraphAnswer {
                    result,
                    cached: true,
                    cache_key,
                    graph_version,
                });
            }
        }

        let result = query::execute(&state.graph, query, &self.config);
        drop(state);
        let result = match &self.query_cache {
            Some(cache) => cache.insert_if_absent(cache_key.clone(), result, deps),
            None => result,
        };
        debug!(kind = query.kind(), graph_version, "graph query executed");
        Ok(GraphAnswer {
            result,
            cached: false,
            cache_key,
            graph_version,
        })
    }

    /// Existing entities mentioned in `text`, resolved by name.
    pub fn entities_in_text(&self, text: &str) -> LumenResult<Vec<EntityRef>> {
        let keys = extract(text, 0).keys();
        let state = self.read()?;
        Ok(keys
            .iter()
            .filter_map(|k| resolve_entity(&state.graph, k))
            .map(EntityRef::from)
            .collect())
    }

    /// Documents that mention the entity `reference` resolves to.
    pub fn documents_for(&self, reference: &str) -> LumenResult<BTreeSet<String>> {
        let state = self.read()?;
        Ok(resolve_entity(&state.graph, reference)
            .map(|e| e.evidence.clone())
            .unwrap_or_default())
    }

    pub fn entity(&self, reference: &str) -> LumenResult<Option<Entity>> {
        let state = self.read()?;
        Ok(resolve_entity(&state.graph, reference).cloned())
    }

    /// The relation between two entity references, in either direction.
    pub fn relation_between(&self, a: &str, b: &str) -> LumenResult<Option<RelationView>> {
        let state = self.read()?;
        let (Some(ea), Some(eb)) = (
            resolve_entity(&state.graph, a),
            resolve_entity(&state.graph, b),
        ) else {
            return Ok(None);
        };
        Ok(state
            .graph
            .find_relation(&ea.id, &eb.id)
            .and_then(|edge| state.graph.relation(edge))
            .and_then(|r| RelationView::build(&state.graph, r)))
    }

    /// Disambiguation decisions, optionally only those for one document,
    /// oldest first.
    pub fn merge_audit(&self, document_id: Option<&str>) -> LumenResult<Vec<MergeDecision>> {
        let state = self.read()?;
        Ok(state
            .audit
            .iter()
            .filter(|d| document_id.map_or(true, |id| d.document_id.as_deref() == Some(id)))
            .cloned()
            .collect())
    }

    /// Decisions for one normalized name.
    pub fn merge_audit_for_name(&self, name: &str) -> LumenResult<Vec<MergeDecision>> {
        let key = normalize_name(name);
        let state = self.read()?;
        Ok(state
            .audit
            .iter()
            .filter(|d| d.normalized_name == key)
            .cloned()
            .collect())
    }

    pub fn stats(&self) -> LumenResult<GraphStats> {
        let available = self.is_available();
        let state = self
            .state
            .read()
            .map_err(|e| LumenError::ConcurrencyError(e.to_string()))?;
        Ok(GraphStats {
            entities: state.graph.entity_count(),
            relations: state.graph.relation_count(),
            documents: state.documents.len(),
            audit_entries: state.audit.len(),
            version: self.version(),
            available,
        })
    }

    // ── Snapshots ────────────────────────────────────────────────────────

    pub fn save(&self, path: &Path) -> LumenResult<()> {
        let state = self.read()?;
        let body = GraphSnapshot {
            version: self.version(),
            next_entity: state.next_entity,
            entities: state.graph.entities().cloned().collect(),
            relations: state.graph.relations().cloned().collect(),
            documents: state.documents.clone(),
            audit: state.audit.clone(),
        };
        let header = snapshot::write_file(
            path,
            GRAPH_SNAPSHOT_FORMAT,
            GRAPH_SCHEMA_VERSION,
            body.entities.len(),
            &body,
        )?;
        info!(
            path = %path.display(),
            entities = header.entries,
            relations = body.relations.len(),
            "graph snapshot saved"
        );
        Ok(())
    }

    /// Replace the graph with a snapshot. The version never moves backwards.
    pub fn load(&self, path: &Path) -> LumenResult<()> {
        let staged = self.stage_load(path)?;
        self.commit_load(staged)
    }

    /// Read a snapshot and rebuild its graph without touching the live one.
    pub fn stage_load(&self, path: &Path) -> LumenResult<StagedGraph> {
        let (_, body): (_, GraphSnapshot) =
            snapshot::read_file(path, GRAPH_SNAPSHOT_FORMAT, GRAPH_SCHEMA_VERSION)?;

        let mut graph = IndexedGraph::new();
        for entity in body.entities {
            graph.add_entity(entity);
        }
        for relation in body.relations {
            let (source, target) = (relation.source.clone(), relation.target.clone());
            if graph.add_relation(relation).is_none() {
                return Err(StorageError::Corrupted {
                    details: format!("relation {source} -> {target} references a missing entity"),
                }
                .into());
            }
        }
        Ok(StagedGraph {
            path: path.display().to_string(),
            version: body.version,
            state: GraphState {
                graph,
                documents: body.documents,
                audit: body.audit,
                next_entity: body.next_entity,
            },
        })
    }

    /// Swap in a graph read by [`stage_load`](Self::stage_load).
    pub fn commit_load(&self, staged: StagedGraph) -> LumenResult<()> {
        let StagedGraph {
            path,
            version: snapshot_version,
            state: loaded,
        } = staged;
        let entities = loaded.graph.entity_count();
        let version = {
            let mut state = self.write()?;
            *state = loaded;
            self.version.fetch_max(snapshot_version, Ordering::AcqRel);
            self.next_version()
        };
        info!(path = %path, entities, version, "graph snapshot loaded");
        self.publish(MutationEvent::GraphLoaded { version });
        Ok(())
    }
}

/// Undo a document's contribution with the write lock held.
fn retract_locked(
    state: &mut GraphState,
    document_id: &str,
    params: StrengthParams,
    now: DateTime<Utc>,
) -> bool {
    let Some(record) = state.documents.remove(document_id) else {
        return false;
    };

    for (a, b) in &record.relations {
        let Some(edge) = state.graph.find_relation(a, b) else {
            continue;
        };
        let now_empty = match state.graph.relation_mut(edge) {
            Some(relation) => {
                relation.evidence.remove(document_id);
                refresh_relation(relation, params, now);
                relation.evidence.is_empty()
            }
            None => false,
        };
        if now_empty {
            state.graph.remove_relation(edge);
        }
    }

    for id in record.mentions.keys() {
        let emptied = match state.graph.entity_mut(id) {
            Some(entity) => {
                entity.evidence.remove(document_id);
                entity.evidence.is_empty()
            }
            None => continue,
        };
        if emptied {
            state.graph.remove_entity(id);
        } else {
            refresh_entity(&mut state.graph, &state.documents, id, now);
        }
    }
    true
}
