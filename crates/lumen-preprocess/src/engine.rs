//! Preprocessor: the ordered stage driver.

use std::sync::Arc;
use std::time::Instant;

use lumen_core::config::PreprocessConfig;
use lumen_core::errors::{LumenError, LumenResult};
use lumen_core::models::{Document, Lifecycle, StageResult};
use tracing::{debug, warn};

use crate::dedup::SemanticDedup;
use crate::metadata::MetadataUnify;
use crate::normalize::Normalize;
use crate::quality::QualityAssess;
use crate::safety::SafetyFilter;
use crate::stage::{Stage, StageContext};

/// Runs stages in order until one does not accept the document.
pub struct Preprocessor {
    stages: Vec<Box<dyn Stage>>,
}

impl std::fmt::Debug for Preprocessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preprocessor")
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Preprocessor {
    pub fn builder() -> PreprocessorBuilder {
        PreprocessorBuilder::default()
    }

    /// The five standard stages in their standard order.
    pub fn standard(config: &PreprocessConfig, dedup: Arc<SemanticDedup>) -> LumenResult<Self> {
        PreprocessorBuilder::standard(config, dedup)?.build()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage against `doc`, recording each outcome in its trail.
    ///
    /// Returns the first non-accepting result (and sets the lifecycle to
    /// rejected or superseded), or `Accepted` once every stage passed. A stage
    /// error is recorded, marks the document rejected, and is returned.
    pub fn run(&self, doc: &mut Document) -> LumenResult<StageResult> {
        for stage in &self.stages {
            let started = Instant::now();
            let (outcome, note) = {
                let mut ctx = StageContext::new(doc);
                let outcome = stage.execute(&mut ctx);
                (outcome, ctx.take_note())
            };
            let elapsed_us = started.elapsed().as_micros() as u64;

            match outcome {
                Ok(result) => {
                    debug!(
                        document_id = %doc.id,
                        stage = stage.name(),
                        elapsed_us,
                        result = ?result,
                        "stage complete"
                    );
                    doc.record_stage(stage.name(), result.clone(), note);
                    match &result {
                        StageResult::Accepted => continue,
                        StageResult::Rejected { reason } => {
                            doc.lifecycle = Lifecycle::Rejected {
                                reason: reason.clone(),
                            };
                        }
                        StageResult::Duplicate { of_id } => {
                            doc.lifecycle = Lifecycle::Superseded { by: of_id.clone() };
                        }
                    }
                    return Ok(result);
                }
                Err(e) => {
                    warn!(
                        document_id = %doc.id,
                        stage = stage.name(),
                        error = %e,
                        "stage failed"
                    );
                    let reason = format!("{} stage failed", stage.name());
                    doc.record_stage(
                        stage.name(),
                        StageResult::rejected(reason.clone()),
                        Some(e.to_string()),
                    );
                    doc.lifecycle = Lifecycle::Rejected { reason };
                    return Err(e);
                }
            }
        }
        Ok(StageResult::Accepted)
    }
}

/// Composes a stage list. Names must be unique.
#[derive(Default)]
pub struct PreprocessorBuilder {
    stages: Vec<Box<dyn Stage>>,
}

impl PreprocessorBuilder {
    /// normalize, safety, quality, metadata, dedup.
    pub fn standard(config: &PreprocessConfig, dedup: Arc<SemanticDedup>) -> LumenResult<Self> {
        Ok(Self::default()
            .add(Normalize)
            .add(SafetyFilter::new(&config.custom_safety_patterns)?)
            .add(QualityAssess::new(config))
            .add(MetadataUnify)
            .add(dedup))
    }

    /// Append a stage.
    pub fn add(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Insert a stage at `position` (clamped to the end).
    pub fn insert(mut self, position: usize, stage: impl Stage + 'static) -> Self {
        let at = position.min(self.stages.len());
        self.stages.insert(at, Box::new(stage));
        self
    }

    /// Drop the stage named `name`, if present.
    pub fn remove(mut self, name: &str) -> Self {
        self.stages.retain(|s| s.name() != name);
        self
    }

    /// Put the named stages first, in the given order; the others follow in
    /// their current relative order.
    pub fn reorder(mut self, names: &[&str]) -> LumenResult<Self> {
        let mut ordered = Vec::with_capacity(self.stages.len());
        for name in names {
            let pos = self
                .stages
                .iter()
                .position(|s| s.name() == *name)
                .ok_or_else(|| LumenError::ConfigError(format!("unknown stage {name:?}")))?;
            ordered.push(self.stages.remove(pos));
        }
        ordered.append(&mut self.stages);
        self.stages = ordered;
        Ok(self)
    }

    pub fn build(self) -> LumenResult<Preprocessor> {
        let mut seen = std::collections::BTreeSet::new();
        for stage in &self.stages {
            if !seen.insert(stage.name()) {
                return Err(LumenError::ConfigError(format!(
                    "duplicate stage {:?}",
                    stage.name()
                )));
            }
        }
        Ok(Preprocessor {
            stages: self.stages,
        })
    }
}
