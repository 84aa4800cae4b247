use std::sync::Arc;

use lumen_core::errors::LumenResult;
use lumen_core::models::{Document, StageResult};

/// Mutable view of the document a stage works on.
pub struct StageContext<'a> {
    pub document: &'a mut Document,
    note: Option<String>,
}

impl<'a> StageContext<'a> {
    pub fn new(document: &'a mut Document) -> Self {
        Self {
            document,
            note: None,
        }
    }

    /// Attach a note to this stage's trail entry. A later call replaces it.
    pub fn note(&mut self, note: impl Into<String>) {
        self.note = Some(note.into());
    }

    pub(crate) fn take_note(&mut self) -> Option<String> {
        self.note.take()
    }
}

/// One preprocessing step.
///
/// `Rejected` and `Duplicate` are ordinary outcomes; `Err` means the stage
/// itself failed and the document gets an error status.
pub trait Stage: Send + Sync {
    /// Unique within a pipeline; used in the stage trail and by the builder.
    fn name(&self) -> &'static str;

    fn execute(&self, ctx: &mut StageContext<'_>) -> LumenResult<StageResult>;
}

impl<S: Stage + ?Sized> Stage for Arc<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn execute(&self, ctx: &mut StageContext<'_>) -> LumenResult<StageResult> {
        (**self).execute(ctx)
    }
}
