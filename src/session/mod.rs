//! Session state for one refinement run.
//!
//! The session owns the current style document and published style id. It is
//! mutated only by the refinement loop; documents are swapped whole, never
//! edited in place, and iteration records are append-only.

mod record;
mod stage;

pub use record::{ArtifactRef, IterationRecord};
pub use stage::{SessionState, Stage};

use crate::render::StyleId;
use crate::style::StyleDocument;

/// Mutable state of a run.
#[derive(Debug)]
pub struct Session {
    pub id: String,
    document: StyleDocument,
    style_id: Option<StyleId>,
    state: SessionState,
    iteration: u32,
    caption: Option<String>,
    records: Vec<IterationRecord>,
}

impl Session {
    pub fn new(document: StyleDocument) -> Self {
        Self {
            id: crate::id::generate_session_id(),
            document,
            style_id: None,
            state: SessionState::Init,
            iteration: 0,
            caption: None,
            records: Vec::new(),
        }
    }

    pub fn document(&self) -> &StyleDocument {
        &self.document
    }

    /// Hand the document to an applier by value, leaving a clone behind until
    /// the replacement is installed.
    pub fn document_snapshot(&self) -> StyleDocument {
        self.document.clone()
    }

    /// Install a fully built replacement document.
    pub fn replace_document(&mut self, document: StyleDocument) {
        self.document = document;
    }

    pub fn style_id(&self) -> Option<&StyleId> {
        self.style_id.as_ref()
    }

    pub fn set_style_id(&mut self, style_id: StyleId) {
        self.style_id = Some(style_id);
    }

    pub fn transition(&mut self, next: SessionState) {
        log::debug!("Session {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }

    /// Current iteration (1 once the first design render exists).
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    pub fn advance_iteration(&mut self) -> u32 {
        self.iteration += 1;
        self.iteration
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn set_caption(&mut self, caption: String) {
        self.caption = Some(caption);
    }

    pub fn push_record(&mut self, record: IterationRecord) {
        self.records.push(record);
    }

    pub fn into_parts(self) -> (StyleDocument, Option<StyleId>, Vec<IterationRecord>) {
        (self.document, self.style_id, self.records)
    }
}
