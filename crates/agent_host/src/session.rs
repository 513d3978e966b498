//! Session-scoped state: the active context set and the combined-text
//! cache derived from it.
//!
//! Owned explicitly by the hosting session and handed to the orchestrator
//! at construction; torn down with the session. Any mutation of the
//! context set conservatively invalidates the whole combined cache rather
//! than tracking per-document staleness.

use shared::types::{ContextSet, ConversationId, DocumentRef};

/// Cached result of a multi-document extraction pass, keyed to the
/// conversation identity it was computed for.
#[derive(Debug, Clone)]
pub struct CombinedCache {
    pub conversation_id: ConversationId,
    pub text: String,
    pub extracted_count: usize,
}

#[derive(Debug, Default)]
pub struct SessionContext {
    context_set: ContextSet,
    combined: Option<CombinedCache>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: Vec<DocumentRef>) -> Self {
        Self {
            context_set: ContextSet::from_documents(documents),
            combined: None,
        }
    }

    pub fn context_set(&self) -> &ContextSet {
        &self.context_set
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.context_set.conversation_id()
    }

    /// Append a document. Returns false for a duplicate id. Either way the
    /// set may have a new identity, so the combined cache is dropped.
    pub fn add_document(&mut self, doc: DocumentRef) -> bool {
        let before = self.context_set.len();
        self.context_set.push(doc);
        self.invalidate_combined();
        self.context_set.len() > before
    }

    /// Replace the whole selection (new user selection in the host UI).
    pub fn replace_documents(&mut self, documents: Vec<DocumentRef>) {
        self.context_set.replace(documents);
        self.invalidate_combined();
    }

    /// Cached combined text, but only when it still matches the current
    /// conversation identity.
    pub fn cached_combined(&self) -> Option<&CombinedCache> {
        self.combined
            .as_ref()
            .filter(|c| c.conversation_id == self.conversation_id())
    }

    pub fn store_combined(&mut self, cache: CombinedCache) {
        self.combined = Some(cache);
    }

    pub fn invalidate_combined(&mut self) {
        self.combined = None;
    }
}
