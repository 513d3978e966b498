//! Core data model: documents in scope, conversation identity, messages.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A document selected into the chat context. Immutable once selected;
/// identity is `document_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub document_id: String,
    pub title: String,
    pub has_extractable_text: bool,
}

/// Stable conversation identity derived from the sorted document ids of a
/// context set. Re-selecting the same documents in any order resolves to
/// the same conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn from_document_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ids: Vec<String> = ids.into_iter().map(|s| s.as_ref().to_string()).collect();
        ids.sort();
        Self(ids.join("_"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The ordered set of documents currently in scope for a conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextSet {
    documents: Vec<DocumentRef>,
}

impl ContextSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(documents: Vec<DocumentRef>) -> Self {
        let mut set = Self::new();
        for doc in documents {
            set.push(doc);
        }
        set
    }

    /// Append a document, ignoring duplicates by id.
    pub fn push(&mut self, doc: DocumentRef) {
        if !self.documents.iter().any(|d| d.document_id == doc.document_id) {
            self.documents.push(doc);
        }
    }

    /// Replace the whole selection.
    pub fn replace(&mut self, documents: Vec<DocumentRef>) {
        self.documents.clear();
        for doc in documents {
            self.push(doc);
        }
    }

    pub fn documents(&self) -> &[DocumentRef] {
        &self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// At least one member claims extractable text.
    pub fn has_extractable(&self) -> bool {
        self.documents.iter().any(|d| d.has_extractable_text)
    }

    pub fn conversation_id(&self) -> ConversationId {
        ConversationId::from_document_ids(self.documents.iter().map(|d| d.document_id.as_str()))
    }
}

/// One message in a conversation log. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// "user" | "assistant" | "system"
    pub role: String,
    pub content: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl Message {
    pub fn now(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> DocumentRef {
        DocumentRef {
            document_id: id.to_string(),
            title: format!("Paper {id}"),
            has_extractable_text: true,
        }
    }

    #[test]
    fn conversation_id_ignores_selection_order() {
        let a = ContextSet::from_documents(vec![doc("b"), doc("a"), doc("c")]);
        let b = ContextSet::from_documents(vec![doc("c"), doc("b"), doc("a")]);
        assert_eq!(a.conversation_id(), b.conversation_id());
        assert_eq!(a.conversation_id().as_str(), "a_b_c");
    }

    #[test]
    fn push_dedupes_by_id() {
        let mut set = ContextSet::new();
        set.push(doc("a"));
        set.push(doc("a"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn adding_a_document_changes_identity() {
        let mut set = ContextSet::from_documents(vec![doc("a"), doc("b")]);
        let before = set.conversation_id();
        set.push(doc("c"));
        assert_ne!(before, set.conversation_id());
    }
}
