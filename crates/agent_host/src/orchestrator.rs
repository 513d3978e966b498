//! Turn state machine.
//!
//! Drives one chat turn end to end: precondition guards, extraction on
//! cache miss, the model call, reference parsing, and history updates.
//! One turn is in flight at a time system-wide; submits while busy are
//! dropped, not queued. Every failure path resolves back to `Idle` before
//! the outcome is returned.

use std::sync::Arc;

use parking_lot::Mutex;
use providers::ModelGateway;
use services::extraction::{TextExtractor, DEFAULT_MAX_DOC_TOKENS};
use services::history::ConversationStore;
use services::references::extract_references;
use services::settings::SettingsStore;
use shared::agent_api::TokenUsage;
use shared::error::ChatError;
use shared::host::{HostDocumentStore, KeyValueStore, ViewerBridge};
use shared::types::{ConversationId, DocumentRef, Message};

use crate::context_builder::{build_content_blocks, ImageAttachment};
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use crate::session::{CombinedCache, SessionContext};

/// Structural shape of a pasted Gemini API key.
const API_KEY_PREFIX: &str = "AIza";
const API_KEY_MIN_LEN: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    Extracting,
    Querying,
}

/// One assistant reply plus the page references parsed out of it.
#[derive(Debug, Clone)]
pub struct AssistantTurn {
    pub text: String,
    pub references: Vec<u32>,
    pub usage: Option<TokenUsage>,
}

/// What one submit produced.
#[derive(Debug)]
pub enum TurnOutcome {
    /// Empty or whitespace-only input; dropped silently.
    Ignored,
    /// Another turn is in flight; this submit was dropped.
    Busy,
    /// The input was a pasted API key; consumed as configuration.
    CredentialSaved { masked: String },
    Reply(AssistantTurn),
    /// Guard or model-call failure, already classified. The user message
    /// of a failed turn is not persisted.
    Failed(ChatError),
}

pub struct ChatOrchestrator {
    session: Arc<Mutex<SessionContext>>,
    extractor: TextExtractor,
    gateway: Arc<dyn ModelGateway>,
    store: ConversationStore,
    settings: SettingsStore,
    state: Mutex<ChatState>,
}

/// Resets the state machine to Idle when a turn ends, however it ends.
struct TurnGuard<'a> {
    state: &'a Mutex<ChatState>,
}

impl TurnGuard<'_> {
    fn enter(&self, phase: ChatState) {
        *self.state.lock() = phase;
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        *self.state.lock() = ChatState::Idle;
    }
}

impl ChatOrchestrator {
    pub fn new(
        session: Arc<Mutex<SessionContext>>,
        docs: Arc<dyn HostDocumentStore>,
        viewer: Arc<dyn ViewerBridge>,
        gateway: Arc<dyn ModelGateway>,
        kv: Arc<dyn KeyValueStore>,
    ) -> Self {
        let settings = SettingsStore::new(kv.clone());
        let store = ConversationStore::new(kv, settings.max_history_length());
        Self {
            session,
            extractor: TextExtractor::new(docs, viewer),
            gateway,
            store,
            settings,
            state: Mutex::new(ChatState::Idle),
        }
    }

    pub fn state(&self) -> ChatState {
        *self.state.lock()
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.session.lock().conversation_id()
    }

    pub async fn send_message(&self, input: &str) -> TurnOutcome {
        self.send_message_with_images(input, &[]).await
    }

    pub async fn send_message_with_images(
        &self,
        input: &str,
        images: &[ImageAttachment],
    ) -> TurnOutcome {
        let input = input.trim();
        if input.is_empty() {
            return TurnOutcome::Ignored;
        }

        // Claim the single in-flight slot before running the remaining
        // guards; released by the guard's Drop on every exit path.
        let turn = {
            let mut state = self.state.lock();
            if *state != ChatState::Idle {
                return TurnOutcome::Busy;
            }
            *state = ChatState::Extracting;
            TurnGuard { state: &self.state }
        };

        let api_key = self.settings.api_key();
        if api_key.is_none() && looks_like_api_key(input) {
            return match self.settings.set_api_key(input) {
                Ok(()) => TurnOutcome::CredentialSaved {
                    masked: mask_key(input),
                },
                Err(e) => {
                    tracing::warn!("failed to store pasted API key: {e:#}");
                    TurnOutcome::Failed(ChatError::Storage(e.to_string()))
                }
            };
        }
        if api_key.is_none() {
            return TurnOutcome::Failed(ChatError::MissingCredential);
        }

        let (documents, conversation_id, cached) = {
            let session = self.session.lock();
            if !session.context_set().has_extractable() {
                return TurnOutcome::Failed(ChatError::NoDocuments);
            }
            (
                session.context_set().documents().to_vec(),
                session.conversation_id(),
                session.cached_combined().cloned(),
            )
        };

        // Extracting: refresh the combined text only on a cache miss.
        let combined = match cached {
            Some(cache) => cache,
            None => {
                let fresh = self
                    .extractor
                    .extract_many(&documents, DEFAULT_MAX_DOC_TOKENS);
                let cache = CombinedCache {
                    conversation_id: conversation_id.clone(),
                    text: fresh.text,
                    extracted_count: fresh.extracted_count,
                };
                self.session.lock().store_combined(cache.clone());
                cache
            }
        };

        turn.enter(ChatState::Querying);
        let history = self.store.get_history(&conversation_id);
        let system_prompt = self
            .settings
            .system_prompt()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        let blocks =
            build_content_blocks(input, &combined.text, &history, &system_prompt, images);

        match self.gateway.send(blocks).await {
            Ok(reply) => {
                let references = extract_references(&reply.text);
                self.store.add_message(&conversation_id, "user", input);
                self.store.add_message(&conversation_id, "assistant", &reply.text);
                TurnOutcome::Reply(AssistantTurn {
                    text: reply.text,
                    references,
                    usage: reply.usage,
                })
            }
            Err(e) => {
                let e = classify_failure(e);
                tracing::warn!(conversation = %conversation_id, "model call failed: {e}");
                TurnOutcome::Failed(e)
            }
        }
    }

    /// Append a document mid-conversation. The conversation identity
    /// changes and the combined-text cache is dropped, forcing
    /// re-extraction on the next turn; prior logs stay retrievable under
    /// their old identity. Returns an informational notice for the UI.
    pub fn add_document(&self, doc: DocumentRef) -> String {
        let title = doc.title.clone();
        let added = self.session.lock().add_document(doc);
        if added {
            format!("Added \"{title}\" to the conversation. Its text will be read on your next question.")
        } else {
            format!("\"{title}\" is already part of the conversation.")
        }
    }

    /// Replace the whole selection (the user picked a new set of papers).
    pub fn replace_documents(&self, documents: Vec<DocumentRef>) {
        self.session.lock().replace_documents(documents);
    }

    pub fn history(&self) -> Vec<Message> {
        self.store.get_history(&self.conversation_id())
    }

    pub fn clear_conversation(&self) {
        self.store.clear_history(&self.conversation_id());
    }

    pub fn export_transcript(&self) -> String {
        self.store.export_as_text(&self.conversation_id())
    }
}

fn looks_like_api_key(input: &str) -> bool {
    input.starts_with(API_KEY_PREFIX)
        && input.len() >= API_KEY_MIN_LEN
        && !input.contains(char::is_whitespace)
}

// Character-based, not byte-based: the length heuristic admits
// multi-byte input and a byte slice could land mid-character.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let head: String = chars.iter().take(6).collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("{head}...{tail}")
}

/// Keep auth classification for errors that arrive untyped: a generic
/// model error whose message mentions HTTP 403 or the API key is really
/// a credential problem.
fn classify_failure(error: ChatError) -> ChatError {
    match error {
        ChatError::Model(message)
            if message.contains("403") || message.to_lowercase().contains("api key") =>
        {
            ChatError::Auth(message)
        }
        other => other,
    }
}
