//! Persisted conversation logs.
//!
//! One ordered message log per conversation id, capped with oldest-first
//! eviction. Reads go through a write-through cache: memory first, durable
//! storage on a cold start. Writes hit memory then storage synchronously,
//! so storage stays authoritative after a crash.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Local, TimeZone};
use parking_lot::RwLock;
use shared::host::KeyValueStore;
use shared::types::{ConversationId, Message};

use crate::settings::DEFAULT_MAX_HISTORY_LENGTH;

const KEY_PREFIX: &str = "chat_history.";

pub struct ConversationStore {
    kv: Arc<dyn KeyValueStore>,
    max_len: usize,
    cache: RwLock<HashMap<ConversationId, Vec<Message>>>,
}

impl ConversationStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, max_len: usize) -> Self {
        Self {
            kv,
            max_len,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_default_limit(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::new(kv, DEFAULT_MAX_HISTORY_LENGTH)
    }

    fn storage_key(id: &ConversationId) -> String {
        format!("{KEY_PREFIX}{id}")
    }

    /// Ordered history for a conversation. Unknown or empty ids yield an
    /// empty log; storage failures are logged and read as empty.
    pub fn get_history(&self, id: &ConversationId) -> Vec<Message> {
        if id.is_empty() {
            return Vec::new();
        }
        if let Some(messages) = self.cache.read().get(id) {
            return messages.clone();
        }

        let messages = match self.kv.get(&Self::storage_key(id)) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!(conversation = %id, "corrupt history blob: {e}");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(conversation = %id, "history read failed: {e:#}");
                return Vec::new();
            }
        };
        self.cache.write().insert(id.clone(), messages.clone());
        messages
    }

    /// Append a message with the current timestamp, evict from the front
    /// down to the cap, persist. Returns the stored message.
    pub fn add_message(&self, id: &ConversationId, role: &str, content: &str) -> Message {
        let message = Message::now(role, content);

        let mut messages = self.get_history(id);
        messages.push(message.clone());
        while messages.len() > self.max_len {
            messages.remove(0);
        }

        self.cache.write().insert(id.clone(), messages.clone());
        match serde_json::to_string(&messages) {
            Ok(json) => {
                if let Err(e) = self.kv.set(&Self::storage_key(id), &json) {
                    tracing::warn!(conversation = %id, "history write failed: {e:#}");
                }
            }
            Err(e) => tracing::warn!(conversation = %id, "history serialize failed: {e}"),
        }

        message
    }

    /// Drop both the cached and durable record. Idempotent.
    pub fn clear_history(&self, id: &ConversationId) {
        self.cache.write().remove(id);
        if let Err(e) = self.kv.clear(&Self::storage_key(id)) {
            tracing::warn!(conversation = %id, "history clear failed: {e:#}");
        }
    }

    /// Deterministic human-readable transcript.
    pub fn export_as_text(&self, id: &ConversationId) -> String {
        let mut out = format!("Chat History: {id}\n");
        out.push_str(&"=".repeat(40));
        out.push('\n');

        for message in self.get_history(id) {
            let speaker = if message.role == "user" { "You" } else { "Assistant" };
            out.push_str(&format!(
                "[{speaker}] ({})\n{}\n\n",
                format_local_timestamp(message.timestamp),
                message.content
            ));
        }
        out
    }
}

fn format_local_timestamp(epoch_ms: i64) -> String {
    match Local.timestamp_millis_opt(epoch_ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => epoch_ms.to_string(),
    }
}
