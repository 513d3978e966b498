//! Typed accessor over the host's string-keyed preference storage.
//!
//! Every recognized setting has a defined key and default; callers never
//! touch raw keys. Storage failures degrade to defaults.

use std::sync::Arc;

use shared::host::KeyValueStore;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_MAX_HISTORY_LENGTH: usize = 20;

const KEY_API_KEY: &str = "api_key";
const KEY_MODEL: &str = "model";
const KEY_MAX_HISTORY_LENGTH: &str = "max_history_length";
const KEY_SYSTEM_PROMPT: &str = "system_prompt";

#[derive(Clone)]
pub struct SettingsStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.kv.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!("settings read failed for {key}: {e:#}");
                None
            }
        }
    }

    /// Configured credential, if any. Empty strings count as unset.
    pub fn api_key(&self) -> Option<String> {
        self.read(KEY_API_KEY)
    }

    pub fn set_api_key(&self, key: &str) -> anyhow::Result<()> {
        self.kv.set(KEY_API_KEY, key)
    }

    pub fn model(&self) -> String {
        self.read(KEY_MODEL)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string())
    }

    pub fn set_model(&self, model: &str) -> anyhow::Result<()> {
        self.kv.set(KEY_MODEL, model)
    }

    pub fn max_history_length(&self) -> usize {
        self.read(KEY_MAX_HISTORY_LENGTH)
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_HISTORY_LENGTH)
    }

    pub fn set_max_history_length(&self, max: usize) -> anyhow::Result<()> {
        self.kv.set(KEY_MAX_HISTORY_LENGTH, &max.to_string())
    }

    /// Custom persona, if the user set one. The caller supplies the
    /// built-in default.
    pub fn system_prompt(&self) -> Option<String> {
        self.read(KEY_SYSTEM_PROMPT)
    }

    pub fn set_system_prompt(&self, prompt: &str) -> anyhow::Result<()> {
        self.kv.set(KEY_SYSTEM_PROMPT, prompt)
    }
}
