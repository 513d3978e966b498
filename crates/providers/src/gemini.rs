//! Gemini model gateway.
//!
//! Stateless per call: serializes content blocks to the generateContent
//! wire shape with fixed generation parameters and permissive safety
//! thresholds, and maps failures onto the shared error taxonomy so the
//! orchestrator can tell auth, quota, and safety rejections apart.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::agent_api::{ContentBlock, ModelReply, Part, TokenUsage};
use shared::error::ChatError;

use crate::ModelGateway;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const MAX_ERROR_BODY_CHARS: usize = 800;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<GeminiInlineData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    top_p: f64,
    top_k: u32,
    max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
        }
    }
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

fn permissive_safety_settings() -> Vec<SafetySetting> {
    const CATEGORIES: [&str; 4] = [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ];
    CATEGORIES
        .iter()
        .map(|category| SafetySetting {
            category,
            threshold: "BLOCK_NONE",
        })
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self, ChatError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(45))
            .build()
            .map_err(|e| ChatError::Model(format!("http client init failed: {e}")))?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point at a different endpoint (proxies, test servers).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

fn build_request(blocks: &[ContentBlock]) -> GeminiRequest {
    let contents = blocks
        .iter()
        .map(|block| GeminiContent {
            role: block.role.as_str().to_string(),
            parts: block
                .parts
                .iter()
                .map(|part| match part {
                    Part::Text(text) => GeminiPart {
                        text: Some(text.clone()),
                        inline_data: None,
                    },
                    Part::InlineData { mime_type, data } => GeminiPart {
                        text: None,
                        inline_data: Some(GeminiInlineData {
                            mime_type: mime_type.clone(),
                            data: data.clone(),
                        }),
                    },
                })
                .collect(),
        })
        .collect();

    GeminiRequest {
        contents,
        generation_config: GenerationConfig::default(),
        safety_settings: permissive_safety_settings(),
    }
}

/// Map a non-2xx status onto the error taxonomy. 401/403 mean the
/// credential was rejected; 429 is quota; everything else is transport.
fn classify_http_failure(status: u16, body: &str) -> ChatError {
    let body = body.trim();
    let message = if body.is_empty() {
        format!("HTTP {status}")
    } else if body.len() > MAX_ERROR_BODY_CHARS {
        let mut cut = MAX_ERROR_BODY_CHARS;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    };

    match status {
        401 | 403 => ChatError::Auth(message),
        429 => ChatError::RateLimited(message),
        _ => ChatError::Transport { status, message },
    }
}

/// First candidate, first text part only. Multi-part and multi-candidate
/// responses are not aggregated.
fn parse_reply(response: GeminiResponse) -> Result<ModelReply, ChatError> {
    let usage = response.usage_metadata.map(|u| TokenUsage {
        prompt_tokens: u.prompt_token_count,
        completion_tokens: u.candidates_token_count,
        total_tokens: u.total_token_count,
    });

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(ChatError::Model("no response generated".to_string()));
    };

    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return Err(ChatError::SafetyBlocked);
    }

    let text = candidate
        .content
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ChatError::Model("no response generated".to_string()))?;

    Ok(ModelReply { text, usage })
}

#[async_trait]
impl ModelGateway for GeminiClient {
    async fn send(&self, blocks: Vec<ContentBlock>) -> Result<ModelReply, ChatError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let request = build_request(&blocks);

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ChatError::Transport {
                status: 0,
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), model = %self.model, "model call failed");
            return Err(classify_http_failure(status.as_u16(), &body));
        }

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ChatError::Model(format!("invalid response: {e}")))?;
        parse_reply(body)
    }
}
