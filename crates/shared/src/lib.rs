pub mod error;
pub mod host;
pub mod types;

pub mod agent_api {
    use serde::{Deserialize, Serialize};

    /// Roles the remote model understands. The app's "assistant" and
    /// "system" roles both map onto `Model` when history is replayed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum Role {
        User,
        Model,
    }

    impl Role {
        pub fn as_str(&self) -> &'static str {
            match self {
                Role::User => "user",
                Role::Model => "model",
            }
        }
    }

    /// One part of a content block: plain text, or inline binary data
    /// (images) carried as base64.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Part {
        Text(String),
        InlineData { mime_type: String, data: String },
    }

    /// One turn in the request payload sent to the model.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ContentBlock {
        pub role: Role,
        pub parts: Vec<Part>,
    }

    impl ContentBlock {
        pub fn text(role: Role, text: impl Into<String>) -> Self {
            Self {
                role,
                parts: vec![Part::Text(text.into())],
            }
        }
    }

    /// Token accounting reported by the model endpoint.
    #[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
    pub struct TokenUsage {
        pub prompt_tokens: u32,
        pub completion_tokens: u32,
        pub total_tokens: u32,
    }

    /// A successful model response: reply text plus usage if the
    /// endpoint reported it.
    #[derive(Debug, Clone)]
    pub struct ModelReply {
        pub text: String,
        pub usage: Option<TokenUsage>,
    }
}
