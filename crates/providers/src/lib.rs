pub mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use shared::agent_api::{ContentBlock, ModelReply};
use shared::error::ChatError;

/// Stateless call to the remote model. Behind a trait so the orchestrator
/// can be driven by a fake in tests.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn send(&self, blocks: Vec<ContentBlock>) -> Result<ModelReply, ChatError>;
}
