//! Error taxonomy for the chat core.
//!
//! Every user-visible failure maps to one of these variants; the UI renders
//! them as short role-tagged chat messages. Storage failures are the one
//! exception: they are logged and degraded to empty reads, never surfaced.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// No API credential configured for the remote model.
    #[error("no API key configured - paste your Gemini API key into the chat to set it")]
    MissingCredential,

    /// The active context set has no document with extractable text.
    #[error("no documents with extractable text are selected")]
    NoDocuments,

    /// All extraction strategies failed for one document. Contained
    /// per-document; a multi-document turn embeds this inline instead of
    /// aborting.
    #[error("could not extract text: {0}")]
    ExtractionFailed(String),

    /// The remote endpoint rejected our credential.
    #[error("API key rejected: {0}")]
    Auth(String),

    /// Quota or rate limit hit on the remote endpoint.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The model refused the request on safety grounds.
    #[error("response blocked by safety filters")]
    SafetyBlocked,

    /// Non-2xx HTTP status outside the auth/rate-limit cases.
    #[error("model endpoint error ({status}): {message}")]
    Transport { status: u16, message: String },

    /// The call succeeded at the HTTP level but produced no usable reply.
    #[error("model error: {0}")]
    Model(String),

    /// Persistence read/write failure. Logged and treated as empty
    /// history; never shown to the user.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ChatError {
    /// True for the variants that mean "your credential is the problem".
    pub fn is_auth(&self) -> bool {
        matches!(self, ChatError::MissingCredential | ChatError::Auth(_))
    }
}
