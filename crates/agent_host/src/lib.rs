//! Conversation core for the document chat assistant.
//!
//! This crate owns the per-turn logic: assembling bounded prompts from
//! extracted document text plus history, driving the turn state machine,
//! and keeping the session's context-set cache coherent. The host UI talks
//! to [`orchestrator::ChatOrchestrator`] and renders what comes back.

pub mod context_builder;
pub mod orchestrator;
pub mod prompts;
pub mod session;
