//! Persona-response generators.
//!
//! The orchestrator only sees the [`PersonaGenerator`] trait. Failures are
//! reported as [`GeneratorError`] and never reach the trainee: the caller
//! swaps in a fallback line and keeps the conversation going.

mod openai;
mod scripted;

use async_trait::async_trait;
use rehearsal_core::models::ChatMessage;

pub use openai::OpenAiGenerator;
pub use scripted::ScriptedGenerator;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReply {
    pub text: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("generator timed out after {0}s")]
    Timeout(u64),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generator returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed generator response: {0}")]
    Malformed(String),

    #[error("generator returned an empty reply")]
    Empty,
}

#[async_trait]
pub trait PersonaGenerator: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Produces the persona's next line given the system prompt and the
    /// transcript so far (ending with the trainee's latest message).
    async fn generate(
        &self,
        system_prompt: &str,
        transcript: &[ChatMessage],
    ) -> Result<GeneratedReply, GeneratorError>;
}
