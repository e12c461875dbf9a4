//! Offline generator used when no model endpoint is configured.
//!
//! It acknowledges the trainee in character and wraps the conversation up
//! once the trainee has spoken `closing_turn` times, so the full
//! attempt lifecycle works without network access.

use async_trait::async_trait;

use super::{GeneratedReply, GeneratorError, PersonaGenerator};
use crate::prompt::COMPLETION_MARKER;
use rehearsal_core::models::{ChatMessage, MessageRole};

const DEFAULT_CLOSING_TURN: usize = 3;

const FOLLOW_UPS: &[&str] = &[
    "Interesting. How would that actually work for a company like ours?",
    "I'm listening, but I need to understand the cost before going further.",
    "What happens if this doesn't deliver what you are promising?",
];

#[derive(Debug, Clone)]
pub struct ScriptedGenerator {
    closing_turn: usize,
}

impl ScriptedGenerator {
    pub fn new(closing_turn: usize) -> Self {
        Self {
            closing_turn: closing_turn.max(1),
        }
    }
}

impl Default for ScriptedGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CLOSING_TURN)
    }
}

#[async_trait]
impl PersonaGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        _system_prompt: &str,
        transcript: &[ChatMessage],
    ) -> Result<GeneratedReply, GeneratorError> {
        let last = transcript
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .ok_or_else(|| GeneratorError::Malformed("transcript has no trainee message".into()))?;
        let user_turns = transcript
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .count();

        let text = if user_turns >= self.closing_turn {
            format!(
                "Thanks, you've given me a lot to think about. Send me the proposal and let's talk next week. {COMPLETION_MARKER}"
            )
        } else {
            let follow_up = FOLLOW_UPS[(user_turns - 1) % FOLLOW_UPS.len()];
            format!("You said: \"{}\". {}", last.content.trim(), follow_up)
        };
        Ok(GeneratedReply { text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keeps_talking_before_the_closing_turn() {
        let generator = ScriptedGenerator::new(2);
        let reply = generator
            .generate("", &[ChatMessage::user("Hello, I'm from Acme")])
            .await
            .unwrap();
        assert!(reply.text.contains("Hello, I'm from Acme"));
        assert!(!reply.text.contains(COMPLETION_MARKER));
    }

    #[tokio::test]
    async fn signals_completion_on_the_closing_turn() {
        let generator = ScriptedGenerator::new(2);
        let transcript = vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("ok"),
            ChatMessage::user("second"),
        ];
        let reply = generator.generate("", &transcript).await.unwrap();
        assert!(reply.text.contains(COMPLETION_MARKER));
    }

    #[tokio::test]
    async fn rejects_transcript_without_trainee_message() {
        let generator = ScriptedGenerator::default();
        let result = generator.generate("", &[]).await;
        assert!(matches!(result, Err(GeneratorError::Malformed(_))));
    }
}
