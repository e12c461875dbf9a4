//! The chat-attempt state machine.
//!
//! Per (user, case) the slot moves `NoAttempt -> InProgress -> Complete`, and
//! abandoning drops it back to `NoAttempt`. Every turn is persisted with one
//! versioned write; the final turn, the result and the progress bump commit
//! together.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use rehearsal_core::models::{Attempt, AttemptState, Case, ChatMessage};
use rehearsal_core::{Database, StoreError};

use crate::config::CoachConfig;
use crate::generator::{GeneratorError, PersonaGenerator};
use crate::prompt::{build_system_prompt, split_completion_marker};
use crate::scoring::{evaluate, Scorer};

/// Result block shown to the trainee when a conversation ends.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TurnResult {
    pub stars: u8,
    pub score: u8,
    pub report: String,
    pub total_attempts: u32,
    pub best_score: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub attempt_id: Uuid,
    pub assistant_message: String,
    pub conversation_history: Vec<ChatMessage>,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TurnResult>,
}

/// Resume payload for a case.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentAttempt {
    pub has_attempt: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_id: Option<Uuid>,
    pub state: AttemptState,
    pub messages: Vec<ChatMessage>,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TurnResult>,
}

impl CurrentAttempt {
    fn none() -> Self {
        Self {
            has_attempt: false,
            attempt_id: None,
            state: AttemptState::NoAttempt,
            messages: Vec::new(),
            is_complete: false,
            result: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AbandonOutcome {
    pub deleted_count: usize,
}

/// One finished attempt in the history listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub attempt_id: Uuid,
    pub score: Option<u8>,
    pub stars: Option<u8>,
    pub report: Option<String>,
    pub message_count: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<Attempt> for AttemptSummary {
    fn from(attempt: Attempt) -> Self {
        Self {
            attempt_id: attempt.id,
            score: attempt.score,
            stars: attempt.stars,
            report: attempt.report,
            message_count: attempt.messages.len(),
            created_at: attempt.created_at,
            completed_at: attempt.completed_at,
        }
    }
}

/// Drives conversations between trainees and personas.
#[derive(Clone)]
pub struct Coach {
    db: Database,
    generator: Arc<dyn PersonaGenerator>,
    scorer: Arc<dyn Scorer>,
    config: CoachConfig,
}

impl Coach {
    pub fn new(
        db: Database,
        generator: Arc<dyn PersonaGenerator>,
        scorer: Arc<dyn Scorer>,
        config: CoachConfig,
    ) -> Self {
        Self {
            db,
            generator,
            scorer,
            config,
        }
    }

    /// Runs a store call on the blocking pool so waiting on the connection
    /// lock never stalls a runtime worker.
    pub async fn store<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))?
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    /// Handles one trainee message.
    ///
    /// Generator failures never fail the turn: the persona answers with the
    /// fallback line and the conversation stays open. Store failures do fail
    /// it, and nothing from the turn is persisted in that case.
    #[instrument(skip(self, message), fields(message_len = message.len()))]
    pub async fn chat_turn(
        &self,
        user_id: &str,
        case_id: Uuid,
        message: &str,
    ) -> Result<TurnOutcome, StoreError> {
        let text = message.trim();
        if text.is_empty() {
            return Err(StoreError::Validation("message must not be empty".into()));
        }
        let owner = user_id.to_string();
        let (case, attempt, created) = self
            .store(move |db| {
                let case = db.get_case(case_id)?;
                let (attempt, created) = db.get_or_create_current_attempt(&owner, case_id)?;
                Ok((case, attempt, created))
            })
            .await?;
        if created {
            info!(attempt_id = %attempt.id, "Started attempt");
        }

        let user_message = ChatMessage::user(text);
        let mut transcript = attempt.messages.clone();
        transcript.push(user_message.clone());

        let (reply, is_complete) = match self.generate(&case, &transcript).await {
            Ok(raw) => split_completion_marker(&raw),
            Err(e) => {
                warn!(error = %e, generator = self.generator.name(), "Generator failed, using fallback reply");
                (self.config.fallback_reply.clone(), false)
            }
        };
        let reply = if reply.is_empty() {
            self.config.fallback_reply.clone()
        } else {
            reply
        };
        let turn = vec![user_message, ChatMessage::assistant(reply.clone())];

        if !is_complete {
            let updated = self
                .store(move |db| db.append_messages(&attempt, &turn))
                .await?;
            debug!(attempt_id = %updated.id, messages = updated.messages.len(), "Turn recorded");
            return Ok(TurnOutcome {
                attempt_id: updated.id,
                assistant_message: reply,
                conversation_history: updated.messages,
                is_complete: false,
                result: None,
            });
        }

        transcript.push(turn[1].clone());
        let outcome = evaluate(self.scorer.as_ref(), &case, &transcript);
        let finished = {
            let outcome = outcome.clone();
            self.store(move |db| db.finish_attempt(&attempt, &turn, &outcome))
                .await?
        };
        info!(
            attempt_id = %finished.attempt.id,
            score = outcome.score,
            stars = outcome.stars,
            total_attempts = finished.progress.total_attempts,
            "Attempt completed"
        );

        Ok(TurnOutcome {
            attempt_id: finished.attempt.id,
            assistant_message: reply,
            conversation_history: finished.attempt.messages,
            is_complete: true,
            result: Some(TurnResult {
                stars: outcome.stars,
                score: outcome.score,
                report: outcome.report,
                total_attempts: finished.progress.total_attempts,
                best_score: finished.progress.best_score,
            }),
        })
    }

    async fn generate(&self, case: &Case, transcript: &[ChatMessage]) -> Result<String, GeneratorError> {
        let system_prompt = build_system_prompt(case);
        let timeout = self.config.generator_timeout;
        match tokio::time::timeout(timeout, self.generator.generate(&system_prompt, transcript)).await {
            Ok(reply) => reply.map(|r| r.text),
            Err(_) => Err(GeneratorError::Timeout(timeout.as_secs())),
        }
    }

    /// The open attempt for a case, with its full transcript.
    #[instrument(skip(self))]
    pub async fn current_attempt(&self, user_id: &str, case_id: Uuid) -> Result<CurrentAttempt, StoreError> {
        let owner = user_id.to_string();
        let current = self
            .store(move |db| {
                db.get_case(case_id)?;
                db.get_current_attempt(&owner, case_id)
            })
            .await?;
        let Some(attempt) = current else {
            return Ok(CurrentAttempt::none());
        };
        Ok(CurrentAttempt {
            has_attempt: true,
            attempt_id: Some(attempt.id),
            state: attempt.state(),
            is_complete: attempt.is_complete,
            result: None,
            messages: attempt.messages,
        })
    }

    /// Throws away the open attempt so the next message starts fresh.
    #[instrument(skip(self))]
    pub async fn abandon(&self, user_id: &str, case_id: Uuid) -> Result<AbandonOutcome, StoreError> {
        let owner = user_id.to_string();
        let deleted_count = self
            .store(move |db| {
                db.get_case(case_id)?;
                db.abandon_current_attempt(&owner, case_id)
            })
            .await?;
        if deleted_count > 0 {
            info!(deleted_count, "Abandoned attempt");
        }
        Ok(AbandonOutcome { deleted_count })
    }

    /// Finished attempts for a case, newest first.
    pub async fn completed_attempts(
        &self,
        user_id: &str,
        case_id: Uuid,
    ) -> Result<Vec<AttemptSummary>, StoreError> {
        let owner = user_id.to_string();
        let attempts = self
            .store(move |db| {
                db.get_case(case_id)?;
                db.list_completed_attempts(&owner, case_id)
            })
            .await?;
        Ok(attempts.into_iter().map(AttemptSummary::from).collect())
    }
}
