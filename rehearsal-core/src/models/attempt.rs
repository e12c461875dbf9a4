use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Highest score a conversation can earn.
pub const MAX_SCORE: u8 = 100;
/// Highest star rating a conversation can earn.
pub const MAX_STARS: u8 = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One practice conversation of a user against a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub id: Uuid,
    pub user_id: String,
    pub case_id: Uuid,
    pub messages: Vec<ChatMessage>,
    pub is_complete: bool,
    pub score: Option<u8>,
    pub stars: Option<u8>,
    pub report: Option<String>,
    /// Bumped on every write; appends are compare-and-swap on this value.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Attempt {
    pub fn state(&self) -> AttemptState {
        if self.is_complete {
            AttemptState::Complete
        } else {
            AttemptState::InProgress
        }
    }

    pub fn user_turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .count()
    }

    /// Result fields, present only once the attempt is complete.
    pub fn outcome(&self) -> Option<AttemptOutcome> {
        match (self.is_complete, self.score, self.stars, &self.report) {
            (true, Some(score), Some(stars), Some(report)) => Some(AttemptOutcome {
                score,
                stars,
                report: report.clone(),
            }),
            _ => None,
        }
    }
}

/// Lifecycle of the attempt slot for one (user, case) pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    NoAttempt,
    InProgress,
    Complete,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub score: u8,
    pub stars: u8,
    pub report: String,
}

impl AttemptOutcome {
    /// Builds an outcome, deriving the star rating from the score.
    pub fn new(score: u8, report: impl Into<String>) -> Self {
        let score = score.min(MAX_SCORE);
        Self {
            score,
            stars: stars_for_score(score),
            report: report.into(),
        }
    }
}

/// Stars are `floor(score / 20)`, so 100 earns the full five.
pub fn stars_for_score(score: u8) -> u8 {
    (score.min(MAX_SCORE) / 20).min(MAX_STARS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stars_follow_score_bands() {
        assert_eq!(stars_for_score(0), 0);
        assert_eq!(stars_for_score(19), 0);
        assert_eq!(stars_for_score(70), 3);
        assert_eq!(stars_for_score(79), 3);
        assert_eq!(stars_for_score(80), 4);
        assert_eq!(stars_for_score(99), 4);
        assert_eq!(stars_for_score(100), 5);
        assert_eq!(stars_for_score(255), 5);
    }

    #[test]
    fn outcome_clamps_score() {
        let outcome = AttemptOutcome::new(140, "great");
        assert_eq!(outcome.score, 100);
        assert_eq!(outcome.stars, 5);
    }

    #[test]
    fn message_role_matches_wire_names() {
        for role in [MessageRole::User, MessageRole::Assistant] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role.as_str()));
        }
    }
}
