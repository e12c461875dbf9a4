use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Best outcome and attempt count of one user on one case.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub id: Uuid,
    pub user_id: String,
    pub case_id: Uuid,
    pub best_score: u8,
    pub best_stars: u8,
    /// Number of completed attempts.
    pub total_attempts: u32,
    /// Set on the first completion and never overwritten.
    pub first_completed_at: Option<DateTime<Utc>>,
    pub last_attempt_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Progress {
    pub fn is_completed(&self) -> bool {
        self.first_completed_at.is_some()
    }
}
