use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::progress::upsert_on;
use super::{format_time, now, parse_json, parse_optional_time, parse_time, parse_uuid, Database};
use crate::error::StoreError;
use crate::models::{stars_for_score, Attempt, AttemptOutcome, ChatMessage, Progress};

const ATTEMPT_COLUMNS: &str = "id, user_id, case_id, messages, is_complete, score, stars, report, \
     version, created_at, completed_at";

/// A completed attempt together with the progress row it updated.
#[derive(Debug, Clone)]
pub struct CompletedAttempt {
    pub attempt: Attempt,
    pub progress: Progress,
}

fn row_to_attempt(row: &Row) -> rusqlite::Result<Attempt> {
    let id: String = row.get(0)?;
    let case_id: String = row.get(2)?;
    let messages: String = row.get(3)?;
    let created_at: String = row.get(9)?;
    Ok(Attempt {
        id: parse_uuid(0, &id)?,
        user_id: row.get(1)?,
        case_id: parse_uuid(2, &case_id)?,
        messages: parse_json(3, &messages)?,
        is_complete: row.get(4)?,
        score: row.get(5)?,
        stars: row.get(6)?,
        report: row.get(7)?,
        version: row.get(8)?,
        created_at: parse_time(9, &created_at)?,
        completed_at: parse_optional_time(10, row.get(10)?)?,
    })
}

fn get_attempt_on(conn: &Connection, id: Uuid) -> Result<Option<Attempt>, StoreError> {
    let attempt = conn
        .query_row(
            &format!("SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE id = ?1"),
            params![id.to_string()],
            row_to_attempt,
        )
        .optional()?;
    Ok(attempt)
}

fn current_on(conn: &Connection, user_id: &str, case_id: Uuid) -> Result<Option<Attempt>, StoreError> {
    let attempt = conn
        .query_row(
            &format!(
                "SELECT {ATTEMPT_COLUMNS} FROM attempts
                 WHERE user_id = ?1 AND case_id = ?2 AND is_complete = 0
                 ORDER BY created_at DESC, rowid DESC LIMIT 1"
            ),
            params![user_id, case_id.to_string()],
            row_to_attempt,
        )
        .optional()?;
    Ok(attempt)
}

/// Works out why a guarded update touched no row.
fn write_rejection(conn: &Connection, id: Uuid) -> StoreError {
    match get_attempt_on(conn, id) {
        Ok(Some(existing)) if existing.is_complete => StoreError::AlreadyComplete(id),
        Ok(Some(_)) => StoreError::Conflict(id),
        Ok(None) => StoreError::NotFound(format!("attempt {id}")),
        Err(e) => e,
    }
}

fn append_on(
    conn: &Connection,
    attempt: &Attempt,
    messages: &[ChatMessage],
) -> Result<Attempt, StoreError> {
    let mut transcript = attempt.messages.clone();
    transcript.extend_from_slice(messages);

    let updated = conn.execute(
        "UPDATE attempts SET messages = ?1, version = version + 1
         WHERE id = ?2 AND version = ?3 AND is_complete = 0",
        params![
            serde_json::to_string(&transcript)?,
            attempt.id.to_string(),
            attempt.version,
        ],
    )?;
    if updated == 0 {
        return Err(write_rejection(conn, attempt.id));
    }

    get_attempt_on(conn, attempt.id)?
        .ok_or_else(|| StoreError::NotFound(format!("attempt {}", attempt.id)))
}

fn complete_on(
    conn: &Connection,
    id: Uuid,
    outcome: &AttemptOutcome,
) -> Result<Attempt, StoreError> {
    let updated = conn.execute(
        "UPDATE attempts
         SET is_complete = 1, score = ?1, stars = ?2, report = ?3, completed_at = ?4,
             version = version + 1
         WHERE id = ?5 AND is_complete = 0",
        params![
            outcome.score,
            outcome.stars,
            outcome.report,
            format_time(&now()),
            id.to_string(),
        ],
    )?;
    if updated == 0 {
        return Err(write_rejection(conn, id));
    }

    get_attempt_on(conn, id)?.ok_or_else(|| StoreError::NotFound(format!("attempt {id}")))
}

impl Database {
    pub fn get_attempt(&self, id: Uuid) -> Result<Option<Attempt>, StoreError> {
        self.with_connection(|conn| get_attempt_on(conn, id))
    }

    /// The open attempt for the pair, if any.
    pub fn get_current_attempt(
        &self,
        user_id: &str,
        case_id: Uuid,
    ) -> Result<Option<Attempt>, StoreError> {
        self.with_connection(|conn| current_on(conn, user_id, case_id))
    }

    /// Returns the open attempt for the pair, starting an empty one when there is none.
    ///
    /// The boolean is true when this call created the attempt. A racing creator
    /// loses on the partial unique index and both callers see the same row.
    pub fn get_or_create_current_attempt(
        &self,
        user_id: &str,
        case_id: Uuid,
    ) -> Result<(Attempt, bool), StoreError> {
        self.with_connection(|conn| {
            if let Some(existing) = current_on(conn, user_id, case_id)? {
                return Ok((existing, false));
            }

            let inserted = conn.execute(
                "INSERT INTO attempts (id, user_id, case_id, messages, is_complete, version, created_at)
                 VALUES (?1, ?2, ?3, '[]', 0, 0, ?4)
                 ON CONFLICT DO NOTHING",
                params![
                    Uuid::new_v4().to_string(),
                    user_id,
                    case_id.to_string(),
                    format_time(&now()),
                ],
            )?;

            let attempt = current_on(conn, user_id, case_id)?
                .ok_or_else(|| StoreError::NotFound(format!("open attempt for case {case_id}")))?;
            Ok((attempt, inserted == 1))
        })
    }

    /// Deletes every open attempt for the pair and returns how many went away.
    ///
    /// Completed attempts and progress are left alone.
    pub fn abandon_current_attempt(&self, user_id: &str, case_id: Uuid) -> Result<usize, StoreError> {
        self.with_connection(|conn| {
            let deleted = conn.execute(
                "DELETE FROM attempts WHERE user_id = ?1 AND case_id = ?2 AND is_complete = 0",
                params![user_id, case_id.to_string()],
            )?;
            Ok(deleted)
        })
    }

    /// Appends messages to the transcript of an open attempt.
    ///
    /// `attempt` must carry the version last read; a stale version fails with
    /// [`StoreError::Conflict`] instead of overwriting someone else's messages.
    pub fn append_messages(
        &self,
        attempt: &Attempt,
        messages: &[ChatMessage],
    ) -> Result<Attempt, StoreError> {
        self.with_connection(|conn| append_on(conn, attempt, messages))
    }

    pub fn append_message(&self, attempt: &Attempt, message: ChatMessage) -> Result<Attempt, StoreError> {
        self.append_messages(attempt, std::slice::from_ref(&message))
    }

    /// Marks an attempt complete. Completion happens once; a second call is rejected.
    pub fn complete_attempt(
        &self,
        attempt: &Attempt,
        score: u8,
        stars: u8,
        report: &str,
    ) -> Result<Attempt, StoreError> {
        if stars != stars_for_score(score) {
            return Err(StoreError::Validation(format!(
                "stars {stars} do not match score {score}"
            )));
        }
        let outcome = AttemptOutcome {
            score,
            stars,
            report: report.to_string(),
        };
        self.with_connection(|conn| complete_on(conn, attempt.id, &outcome))
    }

    /// Appends the final messages, completes the attempt and records progress
    /// in one transaction.
    pub fn finish_attempt(
        &self,
        attempt: &Attempt,
        messages: &[ChatMessage],
        outcome: &AttemptOutcome,
    ) -> Result<CompletedAttempt, StoreError> {
        self.with_connection(|conn| {
            let tx = conn.unchecked_transaction()?;
            let appended = append_on(&tx, attempt, messages)?;
            let completed = complete_on(&tx, appended.id, outcome)?;
            let progress = upsert_on(
                &tx,
                &completed.user_id,
                completed.case_id,
                outcome.score,
                outcome.stars,
                now(),
            )?;
            tx.commit()?;

            Ok(CompletedAttempt {
                attempt: completed,
                progress,
            })
        })
    }

    /// Completed attempts for the pair, newest first.
    pub fn list_completed_attempts(
        &self,
        user_id: &str,
        case_id: Uuid,
    ) -> Result<Vec<Attempt>, StoreError> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ATTEMPT_COLUMNS} FROM attempts
                 WHERE user_id = ?1 AND case_id = ?2 AND is_complete = 1
                 ORDER BY completed_at DESC, rowid DESC"
            ))?;
            let rows = stmt
                .query_map(params![user_id, case_id.to_string()], row_to_attempt)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn count_completed_attempts(&self, user_id: &str, case_id: Uuid) -> Result<u64, StoreError> {
        self.with_connection(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM attempts WHERE user_id = ?1 AND case_id = ?2 AND is_complete = 1",
                params![user_id, case_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }

    /// Number of open attempts for the pair. Never more than one.
    pub fn count_open_attempts(&self, user_id: &str, case_id: Uuid) -> Result<u64, StoreError> {
        self.with_connection(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM attempts WHERE user_id = ?1 AND case_id = ?2 AND is_complete = 0",
                params![user_id, case_id.to_string()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
    }
}
