use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_time, now, parse_optional_time, parse_time, parse_uuid, Database};
use crate::error::StoreError;
use crate::models::Progress;

const PROGRESS_COLUMNS: &str = "id, user_id, case_id, best_score, best_stars, total_attempts, \
     first_completed_at, last_attempt_at, created_at";

fn row_to_progress(row: &Row) -> rusqlite::Result<Progress> {
    let id: String = row.get(0)?;
    let case_id: String = row.get(2)?;
    let last_attempt_at: String = row.get(7)?;
    let created_at: String = row.get(8)?;
    Ok(Progress {
        id: parse_uuid(0, &id)?,
        user_id: row.get(1)?,
        case_id: parse_uuid(2, &case_id)?,
        best_score: row.get(3)?,
        best_stars: row.get(4)?,
        total_attempts: row.get(5)?,
        first_completed_at: parse_optional_time(6, row.get(6)?)?,
        last_attempt_at: parse_time(7, &last_attempt_at)?,
        created_at: parse_time(8, &created_at)?,
    })
}

pub(crate) fn get_progress_on(
    conn: &Connection,
    user_id: &str,
    case_id: Uuid,
) -> Result<Option<Progress>, StoreError> {
    let progress = conn
        .query_row(
            &format!("SELECT {PROGRESS_COLUMNS} FROM progress WHERE user_id = ?1 AND case_id = ?2"),
            params![user_id, case_id.to_string()],
            row_to_progress,
        )
        .optional()?;
    Ok(progress)
}

/// Records one completed attempt in a single statement.
///
/// The increment, the best-score comparison and the first-completion fill all
/// happen inside SQLite, so two completions racing for the same pair both count.
pub(crate) fn upsert_on(
    conn: &Connection,
    user_id: &str,
    case_id: Uuid,
    score: u8,
    stars: u8,
    at: DateTime<Utc>,
) -> Result<Progress, StoreError> {
    conn.execute(
        "INSERT INTO progress (id, user_id, case_id, best_score, best_stars, total_attempts,
                               first_completed_at, last_attempt_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6, ?6)
         ON CONFLICT (user_id, case_id) DO UPDATE SET
             total_attempts = progress.total_attempts + 1,
             last_attempt_at = excluded.last_attempt_at,
             best_stars = CASE WHEN excluded.best_score > progress.best_score
                               THEN excluded.best_stars ELSE progress.best_stars END,
             best_score = MAX(progress.best_score, excluded.best_score),
             first_completed_at = COALESCE(progress.first_completed_at, excluded.first_completed_at)",
        params![
            Uuid::new_v4().to_string(),
            user_id,
            case_id.to_string(),
            score,
            stars,
            format_time(&at),
        ],
    )?;

    get_progress_on(conn, user_id, case_id)?
        .ok_or_else(|| StoreError::NotFound(format!("progress for case {case_id}")))
}

impl Database {
    pub fn get_progress(&self, user_id: &str, case_id: Uuid) -> Result<Option<Progress>, StoreError> {
        self.with_connection(|conn| get_progress_on(conn, user_id, case_id))
    }

    pub fn list_progress_for_user(&self, user_id: &str) -> Result<Vec<Progress>, StoreError> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PROGRESS_COLUMNS} FROM progress WHERE user_id = ?1"
            ))?;
            let rows = stmt
                .query_map(params![user_id], row_to_progress)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn upsert_on_completion(
        &self,
        user_id: &str,
        case_id: Uuid,
        score: u8,
        stars: u8,
    ) -> Result<Progress, StoreError> {
        self.with_connection(|conn| upsert_on(conn, user_id, case_id, score, stars, now()))
    }
}
