use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use super::{format_time, now, parse_json, parse_time, parse_uuid, Database};
use crate::error::StoreError;
use crate::models::{Case, CaseMetaData, CreateCaseInput};

const CASE_COLUMNS: &str = "id, customer_name, intro, avatar, order_index, budget, decision_level, \
     personality, points, background, script, created_at";

fn row_to_case(row: &Row) -> rusqlite::Result<Case> {
    let id: String = row.get(0)?;
    let personality: String = row.get(7)?;
    let points: String = row.get(8)?;
    let created_at: String = row.get(11)?;
    Ok(Case {
        id: parse_uuid(0, &id)?,
        customer_name: row.get(1)?,
        intro: row.get(2)?,
        avatar: row.get(3)?,
        order_index: row.get(4)?,
        meta_data: CaseMetaData {
            budget: row.get(5)?,
            decision_level: row.get(6)?,
            personality: parse_json(7, &personality)?,
            points: parse_json(8, &points)?,
            background: row.get(9)?,
        },
        script: row.get(10)?,
        created_at: parse_time(11, &created_at)?,
    })
}

pub(crate) fn get_case_on(conn: &Connection, id: Uuid) -> Result<Option<Case>, StoreError> {
    let case = conn
        .query_row(
            &format!("SELECT {CASE_COLUMNS} FROM cases WHERE id = ?1"),
            params![id.to_string()],
            row_to_case,
        )
        .optional()?;
    Ok(case)
}

impl Database {
    /// All cases in training order.
    pub fn list_cases(&self) -> Result<Vec<Case>, StoreError> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CASE_COLUMNS} FROM cases ORDER BY order_index ASC"
            ))?;
            let cases = stmt
                .query_map([], row_to_case)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(cases)
        })
    }

    pub fn get_case(&self, id: Uuid) -> Result<Case, StoreError> {
        self.with_connection(|conn| get_case_on(conn, id))?
            .ok_or_else(|| StoreError::NotFound(format!("case {id}")))
    }

    pub fn find_case_by_order_index(&self, order_index: i64) -> Result<Option<Case>, StoreError> {
        self.with_connection(|conn| {
            let case = conn
                .query_row(
                    &format!("SELECT {CASE_COLUMNS} FROM cases WHERE order_index = ?1"),
                    params![order_index],
                    row_to_case,
                )
                .optional()?;
            Ok(case)
        })
    }

    pub fn count_cases(&self) -> Result<u64, StoreError> {
        self.with_connection(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM cases", [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }

    /// Inserts a case. Only the seeding CLI writes cases; the training flow reads them.
    pub fn insert_case(&self, input: CreateCaseInput) -> Result<Case, StoreError> {
        input.validate().map_err(StoreError::Validation)?;
        self.with_connection(|conn| {
            let taken: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM cases WHERE order_index = ?1)",
                params![input.order_index],
                |row| row.get(0),
            )?;
            if taken {
                return Err(StoreError::Validation(format!(
                    "orderIndex {} is already used by another case",
                    input.order_index
                )));
            }

            let id = Uuid::new_v4();
            let meta = &input.meta_data;
            conn.execute(
                "INSERT INTO cases (id, customer_name, intro, avatar, order_index, budget, decision_level,
                                    personality, points, background, script, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    id.to_string(),
                    input.customer_name.trim(),
                    input.intro.trim(),
                    input.avatar,
                    input.order_index,
                    meta.budget,
                    meta.decision_level,
                    serde_json::to_string(&meta.personality)?,
                    serde_json::to_string(&meta.points)?,
                    meta.background,
                    input.script,
                    format_time(&now()),
                ],
            )?;
            tracing::debug!(case_id = %id, order_index = input.order_index, "Inserted case");

            get_case_on(conn, id)?.ok_or_else(|| StoreError::NotFound(format!("case {id}")))
        })
    }
}
