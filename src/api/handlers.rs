use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use rehearsal_core::models::Case;

use super::auth::CurrentUser;
use super::envelope::{ok, Envelope};
use super::AppState;
use crate::error::ApiError;
use crate::orchestrator::{AbandonOutcome, AttemptSummary, CurrentAttempt, TurnOutcome};
use crate::projector::{project, ProgressView};

type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub status: &'static str,
    pub generator: String,
    pub cases: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub case_id: Option<String>,
    pub message: Option<String>,
    /// Accepted for compatibility. The stored transcript is authoritative.
    #[serde(default)]
    pub conversation_history: Option<Vec<serde_json::Value>>,
}

/// Path ids that are not UUIDs cannot name a case.
fn parse_case_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::NotFound(format!("case {raw} not found")))
}

async fn cached_cases(state: &AppState) -> Result<Vec<Case>, ApiError> {
    if let Some(cases) = state.cases_cache.get(&()) {
        return Ok(cases);
    }
    let cases = state.coach.store(|db| db.list_cases()).await?;
    state.cases_cache.insert((), cases.clone());
    Ok(cases)
}

#[instrument(skip(state))]
pub async fn health(State(state): State<AppState>) -> ApiResult<Health> {
    let cases = state.coach.store(|db| db.count_cases()).await?;
    Ok(ok(Health {
        status: "ok",
        generator: state.coach.generator_name().to_string(),
        cases,
    }))
}

#[instrument(skip(state, _user))]
pub async fn list_cases(State(state): State<AppState>, _user: CurrentUser) -> ApiResult<Vec<Case>> {
    Ok(ok(cached_cases(&state).await?))
}

#[instrument(skip(state, _user))]
pub async fn get_case(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Case> {
    let case_id = parse_case_id(&id)?;
    let case = state.coach.store(move |db| db.get_case(case_id)).await?;
    Ok(ok(case))
}

#[instrument(skip(state, user, body), fields(user = %user.id()))]
pub async fn chat(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<TurnOutcome> {
    let Json(body) = body.map_err(|e| ApiError::Validation(e.body_text()))?;

    let case_id = body
        .case_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::Validation("caseId is required".into()))?;
    let case_id = Uuid::parse_str(case_id)
        .map_err(|_| ApiError::Validation(format!("caseId {case_id} is not a valid id")))?;
    let message = body
        .message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("message is required".into()))?;

    let outcome = state.coach.chat_turn(user.id(), case_id, message).await?;

    if let Some(history) = &body.conversation_history {
        let stored = outcome.conversation_history.len().saturating_sub(2);
        if history.len() != stored {
            debug!(
                client = history.len(),
                stored,
                "Client history differs from stored transcript"
            );
        }
    }
    if outcome.is_complete {
        state.progress_cache.invalidate(&user.0);
        info!(case_id = %case_id, "Progress view invalidated");
    }
    Ok(ok(outcome))
}

#[instrument(skip(state, user), fields(user = %user.id()))]
pub async fn current_attempt(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<CurrentAttempt> {
    let current = state
        .coach
        .current_attempt(user.id(), parse_case_id(&id)?)
        .await?;
    Ok(ok(current))
}

#[instrument(skip(state, user), fields(user = %user.id()))]
pub async fn abandon_attempt(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<AbandonOutcome> {
    let outcome = state.coach.abandon(user.id(), parse_case_id(&id)?).await?;
    Ok(ok(outcome))
}

#[instrument(skip(state, user), fields(user = %user.id()))]
pub async fn list_attempts(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Vec<AttemptSummary>> {
    let attempts = state
        .coach
        .completed_attempts(user.id(), parse_case_id(&id)?)
        .await?;
    Ok(ok(attempts))
}

#[instrument(skip(state, user), fields(user = %user.id()))]
pub async fn progress(State(state): State<AppState>, user: CurrentUser) -> ApiResult<ProgressView> {
    if let Some(view) = state.progress_cache.get(&user.0) {
        return Ok(ok(view));
    }
    let cases = cached_cases(&state).await?;
    let owner = user.0.clone();
    let progress = state
        .coach
        .store(move |db| db.list_progress_for_user(&owner))
        .await?;
    let view = project(&cases, &progress);
    state.progress_cache.insert(user.0, view.clone());
    Ok(ok(view))
}
