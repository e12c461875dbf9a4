//! HTTP API.
//!
//! Every endpoint answers with the same envelope: `{"success": true, "data": ...}`
//! on success and `{"success": false, "error": {...}}` otherwise. Requests are
//! attributed to a user through the [`CurrentUser`] extractor.

mod auth;
mod envelope;
mod handlers;

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use rehearsal_core::models::Case;

use crate::cache::ViewCache;
use crate::config::CacheConfig;
use crate::orchestrator::Coach;
use crate::projector::ProgressView;

pub use auth::{CurrentUser, USER_COOKIE, USER_HEADER};
pub use envelope::{ok, Envelope};

#[derive(Clone)]
pub struct AppState {
    pub coach: Coach,
    /// Projected roadmap per user id.
    pub progress_cache: ViewCache<String, ProgressView>,
    /// The ordered case list. Cases only change through the seeding CLI.
    pub cases_cache: ViewCache<(), Vec<Case>>,
}

impl AppState {
    pub fn new(coach: Coach, cache: &CacheConfig) -> Self {
        Self {
            coach,
            progress_cache: ViewCache::new(
                Duration::from_secs(cache.progress_secs),
                cache.progress_capacity,
            ),
            cases_cache: ViewCache::new(Duration::from_secs(cache.cases_secs), 1),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/cases", get(handlers::list_cases))
        .route("/api/cases/{id}", get(handlers::get_case))
        .route("/api/cases/{id}/current-attempt", get(handlers::current_attempt))
        .route("/api/cases/{id}/abandon-attempt", post(handlers::abandon_attempt))
        .route("/api/cases/{id}/attempts", get(handlers::list_attempts))
        .route("/api/chat", post(handlers::chat))
        .route("/api/progress", get(handlers::progress))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}
