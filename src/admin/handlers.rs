use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;
use crate::resilience::BreakerSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub upstream: String,
}

#[derive(Serialize)]
pub struct CacheStatus {
    pub entries: usize,
    pub base_ttl_ms: u128,
}

#[derive(Deserialize)]
pub struct InvalidateParams {
    pub pattern: Option<String>,
}

#[derive(Serialize)]
pub struct InvalidateResult {
    pub removed: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        upstream: state.config.upstream.base_url.clone(),
    })
}

pub async fn get_breakers(State(state): State<AppState>) -> Json<Vec<BreakerSnapshot>> {
    Json(
        state
            .service
            .breakers()
            .iter()
            .map(|breaker| breaker.snapshot())
            .collect(),
    )
}

/// Force the named breaker back to Closed.
pub async fn reset_breaker(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<BreakerSnapshot>, StatusCode> {
    let breaker = state
        .service
        .breakers()
        .into_iter()
        .find(|breaker| breaker.name() == name)
        .ok_or(StatusCode::NOT_FOUND)?;

    breaker.reset();
    tracing::info!(dependency = %name, "Circuit breaker reset via admin API");
    Ok(Json(breaker.snapshot()))
}

pub async fn get_cache(State(state): State<AppState>) -> Json<CacheStatus> {
    let cache = state.service.client().cache();
    Json(CacheStatus {
        entries: cache.len(),
        base_ttl_ms: cache.base_ttl().as_millis(),
    })
}

/// Drops cache entries whose key contains `pattern`; everything when absent.
pub async fn invalidate_cache(
    State(state): State<AppState>,
    Query(params): Query<InvalidateParams>,
) -> Json<InvalidateResult> {
    let pattern = params.pattern.unwrap_or_default();
    let removed = state.service.client().invalidate_cache(&pattern);
    tracing::info!(pattern = %pattern, removed, "Cache invalidated via admin API");
    Json(InvalidateResult { removed })
}
