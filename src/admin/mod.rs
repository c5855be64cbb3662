//! Operational endpoints under `/admin`, guarded by a bearer key.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/breakers", get(get_breakers))
        .route("/admin/breakers/{name}/reset", post(reset_breaker))
        .route("/admin/cache", get(get_cache).delete(invalidate_cache))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
