//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, metrics)
//! - Mount admin routes when enabled
//! - Serve until the shutdown broadcast fires

use axum::{
    body::Body,
    extract::{MatchedPath, Path, State},
    http::{Request, StatusCode, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::setup_admin_router;
use crate::aggregator::SimilarProductsService;
use crate::config::ServiceConfig;
use crate::http::request::{propagate_request_id, set_request_id, RequestIdExt};
use crate::http::response::{error_response, StatusBody};
use crate::observability::metrics;
use crate::upstream::{ProductDetail, UpstreamError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SimilarProductsService>,
    pub config: Arc<ServiceConfig>,
}

/// HTTP front end of the similar-products service.
pub struct HttpServer {
    router: Router,
    config: Arc<ServiceConfig>,
}

impl HttpServer {
    pub fn new(config: ServiceConfig, service: Arc<SimilarProductsService>) -> Self {
        let config = Arc::new(config);
        let state = AppState {
            service,
            config: config.clone(),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/product/{product_id}/similar", get(similar_products))
            .route("/health", get(health));

        if config.admin.enabled {
            router = router.merge(setup_admin_router(state.clone()));
        }

        router
            .fallback(not_found)
            .with_state(state)
            .layer(middleware::from_fn(track_requests))
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id())
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "http_request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request.request_id(),
                        )
                    }))
                    .layer(propagate_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.listener.request_timeout_secs,
                    ))),
            )
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.base_url,
            admin = self.config.admin.enabled,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn similar_products(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<Json<Vec<ProductDetail>>, UpstreamError> {
    let products = state.service.get_similar_products(&product_id).await?;
    Ok(Json(products))
}

async fn health() -> Json<StatusBody> {
    Json(StatusBody {
        status: "success",
        message: "API is running".to_string(),
    })
}

async fn not_found(uri: Uri) -> Response {
    tracing::warn!(path = %uri.path(), "No route matched");
    error_response(
        StatusCode::NOT_FOUND,
        format!("Cannot find {} on this server!", uri.path()),
    )
}

/// Per-request metrics and the completion log line.
async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await.into_response();
    let status = response.status();

    metrics::record_request(&method, status.as_u16(), &route, start);
    if status.is_server_error() {
        tracing::warn!(status = %status, route = %route, elapsed = ?start.elapsed(), "Request failed");
    } else {
        tracing::debug!(status = %status, route = %route, elapsed = ?start.elapsed(), "Request completed");
    }

    response
}
