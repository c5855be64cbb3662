//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated `ServiceConfig` into a wired `SimilarProductsService`
//! - Create one breaker per dependency and share it for the process lifetime
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order: cache, client, breakers, orchestrator

use std::sync::Arc;
use thiserror::Error;
use url::Url;

use crate::aggregator::SimilarProductsService;
use crate::cache::{PopularityPolicy, ResponseCache};
use crate::config::ServiceConfig;
use crate::resilience::{BatchOrchestrator, CallTimeouts, CircuitBreaker, DenyList, RetryExecutor};
use crate::upstream::{ProductApiClient, PRODUCT_DETAIL_DEPENDENCY, SIMILAR_IDS_DEPENDENCY};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid upstream base URL: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Composition root: builds every long-lived component from configuration.
pub fn build_service(config: &ServiceConfig) -> Result<Arc<SimilarProductsService>, StartupError> {
    let base_url = Url::parse(&config.upstream.base_url)?;

    let policy = PopularityPolicy::new(&config.cache.popular_ids, config.cache.popularity_multiplier);
    let cache = ResponseCache::new(config.cache.ttl(), policy);

    let client = ProductApiClient::new(
        base_url,
        config.upstream.request_timeout(),
        cache,
        RetryExecutor::new(config.retries.policy()),
    )?;

    let ids_breaker = Arc::new(CircuitBreaker::new(
        SIMILAR_IDS_DEPENDENCY,
        config.breakers.similar_ids.breaker_config(),
    ));
    let detail_breaker = Arc::new(CircuitBreaker::new(
        PRODUCT_DETAIL_DEPENDENCY,
        config.breakers.product_detail.breaker_config(),
    ));

    let orchestrator = BatchOrchestrator::new(
        config.batch.max_concurrent_requests,
        config.batch.timeout(),
        DenyList::new(config.batch.deny_list.iter().cloned()),
    )
    .with_abort_on_timeout(config.batch.abort_on_timeout);

    let timeouts = CallTimeouts::new(
        config.upstream.request_timeout(),
        config.batch.slow_timeout(),
        config.batch.slow_ids.iter().cloned(),
    );

    tracing::info!(
        upstream = %config.upstream.base_url,
        concurrency_limit = orchestrator.concurrency_limit(),
        batch_timeout_ms = orchestrator.batch_timeout().as_millis() as u64,
        deny_list = config.batch.deny_list.len(),
        "Service components initialized"
    );

    Ok(Arc::new(SimilarProductsService::new(
        Arc::new(client),
        ids_breaker,
        detail_breaker,
        orchestrator,
        timeouts,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_from_defaults() {
        let service = build_service(&ServiceConfig::default()).unwrap();
        let [ids, detail] = service.breakers();
        assert_eq!(ids.name(), SIMILAR_IDS_DEPENDENCY);
        assert_eq!(detail.name(), PRODUCT_DETAIL_DEPENDENCY);
        assert!(service.client().cache().is_empty());
    }

    #[test]
    fn test_bad_base_url() {
        let mut config = ServiceConfig::default();
        config.upstream.base_url = "not a url".into();
        assert!(matches!(build_service(&config), Err(StartupError::BaseUrl(_))));
    }
}
