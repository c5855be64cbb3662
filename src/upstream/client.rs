//! Product catalog HTTP client with caching and retries.
//!
//! # Responsibilities
//! - Build catalog URLs (ids are percent-encoded as path segments)
//! - Serve fresh responses from the cache
//! - Fetch through the retry executor and write successes back to the cache
//! - Reclassify upstream 404 as `NotFound`

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

use crate::cache::ResponseCache;
use crate::observability::metrics;
use crate::resilience::retries::RetryExecutor;
use crate::upstream::types::{CallError, ProductDetail, SimilarProductIds, UpstreamError, UpstreamResult};

/// Dependency name of the similar-ids lookup.
pub const SIMILAR_IDS_DEPENDENCY: &str = "similar-ids";
/// Dependency name of the product detail lookup.
pub const PRODUCT_DETAIL_DEPENDENCY: &str = "product-detail";

/// Client for the upstream product catalog.
#[derive(Clone)]
pub struct ProductApiClient {
    http: reqwest::Client,
    base_url: Url,
    cache: ResponseCache<serde_json::Value>,
    retry: RetryExecutor,
}

impl ProductApiClient {
    /// Create a client. `request_timeout` is the default per-call budget.
    pub fn new(
        base_url: Url,
        request_timeout: Duration,
        cache: ResponseCache<serde_json::Value>,
        retry: RetryExecutor,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout)
            .build()?;

        tracing::debug!(base_url = %base_url, "ProductApiClient initialized");

        Ok(Self {
            http,
            base_url,
            cache,
            retry,
        })
    }

    /// `GET /product/{id}/similarids`
    pub async fn similar_ids(&self, product_id: &str) -> UpstreamResult<SimilarProductIds> {
        tracing::info!(product_id = %product_id, "Fetching similar product IDs");
        let url = self.endpoint(&["product", product_id, "similarids"])?;

        let ids: SimilarProductIds = self.get_json(SIMILAR_IDS_DEPENDENCY, url, None).await.map_err(|e| {
            if matches!(e, UpstreamError::NotFound(_)) {
                tracing::warn!(product_id = %product_id, "No similar products found");
            }
            e
        })?;

        tracing::debug!(product_id = %product_id, count = ids.len(), "Found similar products");
        Ok(ids)
    }

    /// `GET /product/{id}`, optionally with a tighter timeout than the client default.
    pub async fn product_detail(
        &self,
        product_id: &str,
        timeout: Option<Duration>,
    ) -> UpstreamResult<ProductDetail> {
        tracing::info!(product_id = %product_id, timeout_ms = timeout.map(|t| t.as_millis() as u64), "Fetching product details");
        let url = self.endpoint(&["product", product_id])?;
        self.get_json(PRODUCT_DETAIL_DEPENDENCY, url, timeout).await
    }

    /// Remove cached responses whose key contains `pattern` (all when empty).
    pub fn invalidate_cache(&self, pattern: &str) -> usize {
        self.cache.invalidate(pattern)
    }

    pub fn cache(&self) -> &ResponseCache<serde_json::Value> {
        &self.cache
    }

    fn endpoint(&self, segments: &[&str]) -> UpstreamResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UpstreamError::ExternalApi {
                status: None,
                message: format!("base URL {} cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T>(&self, dependency: &str, url: Url, timeout: Option<Duration>) -> UpstreamResult<T>
    where
        T: DeserializeOwned + Serialize,
    {
        let path = url.path().to_string();
        let key = format!("GET:{path}");

        if let Some(cached) = self.cache.get(&key) {
            match serde_json::from_value::<T>(cached) {
                Ok(value) => {
                    tracing::debug!(path = %path, "Cache hit");
                    metrics::record_upstream_call(dependency, "cache_hit");
                    return Ok(value);
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Discarding unreadable cache entry");
                    self.cache.remove(&key);
                }
            }
        }

        let cache = self.cache.clone();
        let result = self
            .retry
            .execute_with_hook(
                dependency,
                &path,
                || self.send::<T>(&url, timeout),
                move |value: &T| serde_json::to_value(value).map(|json| cache.set(key, json)),
            )
            .await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(UpstreamError::Timeout(_)) => "timeout",
            Err(_) => "error",
        };
        metrics::record_upstream_call(dependency, outcome);

        result.map_err(|e| reclassify_not_found(&path, e))
    }

    async fn send<T: DeserializeOwned>(&self, url: &Url, timeout: Option<Duration>) -> Result<T, CallError> {
        tracing::debug!(url = %url, "HTTP Request: GET");

        let mut request = self.http.get(url.clone());
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!(url = %url, status = %status, "HTTP Response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CallError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<T>().await?)
    }
}

/// Upstream 404 surfaces as `NotFound`; everything else passes through.
fn reclassify_not_found(path: &str, err: UpstreamError) -> UpstreamError {
    match err {
        UpstreamError::ExternalApi { status: Some(404), .. } => {
            UpstreamError::NotFound(format!("resource not found: {path}"))
        }
        other => other,
    }
}
