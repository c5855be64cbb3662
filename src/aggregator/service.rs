//! Similar-products aggregation.

use std::sync::Arc;

use crate::resilience::{BatchOrchestrator, CallTimeouts, CircuitBreaker};
use crate::upstream::{ProductApiClient, ProductDetail, UpstreamError, UpstreamResult};

/// Composes the ids lookup and the batched detail fan-out.
///
/// Each dependency has its own breaker handle; the ids breaker answers with
/// an empty list while open, the detail breaker fails fast and the failed
/// item becomes a gap.
#[derive(Clone)]
pub struct SimilarProductsService {
    client: Arc<ProductApiClient>,
    ids_breaker: Arc<CircuitBreaker>,
    detail_breaker: Arc<CircuitBreaker>,
    orchestrator: BatchOrchestrator,
    timeouts: CallTimeouts,
}

impl SimilarProductsService {
    pub fn new(
        client: Arc<ProductApiClient>,
        ids_breaker: Arc<CircuitBreaker>,
        detail_breaker: Arc<CircuitBreaker>,
        orchestrator: BatchOrchestrator,
        timeouts: CallTimeouts,
    ) -> Self {
        Self {
            client,
            ids_breaker,
            detail_breaker,
            orchestrator,
            timeouts,
        }
    }

    /// Detail records of the products similar to `product_id`, in upstream order.
    ///
    /// Unknown products yield an empty list. Only a failure of the ids lookup
    /// itself (timeout or upstream error) is returned as an error.
    pub async fn get_similar_products(&self, product_id: &str) -> UpstreamResult<Vec<ProductDetail>> {
        tracing::info!(product_id = %product_id, "Getting similar products");

        let lookup = self
            .ids_breaker
            .call_with_fallback(|| self.client.similar_ids(product_id), || async { Vec::new() })
            .await;

        let similar_ids = match lookup {
            Ok(ids) => ids,
            Err(UpstreamError::NotFound(_)) => {
                tracing::warn!(product_id = %product_id, "Product not found or has no similar products");
                return Ok(Vec::new());
            }
            Err(e) => {
                tracing::error!(product_id = %product_id, error = %e, "Error getting similar products");
                return Err(e);
            }
        };

        if similar_ids.is_empty() {
            tracing::info!(product_id = %product_id, "No similar products found");
            return Ok(Vec::new());
        }

        tracing::debug!(count = similar_ids.len(), "Fetching details for similar products");

        let outcome = self
            .orchestrator
            .fetch_all(&similar_ids, |id| {
                let client = self.client.clone();
                let breaker = self.detail_breaker.clone();
                let timeout = Some(self.timeouts.for_id(&id));
                async move { breaker.call(|| client.product_detail(&id, timeout)).await }
            })
            .await;

        let products: Vec<ProductDetail> = outcome.results.into_iter().flatten().collect();

        tracing::info!(
            product_id = %product_id,
            retrieved = products.len(),
            total = similar_ids.len(),
            filtered = outcome.filtered,
            timed_out = outcome.timed_out,
            "Successfully retrieved similar products"
        );

        Ok(products)
    }

    pub fn client(&self) -> &Arc<ProductApiClient> {
        &self.client
    }

    /// Breakers in a stable order: ids lookup, then detail.
    pub fn breakers(&self) -> [&Arc<CircuitBreaker>; 2] {
        [&self.ids_breaker, &self.detail_breaker]
    }
}
