//! Retry logic.
//!
//! # Responsibilities
//! - Run one logical call with up to `max_retries` sequential retries
//! - Classify each failure as terminal or retryable
//! - Translate the last failure into the public error taxonomy
//!
//! # Design Decisions
//! - 4xx other than 429 is terminal; 5xx, 429 and transport errors retry
//! - Deterministic exponential backoff (see `backoff.rs`)
//! - The success hook runs once and its failure never fails the call

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::upstream::types::{CallError, UpstreamError, UpstreamResult};

/// Retry parameters for one executor.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each further retry.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(300))
    }
}

/// Bounded-retry wrapper around a single network call.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Run `call` with retries. `dependency` labels metrics, `path` labels logs and errors.
    pub async fn execute<T, F, Fut>(&self, dependency: &str, path: &str, call: F) -> UpstreamResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
    {
        self.execute_with_hook(dependency, path, call, |_: &T| Ok::<(), std::convert::Infallible>(()))
            .await
    }

    /// Like [`execute`](Self::execute), invoking `on_success` with the first successful value.
    pub async fn execute_with_hook<T, F, Fut, H, E>(
        &self,
        dependency: &str,
        path: &str,
        mut call: F,
        on_success: H,
    ) -> UpstreamResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallError>>,
        H: FnOnce(&T) -> Result<(), E>,
        E: Display,
    {
        let mut on_success = Some(on_success);
        let mut last_error: Option<CallError> = None;

        for attempt in 0..=self.policy.max_retries {
            if attempt > 0 {
                let delay = calculate_backoff(attempt, self.policy.base_delay);
                tracing::info!(
                    dependency = %dependency,
                    path = %path,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying upstream call"
                );
                metrics::record_retry(dependency);
                tokio::time::sleep(delay).await;
            }

            match call().await {
                Ok(value) => {
                    if let Some(hook) = on_success.take() {
                        if let Err(e) = hook(&value) {
                            tracing::warn!(path = %path, error = %e, "Success hook failed; returning value anyway");
                        }
                    }
                    return Ok(value);
                }
                Err(err) => {
                    if !err.is_retryable() {
                        tracing::debug!(path = %path, attempt, error = %err, "Terminal upstream failure, not retrying");
                        last_error = Some(err);
                        break;
                    }
                    last_error = Some(err);
                }
            }
        }

        let err = last_error.unwrap_or_else(|| CallError::Transport("no attempt was made".to_string()));
        tracing::warn!(
            dependency = %dependency,
            path = %path,
            error = %err,
            "Upstream call failed"
        );
        Err(UpstreamError::from_exhausted(path, err))
    }
}
