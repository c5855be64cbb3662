//! Circuit breaker for upstream dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast (or use the fallback)
//! - Half-Open: trial call testing whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures >= failure_threshold
//! Open → Half-Open: now - last_failure_at > reset_timeout (checked on the next call)
//! Half-Open → Closed: trial call succeeds or reports NotFound
//! Half-Open → Open: trial call fails
//! ```
//!
//! # Design Decisions
//! - One breaker per dependency, owned by the composition root and shared by `Arc`
//! - No background timer; the cooldown is evaluated lazily at admission
//! - State lock is never held across an await; outcomes re-read the state
//! - Fallback results count as neither success nor failure
//! - `NotFound` is a healthy answer: it never counts as a failure, and a
//!   Half-Open trial that ends in `NotFound` closes the breaker
//!
//! # Known Limitation
//! Calls arriving while Half-Open are not serialized. Several trial calls may
//! run at once and their outcomes race, so the breaker can flap between Open
//! and Closed under concurrent load.

use serde::Serialize;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use crate::observability::metrics;
use crate::upstream::types::{UpstreamError, UpstreamResult};

/// Breaker state as exported to metrics and the admin API.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

/// Threshold and cooldown for one breaker.
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
}

/// Point-in-time view of a breaker.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    pub reset_timeout_ms: u64,
}

/// Per-dependency circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        tracing::info!(
            dependency = %name,
            failure_threshold = config.failure_threshold,
            reset_timeout_ms = config.reset_timeout.as_millis() as u64,
            "Circuit breaker initialized"
        );
        metrics::record_circuit_state(&name, CircuitState::Closed);

        Self {
            name,
            config,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure_at: None,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let state = self.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: state.state,
            consecutive_failures: state.consecutive_failures,
            failure_threshold: self.config.failure_threshold,
            reset_timeout_ms: self.config.reset_timeout.as_millis() as u64,
        }
    }

    /// Force the breaker back to Closed.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.state = CircuitState::Closed;
        state.consecutive_failures = 0;
        state.last_failure_at = None;
        metrics::record_circuit_state(&self.name, CircuitState::Closed);
        tracing::info!(dependency = %self.name, "Circuit breaker reset to CLOSED");
    }

    /// Run `call` under the breaker. Fails with `CircuitOpen` while open.
    pub async fn call<T, F, Fut>(&self, call: F) -> UpstreamResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = UpstreamResult<T>>,
    {
        if !self.admit() {
            return Err(UpstreamError::CircuitOpen {
                dependency: self.name.clone(),
            });
        }

        let result = call().await;
        self.record(&result);
        result
    }

    /// Run `call` under the breaker, answering with `fallback` while open.
    pub async fn call_with_fallback<T, F, Fut, FB, FBFut>(&self, call: F, fallback: FB) -> UpstreamResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = UpstreamResult<T>>,
        FB: FnOnce() -> FBFut,
        FBFut: Future<Output = T>,
    {
        if !self.admit() {
            return Ok(fallback().await);
        }

        let result = call().await;
        self.record(&result);
        result
    }

    fn close(&self, state: &mut BreakerState) {
        state.state = CircuitState::Closed;
        state.consecutive_failures = 0;
        metrics::record_circuit_state(&self.name, CircuitState::Closed);
        tracing::info!(dependency = %self.name, "Circuit breaker HALF_OPEN -> CLOSED after successful trial");
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decide whether a call may proceed, moving Open → Half-Open once cooled down.
    fn admit(&self) -> bool {
        let mut state = self.lock();
        match state.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled_down = state
                    .last_failure_at
                    .map_or(true, |at| at.elapsed() > self.config.reset_timeout);

                if cooled_down {
                    state.state = CircuitState::HalfOpen;
                    metrics::record_circuit_state(&self.name, CircuitState::HalfOpen);
                    tracing::info!(dependency = %self.name, "Circuit breaker OPEN -> HALF_OPEN");
                    true
                } else {
                    tracing::debug!(dependency = %self.name, "Circuit breaker OPEN, failing fast");
                    false
                }
            }
        }
    }

    fn record<T>(&self, result: &UpstreamResult<T>) {
        // Re-read: other calls may have moved the state while this one was in flight.
        let mut state = self.lock();

        match result {
            Ok(_) => match state.state {
                CircuitState::HalfOpen => self.close(&mut state),
                CircuitState::Closed => state.consecutive_failures = 0,
                CircuitState::Open => {}
            },
            // The dependency answered; an unknown resource says nothing about its health.
            Err(UpstreamError::NotFound(_)) => {
                if state.state == CircuitState::HalfOpen {
                    self.close(&mut state);
                }
            }
            Err(e) => {
                state.consecutive_failures = state.consecutive_failures.saturating_add(1);
                state.last_failure_at = Some(Instant::now());

                tracing::warn!(
                    dependency = %self.name,
                    error = %e,
                    failures = state.consecutive_failures,
                    threshold = self.config.failure_threshold,
                    "Circuit breaker registered failure"
                );

                let reopen = match state.state {
                    CircuitState::HalfOpen => true,
                    CircuitState::Closed => state.consecutive_failures >= self.config.failure_threshold,
                    CircuitState::Open => false,
                };

                if reopen {
                    state.state = CircuitState::Open;
                    metrics::record_circuit_state(&self.name, CircuitState::Open);
                    tracing::error!(
                        dependency = %self.name,
                        failures = state.consecutive_failures,
                        "Circuit breaker -> OPEN"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const RESET: Duration = Duration::from_millis(1_000);

    fn breaker(threshold: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                failure_threshold: threshold,
                reset_timeout: RESET,
            },
        )
    }

    fn failure() -> UpstreamError {
        UpstreamError::ExternalApi { status: Some(500), message: "boom".into() }
    }

    async fn fail(breaker: &CircuitBreaker, invoked: &AtomicU32) -> UpstreamResult<u32> {
        breaker
            .call(|| async {
                invoked.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(failure())
            })
            .await
    }

    async fn succeed(breaker: &CircuitBreaker, invoked: &AtomicU32) -> UpstreamResult<u32> {
        breaker
            .call(|| async {
                invoked.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn test_opens_at_threshold() {
        let breaker = breaker(5);
        let invoked = AtomicU32::new(0);

        for _ in 0..4 {
            assert!(fail(&breaker, &invoked).await.is_err());
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 4);

        assert!(fail(&breaker, &invoked).await.is_err());
        assert_eq!(breaker.state(), CircuitState::Open);

        let err = succeed(&breaker, &invoked).await.unwrap_err();
        assert!(matches!(err, UpstreamError::CircuitOpen { ref dependency } if dependency == "test"));
        assert_eq!(invoked.load(Ordering::SeqCst), 5, "open breaker must not invoke the call");
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_propagate_while_closed() {
        let breaker = breaker(5);
        let invoked = AtomicU32::new(0);

        let err = fail(&breaker, &invoked).await.unwrap_err();
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_consecutive_count() {
        let breaker = breaker(3);
        let invoked = AtomicU32::new(0);

        let _ = fail(&breaker, &invoked).await;
        let _ = fail(&breaker, &invoked).await;
        assert!(succeed(&breaker, &invoked).await.is_ok());
        assert_eq!(breaker.consecutive_failures(), 0);

        let _ = fail(&breaker, &invoked).await;
        let _ = fail(&breaker, &invoked).await;
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_not_a_failure() {
        let breaker = breaker(2);
        let invoked = AtomicU32::new(0);
        let missing = || async { Err::<u32, _>(UpstreamError::NotFound("/product/990".into())) };

        let _ = fail(&breaker, &invoked).await;
        for _ in 0..5 {
            let err = breaker.call(missing).await.unwrap_err();
            assert!(matches!(err, UpstreamError::NotFound(_)));
        }

        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 1, "count left untouched");
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_trial_not_found_closes() {
        let breaker = breaker(1);
        let invoked = AtomicU32::new(0);
        let _ = fail(&breaker, &invoked).await;
        assert_eq!(breaker.state(), CircuitState::Open);

        tokio::time::advance(RESET + Duration::from_millis(1)).await;
        let err = breaker
            .call(|| async { Err::<u32, _>(UpstreamError::NotFound("/product/990".into())) })
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::NotFound(_)));
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_used_while_open() {
        let breaker = breaker(1);
        let invoked = AtomicU32::new(0);
        let _ = fail(&breaker, &invoked).await;

        let result = breaker
            .call_with_fallback(
                || async {
                    invoked.fetch_add(1, Ordering::SeqCst);
                    Ok(vec!["live".to_string()])
                },
                || async { Vec::new() },
            )
            .await
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(invoked.load(Ordering::SeqCst), 1);
        assert_eq!(breaker.consecutive_failures(), 1, "fallback must not count as a failure");
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_trial_success_closes() {
        let breaker = breaker(2);
        let invoked = AtomicU32::new(0);
        let _ = fail(&breaker, &invoked).await;
        let _ = fail(&breaker, &invoked).await;

        tokio::time::advance(RESET).await;
        assert!(succeed(&breaker, &invoked).await.is_err(), "cooldown not yet exceeded");

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(succeed(&breaker, &invoked).await.unwrap(), 7);
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
        assert_eq!(invoked.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_half_open_trial_failure_reopens() {
        let breaker = breaker(2);
        let invoked = AtomicU32::new(0);
        let _ = fail(&breaker, &invoked).await;
        let _ = fail(&breaker, &invoked).await;

        tokio::time::advance(RESET + Duration::from_millis(1)).await;
        assert!(fail(&breaker, &invoked).await.is_err());
        assert_eq!(invoked.load(Ordering::SeqCst), 3, "exactly one trial call is let through");
        assert_eq!(breaker.state(), CircuitState::Open);

        // Cooldown restarts from the trial failure.
        let err = succeed(&breaker, &invoked).await.unwrap_err();
        assert!(matches!(err, UpstreamError::CircuitOpen { .. }));
        assert_eq!(invoked.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_and_snapshot() {
        let breaker = breaker(1);
        let invoked = AtomicU32::new(0);
        let _ = fail(&breaker, &invoked).await;

        let snap = breaker.snapshot();
        assert_eq!(snap.state, CircuitState::Open);
        assert_eq!(snap.consecutive_failures, 1);
        assert_eq!(snap.reset_timeout_ms, 1_000);

        breaker.reset();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(succeed(&breaker, &invoked).await.is_ok());
    }

    #[test]
    fn test_state_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&CircuitState::HalfOpen).unwrap(), "\"HALF_OPEN\"");
    }
}
