//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML and every
//! section has defaults, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::resilience::{CircuitBreakerConfig, RetryPolicy};

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Inbound HTTP listener.
    pub listener: ListenerConfig,

    /// Upstream product catalog.
    pub upstream: UpstreamConfig,

    /// Retry behavior for upstream calls.
    pub retries: RetryConfig,

    /// Response cache.
    pub cache: CacheConfig,

    /// Detail fan-out.
    pub batch: BatchConfig,

    /// Per-dependency circuit breakers.
    pub breakers: BreakersConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,

    /// Operational endpoints.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Whole-request timeout for inbound requests in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Upstream catalog configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Catalog base URL.
    pub base_url: String,

    /// Default per-call timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".to_string(),
            request_timeout_ms: 3000,
        }
    }
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 300,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.base_delay_ms))
    }
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Base TTL in milliseconds.
    pub ttl_ms: u64,

    /// Product ids whose responses are kept longer.
    pub popular_ids: Vec<String>,

    /// TTL multiplier for popular keys.
    pub popularity_multiplier: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 60_000,
            popular_ids: (1..=10).map(|id| id.to_string()).collect(),
            popularity_multiplier: 3,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

/// Detail fan-out configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Chunk size; also the cap on outstanding detail calls per request.
    pub max_concurrent_requests: usize,

    /// Deadline for each chunk in milliseconds.
    pub timeout_ms: u64,

    /// Ids never fetched.
    pub deny_list: Vec<String>,

    /// Ids fetched with `slow_timeout_ms` instead of the upstream default.
    pub slow_ids: Vec<String>,

    /// Per-call timeout for `slow_ids` in milliseconds.
    pub slow_timeout_ms: u64,

    /// Abort calls abandoned by a chunk deadline.
    pub abort_on_timeout: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: 10,
            timeout_ms: 5000,
            deny_list: vec!["10000".to_string()],
            slow_ids: vec!["1000".to_string()],
            slow_timeout_ms: 1000,
            abort_on_timeout: false,
        }
    }
}

impl BatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn slow_timeout(&self) -> Duration {
        Duration::from_millis(self.slow_timeout_ms)
    }
}

/// Breaker parameters for one dependency.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Consecutive failures before opening.
    pub failure_threshold: u32,

    /// Cooldown before a trial call, in milliseconds.
    pub reset_timeout_ms: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout_ms: 30_000,
        }
    }
}

impl CircuitBreakerSettings {
    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            reset_timeout: Duration::from_millis(self.reset_timeout_ms),
        }
    }
}

/// Breakers by dependency.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakersConfig {
    pub similar_ids: CircuitBreakerSettings,
    pub product_detail: CircuitBreakerSettings,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount `/admin/*` routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:5000");
        assert_eq!(config.upstream.request_timeout(), Duration::from_millis(3000));
        assert_eq!(config.retries.max_retries, 3);
        assert_eq!(config.cache.ttl(), Duration::from_secs(60));
        assert_eq!(config.cache.popular_ids.len(), 10);
        assert_eq!(config.batch.deny_list, ["10000"]);
        assert_eq!(config.breakers.product_detail.failure_threshold, 5);
    }

    #[test]
    fn test_partial_toml() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [upstream]
            base_url = "http://catalog:3001"

            [breakers.similar_ids]
            failure_threshold = 2

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.upstream.base_url, "http://catalog:3001");
        assert_eq!(config.upstream.request_timeout_ms, 3000);
        assert_eq!(config.breakers.similar_ids.failure_threshold, 2);
        assert_eq!(config.breakers.similar_ids.reset_timeout_ms, 30_000);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
