//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and addresses.
//! All problems are reported at once, not just the first.

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::ServiceConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new("listener.bind_address", "not a socket address"));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be > 0"));
    }

    match Url::parse(&config.upstream.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => errors.push(ValidationError::new(
            "upstream.base_url",
            format!("unsupported scheme '{}'", url.scheme()),
        )),
        Err(e) => errors.push(ValidationError::new("upstream.base_url", e.to_string())),
    }
    if config.upstream.request_timeout_ms == 0 {
        errors.push(ValidationError::new("upstream.request_timeout_ms", "must be > 0"));
    }

    if config.cache.popularity_multiplier == 0 {
        errors.push(ValidationError::new("cache.popularity_multiplier", "must be >= 1"));
    }

    if config.batch.max_concurrent_requests == 0 {
        errors.push(ValidationError::new("batch.max_concurrent_requests", "must be >= 1"));
    }
    if config.batch.timeout_ms == 0 {
        errors.push(ValidationError::new("batch.timeout_ms", "must be > 0"));
    }
    if config.batch.slow_timeout_ms == 0 {
        errors.push(ValidationError::new("batch.slow_timeout_ms", "must be > 0"));
    }

    for (field, settings) in [
        ("breakers.similar_ids.failure_threshold", &config.breakers.similar_ids),
        ("breakers.product_detail.failure_threshold", &config.breakers.product_detail),
    ] {
        if settings.failure_threshold == 0 {
            errors.push(ValidationError::new(field, "must be >= 1"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new("observability.metrics_address", "not a socket address"));
    }

    if config.admin.enabled && config.admin.api_key.is_empty() {
        errors.push(ValidationError::new("admin.api_key", "must not be empty when admin is enabled"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
