//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::config::schema::{CircuitBreakerSettings, LogFormat, ServiceConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming the optional TOML file.
pub const CONFIG_PATH_ENV: &str = "SIMILAR_CONFIG";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value '{value}' for {var}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Defaults, then the file at `path` if any, then process environment.
pub fn load(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    load_from(path, |var| std::env::var(var).ok())
}

/// Same layering as [`load`], with environment variables read through `lookup`.
pub fn load_from<F>(path: Option<&Path>, lookup: F) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ServiceConfig::default(),
    };

    let config = apply_env_overrides(config, lookup)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables read through `lookup`.
///
/// Unset variables leave the current value alone. A set variable that does
/// not parse is an error rather than silently falling back.
pub fn apply_env_overrides<F>(mut config: ServiceConfig, lookup: F) -> Result<ServiceConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Env { lookup: &lookup };

    if let Some(port) = env.parse::<u16>("PORT")? {
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{}:{}", host, port);
    }

    if let Some(url) = env.string("EXTERNAL_API_BASE_URL") {
        config.upstream.base_url = url;
    }
    env.set("REQUEST_TIMEOUT", &mut config.upstream.request_timeout_ms)?;
    env.set("MAX_RETRIES", &mut config.retries.max_retries)?;
    env.set("RETRY_DELAY", &mut config.retries.base_delay_ms)?;
    env.set("CACHE_TTL", &mut config.cache.ttl_ms)?;
    env.set("MAX_CONCURRENT_REQUESTS", &mut config.batch.max_concurrent_requests)?;
    env.set("BATCH_TIMEOUT", &mut config.batch.timeout_ms)?;

    if let Some(ids) = env.list("DENY_LIST") {
        config.batch.deny_list = ids;
    }
    if let Some(ids) = env.list("SLOW_IDS") {
        config.batch.slow_ids = ids;
    }

    // Shared knobs first, then per-dependency ones win.
    for settings in [&mut config.breakers.similar_ids, &mut config.breakers.product_detail] {
        breaker_overrides(
            &env,
            settings,
            "CIRCUIT_BREAKER_FAILURE_THRESHOLD",
            "CIRCUIT_BREAKER_RESET_TIMEOUT",
        )?;
    }
    breaker_overrides(
        &env,
        &mut config.breakers.similar_ids,
        "SIMILAR_IDS_BREAKER_THRESHOLD",
        "SIMILAR_IDS_BREAKER_RESET_TIMEOUT",
    )?;
    breaker_overrides(
        &env,
        &mut config.breakers.product_detail,
        "PRODUCT_DETAIL_BREAKER_THRESHOLD",
        "PRODUCT_DETAIL_BREAKER_RESET_TIMEOUT",
    )?;

    if let Some(level) = env.string("LOG_LEVEL") {
        config.observability.log_level = level;
    }
    if let Some(format) = env.string("LOG_FORMAT") {
        config.observability.log_format = match format.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => {
                return Err(ConfigError::Env {
                    var: "LOG_FORMAT",
                    value: format,
                })
            }
        };
    }
    env.set("METRICS_ENABLED", &mut config.observability.metrics_enabled)?;

    if let Some(key) = env.string("ADMIN_API_KEY") {
        config.admin.api_key = key;
        config.admin.enabled = true;
    }

    Ok(config)
}

fn breaker_overrides(
    env: &Env<'_>,
    settings: &mut CircuitBreakerSettings,
    threshold_var: &'static str,
    reset_var: &'static str,
) -> Result<(), ConfigError> {
    env.set(threshold_var, &mut settings.failure_threshold)?;
    env.set(reset_var, &mut settings.reset_timeout_ms)
}

struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    fn string(&self, var: &str) -> Option<String> {
        (self.lookup)(var)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parse<T: FromStr>(&self, var: &'static str) -> Result<Option<T>, ConfigError> {
        match self.string(var) {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::Env { var, value }),
            None => Ok(None),
        }
    }

    fn set<T: FromStr>(&self, var: &'static str, target: &mut T) -> Result<(), ConfigError> {
        if let Some(value) = self.parse(var)? {
            *target = value;
        }
        Ok(())
    }

    /// Comma-separated ids; an empty variable is treated as unset.
    fn list(&self, var: &str) -> Option<Vec<String>> {
        self.string(var).map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect()
        })
    }
}
