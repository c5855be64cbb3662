//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (--config / SIMILAR_CONFIG)
//!     → environment overrides (loader.rs)
//!     → validation.rs (semantic checks, all errors at once)
//!     → ServiceConfig (validated, immutable)
//!     → lifecycle::startup builds the service from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, load_from, ConfigError, CONFIG_PATH_ENV};
pub use schema::{
    AdminConfig, BatchConfig, BreakersConfig, CacheConfig, CircuitBreakerSettings, ListenerConfig,
    LogFormat, ObservabilityConfig, RetryConfig, ServiceConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
