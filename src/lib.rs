//! Similar-products aggregation library.
//!
//! A resilience layer over a product catalog: response cache, retries with
//! backoff, per-dependency circuit breakers and a bounded batch fan-out.

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod upstream;
pub mod admin;

pub use aggregator::SimilarProductsService;
pub use config::schema::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
