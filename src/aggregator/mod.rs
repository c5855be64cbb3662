//! Aggregation subsystem.
//!
//! # Data Flow
//! ```text
//! GET /product/{id}/similar
//!     → service.rs
//!         → ids breaker (fallback: []) → client.similar_ids
//!             NotFound / empty → []
//!         → batch orchestrator (deny-list, chunks, deadline)
//!             → per id: detail breaker → client.product_detail(timeout override)
//!         → drop gaps, keep upstream order
//! ```

pub mod service;

pub use service::SimilarProductsService;
