//! Upstream product catalog integration.
//!
//! # Data Flow
//! ```text
//! aggregator
//!     → client.rs (cache lookup → retry executor → reqwest GET)
//!     → types.rs (ProductDetail, CallError → UpstreamError)
//! ```

pub mod client;
pub mod types;

pub use client::{ProductApiClient, PRODUCT_DETAIL_DEPENDENCY, SIMILAR_IDS_DEPENDENCY};
pub use types::{CallError, ProductDetail, SimilarProductIds, UpstreamError, UpstreamResult};
