//! Response caching subsystem.
//!
//! # Data Flow
//! ```text
//! upstream client lookup
//!     → store.rs (key "GET:<path>", TTL check on read)
//!         hit  → return cached body
//!         miss → network call; on success the retry hook writes back
//!
//! TTL selection:
//!     popularity.rs → base TTL, or base TTL × multiplier for hot keys
//! ```
//!
//! # Design Decisions
//! - Expiry is lazy; there is no sweeper task
//! - Hot keys get a longer TTL instead of LRU bookkeeping
//! - Backed by DashMap so interleaved requests never block each other

pub mod popularity;
pub mod store;

pub use popularity::PopularityPolicy;
pub use store::{CacheEntry, ResponseCache};
