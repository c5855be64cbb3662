//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Single upstream call:
//!     → circuit_breaker.rs (admit, or fail fast / fallback while open)
//!     → retries.rs (sequential attempts, backoff.rs delays)
//!     → timeouts.rs (per-call budget, tighter for known-slow ids)
//!
//! Fan-out:
//!     → batch.rs (deny-list filter, chunks of `concurrency_limit`,
//!       per-chunk deadline, failures become gaps)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Breakers are per dependency and passed explicitly, never global
//! - Errors are classified by variant, never by message text

pub mod backoff;
pub mod batch;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use batch::{BatchOrchestrator, BatchOutcome, DenyList};
pub use circuit_breaker::{BreakerSnapshot, CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use retries::{RetryExecutor, RetryPolicy};
pub use timeouts::CallTimeouts;
