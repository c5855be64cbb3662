//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → request.rs (assign/propagate x-request-id)
//!     → server.rs (trace span, timeout, metrics, routing)
//!     → aggregator / admin handlers
//!     → response.rs (UpstreamError → status + JSON envelope)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::{error_response, status_code_for, StatusBody};
pub use server::{AppState, HttpServer};
