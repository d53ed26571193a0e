//! API layer
//!
//! HTTP handlers for:
//! - Session payload
//! - Ideas
//! - Metrics (Prometheus)

mod converters;
mod dto;
mod ideas;
pub mod metrics;
mod session;

pub use converters::*;
pub use dto::*;

pub use ideas::ideas_router;
pub use metrics::metrics_router;
pub use session::session_router;
