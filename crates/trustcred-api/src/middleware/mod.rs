//! # Middleware Stack
//!
//! - [`envelope`]: `processingTime` stamping and 5xx detail exposure.
//! - [`metrics`]: Prometheus request metrics and the pipeline observer.
//! - [`rate_limit`]: per-client, per-tier fixed-window limits.

pub mod envelope;
pub mod metrics;
pub mod rate_limit;
