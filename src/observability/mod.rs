//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Per-request spans come from tower-http's TraceLayer, keyed by x-request-id.
//! ```

pub mod logging;
pub mod metrics;
