//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! cache, registry and http produce:
//!     → logging.rs (structured log events through `tracing`)
//!     → metrics.rs (counters, gauges, histograms through `metrics`)
//!
//! Consumers:
//!     → stdout (fmt subscriber, filtered by RUST_LOG or config)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Metric updates are no-ops until a recorder is installed
//! - Request ID flows through the access log span

pub mod logging;
pub mod metrics;
