//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!
//! Supervisors, once per completed cycle:
//!     → metrics.rs MetricsSink::export(host, timestamp, Aggregate)
//!         → PrometheusSink (gauges, scraped from the exporter listener)
//!         → graphite.rs GraphiteSink (plaintext lines, background writer)
//! ```
//!
//! # Design Decisions
//! - Exports are fire-and-forget; a slow or dead backend never stalls probing
//! - Sinks are composable through `FanoutSink`

pub mod graphite;
pub mod logging;
pub mod metrics;

pub use graphite::GraphiteSink;
pub use metrics::{FanoutSink, MetricsSink, NoopSink, PrometheusSink};
