//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define the sink supervisors export per-cycle aggregates to
//! - Expose Prometheus-compatible gauges per host
//! - Fan out to several sinks (Prometheus and Graphite at once)
//!
//! # Metrics
//! - `pingd_rtt_seconds` (gauge): last round-trip time
//! - `pingd_avg_seconds` (gauge): average over replies in the window
//! - `pingd_max_seconds` / `pingd_min_seconds` (gauge)
//! - `pingd_loss` (gauge): lost cycles in the window
//! - `pingd_cycles_total` (counter): completed probe cycles
//!
//! # Design Decisions
//! - `export` is called from the probing task and must never block
//! - Undefined statistics are not exported rather than exported as 0

use std::net::SocketAddr;
use std::sync::Arc;
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::monitor::window::Aggregate;

/// Consumer of per-host aggregates, called once per completed cycle.
pub trait MetricsSink: Send + Sync + 'static {
    fn export(&self, host: &str, at: DateTime<Utc>, aggregate: &Aggregate);
}

/// Install the Prometheus recorder with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);

    match builder.install() {
        Ok(_) => tracing::info!(address = %addr, "Prometheus metrics exporter started"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus recorder"),
    }
}

/// Records aggregates through the `metrics` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusSink;

impl MetricsSink for PrometheusSink {
    fn export(&self, host: &str, _at: DateTime<Utc>, aggregate: &Aggregate) {
        let labels = [("host", host.to_string())];

        let gauges = [
            ("pingd_rtt_seconds", aggregate.last),
            ("pingd_avg_seconds", aggregate.avg),
            ("pingd_max_seconds", aggregate.max),
            ("pingd_min_seconds", aggregate.min),
        ];
        for (name, value) in gauges {
            if let Some(value) = value {
                metrics::gauge!(name, &labels).set(value.as_secs_f64());
            }
        }

        metrics::gauge!("pingd_loss", &labels).set(aggregate.loss as f64);
        metrics::counter!("pingd_cycles_total", &labels).increment(1);
    }
}

/// Forwards every export to each inner sink.
#[derive(Default, Clone)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn MetricsSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl MetricsSink for FanoutSink {
    fn export(&self, host: &str, at: DateTime<Utc>, aggregate: &Aggregate) {
        for sink in &self.sinks {
            sink.export(host, at, aggregate);
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn export(&self, _host: &str, _at: DateTime<Utc>, _aggregate: &Aggregate) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Count(Mutex<Vec<String>>);

    impl MetricsSink for Count {
        fn export(&self, host: &str, _at: DateTime<Utc>, _aggregate: &Aggregate) {
            self.0.lock().unwrap().push(host.to_string());
        }
    }

    #[test]
    fn test_fanout_reaches_every_sink() {
        let a = Arc::new(Count::default());
        let b = Arc::new(Count::default());
        let fanout = FanoutSink::new().with(a.clone()).with(b.clone());
        assert_eq!(fanout.len(), 2);

        fanout.export("h1", Utc::now(), &Aggregate::default());
        assert_eq!(*a.0.lock().unwrap(), vec!["h1".to_string()]);
        assert_eq!(*b.0.lock().unwrap(), vec!["h1".to_string()]);
    }

    #[test]
    fn test_prometheus_sink_without_recorder_is_noop() {
        let agg = Aggregate {
            last: Some(Duration::from_millis(3)),
            loss: 1,
            samples: 2,
            ..Aggregate::default()
        };
        PrometheusSink.export("h1", Utc::now(), &agg);
    }
}
