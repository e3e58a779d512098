//! pingd: ICMP reachability and latency monitor.
//!
//! Hosts are registered at runtime; each gets its own probing supervisor
//! feeding a rolling window of outcomes, queryable through the registry and
//! exported to Prometheus and/or Graphite after every cycle.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod monitor;
pub mod observability;
pub mod resilience;

pub use config::schema::PingdConfig;
pub use http::ApiServer;
pub use lifecycle::Shutdown;
pub use monitor::HostRegistry;
