//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the daemon.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::monitor::host::HostRegistration;
use crate::monitor::registry::MonitorSettings;
use crate::monitor::transport::ProbeSettings;

/// Root configuration for pingd.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PingdConfig {
    /// HTTP API settings.
    pub api: ApiConfig,

    /// Probe timing and window settings.
    pub probe: ProbeConfig,

    /// Graphite export settings.
    pub graphite: GraphiteConfig,

    /// Logging and Prometheus settings.
    pub observability: ObservabilityConfig,

    /// Hosts registered at startup.
    pub hosts: Vec<HostConfig>,
}

/// HTTP API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Bind address (e.g., "0.0.0.0:8081").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// How long shutdown waits for supervisors to stop, in seconds.
    pub shutdown_grace_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8081".to_string(),
            request_timeout_secs: 10,
            shutdown_grace_secs: 5,
        }
    }
}

/// Probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// How long a cycle waits for its echo reply, in milliseconds.
    pub max_rtt_ms: u64,

    /// Cycle period in milliseconds. Defaults to `max_rtt_ms`.
    pub interval_ms: Option<u64>,

    /// Outcomes kept per host.
    pub window_capacity: usize,

    /// ICMP payload size in bytes.
    pub payload_size: usize,

    /// First restart delay after a transport failure, in milliseconds.
    pub restart_base_delay_ms: u64,

    /// Upper bound for restart delays, in milliseconds.
    pub restart_max_delay_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_rtt_ms: 3000,
            interval_ms: None,
            window_capacity: 10,
            payload_size: 56,
            restart_base_delay_ms: 500,
            restart_max_delay_ms: 30_000,
        }
    }
}

impl ProbeConfig {
    /// Settings handed to the registry.
    pub fn monitor_settings(&self) -> MonitorSettings {
        let max_rtt = Duration::from_millis(self.max_rtt_ms);
        MonitorSettings {
            window_capacity: self.window_capacity,
            probe: ProbeSettings {
                max_rtt,
                interval: Duration::from_millis(self.interval_ms.unwrap_or(self.max_rtt_ms)).max(max_rtt),
                payload_size: self.payload_size,
            },
            restart_base_delay: Duration::from_millis(self.restart_base_delay_ms),
            restart_max_delay: Duration::from_millis(self.restart_max_delay_ms),
        }
    }
}

/// Graphite export configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GraphiteConfig {
    /// Enable Graphite export.
    pub enabled: bool,

    /// Carbon plaintext listener (host:port).
    pub address: String,

    /// Root of every metric path.
    pub prefix: String,
}

impl Default for GraphiteConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "127.0.0.1:2003".to_string(),
            prefix: "pingd".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A host to register at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    /// Registry key. Defaults to the address.
    #[serde(default)]
    pub id: Option<String>,

    /// IP address or hostname.
    pub address: String,
}

impl HostConfig {
    pub fn registration(&self) -> HostRegistration {
        HostRegistration {
            id: self.id.clone(),
            address: self.address.clone(),
        }
    }
}
