//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacity > 0, timeouts > 0, interval >= max_rtt)
//! - Check that socket addresses parse and seeded host ids are unique
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PingdConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::PingdConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("probe.interval_ms ({interval}) must not be shorter than probe.max_rtt_ms ({max_rtt})")]
    IntervalTooShort { interval: u64, max_rtt: u64 },

    #[error("probe.restart_base_delay_ms ({base}) exceeds probe.restart_max_delay_ms ({max})")]
    BackoffInverted { base: u64, max: u64 },

    #[error("{field} is not a socket address: {value:?}")]
    BadAddress { field: &'static str, value: String },

    #[error("host {0:?} listed more than once")]
    DuplicateHost(String),

    #[error("host entry with empty address")]
    EmptyHostAddress,
}

pub fn validate_config(config: &PingdConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let probe = &config.probe;

    if probe.window_capacity == 0 {
        errors.push(ValidationError::Zero { field: "probe.window_capacity" });
    }
    if probe.max_rtt_ms == 0 {
        errors.push(ValidationError::Zero { field: "probe.max_rtt_ms" });
    }
    if let Some(interval) = probe.interval_ms {
        if interval < probe.max_rtt_ms {
            errors.push(ValidationError::IntervalTooShort {
                interval,
                max_rtt: probe.max_rtt_ms,
            });
        }
    }
    if probe.restart_base_delay_ms > probe.restart_max_delay_ms {
        errors.push(ValidationError::BackoffInverted {
            base: probe.restart_base_delay_ms,
            max: probe.restart_max_delay_ms,
        });
    }
    if config.api.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "api.request_timeout_secs" });
    }

    let addresses = [
        ("api.bind_address", &config.api.bind_address, true),
        ("observability.metrics_address", &config.observability.metrics_address, config.observability.metrics_enabled),
    ];
    for (field, value, required) in addresses {
        if required && value.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::BadAddress { field, value: value.clone() });
        }
    }
    // graphite may be a hostname, only require host:port shape
    if config.graphite.enabled && config.graphite.address.rsplit_once(':').is_none() {
        errors.push(ValidationError::BadAddress {
            field: "graphite.address",
            value: config.graphite.address.clone(),
        });
    }

    let mut seen = HashSet::new();
    for host in &config.hosts {
        if host.address.trim().is_empty() {
            errors.push(ValidationError::EmptyHostAddress);
            continue;
        }
        let key = host.id.clone().unwrap_or_else(|| host.address.trim().to_string());
        if !seen.insert(key.clone()) {
            errors.push(ValidationError::DuplicateHost(key));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
