//! Monitor error definitions.

use thiserror::Error;

/// Errors surfaced to callers of the host registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Address is empty or does not resolve to a probe target.
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Host id cannot be used as a registry key.
    #[error("invalid host id {0:?}")]
    InvalidId(String),

    /// Registration key already in use.
    #[error("host {0:?} already registered")]
    DuplicateHost(String),

    /// No host under this key.
    #[error("host {0:?} not found")]
    NotFound(String),
}

/// Echo transport failures. Handled inside the supervisor, never surfaced by the registry
/// except as [`RegistryError::InvalidAddress`] during resolution.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Raw socket could not be created or used.
    #[error("socket error: {0}")]
    Socket(#[from] std::io::Error),

    /// Hostname lookup failed.
    #[error("cannot resolve {address:?}: {reason}")]
    Resolve { address: String, reason: String },

    /// Probe failed for a reason other than a timeout.
    #[error("probe failed: {0}")]
    Probe(String),

    /// Session ended without an explicit error.
    #[error("transport session closed")]
    Closed,
}
