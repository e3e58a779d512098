//! Host identity and point-in-time views.

use std::net::IpAddr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::monitor::error::RegistryError;
use crate::monitor::window::Aggregate;

/// Longest accepted host id in bytes.
pub const MAX_ID_LEN: usize = 64;

/// Registration input. Without an id the address doubles as the key.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostRegistration {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub address: String,
}

impl HostRegistration {
    pub fn new(address: impl Into<String>) -> Self {
        Self { id: None, address: address.into() }
    }

    pub fn with_id(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self { id: Some(id.into()), address: address.into() }
    }

    /// Check the input and derive the immutable [`Host`] identity.
    pub fn into_host(self) -> Result<Host, RegistryError> {
        let address = self.address.trim().to_string();
        if address.is_empty() {
            return Err(RegistryError::InvalidAddress {
                address,
                reason: "address required".to_string(),
            });
        }

        let id = match self.id {
            Some(id) => id.trim().to_string(),
            None => address.clone(),
        };
        validate_id(&id)?;

        Ok(Host { id, address })
    }
}

/// Registry key plus the address as given at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Host {
    pub id: String,
    pub address: String,
}

/// Ids end up in URL paths and metric names.
pub fn validate_id(id: &str) -> Result<(), RegistryError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));

    if valid {
        Ok(())
    } else {
        Err(RegistryError::InvalidId(id.to_string()))
    }
}

/// Copy of a host entry taken under the registry lock.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostSnapshot {
    pub id: String,
    pub address: String,
    pub target: IpAddr,
    pub created: DateTime<Utc>,
    pub last_check: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub stats: Aggregate,
}
