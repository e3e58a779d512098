//! Startup orchestration.
//!
//! # Responsibilities
//! - Register the hosts listed in the configuration
//!
//! # Design Decisions
//! - A host that fails to register is logged and skipped; the daemon still starts
//! - Seeding runs before the API accepts traffic

use crate::config::HostConfig;
use crate::monitor::HostRegistry;

/// Register configured hosts. Returns how many succeeded.
pub async fn seed_hosts(registry: &HostRegistry, hosts: &[HostConfig]) -> usize {
    let mut registered = 0;
    for host in hosts {
        match registry.add(host.registration()).await {
            Ok(snapshot) => {
                tracing::debug!(host = %snapshot.id, ip = %snapshot.target, "Seeded host");
                registered += 1;
            }
            Err(e) => {
                tracing::warn!(address = %host.address, error = %e, "Skipping configured host");
            }
        }
    }
    tracing::info!(registered, configured = hosts.len(), "Configured hosts registered");
    registered
}
