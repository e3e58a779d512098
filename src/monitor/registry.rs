//! Host registry.
//!
//! # Responsibilities
//! - Map host ids to live entries (window + supervisor control)
//! - Serialize registration and removal against concurrent reads
//! - Spawn a supervisor per registration, stop it on removal
//!
//! # Design Decisions
//! - One reader/writer lock for the whole map; supervisors take it only to
//!   write their own window
//! - Validation and name resolution run before the lock is taken
//! - Supervisors are spawned after the write lock is released
//! - Reads return copies, never references into live windows

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::monitor::error::RegistryError;
use crate::monitor::host::{Host, HostRegistration, HostSnapshot};
use crate::monitor::supervisor::{self, PingSupervisor, SupervisorHandle, SupervisorState, SupervisorStatus};
use crate::monitor::transport::{EchoTransport, ProbeSettings};
use crate::monitor::window::{StatsWindow, DEFAULT_CAPACITY};
use crate::observability::metrics::MetricsSink;

pub(crate) type SharedHosts = Arc<RwLock<HashMap<String, HostEntry>>>;

/// Settings applied to every supervisor the registry spawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub window_capacity: usize,
    pub probe: ProbeSettings,
    pub restart_base_delay: Duration,
    pub restart_max_delay: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            window_capacity: DEFAULT_CAPACITY,
            probe: ProbeSettings::default(),
            restart_base_delay: Duration::from_millis(500),
            restart_max_delay: Duration::from_secs(30),
        }
    }
}

/// Live state of one registered host.
pub(crate) struct HostEntry {
    pub(crate) host: Host,
    pub(crate) target: IpAddr,
    pub(crate) created: DateTime<Utc>,
    pub(crate) last_check: Option<DateTime<Utc>>,
    pub(crate) window: StatsWindow,
    /// Distinguishes re-registrations under the same id.
    pub(crate) generation: u64,
    control: SupervisorHandle,
}

impl HostEntry {
    fn snapshot(&self) -> HostSnapshot {
        HostSnapshot {
            id: self.host.id.clone(),
            address: self.host.address.clone(),
            target: self.target,
            created: self.created,
            last_check: self.last_check,
            stats: self.window.aggregate(),
        }
    }
}

struct RegistryInner {
    hosts: SharedHosts,
    transport: Arc<dyn EchoTransport>,
    sink: Arc<dyn MetricsSink>,
    settings: MonitorSettings,
    next_generation: AtomicU64,
}

/// Concurrent map of monitored hosts. Cheap to clone.
#[derive(Clone)]
pub struct HostRegistry {
    inner: Arc<RegistryInner>,
}

impl HostRegistry {
    pub fn new(
        transport: Arc<dyn EchoTransport>,
        sink: Arc<dyn MetricsSink>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                hosts: Arc::new(RwLock::new(HashMap::new())),
                transport,
                sink,
                settings,
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    /// Register a host and start probing it.
    pub async fn add(&self, registration: HostRegistration) -> Result<HostSnapshot, RegistryError> {
        let host = registration.into_host()?;

        // cheap rejection before a DNS round-trip; re-checked under the write lock
        if self.inner.hosts.read().await.contains_key(&host.id) {
            return Err(RegistryError::DuplicateHost(host.id));
        }

        let target = self
            .inner
            .transport
            .resolve(&host.address)
            .await
            .map_err(|e| RegistryError::InvalidAddress {
                address: host.address.clone(),
                reason: e.to_string(),
            })?;

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let (handle, signals) = supervisor::control();
        let key = host.id.clone();
        let entry = HostEntry {
            host,
            target,
            created: Utc::now(),
            last_check: None,
            window: StatsWindow::new(self.inner.settings.window_capacity),
            generation,
            control: handle,
        };

        let snapshot = {
            let mut hosts = self.inner.hosts.write().await;
            if hosts.contains_key(&key) {
                return Err(RegistryError::DuplicateHost(key));
            }
            let snapshot = entry.snapshot();
            hosts.insert(key.clone(), entry);
            snapshot
        };

        let supervisor = PingSupervisor::new(
            key.clone(),
            generation,
            target,
            self.inner.hosts.clone(),
            self.inner.transport.clone(),
            self.inner.sink.clone(),
            self.inner.settings,
        );
        tokio::spawn(supervisor.run(signals));

        tracing::info!(host = %key, ip = %target, "Host registered");
        Ok(snapshot)
    }

    /// Point-in-time copy of one host.
    pub async fn get(&self, key: &str) -> Result<HostSnapshot, RegistryError> {
        let hosts = self.inner.hosts.read().await;
        hosts
            .get(key)
            .map(HostEntry::snapshot)
            .ok_or_else(|| RegistryError::NotFound(key.to_string()))
    }

    /// Copies of all hosts, ordered by id.
    pub async fn list(&self) -> Vec<HostSnapshot> {
        let mut snapshots: Vec<HostSnapshot> = {
            let hosts = self.inner.hosts.read().await;
            hosts.values().map(HostEntry::snapshot).collect()
        };
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        snapshots
    }

    /// Deregister a host and signal its supervisor.
    ///
    /// Does not wait for the supervisor; the returned status can be awaited
    /// by callers that need to.
    pub async fn remove(&self, key: &str) -> Result<SupervisorStatus, RegistryError> {
        let entry = {
            let mut hosts = self.inner.hosts.write().await;
            let mut entry = hosts
                .remove(key)
                .ok_or_else(|| RegistryError::NotFound(key.to_string()))?;
            entry.control.stop();
            entry
        };

        tracing::info!(host = %key, "Host deregistered");
        Ok(entry.control.status())
    }

    pub async fn len(&self) -> usize {
        self.inner.hosts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.hosts.read().await.is_empty()
    }

    pub async fn supervisor_state(&self, key: &str) -> Option<SupervisorState> {
        let hosts = self.inner.hosts.read().await;
        hosts.get(key).map(|entry| entry.control.state())
    }

    /// Deregister everything and wait up to `grace` for each supervisor to stop.
    pub async fn shutdown(&self, grace: Duration) {
        let statuses: Vec<(String, SupervisorStatus)> = {
            let mut hosts = self.inner.hosts.write().await;
            hosts
                .drain()
                .map(|(key, mut entry)| {
                    entry.control.stop();
                    (key, entry.control.status())
                })
                .collect()
        };

        tracing::info!(hosts = statuses.len(), "Stopping all supervisors");

        let deadline = tokio::time::Instant::now() + grace;
        for (key, status) in statuses {
            if tokio::time::timeout_at(deadline, status.wait_stopped()).await.is_err() {
                tracing::warn!(host = %key, "Supervisor did not stop within grace period");
            }
        }
    }
}
