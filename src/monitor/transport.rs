//! Echo transport boundary.
//!
//! # Responsibilities
//! - Define the events a probing session delivers to its supervisor
//! - Define how sessions are opened and torn down
//! - Resolve registration addresses into probe targets
//!
//! # Design Decisions
//! - Events travel over a bounded mpsc channel; the supervisor blocks on it
//! - A session owns its probe task; `close` signals it and joins it
//! - Timeouts are not events: a cycle without a reply simply ends in `Idle`

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::monitor::error::TransportError;

/// Capacity of the per-session event channel.
pub const EVENT_BUFFER: usize = 32;

/// Notification from the transport to a supervisor.
#[derive(Debug)]
pub enum EchoEvent {
    /// Echo reply from `addr` after `rtt`.
    Reply { addr: IpAddr, rtt: Duration },
    /// The current cycle has no more replies pending.
    Idle,
    /// The session failed and will deliver nothing further.
    Error(TransportError),
}

/// Per-session probe parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    /// How long a cycle waits for its reply.
    pub max_rtt: Duration,
    /// Cycle period. Never shorter than `max_rtt`.
    pub interval: Duration,
    /// ICMP payload length in bytes.
    pub payload_size: usize,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            max_rtt: Duration::from_secs(3),
            interval: Duration::from_secs(3),
            payload_size: 56,
        }
    }
}

/// Receiving end of one probing session.
pub struct EchoSession {
    events: mpsc::Receiver<EchoEvent>,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl EchoSession {
    /// Session backed by a spawned probe task that listens on `stop`.
    pub fn new(
        events: mpsc::Receiver<EchoEvent>,
        stop: oneshot::Sender<()>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            events,
            stop: Some(stop),
            task: Some(task),
        }
    }

    /// Session whose producer is driven externally (tests, in-process transports).
    pub fn from_channel(events: mpsc::Receiver<EchoEvent>) -> Self {
        Self {
            events,
            stop: None,
            task: None,
        }
    }

    /// Wait for the next event. `None` once the producer is gone.
    pub async fn next_event(&mut self) -> Option<EchoEvent> {
        self.events.recv().await
    }

    /// Stop the probe task and wait for it to exit.
    pub async fn close(mut self) -> Result<(), TransportError> {
        self.events.close();
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            task.await
                .map_err(|e| TransportError::Probe(format!("probe task failed: {}", e)))?;
        }
        Ok(())
    }
}

impl Drop for EchoSession {
    fn drop(&mut self) {
        // A dropped session must not leave its socket task running.
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Source of echo sessions.
#[async_trait]
pub trait EchoTransport: Send + Sync + 'static {
    /// Turn a registration address into a probe target.
    async fn resolve(&self, address: &str) -> Result<IpAddr, TransportError> {
        resolve_target(address).await
    }

    /// Start probing `target` until the returned session is closed.
    async fn open(
        &self,
        target: IpAddr,
        settings: &ProbeSettings,
    ) -> Result<EchoSession, TransportError>;
}

/// Split off an optional `:port` and check what remains is a plain hostname.
///
/// Input with any other character is rejected rather than cleaned up, so the
/// name that gets resolved is always the one that was registered.
fn hostname_part(address: &str) -> Result<&str, &'static str> {
    let host = match address.rsplit_once(':') {
        Some((host, port)) if port.parse::<u16>().is_ok() => host,
        Some(_) => return Err("malformed port"),
        None => address,
    };

    if host.is_empty() {
        return Err("empty hostname");
    }
    if !host.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-') {
        return Err("invalid character in hostname");
    }
    Ok(host)
}

/// Resolve an IP literal, `ip:port`, or hostname into a single address.
pub async fn resolve_target(address: &str) -> Result<IpAddr, TransportError> {
    let address = address.trim();
    let fail = |reason: &str| TransportError::Resolve {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    if let Ok(ip) = address.parse::<IpAddr>() {
        return Ok(ip);
    }
    if let Ok(sock) = address.parse::<SocketAddr>() {
        return Ok(sock.ip());
    }

    let host = hostname_part(address).map_err(|reason| fail(reason))?;
    let mut addrs = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| fail(&e.to_string()))?;

    // prefer IPv4, the family unprivileged hosts can almost always probe
    let all: Vec<SocketAddr> = addrs.by_ref().collect();
    all.iter()
        .find(|a| a.is_ipv4())
        .or_else(|| all.first())
        .map(|a| a.ip())
        .ok_or_else(|| fail("no addresses"))
}
