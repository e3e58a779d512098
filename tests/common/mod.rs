//! Shared utilities for integration tests.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use pingd::monitor::{
    Aggregate, EchoEvent, EchoSession, EchoTransport, HostRegistry, MonitorSettings, ProbeSettings,
    TransportError,
};
use pingd::observability::MetricsSink;

/// Generous bound for anything the tests wait on.
pub const WAIT: Duration = Duration::from_secs(5);

/// Test side of one opened echo session.
pub struct SessionControl {
    pub target: IpAddr,
    events: mpsc::Sender<EchoEvent>,
}

#[allow(dead_code)]
impl SessionControl {
    pub async fn reply_from(&self, addr: IpAddr, rtt: Duration) {
        let _ = self.events.send(EchoEvent::Reply { addr, rtt }).await;
    }

    pub async fn reply(&self, rtt_ms: u64) {
        self.reply_from(self.target, Duration::from_millis(rtt_ms)).await;
    }

    pub async fn idle(&self) {
        let _ = self.events.send(EchoEvent::Idle).await;
    }

    pub async fn fail(&self, reason: &str) {
        let _ = self
            .events
            .send(EchoEvent::Error(TransportError::Probe(reason.to_string())))
            .await;
    }

    /// Resolves once the supervisor has closed or dropped the session.
    pub async fn closed(&self) {
        self.events.closed().await;
    }

    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }
}

/// Echo transport driven entirely by the test.
///
/// IP literals resolve to themselves, names only through the table; every
/// `open` hands a [`SessionControl`] to the test through a channel.
pub struct ManualTransport {
    names: HashMap<String, IpAddr>,
    opened: mpsc::UnboundedSender<SessionControl>,
    failing_opens: AtomicUsize,
    stalled_opens: AtomicUsize,
    opens: AtomicUsize,
}

#[allow(dead_code)]
impl ManualTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionControl>) {
        let (opened, rx) = mpsc::unbounded_channel();
        let mut names = HashMap::new();
        names.insert("gateway.test".to_string(), "10.0.0.254".parse().unwrap());
        (
            Self {
                names,
                opened,
                failing_opens: AtomicUsize::new(0),
                stalled_opens: AtomicUsize::new(0),
                opens: AtomicUsize::new(0),
            },
            rx,
        )
    }

    /// Make the next `n` calls to `open` fail.
    pub fn fail_next_opens(&self, n: usize) {
        self.failing_opens.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` calls to `open` never complete.
    pub fn stall_next_opens(&self, n: usize) {
        self.stalled_opens.store(n, Ordering::SeqCst);
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EchoTransport for ManualTransport {
    async fn resolve(&self, address: &str) -> Result<IpAddr, TransportError> {
        if let Ok(ip) = address.parse::<IpAddr>() {
            return Ok(ip);
        }
        self.names.get(address).copied().ok_or_else(|| TransportError::Resolve {
            address: address.to_string(),
            reason: "unknown test host".to_string(),
        })
    }

    async fn open(
        &self,
        target: IpAddr,
        _settings: &ProbeSettings,
    ) -> Result<EchoSession, TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let stall = self
            .stalled_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stall {
            std::future::pending::<()>().await;
        }
        let fail = self
            .failing_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            return Err(TransportError::Probe("socket unavailable".to_string()));
        }

        let (events, rx) = mpsc::channel(16);
        let _ = self.opened.send(SessionControl { target, events });
        Ok(EchoSession::from_channel(rx))
    }
}

/// One captured export.
#[derive(Debug, Clone)]
pub struct Export {
    pub host: String,
    pub at: DateTime<Utc>,
    pub aggregate: Aggregate,
}

/// Metrics sink that forwards every export to the test.
pub struct RecordingSink {
    tx: mpsc::UnboundedSender<Export>,
}

impl RecordingSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Export>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MetricsSink for RecordingSink {
    fn export(&self, host: &str, at: DateTime<Utc>, aggregate: &Aggregate) {
        let _ = self.tx.send(Export {
            host: host.to_string(),
            at,
            aggregate: *aggregate,
        });
    }
}

/// Everything a test needs to drive a registry.
#[allow(dead_code)]
pub struct Harness {
    pub registry: HostRegistry,
    pub transport: Arc<ManualTransport>,
    pub sessions: mpsc::UnboundedReceiver<SessionControl>,
    pub exports: mpsc::UnboundedReceiver<Export>,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::with_capacity(10)
    }

    pub fn with_capacity(window_capacity: usize) -> Self {
        let (transport, sessions) = ManualTransport::new();
        let (sink, exports) = RecordingSink::new();
        let transport = Arc::new(transport);
        let settings = MonitorSettings {
            window_capacity,
            restart_base_delay: Duration::from_millis(10),
            restart_max_delay: Duration::from_millis(50),
            ..MonitorSettings::default()
        };
        let registry = HostRegistry::new(transport.clone(), Arc::new(sink), settings);
        Self {
            registry,
            transport,
            sessions,
            exports,
        }
    }

    /// Next session opened by any supervisor.
    pub async fn next_session(&mut self) -> SessionControl {
        tokio::time::timeout(WAIT, self.sessions.recv())
            .await
            .expect("no session opened")
            .expect("transport dropped")
    }

    /// Next aggregate exported by any supervisor.
    pub async fn next_export(&mut self) -> Export {
        tokio::time::timeout(WAIT, self.exports.recv())
            .await
            .expect("no export")
            .expect("sink dropped")
    }

    /// Drive one full cycle: optional reply, then idle, then wait for the export.
    pub async fn cycle(&mut self, session: &SessionControl, rtt_ms: Option<u64>) -> Export {
        if let Some(rtt) = rtt_ms {
            session.reply(rtt).await;
        }
        session.idle().await;
        self.next_export().await
    }
}
