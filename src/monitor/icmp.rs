//! ICMP echo transport backed by `surge-ping`.
//!
//! # Responsibilities
//! - Own one raw ICMP client per address family, shared by all sessions
//! - Run one probe task per session: send, wait up to max_rtt, report, idle
//!
//! # Design Decisions
//! - Clients are created lazily so a host without IPv6 can still probe IPv4
//! - Each session gets its own identifier; sequence numbers wrap per session
//! - A timeout emits nothing but `Idle`; the supervisor turns that into a loss

use std::net::IpAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use async_trait::async_trait;
use surge_ping::{Client, Config, IcmpPacket, PingIdentifier, PingSequence, SurgeError, ICMP};
use tokio::sync::{mpsc, oneshot, OnceCell};
use tokio::time::{self, Instant};

use crate::monitor::error::TransportError;
use crate::monitor::transport::{EchoEvent, EchoSession, EchoTransport, ProbeSettings, EVENT_BUFFER};

/// Echo transport over raw ICMP sockets.
pub struct IcmpTransport {
    v4: OnceCell<Client>,
    v6: OnceCell<Client>,
    next_ident: AtomicU16,
}

impl IcmpTransport {
    pub fn new() -> Self {
        Self {
            v4: OnceCell::new(),
            v6: OnceCell::new(),
            // process id keeps concurrent daemons on one machine apart
            next_ident: AtomicU16::new(std::process::id() as u16),
        }
    }

    async fn client_for(&self, target: IpAddr) -> Result<Client, TransportError> {
        let (cell, kind) = match target {
            IpAddr::V4(_) => (&self.v4, ICMP::V4),
            IpAddr::V6(_) => (&self.v6, ICMP::V6),
        };
        let client = cell
            .get_or_try_init(|| async {
                let config = Config::builder().kind(kind).build();
                Client::new(&config)
            })
            .await?;
        Ok(client.clone())
    }
}

impl Default for IcmpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EchoTransport for IcmpTransport {
    async fn open(
        &self,
        target: IpAddr,
        settings: &ProbeSettings,
    ) -> Result<EchoSession, TransportError> {
        let client = self.client_for(target).await?;
        let ident = PingIdentifier(self.next_ident.fetch_add(1, Ordering::Relaxed));

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (stop_tx, stop_rx) = oneshot::channel();
        let settings = *settings;

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = stop_rx => {
                    tracing::debug!(ip = %target, "Probe task stopped");
                }
                _ = probe_loop(client, target, ident, settings, events_tx) => {}
            }
        });

        Ok(EchoSession::new(events_rx, stop_tx, task))
    }
}

/// Run cycles until the receiver goes away or the socket fails.
async fn probe_loop(
    client: Client,
    target: IpAddr,
    ident: PingIdentifier,
    settings: ProbeSettings,
    events: mpsc::Sender<EchoEvent>,
) {
    let mut pinger = client.pinger(target, ident).await;
    pinger.timeout(settings.max_rtt);
    let payload = vec![0u8; settings.payload_size];
    let mut seq: u16 = 0;

    loop {
        let cycle_start = Instant::now();

        let event = match pinger.ping(PingSequence(seq), &payload).await {
            Ok((packet, rtt)) => Some(EchoEvent::Reply {
                addr: reply_source(&packet),
                rtt,
            }),
            Err(SurgeError::Timeout { .. }) => {
                tracing::trace!(ip = %target, seq, "Echo timed out");
                None
            }
            Err(e) => {
                let _ = events.send(EchoEvent::Error(TransportError::Probe(e.to_string()))).await;
                return;
            }
        };

        if let Some(event) = event {
            if events.send(event).await.is_err() {
                return;
            }
        }
        if events.send(EchoEvent::Idle).await.is_err() {
            return;
        }

        seq = seq.wrapping_add(1);
        time::sleep_until(cycle_start + settings.interval).await;
    }
}

fn reply_source(packet: &IcmpPacket) -> IpAddr {
    match packet {
        IcmpPacket::V4(p) => IpAddr::V4(p.get_source()),
        IcmpPacket::V6(p) => IpAddr::V6(p.get_source()),
    }
}
