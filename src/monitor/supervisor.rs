//! Per-host probing supervisor.
//!
//! # Responsibilities
//! - Own one echo session against the host's target
//! - Reconcile replies, idle notifications and transport errors into window writes
//! - Export the fresh aggregate after every completed cycle
//! - Restart the session after transport failures, with backoff
//!
//! # State Transitions
//! ```text
//! Running → StoppingRequested: stop signal observed (or entry gone from the registry)
//! StoppingRequested → Stopped: session closed, task about to exit
//! ```
//!
//! # Design Decisions
//! - The stop signal is checked first on every loop iteration (`biased` select)
//! - Window writes happen under the registry write lock and only while the
//!   registry still holds this supervisor's entry, so nothing is written after
//!   `remove` returns
//! - Teardown errors are logged, never escalated

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::{oneshot, watch};

use crate::monitor::error::TransportError;
use crate::monitor::registry::{MonitorSettings, SharedHosts};
use crate::monitor::transport::{EchoEvent, EchoSession, EchoTransport};
use crate::monitor::window::ProbeOutcome;
use crate::observability::metrics::MetricsSink;
use crate::resilience::backoff::calculate_backoff;

/// Lifecycle of a supervisor task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorState {
    Running,
    StoppingRequested,
    Stopped,
}

/// Registry-side control of one supervisor.
#[derive(Debug)]
pub struct SupervisorHandle {
    stop: Option<oneshot::Sender<()>>,
    state: watch::Receiver<SupervisorState>,
}

impl SupervisorHandle {
    /// Send the stop signal. Never blocks; a second call is a no-op.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    /// Observer for callers that want to wait for the task to finish.
    pub fn status(&self) -> SupervisorStatus {
        SupervisorStatus(self.state.clone())
    }
}

/// Watch on a supervisor's state that outlives its registry entry.
#[derive(Debug, Clone)]
pub struct SupervisorStatus(watch::Receiver<SupervisorState>);

impl SupervisorStatus {
    pub fn current(&self) -> SupervisorState {
        *self.0.borrow()
    }

    /// Resolve once the supervisor reports `Stopped` (or its task is gone).
    pub async fn wait_stopped(mut self) {
        let _ = self.0.wait_for(|s| *s == SupervisorState::Stopped).await;
    }
}

/// Supervisor-side ends of the control channels.
pub struct SupervisorSignals {
    stop: oneshot::Receiver<()>,
    state: watch::Sender<SupervisorState>,
}

/// Create the linked handle/signals pair for a new supervisor.
pub fn control() -> (SupervisorHandle, SupervisorSignals) {
    let (stop_tx, stop_rx) = oneshot::channel();
    let (state_tx, state_rx) = watch::channel(SupervisorState::Running);
    (
        SupervisorHandle { stop: Some(stop_tx), state: state_rx },
        SupervisorSignals { stop: stop_rx, state: state_tx },
    )
}

/// Why a session ended.
enum SessionExit {
    /// Stop signal received.
    Stop,
    /// Registry no longer holds our entry.
    Orphaned,
    /// Transport failed; restart.
    Failed(TransportError),
}

/// Worker bound to one registry entry.
pub struct PingSupervisor {
    key: String,
    generation: u64,
    target: IpAddr,
    hosts: SharedHosts,
    transport: Arc<dyn EchoTransport>,
    sink: Arc<dyn MetricsSink>,
    settings: MonitorSettings,
}

impl PingSupervisor {
    pub(crate) fn new(
        key: String,
        generation: u64,
        target: IpAddr,
        hosts: SharedHosts,
        transport: Arc<dyn EchoTransport>,
        sink: Arc<dyn MetricsSink>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            key,
            generation,
            target,
            hosts,
            transport,
            sink,
            settings,
        }
    }

    /// Event loop. Returns after publishing `Stopped`.
    pub async fn run(self, signals: SupervisorSignals) {
        let SupervisorSignals { mut stop, state } = signals;
        tracing::info!(host = %self.key, ip = %self.target, "Supervisor starting");

        let mut failures: u32 = 0;

        loop {
            let opened = tokio::select! {
                biased;
                _ = &mut stop => {
                    state.send_replace(SupervisorState::StoppingRequested);
                    tracing::info!(host = %self.key, "Supervisor interrupted while opening session");
                    break;
                }
                opened = self.transport.open(self.target, &self.settings.probe) => opened,
            };

            let exit = match opened {
                Ok(mut session) => {
                    let mut cycles = 0u64;
                    let exit = self.drive(&mut session, &mut stop, &mut cycles).await;
                    if matches!(exit, SessionExit::Stop | SessionExit::Orphaned) {
                        state.send_replace(SupervisorState::StoppingRequested);
                    }
                    if let Err(e) = session.close().await {
                        tracing::warn!(host = %self.key, error = %e, "Session teardown failed");
                    }
                    if cycles > 0 {
                        failures = 0;
                    }
                    exit
                }
                Err(e) => SessionExit::Failed(e),
            };

            match exit {
                SessionExit::Stop => {
                    tracing::info!(host = %self.key, "Supervisor interrupted");
                    break;
                }
                SessionExit::Orphaned => {
                    tracing::info!(host = %self.key, "Host deregistered, supervisor exiting");
                    break;
                }
                SessionExit::Failed(e) => {
                    failures = failures.saturating_add(1);
                    let delay = self.restart_delay(failures);
                    tracing::warn!(
                        host = %self.key,
                        error = %e,
                        attempt = failures,
                        delay = ?delay,
                        "Probe session failed, restarting"
                    );
                    tokio::select! {
                        biased;
                        _ = &mut stop => {
                            state.send_replace(SupervisorState::StoppingRequested);
                            tracing::info!(host = %self.key, "Supervisor interrupted during restart delay");
                            break;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        state.send_replace(SupervisorState::Stopped);
        tracing::info!(host = %self.key, "Supervisor stopped");
    }

    fn restart_delay(&self, attempt: u32) -> Duration {
        calculate_backoff(
            attempt,
            self.settings.restart_base_delay,
            self.settings.restart_max_delay,
        )
    }

    async fn drive(
        &self,
        session: &mut EchoSession,
        stop: &mut oneshot::Receiver<()>,
        cycles: &mut u64,
    ) -> SessionExit {
        // replies seen this cycle, per probed address
        let mut pending: HashMap<IpAddr, Option<Duration>> = HashMap::from([(self.target, None)]);

        loop {
            tokio::select! {
                biased;
                _ = &mut *stop => return SessionExit::Stop,
                event = session.next_event() => match event {
                    Some(EchoEvent::Reply { addr, rtt }) => match pending.get_mut(&addr) {
                        Some(slot) if slot.is_none() => *slot = Some(rtt),
                        Some(_) => {
                            tracing::debug!(host = %self.key, ip = %addr, "Duplicate reply ignored");
                        }
                        None => {
                            tracing::debug!(host = %self.key, ip = %addr, "Reply from unexpected address ignored");
                        }
                    },
                    Some(EchoEvent::Idle) => {
                        if !self.finish_cycle(&mut pending).await {
                            return SessionExit::Orphaned;
                        }
                        *cycles += 1;
                    }
                    Some(EchoEvent::Error(e)) => return SessionExit::Failed(e),
                    None => return SessionExit::Failed(TransportError::Closed),
                },
            }
        }
    }

    /// Write one outcome per pending address and export. False if our entry is gone.
    async fn finish_cycle(&self, pending: &mut HashMap<IpAddr, Option<Duration>>) -> bool {
        let now = Utc::now();

        let aggregate = {
            let mut hosts = self.hosts.write().await;
            let entry = match hosts.get_mut(&self.key) {
                Some(entry) if entry.generation == self.generation => entry,
                _ => return false,
            };

            for reply in pending.values_mut() {
                let outcome = match reply.take() {
                    Some(rtt) => ProbeOutcome::reply(now, rtt),
                    None => ProbeOutcome::loss(now),
                };
                entry.window.insert(outcome);
            }
            entry.last_check = Some(now);
            entry.window.aggregate()
        };

        tracing::debug!(
            host = %self.key,
            last = ?aggregate.last,
            loss = aggregate.loss,
            "Cycle complete"
        );
        self.sink.export(&self.key, now, &aggregate);
        true
    }
}
