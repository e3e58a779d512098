//! Graphite plaintext export.
//!
//! # Responsibilities
//! - Render aggregates as `<prefix>.<host>.<name> <value> <unix_ts>` lines
//! - Ship them over one TCP connection owned by a background writer task
//!
//! # Design Decisions
//! - `export` only queues, into a bounded channel; a full queue drops the batch
//! - Connect and write are both bounded by timeouts, after which the
//!   connection is dropped and retried later
//! - While the backend is down, batches are dropped instead of buffered
//! - Undefined statistics are skipped, never sent as 0

use std::time::Duration;
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{timeout, Instant};

use crate::monitor::window::Aggregate;
use crate::observability::metrics::MetricsSink;

/// Limits on the writer task.
#[derive(Debug, Clone, Copy)]
pub struct WriterLimits {
    /// Batches waiting for the writer before new ones are dropped.
    pub queue_depth: usize,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
    /// Pause between reconnect attempts.
    pub reconnect_backoff: Duration,
}

impl Default for WriterLimits {
    fn default() -> Self {
        Self {
            queue_depth: 1024,
            connect_timeout: Duration::from_secs(3),
            write_timeout: Duration::from_secs(5),
            reconnect_backoff: Duration::from_secs(5),
        }
    }
}

/// Metric sink for a Graphite/Carbon plaintext listener.
#[derive(Clone)]
pub struct GraphiteSink {
    prefix: String,
    tx: mpsc::Sender<String>,
}

impl GraphiteSink {
    /// Start the writer task with default limits. Must be called inside a Tokio runtime.
    pub fn spawn(address: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::spawn_with_limits(address, prefix, WriterLimits::default())
    }

    pub fn spawn_with_limits(
        address: impl Into<String>,
        prefix: impl Into<String>,
        limits: WriterLimits,
    ) -> Self {
        let (tx, rx) = mpsc::channel(limits.queue_depth.max(1));
        tokio::spawn(write_loop(address.into(), rx, limits));
        Self {
            prefix: prefix.into(),
            tx,
        }
    }

    /// Batches currently waiting for the writer.
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

impl MetricsSink for GraphiteSink {
    fn export(&self, host: &str, at: DateTime<Utc>, aggregate: &Aggregate) {
        let batch = render(&self.prefix, host, at, aggregate);
        match self.tx.try_send(batch) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::debug!(host = %host, "Graphite queue full, dropping metrics");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(host = %host, "Graphite writer gone, dropping metrics");
            }
        }
    }
}

/// Dots separate path segments in Graphite.
fn path_segment(host: &str) -> String {
    host.replace('.', "_")
}

/// Render one cycle's metrics as newline-terminated plaintext lines.
pub fn render(prefix: &str, host: &str, at: DateTime<Utc>, aggregate: &Aggregate) -> String {
    let base = format!("{}.{}", prefix, path_segment(host));
    let ts = at.timestamp();
    let mut out = String::new();

    let timings = [
        ("rtt", aggregate.last),
        ("avg", aggregate.avg),
        ("max", aggregate.max),
        ("min", aggregate.min),
    ];
    for (name, value) in timings {
        if let Some(value) = value {
            out.push_str(&format!("{}.{} {} {}\n", base, name, value.as_secs_f64(), ts));
        }
    }
    out.push_str(&format!("{}.loss {} {}\n", base, aggregate.loss, ts));
    out
}

async fn write_loop(address: String, mut rx: mpsc::Receiver<String>, limits: WriterLimits) {
    let mut conn: Option<TcpStream> = None;
    let mut retry_at: Option<Instant> = None;

    while let Some(batch) = rx.recv().await {
        if conn.is_none() {
            if retry_at.is_some_and(|at| Instant::now() < at) {
                continue;
            }
            match timeout(limits.connect_timeout, TcpStream::connect(&address)).await {
                Ok(Ok(stream)) => {
                    tracing::info!(address = %address, "Connected to Graphite");
                    conn = Some(stream);
                    retry_at = None;
                }
                Ok(Err(e)) => {
                    tracing::warn!(address = %address, error = %e, "Graphite connect failed");
                    retry_at = Some(Instant::now() + limits.reconnect_backoff);
                    continue;
                }
                Err(_) => {
                    tracing::warn!(address = %address, "Graphite connect timed out");
                    retry_at = Some(Instant::now() + limits.reconnect_backoff);
                    continue;
                }
            }
        }

        if let Some(stream) = conn.as_mut() {
            match timeout(limits.write_timeout, stream.write_all(batch.as_bytes())).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(address = %address, error = %e, "Graphite write failed, reconnecting");
                    conn = None;
                }
                Err(_) => {
                    tracing::warn!(address = %address, "Graphite write timed out, dropping connection");
                    conn = None;
                    retry_at = Some(Instant::now() + limits.reconnect_backoff);
                }
            }
        }
    }

    tracing::debug!(address = %address, "Graphite writer exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    fn sample() -> Aggregate {
        Aggregate {
            last: Some(Duration::from_millis(20)),
            avg: Some(Duration::from_millis(15)),
            min: Some(Duration::from_millis(10)),
            max: Some(Duration::from_millis(20)),
            loss: 1,
            samples: 3,
        }
    }

    #[test]
    fn test_render_lines() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let out = render("pingd", "gw.lan", at, &sample());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "pingd.gw_lan.rtt 0.02 1700000000",
                "pingd.gw_lan.avg 0.015 1700000000",
                "pingd.gw_lan.max 0.02 1700000000",
                "pingd.gw_lan.min 0.01 1700000000",
                "pingd.gw_lan.loss 1 1700000000",
            ]
        );
    }

    #[test]
    fn test_render_skips_undefined_timings() {
        let agg = Aggregate { loss: 4, samples: 4, ..Aggregate::default() };
        let out = render("p", "h", Utc::now(), &agg);
        assert_eq!(out.lines().count(), 1);
        assert!(out.starts_with("p.h.loss 4 "));
    }

    #[tokio::test]
    async fn test_sink_delivers_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let sink = GraphiteSink::spawn(addr.to_string(), "pingd");
        sink.export("a", Utc::now(), &sample());

        let (socket, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(socket).lines();
        let first = lines.next_line().await.unwrap().unwrap();
        assert!(first.starts_with("pingd.a.rtt 0.02 "), "got {}", first);
    }

    #[tokio::test]
    async fn test_stalled_peer_keeps_queue_bounded() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // accept and hold the socket without ever reading from it
        let holder = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let limits = WriterLimits {
            queue_depth: 8,
            write_timeout: Duration::from_millis(100),
            ..WriterLimits::default()
        };
        let sink = GraphiteSink::spawn_with_limits(addr.to_string(), "x".repeat(4096), limits);

        let exporting = async {
            for _ in 0..2000 {
                sink.export("a", Utc::now(), &sample());
                assert!(sink.queued() <= 8);
                tokio::task::yield_now().await;
            }
        };
        tokio::time::timeout(Duration::from_secs(10), exporting)
            .await
            .expect("export blocked");
        assert!(sink.queued() <= 8);
        holder.abort();
    }

    #[tokio::test]
    async fn test_full_queue_drops_instead_of_growing() {
        // the writer cannot run while this test never yields
        let limits = WriterLimits { queue_depth: 4, ..WriterLimits::default() };
        let sink = GraphiteSink::spawn_with_limits("127.0.0.1:9", "p", limits);
        for _ in 0..100 {
            sink.export("a", Utc::now(), &sample());
        }
        assert_eq!(sink.queued(), 4);
    }
}
