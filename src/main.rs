//! pingd daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!     API client                ┌──────────────────────────────────────────────┐
//!     ──────────────────────────┼─▶ http (axum) ──▶ HostRegistry (RwLock map)   │
//!                               │                      │   ▲                    │
//!                               │              spawn / stop│   │ window writes  │
//!                               │                      ▼   │                    │
//!                               │   PingSupervisor (one task per host)          │
//!                               │        ▲ events              │ aggregates     │
//!                               │        │                     ▼                │
//!                               │   IcmpTransport          MetricsSink          │
//!                               │   (surge-ping)      Prometheus / Graphite     │
//!                               └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use clap::Parser;
use tokio::net::TcpListener;

use pingd::config::{load_config, validate_config, PingdConfig};
use pingd::http::ApiServer;
use pingd::lifecycle::{signals, startup, Shutdown};
use pingd::monitor::{HostRegistry, IcmpTransport};
use pingd::observability::{self, FanoutSink, GraphiteSink, MetricsSink, PrometheusSink};

#[derive(Parser)]
#[command(name = "pingd")]
#[command(about = "ICMP latency monitor with an HTTP host registry", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API bind address (host:port).
    #[arg(long)]
    api: Option<String>,

    /// Graphite plaintext listener (host:port); enables Graphite export.
    #[arg(long)]
    graphite: Option<String>,

    /// Log level when RUST_LOG is unset.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut PingdConfig) {
        if let Some(api) = &self.api {
            config.api.bind_address = api.clone();
        }
        if let Some(graphite) = &self.graphite {
            config.graphite.enabled = true;
            config.graphite.address = graphite.clone();
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => PingdConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(pingd::config::ConfigError::Validation)?;

    observability::logging::init(&config.observability);
    tracing::info!("pingd v{} starting", env!("CARGO_PKG_VERSION"));

    let settings = config.probe.monitor_settings();
    tracing::info!(
        api = %config.api.bind_address,
        max_rtt = ?settings.probe.max_rtt,
        interval = ?settings.probe.interval,
        window = settings.window_capacity,
        "Configuration loaded"
    );

    let mut sinks = FanoutSink::new();
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                observability::metrics::init_metrics(addr);
                sinks = sinks.with(Arc::new(PrometheusSink));
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }
    if config.graphite.enabled {
        tracing::info!(address = %config.graphite.address, prefix = %config.graphite.prefix, "Graphite export enabled");
        sinks = sinks.with(Arc::new(GraphiteSink::spawn(
            config.graphite.address.clone(),
            config.graphite.prefix.clone(),
        )));
    }
    let sink: Arc<dyn MetricsSink> = Arc::new(sinks);

    let registry = HostRegistry::new(Arc::new(IcmpTransport::new()), sink, settings);
    startup::seed_hosts(&registry, &config.hosts).await;

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let listener = TcpListener::bind(&config.api.bind_address).await?;
    let server = ApiServer::new(&config.api, registry.clone());
    server.run(listener, shutdown).await?;

    registry
        .shutdown(Duration::from_secs(config.api.shutdown_grace_secs))
        .await;

    tracing::info!("Shutdown complete");
    Ok(())
}
