//! HTTP API server setup.
//!
//! # Responsibilities
//! - Create the Axum router for host registration and queries
//! - Wire up middleware (tracing, timeout, request ID)
//! - Serve until the shutdown trigger fires

use std::time::{Duration, Instant};
use axum::{
    http::HeaderName,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ApiConfig;
use crate::http::handlers::{add_host, get_host, get_status, list_hosts, remove_host};
use crate::lifecycle::Shutdown;
use crate::monitor::HostRegistry;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: HostRegistry,
    pub started: Instant,
}

/// HTTP front end of the host registry.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    pub fn new(config: &ApiConfig, registry: HostRegistry) -> Self {
        let state = AppState {
            registry,
            started: Instant::now(),
        };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ApiConfig, state: AppState) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);

        Router::new()
            .route("/status", get(get_status))
            .route("/hosts", get(list_hosts).post(add_host))
            .route("/hosts/{id}", get(get_host).delete(remove_host))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
    }

    /// The configured router, for embedding or in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "API server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        tracing::info!("API server stopped");
        Ok(())
    }
}
