//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout)
//!     → handlers.rs
//!         GET    /hosts        → HostRegistry::list
//!         POST   /hosts        → HostRegistry::add
//!         GET    /hosts/{id}   → HostRegistry::get
//!         DELETE /hosts/{id}   → HostRegistry::remove
//!         GET    /status       → version, host count, uptime
//!     → response.rs (RegistryError → status code + JSON body)
//! ```

pub mod handlers;
pub mod response;
pub mod server;

pub use response::ApiError;
pub use server::{ApiServer, AppState, X_REQUEST_ID};
