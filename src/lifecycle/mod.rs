//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build sinks + registry → Seed hosts → Start API
//!
//! Shutdown (shutdown.rs):
//!     Signal received → API stops accepting → Registry stops supervisors → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Ordered shutdown: stop accept, then stop probing
//! - Supervisor shutdown has a grace period, then the process exits regardless

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
