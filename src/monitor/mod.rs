//! Host monitoring subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (registry.rs):
//!     HostRegistration → host.rs (validate id/address)
//!     → transport.resolve (probe target)
//!     → insert HostEntry { StatsWindow, SupervisorHandle }
//!     → spawn supervisor.rs
//!
//! Probing (supervisor.rs):
//!     EchoSession events (icmp.rs / any EchoTransport)
//!     Reply → mark pending address answered
//!     Idle  → write outcome into window.rs (registry lock) → MetricsSink
//!     Error → close session, back off, reopen
//!     Stop  → close session → Stopped
//!
//! Queries (registry.rs):
//!     get/list → HostSnapshot (copy + Aggregate) under the read lock
//! ```
//!
//! # Design Decisions
//! - One independent task per host; a failing host never affects the others
//! - Loss is an explicit outcome, not a zero round-trip time
//! - Removal is final: after `remove` returns no outcome is written for that entry

pub mod error;
pub mod host;
pub mod icmp;
pub mod registry;
pub mod supervisor;
pub mod transport;
pub mod window;

pub use error::{RegistryError, TransportError};
pub use host::{Host, HostRegistration, HostSnapshot};
pub use icmp::IcmpTransport;
pub use registry::{HostRegistry, MonitorSettings};
pub use supervisor::{SupervisorState, SupervisorStatus};
pub use transport::{EchoEvent, EchoSession, EchoTransport, ProbeSettings};
pub use window::{Aggregate, ProbeOutcome, ProbeResult, StatsWindow};
