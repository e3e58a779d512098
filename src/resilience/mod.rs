//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! Probe session fails (socket error, closed transport):
//!     → backoff.rs (delay grows per consecutive failure, with jitter)
//!     → supervisor reopens the session
//!     → first completed cycle resets the failure count
//! ```
//!
//! # Design Decisions
//! - Restarts are per host; one host backing off never delays another
//! - The wait is interruptible by the host's stop signal

pub mod backoff;
