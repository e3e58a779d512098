//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → CLI flags override selected fields (main.rs)
//!     → validation.rs (semantic checks, once, on the merged result)
//!     → PingdConfig (validated, immutable)
//!     → ProbeConfig::monitor_settings() → HostRegistry
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; hosts change through the API, not the file
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{ApiConfig, GraphiteConfig, HostConfig, ObservabilityConfig, PingdConfig, ProbeConfig};
pub use validation::{validate_config, ValidationError};
