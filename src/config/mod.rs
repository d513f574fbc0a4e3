//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → command-line flags override individual fields (main.rs)
//!     → handed to HttpServer::new
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; runtime changes (upstream address,
//!   stability toggle) go through the proxy control routes instead
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::ListenerConfig;
pub use schema::LimitsConfig;
pub use schema::ObservabilityConfig;
pub use schema::ProxyConfig;
pub use schema::StabilityConfig;
pub use schema::UpstreamConfig;
