//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Pipeline and barriers produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, histograms)
//!     → command_log.rs (one transcript line per completed command)
//!
//! Consumers:
//!     → stderr / RUST_LOG filtering
//!     → Metrics endpoint (Prometheus scrape)
//!     → webdriver_log_<id>.txt files in the configured directory
//! ```
//!
//! # Design Decisions
//! - Command IDs flow through every log event for correlation
//! - Metrics are cheap (atomic increments) and optional
//! - The transcript is a barrier like any other; it never delays a command

pub mod command_log;
pub mod logging;
pub mod metrics;

pub use command_log::CommandLogger;
