//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → HttpServer → stability barrier → command logger
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → axum stops accepting → drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Barrier order is fixed at startup: stability first, so the command
//!   logger's timings include the wait
//! - In-flight exchanges are drained, never cut

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{build_server, StartupError};
