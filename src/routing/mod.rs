//! Command classification subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (ordered endpoint scan)
//!     → matcher.rs (method, arity, literal and parameter segments)
//!     → Return: (CommandKind, Params), or (Unknown, {}) on no match
//!
//! Table Construction (at startup):
//!     EndpointTable::builder().add(..)...
//!     → Freeze as immutable EndpointTable
//! ```
//!
//! # Design Decisions
//! - Table is immutable at runtime, shared via `Arc`
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always yields the same command
//! - First match wins (ordered by registration, not specificity)

pub mod kind;
pub mod matcher;
pub mod router;

pub use kind::CommandKind;
pub use matcher::{Endpoint, Params, PathPattern};
pub use router::{is_proxy_command, params, EndpointTable, PROXY_COMMAND_PREFIX};
