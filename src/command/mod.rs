//! Command objects.
//!
//! # Data Flow
//! ```text
//! EndpointTable::parse_command
//!     → WebDriverCommand (kind, params, path)         [Received]
//!     → handle_data(body)        → "body received"     [BodyBuffered]
//!     → barriers, forwarding                          [BarriersRunning → Forwarding]
//!     → handle_response(status, body) → "response received" [Complete]
//! ```
//!
//! Barriers and loggers hold an `Arc<WebDriverCommand>` and either await a
//! notification, register an `on_*` callback, or read the fields directly.

pub mod payload;
pub mod state;
pub mod webdriver_command;

pub use payload::{CapturedBody, Payload};
pub use state::CommandState;
pub use webdriver_command::{CommandId, CommandResponse, Listener, WebDriverCommand};
