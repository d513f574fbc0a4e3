//! Proxy control surface.
//!
//! Requests under `/stabilize_proxy/` address the proxy itself. They are
//! answered here and never classified, passed to barriers, or forwarded.
//!
//! ```text
//! GET  /stabilize_proxy/enabled            → {"value": true}
//! POST /stabilize_proxy/enabled            ← {"value": false}
//! GET  /stabilize_proxy/selenium_address   → {"value": "http://host:4444/wd/hub"}
//! POST /stabilize_proxy/selenium_address   ← {"value": "http://other:4444/wd/hub"}
//! ```

pub mod error;
pub mod handlers;

use axum::{routing::any, Router};

use crate::http::server::AppState;
use self::handlers::handle_command;

pub use error::ControlError;

/// Routes for single-segment control commands. Anything else under the
/// prefix falls through to the proxy handler, which answers 404.
pub fn setup_control_routes() -> Router<AppState> {
    Router::new().route("/stabilize_proxy/{command}", any(handle_command))
}

/// Response for an unrecognised control command.
pub fn unknown_command() -> ControlError {
    ControlError::UnknownCommand
}
