//! WebDriver blocking proxy library.
//!
//! Sits between a WebDriver client and a remote WebDriver server, classifies
//! every command, lets registered barriers act on it (and delay it), then
//! relays the exchange unchanged.

pub mod admin;
pub mod barrier;
pub mod command;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use barrier::{Barrier, BarrierError};
pub use command::WebDriverCommand;
pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{CommandKind, EndpointTable};
