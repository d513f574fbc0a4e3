//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Client connection
//!     → server.rs (Axum setup, classification, barrier chain)
//!     → request.rs (buffer body, build upstream request)
//!     → upstream.rs (current upstream address, shared client)
//!     → response.rs (relay status/headers/body, capture a copy)
//!     → Send to client
//! ```

pub mod error;
pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use error::ProxyError;
pub use server::{AppState, HttpServer};
pub use upstream::{UpstreamAddress, UpstreamClient, UpstreamError};
