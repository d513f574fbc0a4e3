//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the HTTP server from a validated configuration
//! - Register the built-in barriers in their fixed order
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The stability barrier is always installed so its toggle is reachable
//!   from the control surface; `stability.enabled` only sets its initial state

use std::sync::Arc;

use thiserror::Error;

use crate::config::ProxyConfig;
use crate::http::{HttpServer, UpstreamError};
use crate::observability::CommandLogger;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("cannot open command log in `{dir}`: {source}")]
    CommandLog {
        dir: String,
        #[source]
        source: std::io::Error,
    },
}

/// Assemble the server with its built-in barriers.
pub fn build_server(config: &ProxyConfig) -> Result<HttpServer, StartupError> {
    let mut server = HttpServer::new(config)?;

    let stability = server.install_stability();
    tracing::info!(enabled = stability.is_enabled(), "Stability waiting installed");

    if let Some(dir) = &config.observability.command_log_dir {
        let logger = CommandLogger::new(dir).map_err(|source| StartupError::CommandLog {
            dir: dir.clone(),
            source,
        })?;
        server.add_barrier(Arc::new(logger));
    }

    Ok(server)
}
