//! Pipeline errors and their mapping to client responses.

use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::barrier::BarrierError;
use crate::http::upstream::UpstreamError;

/// Why a command could not be forwarded.
///
/// Every variant ends the exchange with a 500 whose body is the error text.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// A barrier rejected the command. The text is the barrier's own.
    #[error("{0}")]
    Barrier(#[from] BarrierError),

    /// Reading the client's request body failed.
    #[error("Error reading request body: {0}")]
    RequestBody(String),

    /// Connecting to or talking to the upstream server failed.
    #[error("Error forwarding to upstream: {0}")]
    Upstream(String),

    #[error(transparent)]
    UpstreamAddress(#[from] UpstreamError),

    #[error("Error building upstream request: {0}")]
    Request(#[from] axum::http::Error),
}

impl ProxyError {
    pub fn request_body(e: &(dyn StdError + 'static)) -> Self {
        ProxyError::RequestBody(describe(e))
    }

    pub fn upstream(e: &(dyn StdError + 'static)) -> Self {
        ProxyError::Upstream(describe(e))
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ProxyError::Barrier(_) => "barrier",
            ProxyError::RequestBody(_) => "request_body",
            ProxyError::Upstream(_) => "upstream",
            ProxyError::UpstreamAddress(_) => "upstream_address",
            ProxyError::Request(_) => "request",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// Render an error with its source chain (`client error: connection refused`).
pub fn describe(e: &(dyn StdError + 'static)) -> String {
    let mut text = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        let inner_text = inner.to_string();
        if !text.contains(&inner_text) {
            text.push_str(": ");
            text.push_str(&inner_text);
        }
        source = inner.source();
    }
    text
}
