//! Upstream (remote WebDriver server) addressing and client.
//!
//! # Responsibilities
//! - Hold the current upstream base URL, swappable at runtime
//! - Join the base (which may carry a path like `/wd/hub`) with a request path
//! - Build the shared HTTP client used for forwarding

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::Uri;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;
use url::Url;

/// Client used for every upstream call.
pub type UpstreamClient = Client<HttpConnector, Body>;

/// Build the upstream client.
pub fn build_client() -> UpstreamClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

/// Errors from parsing or joining upstream addresses.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream address: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported upstream scheme `{0}` (only http is supported)")]
    UnsupportedScheme(String),

    #[error("invalid upstream uri: {0}")]
    InvalidUri(#[from] axum::http::uri::InvalidUri),
}

/// Parse and check an upstream base address.
pub fn parse_upstream(address: &str) -> Result<Url, UpstreamError> {
    let url = Url::parse(address)?;
    if url.scheme() != "http" {
        return Err(UpstreamError::UnsupportedScheme(url.scheme().to_string()));
    }
    Ok(url)
}

/// Join a base address and an absolute request path (with optional query).
pub fn join(base: &Url, path_and_query: &str) -> String {
    format!("{}{}", base.as_str().trim_end_matches('/'), path_and_query)
}

/// Shared handle to the current upstream base address.
///
/// Readers take a snapshot per request; the control surface replaces it
/// atomically. In-flight commands keep the address they started with.
#[derive(Debug, Clone)]
pub struct UpstreamAddress {
    inner: Arc<ArcSwap<Url>>,
}

impl UpstreamAddress {
    pub fn new(url: Url) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(url)),
        }
    }

    pub fn parse(address: &str) -> Result<Self, UpstreamError> {
        parse_upstream(address).map(Self::new)
    }

    /// Current base address.
    pub fn get(&self) -> Arc<Url> {
        self.inner.load_full()
    }

    /// Replace the base address.
    pub fn set(&self, url: Url) {
        tracing::info!(upstream = %url, "Upstream address changed");
        self.inner.store(Arc::new(url));
    }

    /// Absolute URI for `path_and_query` on the current upstream.
    pub fn uri_for(&self, path_and_query: &str) -> Result<Uri, UpstreamError> {
        Ok(join(&self.get(), path_and_query).parse::<Uri>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_with_base_path() {
        let upstream = UpstreamAddress::parse("http://localhost:4444/wd/hub").unwrap();
        let uri = upstream.uri_for("/session/abc/url").unwrap();
        assert_eq!(uri.to_string(), "http://localhost:4444/wd/hub/session/abc/url");
    }

    #[test]
    fn test_join_without_base_path() {
        let upstream = UpstreamAddress::parse("http://127.0.0.1:4444").unwrap();
        let uri = upstream.uri_for("/status?verbose=1").unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:4444/status?verbose=1");
    }

    #[test]
    fn test_rejects_non_http() {
        assert!(matches!(
            UpstreamAddress::parse("https://example.com"),
            Err(UpstreamError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            UpstreamAddress::parse("not a url"),
            Err(UpstreamError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_swap_is_visible_to_clones() {
        let upstream = UpstreamAddress::parse("http://localhost:4444").unwrap();
        let handle = upstream.clone();
        handle.set(parse_upstream("http://localhost:5555/wd/hub").unwrap());
        assert_eq!(upstream.get().as_str(), "http://localhost:5555/wd/hub");
    }
}
