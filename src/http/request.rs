//! Inbound request handling.
//!
//! # Responsibilities
//! - Buffer the client's request body and record it on the command
//! - Build the upstream request (same method, path, headers, body)
//!
//! # Design Decisions
//! - The body is buffered in full before forwarding; WebDriver bodies are
//!   small JSON documents and barriers may want to read them
//! - Hop-by-hop headers are not forwarded; everything else is, untouched
//! - Upstream requests are always HTTP/1.1 regardless of the inbound version

use axum::body::{to_bytes, Body};
use axum::http::{header, request::Parts, HeaderMap, HeaderName, Request};
use bytes::Bytes;

use crate::command::WebDriverCommand;
use crate::http::error::ProxyError;
use crate::http::upstream::UpstreamAddress;

/// Headers that describe a single connection rather than the message.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

fn is_hop_by_hop(name: &HeaderName, connection_tokens: &[String]) -> bool {
    HOP_BY_HOP.contains(name) || connection_tokens.iter().any(|t| t == name.as_str())
}

/// Copy every end-to-end header from `from` into `to`.
pub fn copy_end_to_end_headers(from: &HeaderMap, to: &mut HeaderMap) {
    let connection_tokens: Vec<String> = from
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    for (name, value) in from.iter() {
        if !is_hop_by_hop(name, &connection_tokens) {
            to.append(name.clone(), value.clone());
        }
    }
}

/// Read the whole request body and fire the command's "body received".
pub async fn buffer_body(
    command: &WebDriverCommand,
    body: Body,
    limit: usize,
) -> Result<Bytes, ProxyError> {
    let bytes = to_bytes(body, limit)
        .await
        .map_err(|e| ProxyError::request_body(&e))?;

    tracing::trace!(
        command_id = %command.id(),
        bytes = bytes.len(),
        "Request body buffered"
    );
    command.handle_data(bytes.clone());
    Ok(bytes)
}

/// Build the request sent to `<upstream><path>`.
pub fn upstream_request(
    upstream: &UpstreamAddress,
    parts: &Parts,
    path: &str,
    body: Bytes,
) -> Result<Request<Body>, ProxyError> {
    let uri = upstream.uri_for(path)?;
    let mut builder = Request::builder().method(parts.method.clone()).uri(uri);
    if let Some(headers) = builder.headers_mut() {
        copy_end_to_end_headers(&parts.headers, headers);
    }
    Ok(builder.body(Body::from(body))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{CommandKind, Params};
    use axum::http::{HeaderValue, Method};

    #[test]
    fn test_strips_hop_by_hop_headers() {
        let mut from = HeaderMap::new();
        from.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        from.insert(header::HOST, HeaderValue::from_static("localhost:8111"));
        from.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, x-private"));
        from.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        from.insert("x-private", HeaderValue::from_static("1"));
        from.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        from.append("x-multi", HeaderValue::from_static("a"));
        from.append("x-multi", HeaderValue::from_static("b"));

        let mut to = HeaderMap::new();
        copy_end_to_end_headers(&from, &mut to);

        assert_eq!(to.get(header::CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(to.get(header::HOST).unwrap(), "localhost:8111");
        assert_eq!(to.get_all("x-multi").iter().count(), 2);
        assert!(to.get(header::CONNECTION).is_none());
        assert!(to.get("keep-alive").is_none());
        assert!(to.get("x-private").is_none());
        assert!(to.get(header::TRANSFER_ENCODING).is_none());
    }

    #[test]
    fn test_upstream_request() {
        let upstream = UpstreamAddress::parse("http://127.0.0.1:4444/wd/hub").unwrap();
        let (parts, _) = Request::builder()
            .method(Method::POST)
            .uri("/session/abc/url?x=1")
            .header(header::CONTENT_TYPE, "application/json")
            .body(())
            .unwrap()
            .into_parts();

        let body = Bytes::from_static(b"{}");
        let request = upstream_request(&upstream, &parts, "/session/abc/url?x=1", body).unwrap();
        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.uri(), "http://127.0.0.1:4444/wd/hub/session/abc/url?x=1");
        assert_eq!(request.headers().get(header::CONTENT_TYPE).unwrap(), "application/json");
    }

    #[tokio::test]
    async fn test_buffer_body_fires_data() {
        let command =
            WebDriverCommand::new(CommandKind::Go, Method::POST, "/session/a/url", Params::new());
        let bytes = buffer_body(&command, Body::from(r#"{"url":"http://example.com"}"#), 1024)
            .await
            .unwrap();

        assert_eq!(&bytes[..], br#"{"url":"http://example.com"}"#);
        assert_eq!(command.data().unwrap().raw(), &bytes);
    }

    #[tokio::test]
    async fn test_buffer_body_over_limit() {
        let command =
            WebDriverCommand::new(CommandKind::Go, Method::POST, "/session/a/url", Params::new());
        let err = buffer_body(&command, Body::from(vec![b'x'; 64]), 16).await.unwrap_err();

        assert!(matches!(err, ProxyError::RequestBody(_)));
        assert!(command.data().is_none());
    }
}
