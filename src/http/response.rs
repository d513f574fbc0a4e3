//! Upstream response relay.
//!
//! # Responsibilities
//! - Copy upstream status and end-to-end headers to the client response
//! - Stream the upstream body to the client frame by frame
//! - Capture a copy of the body and fire "response received" at the end
//!
//! # Design Decisions
//! - Streaming and capture share one source: each frame is copied into the
//!   buffer as it is handed to the client, never re-read
//! - The notification fires when the upstream stream ends, after every
//!   data frame has already been passed on
//! - An upstream error mid-body aborts the client stream (headers are
//!   already out) and marks the command errored; no response is recorded
//! - A client that disconnects mid-body drops the stream unfinished; the
//!   command is marked errored the same way

use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::{Response, StatusCode};
use bytes::{Bytes, BytesMut};
use http_body::{Body as HttpBody, Frame, SizeHint};

use crate::command::WebDriverCommand;
use crate::http::request::copy_end_to_end_headers;
use crate::observability::metrics;

/// Body wrapper that tees every data frame into a buffer.
pub struct CaptureBody<B: HttpBody> {
    inner: B,
    buffer: BytesMut,
    status: StatusCode,
    command: Arc<WebDriverCommand>,
    started: Instant,
    finished: bool,
}

impl<B: HttpBody> CaptureBody<B> {
    pub fn new(inner: B, status: StatusCode, command: Arc<WebDriverCommand>) -> Self {
        Self {
            inner,
            buffer: BytesMut::new(),
            status,
            command,
            started: Instant::now(),
            finished: false,
        }
    }

    fn complete(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let bytes = std::mem::take(&mut self.buffer).freeze();

        tracing::debug!(
            command_id = %self.command.id(),
            kind = %self.command.kind(),
            status = self.status.as_u16(),
            bytes = bytes.len(),
            upstream_ms = self.started.elapsed().as_millis() as u64,
            "Upstream response complete"
        );
        metrics::record_command(self.command.kind(), self.status.as_u16(), self.command.elapsed());
        self.command.handle_response(self.status, bytes);
    }

    fn abort(&mut self, error: &str) {
        self.finished = true;
        self.buffer.clear();
        self.command.fail();
        tracing::error!(
            command_id = %self.command.id(),
            kind = %self.command.kind(),
            error = %error,
            "Upstream response stream failed"
        );
        metrics::record_error("upstream_body");
    }
}

impl<B> HttpBody for CaptureBody<B>
where
    B: HttpBody<Data = Bytes> + Unpin,
    B::Error: std::fmt::Display,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        match ready!(Pin::new(&mut this.inner).poll_frame(cx)) {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    this.buffer.extend_from_slice(data);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Some(Err(e)) => {
                this.abort(&e.to_string());
                Poll::Ready(Some(Err(e)))
            }
            None => {
                this.complete();
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        // Keep reporting "more to come" until the end has been observed, so
        // the server polls us once more and the capture completes.
        self.finished
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl<B: HttpBody> Drop for CaptureBody<B> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // Exhausted bodies (HEAD, 204, Content-Length reached) may be dropped
        // by the server without a final poll; they still complete.
        if self.inner.is_end_stream() {
            self.complete();
            return;
        }
        self.finished = true;
        self.command.fail();
        tracing::warn!(
            command_id = %self.command.id(),
            kind = %self.command.kind(),
            received = self.buffer.len(),
            "Client went away before the response finished"
        );
        metrics::record_error("client_disconnect");
    }
}

/// Turn an upstream response into the client response, capturing the body
/// into `command` as it streams.
pub fn relay<B>(upstream: Response<B>, command: Arc<WebDriverCommand>) -> Response<Body>
where
    B: HttpBody<Data = Bytes> + Unpin + Send + 'static,
    B::Error: std::fmt::Display + Into<axum::BoxError>,
{
    let (parts, body) = upstream.into_parts();
    let status = parts.status;

    let mut response = Response::new(Body::new(CaptureBody::new(body, status, command)));
    *response.status_mut() = status;
    copy_end_to_end_headers(&parts.headers, response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandState;
    use crate::routing::{CommandKind, Params};
    use axum::body::to_bytes;
    use axum::http::{header, Method};
    use futures_util::{stream, StreamExt};
    use http_body_util::{BodyExt, StreamBody};
    use std::convert::Infallible;

    fn command() -> Arc<WebDriverCommand> {
        let command = WebDriverCommand::new(
            CommandKind::GetWindowHandle,
            Method::GET,
            "/session/abc/window",
            Params::new(),
        );
        command.advance(CommandState::UpstreamResponding);
        Arc::new(command)
    }

    #[tokio::test]
    async fn test_relay_streams_and_captures() {
        let chunks: Vec<Result<Frame<Bytes>, Infallible>> = vec![
            Ok(Frame::data(Bytes::from_static(b"{\"value\":"))),
            Ok(Frame::data(Bytes::from_static(b"7}"))),
        ];
        let upstream = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONNECTION, "close")
            .body(StreamBody::new(stream::iter(chunks)))
            .unwrap();

        let command = command();
        let response = relay(upstream, command.clone());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "application/json");
        assert!(response.headers().get(header::CONNECTION).is_none());
        assert!(command.response().is_none());

        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"{\"value\":7}");

        let captured = command.response().unwrap();
        assert_eq!(captured.status, StatusCode::OK);
        assert_eq!(captured.body.raw(), &body);
        assert_eq!(captured.body.get("value"), Some(&serde_json::json!(7)));
        assert_eq!(command.state(), CommandState::Complete);
    }

    #[tokio::test]
    async fn test_error_status_still_captured() {
        let upstream = Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(http_body_util::Full::new(Bytes::from_static(b"test")))
            .unwrap();

        let command = command();
        let body = to_bytes(relay(upstream, command.clone()).into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"test");

        let captured = command.response().unwrap();
        assert_eq!(captured.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(captured.body.payload(), &crate::command::Payload::Text("test".into()));
    }

    #[tokio::test]
    async fn test_stream_error_marks_command_errored() {
        let chunks: Vec<Result<Frame<Bytes>, std::io::Error>> = vec![
            Ok(Frame::data(Bytes::from_static(b"partial"))),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];
        let upstream = Response::builder()
            .status(StatusCode::OK)
            .body(StreamBody::new(stream::iter(chunks)))
            .unwrap();

        let command = command();
        let result = to_bytes(relay(upstream, command.clone()).into_body(), 1024).await;
        assert!(result.is_err());
        assert!(command.response().is_none());
        assert_eq!(command.state(), CommandState::Errored);
    }

    #[tokio::test]
    async fn test_client_disconnect_marks_command_errored() {
        let first: Vec<Result<Frame<Bytes>, Infallible>> =
            vec![Ok(Frame::data(Bytes::from_static(b"{\"value\":")))];
        let upstream = Response::builder()
            .status(StatusCode::OK)
            .body(StreamBody::new(stream::iter(first).chain(stream::pending())))
            .unwrap();

        let command = command();
        let mut body = relay(upstream, command.clone()).into_body();
        let frame = body.frame().await.unwrap().unwrap();
        assert_eq!(frame.into_data().unwrap(), Bytes::from_static(b"{\"value\":"));
        drop(body);

        assert!(command.response().is_none());
        assert_eq!(command.state(), CommandState::Errored);
    }
}
