//! The per-request command object.
//!
//! # Responsibilities
//! - Carry the classification result (kind, params) for one exchange
//! - Capture the request body and the upstream response exactly once
//! - Notify any number of subscribers when either becomes available
//!
//! # Design Decisions
//! - Each notification is a `watch` channel holding `Option<Arc<_>>`:
//!   the stored value *is* the event, so late subscribers see it immediately
//! - Listeners never keep the command alive; when the command is dropped
//!   without a response they resolve to `None`
//! - Callbacks registered with `on_*` run on their own task, so a panicking
//!   subscriber cannot take another one (or the pipeline) down with it

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::{Method, StatusCode};
use bytes::Bytes;
use tokio::sync::watch;

use crate::command::payload::CapturedBody;
use crate::command::state::{AtomicCommandState, CommandState};
use crate::routing::params::SESSION_ID;
use crate::routing::{CommandKind, Params};

/// Global counter for command IDs.
static COMMAND_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a command, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(u64);

impl CommandId {
    pub fn new() -> Self {
        Self(COMMAND_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd-{}", self.0)
    }
}

/// What the upstream server sent back for a command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResponse {
    pub status: StatusCode,
    pub body: CapturedBody,
}

/// Subscription to one of a command's one-shot notifications.
///
/// Holds no reference to the command itself.
#[derive(Debug)]
pub struct Listener<T> {
    rx: watch::Receiver<Option<Arc<T>>>,
}

impl<T> Listener<T> {
    /// Wait for the value. Resolves immediately if it is already present,
    /// and to `None` if the command is dropped before it arrives.
    pub async fn wait(mut self) -> Option<Arc<T>> {
        let value = match self.rx.wait_for(Option::is_some).await {
            Ok(value) => (*value).clone(),
            Err(_) => None,
        };
        value
    }
}

/// One in-flight WebDriver request/response pair.
pub struct WebDriverCommand {
    id: CommandId,
    kind: CommandKind,
    method: Method,
    url: String,
    params: Params,
    state: AtomicCommandState,
    received_at: Instant,
    data: watch::Sender<Option<Arc<CapturedBody>>>,
    response: watch::Sender<Option<Arc<CommandResponse>>>,
}

impl WebDriverCommand {
    /// Create a command. `params` is frozen from here on.
    pub fn new(kind: CommandKind, method: Method, url: impl Into<String>, params: Params) -> Self {
        Self {
            id: CommandId::new(),
            kind,
            method,
            url: url.into(),
            params,
            state: AtomicCommandState::new(),
            received_at: Instant::now(),
            data: watch::channel(None).0,
            response: watch::channel(None).0,
        }
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The original request path, including any query string.
    pub fn path(&self) -> &str {
        &self.url
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Look up a path parameter.
    ///
    /// # Panics
    /// If `key` was not part of the matched pattern. Asking for a parameter
    /// the command cannot have is a bug in the caller, not a protocol error.
    pub fn param(&self, key: &str) -> &str {
        match self.params.get(key) {
            Some(value) => value,
            None => panic!(
                "parameter `{}` is not defined for {} ({})",
                key, self.kind, self.url
            ),
        }
    }

    /// Look up a path parameter that may legitimately be absent.
    pub fn try_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The session this command belongs to.
    ///
    /// `None` for `NewSession` (the id arrives in the response), `Status`,
    /// and unclassified commands.
    pub fn session_id(&self) -> Option<&str> {
        self.try_param(SESSION_ID)
    }

    pub fn state(&self) -> CommandState {
        self.state.load()
    }

    /// Time since the proxy received the request.
    pub fn elapsed(&self) -> Duration {
        self.received_at.elapsed()
    }

    // --- Request body ---

    /// The request body, if it has been fully received.
    pub fn data(&self) -> Option<Arc<CapturedBody>> {
        self.data.borrow().clone()
    }

    /// Record the fully buffered request body and notify subscribers.
    ///
    /// Returns false (and changes nothing) if a body was already recorded.
    pub fn handle_data(&self, raw: Bytes) -> bool {
        let body = Arc::new(CapturedBody::new(raw));
        let stored = self.data.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(body);
            true
        });
        if stored {
            self.state.advance(CommandState::BodyBuffered);
        }
        stored
    }

    pub fn subscribe_data(&self) -> Listener<CapturedBody> {
        Listener {
            rx: self.data.subscribe(),
        }
    }

    /// Wait until the request body has been received.
    pub async fn data_received(&self) -> Option<Arc<CapturedBody>> {
        self.subscribe_data().wait().await
    }

    /// Run `f` on its own task once the request body has been received.
    pub fn on_data<F>(&self, f: F)
    where
        F: FnOnce(Arc<CapturedBody>) + Send + 'static,
    {
        let listener = self.subscribe_data();
        tokio::spawn(async move {
            if let Some(body) = listener.wait().await {
                f(body);
            }
        });
    }

    // --- Response ---

    /// The upstream response, if it has been fully received.
    pub fn response(&self) -> Option<Arc<CommandResponse>> {
        self.response.borrow().clone()
    }

    pub fn response_status(&self) -> Option<StatusCode> {
        self.response.borrow().as_ref().map(|r| r.status)
    }

    /// Record the complete upstream response and notify subscribers.
    ///
    /// Fires regardless of status code. Returns false if a response was
    /// already recorded or the command has errored.
    pub fn handle_response(&self, status: StatusCode, raw: Bytes) -> bool {
        if self.state() == CommandState::Errored {
            return false;
        }
        let response = Arc::new(CommandResponse {
            status,
            body: CapturedBody::new(raw),
        });
        let stored = self.response.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(response);
            true
        });
        if stored {
            self.state.advance(CommandState::Complete);
        }
        stored
    }

    pub fn subscribe_response(&self) -> Listener<CommandResponse> {
        Listener {
            rx: self.response.subscribe(),
        }
    }

    /// Wait until the upstream response has been received.
    ///
    /// Never resolves for a command that errored; use
    /// [`subscribe_response`](Self::subscribe_response) from code that may
    /// outlive the exchange.
    pub async fn response_received(&self) -> Option<Arc<CommandResponse>> {
        self.subscribe_response().wait().await
    }

    /// Run `f` on its own task once the upstream response has arrived.
    pub fn on_response<F>(&self, f: F)
    where
        F: FnOnce(Arc<CommandResponse>) + Send + 'static,
    {
        let listener = self.subscribe_response();
        tokio::spawn(async move {
            if let Some(response) = listener.wait().await {
                f(response);
            }
        });
    }

    // --- Pipeline transitions ---

    pub(crate) fn advance(&self, next: CommandState) -> bool {
        self.state.advance(next)
    }

    /// Mark the command as failed. Terminal.
    pub fn fail(&self) -> bool {
        self.state.advance(CommandState::Errored)
    }
}

impl fmt::Debug for WebDriverCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebDriverCommand")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("params", &self.params)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn go_command() -> WebDriverCommand {
        let mut params = Params::new();
        params.insert("sessionId".to_string(), "abc123".to_string());
        WebDriverCommand::new(CommandKind::Go, Method::POST, "/session/abc123/url", params)
    }

    #[test]
    fn test_params() {
        let command = go_command();
        assert_eq!(command.param("sessionId"), "abc123");
        assert_eq!(command.session_id(), Some("abc123"));
        assert_eq!(command.try_param("elementId"), None);
    }

    #[test]
    #[should_panic(expected = "parameter `elementId` is not defined for Go")]
    fn test_unknown_param_panics() {
        go_command().param("elementId");
    }

    #[test]
    fn test_session_id_absent_for_status() {
        let command =
            WebDriverCommand::new(CommandKind::Status, Method::GET, "/status", Params::new());
        assert_eq!(command.session_id(), None);
    }

    #[test]
    fn test_data_recorded_once() {
        let command = go_command();
        assert!(command.data().is_none());

        assert!(command.handle_data(Bytes::from_static(br#"{"url":"http://example.com"}"#)));
        assert!(!command.handle_data(Bytes::from_static(b"{}")));

        let data = command.data().unwrap();
        assert_eq!(data.get("url"), Some(&json!("http://example.com")));
        assert_eq!(command.state(), CommandState::BodyBuffered);
    }

    #[test]
    fn test_response_recorded_once() {
        let command = go_command();
        assert!(command.handle_response(StatusCode::OK, Bytes::from_static(br#"{"value":null}"#)));
        assert!(!command.handle_response(StatusCode::INTERNAL_SERVER_ERROR, Bytes::new()));

        assert_eq!(command.response_status(), Some(StatusCode::OK));
        assert_eq!(command.state(), CommandState::Complete);
    }

    #[test]
    fn test_no_response_after_error() {
        let command = go_command();
        assert!(command.fail());
        assert!(!command.handle_response(StatusCode::OK, Bytes::new()));
        assert!(command.response().is_none());
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_response() {
        let command = go_command();
        command.handle_response(StatusCode::OK, Bytes::from_static(b"done"));

        let response = command.response_received().await.unwrap();
        assert_eq!(response.body.raw(), &Bytes::from_static(b"done"));
    }

    #[tokio::test]
    async fn test_many_subscribers_notified() {
        let command = Arc::new(go_command());
        let first = command.subscribe_response();
        let second = command.subscribe_response();

        let cmd = command.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cmd.handle_response(StatusCode::OK, Bytes::from_static(br#"{"value":7}"#));
        });

        let (a, b) = tokio::join!(first.wait(), second.wait());
        assert_eq!(a.unwrap().body.get("value"), Some(&json!(7)));
        assert_eq!(b.unwrap().status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_listener_resolves_none_when_dropped() {
        let command = go_command();
        let listener = command.subscribe_response();
        drop(command);
        assert!(listener.wait().await.is_none());
    }

    #[tokio::test]
    async fn test_panicking_callback_is_isolated() {
        let command = go_command();
        let (tx, mut rx) = mpsc::unbounded_channel();

        command.on_response(|_| panic!("listener failure"));
        command.on_response(move |response| {
            let _ = tx.send(response.status);
        });

        command.handle_response(StatusCode::OK, Bytes::new());
        let status = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(status, Some(StatusCode::OK));
    }

    #[tokio::test]
    async fn test_data_callback() {
        let command = go_command();
        let (tx, mut rx) = mpsc::unbounded_channel();
        command.on_data(move |body| {
            let _ = tx.send(body.get("url").cloned());
        });

        command.handle_data(Bytes::from_static(br#"{"url":"http://example.com"}"#));
        let url = rx.recv().await.unwrap();
        assert_eq!(url, Some(json!("http://example.com")));
    }
}
