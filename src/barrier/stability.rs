//! Waits for the page under test to settle before page-touching commands.
//!
//! # Responsibilities
//! - Decide which commands need the page to be stable first
//! - Run the wait script in the browser through the upstream server
//! - Turn a reported wait error into a barrier failure
//!
//! # Design Decisions
//! - The on/off switch belongs to this barrier, not to the proxy
//! - Commands without a session (NewSession, Status) are never delayed
//! - The wait script reports problems by passing a value to its callback;
//!   any truthy value is an error

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request};
use http_body_util::BodyExt;
use serde_json::{json, Value};

use crate::barrier::{Barrier, BarrierError};
use crate::command::WebDriverCommand;
use crate::config::StabilityConfig;
use crate::http::upstream::{UpstreamAddress, UpstreamClient};
use crate::routing::CommandKind;

/// Script run with `executeAsyncScript` to wait for Angular testabilities.
///
/// Arguments: the root element selector, then the WebDriver callback.
pub const DEFAULT_WAIT_SCRIPT: &str = r#"var rootSelector = arguments[0];
var callback = arguments[arguments.length - 1];
try {
  if (window.getAngularTestability) {
    var root = document.querySelector(rootSelector);
    if (root) {
      window.getAngularTestability(root).whenStable(function() { callback(); });
      return;
    }
  }
  if (window.getAllAngularTestabilities) {
    var testabilities = window.getAllAngularTestabilities();
    var pending = testabilities.length;
    if (pending === 0) { callback(); return; }
    testabilities.forEach(function(t) {
      t.whenStable(function() { if (--pending === 0) { callback(); } });
    });
    return;
  }
  callback();
} catch (err) {
  callback(err.message);
}"#;

/// Path segments after `/session/{id}/` that touch the page. Unrecognized
/// commands are matched on these so vendor extensions still wait.
const PAGE_SEGMENTS: &[&str] = &[
    "screenshot",
    "source",
    "title",
    "element",
    "elements",
    "keys",
    "moveto",
    "click",
    "buttondown",
    "buttonup",
    "doubleclick",
    "touch",
];

/// Barrier that blocks page-touching commands until the page is stable.
pub struct StabilityBarrier {
    client: UpstreamClient,
    upstream: UpstreamAddress,
    enabled: AtomicBool,
    wait_script: String,
    root_selector: String,
    script_endpoint: String,
}

impl StabilityBarrier {
    pub fn new(
        config: &StabilityConfig,
        client: UpstreamClient,
        upstream: UpstreamAddress,
    ) -> Self {
        Self {
            client,
            upstream,
            enabled: AtomicBool::new(config.enabled),
            wait_script: config.wait_script.clone(),
            root_selector: config.root_selector.clone(),
            script_endpoint: config.script_endpoint.trim_matches('/').to_string(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
        tracing::info!(enabled, "Stability waiting toggled");
    }

    /// Commands that read or act on the rendered page.
    pub fn waits_for(kind: CommandKind) -> bool {
        use CommandKind::*;
        matches!(
            kind,
            TakeScreenshot
                | GetPageSource
                | GetTitle
                | FindElement
                | FindElements
                | GetActiveElement
                | FindElementFromElement
                | FindElementsFromElement
                | ElementClick
                | ElementClear
                | ElementSendKeys
                | GetElementText
                | GetElementTagName
                | GetElementAttribute
                | GetElementProperty
                | GetElementCSSValue
                | IsElementSelected
                | IsElementEnabled
                | IsElementDisplayed
                | GetElementRect
                | GetElementSize
                | GetElementLocation
                | SendKeysToActiveElement
                | MouseMoveTo
                | MouseClick
                | MouseDoubleClick
                | MouseDown
                | MouseUp
                | TouchClick
        )
    }

    fn should_stabilize<'a>(&self, command: &'a WebDriverCommand) -> Option<&'a str> {
        if !self.is_enabled() {
            return None;
        }
        match command.kind() {
            CommandKind::Unknown => page_session(command.path()),
            kind if Self::waits_for(kind) => command.session_id(),
            _ => None,
        }
    }

    async fn wait_for_stability(&self, session_id: &str) -> Result<(), BarrierError> {
        let path = format!("/session/{}/{}", session_id, self.script_endpoint);
        let uri = self
            .upstream
            .uri_for(&path)
            .map_err(|e| BarrierError::new(e.to_string()))?;
        let body = json!({
            "script": self.wait_script,
            "args": [self.root_selector],
        });

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
            .body(Body::from(body.to_string()))
            .map_err(|e| BarrierError::new(e.to_string()))?;

        let response = self.client.request(request).await.map_err(wait_error)?;
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(wait_error)?
            .to_bytes();

        let reply: Value = serde_json::from_slice(&bytes).map_err(|_| {
            BarrierError::new(format!(
                "Error while waiting for page to stabilize: unexpected reply {}",
                String::from_utf8_lossy(&bytes)
            ))
        })?;
        match reply.get("value") {
            Some(value) if is_truthy(value) => Err(BarrierError::new(format!(
                "Error while waiting for page to stabilize: {}",
                describe(value)
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Barrier for StabilityBarrier {
    async fn on_command(&self, command: &Arc<WebDriverCommand>) -> Result<(), BarrierError> {
        let Some(session_id) = self.should_stabilize(command) else {
            return Ok(());
        };

        tracing::debug!(
            command_id = %command.id(),
            kind = %command.kind(),
            "Waiting for stability"
        );
        self.wait_for_stability(session_id).await?;
        tracing::debug!(command_id = %command.id(), "Stabilized");
        Ok(())
    }

    fn name(&self) -> &str {
        "stability"
    }
}

/// Session id of an unrecognized `/session/{id}/<page segment>/...` path.
fn page_session(path: &str) -> Option<&str> {
    let path = path.split('?').next().unwrap_or(path);
    let mut parts = path.split('/');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(""), Some("session"), Some(id), Some(segment))
            if !id.is_empty() && PAGE_SEGMENTS.contains(&segment) =>
        {
            Some(id)
        }
        _ => None,
    }
}

fn wait_error(e: impl std::fmt::Display) -> BarrierError {
    BarrierError::new(format!("Error while waiting for page to stabilize: {}", e))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string()),
        _ => value.to_string(),
    }
}
