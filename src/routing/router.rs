//! Endpoint lookup and command classification.
//!
//! # Responsibilities
//! - Store the ordered endpoint descriptors
//! - Classify a (method, path) into a command kind and parameters
//! - Build the per-request [`WebDriverCommand`]
//!
//! # Design Decisions
//! - Immutable after `build()` (shared via `Arc`, no locks)
//! - O(n) linear scan in registration order; first match wins
//! - Same-method, same-arity patterns must be added most-specific-first
//! - Explicit `Unknown` rather than an error when nothing matches

use axum::http::{Method, Uri};

use crate::command::WebDriverCommand;
use crate::routing::kind::CommandKind;
use crate::routing::matcher::{Endpoint, Params};

/// Well-known parameter keys used by the default table.
pub mod params {
    pub const SESSION_ID: &str = "sessionId";
    pub const ELEMENT_ID: &str = "elementId";
    pub const ATTRIBUTE_NAME: &str = "attributeName";
    pub const PROPERTY_NAME: &str = "propertyName";
}

/// Reserved path prefix for proxy control commands. Never classified.
pub const PROXY_COMMAND_PREFIX: &str = "/stabilize_proxy";

/// Returns true if the path addresses the proxy itself rather than WebDriver.
pub fn is_proxy_command(path: &str) -> bool {
    path.split('/').nth(1) == Some(&PROXY_COMMAND_PREFIX[1..])
}

/// Ordered, immutable set of endpoint descriptors.
#[derive(Debug, Clone)]
pub struct EndpointTable {
    endpoints: Vec<Endpoint>,
}

/// Append-only builder for an [`EndpointTable`].
#[derive(Debug, Default)]
pub struct EndpointTableBuilder {
    endpoints: Vec<Endpoint>,
}

impl EndpointTableBuilder {
    /// Append an endpoint. Earlier endpoints win ties.
    pub fn add(mut self, method: Method, pattern: &str, kind: CommandKind) -> Self {
        self.endpoints.push(Endpoint::new(method, pattern, kind));
        self
    }

    /// Freeze the table.
    pub fn build(self) -> EndpointTable {
        EndpointTable {
            endpoints: self.endpoints,
        }
    }
}

impl EndpointTable {
    pub fn builder() -> EndpointTableBuilder {
        EndpointTableBuilder::default()
    }

    /// The WebDriver endpoints known to the proxy.
    ///
    /// Covers the W3C routes plus the JSON wire protocol aliases that older
    /// clients still send.
    pub fn webdriver() -> Self {
        const S: &str = "/session/:sessionId";
        const E: &str = "/session/:sessionId/element/:elementId";
        let s = |suffix: &str| format!("{}{}", S, suffix);
        let e = |suffix: &str| format!("{}{}", E, suffix);

        Self::builder()
            .add(Method::POST, "/session", CommandKind::NewSession)
            .add(Method::DELETE, S, CommandKind::DeleteSession)
            .add(Method::GET, "/status", CommandKind::Status)
            .add(Method::GET, &s("/timeouts"), CommandKind::GetTimeouts)
            .add(Method::POST, &s("/timeouts"), CommandKind::SetTimeouts)
            // Navigation
            .add(Method::POST, &s("/url"), CommandKind::Go)
            .add(Method::GET, &s("/url"), CommandKind::GetCurrentURL)
            .add(Method::POST, &s("/back"), CommandKind::Back)
            .add(Method::POST, &s("/forward"), CommandKind::Forward)
            .add(Method::POST, &s("/refresh"), CommandKind::Refresh)
            .add(Method::GET, &s("/title"), CommandKind::GetTitle)
            .add(Method::GET, &s("/source"), CommandKind::GetPageSource)
            .add(Method::GET, &s("/screenshot"), CommandKind::TakeScreenshot)
            // Scripts
            .add(Method::POST, &s("/execute/sync"), CommandKind::ExecuteScript)
            .add(Method::POST, &s("/execute"), CommandKind::ExecuteScript)
            .add(Method::POST, &s("/execute/async"), CommandKind::ExecuteAsyncScript)
            .add(Method::POST, &s("/execute_async"), CommandKind::ExecuteAsyncScript)
            // Element lookup. `active` must precede any `:elementId` route of the same shape.
            .add(Method::POST, &s("/element"), CommandKind::FindElement)
            .add(Method::POST, &s("/elements"), CommandKind::FindElements)
            .add(Method::GET, &s("/element/active"), CommandKind::GetActiveElement)
            .add(Method::POST, &s("/element/active"), CommandKind::GetActiveElement)
            .add(Method::POST, &e("/element"), CommandKind::FindElementFromElement)
            .add(Method::POST, &e("/elements"), CommandKind::FindElementsFromElement)
            // Element interaction
            .add(Method::POST, &e("/click"), CommandKind::ElementClick)
            .add(Method::POST, &e("/clear"), CommandKind::ElementClear)
            .add(Method::POST, &e("/value"), CommandKind::ElementSendKeys)
            // Element state
            .add(Method::GET, &e("/text"), CommandKind::GetElementText)
            .add(Method::GET, &e("/name"), CommandKind::GetElementTagName)
            .add(Method::GET, &e("/attribute/:attributeName"), CommandKind::GetElementAttribute)
            .add(Method::GET, &e("/property/:propertyName"), CommandKind::GetElementProperty)
            .add(Method::GET, &e("/css/:propertyName"), CommandKind::GetElementCSSValue)
            .add(Method::GET, &e("/selected"), CommandKind::IsElementSelected)
            .add(Method::GET, &e("/enabled"), CommandKind::IsElementEnabled)
            .add(Method::GET, &e("/displayed"), CommandKind::IsElementDisplayed)
            .add(Method::GET, &e("/rect"), CommandKind::GetElementRect)
            .add(Method::GET, &e("/size"), CommandKind::GetElementSize)
            .add(Method::GET, &e("/location"), CommandKind::GetElementLocation)
            // Windows and frames
            .add(Method::GET, &s("/window"), CommandKind::GetWindowHandle)
            .add(Method::GET, &s("/window_handle"), CommandKind::GetWindowHandle)
            .add(Method::GET, &s("/window/handles"), CommandKind::GetWindowHandles)
            .add(Method::GET, &s("/window_handles"), CommandKind::GetWindowHandles)
            .add(Method::POST, &s("/window"), CommandKind::SwitchToWindow)
            .add(Method::DELETE, &s("/window"), CommandKind::CloseWindow)
            .add(Method::GET, &s("/window/rect"), CommandKind::GetWindowRect)
            .add(Method::POST, &s("/window/rect"), CommandKind::SetWindowRect)
            .add(Method::POST, &s("/frame"), CommandKind::SwitchToFrame)
            // Low-level input
            .add(Method::POST, &s("/keys"), CommandKind::SendKeysToActiveElement)
            .add(Method::POST, &s("/moveto"), CommandKind::MouseMoveTo)
            .add(Method::POST, &s("/click"), CommandKind::MouseClick)
            .add(Method::POST, &s("/doubleclick"), CommandKind::MouseDoubleClick)
            .add(Method::POST, &s("/buttondown"), CommandKind::MouseDown)
            .add(Method::POST, &s("/buttonup"), CommandKind::MouseUp)
            .add(Method::POST, &s("/touch/click"), CommandKind::TouchClick)
            .add(Method::POST, &s("/actions"), CommandKind::PerformActions)
            .add(Method::DELETE, &s("/actions"), CommandKind::ReleaseActions)
            .build()
    }

    /// All endpoints, in registration order.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Find the first endpoint matching `method` and `path`.
    ///
    /// `path` must not contain a query string.
    pub fn classify(&self, method: &Method, path: &str) -> (CommandKind, Params) {
        self.endpoints
            .iter()
            .find_map(|endpoint| endpoint.params(method, path).map(|p| (endpoint.kind(), p)))
            .unwrap_or((CommandKind::Unknown, Params::new()))
    }

    /// Build the command object for an inbound request.
    ///
    /// Classification uses the path only; the command keeps the path and
    /// query so it can be forwarded unchanged.
    pub fn parse_command(&self, method: &Method, uri: &Uri) -> WebDriverCommand {
        let (kind, params) = self.classify(method, uri.path());
        let url = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());
        WebDriverCommand::new(kind, method.clone(), url, params)
    }
}

impl Default for EndpointTable {
    fn default() -> Self {
        Self::webdriver()
    }
}
