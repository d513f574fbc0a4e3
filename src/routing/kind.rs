//! WebDriver command kinds.
//!
//! The set is closed: every endpoint registered in the
//! [`EndpointTable`](crate::routing::EndpointTable) maps to one of these,
//! and anything else is classified as [`CommandKind::Unknown`]. Adding a
//! kind means adding its endpoint(s) to the default table as well.

use std::fmt;

/// A protocol operation understood by the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    // Sessions
    NewSession,
    DeleteSession,
    Status,
    GetTimeouts,
    SetTimeouts,

    // Navigation
    Go,
    GetCurrentURL,
    Back,
    Forward,
    Refresh,
    GetTitle,
    GetPageSource,
    TakeScreenshot,

    // Scripts
    ExecuteScript,
    ExecuteAsyncScript,

    // Element lookup
    FindElement,
    FindElements,
    GetActiveElement,
    FindElementFromElement,
    FindElementsFromElement,

    // Element interaction
    ElementClick,
    ElementClear,
    ElementSendKeys,

    // Element state
    GetElementText,
    GetElementTagName,
    GetElementAttribute,
    GetElementProperty,
    GetElementCSSValue,
    IsElementSelected,
    IsElementEnabled,
    IsElementDisplayed,
    GetElementRect,
    GetElementSize,
    GetElementLocation,

    // Windows and frames
    GetWindowHandle,
    GetWindowHandles,
    SwitchToWindow,
    CloseWindow,
    GetWindowRect,
    SetWindowRect,
    SwitchToFrame,

    // Low-level input
    SendKeysToActiveElement,
    MouseMoveTo,
    MouseClick,
    MouseDoubleClick,
    MouseDown,
    MouseUp,
    TouchClick,
    PerformActions,
    ReleaseActions,

    /// No endpoint matched. Forwarded like any other command.
    Unknown,
}

impl CommandKind {
    /// The name used in logs and metrics labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::NewSession => "NewSession",
            CommandKind::DeleteSession => "DeleteSession",
            CommandKind::Status => "Status",
            CommandKind::GetTimeouts => "GetTimeouts",
            CommandKind::SetTimeouts => "SetTimeouts",
            CommandKind::Go => "Go",
            CommandKind::GetCurrentURL => "GetCurrentURL",
            CommandKind::Back => "Back",
            CommandKind::Forward => "Forward",
            CommandKind::Refresh => "Refresh",
            CommandKind::GetTitle => "GetTitle",
            CommandKind::GetPageSource => "GetPageSource",
            CommandKind::TakeScreenshot => "TakeScreenshot",
            CommandKind::ExecuteScript => "ExecuteScript",
            CommandKind::ExecuteAsyncScript => "ExecuteAsyncScript",
            CommandKind::FindElement => "FindElement",
            CommandKind::FindElements => "FindElements",
            CommandKind::GetActiveElement => "GetActiveElement",
            CommandKind::FindElementFromElement => "FindElementFromElement",
            CommandKind::FindElementsFromElement => "FindElementsFromElement",
            CommandKind::ElementClick => "ElementClick",
            CommandKind::ElementClear => "ElementClear",
            CommandKind::ElementSendKeys => "ElementSendKeys",
            CommandKind::GetElementText => "GetElementText",
            CommandKind::GetElementTagName => "GetElementTagName",
            CommandKind::GetElementAttribute => "GetElementAttribute",
            CommandKind::GetElementProperty => "GetElementProperty",
            CommandKind::GetElementCSSValue => "GetElementCSSValue",
            CommandKind::IsElementSelected => "IsElementSelected",
            CommandKind::IsElementEnabled => "IsElementEnabled",
            CommandKind::IsElementDisplayed => "IsElementDisplayed",
            CommandKind::GetElementRect => "GetElementRect",
            CommandKind::GetElementSize => "GetElementSize",
            CommandKind::GetElementLocation => "GetElementLocation",
            CommandKind::GetWindowHandle => "GetWindowHandle",
            CommandKind::GetWindowHandles => "GetWindowHandles",
            CommandKind::SwitchToWindow => "SwitchToWindow",
            CommandKind::CloseWindow => "CloseWindow",
            CommandKind::GetWindowRect => "GetWindowRect",
            CommandKind::SetWindowRect => "SetWindowRect",
            CommandKind::SwitchToFrame => "SwitchToFrame",
            CommandKind::SendKeysToActiveElement => "SendKeysToActiveElement",
            CommandKind::MouseMoveTo => "MouseMoveTo",
            CommandKind::MouseClick => "MouseClick",
            CommandKind::MouseDoubleClick => "MouseDoubleClick",
            CommandKind::MouseDown => "MouseDown",
            CommandKind::MouseUp => "MouseUp",
            CommandKind::TouchClick => "TouchClick",
            CommandKind::PerformActions => "PerformActions",
            CommandKind::ReleaseActions => "ReleaseActions",
            CommandKind::Unknown => "Unknown",
        }
    }

    /// Commands that carry a session id in their path.
    ///
    /// `NewSession` gets its id from the response, `Status` has none.
    pub fn is_session_scoped(&self) -> bool {
        !matches!(
            self,
            CommandKind::NewSession | CommandKind::Status | CommandKind::Unknown
        )
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
