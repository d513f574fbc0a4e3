//! Human-readable WebDriver command transcript.
//!
//! # Responsibilities
//! - Register as a barrier that never delays a command
//! - On each response, append one line describing the command
//!
//! # Line Format
//! ```text
//! [14:03:07.412] [3f2a9c] | 0.087s | Go | Navigating to http://example.com
//! [14:03:07.530] | 0.002s | Status | Getting server status
//! ```
//!
//! # Design Decisions
//! - Lines are written when the response arrives, so they appear in
//!   completion order and carry the full round-trip time
//! - Everything the line needs from the command is copied when the barrier
//!   runs; the writer task holds only listeners, so the command is released
//!   as soon as the exchange ends and one that never completes logs nothing

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use crate::barrier::{Barrier, BarrierError};
use crate::command::{CapturedBody, CommandResponse, WebDriverCommand};
use crate::routing::params::{ATTRIBUTE_NAME, ELEMENT_ID, PROPERTY_NAME, SESSION_ID};
use crate::routing::{CommandKind, Params};

/// Key under which W3C servers return element references.
const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Barrier that writes a transcript line for every completed command.
pub struct CommandLogger {
    log_name: String,
    path: Option<PathBuf>,
    sink: Sink,
}

impl CommandLogger {
    /// Append to `<dir>/webdriver_log_<id>.txt`, creating `dir` if needed.
    pub fn new(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let log_name = new_log_name();
        let path = dir.join(&log_name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        tracing::info!(path = %path.display(), "Logging WebDriver commands");
        Ok(Self {
            log_name,
            path: Some(path),
            sink: Arc::new(Mutex::new(Box::new(file))),
        })
    }

    /// Log to an arbitrary writer instead of a file.
    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            log_name: new_log_name(),
            path: None,
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn log_name(&self) -> &str {
        &self.log_name
    }

    /// Full path of the log file, when logging to disk.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[async_trait]
impl Barrier for CommandLogger {
    async fn on_command(&self, command: &Arc<WebDriverCommand>) -> Result<(), BarrierError> {
        let started = Instant::now();
        let entry = LogEntry::new(command);
        let data = command.subscribe_data();
        let response = command.subscribe_response();
        let sink = Arc::clone(&self.sink);
        let command_id = command.id();

        tokio::spawn(async move {
            let Some(response) = response.wait().await else {
                return;
            };
            let elapsed = started.elapsed().as_secs_f64();
            let data = data.wait().await;
            let line = format_line(&entry, data.as_deref(), Some(&response), &timestamp(), elapsed);

            let mut writer = match sink.lock() {
                Ok(writer) => writer,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Err(e) = writer.write_all(line.as_bytes()).and_then(|_| writer.flush()) {
                tracing::warn!(command_id = %command_id, error = %e, "Failed to write command log");
            }
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "command_log"
    }
}

/// The parts of a command a transcript line is built from.
#[derive(Debug, Clone)]
pub struct LogEntry {
    kind: CommandKind,
    path: String,
    params: Params,
}

impl LogEntry {
    pub fn new(command: &WebDriverCommand) -> Self {
        Self {
            kind: command.kind(),
            path: command.path().to_string(),
            params: command.params().clone(),
        }
    }

    fn param(&self, key: &str) -> &str {
        self.params.get(key).map(String::as_str).unwrap_or("")
    }

    fn session_id(&self) -> Option<&str> {
        self.params.get(SESSION_ID).map(String::as_str)
    }
}

fn new_log_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("webdriver_log_{}.txt", &id[..8])
}

fn timestamp() -> String {
    chrono::Local::now().format("[%H:%M:%S%.3f]").to_string()
}

fn short(id: &str) -> &str {
    match id.char_indices().nth(6) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Render one transcript line, newline included.
pub fn format_line(
    entry: &LogEntry,
    data: Option<&CapturedBody>,
    response: Option<&CommandResponse>,
    timestamp: &str,
    elapsed_secs: f64,
) -> String {
    let mut line = String::from(timestamp);
    if let Some(session) = entry.session_id() {
        line.push_str(&format!(" [{}]", short(session)));
    }
    line.push_str(&format!(" | {:.3}s | {}", elapsed_secs, entry.kind));

    let description = describe(entry, data);
    let outcome = response.and_then(|r| outcome(entry.kind, r));
    for part in [description, outcome].into_iter().flatten() {
        line.push_str(" | ");
        line.push_str(&part);
    }
    line.push('\n');
    line
}

fn text<'a>(data: Option<&'a CapturedBody>, key: &str) -> &'a str {
    data.and_then(|d| d.get(key))
        .and_then(Value::as_str)
        .unwrap_or("")
}

fn browser_name(data: Option<&CapturedBody>) -> &str {
    let Some(json) = data.and_then(CapturedBody::json) else {
        return "unknown";
    };
    json.pointer("/desiredCapabilities/browserName")
        .or_else(|| json.pointer("/capabilities/alwaysMatch/browserName"))
        .and_then(Value::as_str)
        .unwrap_or("unknown")
}

/// Keys typed by a send-keys command (`text`, or the JSON-wire `value` array).
fn keys(data: Option<&CapturedBody>) -> String {
    if let Some(text) = data.and_then(|d| d.get("text")).and_then(Value::as_str) {
        return text.to_string();
    }
    match data.and_then(|d| d.get("value")) {
        Some(Value::Array(parts)) => parts.iter().filter_map(Value::as_str).collect(),
        _ => String::new(),
    }
}

fn describe(entry: &LogEntry, data: Option<&CapturedBody>) -> Option<String> {
    use CommandKind::*;

    let element = || short(entry.param(ELEMENT_ID)).to_string();
    let locator = || format!("{} \"{}\"", text(data, "using"), text(data, "value"));

    let description = match entry.kind {
        NewSession => format!("Getting new \"{}\" session", browser_name(data)),
        DeleteSession => format!("Deleting session {}", short(entry.param(SESSION_ID))),
        Status => "Getting server status".to_string(),
        GetTimeouts => "Getting timeouts".to_string(),
        SetTimeouts => "Setting timeouts".to_string(),
        Go => format!("Navigating to {}", text(data, "url")),
        GetCurrentURL => "Getting current URL".to_string(),
        Back => "Navigating back".to_string(),
        Forward => "Navigating forward".to_string(),
        Refresh => "Refreshing page".to_string(),
        GetTitle => "Getting page title".to_string(),
        GetPageSource => "Getting page source".to_string(),
        TakeScreenshot => "Taking screenshot".to_string(),
        ExecuteScript => "Executing script".to_string(),
        ExecuteAsyncScript => "Executing async script".to_string(),
        FindElement => format!("Finding element by {}", locator()),
        FindElements => format!("Finding elements by {}", locator()),
        FindElementFromElement => {
            format!("Finding element by {} within {}", locator(), element())
        }
        FindElementsFromElement => {
            format!("Finding elements by {} within {}", locator(), element())
        }
        GetActiveElement => "Getting active element".to_string(),
        ElementClick => format!("Clicking element {}", element()),
        ElementClear => format!("Clearing element {}", element()),
        ElementSendKeys => format!("Sending keys \"{}\" to element {}", keys(data), element()),
        SendKeysToActiveElement => format!("Sending keys \"{}\"", keys(data)),
        GetElementText => format!("Getting text of element {}", element()),
        GetElementTagName => format!("Getting tag name of element {}", element()),
        GetElementAttribute => format!(
            "Getting attribute \"{}\" of element {}",
            entry.param(ATTRIBUTE_NAME),
            element()
        ),
        GetElementProperty | GetElementCSSValue => format!(
            "Getting \"{}\" of element {}",
            entry.param(PROPERTY_NAME),
            element()
        ),
        GetElementRect | GetElementSize | GetElementLocation => {
            format!("Getting geometry of element {}", element())
        }
        Unknown => format!("Unknown command {}", entry.path),
        _ => return None,
    };
    Some(description)
}

fn element_id(value: &Value) -> Option<&str> {
    value
        .get(W3C_ELEMENT_KEY)
        .or_else(|| value.get("ELEMENT"))
        .and_then(Value::as_str)
}

/// What the server answered, for the kinds where that matters.
fn outcome(kind: CommandKind, response: &CommandResponse) -> Option<String> {
    use CommandKind::*;

    let value = response.body.get("value");
    if !response.status.is_success() {
        let message = value
            .and_then(|v| v.get("message").or_else(|| v.get("error")))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| value.filter(|v| !v.is_null()).map(Value::to_string))
            .unwrap_or_else(|| response.body.payload().to_string());
        return Some(format!("Error {}: {}", response.status.as_u16(), message));
    }

    match kind {
        NewSession => response
            .body
            .get("sessionId")
            .or_else(|| value.and_then(|v| v.get("sessionId")))
            .and_then(Value::as_str)
            .map(|id| format!("Started session {}", short(id))),
        FindElement | FindElementFromElement | GetActiveElement => value
            .and_then(element_id)
            .map(|id| format!("Found element {}", short(id))),
        FindElements | FindElementsFromElement => value.and_then(Value::as_array).map(|found| {
            let ids: Vec<&str> = found.iter().filter_map(element_id).map(short).collect();
            format!("Found {} elements [{}]", ids.len(), ids.join(", "))
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::EndpointTable;
    use axum::http::{Method, StatusCode, Uri};
    use bytes::Bytes;
    use std::time::Duration;

    /// Shared in-memory writer.
    #[derive(Clone, Default)]
    struct Memory(Arc<Mutex<Vec<u8>>>);

    impl Write for Memory {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Memory {
        fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    fn command(method: Method, path: &str, body: &str) -> Arc<WebDriverCommand> {
        let uri = path.parse::<Uri>().unwrap();
        let command = EndpointTable::webdriver().parse_command(&method, &uri);
        if !body.is_empty() {
            command.handle_data(Bytes::copy_from_slice(body.as_bytes()));
        }
        Arc::new(command)
    }

    fn line(method: Method, path: &str, body: &str) -> String {
        let command = command(method, path, body);
        let data = command.data();
        format_line(&LogEntry::new(&command), data.as_deref(), None, "[00:00:00.000]", 0.25)
    }

    fn answered(method: Method, path: &str, status: StatusCode, reply: &str) -> String {
        let command = command(method, path, "");
        let response = CommandResponse {
            status,
            body: CapturedBody::new(Bytes::copy_from_slice(reply.as_bytes())),
        };
        format_line(&LogEntry::new(&command), None, Some(&response), "[00:00:00.000]", 0.25)
    }

    #[test]
    fn test_log_names_are_unique() {
        let a = CommandLogger::with_writer(io::sink());
        let b = CommandLogger::with_writer(io::sink());
        assert_ne!(a.log_name(), b.log_name());
        assert!(a.log_name().starts_with("webdriver_log_"));
        assert_eq!(a.log_name().len(), "webdriver_log_".len() + 8 + ".txt".len());
    }

    #[test]
    fn test_session_commands() {
        let legacy = r#"{"desiredCapabilities":{"browserName":"chrome"}}"#;
        let w3c = r#"{"capabilities":{"alwaysMatch":{"browserName":"firefox"}}}"#;
        assert_eq!(
            line(Method::POST, "/session", legacy),
            "[00:00:00.000] | 0.250s | NewSession | Getting new \"chrome\" session\n"
        );
        assert_eq!(
            line(Method::POST, "/session", w3c),
            "[00:00:00.000] | 0.250s | NewSession | Getting new \"firefox\" session\n"
        );
        assert_eq!(
            line(Method::DELETE, "/session/abcdef123456", ""),
            "[00:00:00.000] [abcdef] | 0.250s | DeleteSession | Deleting session abcdef\n"
        );
    }

    #[test]
    fn test_url_commands() {
        assert_eq!(
            line(Method::POST, "/session/abcdef123/url", r#"{"url":"http://example.com"}"#),
            "[00:00:00.000] [abcdef] | 0.250s | Go | Navigating to http://example.com\n"
        );
        assert!(line(Method::GET, "/session/abcdef123/url", "")
            .ends_with("GetCurrentURL | Getting current URL\n"));
    }

    #[test]
    fn test_element_commands() {
        let find = r#"{"using":"css selector","value":".test"}"#;
        assert!(line(Method::POST, "/session/s1/element", find)
            .ends_with("FindElement | Finding element by css selector \".test\"\n"));
        assert!(line(Method::POST, "/session/s1/element/0123456789/click", "{}")
            .ends_with("ElementClick | Clicking element 012345\n"));
        assert!(line(Method::POST, "/session/s1/element/el/value", r#"{"value":["te","st"]}"#)
            .ends_with("Sending keys \"test\" to element el\n"));
        assert!(line(Method::GET, "/session/s1/element/el/attribute/href", "")
            .ends_with("Getting attribute \"href\" of element el\n"));
        assert!(line(Method::GET, "/session/s1/element/el/css/color", "")
            .ends_with("Getting \"color\" of element el\n"));
    }

    #[test]
    fn test_unknown_and_undescribed() {
        assert!(line(Method::GET, "/not/a/webdriver/path", "")
            .ends_with("Unknown | Unknown command /not/a/webdriver/path\n"));
        assert_eq!(
            line(Method::GET, "/session/s1/window", ""),
            "[00:00:00.000] [s1] | 0.250s | GetWindowHandle\n"
        );
    }

    #[test]
    fn test_response_fields() {
        let created = r#"{"value":{"sessionId":"abcdef123","capabilities":{}}}"#;
        assert!(answered(Method::POST, "/session", StatusCode::OK, created)
            .ends_with("| Started session abcdef\n"));
        let legacy = r#"{"sessionId":"fedcba987","status":0,"value":{}}"#;
        assert!(answered(Method::POST, "/session", StatusCode::OK, legacy)
            .ends_with("| Started session fedcba\n"));

        let found = r#"{"value":{"element-6066-11e4-a52e-4f735466cecf":"0123456789"}}"#;
        assert!(answered(Method::POST, "/session/s1/element", StatusCode::OK, found)
            .ends_with("| Found element 012345\n"));
        let many = r#"{"value":[{"ELEMENT":"aaaaaaaa"},{"ELEMENT":"bbbbbbbb"}]}"#;
        assert!(answered(Method::POST, "/session/s1/elements", StatusCode::OK, many)
            .ends_with("| Found 2 elements [aaaaaa, bbbbbb]\n"));

        assert_eq!(
            answered(Method::GET, "/session/s1/title", StatusCode::OK, r#"{"value":"Home"}"#),
            "[00:00:00.000] [s1] | 0.250s | GetTitle | Getting page title\n"
        );
    }

    #[test]
    fn test_error_responses() {
        let missing = r#"{"value":{"error":"no such element","message":"Unable to locate"}}"#;
        assert!(answered(Method::POST, "/session/s1/element", StatusCode::NOT_FOUND, missing)
            .ends_with("| Error 404: Unable to locate\n"));
        let bare = r#"{"value":{"error":"invalid session id"}}"#;
        assert!(answered(Method::GET, "/session/s1/url", StatusCode::NOT_FOUND, bare)
            .ends_with("| Error 404: invalid session id\n"));
        assert!(answered(Method::GET, "/status", StatusCode::BAD_GATEWAY, "gateway down")
            .ends_with("| Status | Getting server status | Error 502: gateway down\n"));
    }

    #[tokio::test]
    async fn test_logs_on_response() {
        let memory = Memory::default();
        let logger = CommandLogger::with_writer(memory.clone());

        let url = r#"{"url":"http://example.com"}"#;
        let command = command(Method::POST, "/session/abcdef123/url", url);
        logger.on_command(&command).await.unwrap();
        assert!(memory.lines().is_empty());

        command.handle_response(StatusCode::OK, Bytes::from_static(b"{\"value\":null}"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let lines = memory.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].contains("[abcdef]"));
        assert!(lines[0].ends_with("| Go | Navigating to http://example.com"));
    }

    #[tokio::test]
    async fn test_logs_after_command_released() {
        let memory = Memory::default();
        let logger = CommandLogger::with_writer(memory.clone());

        // The relay drops its handle right after storing the response.
        let command = command(Method::POST, "/session/s1/element", r#"{"using":"id","value":"q"}"#);
        logger.on_command(&command).await.unwrap();
        let reply = r#"{"value":{"ELEMENT":"abcdefgh"}}"#;
        command.handle_response(StatusCode::OK, Bytes::copy_from_slice(reply.as_bytes()));
        drop(command);
        tokio::time::sleep(Duration::from_millis(50)).await;

        let lines = memory.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("| Finding element by id \"q\" | Found element abcdef"));
    }

    #[tokio::test]
    async fn test_dropped_command_logs_nothing() {
        let memory = Memory::default();
        let logger = CommandLogger::with_writer(memory.clone());

        let command = command(Method::GET, "/session/s1/title", "");
        logger.on_command(&command).await.unwrap();
        drop(command);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(memory.lines().is_empty());
    }

    #[tokio::test]
    async fn test_writes_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let logger = CommandLogger::new(dir.path().join("logs")).unwrap();
        let path = logger.path().unwrap().to_path_buf();
        assert!(path.ends_with(logger.log_name()));

        let command = command(Method::GET, "/status", "");
        logger.on_command(&command).await.unwrap();
        command.handle_response(StatusCode::OK, Bytes::from_static(b"{}"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.ends_with("| Status | Getting server status\n"));
    }
}
