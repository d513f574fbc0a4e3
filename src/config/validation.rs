//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses (bind address parses, upstream is plain http)
//! - Validate value ranges (body limit > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;
use crate::http::upstream::parse_upstream;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    InvalidBindAddress(String),
    InvalidUpstream(String),
    ZeroBodyLimit,
    EmptyWaitScript,
    EmptyScriptEndpoint,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidBindAddress(addr) => {
                write!(f, "listener.bind_address `{}` is not a socket address", addr)
            }
            ValidationError::InvalidUpstream(reason) => write!(f, "upstream.address: {}", reason),
            ValidationError::ZeroBodyLimit => write!(f, "limits.max_body_bytes must be > 0"),
            ValidationError::EmptyWaitScript => {
                write!(f, "stability.wait_script must not be empty")
            }
            ValidationError::EmptyScriptEndpoint => {
                write!(f, "stability.script_endpoint must not be empty")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Err(e) = parse_upstream(&config.upstream.address) {
        errors.push(ValidationError::InvalidUpstream(e.to_string()));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    // Checked even when disabled: waiting can be switched on at runtime.
    if config.stability.wait_script.trim().is_empty() {
        errors.push(ValidationError::EmptyWaitScript);
    }

    if config.stability.script_endpoint.trim_matches('/').is_empty() {
        errors.push(ValidationError::EmptyScriptEndpoint);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
