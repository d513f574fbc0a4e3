//! Endpoint matching logic.
//!
//! # Responsibilities
//! - Parse `/session/:sessionId/element/:elementId/click` style patterns
//! - Match method + segment count + literal segments
//! - Extract named parameters from a matching path
//!
//! # Design Decisions
//! - Method is compared exactly
//! - Literal segments are case-sensitive, byte-for-byte
//! - A parameter segment binds any non-empty segment
//! - No regex, no specificity ranking: the table decides by order

use std::collections::HashMap;

use axum::http::Method;

use crate::routing::kind::CommandKind;

/// Parameters extracted from a request path, keyed without the `:` prefix.
pub type Params = HashMap<String, String>;

/// Marks a pattern segment as a named parameter.
const PARAM_PREFIX: char = ':';

/// One segment of a [`PathPattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the request segment exactly.
    Literal(String),
    /// Binds the request segment under this name.
    Param(String),
}

/// A parsed path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a pattern.
    ///
    /// # Panics
    /// If two parameter segments share a name. Patterns are written by hand
    /// when the endpoint table is built, so this is a programming error.
    pub fn parse(pattern: &str) -> Self {
        let segments: Vec<Segment> = pattern
            .split('/')
            .map(|part| match part.strip_prefix(PARAM_PREFIX) {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(part.to_string()),
            })
            .collect();

        let mut seen = Vec::new();
        for segment in &segments {
            if let Segment::Param(name) = segment {
                assert!(
                    !seen.contains(&name),
                    "duplicate parameter `{}` in pattern `{}`",
                    name,
                    pattern
                );
                seen.push(name);
            }
        }

        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Number of `/`-separated segments, including the leading empty one.
    pub fn arity(&self) -> usize {
        self.segments.len()
    }

    /// Names of the parameter segments, in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Returns the bound parameters if `path` matches this pattern.
    pub fn capture(&self, path: &str) -> Option<Params> {
        let parts: Vec<&str> = path.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = Params::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) => {
                    if literal != part {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if part.is_empty() {
                        return None;
                    }
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(params)
    }
}

/// Immutable (pattern, method, kind) descriptor of one WebDriver endpoint.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pattern: PathPattern,
    method: Method,
    kind: CommandKind,
}

impl Endpoint {
    /// Create a new endpoint descriptor.
    pub fn new(method: Method, pattern: &str, kind: CommandKind) -> Self {
        Self {
            pattern: PathPattern::parse(pattern),
            method,
            kind,
        }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// Returns true if the request method and path match this endpoint.
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.params(method, path).is_some()
    }

    /// Match and extract parameters in one pass.
    pub fn params(&self, method: &Method, path: &str) -> Option<Params> {
        if *method != self.method {
            return None;
        }
        self.pattern.capture(path)
    }
}
