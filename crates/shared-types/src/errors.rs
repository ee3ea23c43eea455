//! # Error Types
//!
//! The protocol error taxonomy shared by every rule.
//!
//! A rejected mutation is a [`ProtocolError`]: a closed [`ErrorCode`], a
//! human-readable message, ordered key/value tags for diagnostics and the
//! name of the rule that produced it. Tags never influence the verdict.

use std::fmt::{self, Write as _};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of rejection codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    InvalidArgument,
    PermissionDenied,
    BadEvent,
    BadStreamId,
    BadStreamCreationParams,
    AlreadyExists,
    NotFound,
    FailedPrecondition,
    UnknownNode,
    /// The event does not reference a known miniblock.
    BadPrevMiniblockHash,
    /// The event is already part of the stream.
    DuplicateEvent,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::BadEvent => "BAD_EVENT",
            ErrorCode::BadStreamId => "BAD_STREAM_ID",
            ErrorCode::BadStreamCreationParams => "BAD_STREAM_CREATION_PARAMS",
            ErrorCode::AlreadyExists => "ALREADY_EXISTS",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::FailedPrecondition => "FAILED_PRECONDITION",
            ErrorCode::UnknownNode => "UNKNOWN_NODE",
            ErrorCode::BadPrevMiniblockHash => "BAD_PREV_MINIBLOCK_HASH",
            ErrorCode::DuplicateEvent => "DUPLICATE_EVENT",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hard rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}{}", render_context(.func, .tags))]
pub struct ProtocolError {
    code: ErrorCode,
    message: String,
    tags: Vec<(&'static str, String)>,
    func: Option<&'static str>,
}

/// Convenience alias for rule results.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

impl ProtocolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            tags: Vec::new(),
            func: None,
        }
    }

    /// Attaches a diagnostic key/value pair.
    #[must_use]
    pub fn tag(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.tags.push((key, value.to_string()));
        self
    }

    /// Records the rule that produced the error. The first call wins.
    #[must_use]
    pub fn func(mut self, name: &'static str) -> Self {
        self.func.get_or_insert(name);
        self
    }

    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn tags(&self) -> &[(&'static str, String)] {
        &self.tags
    }

    /// Looks up the first tag recorded under `key`.
    #[must_use]
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn func_name(&self) -> Option<&'static str> {
        self.func
    }
}

fn render_context(func: &Option<&'static str>, tags: &[(&'static str, String)]) -> String {
    let mut out = String::new();
    if let Some(func) = func {
        let _ = write!(out, " [{func}]");
    }
    for (key, value) in tags {
        let _ = write!(out, " {key}={value}");
    }
    out
}
