//! Call results and response classification.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Outcome of a procedure call: the decoded payload or a [`Status`].
pub type CallResult<T = Value> = Result<T, Status>;

/// Failure classes a call can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    /// 400: the server rejected the arguments.
    BadRequest,
    /// 403: missing, invalid or expired credential.
    Unauthorized,
    /// 404: procedure or resource not found.
    NotFound,
    /// 500: server failure, unmapped status, transport or decode failure.
    ServerError,
}

impl StatusKind {
    /// Numeric status code.
    pub fn code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::Unauthorized => 403,
            Self::NotFound => 404,
            Self::ServerError => 500,
        }
    }

    /// Fixed details used when the server provides none.
    pub fn default_details(self) -> &'static str {
        match self {
            Self::BadRequest => "Bad Request",
            Self::Unauthorized => "Unauthorized",
            Self::NotFound => "Not Found",
            Self::ServerError => "A server error occurred",
        }
    }
}

/// A structured failure result.
///
/// The numeric code always follows the kind. It is serialized for readers of
/// the JSON form and recomputed from `kind` when deserializing.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(from = "StatusRepr")]
#[error("{}: {}", .code, DetailsDisplay(.details))]
pub struct Status {
    kind: StatusKind,
    code: u16,
    /// Server-provided error body, or a fixed string.
    pub details: Value,
}

#[derive(Deserialize)]
struct StatusRepr {
    kind: StatusKind,
    details: Value,
}

impl From<StatusRepr> for Status {
    fn from(repr: StatusRepr) -> Self {
        Self::with_details(repr.kind, repr.details)
    }
}

impl Status {
    /// Status with the kind's fixed details.
    pub fn new(kind: StatusKind) -> Self {
        Self::with_details(kind, Value::String(kind.default_details().to_string()))
    }

    /// Status with explicit details.
    pub fn with_details(kind: StatusKind, details: Value) -> Self {
        Self {
            kind,
            code: kind.code(),
            details,
        }
    }

    /// The 500 status used for every opaque failure.
    pub fn server_error() -> Self {
        Self::new(StatusKind::ServerError)
    }

    /// Failure class.
    pub fn kind(&self) -> StatusKind {
        self.kind
    }

    /// Numeric code: 400, 403, 404 or 500.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Whether this is an auth failure.
    pub fn is_unauthorized(&self) -> bool {
        self.kind == StatusKind::Unauthorized
    }

    /// A human-readable message drawn from the details.
    ///
    /// Plain strings are returned as-is, `{"detail": "..."}` bodies yield the
    /// detail, anything else is rendered as JSON.
    pub fn message(&self) -> String {
        match &self.details {
            Value::String(s) => s.clone(),
            Value::Object(map) => match map.get("detail") {
                Some(Value::String(s)) => s.clone(),
                _ => self.details.to_string(),
            },
            other => other.to_string(),
        }
    }
}

struct DetailsDisplay<'a>(&'a Value);

impl fmt::Display for DetailsDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{}", other),
        }
    }
}

/// Classify a completed HTTP response.
///
/// 2xx bodies must decode as JSON and are returned unwrapped. 400 and 403
/// keep a JSON error body when there is one. 404 always carries "Not Found".
/// Everything else, including undecodable success bodies, becomes a 500.
pub fn classify(status: u16, body: &[u8]) -> CallResult {
    match status {
        200..=299 => serde_json::from_slice(body).map_err(|e| {
            tracing::error!(status, error = %e, "Failed to decode response body");
            Status::server_error()
        }),
        400 => Err(status_with_body(StatusKind::BadRequest, body)),
        403 => Err(status_with_body(StatusKind::Unauthorized, body)),
        404 => Err(Status::new(StatusKind::NotFound)),
        _ => Err(Status::server_error()),
    }
}

/// Keep the server's error body: JSON when it parses, text otherwise.
/// Only an empty or `null` body falls back to the fixed details.
fn status_with_body(kind: StatusKind, body: &[u8]) -> Status {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Null) => Status::new(kind),
        Ok(details) => Status::with_details(kind, details),
        Err(_) => {
            let text = String::from_utf8_lossy(body);
            let text = text.trim();
            if text.is_empty() {
                Status::new(kind)
            } else {
                Status::with_details(kind, Value::String(text.to_string()))
            }
        }
    }
}
