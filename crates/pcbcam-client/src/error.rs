//! Error types for the client layer.
//!
//! These cover discovery and construction. Failures of an individual
//! procedure call are reported as [`Status`](crate::Status) values instead.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur while discovering endpoints or building the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport error talking to the server.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error during file operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The discovery endpoint answered with a non-success status.
    #[error("Status code {status} encountered while fetching endpoint descriptor from {url}")]
    Discovery { url: String, status: u16 },

    /// The descriptor does not have the expected shape.
    #[error("Malformed endpoint descriptor at {location}: {message}")]
    MalformedDescriptor { location: String, message: String },

    /// No namespace with this name was generated.
    #[error("Unknown namespace: {0}")]
    UnknownNamespace(String),

    /// The namespace exists but has no such procedure.
    #[error("Unknown procedure {namespace}.{procedure}")]
    UnknownProcedure {
        namespace: String,
        procedure: String,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Create a malformed-descriptor error for the given location.
    pub fn malformed(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedDescriptor {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create an unknown-procedure error.
    pub fn unknown_procedure(namespace: impl Into<String>, procedure: impl Into<String>) -> Self {
        Self::UnknownProcedure {
            namespace: namespace.into(),
            procedure: procedure.into(),
        }
    }
}
