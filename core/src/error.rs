//! Error types for the directory client.
//!
//! # Design
//! `RemoteFault` gets a dedicated variant because callers frequently need the
//! service's own fault code (bad credentials, unknown feed) as opposed to "the
//! call never completed." Every other failure of a call lands in `Transport`
//! with a human-readable message. `Connection` is only produced while building
//! a client, before any call is made.

use thiserror::Error;

/// Errors returned by `DirectoryClient` operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The service answered with an XML-RPC `<fault>`.
    #[error("XML-RPC: {code}: {message}")]
    RemoteFault { code: i64, message: String },

    /// The call failed for any other reason: I/O, HTTP status, malformed XML,
    /// or a result whose shape the operation did not expect.
    #[error("transport error: {0}")]
    Transport(String),

    /// The client could not be constructed from its endpoint or configuration.
    #[error("connection error: {0}")]
    Connection(String),
}

impl ApiError {
    /// Shorthand used when a decoded result does not have the expected shape.
    pub(crate) fn unexpected(what: &str, got: &crate::Value) -> Self {
        ApiError::Transport(format!("unexpected result: expected {what}, got {}", got.type_name()))
    }
}
