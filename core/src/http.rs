//! HTTP exchange types for the host-does-IO pattern.
//!
//! # Design
//! `DirectoryClient` builds an `HttpRequest` for each remote call and parses
//! the `HttpResponse` that comes back, but never touches the network itself:
//! a `Transport` executes the round trip. This keeps request building and
//! response parsing deterministic and lets tests swap in a scripted transport.
//!
//! XML-RPC only ever POSTs, so there is no method field.

/// An HTTP POST described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// A `200 OK` carrying `body`, as transports produce for XML-RPC replies.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: vec![("content-type".to_string(), "text/xml".to_string())],
            body: body.into(),
        }
    }
}
