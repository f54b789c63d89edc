//! HTTP transport types for the host-does-IO split.
//!
//! # Design
//! Requests and responses are plain data. `PokeApiClient` builds
//! `HttpRequest` values and parses `HttpResponse` values without touching the
//! network; an `HttpExecutor` performs the round-trip in between. The catalog
//! is read-only, so every request is a GET and carries no body.
//!
//! All fields use owned types so values can be moved into spawned tasks and
//! test stubs without lifetime concerns.

/// A GET request described as plain data.
///
/// `url` is fully formed, including the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn get(url: String) -> Self {
        Self {
            url,
            headers: vec![("accept".to_string(), "application/json".to_string())],
        }
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// A response with no headers, as produced by test stubs.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
