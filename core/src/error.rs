//! Error types for the Pokédex SDK.
//!
//! # Design
//! `ApiError` covers everything that can go wrong between building a request
//! and holding a typed record. `NotFound` gets a dedicated variant because
//! callers frequently distinguish "no such creature" from "the server returned
//! an unexpected status." Inside the repository these errors never escape as
//! faults; they are rendered into the message of a `Failure` state.
//!
//! `IdentityError` is a data-integrity fault against the upstream URL
//! contract. `SdkError` is a usage fault: calling into a disposed SDK.

use thiserror::Error;

/// Errors returned by the transport layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The server returned 404: the requested resource does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404. The message omits
    /// `body`.
    #[error("unexpected HTTP status {status}")]
    Http { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request never produced a response (DNS, connect, TLS, reset).
    #[error("transport failed: {0}")]
    Transport(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The executor was closed by `dispose()`.
    #[error("transport closed")]
    Closed,
}

/// Failure to derive a numeric identity from a listing entry's canonical URL.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("url has no trailing path segment: {url}")]
    MissingSegment { url: String },

    #[error("trailing segment {segment:?} of {url} is not a positive integer")]
    InvalidId { url: String, segment: String },
}

/// Usage errors raised by the SDK facade.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SdkError {
    #[error("SDK disposed")]
    Disposed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_short_and_readable() {
        assert_eq!(ApiError::NotFound.to_string(), "resource not found");
        assert_eq!(
            ApiError::Http {
                status: 503,
                body: "busy".to_string()
            }
            .to_string(),
            "unexpected HTTP status 503"
        );
        assert_eq!(ApiError::Timeout.to_string(), "request timed out");
        assert_eq!(SdkError::Disposed.to_string(), "SDK disposed");
    }

    #[test]
    fn identity_error_names_the_url() {
        let err = IdentityError::InvalidId {
            url: "https://x/pokemon/abc/".to_string(),
            segment: "abc".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("\"abc\""));
        assert!(msg.contains("https://x/pokemon/abc/"));
    }
}
