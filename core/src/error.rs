//! Error types for the fetcher client.
//!
//! # Design
//! Every failed call surfaces as a single `FetchError` shape regardless of
//! where it went wrong: before a response arrived (`Timeout`, `Network`),
//! after a non-2xx response (`Status`), or while decoding a successful body
//! (`Decode`). The `name` and `status` fields carry the classification so
//! callers and final-error hooks can inspect them without matching on types.
//!
//! `BuildError` is separate because it only happens once, at construction.

use thiserror::Error;

/// Name carried by timeout failures, both on signals and on errors.
pub const TIMEOUT_ERROR: &str = "TimeoutError";

/// Default name for pre-response failures that carry no name of their own.
pub const NETWORK_ERROR: &str = "NetworkError";

/// Broad classification of a `FetchError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request was aborted by a timeout.
    Timeout,
    /// The transport failed before a response was obtained.
    Network,
    /// A response arrived but its status was not 2xx.
    Status,
    /// A successful response body could not be decoded.
    Decode,
}

/// The error returned by every `Fetcher` verb method.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct FetchError {
    pub kind: ErrorKind,
    pub message: String,
    pub name: String,
    pub status: u16,
    /// Parsed JSON payload of a failing response, when it declared JSON.
    pub data: Option<serde_json::Value>,
}

impl FetchError {
    pub fn timeout() -> Self {
        Self {
            kind: ErrorKind::Timeout,
            message: "Request timed out".to_string(),
            name: TIMEOUT_ERROR.to_string(),
            status: 408,
            data: None,
        }
    }

    /// A pre-response failure. Empty `name` or `message` fall back to
    /// `NetworkError` and `Failed to fetch`.
    pub fn network(name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        let message = message.into();
        Self {
            kind: ErrorKind::Network,
            message: if message.is_empty() {
                "Failed to fetch".to_string()
            } else {
                message
            },
            name: if name.is_empty() {
                NETWORK_ERROR.to_string()
            } else {
                name
            },
            status: 500,
            data: None,
        }
    }

    pub fn http_status(
        status: u16,
        status_text: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Self {
        let status_text = status_text.into();
        Self {
            kind: ErrorKind::Status,
            message: format!("Request failed with status code {status} -- {status_text}"),
            name: status_text,
            status,
            data,
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Decode,
            message: message.into(),
            name: "DecodeError".to_string(),
            status: 500,
            data: None,
        }
    }

    /// Always `false`; mirrors the `ok` flag of a response envelope.
    pub fn ok(&self) -> bool {
        false
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    pub fn is_network(&self) -> bool {
        self.kind == ErrorKind::Network
    }

    pub fn is_status(&self) -> bool {
        self.kind == ErrorKind::Status
    }
}

impl From<TransportError> for FetchError {
    fn from(err: TransportError) -> Self {
        if err.is_timeout() {
            FetchError::timeout()
        } else {
            FetchError::network(err.name, err.message)
        }
    }
}

/// A failure reported by a `Transport` before any response was produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name}: {message}")]
pub struct TransportError {
    pub name: String,
    pub message: String,
}

impl TransportError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Matches either the name or the message against `TimeoutError`.
    pub fn is_timeout(&self) -> bool {
        self.name == TIMEOUT_ERROR || self.message == TIMEOUT_ERROR
    }
}

/// Errors raised while constructing a `Fetcher`.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The crate was built without any HTTP transport backend.
    #[error("no HTTP transport is available in this build; enable the `reqwest` feature or use `Fetcher::with_transport`")]
    NoTransport,

    /// The transport backend failed to initialise.
    #[error("transport initialisation failed: {0}")]
    Transport(String),
}

/// A header name or value that could not be converted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid header {name:?}: {reason}")]
pub struct InvalidHeader {
    pub name: String,
    pub reason: String,
}

impl From<InvalidHeader> for TransportError {
    fn from(err: InvalidHeader) -> Self {
        TransportError::new("InvalidHeader", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_error_shape() {
        let err = FetchError::timeout();
        assert_eq!(err.status, 408);
        assert_eq!(err.name, "TimeoutError");
        assert_eq!(err.to_string(), "Request timed out");
        assert!(!err.ok());
        assert!(err.is_timeout());
    }

    #[test]
    fn network_error_defaults() {
        let err = FetchError::network("", "");
        assert_eq!(err.status, 500);
        assert_eq!(err.name, "NetworkError");
        assert_eq!(err.message, "Failed to fetch");
        assert!(err.is_network());
    }

    #[test]
    fn network_error_keeps_underlying_name() {
        let err = FetchError::network("ConnectError", "connection refused");
        assert_eq!(err.name, "ConnectError");
        assert_eq!(err.message, "connection refused");
    }

    #[test]
    fn status_error_uses_status_text_as_name() {
        let err = FetchError::http_status(404, "Not Found", None);
        assert_eq!(err.status, 404);
        assert_eq!(err.name, "Not Found");
        assert_eq!(err.message, "Request failed with status code 404 -- Not Found");
        assert!(err.is_status());
    }

    #[test]
    fn transport_timeout_signature_matches_name_or_message() {
        assert!(TransportError::new("TimeoutError", "signal timed out").is_timeout());
        assert!(TransportError::new("AbortError", "TimeoutError").is_timeout());
        assert!(!TransportError::new("AbortError", "aborted").is_timeout());
    }

    #[test]
    fn transport_error_converts_by_signature() {
        let err: FetchError = TransportError::new("TimeoutError", "x").into();
        assert_eq!(err.status, 408);
        assert_eq!(err.message, "Request timed out");

        let err: FetchError = TransportError::new("AbortError", "This operation was aborted").into();
        assert_eq!(err.status, 500);
        assert_eq!(err.name, "AbortError");
    }

    #[test]
    fn build_error_display() {
        assert!(BuildError::NoTransport.to_string().contains("reqwest"));
    }
}
