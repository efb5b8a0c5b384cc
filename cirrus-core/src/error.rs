// Error types for the Cirrus HTTP boundary

use crate::HttpStatus;
use std::fmt;
use thiserror::Error;

/// Result type for boundary operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading input or writing output.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An output was driven out of order, e.g. written to before `begin`.
    #[error("Illegal state: {0}")]
    State(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Multipart error: {0}")]
    Multipart(String),
}

/// Kind name reported for errors raised with an explicit status.
pub const HTTP_ERROR: &str = "HttpError";

/// Kind name reported for failures wrapped at the invocation boundary.
pub const INTERNAL_SERVER_ERROR: &str = "InternalServerError";

/// An error carrying its own HTTP status.
///
/// Application code returns these (through `anyhow::Error`) to answer with a
/// specific status. Anything else escaping a handler is wrapped into an
/// internal server error by [`HttpError::normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    status: u16,
    message: String,
    kind: &'static str,
    causes: Vec<String>,
}

impl HttpError {
    /// Create an error with a status and message.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            kind: HTTP_ERROR,
            causes: Vec::new(),
        }
    }

    /// Create an error whose message is the status' reason phrase.
    pub fn status(status: u16) -> Self {
        Self::new(status, HttpStatus::new(status).reason())
    }

    pub fn not_found() -> Self {
        Self::status(HttpStatus::NOT_FOUND.code())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(HttpStatus::BAD_REQUEST.code(), message)
    }

    /// Wrap an arbitrary failure as a 500.
    ///
    /// The message is taken from the failure itself, its sources become
    /// the causes listed in the compound message.
    pub fn internal(err: anyhow::Error) -> Self {
        Self {
            status: HttpStatus::INTERNAL_SERVER_ERROR.code(),
            message: err.to_string(),
            kind: INTERNAL_SERVER_ERROR,
            causes: err.chain().skip(1).map(ToString::to_string).collect(),
        }
    }

    /// Classify a failure escaping the routing layer.
    pub fn normalize(err: anyhow::Error) -> Self {
        match err.downcast::<HttpError>() {
            Ok(e) => e,
            Err(other) => Self::internal(other),
        }
    }

    /// Attach a cause line.
    pub fn caused_by(mut self, cause: impl fmt::Display) -> Self {
        self.causes.push(cause.to_string());
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Name of this error's kind, as reported in the vendor error-type header.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn causes(&self) -> &[String] {
        &self.causes
    }

    /// Human-readable message including every cause, one per line.
    pub fn compound_message(&self) -> String {
        let mut out = format!("Error {}", self);
        for cause in &self.causes {
            out.push_str("\nCaused by: ");
            out.push_str(cause);
        }
        out
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(#{}: {})", self.kind, self.status, self.message)
    }
}

impl std::error::Error for HttpError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("Not implemented")]
    struct NotImplemented;

    #[derive(Debug, Error)]
    #[error("Query failed")]
    struct QueryFailed(#[source] std::io::Error);

    #[test]
    fn test_status_uses_reason_phrase() {
        let e = HttpError::status(404);
        assert_eq!(e.status_code(), 404);
        assert_eq!(e.message(), "Not Found");
        assert_eq!(e.kind(), HTTP_ERROR);
    }

    #[test]
    fn test_compound_message() {
        assert_eq!(
            HttpError::status(404).compound_message(),
            "Error HttpError(#404: Not Found)"
        );
    }

    #[test]
    fn test_compound_message_with_causes() {
        let e = HttpError::new(502, "Upstream failed").caused_by("connection reset");
        assert_eq!(
            e.compound_message(),
            "Error HttpError(#502: Upstream failed)\nCaused by: connection reset"
        );
    }

    #[test]
    fn test_normalize_keeps_http_errors() {
        let e = HttpError::normalize(anyhow::Error::new(HttpError::new(403, "Forbidden")));
        assert_eq!(e, HttpError::new(403, "Forbidden"));
    }

    #[test]
    fn test_normalize_wraps_other_failures() {
        let e = HttpError::normalize(anyhow::Error::new(NotImplemented));
        assert_eq!(e.status_code(), 500);
        assert_eq!(e.message(), "Not implemented");
        assert_eq!(e.kind(), INTERNAL_SERVER_ERROR);
        assert!(e.causes().is_empty());
        assert_eq!(
            e.compound_message(),
            "Error InternalServerError(#500: Not implemented)"
        );
    }

    #[test]
    fn test_internal_keeps_source_chain() {
        let io = std::io::Error::other("disk full");
        let e = HttpError::internal(anyhow::Error::new(QueryFailed(io)));
        assert_eq!(e.message(), "Query failed");
        assert_eq!(e.causes(), ["disk full".to_string()]);
    }

    #[test]
    fn test_error_display() {
        let err = Error::State("write before begin".to_string());
        assert_eq!(err.to_string(), "Illegal state: write before begin");
    }
}
