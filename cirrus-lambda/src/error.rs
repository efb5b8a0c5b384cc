//! Lambda error types.

use thiserror::Error;

/// Result type for Lambda operations.
pub type Result<T> = std::result::Result<T, LambdaError>;

/// Lambda adapter errors.
///
/// These fail an invocation before any routing happens; they surface as a
/// runtime-level invocation error rather than an HTTP response.
#[derive(Debug, Error)]
pub enum LambdaError {
    /// Unsupported or missing event version.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Body flagged as base64 but not decodable.
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] base64::DecodeError),

    /// Required request context field missing.
    #[error("Request context error: {0}")]
    Context(String),

    /// Event could not be deserialized.
    #[error("Event error: {0}")]
    Event(#[from] serde_json::Error),

    /// Error from the input/output boundary.
    #[error(transparent)]
    Core(#[from] cirrus_core::Error),

    /// Lambda runtime error.
    #[error("Lambda runtime error: {0}")]
    Runtime(String),
}

impl From<lambda_runtime::Error> for LambdaError {
    fn from(err: lambda_runtime::Error) -> Self {
        Self::Runtime(err.to_string())
    }
}
