//! Lambda adapter configuration.

use bytes::Bytes;
use std::fmt;

/// Profile used when none is configured.
pub const DEFAULT_PROFILE: &str = "prod";

/// Lambda adapter configuration.
///
/// Built explicitly and handed to [`HttpApi`](crate::HttpApi) or
/// [`HttpStreaming`](crate::HttpStreaming); the adapter itself never reads
/// the process environment. Each request carries a copy as a typed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaConfig {
    /// Deployment profile, e.g. "prod" or "dev".
    pub profile: String,
    /// AWS region the function runs in.
    pub region: Option<String>,
    /// Name of the deployed function.
    pub function_name: Option<String>,
    /// Enable request logging.
    pub log_requests: bool,
    /// Enable response logging.
    pub log_responses: bool,
    /// Bytes written ahead of a streamed body, see
    /// [`StreamingTo::with_body_hint`](crate::StreamingTo::with_body_hint).
    pub stream_body_hint: Option<Bytes>,
}

impl Default for LambdaConfig {
    fn default() -> Self {
        Self {
            profile: DEFAULT_PROFILE.to_string(),
            region: None,
            function_name: None,
            log_requests: true,
            log_responses: false,
            stream_body_hint: None,
        }
    }
}

/// `<function> (<profile>, <region>)`, as logged at startup.
impl fmt::Display for LambdaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {})",
            self.function_name.as_deref().unwrap_or("<local>"),
            self.profile,
            self.region.as_deref().unwrap_or("unknown region")
        )
    }
}

impl LambdaConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            profile: lookup("PROFILE")
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
            region: lookup("AWS_REGION"),
            function_name: lookup("AWS_LAMBDA_FUNCTION_NAME"),
            ..Self::default()
        }
    }

    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    /// Enable request logging.
    pub fn log_requests(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    /// Enable response logging.
    pub fn log_responses(mut self, enabled: bool) -> Self {
        self.log_responses = enabled;
        self
    }

    pub fn stream_body_hint(mut self, hint: impl Into<Bytes>) -> Self {
        self.stream_body_hint = Some(hint.into());
        self
    }

    pub fn is_production(&self) -> bool {
        self.profile == DEFAULT_PROFILE
    }
}
