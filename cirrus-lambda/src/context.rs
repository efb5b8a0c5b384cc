//! Invocation metadata handed to the routing layer.

use crate::event::{EventRequestContext, HttpDescription};
use crate::{LambdaError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// The gateway's view of a request, attached to every [`cirrus_core::Request`].
///
/// Immutable once built. Equality and ordering are field-wise, in
/// declaration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub account_id: String,
    pub api_id: String,
    pub domain_name: String,
    pub domain_prefix: String,
    pub request_id: String,
    pub route_key: String,
    pub stage: String,
    /// Request time, truncated to whole seconds.
    pub time: DateTime<Utc>,
    pub http: HttpDescription,
}

fn required(value: &Option<String>, field: &str) -> Result<String> {
    value
        .clone()
        .ok_or_else(|| LambdaError::Context(format!("missing requestContext.{}", field)))
}

impl RequestContext {
    /// Build from an event's `requestContext` record.
    pub fn from_event(context: &EventRequestContext) -> Result<Self> {
        let epoch = context
            .time_epoch
            .ok_or_else(|| LambdaError::Context("missing requestContext.timeEpoch".to_string()))?;
        let time = DateTime::<Utc>::from_timestamp(epoch / 1000, 0).ok_or_else(|| {
            LambdaError::Context(format!("requestContext.timeEpoch out of range: {}", epoch))
        })?;

        Ok(Self {
            account_id: required(&context.account_id, "accountId")?,
            api_id: required(&context.api_id, "apiId")?,
            domain_name: required(&context.domain_name, "domainName")?,
            domain_prefix: required(&context.domain_prefix, "domainPrefix")?,
            request_id: required(&context.request_id, "requestId")?,
            route_key: required(&context.route_key, "routeKey")?,
            stage: required(&context.stage, "stage")?,
            time,
            http: context
                .http
                .clone()
                .ok_or_else(|| LambdaError::Context("missing requestContext.http".to_string()))?,
        })
    }

    /// Compare against a possibly absent value; anything is greater than
    /// nothing.
    pub fn compare_to(&self, other: Option<&RequestContext>) -> Ordering {
        match other {
            Some(other) => self.cmp(other),
            None => Ordering::Greater,
        }
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "RequestContext({} -> {}::{})@{{",
            self.request_id, self.api_id, self.route_key
        )?;
        writeln!(f, "  [accountId   ] {}", self.account_id)?;
        writeln!(f, "  [domainName  ] {}", self.domain_name)?;
        writeln!(f, "  [domainPrefix] {}", self.domain_prefix)?;
        writeln!(f, "  [stage       ] {}", self.stage)?;
        writeln!(f, "  [time        ] {}", self.time.to_rfc3339())?;
        writeln!(f, "  [http        ] {:?}", self.http)?;
        writeln!(f, "}}")
    }
}

/// Runtime-level context of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationContext {
    pub request_id: String,
    pub invoked_function_arn: String,
    /// Distributed trace header value, e.g. `Root=1-...;Parent=...;Sampled=1`.
    pub trace_id: Option<String>,
    /// Deadline in milliseconds since the epoch.
    pub deadline_ms: u64,
}

impl InvocationContext {
    /// Build from the `Lambda-Runtime-*` headers of a "next invocation"
    /// response. Unknown headers are ignored.
    pub fn from_runtime_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut context = Self::default();
        for (name, value) in headers {
            match name.to_ascii_lowercase().as_str() {
                "lambda-runtime-aws-request-id" => context.request_id = value.to_string(),
                "lambda-runtime-invoked-function-arn" => {
                    context.invoked_function_arn = value.to_string()
                }
                "lambda-runtime-trace-id" => context.trace_id = Some(value.to_string()),
                "lambda-runtime-deadline-ms" => {
                    context.deadline_ms = value.parse().unwrap_or_default()
                }
                _ => {}
            }
        }
        context
    }

    pub fn trace_id(&self) -> &str {
        self.trace_id.as_deref().unwrap_or("")
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(i64::try_from(self.deadline_ms).ok()?)
    }
}

impl From<lambda_runtime::Context> for InvocationContext {
    fn from(context: lambda_runtime::Context) -> Self {
        Self {
            request_id: context.request_id,
            invoked_function_arn: context.invoked_function_arn,
            trace_id: context.xray_trace_id,
            deadline_ms: context.deadline,
        }
    }
}
