//! Invocation event model.
//!
//! Mirrors the payload format 2.0 events sent by HTTP API gateways and
//! function URLs. Everything the gateway may leave out is optional here;
//! defaults are applied by [`crate::FromApiGateway`].

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// The only event version this adapter handles.
pub const SUPPORTED_VERSION: &str = "2.0";

/// Gateways send `null` for some absent collections; read those as empty.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// An inbound HTTP invocation event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationEvent {
    /// Payload format version.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub route_key: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub raw_path: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub raw_query_string: String,
    /// Cookies parsed by the gateway.
    #[serde(default, deserialize_with = "null_as_default")]
    pub cookies: Vec<String>,
    /// Headers in the order they were sent.
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: IndexMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub request_context: EventRequestContext,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_base64_encoded: bool,
    /// Absent (not just empty) when the request had no entity body.
    #[serde(default)]
    pub body: Option<String>,
}

/// The `requestContext` record of an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequestContext {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub api_id: Option<String>,
    #[serde(default)]
    pub domain_name: Option<String>,
    #[serde(default)]
    pub domain_prefix: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub route_key: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    /// Request time in milliseconds since the epoch.
    #[serde(default)]
    pub time_epoch: Option<i64>,
    #[serde(default)]
    pub http: Option<HttpDescription>,
}

/// The `requestContext.http` record of an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpDescription {
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub source_ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl InvocationEvent {
    pub fn http(&self) -> Option<&HttpDescription> {
        self.request_context.http.as_ref()
    }
}
