//! Lambda request conversion.

use crate::event::{InvocationEvent, SUPPORTED_VERSION};
use crate::{LambdaError, RequestContext, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use bytes::Bytes;
use cirrus_core::{Input, MultipartParser, Parts};
use std::io::Cursor;
use std::sync::Arc;

/// Source address reported when the event carries none.
pub const DEFAULT_REMOTE_ADDR: &str = "127.0.0.1";

/// [`Input`] over an API gateway (payload format 2.0) invocation event.
///
/// The body is decoded once, at construction; reads then advance a cursor
/// over the decoded bytes.
pub struct FromApiGateway {
    event: InvocationEvent,
    body: Bytes,
    offset: usize,
    multipart: Option<Arc<dyn MultipartParser>>,
}

impl FromApiGateway {
    /// Create from an event, negotiating its version and decoding the body.
    pub fn new(event: InvocationEvent) -> Result<Self> {
        match event.version.as_deref() {
            None => {
                return Err(LambdaError::Config(
                    "Cannot handle API gateway without version".to_string(),
                ));
            }
            Some(version) if version != SUPPORTED_VERSION => {
                return Err(LambdaError::Config(format!(
                    "Cannot handle API gateway version {}",
                    version
                )));
            }
            Some(_) => {}
        }

        let body = match &event.body {
            None => Bytes::new(),
            Some(encoded) if event.is_base64_encoded => Bytes::from(STANDARD.decode(encoded)?),
            Some(text) => Bytes::from(text.clone()),
        };

        Ok(Self {
            event,
            body,
            offset: 0,
            multipart: None,
        })
    }

    /// Parse an event from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::new(serde_json::from_str(json)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Self::new(serde_json::from_value(value)?)
    }

    /// Use the given parser for `multipart/form-data` bodies.
    pub fn with_multipart(mut self, parser: Arc<dyn MultipartParser>) -> Self {
        self.multipart = Some(parser);
        self
    }

    pub fn event(&self) -> &InvocationEvent {
        &self.event
    }

    /// Gateway request context of this event.
    pub fn context(&self) -> Result<RequestContext> {
        RequestContext::from_event(&self.event.request_context)
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.event
            .headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn remaining(&self) -> Bytes {
        self.body.slice(self.offset..)
    }

    /// Ordered header pairs, see [`HeaderIter`].
    pub fn header_pairs(&self) -> HeaderIter<'_> {
        HeaderIter {
            event: &self.event,
            state: HeaderState::RemoteAddr,
        }
    }
}

impl Input for FromApiGateway {
    fn version(&self) -> String {
        self.event
            .http()
            .and_then(|http| http.protocol.as_deref())
            .and_then(|protocol| protocol.strip_prefix("HTTP/"))
            .map(|version| version.trim_end_matches('\r').to_string())
            .unwrap_or_else(|| "1.1".to_string())
    }

    fn scheme(&self) -> &str {
        self.header("x-forwarded-proto").unwrap_or("http")
    }

    fn method(&self) -> &str {
        self.event
            .http()
            .and_then(|http| http.method.as_deref())
            .unwrap_or("GET")
    }

    fn uri(&self) -> String {
        if self.event.raw_query_string.is_empty() {
            self.event.raw_path.clone()
        } else {
            format!("{}?{}", self.event.raw_path, self.event.raw_query_string)
        }
    }

    fn headers(&self) -> Box<dyn Iterator<Item = (String, String)> + '_> {
        Box::new(self.header_pairs())
    }

    fn incoming(&self) -> Option<Cursor<Bytes>> {
        self.event
            .body
            .as_ref()
            .map(|_| Cursor::new(self.remaining()))
    }

    fn read_line(&mut self) -> Option<Bytes> {
        if self.offset >= self.body.len() {
            return None;
        }

        let rest = &self.body[self.offset..];
        let line = match memchr::memchr(b'\n', rest) {
            Some(p) => {
                let line = self.body.slice(self.offset..self.offset + p);
                self.offset += p + 1;
                line
            }
            None => {
                let line = self.remaining();
                self.offset = self.body.len();
                line
            }
        };
        Some(line)
    }

    fn read(&mut self, length: Option<usize>) -> Bytes {
        let available = self.body.len() - self.offset;
        let n = length.map_or(available, |l| l.min(available));
        let chunk = self.body.slice(self.offset..self.offset + n);
        self.offset += n;
        chunk
    }

    fn parts(&mut self, boundary: &str) -> cirrus_core::Result<Parts> {
        let parser = self.multipart.clone().ok_or_else(|| {
            cirrus_core::Error::Multipart("No multipart parser configured".to_string())
        })?;
        let body = self.read(None);
        parser.parse(body, boundary)
    }
}

impl std::fmt::Debug for FromApiGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FromApiGateway")
            .field("method", &self.method())
            .field("uri", &self.uri())
            .field("body_len", &self.body.len())
            .field("offset", &self.offset)
            .finish()
    }
}

enum HeaderState<'a> {
    RemoteAddr,
    Native(indexmap::map::Iter<'a, String, String>),
    Cookie,
    Done,
}

/// Lazily produced request headers.
///
/// Yields a synthetic `remote-addr` first, then the event's headers in
/// order, then a `cookie` header joined from the event's parsed cookies.
/// The latter is skipped when the event already carries a raw `cookie`
/// header (function URLs send both), so cookies reach the consumer once.
///
/// The sequence is finite and cannot be restarted.
pub struct HeaderIter<'a> {
    event: &'a InvocationEvent,
    state: HeaderState<'a>,
}

impl Iterator for HeaderIter<'_> {
    type Item = (String, String);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match std::mem::replace(&mut self.state, HeaderState::Done) {
                HeaderState::RemoteAddr => {
                    self.state = HeaderState::Native(self.event.headers.iter());
                    let addr = self
                        .event
                        .http()
                        .and_then(|http| http.source_ip.as_deref())
                        .unwrap_or(DEFAULT_REMOTE_ADDR);
                    return Some(("remote-addr".to_string(), addr.to_string()));
                }
                HeaderState::Native(mut headers) => {
                    if let Some((name, value)) = headers.next() {
                        self.state = HeaderState::Native(headers);
                        return Some((name.clone(), value.clone()));
                    }
                    self.state = HeaderState::Cookie;
                }
                HeaderState::Cookie => {
                    let has_raw = self
                        .event
                        .headers
                        .keys()
                        .any(|name| name.eq_ignore_ascii_case("cookie"));
                    if !has_raw && !self.event.cookies.is_empty() {
                        return Some(("cookie".to_string(), self.event.cookies.join("; ")));
                    }
                }
                HeaderState::Done => return None,
            }
        }
    }
}
