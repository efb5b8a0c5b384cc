//! Streamed Lambda responses.
//!
//! A streamed HTTP integration response starts with a JSON prelude
//! describing status and headers, followed by eight NUL bytes and the raw
//! body. Nothing is buffered; every write goes straight to the transport.

use bytes::Bytes;
use cirrus_core::{Error as CoreError, Headers, Output};
use http::{HeaderName, HeaderValue, StatusCode};
use indexmap::IndexMap;
use lambda_runtime::MetadataPrelude;
use memchr::memmem;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Body chunks queued for the Lambda runtime before writers wait.
pub const STREAM_CAPACITY: usize = 16;

/// Transport a streamed response is written to.
pub trait Stream: Send {
    /// Announce the content type of the whole stream.
    fn use_mime(&mut self, mime_type: &str);

    fn write(&mut self, bytes: &[u8]) -> cirrus_core::Result<()>;

    /// Signal that no more bytes follow.
    fn end(&mut self) -> cirrus_core::Result<()>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Prelude<'a> {
    status_code: u16,
    status_description: &'a str,
    headers: IndexMap<&'a str, &'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cookies: Option<&'a [String]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unopened,
    Open,
    Finished,
}

/// [`Output`] writing a streamed HTTP integration response.
pub struct StreamingTo<S: Stream> {
    stream: S,
    state: State,
    body_hint: Option<Bytes>,
}

impl<S: Stream> StreamingTo<S> {
    /// Separates the prelude from the body.
    pub const DELIMITER: [u8; 8] = [0; 8];

    pub const MIME_TYPE: &'static str = "application/vnd.awslambda.http-integration-response";

    pub fn new(mut stream: S) -> Self {
        stream.use_mime(Self::MIME_TYPE);
        Self {
            stream,
            state: State::Unopened,
            body_hint: None,
        }
    }

    /// Bytes written verbatim ahead of the first body chunk.
    ///
    /// Some transports buffer the prelude until body data arrives; a hint
    /// lets callers force it out early.
    pub fn with_body_hint(mut self, hint: impl Into<Bytes>) -> Self {
        self.body_hint = Some(hint.into());
        self
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Stream> Output for StreamingTo<S> {
    fn begin(&mut self, status: u16, message: &str, headers: &Headers) -> cirrus_core::Result<()> {
        if self.state != State::Unopened {
            return Err(CoreError::State("Prelude already sent".to_string()));
        }

        let mut prelude = Prelude {
            status_code: status,
            status_description: message,
            headers: IndexMap::with_capacity(headers.len()),
            cookies: None,
        };
        for (name, values) in headers.iter() {
            if name.eq_ignore_ascii_case("Set-Cookie") {
                prelude.cookies = Some(values);
            } else if let Some(first) = values.first() {
                prelude.headers.insert(name, first.as_str());
            }
        }

        let json =
            serde_json::to_vec(&prelude).map_err(|e| CoreError::Serialization(e.to_string()))?;
        self.stream.write(&json)?;
        self.stream.write(&Self::DELIMITER)?;
        self.state = State::Open;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> cirrus_core::Result<()> {
        match self.state {
            State::Open => {}
            State::Unopened => return Err(CoreError::State("Write before begin".to_string())),
            State::Finished => return Err(CoreError::State("Write after finish".to_string())),
        }

        if let Some(hint) = self.body_hint.take() {
            self.stream.write(&hint)?;
        }
        self.stream.write(bytes)
    }

    fn finish(&mut self) -> cirrus_core::Result<()> {
        if self.state == State::Finished {
            return Ok(());
        }
        self.state = State::Finished;
        self.stream.end()
    }
}

/// Stream forwarding chunks over an unbounded channel.
///
/// Ending the stream closes the channel, so the receiving side sees the
/// end of the body once all chunks were consumed. Nothing bounds the
/// queue; use it where the reader keeps up, e.g. local serving and tests.
/// [`RuntimeStream`] is the bounded transport for the Lambda runtime.
#[derive(Debug)]
pub struct ChannelStream {
    sender: Option<mpsc::UnboundedSender<Bytes>>,
    mime_type: Option<String>,
}

impl ChannelStream {
    pub fn new(sender: mpsc::UnboundedSender<Bytes>) -> Self {
        Self {
            sender: Some(sender),
            mime_type: None,
        }
    }

    /// Create a stream along with the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }
}

impl Stream for ChannelStream {
    fn use_mime(&mut self, mime_type: &str) {
        self.mime_type = Some(mime_type.to_string());
    }

    fn write(&mut self, bytes: &[u8]) -> cirrus_core::Result<()> {
        let sender = self.sender.as_ref().ok_or_else(|| {
            CoreError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "stream already ended",
            ))
        })?;
        sender
            .send(Bytes::copy_from_slice(bytes))
            .map_err(|_| CoreError::Io(std::io::ErrorKind::BrokenPipe.into()))
    }

    fn end(&mut self) -> cirrus_core::Result<()> {
        self.sender = None;
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePrelude {
    status_code: u16,
    #[serde(default)]
    headers: IndexMap<String, String>,
    #[serde(default)]
    cookies: Vec<String>,
}

fn malformed(err: impl std::fmt::Display) -> CoreError {
    CoreError::Serialization(format!("Invalid stream prelude: {}", err))
}

fn broken_pipe() -> CoreError {
    CoreError::Io(std::io::ErrorKind::BrokenPipe.into())
}

/// Read a JSON prelude back into the runtime's typed metadata.
fn metadata(json: &[u8]) -> cirrus_core::Result<MetadataPrelude> {
    let wire: WirePrelude = serde_json::from_slice(json).map_err(malformed)?;

    let mut prelude = MetadataPrelude::default();
    prelude.status_code = StatusCode::from_u16(wire.status_code).map_err(malformed)?;
    for (name, value) in wire.headers {
        prelude.headers.insert(
            HeaderName::from_bytes(name.as_bytes()).map_err(malformed)?,
            HeaderValue::from_str(&value).map_err(malformed)?,
        );
    }
    prelude.cookies = wire.cookies;
    Ok(prelude)
}

struct Pending {
    buffer: Vec<u8>,
    sender: oneshot::Sender<MetadataPrelude>,
}

/// Stream feeding the Lambda runtime's response streaming API.
///
/// The runtime takes status and headers as typed metadata, so the prelude
/// is parsed back out of the bytes and handed over once complete. Body
/// chunks then pass through a bounded channel.
///
/// Writes block while the channel is full; drive this stream from a
/// blocking thread, never from an async task.
pub struct RuntimeStream {
    pending: Option<Pending>,
    body: Option<mpsc::Sender<Bytes>>,
    mime_type: Option<String>,
}

impl RuntimeStream {
    /// Create a stream along with the receivers of its prelude and body.
    pub fn channel(
        capacity: usize,
    ) -> (
        Self,
        oneshot::Receiver<MetadataPrelude>,
        mpsc::Receiver<Bytes>,
    ) {
        let (prelude_tx, prelude_rx) = oneshot::channel();
        let (body_tx, body_rx) = mpsc::channel(capacity.max(1));
        let stream = Self {
            pending: Some(Pending {
                buffer: Vec::new(),
                sender: prelude_tx,
            }),
            body: Some(body_tx),
            mime_type: None,
        };
        (stream, prelude_rx, body_rx)
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    fn forward(&self, bytes: &[u8]) -> cirrus_core::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let sender = self.body.as_ref().ok_or_else(broken_pipe)?;
        sender
            .blocking_send(Bytes::copy_from_slice(bytes))
            .map_err(|_| broken_pipe())
    }
}

impl Stream for RuntimeStream {
    fn use_mime(&mut self, mime_type: &str) {
        self.mime_type = Some(mime_type.to_string());
    }

    fn write(&mut self, bytes: &[u8]) -> cirrus_core::Result<()> {
        let at = match &mut self.pending {
            None => return self.forward(bytes),
            Some(pending) => {
                pending.buffer.extend_from_slice(bytes);
                match memmem::find(&pending.buffer, &StreamingTo::<Self>::DELIMITER) {
                    Some(at) => at,
                    None => return Ok(()),
                }
            }
        };

        if let Some(Pending { buffer, sender }) = self.pending.take() {
            sender
                .send(metadata(&buffer[..at])?)
                .map_err(|_| broken_pipe())?;
            self.forward(&buffer[at + StreamingTo::<Self>::DELIMITER.len()..])?;
        }
        Ok(())
    }

    fn end(&mut self) -> cirrus_core::Result<()> {
        self.pending = None;
        self.body = None;
        Ok(())
    }
}

/// Stream collecting everything in memory.
#[derive(Debug, Default, Clone)]
pub struct BufferStream {
    bytes: Vec<u8>,
    mime_type: String,
    ended: bool,
}

impl BufferStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn ended(&self) -> bool {
        self.ended
    }

    /// Split the collected bytes into parsed prelude and body.
    pub fn unmarshal(&self) -> Option<(serde_json::Value, &[u8])> {
        let delimiter = &StreamingTo::<Self>::DELIMITER;
        let p = self
            .bytes
            .windows(delimiter.len())
            .position(|window| window == delimiter)?;
        let prelude = serde_json::from_slice(&self.bytes[..p]).ok()?;
        Some((prelude, &self.bytes[p + delimiter.len()..]))
    }
}

impl Stream for BufferStream {
    fn use_mime(&mut self, mime_type: &str) {
        self.mime_type.push_str(mime_type);
    }

    fn write(&mut self, bytes: &[u8]) -> cirrus_core::Result<()> {
        self.bytes.extend_from_slice(bytes);
        Ok(())
    }

    fn end(&mut self) -> cirrus_core::Result<()> {
        self.ended = true;
        Ok(())
    }
}
