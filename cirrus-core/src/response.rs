// HTTP response wrapper over an Output

use crate::{Cookie, Error, Headers, HttpStatus, Output, Result};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pending,
    Committed,
    Ended,
}

/// An outbound response as seen by the routing layer.
///
/// Status and headers are buffered until the first body write (or an
/// explicit [`flush`](Response::flush)) commits them to the output.
pub struct Response<'a> {
    output: &'a mut dyn Output,
    status: u16,
    message: String,
    headers: Headers,
    state: State,
}

impl<'a> Response<'a> {
    pub fn new(output: &'a mut dyn Output) -> Self {
        Self {
            output,
            status: HttpStatus::OK.code(),
            message: HttpStatus::OK.reason().to_string(),
            headers: Headers::new(),
            state: State::Pending,
        }
    }

    /// Set the status, using its reason phrase as message.
    pub fn answer(&mut self, status: u16) -> &mut Self {
        self.answer_with(status, HttpStatus::new(status).reason())
    }

    pub fn answer_with(&mut self, status: u16, message: impl Into<String>) -> &mut Self {
        if self.state != State::Pending {
            warn!(status, "Status set after headers were sent, ignoring");
            return self;
        }
        self.status = status;
        self.message = message.into();
        self
    }

    /// Set a header, replacing previous values.
    pub fn header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        if self.accepts_headers() {
            self.headers.set(name, value);
        }
        self
    }

    /// Add a header value, keeping previous ones.
    pub fn append_header(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        if self.accepts_headers() {
            self.headers.append(name, value);
        }
        self
    }

    pub fn cookie(&mut self, cookie: Cookie) -> &mut Self {
        self.append_header("Set-Cookie", cookie.to_string())
    }

    fn accepts_headers(&self) -> bool {
        if self.state != State::Pending {
            warn!("Header set after headers were sent, ignoring");
            return false;
        }
        true
    }

    /// Drop all headers set so far. Fails once they have been sent.
    pub fn reset(&mut self) -> Result<()> {
        if self.state != State::Pending {
            return Err(Error::State("Cannot reset a committed response".to_string()));
        }
        self.headers.clear();
        Ok(())
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Whether status and headers have been handed to the output.
    pub fn committed(&self) -> bool {
        self.state != State::Pending
    }

    /// Commit status and headers.
    pub fn flush(&mut self) -> Result<()> {
        if self.state == State::Pending {
            self.output.begin(self.status, &self.message, &self.headers)?;
            self.state = State::Committed;
        }
        Ok(())
    }

    /// Write body bytes, committing headers first if necessary.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.flush()?;
        self.output.write(bytes)
    }

    /// Send a complete body of the given type and end the response.
    pub fn send(&mut self, body: impl AsRef<[u8]>, mime_type: &str) -> Result<()> {
        let body = body.as_ref();
        self.header("Content-Type", mime_type);
        self.header("Content-Length", body.len().to_string());
        self.write(body)?;
        self.end()
    }

    /// End the response. A response ended without a body announces an
    /// empty one.
    pub fn end(&mut self) -> Result<()> {
        match self.state {
            State::Ended => return Ok(()),
            State::Pending => {
                if !self.headers.contains("Content-Length") {
                    self.headers.set("Content-Length", "0");
                }
                self.flush()?;
            }
            State::Committed => {}
        }
        self.state = State::Ended;
        self.output.finish()
    }
}

impl std::fmt::Debug for Response<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("message", &self.message)
            .field("headers", &self.headers)
            .field("state", &self.state)
            .finish()
    }
}
