//! Per-request trace lines.
//!
//! Every finished exchange produces exactly one line of the form
//!
//! ```text
//! TRACE [<trace id>] <status> <method> <path>[?<query>] <error>
//! ```
//!
//! written synchronously to a [`TraceSink`].

use crate::InvocationContext;
use cirrus_core::{HttpError, Request};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;

/// Target used by [`TracingSink`].
pub const TRACE_TARGET: &str = "cirrus::trace";

/// Destination for trace lines.
pub trait TraceSink: Send + Sync {
    /// Emit one line, without terminator.
    fn emit(&self, line: &str) -> io::Result<()>;
}

/// Sink writing newline-terminated lines to any writer.
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl WriterSink<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send> TraceSink for WriterSink<W> {
    fn emit(&self, line: &str) -> io::Result<()> {
        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

/// Sink handing lines to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TraceSink for TracingSink {
    fn emit(&self, line: &str) -> io::Result<()> {
        tracing::info!(target: TRACE_TARGET, "{}", line);
        Ok(())
    }
}

/// Logs finished exchanges.
#[derive(Clone)]
pub struct Tracing {
    sink: Arc<dyn TraceSink>,
}

impl Tracing {
    pub fn new(sink: Arc<dyn TraceSink>) -> Self {
        Self { sink }
    }

    /// Format the trace line for an exchange.
    pub fn format(req: &Request, status: u16, error: Option<&HttpError>) -> String {
        let trace_id = req
            .value::<InvocationContext>()
            .map(InvocationContext::trace_id)
            .unwrap_or("");
        let resource = match req.query() {
            Some(query) if !query.is_empty() => format!("{}?{}", req.path(), query),
            _ => req.path().to_string(),
        };
        let error = error.map(ToString::to_string).unwrap_or_default();

        format!(
            "TRACE [{}] {} {} {} {}",
            trace_id,
            status,
            req.method(),
            resource,
            error
        )
    }

    /// Emit one trace line. Sink failures are reported, not propagated.
    pub fn log(&self, req: &Request, status: u16, error: Option<&HttpError>) {
        let line = Self::format(req, status, error);
        if let Err(e) = self.sink.emit(&line) {
            tracing::warn!(error = %e, "Failed to write trace line");
        }
    }
}

impl Default for Tracing {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}

impl std::fmt::Debug for Tracing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracing").finish_non_exhaustive()
    }
}
