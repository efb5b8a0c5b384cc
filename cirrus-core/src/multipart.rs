//! Multipart form data, as handed out by a pluggable parser.

use crate::Result;
use bytes::Bytes;
use std::fmt;

/// One part of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// An uploaded file.
    File {
        name: String,
        filename: String,
        content_type: String,
        bytes: Bytes,
    },
    /// A plain form value.
    Param { name: String, value: String },
    /// A part the parser could not make sense of.
    Incomplete { name: String, reason: String },
}

impl Part {
    pub fn name(&self) -> &str {
        match self {
            Part::File { name, .. } | Part::Param { name, .. } | Part::Incomplete { name, .. } => {
                name
            }
        }
    }
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Part::File {
                name,
                filename,
                content_type,
                bytes,
            } => write!(
                f,
                "File({}: {} [{}], {} bytes)",
                name,
                filename,
                content_type,
                bytes.len()
            ),
            Part::Param { name, value } => write!(f, "Param({}={})", name, value),
            Part::Incomplete { name, reason } => write!(f, "Incomplete({}: {})", name, reason),
        }
    }
}

/// Sequence of parts produced by a [`MultipartParser`].
pub type Parts = Box<dyn Iterator<Item = Part> + Send>;

/// Splits a body into parts.
///
/// Parsing itself lives outside this crate; adapters only hand the
/// materialized body and the boundary token over.
pub trait MultipartParser: Send + Sync {
    fn parse(&self, body: Bytes, boundary: &str) -> Result<Parts>;
}
