//! The input and output capabilities an HTTP core is driven through.
//!
//! An invocation adapter implements [`Input`] over whatever the runtime
//! delivered and one [`Output`] per delivery mechanism. The routing layer
//! never sees either directly, it works on [`crate::Request`] and
//! [`crate::Response`].

use crate::{Headers, Parts, Result};
use bytes::Bytes;
use std::io::Cursor;

/// Pull-based access to an inbound HTTP request.
///
/// Reads advance an internal cursor; an input belongs to exactly one
/// invocation and is not meant to be shared.
pub trait Input: Send {
    /// Protocol version, e.g. `1.1`.
    fn version(&self) -> String;

    fn scheme(&self) -> &str;

    fn method(&self) -> &str;

    /// Path plus `?query` when a query is present.
    fn uri(&self) -> String;

    /// Header name/value pairs, produced lazily.
    ///
    /// The returned sequence is finite and meant to be consumed once.
    fn headers(&self) -> Box<dyn Iterator<Item = (String, String)> + '_>;

    /// A reader over the body not consumed yet, or `None` when the request
    /// carries no entity body at all (as opposed to an empty one).
    fn incoming(&self) -> Option<Cursor<Bytes>>;

    /// Next `\n`-terminated segment without its delimiter, `None` once
    /// the body is exhausted.
    fn read_line(&mut self) -> Option<Bytes>;

    /// Up to `length` bytes, or everything remaining for `None`.
    fn read(&mut self, length: Option<usize>) -> Bytes;

    /// Parts of a `multipart/form-data` body delimited by `boundary`.
    fn parts(&mut self, boundary: &str) -> Result<Parts>;
}

/// A response sink.
///
/// `begin` commits status and headers, `write` appends body bytes and
/// `finish` completes the response. Implementations reject writes before
/// `begin` and after `finish`.
pub trait Output: Send {
    fn begin(&mut self, status: u16, message: &str, headers: &Headers) -> Result<()>;

    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    fn finish(&mut self) -> Result<()>;
}
