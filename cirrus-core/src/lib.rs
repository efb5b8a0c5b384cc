//! # Cirrus Core
//!
//! The boundary between an invocation adapter and an HTTP-processing core.
//!
//! Adapters implement [`Input`] for the inbound side and one [`Output`] per
//! response delivery mechanism. Routing code works on [`Request`] and
//! [`Response`], which wrap those capabilities, and signals failures with
//! [`HttpError`].
//!
//! ```rust
//! use cirrus_core::{Headers, Output, Response, Result};
//!
//! #[derive(Default)]
//! struct Collect(Vec<u8>);
//!
//! impl Output for Collect {
//!     fn begin(&mut self, _status: u16, _message: &str, _headers: &Headers) -> Result<()> {
//!         Ok(())
//!     }
//!     fn write(&mut self, bytes: &[u8]) -> Result<()> {
//!         self.0.extend_from_slice(bytes);
//!         Ok(())
//!     }
//!     fn finish(&mut self) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! let mut out = Collect::default();
//! let mut res = Response::new(&mut out);
//! res.send("Hello", "text/plain").unwrap();
//! assert_eq!(out.0, b"Hello");
//! ```

pub mod cookie;
pub mod error;
pub mod headers;
pub mod io;
pub mod multipart;
pub mod request;
pub mod response;
pub mod status;

pub use cookie::{Cookie, SameSite};
pub use error::{Error, HttpError, Result, HTTP_ERROR, INTERNAL_SERVER_ERROR};
pub use headers::Headers;
pub use io::{Input, Output};
pub use multipart::{MultipartParser, Part, Parts};
pub use request::Request;
pub use response::Response;
pub use status::HttpStatus;
