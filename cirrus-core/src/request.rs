// HTTP request wrapper over an Input

use crate::{Input, Parts, Result};
use bytes::Bytes;
use http::Extensions;
use std::io::Cursor;

/// An inbound request as seen by the routing layer.
///
/// Headers are pulled from the input exactly once, at construction. The
/// body stays with the input and is read on demand.
pub struct Request {
    input: Box<dyn Input>,
    method: String,
    scheme: String,
    version: String,
    path: String,
    query: Option<String>,
    headers: Vec<(String, String)>,
    params: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    values: Extensions,
}

impl Request {
    pub fn new(input: impl Input + 'static) -> Self {
        Self::from_boxed(Box::new(input))
    }

    pub fn from_boxed(input: Box<dyn Input>) -> Self {
        let uri = input.uri();
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (uri, None),
        };
        let params = query
            .as_deref()
            .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
            .unwrap_or_default();

        let headers: Vec<(String, String)> = input.headers().collect();
        let cookies = headers
            .iter()
            .filter(|(name, _)| name.eq_ignore_ascii_case("cookie"))
            .flat_map(|(_, value)| parse_cookies(value))
            .collect();

        Self {
            method: input.method().to_string(),
            scheme: input.scheme().to_string(),
            version: input.version(),
            path,
            query,
            headers,
            params,
            cookies,
            values: Extensions::new(),
            input,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw query string, `None` if the URI had none.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Path plus `?query` when present.
    pub fn uri(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    /// First header value for a name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Decoded query parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn cookies(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Attach a typed value for the routing layer.
    pub fn pass<T: Clone + Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.values.insert(value);
        self
    }

    /// A previously attached value.
    pub fn value<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.values.get::<T>()
    }

    pub fn incoming(&self) -> Option<Cursor<Bytes>> {
        self.input.incoming()
    }

    pub fn read_line(&mut self) -> Option<Bytes> {
        self.input.read_line()
    }

    pub fn read(&mut self, length: usize) -> Bytes {
        self.input.read(Some(length))
    }

    /// Everything left of the body.
    pub fn read_body(&mut self) -> Bytes {
        self.input.read(None)
    }

    pub fn parts(&mut self, boundary: &str) -> Result<Parts> {
        self.input.parts(boundary)
    }

    pub fn input(&self) -> &dyn Input {
        self.input.as_ref()
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("uri", &self.uri())
            .field("headers", &self.headers)
            .finish()
    }
}

fn parse_cookies(header: &str) -> impl Iterator<Item = (String, String)> + '_ {
    header.split(';').filter_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        Some((name.trim().to_string(), value.trim().to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct TestInput {
        uri: &'static str,
        headers: Vec<(&'static str, &'static str)>,
        body: Bytes,
    }

    impl Input for TestInput {
        fn version(&self) -> String {
            "1.1".to_string()
        }

        fn scheme(&self) -> &str {
            "http"
        }

        fn method(&self) -> &str {
            "POST"
        }

        fn uri(&self) -> String {
            self.uri.to_string()
        }

        fn headers(&self) -> Box<dyn Iterator<Item = (String, String)> + '_> {
            Box::new(
                self.headers
                    .iter()
                    .map(|(n, v)| (n.to_string(), v.to_string())),
            )
        }

        fn incoming(&self) -> Option<Cursor<Bytes>> {
            Some(Cursor::new(self.body.clone()))
        }

        fn read_line(&mut self) -> Option<Bytes> {
            None
        }

        fn read(&mut self, length: Option<usize>) -> Bytes {
            let n = length.unwrap_or(self.body.len()).min(self.body.len());
            self.body.split_to(n)
        }

        fn parts(&mut self, _boundary: &str) -> Result<Parts> {
            Err(Error::Multipart("unsupported".to_string()))
        }
    }

    fn request(uri: &'static str, headers: Vec<(&'static str, &'static str)>) -> Request {
        Request::new(TestInput {
            uri,
            headers,
            body: Bytes::from_static(b"Test body"),
        })
    }

    #[derive(Clone, Debug, PartialEq)]
    struct TraceId(&'static str);

    #[test]
    fn test_uri_split() {
        let req = request("/users?name=Test&lang=de%20CH", vec![]);
        assert_eq!(req.path(), "/users");
        assert_eq!(req.query(), Some("name=Test&lang=de%20CH"));
        assert_eq!(req.param("name"), Some("Test"));
        assert_eq!(req.param("lang"), Some("de CH"));
        assert_eq!(req.param("missing"), None);
        assert_eq!(req.uri(), "/users?name=Test&lang=de%20CH");
    }

    #[test]
    fn test_without_query() {
        let req = request("/users", vec![]);
        assert_eq!(req.query(), None);
        assert_eq!(req.uri(), "/users");
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let req = request("/", vec![("Accept", "*/*"), ("user-agent", "test")]);
        assert_eq!(req.header("accept"), Some("*/*"));
        assert_eq!(req.header("User-Agent"), Some("test"));
        assert_eq!(req.header("Host"), None);
    }

    #[test]
    fn test_cookies() {
        let req = request("/", vec![("cookie", "session=6317aaa1de197746d20fadc1; lang=en")]);
        assert_eq!(req.cookie("session"), Some("6317aaa1de197746d20fadc1"));
        assert_eq!(req.cookie("lang"), Some("en"));
        assert_eq!(req.cookies().count(), 2);
    }

    #[test]
    fn test_values() {
        let mut req = request("/", vec![]);
        assert_eq!(req.value::<TraceId>(), None);

        req.pass(TraceId("Root=1-test"));
        assert_eq!(req.value::<TraceId>(), Some(&TraceId("Root=1-test")));
    }

    #[test]
    fn test_body_reads() {
        let mut req = request("/", vec![]);
        assert_eq!(req.read(4), Bytes::from_static(b"Test"));
        assert_eq!(req.read_body(), Bytes::from_static(b" body"));
        assert!(req.read_body().is_empty());
    }
}
