//! Buffered Lambda responses.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use cirrus_core::{Error as CoreError, Headers, HttpError, Output};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Header carrying the error kind on error responses.
pub const ERROR_TYPE_HEADER: &str = "x-amzn-ErrorType";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum State {
    #[default]
    Unopened,
    Open,
    Writing,
    Finished,
}

/// Returns whether a MIME type can be passed through as text: anything
/// under `text/`, JSON and XML, including vendor `+json` / `+xml` types.
/// Parameters such as `charset=utf-8` are allowed.
pub fn is_text(mime: &str) -> bool {
    if mime.starts_with("text/")
        || mime.starts_with("application/xml")
        || mime.starts_with("application/json")
    {
        return true;
    }
    if !mime.starts_with("application/") {
        return false;
    }

    let essence = mime.split(';').next().unwrap_or(mime).trim_end();
    essence.ends_with("+json") || essence.ends_with("+xml")
}

/// A response collected in memory and returned to the runtime as one JSON
/// document.
///
/// Textual bodies are passed through as-is, everything else (including
/// content-encoded bodies) is base64-encoded on [`finish`](Output::finish).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDocument {
    pub status_code: u16,
    pub status_description: String,
    pub is_base64_encoded: bool,
    pub headers: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Vec<String>>,
    #[serde(default)]
    pub body: Option<String>,

    #[serde(skip)]
    buffer: Vec<u8>,
    #[serde(skip)]
    state: State,
}

impl ResponseDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Document describing an error, independent of any response in flight.
    pub fn error(err: &HttpError) -> Self {
        let mut headers = IndexMap::new();
        headers.insert("Content-Type".to_string(), "text/plain".to_string());
        headers.insert(ERROR_TYPE_HEADER.to_string(), err.kind().to_string());

        Self {
            status_code: err.status_code(),
            status_description: err.message().to_string(),
            is_base64_encoded: false,
            headers,
            cookies: None,
            body: Some(err.compound_message()),
            buffer: Vec::new(),
            state: State::Finished,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Convert into the value handed back to the runtime.
    pub fn into_value(self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    fn set_header(&mut self, name: &str, value: String) {
        let existing = self
            .headers
            .keys()
            .find(|n| n.eq_ignore_ascii_case(name))
            .cloned();
        self.headers
            .insert(existing.unwrap_or_else(|| name.to_string()), value);
    }
}

impl Output for ResponseDocument {
    fn begin(&mut self, status: u16, message: &str, headers: &Headers) -> cirrus_core::Result<()> {
        if self.state != State::Unopened {
            return Err(CoreError::State("Response already begun".to_string()));
        }

        self.status_code = status;
        self.status_description = message.to_string();
        self.is_base64_encoded = match headers.get("Content-Type") {
            None => false,
            Some(mime) => headers.contains("Content-Encoding") || !is_text(mime),
        };

        self.headers.clear();
        self.cookies = None;
        for (name, values) in headers.iter() {
            if name.eq_ignore_ascii_case("Set-Cookie") {
                self.cookies = Some(values.to_vec());
            } else if let Some(first) = values.first() {
                self.headers.insert(name.to_string(), first.clone());
            }
        }

        self.state = State::Open;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> cirrus_core::Result<()> {
        match self.state {
            State::Open | State::Writing => {
                self.buffer.extend_from_slice(bytes);
                self.state = State::Writing;
                Ok(())
            }
            State::Unopened => Err(CoreError::State("Write before begin".to_string())),
            State::Finished => Err(CoreError::State("Write after finish".to_string())),
        }
    }

    fn finish(&mut self) -> cirrus_core::Result<()> {
        match self.state {
            State::Finished => return Ok(()),
            State::Writing => {}
            State::Unopened | State::Open => {
                self.state = State::Finished;
                return Ok(());
            }
        }

        let bytes = std::mem::take(&mut self.buffer);
        self.set_header("Content-Length", bytes.len().to_string());

        // Bodies declared textual but not valid UTF-8 cannot travel as JSON strings
        let body = if self.is_base64_encoded {
            STANDARD.encode(&bytes)
        } else {
            match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(err) => {
                    self.is_base64_encoded = true;
                    STANDARD.encode(err.as_bytes())
                }
            }
        };
        self.body = Some(body);
        self.state = State::Finished;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        pairs.iter().map(|&(n, v)| (n, v)).collect()
    }

    fn render(pairs: &[(&str, &str)], body: &[u8]) -> serde_json::Value {
        let mut out = ResponseDocument::new();
        out.begin(200, "OK", &headers(pairs)).unwrap();
        out.write(body).unwrap();
        out.finish().unwrap();
        out.into_value().unwrap()
    }

    #[test]
    fn test_no_content() {
        let mut out = ResponseDocument::new();
        out.begin(204, "No Content", &Headers::new()).unwrap();
        out.finish().unwrap();

        assert_eq!(
            out.into_value().unwrap(),
            json!({
                "statusCode": 204,
                "statusDescription": "No Content",
                "isBase64Encoded": false,
                "headers": {},
                "body": null
            })
        );
    }

    #[test]
    fn test_with_content() {
        assert_eq!(
            render(&[], b"Test"),
            json!({
                "statusCode": 200,
                "statusDescription": "OK",
                "isBase64Encoded": false,
                "headers": {"Content-Length": "4"},
                "body": "Test"
            })
        );
    }

    #[test]
    fn test_with_text_content() {
        for mime in ["text/plain", "text/html", "text/plain; charset=utf-8"] {
            assert_eq!(
                render(&[("Content-Type", mime)], b"Test"),
                json!({
                    "statusCode": 200,
                    "statusDescription": "OK",
                    "isBase64Encoded": false,
                    "headers": {"Content-Type": mime, "Content-Length": "4"},
                    "body": "Test"
                }),
                "{}",
                mime
            );
        }
    }

    #[test]
    fn test_with_json_content() {
        for mime in [
            "application/json",
            "application/json; charset=utf-8",
            "application/vnd.example.test-v2+json",
            "application/vnd.example.test-v2+json; charset=utf-8",
        ] {
            let doc = render(&[("Content-Type", mime)], br#"{"key":"value"}"#);
            assert_eq!(doc["isBase64Encoded"], json!(false), "{}", mime);
            assert_eq!(doc["headers"]["Content-Length"], json!("15"));
            assert_eq!(doc["body"], json!(r#"{"key":"value"}"#));
        }
    }

    #[test]
    fn test_with_binary_content() {
        assert_eq!(
            render(&[("Content-Type", "image/gif")], b"GIF89a..."),
            json!({
                "statusCode": 200,
                "statusDescription": "OK",
                "isBase64Encoded": true,
                "headers": {"Content-Type": "image/gif", "Content-Length": "9"},
                "body": "R0lGODlhLi4u"
            })
        );
    }

    #[test]
    fn test_with_gzipped_content() {
        let gzipped = b"x\x9c\x0bI-.\x01\x00\x03\xdd\x01\xa1";
        assert_eq!(
            render(
                &[("Content-Type", "text/plain"), ("Content-Encoding", "gzip")],
                gzipped
            ),
            json!({
                "statusCode": 200,
                "statusDescription": "OK",
                "isBase64Encoded": true,
                "headers": {
                    "Content-Type": "text/plain",
                    "Content-Encoding": "gzip",
                    "Content-Length": "12"
                },
                "body": "eJwLSS0uAQAD3QGh"
            })
        );
    }

    #[test]
    fn test_chunked_writes_concatenate() {
        let mut out = ResponseDocument::new();
        out.begin(200, "OK", &Headers::new()).unwrap();
        out.write(b"Hello").unwrap();
        out.write(b" ").unwrap();
        out.write(b"Test").unwrap();
        out.finish().unwrap();

        assert_eq!(out.body.as_deref(), Some("Hello Test"));
        assert_eq!(out.headers["Content-Length"], "10");
    }

    #[test]
    fn test_cookies() {
        let mut given = headers(&[("Content-Type", "text/plain")]);
        given.append("Set-Cookie", "session=0x6100; SameSite=Lax; HttpOnly");
        given.append("Set-Cookie", "lang=de; SameSite=Lax; HttpOnly");

        let mut out = ResponseDocument::new();
        out.begin(200, "OK", &given).unwrap();
        out.finish().unwrap();

        assert_eq!(
            out.cookies.as_deref(),
            Some(
                &[
                    "session=0x6100; SameSite=Lax; HttpOnly".to_string(),
                    "lang=de; SameSite=Lax; HttpOnly".to_string()
                ][..]
            )
        );
        assert!(!out.headers.contains_key("Set-Cookie"));
    }

    #[test]
    fn test_first_header_value_wins() {
        let mut given = Headers::new();
        given.append("Vary", "Accept");
        given.append("Vary", "Accept-Encoding");

        let mut out = ResponseDocument::new();
        out.begin(200, "OK", &given).unwrap();
        assert_eq!(out.headers["Vary"], "Accept");
    }

    #[test]
    fn test_content_length_reports_unencoded_size() {
        let mut out = ResponseDocument::new();
        out.begin(200, "OK", &headers(&[("Content-Length", "3"), ("Content-Type", "image/gif")]))
            .unwrap();
        out.write(b"GIF89a...").unwrap();
        out.finish().unwrap();

        assert_eq!(out.headers.len(), 2);
        assert_eq!(out.headers["Content-Length"], "9");
    }

    #[test]
    fn test_invalid_utf8_text_falls_back_to_base64() {
        let doc = render(&[("Content-Type", "text/plain")], b"\xff\xfe");
        assert_eq!(doc["isBase64Encoded"], json!(true));
        assert_eq!(doc["body"], json!("//4="));
    }

    #[test]
    fn test_write_before_begin() {
        let mut out = ResponseDocument::new();
        assert!(matches!(out.write(b"Test"), Err(CoreError::State(_))));
    }

    #[test]
    fn test_write_after_finish() {
        let mut out = ResponseDocument::new();
        out.begin(200, "OK", &Headers::new()).unwrap();
        out.finish().unwrap();
        assert!(matches!(out.write(b"Test"), Err(CoreError::State(_))));
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut out = ResponseDocument::new();
        out.begin(200, "OK", &headers(&[("Content-Type", "image/gif")])).unwrap();
        out.write(b"GIF89a...").unwrap();
        out.finish().unwrap();
        out.finish().unwrap();

        assert!(out.is_finished());
        assert_eq!(out.body.as_deref(), Some("R0lGODlhLi4u"));
    }

    #[test]
    fn test_error() {
        let doc = ResponseDocument::error(&HttpError::not_found());
        assert_eq!(
            doc.into_value().unwrap(),
            json!({
                "statusCode": 404,
                "statusDescription": "Not Found",
                "isBase64Encoded": false,
                "headers": {"Content-Type": "text/plain", "x-amzn-ErrorType": "HttpError"},
                "body": "Error HttpError(#404: Not Found)"
            })
        );
    }

    #[test]
    fn test_internal_error_with_causes() {
        let err = HttpError::internal(anyhow::anyhow!("disk full").context("Cannot save"));
        let doc = ResponseDocument::error(&err);

        assert_eq!(doc.status_code, 500);
        assert_eq!(doc.headers[ERROR_TYPE_HEADER], "InternalServerError");
        assert_eq!(
            doc.body.as_deref(),
            Some("Error InternalServerError(#500: Cannot save)\nCaused by: disk full")
        );
    }

    #[test]
    fn test_is_text() {
        assert!(is_text("text/csv"));
        assert!(is_text("application/xml"));
        assert!(is_text("application/atom+xml"));
        assert!(is_text("application/problem+json ; charset=utf-8"));
        assert!(!is_text("application/octet-stream"));
        assert!(!is_text("image/svg+xml"));
        assert!(!is_text("application/pdf"));
    }

    #[test]
    fn test_round_trips_through_json() {
        let json = r#"{"statusCode":200,"statusDescription":"OK","isBase64Encoded":false,"headers":{"Content-Length":"4"},"body":"Test"}"#;
        let doc: ResponseDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.status_code, 200);
        assert_eq!(doc.to_json().unwrap(), json);
    }
}
