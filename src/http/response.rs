use crate::http::message::{ContentEncoding, Headers, Version};
use crate::http::request::Method;

/// Default reason phrase for a status code, per the IANA registry. Unknown
/// codes get `"Unknown"` so a response always has a printable status line.
pub fn default_reason(code: u16) -> &'static str {
    match code {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        408 => "Request Timeout",
        409 => "Conflict",
        411 => "Length Required",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        426 => "Upgrade Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => "Unknown",
    }
}

/// A parsed or application-built HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub version: Version,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub content_encoding: ContentEncoding,

    status_code: u16,
    status_reason: String,
}

impl Response {
    /// A fresh `200 OK` response with no headers or body.
    pub fn new() -> Self {
        Self {
            version: Version::Http11,
            headers: Headers::new(),
            body: Vec::new(),
            content_encoding: ContentEncoding::Identity,
            status_code: 200,
            status_reason: default_reason(200).to_string(),
        }
    }

    pub fn with_status(code: u16) -> Self {
        let mut resp = Self::new();
        resp.set_status(code);
        resp
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn status_reason(&self) -> &str {
        &self.status_reason
    }

    /// Sets the status code, refreshing the reason from the default table.
    pub fn set_status(&mut self, code: u16) {
        self.status_code = code;
        self.status_reason = default_reason(code).to_string();
    }

    /// Sets the status with an explicit reason phrase; an empty reason falls
    /// back to the default table.
    pub fn set_status_with_reason(&mut self, code: u16, reason: &str) {
        self.status_code = code;
        self.status_reason = if reason.is_empty() {
            default_reason(code).to_string()
        } else {
            reason.to_string()
        };
    }

    /// Creates a `200 OK` response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        let mut resp = Self::new();
        resp.body = body.into();
        resp
    }

    /// Creates a `400 Bad Request` response with a short text body.
    pub fn bad_request() -> Self {
        let mut resp = Self::with_status(400);
        resp.body = b"400 Bad Request".to_vec();
        resp
    }

    /// Creates a `403 Forbidden` response.
    pub fn forbidden() -> Self {
        let mut resp = Self::with_status(403);
        resp.body = b"403 Forbidden".to_vec();
        resp
    }

    /// Creates a `404 Not Found` response with a generic body.
    pub fn not_found() -> Self {
        let mut resp = Self::with_status(404);
        resp.body = b"404 Not Found".to_vec();
        resp
    }

    /// Creates a `405 Method Not Allowed` response whose `Allow` header
    /// enumerates the methods the path supports.
    pub fn method_not_allowed(allowed: &[Method]) -> Self {
        let mut resp = Self::with_status(405);
        let allow = allowed
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        resp.headers.set("Allow", &allow);
        resp.body = b"405 Method Not Allowed".to_vec();
        resp
    }

    /// Creates a `500 Internal Server Error` response.
    pub fn internal_error() -> Self {
        let mut resp = Self::with_status(500);
        resp.body = b"500 Internal Server Error".to_vec();
        resp
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + self.body.len());
        out.extend_from_slice(self.version.as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.status_code.to_string().as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.status_reason.as_bytes());
        out.extend_from_slice(b"\r\n");
        self.headers.write_to(&mut out);
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}
