use std::collections::HashMap;

use crate::http::request::Request;
use crate::http::response::Response;

/// HTTP protocol versions.
///
/// The parser only ever produces `Http10` and `Http11`; the 2.x/3.x variants
/// exist so a recognized-but-unsupported version token can be named in
/// diagnostics instead of being silently misparsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    /// HTTP/1.0
    Http10,
    /// HTTP/1.1
    Http11,
    /// HTTP/2 (recognized, never parsed)
    H2,
    /// HTTP/3 (recognized, never parsed)
    H3,
}

impl Version {
    /// Returns the wire representation of the version token.
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
            Version::H2 => "HTTP/2",
            Version::H3 => "HTTP/3",
        }
    }

    /// Parses a version token as it appears in a start line.
    ///
    /// # Example
    ///
    /// ```
    /// # use keystone::http::message::Version;
    /// assert_eq!(Version::from_token("HTTP/1.1"), Some(Version::Http11));
    /// assert_eq!(Version::from_token("HTTP/9.9"), None);
    /// ```
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "HTTP/1.0" => Some(Version::Http10),
            "HTTP/1.1" => Some(Version::Http11),
            "HTTP/2" | "HTTP/2.0" => Some(Version::H2),
            "HTTP/3" | "HTTP/3.0" => Some(Version::H3),
            _ => None,
        }
    }
}

/// Content codings a message can declare via `Content-Encoding`.
///
/// The coding is recorded so the application can see what it was handed;
/// decoding the body is not this crate's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentEncoding {
    #[default]
    Identity,
    Gzip,
    Deflate,
    Br,
    Zstd,
}

impl ContentEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentEncoding::Identity => "identity",
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Deflate => "deflate",
            ContentEncoding::Br => "br",
            ContentEncoding::Zstd => "zstd",
        }
    }

    /// Maps a `Content-Encoding` header value to a coding. Unrecognized
    /// values fall back to `Identity`.
    pub fn from_header_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "gzip" => ContentEncoding::Gzip,
            "deflate" => ContentEncoding::Deflate,
            "br" => ContentEncoding::Br,
            "zstd" => ContentEncoding::Zstd,
            _ => ContentEncoding::Identity,
        }
    }
}

/// Canonicalizes a header name: the first letter of each dash-separated
/// segment is uppercased, the rest lowercased (`content-type` →
/// `Content-Type`).
pub fn canonicalize_header_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut at_segment_start = true;
    for ch in name.chars() {
        if ch == '-' {
            out.push('-');
            at_segment_start = true;
        } else if at_segment_start {
            out.extend(ch.to_uppercase());
            at_segment_start = false;
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

/// An ordered header collection with case-insensitive lookup.
///
/// Insertion order is preserved so a message re-serializes faithfully, while
/// a name → positions index makes lookups cheap. Names are canonicalized on
/// every write, so reads are a plain index probe. Duplicate names are legal
/// (`Set-Cookie` repeats); `set` replaces, `append` accumulates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Headers {
    entries: Vec<(String, String)>,
    index: HashMap<String, Vec<usize>>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every entry with this name by a single entry.
    pub fn set(&mut self, name: &str, value: &str) {
        let name = canonicalize_header_name(name);
        // Removal shifts positions, so the whole index is rebuilt afterwards.
        self.entries.retain(|(n, _)| *n != name);
        self.entries.push((name, value.to_string()));
        self.rebuild_index();
    }

    /// Appends an entry without touching existing ones with the same name.
    pub fn append(&mut self, name: &str, value: &str) {
        let name = canonicalize_header_name(name);
        self.entries.push((name.clone(), value.to_string()));
        self.index.entry(name).or_default().push(self.entries.len() - 1);
    }

    /// Returns the first value for this name, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = canonicalize_header_name(name);
        self.index
            .get(&name)
            .and_then(|positions| positions.first())
            .map(|&i| self.entries[i].1.as_str())
    }

    /// Returns every value for this name, in insertion order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        let name = canonicalize_header_name(name);
        self.index
            .get(&name)
            .map(|positions| positions.iter().map(|&i| self.entries[i].1.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&canonicalize_header_name(name))
    }

    /// Drops every entry with this name.
    pub fn remove(&mut self, name: &str) {
        let name = canonicalize_header_name(name);
        self.entries.retain(|(n, _)| *n != name);
        self.rebuild_index();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, (name, _)) in self.entries.iter().enumerate() {
            self.index.entry(name.clone()).or_default().push(i);
        }
    }

    /// Serializes the header block, one `Name: value` line per entry.
    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        for (name, value) in self.iter() {
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
    }
}

/// A parsed HTTP message: either a request or a response.
///
/// The two variants share their header, body, version and content-coding
/// handling; the common operations below delegate to the shared fields so
/// callers that only care about "a message" never match on the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    pub fn version(&self) -> Version {
        match self {
            Message::Request(r) => r.version,
            Message::Response(r) => r.version,
        }
    }

    pub fn headers(&self) -> &Headers {
        match self {
            Message::Request(r) => &r.headers,
            Message::Response(r) => &r.headers,
        }
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        match self {
            Message::Request(r) => &mut r.headers,
            Message::Response(r) => &mut r.headers,
        }
    }

    pub fn body(&self) -> &[u8] {
        match self {
            Message::Request(r) => &r.body,
            Message::Response(r) => &r.body,
        }
    }

    pub fn body_len(&self) -> usize {
        self.body().len()
    }

    /// Appends raw bytes to the body accumulator.
    pub fn append_body_chunk(&mut self, chunk: &[u8]) {
        match self {
            Message::Request(r) => r.body.extend_from_slice(chunk),
            Message::Response(r) => r.body.extend_from_slice(chunk),
        }
    }

    pub fn content_encoding(&self) -> ContentEncoding {
        match self {
            Message::Request(r) => r.content_encoding,
            Message::Response(r) => r.content_encoding,
        }
    }

    pub fn set_content_encoding(&mut self, encoding: ContentEncoding) {
        match self {
            Message::Request(r) => r.content_encoding = encoding,
            Message::Response(r) => r.content_encoding = encoding,
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self, Message::Request(_))
    }

    pub fn as_request(&self) -> Option<&Request> {
        match self {
            Message::Request(r) => Some(r),
            Message::Response(_) => None,
        }
    }

    pub fn as_response(&self) -> Option<&Response> {
        match self {
            Message::Request(_) => None,
            Message::Response(r) => Some(r),
        }
    }

    /// Serializes the full message: start line, headers in insertion order,
    /// blank line, body.
    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Message::Request(r) => r.serialize(),
            Message::Response(r) => r.serialize(),
        }
    }
}
