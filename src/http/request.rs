use std::collections::BTreeMap;

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::http::message::{ContentEncoding, Headers, Version};

/// Bytes that must be escaped when a path is rebuilt into a URL.
const PATH_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// HTTP request methods.
///
/// `TRACE` and `CONNECT` are parsed like everything else; whether they are
/// acceptable is the security validator's call. Anything the parser does not
/// recognize becomes `UNKNOWN` and is rejected downstream rather than at the
/// wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
    TRACE,
    CONNECT,
    UNKNOWN,
}

impl Method {
    /// Parses a method token, case-insensitively.
    ///
    /// # Example
    ///
    /// ```
    /// # use keystone::http::request::Method;
    /// assert_eq!(Method::from_token("GET"), Method::GET);
    /// assert_eq!(Method::from_token("get"), Method::GET);
    /// assert_eq!(Method::from_token("BREW"), Method::UNKNOWN);
    /// ```
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "PATCH" => Method::PATCH,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            "TRACE" => Method::TRACE,
            "CONNECT" => Method::CONNECT,
            _ => Method::UNKNOWN,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::PATCH => "PATCH",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::TRACE => "TRACE",
            Method::CONNECT => "CONNECT",
            Method::UNKNOWN => "UNKNOWN",
        }
    }
}

/// A parsed HTTP request.
///
/// The raw `url`, the decoded `path` and the `query_params` map are kept
/// consistent with each other: setting the URL re-derives path and query,
/// and mutating either of those rebuilds the URL. That is why the three are
/// private behind accessors while the independent fields stay public.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub version: Version,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub content_encoding: ContentEncoding,

    url: String,
    path: String,
    query_params: BTreeMap<String, Vec<String>>,
}

impl Request {
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            version: Version::Http11,
            headers: Headers::new(),
            body: Vec::new(),
            content_encoding: ContentEncoding::Identity,
            url: "/".to_string(),
            path: "/".to_string(),
            query_params: BTreeMap::new(),
        }
    }

    /// The request target exactly as it appeared on the wire.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The percent-decoded path component, query stripped.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters; a repeated key keeps every value in order.
    pub fn query_params(&self) -> &BTreeMap<String, Vec<String>> {
        &self.query_params
    }

    /// First value for a query key.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query_params
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Every value for a query key.
    pub fn query_values(&self, key: &str) -> &[String] {
        self.query_params.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sets the raw URL and re-derives `path` and `query_params` from it.
    pub fn set_url(&mut self, url: &str) {
        self.url = if url.is_empty() { "/".to_string() } else { url.to_string() };

        let (raw_path, raw_query) = match self.url.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (self.url.as_str(), None),
        };

        self.path = percent_decode_str(raw_path).decode_utf8_lossy().into_owned();
        if self.path.is_empty() {
            self.path = "/".to_string();
        }

        self.query_params.clear();
        if let Some(query) = raw_query {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                self.query_params
                    .entry(key.into_owned())
                    .or_default()
                    .push(value.into_owned());
            }
        }
    }

    /// Replaces the path and rebuilds the URL from it and the query map.
    pub fn set_path(&mut self, path: &str) {
        self.path = if path.is_empty() { "/".to_string() } else { path.to_string() };
        self.rebuild_url();
    }

    /// Adds one query value and rebuilds the URL.
    pub fn add_query_param(&mut self, key: &str, value: &str) {
        self.query_params
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
        self.rebuild_url();
    }

    fn rebuild_url(&mut self) {
        let mut url = utf8_percent_encode(&self.path, PATH_ESCAPE).to_string();
        if !self.query_params.is_empty() {
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for (key, values) in &self.query_params {
                for value in values {
                    serializer.append_pair(key, value);
                }
            }
            url.push('?');
            url.push_str(&serializer.finish());
        }
        self.url = url;
    }

    /// Whether the connection should stay open after this request, from the
    /// `Connection` header with the version default (HTTP/1.1 keeps alive,
    /// HTTP/1.0 closes).
    pub fn keep_alive(&self) -> bool {
        match self.headers.get("Connection") {
            Some(value) => value.eq_ignore_ascii_case("keep-alive"),
            None => self.version == Version::Http11,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64 + self.body.len());
        out.extend_from_slice(self.method.as_str().as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.url.as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.version.as_str().as_bytes());
        out.extend_from_slice(b"\r\n");
        self.headers.write_to(&mut out);
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}
