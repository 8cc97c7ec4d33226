//! Message validation.
//!
//! A parsed message passes through an ordered chain of independent
//! validators before it is routed. Each validator either accepts the message
//! or vetoes it; the first veto stops the chain. Only the orchestrator learns
//! *which* validator rejected (for its observers); everything downstream
//! sees a bare "validation failed".

use crate::config::SecurityConfig;
use crate::http::message::{Message, Version};
use crate::http::request::{Method, Request};

/// One stateless check in the chain.
pub trait Validator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns `false` to reject the message.
    fn validate(&self, message: &Message) -> bool;
}

/// An ordered sequence of validators, run until the first rejection.
#[derive(Default)]
pub struct ValidationChain {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidationChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default chain: protocol conformance first, then security policy.
    pub fn with_defaults(security: &SecurityConfig) -> Self {
        let mut chain = Self::new();
        chain.push(Box::new(ProtocolValidator));
        chain.push(Box::new(SecurityValidator::from_config(security)));
        chain
    }

    pub fn push(&mut self, validator: Box<dyn Validator>) {
        self.validators.push(validator);
    }

    /// Runs the chain; `Err` names the rejecting validator.
    pub fn run(&self, message: &Message) -> Result<(), &'static str> {
        for validator in &self.validators {
            if !validator.validate(message) {
                return Err(validator.name());
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

/// Protocol conformance checks that apply to any well-formed HTTP/1.x
/// exchange: framing-header consistency, mandatory Host on 1.1 requests,
/// a recognizable method and a non-empty path.
pub struct ProtocolValidator;

impl Validator for ProtocolValidator {
    fn name(&self) -> &'static str {
        "protocol"
    }

    fn validate(&self, message: &Message) -> bool {
        let headers = message.headers();
        let content_length = headers.get("Content-Length");
        let transfer_encoding = headers.get("Transfer-Encoding");

        // Both framing headers at once is request smuggling territory.
        if content_length.is_some() && transfer_encoding.is_some() {
            return false;
        }

        if let Some(value) = content_length {
            let Ok(declared) = value.trim().parse::<usize>() else {
                return false;
            };
            if message.body_len() > 0 && message.body_len() != declared {
                return false;
            }
        }

        if let Some(request) = message.as_request() {
            if request.version == Version::Http11 && !request.headers.contains("Host") {
                return false;
            }
            if request.method == Method::UNKNOWN {
                return false;
            }
            if request.path().is_empty() {
                return false;
            }
        }

        true
    }
}

/// Literal substrings checked against the decoded path (and raw URL) for
/// directory traversal.
const TRAVERSAL_PATTERNS: [&str; 6] = [
    "../",
    "..\\",
    "%2e%2e%2f",
    "%2e%2e%5c",
    "..%2f",
    "..%5c",
];

/// A small fixed set of injection/XSS literals. Best-effort screening only;
/// handlers still have to treat every input as hostile.
const SUSPICIOUS_PATTERNS: [&str; 11] = [
    "union select",
    "drop table",
    "delete from",
    "insert into",
    "update set",
    "exec(",
    "script>",
    "<script",
    "javascript:",
    "onerror=",
    "onload=",
];

/// Security policy checks for requests: method whitelist, size limits,
/// traversal and injection screening. Responses pass through untouched.
pub struct SecurityValidator {
    allowed_methods: Vec<Method>,
    max_body_size: usize,
    max_url_length: usize,
    max_header_count: usize,
    max_header_value_length: usize,
}

impl SecurityValidator {
    pub fn from_config(config: &SecurityConfig) -> Self {
        Self {
            allowed_methods: config.allowed_methods(),
            max_body_size: config.max_body_size,
            max_url_length: config.max_url_length,
            max_header_count: config.max_header_count,
            max_header_value_length: config.max_header_value_length,
        }
    }

    fn check_body_size(&self, message: &Message) -> bool {
        if let Some(value) = message.headers().get("Content-Length") {
            match value.trim().parse::<usize>() {
                Ok(declared) if declared <= self.max_body_size => {}
                _ => return false,
            }
        }
        message.body_len() <= self.max_body_size
    }

    fn check_path_security(&self, request: &Request) -> bool {
        let path = request.path();
        if path.is_empty() || path.contains('\0') {
            return false;
        }

        let lower_path = path.to_ascii_lowercase();
        let lower_url = request.url().to_ascii_lowercase();
        !TRAVERSAL_PATTERNS
            .iter()
            .any(|p| lower_path.contains(p) || lower_url.contains(p))
    }

    fn check_headers(&self, message: &Message) -> bool {
        let headers = message.headers();
        if headers.len() > self.max_header_count {
            return false;
        }
        headers
            .iter()
            .all(|(_, value)| value.len() <= self.max_header_value_length)
    }

    fn check_suspicious_patterns(&self, request: &Request) -> bool {
        let lower_path = request.path().to_ascii_lowercase();
        let lower_url = request.url().to_ascii_lowercase();
        !SUSPICIOUS_PATTERNS
            .iter()
            .any(|p| lower_path.contains(p) || lower_url.contains(p))
    }
}

impl Default for SecurityValidator {
    fn default() -> Self {
        Self::from_config(&SecurityConfig::default())
    }
}

impl Validator for SecurityValidator {
    fn name(&self) -> &'static str {
        "security"
    }

    fn validate(&self, message: &Message) -> bool {
        let Some(request) = message.as_request() else {
            return true;
        };

        if !self.allowed_methods.contains(&request.method) {
            return false;
        }
        if !self.check_body_size(message) {
            return false;
        }
        if request.url().len() > self.max_url_length {
            return false;
        }
        if !self.check_path_security(request) {
            return false;
        }
        if !self.check_headers(message) {
            return false;
        }
        self.check_suspicious_patterns(request)
    }
}
