use keystone::config::SecurityConfig;
use keystone::http::message::{Message, Version};
use keystone::http::request::{Method, Request};
use keystone::http::response::Response;
use keystone::validation::{
    ProtocolValidator, SecurityValidator, ValidationChain, Validator,
};

fn valid_request(url: &str) -> Request {
    let mut req = Request::new();
    req.headers.set("Host", "localhost");
    req.set_url(url);
    req
}

fn default_chain() -> ValidationChain {
    ValidationChain::with_defaults(&SecurityConfig::default())
}

#[test]
fn test_plain_get_passes_default_chain() {
    let msg = Message::Request(valid_request("/index.html"));
    assert_eq!(default_chain().run(&msg), Ok(()));
}

#[test]
fn test_trace_rejected_even_when_well_formed() {
    let mut req = valid_request("/anything");
    req.method = Method::TRACE;

    assert_eq!(default_chain().run(&Message::Request(req)), Err("security"));
}

#[test]
fn test_connect_rejected_by_default_whitelist() {
    let mut req = valid_request("/");
    req.method = Method::CONNECT;

    assert_eq!(default_chain().run(&msg_of(req)), Err("security"));
}

fn msg_of(req: Request) -> Message {
    Message::Request(req)
}

#[test]
fn test_custom_whitelist_is_honored() {
    let config = SecurityConfig {
        allowed_methods: vec!["GET".to_string()],
        ..SecurityConfig::default()
    };
    let validator = SecurityValidator::from_config(&config);

    let mut post = valid_request("/submit");
    post.method = Method::POST;
    assert!(!validator.validate(&msg_of(post)));
    assert!(validator.validate(&msg_of(valid_request("/read"))));
}

#[test]
fn test_path_traversal_rejected() {
    let validator = SecurityValidator::default();

    for url in [
        "/../../etc/passwd",
        "/static/..%2f..%2fetc/passwd",
        "/files/..%5cwindows",
        "/a/../b",
    ] {
        assert!(
            !validator.validate(&msg_of(valid_request(url))),
            "{url} should be rejected"
        );
    }
    assert!(validator.validate(&msg_of(valid_request("/fine/path"))));
}

#[test]
fn test_injection_literals_rejected() {
    let validator = SecurityValidator::default();

    for url in [
        "/q/union%20select/all",
        "/item/<script>alert(1)",
        "/go?next=javascript:alert(1)",
    ] {
        assert!(
            !validator.validate(&msg_of(valid_request(url))),
            "{url} should be rejected"
        );
    }
}

#[test]
fn test_conflicting_framing_headers_rejected() {
    let mut req = valid_request("/upload");
    req.headers.set("Content-Length", "4");
    req.headers.set("Transfer-Encoding", "chunked");

    assert_eq!(default_chain().run(&msg_of(req)), Err("protocol"));
}

#[test]
fn test_non_numeric_content_length_rejected() {
    let mut req = valid_request("/upload");
    req.headers.set("Content-Length", "abc");

    assert!(!ProtocolValidator.validate(&msg_of(req)));
}

#[test]
fn test_content_length_must_agree_with_body() {
    let mut req = valid_request("/upload");
    req.headers.set("Content-Length", "5");
    req.body = b"abc".to_vec();
    assert!(!ProtocolValidator.validate(&msg_of(req)));

    let mut req = valid_request("/upload");
    req.headers.set("Content-Length", "3");
    req.body = b"abc".to_vec();
    assert!(ProtocolValidator.validate(&msg_of(req)));
}

#[test]
fn test_host_required_on_http11_only() {
    let mut req = Request::new();
    req.set_url("/");
    assert!(!ProtocolValidator.validate(&msg_of(req.clone())));

    req.version = Version::Http10;
    assert!(ProtocolValidator.validate(&msg_of(req)));
}

#[test]
fn test_unknown_method_rejected() {
    let mut req = valid_request("/");
    req.method = Method::UNKNOWN;
    assert!(!ProtocolValidator.validate(&msg_of(req)));
}

#[test]
fn test_oversized_declared_body_rejected() {
    let config = SecurityConfig { max_body_size: 8, ..SecurityConfig::default() };
    let validator = SecurityValidator::from_config(&config);

    let mut req = valid_request("/upload");
    req.headers.set("Content-Length", "64");
    assert!(!validator.validate(&msg_of(req)));
}

#[test]
fn test_oversized_actual_body_rejected() {
    let config = SecurityConfig { max_body_size: 8, ..SecurityConfig::default() };
    let validator = SecurityValidator::from_config(&config);

    let mut req = valid_request("/upload");
    req.body = vec![b'x'; 64];
    assert!(!validator.validate(&msg_of(req)));
}

#[test]
fn test_url_length_limit() {
    let config = SecurityConfig { max_url_length: 16, ..SecurityConfig::default() };
    let validator = SecurityValidator::from_config(&config);

    assert!(validator.validate(&msg_of(valid_request("/short"))));
    assert!(!validator.validate(&msg_of(valid_request(
        "/this/is/a/rather/long/path/indeed"
    ))));
}

#[test]
fn test_header_limits() {
    let config = SecurityConfig {
        max_header_count: 2,
        max_header_value_length: 8,
        ..SecurityConfig::default()
    };
    let validator = SecurityValidator::from_config(&config);

    let mut req = valid_request("/");
    req.headers.append("A", "1");
    req.headers.append("B", "2");
    assert!(!validator.validate(&msg_of(req)), "three headers over a count of two");

    let mut req = valid_request("/");
    req.headers.set("Host", "far-too-long-a-value");
    assert!(!validator.validate(&msg_of(req)), "value over the length limit");
}

#[test]
fn test_responses_skip_security_policy() {
    let validator = SecurityValidator::default();
    let mut resp = Response::new();
    resp.body = vec![b'x'; 4 * 1024 * 1024];

    // Size limits only police inbound requests.
    assert!(validator.validate(&Message::Response(resp)));
}

#[test]
fn test_chain_stops_at_first_rejection_and_names_it() {
    let mut req = valid_request("/");
    req.method = Method::UNKNOWN; // protocol rejects before security runs
    assert_eq!(default_chain().run(&msg_of(req)), Err("protocol"));
}

#[test]
fn test_empty_chain_accepts_everything() {
    let chain = ValidationChain::new();
    assert!(chain.is_empty());

    let mut req = Request::new();
    req.method = Method::UNKNOWN;
    assert_eq!(chain.run(&msg_of(req)), Ok(()));
}

#[test]
fn test_custom_validator_slots_into_chain() {
    struct NoPosts;
    impl Validator for NoPosts {
        fn name(&self) -> &'static str {
            "no-posts"
        }
        fn validate(&self, message: &Message) -> bool {
            message
                .as_request()
                .map(|req| req.method != Method::POST)
                .unwrap_or(true)
        }
    }

    let mut chain = default_chain();
    chain.push(Box::new(NoPosts));
    assert_eq!(chain.len(), 3);

    let mut req = valid_request("/submit");
    req.method = Method::POST;
    assert_eq!(chain.run(&msg_of(req)), Err("no-posts"));
}
