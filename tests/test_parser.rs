use bytes::BytesMut;
use keystone::config::ParserLimits;
use keystone::http::message::Message;
use keystone::http::parser::{ParseError, ParseStatus, Parser};
use keystone::http::request::Method;

fn feed(parser: &mut Parser, buf: &mut BytesMut, bytes: &[u8]) -> Result<ParseStatus, ParseError> {
    buf.extend_from_slice(bytes);
    parser.parse(buf)
}

fn parse_complete(raw: &[u8]) -> Message {
    let mut parser = Parser::default();
    let mut buf = BytesMut::from(raw);
    match parser.parse(&mut buf) {
        Ok(ParseStatus::Complete(message)) => message,
        other => panic!("expected a complete message, got {:?}", other),
    }
}

#[test]
fn test_parse_simple_get_request() {
    let raw = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";
    let mut parser = Parser::default();
    let mut buf = BytesMut::from(&raw[..]);

    let Ok(ParseStatus::Complete(Message::Request(req))) = parser.parse(&mut buf) else {
        panic!("expected a complete request");
    };
    assert_eq!(req.method, Method::GET);
    assert_eq!(req.path(), "/index.html");
    assert_eq!(req.headers.get("Host"), Some("example.com"));
    assert!(buf.is_empty(), "the whole request should be consumed");
}

#[test]
fn test_parse_post_with_exact_content_length() {
    let raw = b"POST /api HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\n\r\nhello";
    let message = parse_complete(raw);
    assert_eq!(message.body(), b"hello");
}

#[test]
fn test_content_length_requires_every_byte() {
    let mut parser = Parser::default();
    let mut buf = BytesMut::new();

    let partial = b"POST /api HTTP/1.1\r\nContent-Length: 5\r\n\r\nhell";
    assert_eq!(feed(&mut parser, &mut buf, partial), Ok(ParseStatus::NeedMoreData));

    // The fifth byte completes the message.
    let Ok(ParseStatus::Complete(message)) = feed(&mut parser, &mut buf, b"o") else {
        panic!("expected completion after the final byte");
    };
    assert_eq!(message.body(), b"hello");
}

#[test]
fn test_resumable_at_every_split_point() {
    let raw: &[u8] =
        b"POST /upload HTTP/1.1\r\nHost: a\r\nContent-Length: 4\r\n\r\nwiki";
    let reference = parse_complete(raw);

    for split in 1..raw.len() {
        let mut parser = Parser::default();
        let mut buf = BytesMut::new();

        let first = feed(&mut parser, &mut buf, &raw[..split]);
        assert_eq!(
            first,
            Ok(ParseStatus::NeedMoreData),
            "split at {split} completed early"
        );

        match feed(&mut parser, &mut buf, &raw[split..]) {
            Ok(ParseStatus::Complete(message)) => {
                assert_eq!(message, reference, "split at {split} changed the result")
            }
            other => panic!("split at {split} did not complete: {:?}", other),
        }
    }
}

#[test]
fn test_chunked_resumable_at_every_split_point() {
    let raw: &[u8] =
        b"POST /u HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n";
    let reference = parse_complete(raw);
    assert_eq!(reference.body(), b"Wikipedia");

    for split in 1..raw.len() {
        let mut parser = Parser::default();
        let mut buf = BytesMut::new();

        assert_eq!(
            feed(&mut parser, &mut buf, &raw[..split]),
            Ok(ParseStatus::NeedMoreData),
            "split at {split} completed early"
        );
        match feed(&mut parser, &mut buf, &raw[split..]) {
            Ok(ParseStatus::Complete(message)) => {
                assert_eq!(message, reference, "split at {split} changed the result")
            }
            other => panic!("split at {split} did not complete: {:?}", other),
        }
    }
}

#[test]
fn test_chunked_round_trip() {
    let raw = b"POST /w HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n";
    let message = parse_complete(raw);
    assert_eq!(message.body(), b"Wikipedia");
}

#[test]
fn test_chunked_transfer_encoding_case_insensitive() {
    let raw = b"POST /w HTTP/1.1\r\nTransfer-Encoding: Chunked\r\n\r\n2\r\nok\r\n0\r\n\r\n";
    assert_eq!(parse_complete(raw).body(), b"ok");
}

#[test]
fn test_chunked_trailer_lines_are_skipped() {
    let raw =
        b"POST /w HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabc\r\n0\r\nX-Digest: deadbeef\r\n\r\n";
    let message = parse_complete(raw);
    assert_eq!(message.body(), b"abc");
    // Trailers are consumed, not recorded.
    assert_eq!(message.headers().get("X-Digest"), None);
}

#[test]
fn test_partial_chunk_consumes_nothing() {
    let mut parser = Parser::default();
    let mut buf = BytesMut::new();
    buf.extend_from_slice(b"POST /u HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\npe");

    assert_eq!(parser.parse(&mut buf), Ok(ParseStatus::NeedMoreData));
    // The header section and size line are gone, the partial chunk remains.
    assert_eq!(&buf[..], b"pe");
}

#[test]
fn test_pipelined_messages_on_one_connection() {
    let mut parser = Parser::default();
    let mut buf = BytesMut::new();
    buf.extend_from_slice(b"GET /first HTTP/1.1\r\nHost: a\r\n\r\nGET /second HTTP/1.1\r\nHost: a\r\n\r\n");

    let Ok(ParseStatus::Complete(Message::Request(first))) = parser.parse(&mut buf) else {
        panic!("expected the first request");
    };
    assert_eq!(first.path(), "/first");
    assert!(buf.starts_with(b"GET /second"), "trailing bytes must survive");

    let Ok(ParseStatus::Complete(Message::Request(second))) = parser.parse(&mut buf) else {
        panic!("expected the second request");
    };
    assert_eq!(second.path(), "/second");
    assert!(buf.is_empty());
}

#[test]
fn test_reset_between_messages_is_clean() {
    let raw_a = b"POST /a HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc";
    let raw_b = b"GET /b?x=1 HTTP/1.0\r\nHost: b\r\n\r\n";
    let reference_a = parse_complete(raw_a);
    let reference_b = parse_complete(raw_b);

    let mut parser = Parser::default();
    let mut buf = BytesMut::new();

    let Ok(ParseStatus::Complete(a)) = feed(&mut parser, &mut buf, raw_a) else {
        panic!("first message should complete");
    };
    let Ok(ParseStatus::Complete(b)) = feed(&mut parser, &mut buf, raw_b) else {
        panic!("second message should complete");
    };
    assert_eq!(a, reference_a);
    assert_eq!(b, reference_b);
    assert_eq!(parser.total_consumed(), 0);
}

#[test]
fn test_parse_response_status_line() {
    let raw = b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n";
    let Message::Response(resp) = parse_complete(raw) else {
        panic!("expected a response");
    };
    assert_eq!(resp.status_code(), 404);
    assert_eq!(resp.status_reason(), "Not Found");
}

#[test]
fn test_response_reason_defaults_when_absent() {
    let raw = b"HTTP/1.1 200\r\n\r\n";
    let Message::Response(resp) = parse_complete(raw) else {
        panic!("expected a response");
    };
    assert_eq!(resp.status_reason(), "OK");
}

#[test]
fn test_invalid_start_line() {
    for raw in [
        &b"GARBAGE\r\n"[..],
        &b"GET /missing-version\r\n"[..],
        &b"\r\n"[..],
        &b"HTTP/1.1\r\n"[..],
    ] {
        let mut parser = Parser::default();
        let mut buf = BytesMut::from(raw);
        assert_eq!(
            parser.parse(&mut buf),
            Err(ParseError::InvalidStartLine),
            "input {:?}",
            raw
        );
    }
}

#[test]
fn test_unsupported_versions() {
    for raw in [
        &b"GET / HTTP/2.0\r\n"[..],
        &b"GET / HTTP/0.9\r\n"[..],
        &b"GET / http/1.1\r\n"[..],
        &b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n"[..],
        &b"HTTP/2.0 200 OK\r\n\r\n"[..],
    ] {
        let mut parser = Parser::default();
        let mut buf = BytesMut::from(raw);
        assert_eq!(
            parser.parse(&mut buf),
            Err(ParseError::UnsupportedVersion),
            "input {:?}",
            raw
        );
    }
}

#[test]
fn test_unknown_method_is_parsed_not_rejected() {
    // Method screening is validation's job; the parser only structures it.
    let raw = b"BREW /pot HTTP/1.1\r\nHost: a\r\n\r\n";
    let Message::Request(req) = parse_complete(raw) else {
        panic!("expected a request");
    };
    assert_eq!(req.method, Method::UNKNOWN);
}

#[test]
fn test_header_without_colon_is_invalid() {
    let mut parser = Parser::default();
    let mut buf = BytesMut::from(&b"GET / HTTP/1.1\r\nBrokenHeader\r\n\r\n"[..]);
    assert_eq!(parser.parse(&mut buf), Err(ParseError::InvalidHeader));
}

#[test]
fn test_strict_mode_rejects_non_token_header_names() {
    let mut parser = Parser::default();
    let mut buf = BytesMut::from(&b"GET / HTTP/1.1\r\nBad Header: x\r\n\r\n"[..]);
    assert_eq!(parser.parse(&mut buf), Err(ParseError::InvalidHeader));

    let mut lenient = ParserLimits::default();
    lenient.strict_headers = false;
    let mut parser = Parser::new(lenient);
    let mut buf = BytesMut::from(&b"GET / HTTP/1.1\r\nBad Header: x\r\n\r\n"[..]);
    assert!(matches!(parser.parse(&mut buf), Ok(ParseStatus::Complete(_))));
}

#[test]
fn test_header_values_are_trimmed() {
    let raw = b"GET / HTTP/1.1\r\nX-Padded:   spaced out  \r\n\r\n";
    let message = parse_complete(raw);
    assert_eq!(message.headers().get("X-Padded"), Some("spaced out"));
}

#[test]
fn test_header_line_too_long() {
    let mut raw = b"GET / HTTP/1.1\r\nX-Big: ".to_vec();
    raw.extend(std::iter::repeat_n(b'a', 9000));
    raw.extend_from_slice(b"\r\n\r\n");

    let mut parser = Parser::default();
    let mut buf = BytesMut::from(&raw[..]);
    assert_eq!(parser.parse(&mut buf), Err(ParseError::HeaderTooLong));
}

#[test]
fn test_too_many_headers() {
    let mut raw = b"GET / HTTP/1.1\r\n".to_vec();
    for i in 0..101 {
        raw.extend_from_slice(format!("X-H{i}: v\r\n").as_bytes());
    }
    raw.extend_from_slice(b"\r\n");

    let mut parser = Parser::default();
    let mut buf = BytesMut::from(&raw[..]);
    assert_eq!(parser.parse(&mut buf), Err(ParseError::HeaderTooLong));
}

#[test]
fn test_declared_body_over_limit() {
    let mut limits = ParserLimits::default();
    limits.max_body_size = 16;
    let mut parser = Parser::new(limits);
    let mut buf = BytesMut::from(&b"POST / HTTP/1.1\r\nContent-Length: 64\r\n\r\n"[..]);
    assert_eq!(parser.parse(&mut buf), Err(ParseError::BodyTooLong));
}

#[test]
fn test_chunked_body_over_limit() {
    let mut limits = ParserLimits::default();
    limits.max_body_size = 4;
    let mut parser = Parser::new(limits);
    let mut buf =
        BytesMut::from(&b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n8\r\noversized\r\n"[..]);
    assert_eq!(parser.parse(&mut buf), Err(ParseError::BodyTooLong));
}

#[test]
fn test_chunk_size_must_be_hex() {
    let mut parser = Parser::default();
    let mut buf =
        BytesMut::from(&b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\nzz\r\n"[..]);
    assert_eq!(parser.parse(&mut buf), Err(ParseError::InvalidHeader));
}

#[test]
fn test_chunk_payload_must_end_with_crlf() {
    let mut parser = Parser::default();
    let mut buf =
        BytesMut::from(&b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nabcXX"[..]);
    assert_eq!(parser.parse(&mut buf), Err(ParseError::InvalidHeader));
}

#[test]
fn test_error_still_drops_consumed_prefix() {
    let mut parser = Parser::default();
    let mut buf = BytesMut::from(&b"GARBAGE\r\nleftover"[..]);

    assert_eq!(parser.parse(&mut buf), Err(ParseError::InvalidStartLine));
    // The malformed line is gone so it can never be retried; bytes after it
    // are untouched.
    assert_eq!(&buf[..], b"leftover");
}

#[test]
fn test_non_numeric_content_length_completes_empty() {
    // Framing falls back to "no body"; the protocol validator rejects this
    // message later.
    let raw = b"POST / HTTP/1.1\r\nHost: a\r\nContent-Length: abc\r\n\r\n";
    let message = parse_complete(raw);
    assert_eq!(message.body_len(), 0);
}

#[test]
fn test_no_framing_headers_means_empty_body() {
    let raw = b"GET / HTTP/1.1\r\nHost: a\r\n\r\n";
    assert_eq!(parse_complete(raw).body_len(), 0);
}

#[test]
fn test_content_encoding_recorded_not_applied() {
    use keystone::http::message::ContentEncoding;

    let raw = b"POST / HTTP/1.1\r\nContent-Encoding: gzip\r\nContent-Length: 3\r\n\r\nraw";
    let message = parse_complete(raw);
    assert_eq!(message.content_encoding(), ContentEncoding::Gzip);
    assert_eq!(message.body(), b"raw", "body bytes must be untouched");
}

#[test]
fn test_query_string_parsed_from_request_target() {
    let raw = b"GET /search?q=rust&q=http&page=1 HTTP/1.1\r\nHost: a\r\n\r\n";
    let Message::Request(req) = parse_complete(raw) else {
        panic!("expected a request");
    };
    assert_eq!(req.path(), "/search");
    assert_eq!(req.query_values("q"), &["rust", "http"]);
    assert_eq!(req.query_param("page"), Some("1"));
    assert_eq!(req.url(), "/search?q=rust&q=http&page=1");
}

#[test]
fn test_explicit_reset_recovers_the_parser() {
    let mut parser = Parser::default();
    let mut buf = BytesMut::from(&b"GET /partial HTTP/1.1\r\nHost"[..]);
    assert_eq!(parser.parse(&mut buf), Ok(ParseStatus::NeedMoreData));

    parser.reset();
    assert_eq!(parser.total_consumed(), 0);

    let raw = b"GET /fresh HTTP/1.1\r\nHost: a\r\n\r\n";
    let Ok(ParseStatus::Complete(Message::Request(req))) = feed(&mut parser, &mut buf, raw) else {
        panic!("expected a fresh parse after reset");
    };
    assert_eq!(req.path(), "/fresh");
}
