use bytes::{Buf, BytesMut};
use thiserror::Error;

use crate::config::ParserLimits;
use crate::http::message::{ContentEncoding, Message, Version};
use crate::http::request::{Method, Request};
use crate::http::response::Response;

/// Terminal parse failures. Any of these poisons the current message; the
/// bytes consumed up to the failure have already been dropped from the input
/// and the connection is expected to be closed by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid start line")]
    InvalidStartLine,
    #[error("invalid header line")]
    InvalidHeader,
    #[error("header section too long")]
    HeaderTooLong,
    #[error("body exceeds configured maximum")]
    BodyTooLong,
    #[error("unsupported HTTP version")]
    UnsupportedVersion,
}

/// Non-error outcome of a `parse` call.
#[derive(Debug, PartialEq)]
pub enum ParseStatus {
    /// One message was fully built; exactly its bytes were drained from the
    /// input, trailing bytes of a pipelined follow-up are untouched.
    Complete(Message),
    /// No complete message yet; feed more bytes and call again.
    NeedMoreData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    StartLine,
    Headers,
    BodyContentLength,
    BodyChunkedSize,
    BodyChunkedData,
    BodyChunkedEnd,
}

/// Incremental, resumable HTTP/1.x parser.
///
/// One instance lives for the duration of a connection. Each `parse` call
/// consumes as much of the input buffer as it can; an incomplete line is
/// stashed internally so no byte is ever scanned twice. After a message
/// completes the per-message cursor resets and the same instance parses the
/// next pipelined message.
#[derive(Debug)]
pub struct Parser {
    state: ParseState,
    message: Option<Message>,
    line_buf: Vec<u8>,
    content_length: usize,
    body_received: usize,
    chunk_size: usize,
    header_count: usize,
    total_consumed: u64,
    limits: ParserLimits,
}

impl Parser {
    pub fn new(limits: ParserLimits) -> Self {
        Self {
            state: ParseState::StartLine,
            message: None,
            line_buf: Vec::new(),
            content_length: 0,
            body_received: 0,
            chunk_size: 0,
            header_count: 0,
            total_consumed: 0,
            limits,
        }
    }

    /// Bytes consumed toward the message currently being built. Cleared when
    /// a message completes.
    pub fn total_consumed(&self) -> u64 {
        self.total_consumed
    }

    /// Restores the freshly-constructed state, dropping any half-built
    /// message and buffered partial line.
    pub fn reset(&mut self) {
        self.state = ParseState::StartLine;
        self.message = None;
        self.line_buf.clear();
        self.content_length = 0;
        self.body_received = 0;
        self.chunk_size = 0;
        self.header_count = 0;
        self.total_consumed = 0;
    }

    /// Feeds the parser from `buf`. Consumed bytes (including partial lines
    /// moved into the internal buffer) are drained from `buf`; on a terminal
    /// error everything up to the failure point is drained as well, so the
    /// malformed prefix is never retried.
    pub fn parse(&mut self, buf: &mut BytesMut) -> Result<ParseStatus, ParseError> {
        let (consumed, result) = self.run(&buf[..]);
        buf.advance(consumed);
        match &result {
            // Per-message state (the consumed counter included) was reset at
            // finalization.
            Ok(ParseStatus::Complete(_)) => {}
            _ => self.total_consumed += consumed as u64,
        }
        result
    }

    fn run(&mut self, data: &[u8]) -> (usize, Result<ParseStatus, ParseError>) {
        let mut consumed = 0;

        loop {
            if consumed >= data.len() {
                return (consumed, Ok(ParseStatus::NeedMoreData));
            }

            match self.state {
                ParseState::StartLine => {
                    let Some(line) = self.take_line(data, &mut consumed) else {
                        return (consumed, Ok(ParseStatus::NeedMoreData));
                    };
                    if let Err(e) = self.parse_start_line(&line) {
                        return (consumed, Err(e));
                    }
                    self.state = ParseState::Headers;
                }

                ParseState::Headers => {
                    let Some(line) = self.take_line(data, &mut consumed) else {
                        if self.line_buf.len() > self.limits.max_header_line {
                            return (consumed, Err(ParseError::HeaderTooLong));
                        }
                        return (consumed, Ok(ParseStatus::NeedMoreData));
                    };
                    if line.is_empty() {
                        match self.decide_body_mode() {
                            Ok(true) => {
                                let message = self.finalize();
                                return (consumed, Ok(ParseStatus::Complete(message)));
                            }
                            Ok(false) => {}
                            Err(e) => return (consumed, Err(e)),
                        }
                        continue;
                    }
                    if line.len() > self.limits.max_header_line {
                        return (consumed, Err(ParseError::HeaderTooLong));
                    }
                    self.header_count += 1;
                    if self.header_count > self.limits.max_header_count {
                        return (consumed, Err(ParseError::HeaderTooLong));
                    }
                    if let Err(e) = self.parse_header_line(&line) {
                        return (consumed, Err(e));
                    }
                }

                ParseState::BodyContentLength => {
                    let available = data.len() - consumed;
                    let needed = self.content_length - self.body_received;
                    let take = available.min(needed);
                    if take > 0 {
                        self.message_mut()
                            .append_body_chunk(&data[consumed..consumed + take]);
                        consumed += take;
                        self.body_received += take;
                    }
                    if self.body_received >= self.content_length {
                        let message = self.finalize();
                        return (consumed, Ok(ParseStatus::Complete(message)));
                    }
                    return (consumed, Ok(ParseStatus::NeedMoreData));
                }

                ParseState::BodyChunkedSize => {
                    let Some(line) = self.take_line(data, &mut consumed) else {
                        return (consumed, Ok(ParseStatus::NeedMoreData));
                    };
                    if let Err(e) = self.parse_chunk_size(&line) {
                        return (consumed, Err(e));
                    }
                    self.state = if self.chunk_size == 0 {
                        ParseState::BodyChunkedEnd
                    } else {
                        ParseState::BodyChunkedData
                    };
                }

                ParseState::BodyChunkedData => {
                    // The whole chunk plus its trailing CRLF must be present;
                    // a partial chunk is left in the caller's buffer untouched.
                    let available = data.len() - consumed;
                    if available < self.chunk_size + 2 {
                        return (consumed, Ok(ParseStatus::NeedMoreData));
                    }
                    let chunk_size = self.chunk_size;
                    self.message_mut()
                        .append_body_chunk(&data[consumed..consumed + chunk_size]);
                    consumed += chunk_size;
                    if &data[consumed..consumed + 2] != b"\r\n" {
                        return (consumed, Err(ParseError::InvalidHeader));
                    }
                    consumed += 2;
                    self.state = ParseState::BodyChunkedSize;
                }

                ParseState::BodyChunkedEnd => {
                    let Some(line) = self.take_line(data, &mut consumed) else {
                        return (consumed, Ok(ParseStatus::NeedMoreData));
                    };
                    if line.is_empty() {
                        let message = self.finalize();
                        return (consumed, Ok(ParseStatus::Complete(message)));
                    }
                    // Trailer line: consumed and ignored, but still counted
                    // against the header budget so the state machine stays
                    // bounded.
                    self.header_count += 1;
                    if self.header_count > self.limits.max_header_count {
                        return (consumed, Err(ParseError::HeaderTooLong));
                    }
                }
            }
        }
    }

    /// Extracts one CRLF-terminated line, joining it with any buffered
    /// partial line. The CRLF may straddle the buffer boundary. Returns
    /// `None` after stashing the remainder when no terminator is in sight.
    fn take_line(&mut self, data: &[u8], consumed: &mut usize) -> Option<Vec<u8>> {
        let data = &data[*consumed..];

        // CRLF split across calls: buffered bytes end in '\r', fresh input
        // starts with '\n'.
        if self.line_buf.last() == Some(&b'\r') && data.first() == Some(&b'\n') {
            let mut line = std::mem::take(&mut self.line_buf);
            line.pop();
            *consumed += 1;
            return Some(line);
        }

        let mut from = 0;
        while let Some(offset) = data[from..].iter().position(|&b| b == b'\n') {
            let i = from + offset;
            if i > 0 && data[i - 1] == b'\r' {
                let mut line = std::mem::take(&mut self.line_buf);
                line.extend_from_slice(&data[..i - 1]);
                *consumed += i + 1;
                return Some(line);
            }
            // A bare LF is not a terminator; keep scanning.
            from = i + 1;
        }

        self.line_buf.extend_from_slice(data);
        *consumed += data.len();
        None
    }

    fn parse_start_line(&mut self, line: &[u8]) -> Result<(), ParseError> {
        let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidStartLine)?;
        if line.is_empty() {
            return Err(ParseError::InvalidStartLine);
        }

        if line.starts_with("HTTP/") {
            // Status line: <version> <code> <reason>, reason free-form.
            let mut parts = line.splitn(3, ' ');
            let version_token = parts.next().unwrap_or_default();
            let status_token = parts.next().ok_or(ParseError::InvalidStartLine)?;
            let reason = parts.next().unwrap_or("");

            let version = Self::require_http1(version_token)?;
            let code: u16 = status_token
                .parse()
                .map_err(|_| ParseError::InvalidStartLine)?;

            let mut response = Response::new();
            response.version = version;
            response.set_status_with_reason(code, reason);
            self.message = Some(Message::Response(response));
            return Ok(());
        }

        // Request line: <method> <url> <version>, exactly three tokens.
        let mut parts = line.split_whitespace();
        let method_token = parts.next().ok_or(ParseError::InvalidStartLine)?;
        let url = parts.next().ok_or(ParseError::InvalidStartLine)?;
        let version_token = parts.next().ok_or(ParseError::InvalidStartLine)?;
        if parts.next().is_some() {
            return Err(ParseError::InvalidStartLine);
        }

        let version = Self::require_http1(version_token)?;

        let mut request = Request::new();
        request.method = Method::from_token(method_token);
        request.version = version;
        request.set_url(url);
        self.message = Some(Message::Request(request));
        Ok(())
    }

    fn require_http1(token: &str) -> Result<Version, ParseError> {
        match Version::from_token(token) {
            Some(v @ (Version::Http10 | Version::Http11)) => Ok(v),
            // HTTP/2 and HTTP/3 prefaces are recognized only far enough to be
            // refused instead of misparsed.
            _ => Err(ParseError::UnsupportedVersion),
        }
    }

    fn parse_header_line(&mut self, line: &[u8]) -> Result<(), ParseError> {
        let line = std::str::from_utf8(line).map_err(|_| ParseError::InvalidHeader)?;
        let (key, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;

        if self.limits.strict_headers
            && (key.is_empty() || !key.bytes().all(is_token_byte))
        {
            return Err(ParseError::InvalidHeader);
        }

        let value = value.trim_matches([' ', '\t']);
        self.message_mut().headers_mut().append(key, value);
        Ok(())
    }

    /// Picks the body framing at the end of the header block. Returns `true`
    /// when the message is already complete (no body to read).
    fn decide_body_mode(&mut self) -> Result<bool, ParseError> {
        let (chunked, declared) = {
            let headers = self.message_mut().headers();
            let chunked = headers
                .get("Transfer-Encoding")
                .is_some_and(|v| v.eq_ignore_ascii_case("chunked"));
            // A non-numeric Content-Length is the protocol validator's catch,
            // not a framing error: the message completes with an empty body.
            let declared = headers
                .get("Content-Length")
                .and_then(|v| v.trim().parse::<usize>().ok());
            (chunked, declared)
        };

        if chunked {
            self.state = ParseState::BodyChunkedSize;
            return Ok(false);
        }

        if let Some(length) = declared {
            if length > self.limits.max_body_size {
                return Err(ParseError::BodyTooLong);
            }
            if length > 0 {
                self.content_length = length;
                self.body_received = 0;
                self.state = ParseState::BodyContentLength;
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn parse_chunk_size(&mut self, line: &[u8]) -> Result<(), ParseError> {
        let digits = line
            .iter()
            .take_while(|b| b.is_ascii_hexdigit())
            .count();
        if digits == 0 {
            return Err(ParseError::InvalidHeader);
        }
        // Chunk extensions after the size are ignored.
        let hex = std::str::from_utf8(&line[..digits]).map_err(|_| ParseError::InvalidHeader)?;
        let size = usize::from_str_radix(hex, 16).map_err(|_| ParseError::InvalidHeader)?;

        match self.message_mut().body_len().checked_add(size) {
            Some(total) if total <= self.limits.max_body_size => {}
            _ => return Err(ParseError::BodyTooLong),
        }
        self.chunk_size = size;
        Ok(())
    }

    fn message_mut(&mut self) -> &mut Message {
        self.message
            .get_or_insert_with(|| Message::Request(Request::new()))
    }

    /// Hands the finished message out and resets the per-message cursor so
    /// the next pipelined message starts clean.
    fn finalize(&mut self) -> Message {
        let mut message = self
            .message
            .take()
            .unwrap_or_else(|| Message::Request(Request::new()));
        if let Some(value) = message.headers().get("Content-Encoding") {
            let encoding = ContentEncoding::from_header_value(value);
            message.set_content_encoding(encoding);
        }
        self.reset();
        message
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(ParserLimits::default())
    }
}

/// RFC 7230 token characters, the legal alphabet for header field names.
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_'
                | b'`' | b'|' | b'~'
        )
}
