use std::sync::Arc;

use bytes::BytesMut;

use crate::config::ParserLimits;
use crate::http::message::Message;
use crate::http::parser::{ParseError, ParseStatus, Parser};
use crate::http::request::Method;
use crate::http::response::Response;
use crate::pipeline::observer::{HttpObserver, ObserverHandle};
use crate::pipeline::tls::{DecryptStatus, HandshakeStatus, TlsError, TlsSession};
use crate::router::{RouteOutcome, Router};
use crate::validation::ValidationChain;

/// Why routing did not produce a response. `NotFound` and `MethodNotAllowed`
/// are ordinary results the caller answers with 404/405; the other two end
/// the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteFailure {
    NotFound,
    MethodNotAllowed(Vec<Method>),
    MiddlewareRejected,
    HandlerRejected,
}

/// Result of one `process` call. Exactly one variant per way the fixed stage
/// sequence (TLS → parse → validate → route) can end, so the connection
/// layer's dispatch is a single exhaustive `match`.
#[derive(Debug)]
pub enum Outcome {
    /// A message was parsed, validated and (for requests) routed. `response`
    /// is the handler's output, absent when the message was itself a
    /// response. `consumed` is the exact raw-byte prefix this message
    /// occupied in the caller's buffer.
    Success {
        message: Message,
        response: Option<Response>,
        consumed: usize,
    },
    SslNeedMoreData,
    SslHandshakeFailed,
    ParseFailed(ParseError),
    ValidationFailed,
    RoutingFailed(RouteFailure),
    NeedMoreData,
    UnknownError,
}

/// The per-connection processing pipeline.
///
/// Owns the parser cursor (single-threaded, not re-entrant: one connection's
/// bytes flow through exactly one pipeline, never concurrently) and borrows
/// the shared route table and validation chain. Nothing here blocks; the
/// only way to wait is for the caller to read more bytes after
/// `NeedMoreData`.
pub struct Pipeline {
    parser: Parser,
    chain: Arc<ValidationChain>,
    router: Arc<Router>,
    tls: Option<Box<dyn TlsSession>>,
    tls_enabled: bool,
    plaintext: BytesMut,
    observers: Vec<ObserverHandle>,
}

impl Pipeline {
    pub fn new(router: Arc<Router>, chain: Arc<ValidationChain>, limits: ParserLimits) -> Self {
        Self {
            parser: Parser::new(limits),
            chain,
            router,
            tls: None,
            tls_enabled: false,
            plaintext: BytesMut::new(),
            observers: Vec::new(),
        }
    }

    /// Installs a TLS session and turns the decrypt stage on.
    pub fn enable_tls(&mut self, session: Box<dyn TlsSession>) {
        self.tls = Some(session);
        self.tls_enabled = true;
    }

    pub fn disable_tls(&mut self) {
        self.tls = None;
        self.tls_enabled = false;
    }

    pub fn add_observer(&mut self, observer: ObserverHandle) {
        self.observers.push(observer);
    }

    pub fn remove_observer(&mut self, observer: &ObserverHandle) {
        self.observers.retain(|o| !Arc::ptr_eq(o, observer));
    }

    /// Encrypts an outgoing payload when TLS is active; passes it through
    /// otherwise.
    pub fn encrypt_outbound(&mut self, plain: &[u8]) -> Result<Vec<u8>, TlsError> {
        match (&mut self.tls, self.tls_enabled) {
            (Some(session), true) if session.is_handshake_complete() => session.encrypt(plain),
            _ => Ok(plain.to_vec()),
        }
    }

    /// Runs the fixed stage sequence over the buffered bytes. Consumed bytes
    /// are drained from `buf`; whatever belongs to a pipelined follow-up
    /// message is left in place.
    pub fn process(&mut self, buf: &mut BytesMut) -> Outcome {
        let before = buf.len();

        // Stage 1: TLS termination, when enabled and the bytes look
        // encrypted. Cleartext on a TLS-enabled listener is let through so
        // the sniff never breaks plain HTTP.
        let use_tls = self.tls_enabled
            && self
                .tls
                .as_ref()
                .is_some_and(|s| s.is_handshake_complete() || s.is_tls_record(&buf[..]));

        if use_tls {
            match self.run_tls_stage(buf) {
                Ok(()) => {}
                Err(outcome) => return outcome,
            }
        } else if self.tls_enabled {
            self.notify_ssl("skipped", "cleartext connection on TLS-enabled listener");
        }

        // Stage 2: parse. With TLS on, the parser reads the staged
        // plaintext; consumed raw bytes were already accounted for by the
        // decrypt above.
        let message = {
            let source: &mut BytesMut = if use_tls { &mut self.plaintext } else { buf };
            match self.parser.parse(source) {
                Ok(ParseStatus::Complete(message)) => message,
                Ok(ParseStatus::NeedMoreData) => return Outcome::NeedMoreData,
                Err(e) => {
                    self.notify_parse("failed", &e.to_string());
                    return Outcome::ParseFailed(e);
                }
            }
        };
        self.notify_parse("complete", &describe(&message));

        // Stage 3: validation chain.
        if let Err(rejected_by) = self.chain.run(&message) {
            self.notify_validation("rejected", rejected_by);
            return Outcome::ValidationFailed;
        }
        self.notify_validation("accepted", "all validators passed");

        // Stage 4: routing, requests only. A parsed response has no route.
        let response = match &message {
            Message::Request(request) => match self.router.match_route(request) {
                RouteOutcome::Matched { handler, params } => {
                    let mut response = Response::new();
                    if !(handler.as_ref())(request, &mut response, &params) {
                        self.notify_routing("handler rejected", request.path());
                        return Outcome::RoutingFailed(RouteFailure::HandlerRejected);
                    }
                    self.notify_routing("matched", request.path());
                    Some(response)
                }
                RouteOutcome::NotFound => {
                    self.notify_routing("no route", request.path());
                    return Outcome::RoutingFailed(RouteFailure::NotFound);
                }
                RouteOutcome::MethodNotAllowed(allowed) => {
                    self.notify_routing("method not allowed", request.path());
                    return Outcome::RoutingFailed(RouteFailure::MethodNotAllowed(allowed));
                }
                RouteOutcome::MiddlewareRejected => {
                    self.notify_routing("middleware rejected", request.path());
                    return Outcome::RoutingFailed(RouteFailure::MiddlewareRejected);
                }
            },
            Message::Response(_) => None,
        };

        for observer in &self.observers {
            observer.on_complete(&message);
        }

        Outcome::Success {
            message,
            response,
            consumed: before - buf.len(),
        }
    }

    fn run_tls_stage(&mut self, buf: &mut BytesMut) -> Result<(), Outcome> {
        let Some(session) = self.tls.as_mut() else {
            return Ok(());
        };

        if !session.is_handshake_complete() {
            match session.handshake(buf) {
                HandshakeStatus::Complete => {
                    self.notify_ssl("handshake complete", "session established");
                }
                HandshakeStatus::NeedMoreData => {
                    self.notify_ssl("handshake pending", "waiting for more records");
                    return Err(Outcome::SslNeedMoreData);
                }
                HandshakeStatus::Failed => {
                    self.notify_ssl("handshake failed", "closing connection");
                    return Err(Outcome::SslHandshakeFailed);
                }
            }
        }

        let Some(session) = self.tls.as_mut() else {
            return Ok(());
        };
        match session.decrypt(buf, &mut self.plaintext) {
            DecryptStatus::Ok => {
                self.notify_ssl("decrypted", "application data staged");
                Ok(())
            }
            DecryptStatus::NeedMoreData => Err(Outcome::SslNeedMoreData),
            DecryptStatus::Failed => {
                self.notify_ssl("decrypt failed", "closing connection");
                Err(Outcome::SslHandshakeFailed)
            }
        }
    }

    fn notify_ssl(&self, event: &str, details: &str) {
        for observer in &self.observers {
            observer.on_ssl(event, details);
        }
    }

    fn notify_parse(&self, event: &str, details: &str) {
        for observer in &self.observers {
            observer.on_parse(event, details);
        }
    }

    fn notify_validation(&self, event: &str, details: &str) {
        for observer in &self.observers {
            observer.on_validation(event, details);
        }
    }

    fn notify_routing(&self, event: &str, details: &str) {
        for observer in &self.observers {
            observer.on_routing(event, details);
        }
    }
}

fn describe(message: &Message) -> String {
    match message.as_request() {
        Some(req) => format!(
            "{} {} {}",
            req.method.as_str(),
            req.path(),
            req.version.as_str()
        ),
        None => "response message".to_string(),
    }
}
