use bytes::BytesMut;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::pipeline::{Outcome, Pipeline, RouteFailure};

pub struct Connection {
    stream: TcpStream,
    buffer: BytesMut,
    pipeline: Pipeline,
    state: ConnectionState,
}

pub enum ConnectionState {
    /// Drive the pipeline over whatever is already buffered.
    Processing,
    /// Wait for more bytes from the peer.
    Reading,
    /// Flush a response, then either loop or close.
    Writing(ResponseWriter, bool), // bool = keep_alive?
    Closed,
}

impl Connection {
    pub fn new(stream: TcpStream, pipeline: Pipeline) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(4096),
            pipeline,
            state: ConnectionState::Processing,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            match &mut self.state {
                // Processing before Reading means a single read carrying
                // several pipelined requests is drained without waiting for
                // the socket in between.
                ConnectionState::Processing => {
                    self.state = self.advance()?;
                }

                ConnectionState::Reading => {
                    let mut temp = [0u8; 4096];
                    let n = self.stream.read(&mut temp).await?;

                    if n == 0 {
                        // Client closed the connection
                        self.state = ConnectionState::Closed;
                    } else {
                        self.buffer.extend_from_slice(&temp[..n]);
                        self.state = ConnectionState::Processing;
                    }
                }

                ConnectionState::Writing(writer, keep_alive) => {
                    writer.write_to_stream(&mut self.stream).await?;

                    if *keep_alive {
                        self.state = ConnectionState::Processing;
                    } else {
                        self.state = ConnectionState::Closed;
                    }
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Runs one pipeline pass and decides the next connection state. Every
    /// outcome is handled here: this match is the single dispatch point the
    /// error taxonomy was designed for.
    fn advance(&mut self) -> anyhow::Result<ConnectionState> {
        match self.pipeline.process(&mut self.buffer) {
            Outcome::Success { message, response, .. } => {
                let keep_alive = message
                    .as_request()
                    .map(|req| req.keep_alive())
                    .unwrap_or(false);
                match response {
                    Some(response) => self.respond(response, keep_alive),
                    // A response message has nothing to answer; look for the
                    // next pipelined message.
                    None => Ok(ConnectionState::Processing),
                }
            }

            Outcome::NeedMoreData | Outcome::SslNeedMoreData => Ok(ConnectionState::Reading),

            Outcome::ParseFailed(e) => {
                tracing::warn!(error = %e, "malformed message, closing connection");
                self.respond(Response::bad_request(), false)
            }

            Outcome::ValidationFailed => {
                tracing::warn!("message failed validation, closing connection");
                self.respond(Response::bad_request(), false)
            }

            // Not-found and method-not-allowed are ordinary results; the
            // connection survives them.
            Outcome::RoutingFailed(RouteFailure::NotFound) => {
                self.respond(Response::not_found(), true)
            }

            Outcome::RoutingFailed(RouteFailure::MethodNotAllowed(allowed)) => {
                self.respond(Response::method_not_allowed(&allowed), true)
            }

            Outcome::RoutingFailed(RouteFailure::MiddlewareRejected) => {
                self.respond(Response::forbidden(), false)
            }

            Outcome::RoutingFailed(RouteFailure::HandlerRejected) | Outcome::UnknownError => {
                self.respond(Response::internal_error(), false)
            }

            Outcome::SslHandshakeFailed => Ok(ConnectionState::Closed),
        }
    }

    /// Finalizes framing headers, encrypts when the session calls for it and
    /// queues the bytes for writing.
    fn respond(
        &mut self,
        mut response: Response,
        keep_alive: bool,
    ) -> anyhow::Result<ConnectionState> {
        if !response.headers.contains("Content-Length") {
            response
                .headers
                .set("Content-Length", &response.body.len().to_string());
        }
        response
            .headers
            .set("Connection", if keep_alive { "keep-alive" } else { "close" });

        let payload = self.pipeline.encrypt_outbound(&response.serialize())?;
        Ok(ConnectionState::Writing(
            ResponseWriter::with_payload(payload),
            keep_alive,
        ))
    }
}
