//! HTTP protocol implementation.
//!
//! This module owns the message data model and the byte-level protocol work:
//! turning a raw, arbitrarily fragmented byte stream into structured
//! [`message::Message`] values and serializing responses back out.
//!
//! # Architecture
//!
//! - **`message`**: the shared message model: versions, content codings, the
//!   ordered case-insensitive header collection, and the request/response
//!   tagged variant
//! - **`request`** / **`response`**: the two message kinds with their
//!   variant-specific state (method/url/path/query vs. status code/reason)
//! - **`parser`**: the incremental HTTP/1.x parser state machine
//! - **`connection`**: the per-connection handler driving the processing
//!   pipeline over a receive buffer
//! - **`writer`**: serializes and writes responses to the client
//!
//! # Parser state machine
//!
//! Each message walks the parser through these states, suspending with
//! `NeedMoreData` whenever the buffered bytes run out mid-state:
//!
//! ```text
//!        ┌───────────┐
//!        │ StartLine │ ← request line or status line
//!        └─────┬─────┘
//!              ▼
//!        ┌───────────┐   blank line, framing decision
//!        │  Headers  ├──────────────┬─────────────────────┐
//!        └───────────┘              │                     │
//!              │ no body            ▼                     ▼
//!              │         ┌───────────────────┐  ┌─────────────────┐
//!              │         │ BodyContentLength │  │ BodyChunkedSize │⇄─┐
//!              │         └─────────┬─────────┘  └────────┬────────┘  │
//!              │                   │              size 0 │           │
//!              │                   │                     ▼           │
//!              │                   │            ┌────────────────┐   │
//!              │                   │            │ BodyChunkedEnd │   │
//!              │                   │            └────────┬───────┘   │
//!              │                   │                     │  ┌────────┴────────┐
//!              ▼                   ▼                     ▼  │ BodyChunkedData │
//!          message complete, per-message state resets       └─────────────────┘
//! ```

pub mod connection;
pub mod message;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
