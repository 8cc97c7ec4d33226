//! The request processing pipeline.
//!
//! One [`engine::Pipeline`] per connection drives the fixed stage sequence
//!
//! ```text
//! raw bytes → [TLS decrypt] → parse → validate → route → observers
//! ```
//!
//! over the connection's receive buffer, returning a single
//! [`engine::Outcome`] per call. Every stage failure short-circuits the rest;
//! every outcome is data, never an unwound error, so the connection layer
//! dispatches with one exhaustive `match`.

pub mod engine;
pub mod observer;
pub mod tls;

pub use engine::{Outcome, Pipeline, RouteFailure};
pub use observer::{HttpObserver, LoggingObserver, ObserverHandle};
pub use tls::{DecryptStatus, HandshakeStatus, TlsError, TlsSession, looks_like_tls_record};
