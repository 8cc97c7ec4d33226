//! keystone: an HTTP/1.1 server engine.
//!
//! Turns a raw, possibly fragmented byte stream into structured messages,
//! validates them and dispatches them through a pattern-matching router:
//!
//! - [`http`]: message model, incremental parser, connection handling
//! - [`router`]: trie-based routing with parameters, wildcards and middleware
//! - [`validation`]: protocol and security validation chain
//! - [`pipeline`]: the orchestrator sequencing TLS → parse → validate → route
//! - [`config`] / [`server`]: configuration and the tokio accept loop

pub mod config;
pub mod http;
pub mod pipeline;
pub mod router;
pub mod server;
pub mod validation;
