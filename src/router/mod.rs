//! Request routing.
//!
//! # Data flow
//! ```text
//! Incoming request (method, normalized path)
//!     → middleware (global, then per-path; any veto stops here)
//!     → static index (O(1) probe for fully static paths)
//!     → trie walk (exact → parameter → wildcard, with backtracking)
//!     → Matched / NotFound / MethodNotAllowed(allow set)
//! ```
//!
//! # Design decisions
//! - Routes are registered at startup through `&mut self` and the finished
//!   table is shared as `Arc<Router>`; matching never locks.
//! - Most-specific pattern wins: exact segments beat parameters, parameters
//!   beat wildcards, and a longer fully-matching pattern beats a shorter one.
//! - A failed walk still collects every method registered at the path so a
//!   405 can enumerate them.

pub mod node;
pub mod router;

pub use node::{Handler, Middleware, RouteNode, RouteParams};
pub use router::{RouteGroup, RouteOutcome, Router, normalize_path};
