use std::sync::Arc;

use crate::http::message::Message;

/// Observes the lifecycle of message processing. Every stage of the pipeline
/// reports what happened; `on_complete` fires once per fully processed
/// message. All methods default to no-ops so an observer implements only
/// what it cares about.
pub trait HttpObserver: Send + Sync {
    fn on_ssl(&self, _event: &str, _details: &str) {}
    fn on_parse(&self, _event: &str, _details: &str) {}
    fn on_validation(&self, _event: &str, _details: &str) {}
    fn on_routing(&self, _event: &str, _details: &str) {}
    fn on_complete(&self, _message: &Message) {}
}

/// Forwards pipeline events to `tracing`.
pub struct LoggingObserver;

impl HttpObserver for LoggingObserver {
    fn on_ssl(&self, event: &str, details: &str) {
        tracing::debug!(stage = "ssl", event, details);
    }

    fn on_parse(&self, event: &str, details: &str) {
        tracing::debug!(stage = "parse", event, details);
    }

    fn on_validation(&self, event: &str, details: &str) {
        tracing::debug!(stage = "validation", event, details);
    }

    fn on_routing(&self, event: &str, details: &str) {
        tracing::debug!(stage = "routing", event, details);
    }

    fn on_complete(&self, message: &Message) {
        match message.as_request() {
            Some(req) => tracing::info!(
                method = req.method.as_str(),
                path = %req.path(),
                version = req.version.as_str(),
                "request processed"
            ),
            None => tracing::info!("response processed"),
        }
    }
}

/// Shared observer handle, compared by identity for removal.
pub type ObserverHandle = Arc<dyn HttpObserver>;
