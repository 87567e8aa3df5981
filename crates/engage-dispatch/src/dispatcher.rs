//! Dispatcher: the thin, deterministic boundary between the poller and a
//! channel's transport.
//!
//! # Purpose
//! Isolates channel-specific delivery (email/call/LinkedIn) from routing,
//! logging, and error classification, which stay here and are identical
//! across channels. A single generic `Dispatcher<T>` is driven by whichever
//! `Transport` the caller wires in — a production transport per channel, or
//! a fake for tests.

use crate::types::{DispatchError, SendRequest, SendResponse};

/// The per-channel transport contract. One production implementor per
/// channel (email/call/LinkedIn), plus a fake used by tests and local runs.
pub trait Transport {
    /// Send a single message. Implementations must treat `req.queue_item_id`
    /// as the idempotency key where the provider supports one, so a retried
    /// send after a timeout does not double-deliver.
    fn send(&self, req: &SendRequest) -> Result<SendResponse, DispatchError>;
}

/// Generic router that delegates to whichever transport it was built with.
///
/// Deliberately thin: no gating, no retry policy, no persistence. Those
/// concerns live in [`crate::gateway::DispatchGateway`] and the retry/backoff
/// manager respectively.
pub struct Dispatcher<T: Transport> {
    transport: T,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Route a send request to the underlying transport.
    pub fn dispatch(&self, req: &SendRequest) -> Result<SendResponse, DispatchError> {
        self.transport.send(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engage_schemas::Channel;
    use std::cell::RefCell;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingTransport {
        sent: RefCell<Vec<SendRequest>>,
    }

    impl Transport for RecordingTransport {
        fn send(&self, req: &SendRequest) -> Result<SendResponse, DispatchError> {
            self.sent.borrow_mut().push(req.clone());
            Ok(SendResponse {
                provider_message_id: Some(format!("prov-{}", req.queue_item_id)),
                sent_at: Utc::now(),
            })
        }
    }

    fn req() -> SendRequest {
        SendRequest {
            queue_item_id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            lead_id: Uuid::new_v4(),
            channel: Channel::Email,
            content: crate::types::Content::new("hello"),
        }
    }

    #[test]
    fn dispatch_delegates_to_transport() {
        let dispatcher = Dispatcher::new(RecordingTransport::default());
        let r = req();
        let resp = dispatcher.dispatch(&r).unwrap();
        assert!(resp.provider_message_id.unwrap().starts_with("prov-"));
        assert_eq!(dispatcher.transport.sent.borrow().len(), 1);
    }
}
