//! `Send + Sync` transport used to wire the CLI and daemon's queue loops end
//! to end ahead of real SMTP/telephony/LinkedIn clients.
//! [`FakeTransport`](crate::FakeTransport) uses `RefCell` for single-threaded
//! tests; the poller's per-channel loop is `tokio::spawn`ed, so its
//! transport must be `Sync` too — same idempotency-by-`queue_item_id`
//! behavior, backed by a `Mutex` instead.
//!
//! Swapping in a real transport means implementing `Transport` against an
//! HTTP client and wiring it in at the same call site; nothing upstream of
//! `Transport::send` changes. `FakeContentGenerator` (deterministic, no
//! interior mutability) is already `Sync` and is reused as-is for this
//! wiring.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;
use engage_dispatch::{DispatchError, SendRequest, SendResponse, Transport};

use crate::types::SentMessage;

#[derive(Debug, Default)]
pub struct LoggingTransport {
    sent: Mutex<BTreeMap<uuid::Uuid, SentMessage>>,
}

impl LoggingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("logging transport lock poisoned").values().cloned().collect()
    }
}

impl Transport for LoggingTransport {
    fn send(&self, req: &SendRequest) -> Result<SendResponse, DispatchError> {
        let mut sent = self.sent.lock().expect("logging transport lock poisoned");
        if let Some(existing) = sent.get(&req.queue_item_id) {
            return Ok(SendResponse {
                provider_message_id: Some(existing.provider_message_id.clone()),
                sent_at: existing.sent_at,
            });
        }

        let provider_message_id = format!("stub:{}:{}", req.channel.as_str(), req.queue_item_id);
        let sent_at = Utc::now();
        tracing::info!(
            channel = req.channel.as_str(),
            queue_item_id = %req.queue_item_id,
            provider_message_id = %provider_message_id,
            "stub transport send"
        );
        sent.insert(
            req.queue_item_id,
            SentMessage {
                queue_item_id: req.queue_item_id,
                channel: req.channel,
                body: req.content.body.clone(),
                provider_message_id: provider_message_id.clone(),
                sent_at,
            },
        );

        Ok(SendResponse {
            provider_message_id: Some(provider_message_id),
            sent_at,
        })
    }
}
