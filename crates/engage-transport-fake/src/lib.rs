//! Deterministic in-memory fake transport — implements `engage_dispatch::Transport`
//! for tests and local runs without a real email/telephony/LinkedIn provider.
//!
//! Design decisions (kept intentionally simple/deterministic):
//! - `provider_message_id` is derived from request inputs: `"fake:{channel}:{queue_item_id}"`.
//! - Submitting the same `queue_item_id` twice is idempotent: the second call
//!   returns the same response without recording a second message.
//! - No randomness. The clock is injectable so tests control `sent_at` exactly;
//!   production wiring lets it default to the system clock.
//! - Failures are not auto-generated. Call [`FakeTransport::fail_next`] to make
//!   the next `send` return a specific `DispatchError`, for testing the C5
//!   retry/backoff manager and error classification end to end.

use std::cell::RefCell;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use engage_dispatch::{Content, ContentContext, ContentGenerator, DispatchError, SendRequest, SendResponse, Transport};

pub mod logging;
pub mod types;

pub use logging::LoggingTransport;
use types::SentMessage;

#[derive(Debug, Default)]
pub struct FakeTransport {
    sent: RefCell<BTreeMap<uuid::Uuid, SentMessage>>,
    next_failure: RefCell<Option<DispatchError>>,
    fixed_now: RefCell<Option<DateTime<Utc>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the clock for deterministic `sent_at` values in tests.
    pub fn with_fixed_clock(now: DateTime<Utc>) -> Self {
        let t = Self::new();
        *t.fixed_now.borrow_mut() = Some(now);
        t
    }

    /// Make the next `send` call return `error` instead of succeeding.
    /// Consumed on use; subsequent calls succeed normally unless set again.
    pub fn fail_next(&self, error: DispatchError) {
        *self.next_failure.borrow_mut() = Some(error);
    }

    fn now(&self) -> DateTime<Utc> {
        self.fixed_now.borrow().unwrap_or_else(Utc::now)
    }

    /// Deterministic listing: `BTreeMap` iteration order is stable by queue item id.
    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.borrow().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sent.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.borrow().is_empty()
    }
}

impl Transport for FakeTransport {
    fn send(&self, req: &SendRequest) -> Result<SendResponse, DispatchError> {
        if let Some(err) = self.next_failure.borrow_mut().take() {
            return Err(err);
        }

        if let Some(existing) = self.sent.borrow().get(&req.queue_item_id) {
            return Ok(SendResponse {
                provider_message_id: Some(existing.provider_message_id.clone()),
                sent_at: existing.sent_at,
            });
        }

        let provider_message_id = format!(
            "fake:{}:{}",
            req.channel.as_str(),
            req.queue_item_id
        );
        let sent_at = self.now();

        let record = SentMessage {
            queue_item_id: req.queue_item_id,
            channel: req.channel,
            body: req.content.body.clone(),
            provider_message_id: provider_message_id.clone(),
            sent_at,
        };
        self.sent.borrow_mut().insert(req.queue_item_id, record);

        Ok(SendResponse {
            provider_message_id: Some(provider_message_id),
            sent_at,
        })
    }
}

/// Deterministic content generator: renders `"{channel}/{stage} message for {lead_id}"`.
/// No AI call, no templating engine — just enough to exercise C4's
/// generate-then-send pipeline in tests.
#[derive(Debug, Default)]
pub struct FakeContentGenerator;

impl ContentGenerator for FakeContentGenerator {
    fn generate(&self, ctx: &ContentContext) -> Result<Content, DispatchError> {
        let body = format!(
            "{}/{} message for lead {}",
            ctx.channel.as_str(),
            ctx.stage,
            ctx.lead_id
        );
        Ok(match ctx.channel {
            engage_schemas::Channel::Email => {
                Content::with_subject(format!("Following up: {}", ctx.stage), body)
            }
            engage_schemas::Channel::Call | engage_schemas::Channel::Linkedin => Content::new(body),
        })
    }
}
