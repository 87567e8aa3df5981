//! Domain events accepted by the Webhook Ingestor (C8). One variant per
//! provider callback this system understands.

use chrono::{DateTime, Utc};
use engage_schemas::Channel;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq)]
pub struct EmailReplyEvent {
    pub company_id: Uuid,
    pub email_log_id: Uuid,
    pub event_at_utc: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EmailBounceEvent {
    pub company_id: Uuid,
    pub lead_id: Uuid,
    pub event_at_utc: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EmailOpenEvent {
    pub company_id: Uuid,
    pub email_log_id: Uuid,
    pub event_at_utc: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallCompletionEvent {
    pub company_id: Uuid,
    pub provider_call_id: String,
    pub duration_seconds: Option<i32>,
    pub sentiment: Option<String>,
    pub summary: Option<String>,
    pub transcript: Option<String>,
    pub recording_url: Option<String>,
    pub meeting_booked: bool,
    pub event_at_utc: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkedinAccountStatusEvent {
    pub company_id: Uuid,
    /// `true` when the provider reports the account reconnected; `false` on
    /// disconnect.
    pub connected: bool,
    pub event_at_utc: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkedinMessageEvent {
    pub company_id: Uuid,
    pub provider_message_id: String,
    pub is_reply: bool,
    pub event_at_utc: DateTime<Utc>,
}

/// Every provider callback this system accepts (§4.8): email reply/bounce/
/// open, call completion, LinkedIn account status, LinkedIn message received.
#[derive(Clone, Debug, PartialEq)]
pub enum WebhookEvent {
    EmailReply(EmailReplyEvent),
    EmailBounce(EmailBounceEvent),
    EmailOpen(EmailOpenEvent),
    CallCompletion(CallCompletionEvent),
    LinkedinAccountStatus(LinkedinAccountStatusEvent),
    LinkedinMessage(LinkedinMessageEvent),
}

impl WebhookEvent {
    pub fn company_id(&self) -> Uuid {
        match self {
            WebhookEvent::EmailReply(e) => e.company_id,
            WebhookEvent::EmailBounce(e) => e.company_id,
            WebhookEvent::EmailOpen(e) => e.company_id,
            WebhookEvent::CallCompletion(e) => e.company_id,
            WebhookEvent::LinkedinAccountStatus(e) => e.company_id,
            WebhookEvent::LinkedinMessage(e) => e.company_id,
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            WebhookEvent::EmailReply(_) | WebhookEvent::EmailBounce(_) | WebhookEvent::EmailOpen(_) => {
                Channel::Email
            }
            WebhookEvent::CallCompletion(_) => Channel::Call,
            WebhookEvent::LinkedinAccountStatus(_) | WebhookEvent::LinkedinMessage(_) => Channel::Linkedin,
        }
    }

    pub fn event_at_utc(&self) -> DateTime<Utc> {
        match self {
            WebhookEvent::EmailReply(e) => e.event_at_utc,
            WebhookEvent::EmailBounce(e) => e.event_at_utc,
            WebhookEvent::EmailOpen(e) => e.event_at_utc,
            WebhookEvent::CallCompletion(e) => e.event_at_utc,
            WebhookEvent::LinkedinAccountStatus(e) => e.event_at_utc,
            WebhookEvent::LinkedinMessage(e) => e.event_at_utc,
        }
    }

    /// Watermark stream key, scoped narrower than `channel()`: reply/bounce/
    /// open on the same channel are independent delivery streams and must
    /// not gate one another's ordering.
    pub fn provider(&self) -> &'static str {
        match self {
            WebhookEvent::EmailReply(_) => "email_reply",
            WebhookEvent::EmailBounce(_) => "email_bounce",
            WebhookEvent::EmailOpen(_) => "email_open",
            WebhookEvent::CallCompletion(_) => "call_completion",
            WebhookEvent::LinkedinAccountStatus(_) => "linkedin_account_status",
            WebhookEvent::LinkedinMessage(_) => "linkedin_message",
        }
    }
}
