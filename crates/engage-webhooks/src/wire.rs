//! Wire-level webhook payloads and normalization into [`WebhookEvent`] — wire
//! JSON to validated domain event, modeled on the teacher's broker-snapshot
//! adapter (`RawBrokerSnapshot` / `normalize`).
//!
//! Field names use `#[serde(tag = "event_type", rename_all = "snake_case")]`
//! so a single provider route can dispatch on one JSON body shape. Adapting
//! to a provider whose webhook schema differs requires only a new `Raw*`
//! variant and its `normalize` arm.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::types::{
    CallCompletionEvent, EmailBounceEvent, EmailOpenEvent, EmailReplyEvent, LinkedinAccountStatusEvent,
    LinkedinMessageEvent, WebhookEvent,
};

/// Errors surfaced by [`normalize`] beyond what `serde_json` already rejects
/// (missing/mistyped fields produce a `serde_json::Error` before `normalize`
/// ever runs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValidationError {
    /// A provider-assigned id field was present but empty.
    EmptyProviderId { event: &'static str, field: &'static str },
}

impl std::fmt::Display for WireValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyProviderId { event, field } => {
                write!(f, "{event} webhook has empty {field}")
            }
        }
    }
}

impl std::error::Error for WireValidationError {}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum RawWebhookEvent {
    EmailReply {
        company_id: Uuid,
        email_log_id: Uuid,
        event_at_utc: DateTime<Utc>,
    },
    EmailBounce {
        company_id: Uuid,
        lead_id: Uuid,
        event_at_utc: DateTime<Utc>,
    },
    EmailOpen {
        company_id: Uuid,
        email_log_id: Uuid,
        event_at_utc: DateTime<Utc>,
    },
    CallCompletion {
        company_id: Uuid,
        provider_call_id: String,
        #[serde(default)]
        duration_seconds: Option<i32>,
        #[serde(default)]
        sentiment: Option<String>,
        #[serde(default)]
        summary: Option<String>,
        #[serde(default)]
        transcript: Option<String>,
        #[serde(default)]
        recording_url: Option<String>,
        #[serde(default)]
        meeting_booked: bool,
        event_at_utc: DateTime<Utc>,
    },
    LinkedinAccountStatus {
        company_id: Uuid,
        connected: bool,
        event_at_utc: DateTime<Utc>,
    },
    LinkedinMessage {
        company_id: Uuid,
        provider_message_id: String,
        #[serde(default)]
        is_reply: bool,
        event_at_utc: DateTime<Utc>,
    },
}

/// Normalize one wire payload into a [`WebhookEvent`].
pub fn normalize(raw: RawWebhookEvent) -> Result<WebhookEvent, WireValidationError> {
    Ok(match raw {
        RawWebhookEvent::EmailReply {
            company_id,
            email_log_id,
            event_at_utc,
        } => WebhookEvent::EmailReply(EmailReplyEvent {
            company_id,
            email_log_id,
            event_at_utc,
        }),
        RawWebhookEvent::EmailBounce {
            company_id,
            lead_id,
            event_at_utc,
        } => WebhookEvent::EmailBounce(EmailBounceEvent {
            company_id,
            lead_id,
            event_at_utc,
        }),
        RawWebhookEvent::EmailOpen {
            company_id,
            email_log_id,
            event_at_utc,
        } => WebhookEvent::EmailOpen(EmailOpenEvent {
            company_id,
            email_log_id,
            event_at_utc,
        }),
        RawWebhookEvent::CallCompletion {
            company_id,
            provider_call_id,
            duration_seconds,
            sentiment,
            summary,
            transcript,
            recording_url,
            meeting_booked,
            event_at_utc,
        } => {
            if provider_call_id.trim().is_empty() {
                return Err(WireValidationError::EmptyProviderId {
                    event: "call_completion",
                    field: "provider_call_id",
                });
            }
            WebhookEvent::CallCompletion(CallCompletionEvent {
                company_id,
                provider_call_id,
                duration_seconds,
                sentiment,
                summary,
                transcript,
                recording_url,
                meeting_booked,
                event_at_utc,
            })
        }
        RawWebhookEvent::LinkedinAccountStatus {
            company_id,
            connected,
            event_at_utc,
        } => WebhookEvent::LinkedinAccountStatus(LinkedinAccountStatusEvent {
            company_id,
            connected,
            event_at_utc,
        }),
        RawWebhookEvent::LinkedinMessage {
            company_id,
            provider_message_id,
            is_reply,
            event_at_utc,
        } => {
            if provider_message_id.trim().is_empty() {
                return Err(WireValidationError::EmptyProviderId {
                    event: "linkedin_message",
                    field: "provider_message_id",
                });
            }
            WebhookEvent::LinkedinMessage(LinkedinMessageEvent {
                company_id,
                provider_message_id,
                is_reply,
                event_at_utc,
            })
        }
    })
}

/// Deserialize a JSON webhook body directly into a [`WebhookEvent`].
pub fn normalize_json(json: &str) -> anyhow::Result<WebhookEvent> {
    let raw: RawWebhookEvent = serde_json::from_str(json)?;
    let event = normalize(raw)?;
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_reply_round_trips() {
        let json = r#"{
            "event_type": "email_reply",
            "company_id": "11111111-1111-1111-1111-111111111111",
            "email_log_id": "22222222-2222-2222-2222-222222222222",
            "event_at_utc": "2026-01-01T00:00:00Z"
        }"#;
        let event = normalize_json(json).unwrap();
        assert!(matches!(event, WebhookEvent::EmailReply(_)));
    }

    #[test]
    fn empty_provider_call_id_is_rejected() {
        let json = r#"{
            "event_type": "call_completion",
            "company_id": "11111111-1111-1111-1111-111111111111",
            "provider_call_id": "",
            "meeting_booked": false,
            "event_at_utc": "2026-01-01T00:00:00Z"
        }"#;
        let raw: RawWebhookEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(
            normalize(raw),
            Err(WireValidationError::EmptyProviderId { .. })
        ));
    }

    #[test]
    fn unknown_event_type_fails_to_deserialize() {
        let json = r#"{"event_type": "carrier_pigeon"}"#;
        assert!(serde_json::from_str::<RawWebhookEvent>(json).is_err());
    }
}
