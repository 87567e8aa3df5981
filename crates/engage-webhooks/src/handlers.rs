//! Apply one webhook event: gate for duplicate/out-of-order delivery, then
//! mutate state. Every handler below is itself idempotent (flag flips,
//! coalesced timestamps, `where status = 'pending'` updates), so the gate is
//! a short-circuit rather than the only line of defense.

use anyhow::{Context, Result};
use engage_guard::PauseReason;
use engage_poller::PauseRegistry;
use engage_schemas::Channel;
use sqlx::PgPool;

use crate::types::WebhookEvent;
use crate::watermark::{gate_monotonic, IngestOutcome};

const BOUNCE_ERROR: &str = "bounced";

/// Apply `event`, gated by delivery-order. Returns the gate's verdict so
/// callers can log a skipped-as-stale delivery distinctly from an applied one.
pub async fn apply_event(
    pool: &PgPool,
    pause_registry: &PauseRegistry,
    event: &WebhookEvent,
) -> Result<IngestOutcome> {
    let outcome = gate_monotonic(pool, event.company_id(), event.channel(), event.provider(), event.event_at_utc())
        .await
        .context("apply_event: gate_monotonic failed")?;

    if outcome.is_rejected() {
        return Ok(outcome);
    }

    match event {
        WebhookEvent::EmailReply(e) => {
            engage_store::mark_email_replied(pool, e.email_log_id, e.event_at_utc)
                .await
                .context("apply_event: mark_email_replied failed")?;
        }
        WebhookEvent::EmailBounce(e) => {
            engage_store::mark_lead_bounced(pool, e.lead_id)
                .await
                .context("apply_event: mark_lead_bounced failed")?;
            engage_store::fail_pending_for_lead(pool, Channel::Email, e.lead_id, BOUNCE_ERROR)
                .await
                .context("apply_event: fail_pending_for_lead failed")?;
        }
        WebhookEvent::EmailOpen(e) => {
            engage_store::mark_email_opened(pool, e.email_log_id)
                .await
                .context("apply_event: mark_email_opened failed")?;
        }
        WebhookEvent::CallCompletion(e) => {
            let matched = engage_store::apply_call_completion(
                pool,
                &e.provider_call_id,
                e.duration_seconds,
                e.sentiment.as_deref(),
                e.summary.as_deref(),
                e.transcript.as_deref(),
                e.recording_url.as_deref(),
                e.event_at_utc,
            )
            .await
            .context("apply_event: apply_call_completion failed")?;

            if let Some((_, campaign_id, lead_id)) = matched {
                if e.meeting_booked {
                    engage_store::mark_meeting_booked(pool, campaign_id, lead_id)
                        .await
                        .context("apply_event: mark_meeting_booked failed")?;
                }
            } else {
                tracing::warn!(provider_call_id = %e.provider_call_id, "call completion webhook matched no call log");
            }
        }
        WebhookEvent::LinkedinAccountStatus(e) => {
            if e.connected {
                pause_registry.reconnect(e.company_id, Channel::Linkedin);
            } else {
                pause_registry.pause(e.company_id, Channel::Linkedin, PauseReason::Disconnected);
            }
        }
        WebhookEvent::LinkedinMessage(e) => {
            let matched = engage_store::mark_linkedin_replied(pool, &e.provider_message_id, e.event_at_utc)
                .await
                .context("apply_event: mark_linkedin_replied failed")?;

            match matched {
                Some((campaign_id, lead_id)) if e.is_reply => {
                    engage_store::mark_replied_for_lead(pool, campaign_id, lead_id, e.event_at_utc)
                        .await
                        .context("apply_event: mark_replied_for_lead failed")?;
                }
                Some(_) => {}
                None => {
                    tracing::warn!(
                        provider_message_id = %e.provider_message_id,
                        "linkedin message webhook matched no outreach"
                    );
                }
            }
        }
    }

    Ok(outcome)
}
