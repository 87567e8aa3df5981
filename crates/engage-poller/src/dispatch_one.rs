//! Channel dispatcher skeleton (C4): resolve gates, generate content, write
//! the log row first, send, and terminate or requeue.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use engage_dispatch::{
    next_schedule, should_retry, ContentContext, ContentGenerator, DispatchGateway, DispatchError,
    GateVerdicts, GatewayError, SendRequest, Transport,
};
use engage_schemas::{Channel, QueueStatus, RunStatus};
use engage_store::QueueItemRow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::pause_registry::PauseRegistry;

/// Refused-at-the-gateway sends are requeued on a short fixed delay rather
/// than burning a retry count — the item itself was never attempted.
const GATE_REFUSAL_RETRY_DELAY: Duration = Duration::minutes(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Requeued,
    Failed,
}

async fn resolve_gate_verdicts(
    pool: &PgPool,
    pause_registry: &PauseRegistry,
    item: &QueueItemRow,
    now: DateTime<Utc>,
) -> Result<GateVerdicts> {
    let run = engage_store::fetch_run(pool, item.run_id)
        .await
        .context("resolve_gate_verdicts: fetch_run failed")?;

    let pause = pause_registry.get(item.company_id, item.channel);
    let lease_valid = item
        .lease_expires_at_utc
        .map(|expires| now < expires)
        .unwrap_or(true);

    // A reminder item's run has typically already reached `completed` by the
    // time its cadence fires days later — only `cancelled` actually blocks a
    // send, matching the gateway's own documented "has not been cancelled"
    // contract rather than requiring the run to still be `running`.
    Ok(GateVerdicts {
        channel_active: pause.is_active(),
        lease_valid,
        run_active: run.status != RunStatus::Cancelled,
    })
}

/// Resolve the parent log id for this send. An `initial`-stage email's log
/// id is derived deterministically from `(run_id, lead_id)` and inserted
/// idempotently, so a retry after a transient failure reuses the same
/// `email_logs` row instead of orphaning a fresh one per attempt. A reminder
/// stage (`parent_log_id` set) reuses the original row so its detail rows
/// accumulate under one thread and its cadence fields can be stamped after
/// send. Call/LinkedIn never carry reminders (C7 operates on `email_logs`
/// only) so they always derive fresh from the queue item id.
async fn resolve_log_id(pool: &PgPool, channel: Channel, item: &QueueItemRow) -> Result<Uuid> {
    match (channel, item.parent_log_id) {
        (Channel::Email, Some(parent_log_id)) => Ok(parent_log_id),
        (Channel::Email, None) => {
            let log_id = Uuid::new_v5(
                &Uuid::NAMESPACE_DNS,
                format!("engage-poller.email-log.v1|{}|{}", item.run_id, item.lead_id).as_bytes(),
            );
            engage_store::insert_email_log(pool, log_id, item.company_id, item.campaign_id, item.lead_id, item.run_id)
                .await
                .context("resolve_log_id: insert_email_log failed")?;
            Ok(log_id)
        }
        (Channel::Call, _) => {
            let log_id = Uuid::new_v4();
            engage_store::insert_call_log(pool, log_id, item.campaign_id, item.lead_id, None)
                .await
                .context("resolve_log_id: insert_call_log failed")?;
            Ok(log_id)
        }
        (Channel::Linkedin, _) => {
            let log_id = Uuid::new_v4();
            engage_store::insert_linkedin_message(pool, log_id, item.campaign_id, item.lead_id, "message", None)
                .await
                .context("resolve_log_id: insert_linkedin_message failed")?;
            Ok(log_id)
        }
    }
}

async fn write_log_detail(
    pool: &PgPool,
    channel: Channel,
    log_id: Uuid,
    item: &QueueItemRow,
    provider_message_id: Option<&str>,
    subject: Option<&str>,
    body: &str,
) -> Result<()> {
    match channel {
        Channel::Email => {
            engage_store::insert_email_log_detail(
                pool,
                Uuid::new_v4(),
                log_id,
                &item.stage,
                provider_message_id,
                subject,
                Some(body),
            )
            .await
        }
        // Call/LinkedIn logs carry the provider id directly on the parent row;
        // no detail table exists for them, so stamp the parent instead.
        Channel::Call => match provider_message_id {
            Some(id) => engage_store::set_call_log_provider_id(pool, log_id, id).await,
            None => Ok(()),
        },
        Channel::Linkedin => match provider_message_id {
            Some(id) => engage_store::set_linkedin_message_provider_id(pool, log_id, id).await,
            None => Ok(()),
        },
    }
    .context("write_log_detail failed")
}

/// Dispatch one leased item end to end. Never panics on a classified
/// failure — the outcome is always one of [`DispatchOutcome`].
pub async fn dispatch_one<T, G>(
    pool: &PgPool,
    gateway: &DispatchGateway<T>,
    content_gen: &G,
    pause_registry: &PauseRegistry,
    item: &QueueItemRow,
    now: DateTime<Utc>,
) -> Result<DispatchOutcome>
where
    T: Transport,
    G: ContentGenerator,
{
    let verdicts = resolve_gate_verdicts(pool, pause_registry, item, now).await?;

    let ctx = ContentContext {
        company_id: item.company_id,
        campaign_id: item.campaign_id,
        lead_id: item.lead_id,
        channel: item.channel,
        stage: item.stage.clone(),
    };

    let content = match content_gen.generate(&ctx) {
        Ok(c) => c,
        Err(e) => return classify_and_finish(pool, item, &e, now).await,
    };

    let log_id = resolve_log_id(pool, item.channel, item).await?;

    let req = SendRequest {
        queue_item_id: item.id,
        company_id: item.company_id,
        lead_id: item.lead_id,
        channel: item.channel,
        content: content.clone(),
    };

    match gateway.send(&req, &verdicts) {
        Ok(resp) => {
            write_log_detail(
                pool,
                item.channel,
                log_id,
                item,
                resp.provider_message_id.as_deref(),
                content.subject.as_deref(),
                &content.body,
            )
            .await?;
            if item.channel == Channel::Email && item.parent_log_id.is_some() {
                engage_store::mark_reminder_sent(pool, log_id, &item.stage, now)
                    .await
                    .context("dispatch_one: mark_reminder_sent failed")?;
            }
            engage_store::terminate(pool, item.channel, item.id, QueueStatus::Sent, None)
                .await
                .context("dispatch_one: terminate sent failed")?;
            engage_store::increment_leads_processed(pool, item.run_id, 1)
                .await
                .context("dispatch_one: increment_leads_processed failed")?;
            Ok(DispatchOutcome::Sent)
        }
        Err(GatewayError::Refused(refusal)) => {
            engage_store::requeue(
                pool,
                item.channel,
                item.id,
                now + GATE_REFUSAL_RETRY_DELAY,
                item.retry_count,
                Some(&refusal.to_string()),
            )
            .await
            .context("dispatch_one: requeue on gate refusal failed")?;
            Ok(DispatchOutcome::Requeued)
        }
        Err(GatewayError::Dispatch(err)) => classify_and_finish(pool, item, &err, now).await,
    }
}

async fn classify_and_finish(
    pool: &PgPool,
    item: &QueueItemRow,
    err: &DispatchError,
    now: DateTime<Utc>,
) -> Result<DispatchOutcome> {
    let retry_count = item.retry_count as u32;
    if should_retry(err, retry_count, item.max_retries as u32) {
        let scheduled_for = next_schedule(now, item.channel, retry_count);
        engage_store::requeue(
            pool,
            item.channel,
            item.id,
            scheduled_for,
            item.retry_count + 1,
            Some(&err.to_string()),
        )
        .await
        .context("classify_and_finish: requeue failed")?;
        Ok(DispatchOutcome::Requeued)
    } else {
        engage_store::terminate(pool, item.channel, item.id, QueueStatus::Failed, Some(&err.to_string()))
            .await
            .context("classify_and_finish: terminate failed failed")?;
        Ok(DispatchOutcome::Failed)
    }
}
