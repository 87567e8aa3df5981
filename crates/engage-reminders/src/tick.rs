//! Reminder Scheduler (C7): periodic hourly sweep that enqueues follow-up
//! sends for email threads that have gone quiet past their stage's cadence.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use engage_schemas::Channel;
use engage_store::NewQueueItem;
use sqlx::PgPool;
use uuid::Uuid;

/// Matches the `email_queue.max_retries` column default — reminders are
/// ordinary queue items once enqueued and retry the same as any other send.
const DEFAULT_MAX_RETRIES: i32 = 3;
const DEFAULT_PRIORITY: i32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReminderTickSummary {
    pub campaigns_considered: usize,
    pub enqueued: usize,
}

/// Deterministic queue-item id for one reminder stage of one log. A second
/// sweep landing on the same eligible log before the first one's item has
/// left `pending` collides with `enqueue`'s `(run_id, lead_id, stage)` unique
/// constraint instead of silently double-enqueuing.
fn reminder_queue_item_id(email_log_id: Uuid, stage: &str) -> Uuid {
    let data = format!("engage-reminders.enqueue.v1|{email_log_id}|{stage}");
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, data.as_bytes())
}

/// One hourly sweep across every active campaign's reminder plan.
///
/// For each campaign with `n_reminders > 0`, walks stages `r1..=rN` in order
/// and enqueues a queue item for every eligible `email_logs` row at that
/// stage (see `fetch_eligible_reminder_logs` for the exact predicate). The
/// parent log's cadence fields are not touched here — that happens in C4
/// once the reminder is actually sent, not when it is merely queued.
pub async fn run_reminder_tick(pool: &PgPool, now: DateTime<Utc>) -> Result<ReminderTickSummary> {
    let campaign_ids = engage_store::list_active_campaign_ids(pool)
        .await
        .context("run_reminder_tick: list_active_campaign_ids failed")?;

    let mut summary = ReminderTickSummary::default();

    for campaign_id in campaign_ids {
        let campaign = engage_store::fetch_campaign(pool, campaign_id)
            .await
            .context("run_reminder_tick: fetch_campaign failed")?;

        if campaign.reminder_plan.n_reminders == 0 {
            continue;
        }
        summary.campaigns_considered += 1;

        for k in 1..=campaign.reminder_plan.n_reminders {
            let stage = format!("r{k}");
            let prior_stage = (k > 1).then(|| format!("r{}", k - 1));
            let days_between = campaign.reminder_plan.days_between_for(k);
            let cutoff = now - Duration::days(days_between);

            let logs =
                engage_store::fetch_eligible_reminder_logs(pool, campaign_id, prior_stage.as_deref(), cutoff)
                    .await
                    .context("run_reminder_tick: fetch_eligible_reminder_logs failed")?;

            for log in logs {
                let queued = engage_store::enqueue(
                    pool,
                    &NewQueueItem {
                        id: reminder_queue_item_id(log.email_log_id, &stage),
                        company_id: log.company_id,
                        campaign_id: log.campaign_id,
                        run_id: log.run_id,
                        lead_id: log.lead_id,
                        channel: Channel::Email,
                        stage: stage.clone(),
                        priority: DEFAULT_PRIORITY,
                        scheduled_for_utc: now,
                        max_retries: DEFAULT_MAX_RETRIES,
                        parent_log_id: Some(log.email_log_id),
                    },
                )
                .await
                .context("run_reminder_tick: enqueue failed")?;

                if queued {
                    summary.enqueued += 1;
                    tracing::info!(
                        campaign_id = %campaign_id,
                        lead_id = %log.lead_id,
                        stage = %stage,
                        "reminder enqueued"
                    );
                }
            }
        }
    }

    Ok(summary)
}
