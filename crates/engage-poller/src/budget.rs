//! Bridges `engage-store`'s persisted throttle settings/counts to the pure
//! `engage-throttle` oracle.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use engage_schemas::{Channel, WorkWindow};
use engage_throttle::{BudgetDecision, ThrottleInput};
use sqlx::PgPool;
use uuid::Uuid;

/// Fetch the counts the oracle needs and evaluate today's send budget for
/// this tenant/channel.
pub async fn compute_budget(
    pool: &PgPool,
    channel: Channel,
    company_id: Uuid,
    now: DateTime<Utc>,
) -> Result<BudgetDecision> {
    let row = engage_store::fetch_throttle_settings(pool, company_id, channel)
        .await
        .context("compute_budget: fetch_throttle_settings failed")?
        .ok_or_else(|| anyhow!("no throttle settings for company {company_id} channel {channel:?}"))?;

    let sent_last_hour = engage_store::count_sent_since(pool, channel, company_id, now - Duration::hours(1))
        .await
        .context("compute_budget: count_sent_since (hour) failed")?;
    let sent_last_day = engage_store::count_sent_since(pool, channel, company_id, now - Duration::days(1))
        .await
        .context("compute_budget: count_sent_since (day) failed")?;

    let work_window = match (row.work_window_start_minute, row.work_window_end_minute) {
        (Some(start), Some(end)) => Some(WorkWindow {
            start_minute: start as u16,
            end_minute: end as u16,
        }),
        _ => None,
    };

    let settings = engage_schemas::ThrottleSettings {
        company_id,
        channel,
        enabled: row.enabled,
        max_per_hour: row.max_per_hour as i64,
        max_per_day: row.max_per_day as i64,
        work_window,
        timezone: Some(row.timezone),
    };

    let input = ThrottleInput::new(sent_last_hour, sent_last_day);
    Ok(engage_throttle::evaluate(&settings, &input))
}
