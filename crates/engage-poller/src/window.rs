//! Bridges `engage-store`'s persisted work-window settings to the pure
//! `engage-guard` eligibility check.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use engage_guard::{in_window, local_minute_of_day};
use engage_schemas::{Channel, WorkWindow};
use sqlx::PgPool;
use uuid::Uuid;

/// `true` if `now` falls inside the tenant's configured work window for this
/// channel, or if no window is configured (always eligible).
pub async fn work_window_eligible(
    pool: &PgPool,
    channel: Channel,
    company_id: Uuid,
    now: DateTime<Utc>,
) -> Result<bool> {
    let Some(row) = engage_store::fetch_throttle_settings(pool, company_id, channel)
        .await
        .context("work_window_eligible: fetch_throttle_settings failed")?
    else {
        return Ok(true);
    };

    let (Some(start), Some(end)) = (row.work_window_start_minute, row.work_window_end_minute) else {
        return Ok(true);
    };
    let window = WorkWindow {
        start_minute: start as u16,
        end_minute: end as u16,
    };

    let minute_of_day = local_minute_of_day(now, &row.timezone)
        .with_context(|| format!("work_window_eligible: invalid timezone {:?}", row.timezone))?;
    Ok(in_window(&window, minute_of_day))
}
