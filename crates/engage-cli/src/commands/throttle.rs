//! `engage-cli throttle set` — the `UpsertThrottleSettings` external
//! interface.

use anyhow::Result;
use engage_schemas::Channel;
use engage_store::ThrottleRow;
use uuid::Uuid;

#[allow(clippy::too_many_arguments)]
pub async fn throttle_set(
    company_id: Uuid,
    channel: Channel,
    enabled: bool,
    max_per_hour: i32,
    max_per_day: i32,
    work_window_start_minute: Option<i32>,
    work_window_end_minute: Option<i32>,
    timezone: String,
) -> Result<()> {
    let pool = engage_store::connect_from_env().await?;
    engage_store::upsert_throttle_settings(
        &pool,
        &ThrottleRow {
            company_id,
            channel,
            enabled,
            max_per_hour,
            max_per_day,
            work_window_start_minute,
            work_window_end_minute,
            timezone,
        },
    )
    .await?;

    println!("company_id={company_id}");
    println!("channel={}", channel.as_str());
    println!("enabled={enabled}");
    println!("max_per_hour={max_per_hour}");
    println!("max_per_day={max_per_day}");
    Ok(())
}
