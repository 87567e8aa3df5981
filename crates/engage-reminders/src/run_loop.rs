//! Production tick loop: one spawned task, ticking hourly, running a full
//! reminder sweep each time. Same shape as `engage-poller`'s channel loop,
//! which is itself grounded on the teacher's `spawn_heartbeat`.

use std::time::Duration as StdDuration;

use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::tick::run_reminder_tick;

pub const DEFAULT_INTERVAL: StdDuration = StdDuration::from_secs(3600);

/// Run the reminder sweep forever on an hourly `tokio::time::interval`.
/// Intended to be spawned with `tokio::spawn` once from the daemon/CLI entry
/// point.
pub async fn run_reminder_loop(pool: PgPool) {
    let mut ticker = tokio::time::interval(DEFAULT_INTERVAL);
    loop {
        ticker.tick().await;

        let now = Utc::now();
        match run_reminder_tick(&pool, now).await {
            Ok(summary) if summary.enqueued > 0 => {
                info!(?summary, "reminder sweep enqueued follow-ups");
            }
            Ok(_) => {}
            Err(err) => {
                warn!(%err, "run_reminder_tick failed");
            }
        }
    }
}
