//! Production tick loop: one spawned task per channel, ticking on a
//! `tokio::time::interval`, iterating active tenants and polling each.
//!
//! Grounded on the teacher's `spawn_heartbeat` (a spawned loop ticking on an
//! interval, writing status into shared state): this is the same shape with
//! the body replaced by a per-tenant poll instead of a heartbeat broadcast.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Utc;
use engage_dispatch::{ContentGenerator, DispatchGateway, Transport};
use engage_schemas::Channel;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::pause_registry::PauseRegistry;
use crate::tick::{active_tenants, poll_once};

/// Default tick interval for a channel, per the spec's per-channel cadence
/// (email polls less often than call/LinkedIn).
pub fn default_interval(channel: Channel) -> StdDuration {
    match channel {
        Channel::Email => StdDuration::from_secs(60),
        Channel::Call | Channel::Linkedin => StdDuration::from_secs(30),
    }
}

/// Seconds after which an unterminated `processing` item is considered
/// abandoned by a crashed worker and reclaimed back to `pending`.
const STALE_LEASE_CUTOFF_SECONDS: i64 = 600;

/// Run the tick loop for one channel forever. Intended to be spawned with
/// `tokio::spawn`; one call per channel from the daemon/CLI entry point.
pub async fn run_channel_loop<T, G>(
    pool: PgPool,
    channel: Channel,
    worker_id: String,
    gateway: Arc<DispatchGateway<T>>,
    content_gen: Arc<G>,
    pause_registry: Arc<PauseRegistry>,
) where
    T: Transport,
    G: ContentGenerator,
{
    let mut ticker = tokio::time::interval(default_interval(channel));
    loop {
        ticker.tick().await;

        if let Err(err) = engage_store::release_stale_leases(&pool, channel, STALE_LEASE_CUTOFF_SECONDS).await {
            warn!(?channel, %err, "release_stale_leases failed");
        }

        let tenants = match active_tenants(&pool, channel).await {
            Ok(t) => t,
            Err(err) => {
                warn!(?channel, %err, "active_tenants query failed, skipping tick");
                continue;
            }
        };

        for company_id in tenants {
            let now = Utc::now();
            match poll_once(
                &pool,
                channel,
                company_id,
                gateway.as_ref(),
                content_gen.as_ref(),
                pause_registry.as_ref(),
                &worker_id,
                now,
            )
            .await
            {
                Ok(summary) if summary.leased > 0 => {
                    info!(?channel, %company_id, ?summary, "poll_once dispatched a batch");
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(?channel, %company_id, %err, "poll_once failed");
                }
            }
        }
    }
}
