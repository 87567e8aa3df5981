//! One poll cycle for one tenant/channel (C3): budget → lease → bounded
//! dispatch → drain-check.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use engage_dispatch::{ContentGenerator, DispatchGateway, Transport};
use engage_schemas::Channel;
use futures_util::stream::{self, StreamExt};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dispatch_one::{dispatch_one, DispatchOutcome};
use crate::pause_registry::PauseRegistry;

/// Per-tenant bound on concurrent in-flight dispatches for one tick.
pub const DEFAULT_MAX_PARALLELISM: usize = 5;

/// Lease hold, seconds, handed to `engage_store::lease_batch`. Items not
/// terminated before this elapses are reclaimed by `release_stale_leases`.
pub const DEFAULT_LEASE_SECONDS: i64 = 300;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub leased: usize,
    pub sent: usize,
    pub requeued: usize,
    pub failed: usize,
}

impl TickSummary {
    fn record(&mut self, outcome: DispatchOutcome) {
        match outcome {
            DispatchOutcome::Sent => self.sent += 1,
            DispatchOutcome::Requeued => self.requeued += 1,
            DispatchOutcome::Failed => self.failed += 1,
        }
    }
}

/// Active tenants for a channel: companies with throttle settings enabled.
pub async fn active_tenants(pool: &PgPool, channel: Channel) -> Result<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        "select distinct company_id from throttle_settings where channel = $1 and enabled = true",
    )
    .bind(channel.as_str())
    .fetch_all(pool)
    .await
    .context("active_tenants query failed")?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// One poll cycle for a single tenant/channel. Returns `TickSummary::default()`
/// (all zeros) when the budget is exhausted or nothing is due.
#[allow(clippy::too_many_arguments)]
pub async fn poll_once<T, G>(
    pool: &PgPool,
    channel: Channel,
    company_id: Uuid,
    gateway: &DispatchGateway<T>,
    content_gen: &G,
    pause_registry: &PauseRegistry,
    worker_id: &str,
    now: DateTime<Utc>,
) -> Result<TickSummary>
where
    T: Transport,
    G: ContentGenerator,
{
    let budget = crate::budget::compute_budget(pool, channel, company_id, now).await?;
    if budget.budget <= 0 {
        return Ok(TickSummary::default());
    }

    let in_work_window = crate::window::work_window_eligible(pool, channel, company_id, now).await?;
    if !in_work_window {
        return Ok(TickSummary::default());
    }

    let items = engage_store::lease_batch(
        pool,
        channel,
        company_id,
        budget.budget,
        worker_id,
        DEFAULT_LEASE_SECONDS,
    )
    .await
    .context("poll_once: lease_batch failed")?;

    if items.is_empty() {
        return Ok(TickSummary::default());
    }

    let mut summary = TickSummary {
        leased: items.len(),
        ..TickSummary::default()
    };

    let outcomes: Vec<Result<DispatchOutcome>> = stream::iter(items.iter())
        .map(|item| dispatch_one(pool, gateway, content_gen, pause_registry, item, now))
        .buffer_unordered(DEFAULT_MAX_PARALLELISM)
        .collect()
        .await;

    for outcome in outcomes {
        summary.record(outcome?);
    }

    let mut run_ids: Vec<Uuid> = items.iter().map(|i| i.run_id).collect();
    run_ids.sort();
    run_ids.dedup();
    for run_id in run_ids {
        if engage_store::run_is_drained(pool, run_id)
            .await
            .context("poll_once: run_is_drained failed")?
        {
            engage_store::complete_run(pool, run_id)
                .await
                .context("poll_once: complete_run failed")?;
        }
    }

    Ok(summary)
}
