//! `engage-cli run` subcommands: the `RunCampaign` / `CancelRun` / `GetRun`
//! external-interface contracts.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use chrono::Utc;
use engage_schemas::Channel;
use engage_store::NewQueueItem;
use uuid::Uuid;

const DEFAULT_MAX_RETRIES: i32 = 3;
const INITIAL_STAGE: &str = "initial";
const INITIAL_PRIORITY: i32 = 1;

/// Deterministic queue-item id for one channel's initial send on one run.
/// A retried `run start` against an already-started run collides with
/// `enqueue`'s `(run_id, lead_id, stage)` unique constraint instead of
/// double-enqueuing.
fn initial_queue_item_id(run_id: Uuid, lead_id: Uuid, channel: Channel) -> Uuid {
    let data = format!("engage-cli.run-start.v1|{run_id}|{lead_id}|{}", channel.as_str());
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, data.as_bytes())
}

/// `RunCampaign(campaign_id, lead_filter?) -> run_id`. Enumerates every lead
/// eligible on any of the campaign's channels, enqueues one `initial` item
/// per eligible (lead, channel) pair, and sets `leads_total` to the count of
/// distinct eligible leads (matching the single-channel case exactly and
/// generalizing it to a multi-channel campaign).
///
/// `lead_filter` is implemented as an optional allowlist of lead ids:
/// when given, eligibility is intersected with this set.
pub async fn run_start(campaign_id: Uuid, lead_filter: Option<Vec<Uuid>>) -> Result<()> {
    let pool = engage_store::connect_from_env().await?;

    let campaign = engage_store::fetch_campaign(&pool, campaign_id)
        .await
        .context("run_start: fetch_campaign failed")?;

    let filter: Option<BTreeSet<Uuid>> = lead_filter.map(|ids| ids.into_iter().collect());

    let mut distinct_leads: BTreeSet<Uuid> = BTreeSet::new();
    let mut to_enqueue: Vec<(Channel, Uuid)> = Vec::new();

    for channel in &campaign.channels {
        let eligible = engage_store::fetch_eligible_leads(&pool, campaign_id, *channel)
            .await
            .context("run_start: fetch_eligible_leads failed")?;
        for lead in eligible {
            if let Some(f) = &filter {
                if !f.contains(&lead.lead_id) {
                    continue;
                }
            }
            distinct_leads.insert(lead.lead_id);
            to_enqueue.push((*channel, lead.lead_id));
        }
    }

    let run_id = Uuid::new_v4();
    engage_store::create_run(&pool, run_id, campaign_id, campaign.company_id, distinct_leads.len() as i64)
        .await
        .context("run_start: create_run failed")?;

    let now = Utc::now();
    let mut enqueued = 0usize;
    for (channel, lead_id) in to_enqueue {
        let queued = engage_store::enqueue(
            &pool,
            &NewQueueItem {
                id: initial_queue_item_id(run_id, lead_id, channel),
                company_id: campaign.company_id,
                campaign_id,
                run_id,
                lead_id,
                channel,
                stage: INITIAL_STAGE.to_string(),
                priority: INITIAL_PRIORITY,
                scheduled_for_utc: now,
                max_retries: DEFAULT_MAX_RETRIES,
                parent_log_id: None,
            },
        )
        .await
        .context("run_start: enqueue failed")?;
        if queued {
            enqueued += 1;
        }
    }

    println!("run_id={run_id}");
    println!("campaign_id={campaign_id}");
    println!("leads_total={}", distinct_leads.len());
    println!("items_enqueued={enqueued}");
    Ok(())
}

/// `CancelRun(run_id)`: flip the run to `cancelled` and cancel every
/// still-pending queue item across all channels. `processing` items are left
/// for the dispatcher's own run-status check to resolve.
pub async fn run_cancel(run_id: Uuid) -> Result<()> {
    let pool = engage_store::connect_from_env().await?;
    let cancelled = engage_store::cancel_run(&pool, run_id).await.context("run_cancel: cancel_run failed")?;
    let cancelled_items = engage_store::cancel_pending_for_run(&pool, run_id)
        .await
        .context("run_cancel: cancel_pending_for_run failed")?;

    println!("run_id={run_id}");
    println!("cancelled={cancelled}");
    println!("items_cancelled={cancelled_items}");
    Ok(())
}

/// `GetRun(run_id) -> {status, leads_total, leads_processed, counts_by_status}`.
pub async fn run_status(run_id: Uuid) -> Result<()> {
    let pool = engage_store::connect_from_env().await?;
    let run = engage_store::fetch_run(&pool, run_id).await.context("run_status: fetch_run failed")?;
    let counts = engage_store::counts_by_status_for_run(&pool, run_id)
        .await
        .context("run_status: counts_by_status_for_run failed")?;

    println!("run_id={}", run.run_id);
    println!("campaign_id={}", run.campaign_id);
    println!("status={}", run.status.as_str());
    println!("leads_total={}", run.leads_total);
    println!("leads_processed={}", run.leads_processed);
    for (status, count) in counts {
        println!("counts_by_status.{status}={count}");
    }
    Ok(())
}
