//! `engage-cli queue` subcommands: the one-shot ops tools from the external
//! interfaces surface (`process-queues`, `send-reminders`, `process-bounces`,
//! `process-inbound-email`, `reclaim-stale-leases`). Every command connects,
//! does one unit of work, prints a flat summary, and exits — no internal
//! looping; the daemon owns the long-running ticks.

use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use engage_dispatch::DispatchGateway;
use engage_poller::PauseRegistry;
use engage_schemas::Channel;
use engage_transport_fake::{FakeContentGenerator, LoggingTransport};

/// One poll cycle across every active tenant of `channel`. Uses the same
/// `poll_once` the daemon's `run_channel_loop` calls on a timer, so the CLI
/// and the daemon can never drift in what a "tick" means.
pub async fn process_queues(channel: Channel) -> Result<()> {
    let pool = engage_store::connect_from_env().await?;
    let gateway = Arc::new(DispatchGateway::new(LoggingTransport::new()));
    let content_gen = Arc::new(FakeContentGenerator);
    let pause_registry = PauseRegistry::new();

    let tenants = engage_poller::active_tenants(&pool, channel).await?;
    let now = Utc::now();

    let mut leased = 0usize;
    let mut sent = 0usize;
    let mut requeued = 0usize;
    let mut failed = 0usize;

    for company_id in tenants {
        let summary = engage_poller::poll_once(
            &pool,
            channel,
            company_id,
            gateway.as_ref(),
            content_gen.as_ref(),
            &pause_registry,
            "engage-cli",
            now,
        )
        .await
        .with_context(|| format!("process_queues: poll_once failed for company {company_id}"))?;
        leased += summary.leased;
        sent += summary.sent;
        requeued += summary.requeued;
        failed += summary.failed;
    }

    println!("channel={}", channel.as_str());
    println!("leased={leased}");
    println!("sent={sent}");
    println!("requeued={requeued}");
    println!("failed={failed}");
    Ok(())
}

pub async fn send_reminders() -> Result<()> {
    let pool = engage_store::connect_from_env().await?;
    let summary = engage_reminders::run_reminder_tick(&pool, Utc::now()).await?;
    println!("campaigns_considered={}", summary.campaigns_considered);
    println!("enqueued={}", summary.enqueued);
    Ok(())
}

/// Batch-apply bounce webhook events from stdin (one JSON object per line).
/// Shares `engage_webhooks::apply_event` with the HTTP route, so a replayed
/// batch and a live callback are reconciled identically.
pub async fn process_bounces() -> Result<()> {
    apply_ndjson_stdin(&["email_bounce"]).await
}

/// Batch-apply inbound-email webhook events (reply/open) from stdin.
pub async fn process_inbound_email() -> Result<()> {
    apply_ndjson_stdin(&["email_reply", "email_open"]).await
}

async fn apply_ndjson_stdin(accepted_event_types: &[&str]) -> Result<()> {
    let pool = engage_store::connect_from_env().await?;
    let pause_registry = PauseRegistry::new();

    let mut input = String::new();
    std::io::stdin().lock().read_to_string(&mut input).context("reading stdin")?;

    let mut applied = 0usize;
    let mut skipped_stale = 0usize;
    let mut rejected = 0usize;

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: serde_json::Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(_) => {
                rejected += 1;
                continue;
            }
        };
        let event_type = value.get("event_type").and_then(|v| v.as_str()).unwrap_or_default();
        if !accepted_event_types.contains(&event_type) {
            continue;
        }

        match engage_webhooks::normalize_json(line) {
            Ok(event) => match engage_webhooks::apply_event(&pool, &pause_registry, &event).await {
                Ok(outcome) if outcome.is_fresh() => applied += 1,
                Ok(_) => skipped_stale += 1,
                Err(err) => {
                    tracing::warn!(%err, event_type, "apply_event failed");
                    rejected += 1;
                }
            },
            Err(err) => {
                tracing::warn!(%err, event_type, "normalize_json failed");
                rejected += 1;
            }
        }
    }

    println!("applied={applied}");
    println!("skipped_stale={skipped_stale}");
    println!("rejected={rejected}");
    Ok(())
}

pub async fn reclaim_stale_leases(channel: Option<Channel>, cutoff_seconds: i64) -> Result<()> {
    let pool = engage_store::connect_from_env().await?;
    let channels: Vec<Channel> = match channel {
        Some(c) => vec![c],
        None => Channel::all().to_vec(),
    };

    let mut reclaimed = 0i64;
    for channel in channels {
        reclaimed += engage_store::release_stale_leases(&pool, channel, cutoff_seconds).await?;
    }

    println!("reclaimed={reclaimed}");
    println!("cutoff_seconds={cutoff_seconds}");
    Ok(())
}
