//! Delivery-order gate for webhook events — grounded on the teacher's
//! `SnapshotWatermark`/`SnapshotFreshness` monotonicity check and its
//! `reconcile_monotonic` gate-before-apply wrapper, backed here by the
//! `webhook_watermarks` table instead of an in-memory field.
//!
//! Unlike the teacher's broker snapshot (which can arrive with
//! `fetched_at_ms == 0` and must be fail-closed rejected), every event here
//! carries a real `event_at_utc` stamped by the provider, so there is no
//! `NoTimestamp` case to model.
//!
//! One divergence worth noting: the teacher's `check` accepts a snapshot
//! whose timestamp exactly equals the watermark (only a strictly older
//! timestamp is `Stale`). Here an exactly-equal timestamp is treated as
//! `Stale` too — a literal duplicate delivery of the same event carries the
//! same `event_at_utc`, and re-running its handler would double-apply a
//! mutation that isn't itself idempotent against a stale rerun (e.g. booking
//! a second meeting).

use chrono::{DateTime, Utc};
use engage_schemas::Channel;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Event accepted; the watermark has been advanced to its timestamp.
    Fresh,
    /// Event's timestamp is not strictly newer than the stored watermark —
    /// a duplicate or out-of-order delivery. The handler must not run.
    Stale { watermark_utc: DateTime<Utc>, got_utc: DateTime<Utc> },
}

impl IngestOutcome {
    pub fn is_fresh(&self) -> bool {
        matches!(self, IngestOutcome::Fresh)
    }

    pub fn is_rejected(&self) -> bool {
        !self.is_fresh()
    }
}

/// Monotonicity-enforced gate. Callers must check `is_fresh()` before
/// applying any state mutation for the event.
pub async fn gate_monotonic(
    pool: &PgPool,
    company_id: Uuid,
    channel: Channel,
    provider: &str,
    event_at_utc: DateTime<Utc>,
) -> anyhow::Result<IngestOutcome> {
    let advanced = engage_store::advance_watermark(pool, company_id, channel, provider, event_at_utc).await?;
    if advanced {
        return Ok(IngestOutcome::Fresh);
    }
    let watermark_utc = engage_store::load_watermark(pool, company_id, channel, provider)
        .await?
        .unwrap_or(event_at_utc);
    Ok(IngestOutcome::Stale {
        watermark_utc,
        got_utc: event_at_utc,
    })
}
