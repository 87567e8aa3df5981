//! Shared fixtures for cross-crate scenario tests under `tests/`.
//!
//! Each scenario wires `engage-store` + `engage-poller` + `engage-dispatch`
//! + `engage-webhooks` together the same way `engage-daemon`'s poller loop
//! and webhook route do in production, minus the HTTP/CLI surface — these
//! tests drive `poll_once`/`apply_event` directly against a real database.

use anyhow::{Context, Result};
use chrono::Utc;
use engage_schemas::Channel;
use sqlx::PgPool;
use uuid::Uuid;

pub async fn pool_or_skip() -> Option<PgPool> {
    let url = std::env::var(engage_store::ENV_DB_URL).ok()?;
    let pool = sqlx::postgres::PgPoolOptions::new().max_connections(4).connect(&url).await.ok()?;
    engage_store::migrate(&pool).await.ok()?;
    Some(pool)
}

pub struct Tenant {
    pub company_id: Uuid,
    pub product_id: Uuid,
}

pub async fn seed_tenant(pool: &PgPool, name: &str) -> Result<Tenant> {
    let company_id = Uuid::new_v4();
    let product_id = Uuid::new_v4();
    engage_store::insert_company(pool, company_id, name).await.context("seed_tenant: insert_company")?;
    engage_store::insert_product(pool, product_id, company_id, "Widget").await.context("seed_tenant: insert_product")?;
    Ok(Tenant { company_id, product_id })
}

pub async fn seed_campaign(pool: &PgPool, tenant: &Tenant, channel: Channel) -> Result<Uuid> {
    let campaign_id = Uuid::new_v4();
    sqlx::query(&format!(
        "insert into campaigns (campaign_id, company_id, product_id, channels) values ($1, $2, $3, array['{}'])",
        channel.as_str()
    ))
    .bind(campaign_id)
    .bind(tenant.company_id)
    .bind(tenant.product_id)
    .execute(pool)
    .await
    .context("seed_campaign")?;
    Ok(campaign_id)
}

pub async fn seed_lead_with_email(pool: &PgPool, company_id: Uuid, email: &str) -> Result<Uuid> {
    let lead_id = Uuid::new_v4();
    engage_store::insert_lead(
        pool,
        &engage_store::NewLead {
            lead_id,
            company_id,
            email: Some(email.to_string()),
            phone: None,
            linkedin_id: None,
            linkedin_network_distance: None,
        },
    )
    .await
    .context("seed_lead_with_email")?;
    Ok(lead_id)
}

pub async fn set_throttle(pool: &PgPool, company_id: Uuid, channel: Channel, max_per_hour: i32, max_per_day: i32) -> Result<()> {
    engage_store::upsert_throttle_settings(
        pool,
        &engage_store::ThrottleRow {
            company_id,
            channel,
            enabled: true,
            max_per_hour,
            max_per_day,
            work_window_start_minute: None,
            work_window_end_minute: None,
            timezone: "UTC".to_string(),
        },
    )
    .await
    .context("set_throttle")
}

/// Same derivation shape `engage-cli`/`engage-daemon` use for the first queue
/// item a run enqueues, namespaced to this crate so ids never collide with
/// either of theirs.
pub fn initial_queue_item_id(run_id: Uuid, lead_id: Uuid, channel: Channel) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_DNS,
        format!("engage-testkit.run-start.v1|{run_id}|{lead_id}|{}", channel.as_str()).as_bytes(),
    )
}

/// Start a run on a single-channel campaign for an explicit, already-eligible
/// lead list — scenario tests control membership directly rather than
/// re-deriving `RunCampaign`'s eligibility query, which is exercised by
/// `engage-cli`'s and `engage-daemon`'s own scenario tests.
pub async fn start_run(pool: &PgPool, campaign_id: Uuid, company_id: Uuid, channel: Channel, lead_ids: &[Uuid]) -> Result<Uuid> {
    let run_id = Uuid::new_v4();
    engage_store::create_run(pool, run_id, campaign_id, company_id, lead_ids.len() as i64)
        .await
        .context("start_run: create_run")?;

    let now = Utc::now();
    for &lead_id in lead_ids {
        engage_store::enqueue(
            pool,
            &engage_store::NewQueueItem {
                id: initial_queue_item_id(run_id, lead_id, channel),
                company_id,
                campaign_id,
                run_id,
                lead_id,
                channel,
                stage: "initial".to_string(),
                priority: 0,
                scheduled_for_utc: now,
                max_retries: engage_dispatch::DEFAULT_MAX_RETRIES as i32,
                parent_log_id: None,
            },
        )
        .await
        .context("start_run: enqueue")?;
    }
    Ok(run_id)
}
