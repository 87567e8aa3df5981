//! S2: `max_per_hour=2` against 5 queued items. Three ticks an hour apart
//! each clear that tick's fresh budget; the run only completes on the third.

use chrono::{Duration, Utc};
use engage_dispatch::DispatchGateway;
use engage_poller::{poll_once, PauseRegistry};
use engage_schemas::{Channel, RunStatus};
use engage_testkit::{pool_or_skip, seed_campaign, seed_lead_with_email, seed_tenant, set_throttle, start_run};
use engage_transport_fake::{FakeContentGenerator, FakeTransport};

#[tokio::test]
async fn two_per_hour_budget_drains_five_items_over_three_ticks() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await else {
        eprintln!("SKIP: ENGAGE_DATABASE_URL not set");
        return Ok(());
    };

    let tenant = seed_tenant(&pool, "Acme").await?;
    set_throttle(&pool, tenant.company_id, Channel::Email, 2, 500).await?;
    let campaign_id = seed_campaign(&pool, &tenant, Channel::Email).await?;

    let mut lead_ids = Vec::new();
    for i in 0..5 {
        lead_ids.push(seed_lead_with_email(&pool, tenant.company_id, &format!("lead{i}@example.com")).await?);
    }
    let run_id = start_run(&pool, campaign_id, tenant.company_id, Channel::Email, &lead_ids).await?;

    let gateway = DispatchGateway::new(FakeTransport::new());
    let content_gen = FakeContentGenerator;
    let pause_registry = PauseRegistry::new();
    let base = Utc::now();

    // T0: budget evaluates sent-in-last-hour against real `processed_at_utc`
    // timestamps, so each tick's fake `now` is pushed more than an hour past
    // the previous tick's wall-clock execution time, putting its sends
    // outside the rolling window.
    let s0 = poll_once(&pool, Channel::Email, tenant.company_id, &gateway, &content_gen, &pause_registry, "worker-1", base).await?;
    assert_eq!(s0.sent, 2);

    let s1 = poll_once(
        &pool,
        Channel::Email,
        tenant.company_id,
        &gateway,
        &content_gen,
        &pause_registry,
        "worker-1",
        base + Duration::hours(1) + Duration::minutes(5),
    )
    .await?;
    assert_eq!(s1.sent, 2);

    let run_mid = engage_store::fetch_run(&pool, run_id).await?;
    assert_eq!(run_mid.status, RunStatus::Running);
    assert_eq!(run_mid.leads_processed, 4);

    let s2 = poll_once(
        &pool,
        Channel::Email,
        tenant.company_id,
        &gateway,
        &content_gen,
        &pause_registry,
        "worker-1",
        base + Duration::hours(2) + Duration::minutes(10),
    )
    .await?;
    assert_eq!(s2.sent, 1);

    let run_final = engage_store::fetch_run(&pool, run_id).await?;
    assert_eq!(run_final.status, RunStatus::Completed);
    assert_eq!(run_final.leads_processed, 5);

    Ok(())
}
