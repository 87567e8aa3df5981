//! S6: cancelling a run with pending items transitions them to `cancelled`
//! in one shot; the run itself moves to `cancelled` and a drain check never
//! flips it to `completed`.

use chrono::Utc;
use engage_dispatch::DispatchGateway;
use engage_poller::{poll_once, PauseRegistry};
use engage_schemas::{Channel, RunStatus};
use engage_testkit::{pool_or_skip, seed_campaign, seed_lead_with_email, seed_tenant, set_throttle, start_run};
use engage_transport_fake::{FakeContentGenerator, FakeTransport};

#[tokio::test]
async fn cancelling_a_run_cancels_its_pending_items_and_blocks_completion() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await else {
        eprintln!("SKIP: ENGAGE_DATABASE_URL not set");
        return Ok(());
    };

    let tenant = seed_tenant(&pool, "Acme").await?;
    set_throttle(&pool, tenant.company_id, Channel::Email, 1, 500).await?;
    let campaign_id = seed_campaign(&pool, &tenant, Channel::Email).await?;

    let mut lead_ids = Vec::new();
    for i in 0..10 {
        lead_ids.push(seed_lead_with_email(&pool, tenant.company_id, &format!("lead{i}@example.com")).await?);
    }
    let run_id = start_run(&pool, campaign_id, tenant.company_id, Channel::Email, &lead_ids).await?;

    let gateway = DispatchGateway::new(FakeTransport::new());
    let content_gen = FakeContentGenerator;
    let pause_registry = PauseRegistry::new();

    // `max_per_hour=1` budget leases one item per tick; one send before cancelling.
    let summary =
        poll_once(&pool, Channel::Email, tenant.company_id, &gateway, &content_gen, &pause_registry, "worker-1", Utc::now()).await?;
    assert_eq!(summary.sent, 1);

    let cancelled = engage_store::cancel_run(&pool, run_id).await?;
    assert!(cancelled);
    let items_cancelled = engage_store::cancel_pending_for_run(&pool, run_id).await?;
    assert_eq!(items_cancelled, 9);

    let (cancelled_count,): (i64,) =
        sqlx::query_as("select count(*)::bigint from email_queue where run_id = $1 and status = 'cancelled'")
            .bind(run_id)
            .fetch_one(&pool)
            .await?;
    assert_eq!(cancelled_count, 9);

    // Further polling must not revive the cancelled items or complete the run:
    // `lease_batch` only claims `pending` rows, and `run_active` gating would
    // refuse a send even if one were somehow still leasable.
    let after_cancel =
        poll_once(&pool, Channel::Email, tenant.company_id, &gateway, &content_gen, &pause_registry, "worker-1", Utc::now()).await?;
    assert_eq!(after_cancel, Default::default());

    let run = engage_store::fetch_run(&pool, run_id).await?;
    assert_eq!(run.status, RunStatus::Cancelled);
    assert_eq!(run.leads_processed, 1);

    let unterminated = engage_store::list_unterminated_for_run(&pool, run_id).await?;
    assert!(unterminated.is_empty());

    Ok(())
}
