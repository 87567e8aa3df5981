//! C8 webhook handling: duplicate delivery is a no-op, a bounce fails pending
//! sends instead of cancelling them, and a LinkedIn disconnect/reconnect
//! round-trips through the shared pause registry.

use chrono::Utc;
use engage_poller::PauseRegistry;
use engage_schemas::Channel;
use engage_store::NewQueueItem;
use engage_webhooks::{CallCompletionEvent, EmailBounceEvent, EmailReplyEvent, LinkedinAccountStatusEvent, WebhookEvent};
use uuid::Uuid;

async fn pool_or_skip() -> Option<sqlx::PgPool> {
    let url = std::env::var(engage_store::ENV_DB_URL).ok()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .ok()?;
    engage_store::migrate(&pool).await.ok()?;
    Some(pool)
}

struct Fixture {
    company_id: Uuid,
    campaign_id: Uuid,
    lead_id: Uuid,
    run_id: Uuid,
}

async fn seed(pool: &sqlx::PgPool) -> anyhow::Result<Fixture> {
    let company_id = Uuid::new_v4();
    let product_id = Uuid::new_v4();
    let campaign_id = Uuid::new_v4();
    let lead_id = Uuid::new_v4();
    engage_store::insert_company(pool, company_id, "Acme").await?;
    engage_store::insert_product(pool, product_id, company_id, "Widget").await?;
    sqlx::query(
        "insert into campaigns (campaign_id, company_id, product_id, channels) values ($1, $2, $3, array['email'])",
    )
    .bind(campaign_id)
    .bind(company_id)
    .bind(product_id)
    .execute(pool)
    .await?;
    engage_store::insert_lead(
        pool,
        &engage_store::NewLead {
            lead_id,
            company_id,
            email: Some("lead@example.com".to_string()),
            phone: None,
            linkedin_id: None,
            linkedin_network_distance: None,
        },
    )
    .await?;
    let run_id = Uuid::new_v4();
    engage_store::create_run(pool, run_id, campaign_id, company_id, 1).await?;
    Ok(Fixture {
        company_id,
        campaign_id,
        lead_id,
        run_id,
    })
}

#[tokio::test]
async fn duplicate_email_reply_delivery_does_not_reapply() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await else {
        eprintln!("SKIP: ENGAGE_DATABASE_URL not set");
        return Ok(());
    };

    let fx = seed(&pool).await?;
    let email_log_id = Uuid::new_v4();
    engage_store::insert_email_log(&pool, email_log_id, fx.company_id, fx.campaign_id, fx.lead_id, fx.run_id).await?;

    let event_at_utc = Utc::now();
    let event = WebhookEvent::EmailReply(EmailReplyEvent {
        company_id: fx.company_id,
        email_log_id,
        event_at_utc,
    });
    let pause_registry = PauseRegistry::new();

    let first = engage_webhooks::apply_event(&pool, &pause_registry, &event).await?;
    assert!(first.is_fresh());

    let second = engage_webhooks::apply_event(&pool, &pause_registry, &event).await?;
    assert!(second.is_rejected(), "identical redelivery must be gated as stale");

    let (has_replied,): (bool,) =
        sqlx::query_as("select has_replied from email_logs where email_log_id = $1")
            .bind(email_log_id)
            .fetch_one(&pool)
            .await?;
    assert!(has_replied);

    Ok(())
}

#[tokio::test]
async fn bounce_fails_pending_email_items_instead_of_cancelling() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await else {
        eprintln!("SKIP: ENGAGE_DATABASE_URL not set");
        return Ok(());
    };

    let fx = seed(&pool).await?;
    let queued = engage_store::enqueue(
        &pool,
        &NewQueueItem {
            id: Uuid::new_v4(),
            company_id: fx.company_id,
            campaign_id: fx.campaign_id,
            run_id: fx.run_id,
            lead_id: fx.lead_id,
            channel: Channel::Email,
            stage: "initial".to_string(),
            priority: 1,
            scheduled_for_utc: Utc::now(),
            max_retries: 3,
            parent_log_id: None,
        },
    )
    .await?;
    assert!(queued);

    let pause_registry = PauseRegistry::new();
    let event = WebhookEvent::EmailBounce(EmailBounceEvent {
        company_id: fx.company_id,
        lead_id: fx.lead_id,
        event_at_utc: Utc::now(),
    });
    let outcome = engage_webhooks::apply_event(&pool, &pause_registry, &event).await?;
    assert!(outcome.is_fresh());

    let (status, error): (String, Option<String>) =
        sqlx::query_as("select status, error from email_queue where lead_id = $1")
            .bind(fx.lead_id)
            .fetch_one(&pool)
            .await?;
    assert_eq!(status, "failed");
    assert_eq!(error.as_deref(), Some("bounced"));

    let (bounced,): (bool,) = sqlx::query_as("select email_bounced from leads where lead_id = $1")
        .bind(fx.lead_id)
        .fetch_one(&pool)
        .await?;
    assert!(bounced);

    Ok(())
}

#[tokio::test]
async fn call_completion_with_meeting_booked_suppresses_email_reminders() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await else {
        eprintln!("SKIP: ENGAGE_DATABASE_URL not set");
        return Ok(());
    };

    let fx = seed(&pool).await?;
    let email_log_id = Uuid::new_v4();
    engage_store::insert_email_log(&pool, email_log_id, fx.company_id, fx.campaign_id, fx.lead_id, fx.run_id).await?;

    let call_log_id = Uuid::new_v4();
    engage_store::insert_call_log(&pool, call_log_id, fx.campaign_id, fx.lead_id, Some("prov-call-1")).await?;

    let pause_registry = PauseRegistry::new();
    let event = WebhookEvent::CallCompletion(CallCompletionEvent {
        company_id: fx.company_id,
        provider_call_id: "prov-call-1".to_string(),
        duration_seconds: Some(600),
        sentiment: Some("positive".to_string()),
        summary: Some("booked a demo".to_string()),
        transcript: None,
        recording_url: None,
        meeting_booked: true,
        event_at_utc: Utc::now(),
    });
    let outcome = engage_webhooks::apply_event(&pool, &pause_registry, &event).await?;
    assert!(outcome.is_fresh());

    let (has_meeting_booked,): (bool,) =
        sqlx::query_as("select has_meeting_booked from email_logs where email_log_id = $1")
            .bind(email_log_id)
            .fetch_one(&pool)
            .await?;
    assert!(has_meeting_booked);

    Ok(())
}

#[test]
fn linkedin_disconnect_then_reconnect_round_trips_through_pause_registry() {
    let pause_registry = PauseRegistry::new();
    let company_id = Uuid::new_v4();

    let disconnect = WebhookEvent::LinkedinAccountStatus(LinkedinAccountStatusEvent {
        company_id,
        connected: false,
        event_at_utc: Utc::now(),
    });
    assert_eq!(disconnect.channel(), Channel::Linkedin);

    pause_registry.pause(company_id, Channel::Linkedin, engage_guard::PauseReason::Disconnected);
    assert!(pause_registry.get(company_id, Channel::Linkedin).is_paused());

    pause_registry.reconnect(company_id, Channel::Linkedin);
    assert!(pause_registry.get(company_id, Channel::Linkedin).is_active());
}
