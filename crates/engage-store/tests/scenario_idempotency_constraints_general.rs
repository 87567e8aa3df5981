//! DB-level uniqueness enforcement for provider message ids, verified
//! independently of any application-layer dedup logic.
//!
//! Requires a live PostgreSQL instance reachable via ENGAGE_DATABASE_URL.
//! All tests skip when that variable is absent.

use uuid::Uuid;

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        db_err.code().as_deref() == Some("23505")
    } else {
        false
    }
}

async fn pool_or_skip() -> Option<sqlx::PgPool> {
    let url = std::env::var(engage_store::ENV_DB_URL).ok()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .ok()?;
    engage_store::migrate(&pool).await.ok()?;
    Some(pool)
}

async fn seed_campaign_and_lead(pool: &sqlx::PgPool) -> anyhow::Result<(Uuid, Uuid)> {
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
    Ok((campaign_id, lead_id))
}

#[tokio::test]
async fn email_log_detail_rejects_duplicate_provider_message_id() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await else {
        eprintln!("SKIP: ENGAGE_DATABASE_URL not set");
        return Ok(());
    };

    let (campaign_id, lead_id) = seed_campaign_and_lead(&pool).await?;
    let company_id: Uuid = sqlx::query_scalar("select company_id from campaigns where campaign_id = $1")
        .bind(campaign_id)
        .fetch_one(&pool)
        .await?;
    let run_id = Uuid::new_v4();
    engage_store::create_run(&pool, run_id, campaign_id, company_id, 1).await?;

    let email_log_id = Uuid::new_v4();
    sqlx::query(
        "insert into email_logs (email_log_id, company_id, campaign_id, lead_id, run_id) values ($1, $2, $3, $4, $5)",
    )
    .bind(email_log_id)
    .bind(company_id)
    .bind(campaign_id)
    .bind(lead_id)
    .bind(run_id)
    .execute(&pool)
    .await?;

    sqlx::query(
        "insert into email_log_details (email_log_detail_id, email_log_id, reminder_type, provider_message_id) \
         values ($1, $2, 'intro', $3)",
    )
    .bind(Uuid::new_v4())
    .bind(email_log_id)
    .bind("provider-msg-001")
    .execute(&pool)
    .await?;

    let err = sqlx::query(
        "insert into email_log_details (email_log_detail_id, email_log_id, reminder_type, provider_message_id) \
         values ($1, $2, 'reminder_1', $3)",
    )
    .bind(Uuid::new_v4())
    .bind(email_log_id)
    .bind("provider-msg-001")
    .execute(&pool)
    .await
    .unwrap_err();

    assert!(
        is_unique_violation(&err),
        "duplicate provider_message_id must be rejected with 23505; got: {err}"
    );

    Ok(())
}

#[tokio::test]
async fn queue_item_rejects_duplicate_run_lead_stage_at_db_level() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await else {
        eprintln!("SKIP: ENGAGE_DATABASE_URL not set");
        return Ok(());
    };

    let (campaign_id, lead_id) = seed_campaign_and_lead(&pool).await?;
    let company_id: Uuid = sqlx::query_scalar("select company_id from campaigns where campaign_id = $1")
        .bind(campaign_id)
        .fetch_one(&pool)
        .await?;
    let run_id = Uuid::new_v4();
    engage_store::create_run(&pool, run_id, campaign_id, company_id, 1).await?;

    sqlx::query(
        "insert into email_queue (id, company_id, campaign_id, run_id, lead_id, stage, status) \
         values ($1, $2, $3, $4, $5, 'intro', 'pending')",
    )
    .bind(Uuid::new_v4())
    .bind(company_id)
    .bind(campaign_id)
    .bind(run_id)
    .bind(lead_id)
    .execute(&pool)
    .await?;

    let err = sqlx::query(
        "insert into email_queue (id, company_id, campaign_id, run_id, lead_id, stage, status) \
         values ($1, $2, $3, $4, $5, 'intro', 'pending')",
    )
    .bind(Uuid::new_v4())
    .bind(company_id)
    .bind(campaign_id)
    .bind(run_id)
    .bind(lead_id)
    .execute(&pool)
    .await
    .unwrap_err();

    assert!(
        is_unique_violation(&err),
        "duplicate (run_id, lead_id, stage) must be rejected with 23505; got: {err}"
    );

    Ok(())
}
