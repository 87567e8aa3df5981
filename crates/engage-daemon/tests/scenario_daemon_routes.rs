//! In-process scenario tests for the daemon's HTTP endpoints.
//!
//! These tests spin up the Axum router **without** binding a TCP socket,
//! driven via `tower::ServiceExt::oneshot` — the teacher's own style for
//! testing `build_router` directly. `AppState` owns a real `PgPool`, so
//! every test here needs a reachable database (skip-if-unset, matching
//! `engage-webhooks`'s and `engage-poller`'s scenario tests).

use std::sync::{Arc, OnceLock};

use axum::http::{Request, StatusCode};
use engage_daemon::{routes, state};
use engage_poller::PauseRegistry;
use http_body_util::BodyExt;
use tower::ServiceExt; // oneshot
use uuid::Uuid;

async fn pool_or_skip() -> Option<sqlx::PgPool> {
    let url = std::env::var(engage_store::ENV_DB_URL).ok()?;
    let pool = sqlx::postgres::PgPoolOptions::new().max_connections(4).connect(&url).await.ok()?;
    engage_store::migrate(&pool).await.ok()?;
    Some(pool)
}

fn make_state(pool: sqlx::PgPool) -> Arc<state::AppState> {
    Arc::new(state::AppState::new(pool, Arc::new(PauseRegistry::new())))
}

async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp.into_body().collect().await.expect("body collect failed").to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

struct Fixture {
    company_id: Uuid,
    campaign_id: Uuid,
    lead_id: Uuid,
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
    Ok(Fixture { company_id, campaign_id, lead_id })
}

static SKIP_WARNED: OnceLock<()> = OnceLock::new();

fn warn_skip_once() {
    SKIP_WARNED.get_or_init(|| eprintln!("SKIP: ENGAGE_DATABASE_URL not set"));
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let Some(pool) = pool_or_skip().await else {
        warn_skip_once();
        return;
    };
    let router = routes::build_router(make_state(pool));

    let req = Request::builder().method("GET").uri("/health").body(axum::body::Body::empty()).unwrap();
    let (status, body) = call(router, req).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "engage-daemon");
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_returns_200_with_channels_polling() {
    let Some(pool) = pool_or_skip().await else {
        warn_skip_once();
        return;
    };
    let router = routes::build_router(make_state(pool));

    let req = Request::builder().method("GET").uri("/v1/status").body(axum::body::Body::empty()).unwrap();
    let (status, body) = call(router, req).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    let channels = json["channels_polling"].as_array().expect("channels_polling is an array");
    assert_eq!(channels.len(), 3);
}

// ---------------------------------------------------------------------------
// POST /v1/runs -> GET /v1/runs/:id -> POST /v1/runs/:id/cancel
// ---------------------------------------------------------------------------

#[tokio::test]
async fn run_lifecycle_round_trips_through_the_http_surface() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await else {
        warn_skip_once();
        return Ok(());
    };
    let fx = seed(&pool).await?;
    let state = make_state(pool);

    let create_req = Request::builder()
        .method("POST")
        .uri("/v1/runs")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::json!({ "campaign_id": fx.campaign_id }).to_string()))
        .unwrap();
    let (status, body) = call(routes::build_router(Arc::clone(&state)), create_req).await;
    assert_eq!(status, StatusCode::OK);
    let created = parse_json(body);
    assert_eq!(created["leads_total"], 1);
    assert_eq!(created["items_enqueued"], 1);
    let run_id = created["run_id"].as_str().expect("run_id present").to_string();

    let get_req =
        Request::builder().method("GET").uri(format!("/v1/runs/{run_id}")).body(axum::body::Body::empty()).unwrap();
    let (status, body) = call(routes::build_router(Arc::clone(&state)), get_req).await;
    assert_eq!(status, StatusCode::OK);
    let fetched = parse_json(body);
    assert_eq!(fetched["status"], "running");
    assert_eq!(fetched["counts_by_status"]["pending"], 1);

    let cancel_req = Request::builder()
        .method("POST")
        .uri(format!("/v1/runs/{run_id}/cancel"))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = call(routes::build_router(Arc::clone(&state)), cancel_req).await;
    assert_eq!(status, StatusCode::OK);
    let cancelled = parse_json(body);
    assert_eq!(cancelled["cancelled"], true);
    assert_eq!(cancelled["items_cancelled"], 1);

    let get_req2 =
        Request::builder().method("GET").uri(format!("/v1/runs/{run_id}")).body(axum::body::Body::empty()).unwrap();
    let (_, body) = call(routes::build_router(Arc::clone(&state)), get_req2).await;
    assert_eq!(parse_json(body)["status"], "cancelled");

    Ok(())
}

// ---------------------------------------------------------------------------
// PUT /v1/companies/:id/throttle/:channel
// ---------------------------------------------------------------------------

#[tokio::test]
async fn throttle_put_persists_rate_limits() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await else {
        warn_skip_once();
        return Ok(());
    };
    let fx = seed(&pool).await?;
    let state = make_state(pool.clone());

    let req = Request::builder()
        .method("PUT")
        .uri(format!("/v1/companies/{}/throttle/email", fx.company_id))
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::json!({ "max_per_hour": 20, "max_per_day": 200 }).to_string()))
        .unwrap();
    let (status, body) = call(routes::build_router(Arc::clone(&state)), req).await;
    assert_eq!(status, StatusCode::OK);
    let json = parse_json(body);
    assert_eq!(json["max_per_hour"], 20);
    assert_eq!(json["max_per_day"], 200);

    let row = engage_store::fetch_throttle_settings(&pool, fx.company_id, engage_schemas::Channel::Email)
        .await?
        .expect("throttle row persisted");
    assert_eq!(row.max_per_hour, 20);

    Ok(())
}

// ---------------------------------------------------------------------------
// POST /v1/webhooks/:provider
// ---------------------------------------------------------------------------

#[tokio::test]
async fn webhook_ingest_applies_a_fresh_email_bounce_event() -> anyhow::Result<()> {
    let Some(pool) = pool_or_skip().await else {
        warn_skip_once();
        return Ok(());
    };
    let fx = seed(&pool).await?;
    let state = make_state(pool.clone());

    let payload = serde_json::json!({
        "event_type": "email_bounce",
        "company_id": fx.company_id,
        "lead_id": fx.lead_id,
        "event_at_utc": chrono::Utc::now(),
    })
    .to_string();

    let req = Request::builder()
        .method("POST")
        .uri("/v1/webhooks/sendgrid")
        .header("content-type", "application/json")
        .body(axum::body::Body::from(payload))
        .unwrap();
    let (status, body) = call(routes::build_router(Arc::clone(&state)), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body)["applied"], true);

    let (bounced,): (bool,) =
        sqlx::query_as("select email_bounced from leads where lead_id = $1").bind(fx.lead_id).fetch_one(&pool).await?;
    assert!(bounced);

    Ok(())
}

// ---------------------------------------------------------------------------
// Unknown routes return 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let Some(pool) = pool_or_skip().await else {
        warn_skip_once();
        return;
    };
    let router = routes::build_router(make_state(pool));
    let req = Request::builder().method("GET").uri("/v1/does_not_exist").body(axum::body::Body::empty()).unwrap();

    let (status, _) = call(router, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
