//! Axum router and all HTTP handlers for the daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers. All handlers are `pub(crate)` so the scenario tests in
//! `tests/` can compose the router directly.

use std::collections::BTreeSet;
use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use engage_schemas::Channel;
use engage_store::{NewQueueItem, ThrottleRow};
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    api_types::{
        ErrorResponse, HealthResponse, RunCancelResponse, RunStartRequest, RunStartResponse, RunStatusResponse,
        ThrottleSetRequest, ThrottleSetResponse, WebhookIngestResponse,
    },
    state::{uptime_secs, AppState, BusMsg, StatusSnapshot},
};

const DEFAULT_MAX_RETRIES: i32 = 3;
const INITIAL_STAGE: &str = "initial";
const INITIAL_PRIORITY: i32 = 1;

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/status", get(status_handler))
        .route("/v1/stream", get(stream))
        .route("/v1/runs", post(runs_create))
        .route("/v1/runs/:id", get(runs_get))
        .route("/v1/runs/:id/cancel", post(runs_cancel))
        .route("/v1/companies/:id/throttle/:channel", put(throttle_put))
        .route("/v1/webhooks/:provider", post(webhooks_ingest))
        .with_state(state)
}

fn err(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: msg.into() })).into_response()
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/status
// ---------------------------------------------------------------------------

pub(crate) async fn status_handler(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let snap = StatusSnapshot {
        daemon_uptime_secs: uptime_secs(),
        channels_polling: Channel::all().iter().map(|c| c.as_str()).collect(),
    };

    let _ = st.bus.send(BusMsg::Status(snap.clone()));
    (StatusCode::OK, Json(snap))
}

// ---------------------------------------------------------------------------
// POST /v1/runs  (RunCampaign(campaign_id, lead_filter?) -> run_id)
// ---------------------------------------------------------------------------

/// Same multi-channel enqueue semantics as `engage-cli run start`: one
/// `initial` item per eligible `(lead, channel)` pair across the campaign's
/// channels, `leads_total` counted as distinct eligible leads.
pub(crate) async fn runs_create(State(st): State<Arc<AppState>>, Json(body): Json<RunStartRequest>) -> Response {
    let campaign = match engage_store::fetch_campaign(&st.pool, body.campaign_id).await {
        Ok(c) => c,
        Err(e) => return err(StatusCode::NOT_FOUND, format!("campaign not found: {e}")),
    };

    let filter: Option<BTreeSet<Uuid>> = body.lead_filter.map(|ids| ids.into_iter().collect());

    let mut distinct_leads: BTreeSet<Uuid> = BTreeSet::new();
    let mut to_enqueue: Vec<(Channel, Uuid)> = Vec::new();

    for channel in &campaign.channels {
        let eligible = match engage_store::fetch_eligible_leads(&st.pool, body.campaign_id, *channel).await {
            Ok(e) => e,
            Err(e) => return err(StatusCode::INTERNAL_SERVER_ERROR, format!("fetch_eligible_leads failed: {e}")),
        };
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
    if let Err(e) =
        engage_store::create_run(&st.pool, run_id, body.campaign_id, campaign.company_id, distinct_leads.len() as i64)
            .await
    {
        return err(StatusCode::INTERNAL_SERVER_ERROR, format!("create_run failed: {e}"));
    }

    let now = Utc::now();
    let mut enqueued = 0i64;
    for (channel, lead_id) in to_enqueue {
        let queued = engage_store::enqueue(
            &st.pool,
            &NewQueueItem {
                id: initial_queue_item_id(run_id, lead_id, channel),
                company_id: campaign.company_id,
                campaign_id: body.campaign_id,
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
        .await;
        match queued {
            Ok(true) => enqueued += 1,
            Ok(false) => {}
            Err(e) => warn!(%run_id, %lead_id, %e, "enqueue failed"),
        }
    }

    info!(%run_id, campaign_id = %body.campaign_id, leads_total = distinct_leads.len(), "run started");
    let _ = st.bus.send(BusMsg::RunEvent { run_id, kind: "started".to_string() });

    (
        StatusCode::OK,
        Json(RunStartResponse {
            run_id,
            campaign_id: body.campaign_id,
            leads_total: distinct_leads.len() as i64,
            items_enqueued: enqueued,
        }),
    )
        .into_response()
}

fn initial_queue_item_id(run_id: Uuid, lead_id: Uuid, channel: Channel) -> Uuid {
    let data = format!("engage-daemon.run-start.v1|{run_id}|{lead_id}|{}", channel.as_str());
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, data.as_bytes())
}

// ---------------------------------------------------------------------------
// POST /v1/runs/:id/cancel  (CancelRun)
// ---------------------------------------------------------------------------

pub(crate) async fn runs_cancel(State(st): State<Arc<AppState>>, Path(run_id): Path<Uuid>) -> Response {
    let cancelled = match engage_store::cancel_run(&st.pool, run_id).await {
        Ok(c) => c,
        Err(e) => return err(StatusCode::INTERNAL_SERVER_ERROR, format!("cancel_run failed: {e}")),
    };
    let items_cancelled = match engage_store::cancel_pending_for_run(&st.pool, run_id).await {
        Ok(n) => n,
        Err(e) => return err(StatusCode::INTERNAL_SERVER_ERROR, format!("cancel_pending_for_run failed: {e}")),
    };

    info!(%run_id, cancelled, items_cancelled, "run cancelled");
    let _ = st.bus.send(BusMsg::RunEvent { run_id, kind: "cancelled".to_string() });

    (StatusCode::OK, Json(RunCancelResponse { run_id, cancelled, items_cancelled })).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/runs/:id  (GetRun)
// ---------------------------------------------------------------------------

pub(crate) async fn runs_get(State(st): State<Arc<AppState>>, Path(run_id): Path<Uuid>) -> Response {
    let run = match engage_store::fetch_run(&st.pool, run_id).await {
        Ok(r) => r,
        Err(e) => return err(StatusCode::NOT_FOUND, format!("run not found: {e}")),
    };
    let counts_by_status = match engage_store::counts_by_status_for_run(&st.pool, run_id).await {
        Ok(c) => c,
        Err(e) => return err(StatusCode::INTERNAL_SERVER_ERROR, format!("counts_by_status_for_run failed: {e}")),
    };

    (
        StatusCode::OK,
        Json(RunStatusResponse {
            run_id: run.run_id,
            campaign_id: run.campaign_id,
            status: run.status.as_str().to_string(),
            leads_total: run.leads_total,
            leads_processed: run.leads_processed,
            counts_by_status,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// PUT /v1/companies/:id/throttle/:channel  (UpsertThrottleSettings)
// ---------------------------------------------------------------------------

pub(crate) async fn throttle_put(
    State(st): State<Arc<AppState>>,
    Path((company_id, channel)): Path<(Uuid, String)>,
    Json(body): Json<ThrottleSetRequest>,
) -> Response {
    let Some(channel) = Channel::parse(&channel) else {
        return err(StatusCode::BAD_REQUEST, format!("invalid channel '{channel}'"));
    };

    let row = ThrottleRow {
        company_id,
        channel,
        enabled: body.enabled,
        max_per_hour: body.max_per_hour,
        max_per_day: body.max_per_day,
        work_window_start_minute: body.work_window_start_minute,
        work_window_end_minute: body.work_window_end_minute,
        timezone: body.timezone,
    };

    if let Err(e) = engage_store::upsert_throttle_settings(&st.pool, &row).await {
        return err(StatusCode::INTERNAL_SERVER_ERROR, format!("upsert_throttle_settings failed: {e}"));
    }

    info!(%company_id, channel = channel.as_str(), "throttle settings updated");

    (
        StatusCode::OK,
        Json(ThrottleSetResponse {
            company_id,
            channel: channel.as_str(),
            enabled: row.enabled,
            max_per_hour: row.max_per_hour,
            max_per_day: row.max_per_day,
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/webhooks/:provider  (IngestWebhook)
// ---------------------------------------------------------------------------

/// `provider` identifies the inbound route for logging/future per-provider
/// dispatch; the payload's own `event_type` tag is what selects the
/// `WebhookEvent` variant, via the same `normalize_json`/`apply_event` path
/// `engage-cli queue process-bounces`/`process-inbound-email` use for
/// batched replay, so a live callback and a replayed batch reconcile
/// identically. Provider signature verification is not implemented: no real
/// provider integration exists to hold a verifiable secret against (SMTP/
/// telephony/LinkedIn transports are out of scope).
pub(crate) async fn webhooks_ingest(
    State(st): State<Arc<AppState>>,
    Path(provider): Path<String>,
    body: axum::body::Bytes,
) -> Response {
    let raw = match std::str::from_utf8(&body) {
        Ok(s) => s,
        Err(_) => return err(StatusCode::BAD_REQUEST, "webhook body is not valid UTF-8"),
    };

    let event = match engage_webhooks::normalize_json(raw) {
        Ok(e) => e,
        Err(e) => return err(StatusCode::BAD_REQUEST, format!("invalid {provider} webhook payload: {e}")),
    };

    match engage_webhooks::apply_event(&st.pool, &st.pause_registry, &event).await {
        Ok(outcome) => {
            let applied = outcome.is_fresh();
            info!(provider, applied, "webhook ingested");
            (StatusCode::OK, Json(WebhookIngestResponse { applied })).into_response()
        }
        Err(e) => err(StatusCode::INTERNAL_SERVER_ERROR, format!("apply_event failed: {e}")),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(rx: broadcast::Receiver<BusMsg>) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::Status(_) => "status",
                    BusMsg::RunEvent { .. } => "run",
                    BusMsg::LogLine { .. } => "log",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
