//! Request and response types for all daemon HTTP endpoints.
//!
//! These types are `Serialize`/`Deserialize` so they can be JSON-encoded by
//! Axum and decoded by tests. No business logic lives here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Error body shared by every failing route
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// POST /v1/runs  (RunCampaign)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RunStartRequest {
    pub campaign_id: Uuid,
    /// Optional explicit allowlist of lead ids to restrict this run to.
    #[serde(default)]
    pub lead_filter: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunStartResponse {
    pub run_id: Uuid,
    pub campaign_id: Uuid,
    pub leads_total: i64,
    pub items_enqueued: i64,
}

// ---------------------------------------------------------------------------
// POST /v1/runs/:id/cancel  (CancelRun)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RunCancelResponse {
    pub run_id: Uuid,
    pub cancelled: bool,
    pub items_cancelled: i64,
}

// ---------------------------------------------------------------------------
// GET /v1/runs/:id  (GetRun)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RunStatusResponse {
    pub run_id: Uuid,
    pub campaign_id: Uuid,
    pub status: String,
    pub leads_total: i64,
    pub leads_processed: i64,
    pub counts_by_status: BTreeMap<String, i64>,
}

// ---------------------------------------------------------------------------
// PUT /v1/companies/:id/throttle/:channel  (UpsertThrottleSettings)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ThrottleSetRequest {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub max_per_hour: i32,
    pub max_per_day: i32,
    #[serde(default)]
    pub work_window_start_minute: Option<i32>,
    #[serde(default)]
    pub work_window_end_minute: Option<i32>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_true() -> bool {
    true
}

fn default_timezone() -> String {
    "UTC".to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct ThrottleSetResponse {
    pub company_id: Uuid,
    pub channel: &'static str,
    pub enabled: bool,
    pub max_per_hour: i32,
    pub max_per_day: i32,
}

// ---------------------------------------------------------------------------
// POST /v1/webhooks/:provider  (IngestWebhook)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct WebhookIngestResponse {
    pub applied: bool,
}
