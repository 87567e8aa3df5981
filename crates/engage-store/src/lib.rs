// crates/engage-store/src/lib.rs
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use engage_schemas::{Channel, QueueStatus, RunStatus};
use serde_json::Value;
use sqlx::Row;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

pub const ENV_DB_URL: &str = "ENGAGE_DATABASE_URL";

/// Connect to Postgres using ENGAGE_DATABASE_URL.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Test helper: connect using ENGAGE_DATABASE_URL and ensure migrations are applied.
pub async fn testkit_db_pool() -> Result<PgPool> {
    let pool = connect_from_env().await?;
    migrate(&pool).await?;
    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;
    let ok = one == 1;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='companies'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok,
        has_companies_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_companies_table: bool,
}

// ---------------------------------------------------------------------------
// Companies / Products / Leads / Campaigns
// ---------------------------------------------------------------------------

pub async fn insert_company(pool: &PgPool, company_id: Uuid, name: &str) -> Result<()> {
    sqlx::query("insert into companies (company_id, name) values ($1, $2)")
        .bind(company_id)
        .bind(name)
        .execute(pool)
        .await
        .context("insert_company failed")?;
    Ok(())
}

pub async fn fetch_company_active(pool: &PgPool, company_id: Uuid) -> Result<bool> {
    let row: Option<(Option<DateTime<Utc>>,)> =
        sqlx::query_as("select deleted_at from companies where company_id = $1")
            .bind(company_id)
            .fetch_optional(pool)
            .await
            .context("fetch_company_active failed")?;
    Ok(matches!(row, Some((None,))))
}

pub async fn insert_product(
    pool: &PgPool,
    product_id: Uuid,
    company_id: Uuid,
    name: &str,
) -> Result<()> {
    sqlx::query("insert into products (product_id, company_id, name) values ($1, $2, $3)")
        .bind(product_id)
        .bind(company_id)
        .bind(name)
        .execute(pool)
        .await
        .context("insert_product failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewLead {
    pub lead_id: Uuid,
    pub company_id: Uuid,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_id: Option<String>,
    pub linkedin_network_distance: Option<i16>,
}

pub async fn insert_lead(pool: &PgPool, lead: &NewLead) -> Result<()> {
    sqlx::query(
        r#"
        insert into leads (
          lead_id, company_id, email, phone, linkedin_id, linkedin_network_distance
        ) values ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(lead.lead_id)
    .bind(lead.company_id)
    .bind(&lead.email)
    .bind(&lead.phone)
    .bind(&lead.linkedin_id)
    .bind(lead.linkedin_network_distance)
    .execute(pool)
    .await
    .context("insert_lead failed")?;
    Ok(())
}

/// Mark a lead's email as bounced (S4: cancels all pending email items, see
/// [`cancel_pending_for_lead`], and suppresses further reminders).
pub async fn mark_lead_bounced(pool: &PgPool, lead_id: Uuid) -> Result<()> {
    sqlx::query("update leads set email_bounced = true where lead_id = $1")
        .bind(lead_id)
        .execute(pool)
        .await
        .context("mark_lead_bounced failed")?;
    Ok(())
}

pub async fn mark_lead_unsubscribed(pool: &PgPool, lead_id: Uuid) -> Result<()> {
    sqlx::query("update leads set unsubscribed = true where lead_id = $1")
        .bind(lead_id)
        .execute(pool)
        .await
        .context("mark_lead_unsubscribed failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct EligibleLead {
    pub lead_id: Uuid,
}

/// Leads eligible for a channel: active, not unsubscribed, not (for email)
/// bounced, and carrying the contact field the channel requires.
pub async fn fetch_eligible_leads(
    pool: &PgPool,
    campaign_id: Uuid,
    channel: Channel,
) -> Result<Vec<EligibleLead>> {
    let contact_clause = match channel {
        Channel::Email => "l.email is not null and l.email_bounced = false",
        Channel::Call => "l.phone is not null",
        Channel::Linkedin => "l.linkedin_id is not null",
    };

    let sql = format!(
        r#"
        select l.lead_id
        from leads l
        join campaigns c on c.company_id = l.company_id
        where c.campaign_id = $1
          and l.deleted_at is null
          and l.unsubscribed = false
          and {contact_clause}
        order by l.lead_id asc
        "#
    );

    let rows = sqlx::query(&sql)
        .bind(campaign_id)
        .fetch_all(pool)
        .await
        .context("fetch_eligible_leads failed")?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(EligibleLead {
            lead_id: row.try_get("lead_id")?,
        });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Campaign-run lifecycle (C6)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunRow {
    pub run_id: Uuid,
    pub campaign_id: Uuid,
    pub company_id: Uuid,
    pub status: RunStatus,
    pub leads_total: i64,
    pub leads_processed: i64,
    pub started_at_utc: Option<DateTime<Utc>>,
    pub completed_at_utc: Option<DateTime<Utc>>,
    pub cancelled_at_utc: Option<DateTime<Utc>>,
}

fn run_row_from(row: sqlx::postgres::PgRow) -> Result<RunRow> {
    Ok(RunRow {
        run_id: row.try_get("run_id")?,
        campaign_id: row.try_get("campaign_id")?,
        company_id: row.try_get("company_id")?,
        status: RunStatus::parse(&row.try_get::<String, _>("status")?)
            .ok_or_else(|| anyhow!("invalid run status in campaign_runs row"))?,
        leads_total: row.try_get("leads_total")?,
        leads_processed: row.try_get("leads_processed")?,
        started_at_utc: row.try_get("started_at_utc")?,
        completed_at_utc: row.try_get("completed_at_utc")?,
        cancelled_at_utc: row.try_get("cancelled_at_utc")?,
    })
}

/// Create a campaign run in `running` state with `leads_total` fixed at
/// creation time, per the `start(campaign, filter) -> run` contract.
pub async fn create_run(
    pool: &PgPool,
    run_id: Uuid,
    campaign_id: Uuid,
    company_id: Uuid,
    leads_total: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into campaign_runs (
          run_id, campaign_id, company_id, status, leads_total, leads_processed, started_at_utc
        ) values ($1, $2, $3, 'running', $4, 0, now())
        "#,
    )
    .bind(run_id)
    .bind(campaign_id)
    .bind(company_id)
    .bind(leads_total)
    .execute(pool)
    .await
    .context("create_run failed")?;
    Ok(())
}

pub async fn fetch_run(pool: &PgPool, run_id: Uuid) -> Result<RunRow> {
    let row = sqlx::query(
        r#"
        select run_id, campaign_id, company_id, status, leads_total, leads_processed,
               started_at_utc, completed_at_utc, cancelled_at_utc
        from campaign_runs
        where run_id = $1
        "#,
    )
    .bind(run_id)
    .fetch_one(pool)
    .await
    .context("fetch_run failed")?;
    run_row_from(row)
}

/// `leads_processed += delta`, guarded so the invariant `leads_processed <=
/// leads_total` can never be broken by a racing increment.
pub async fn increment_leads_processed(pool: &PgPool, run_id: Uuid, delta: i64) -> Result<()> {
    sqlx::query(
        r#"
        update campaign_runs
           set leads_processed = least(leads_processed + $2, leads_total)
         where run_id = $1
        "#,
    )
    .bind(run_id)
    .bind(delta)
    .execute(pool)
    .await
    .context("increment_leads_processed failed")?;
    Ok(())
}

/// `running -> cancelled`. Idempotent: a second call on an already-cancelled
/// run is a no-op (guarded by the `where status = 'running'` clause).
pub async fn cancel_run(pool: &PgPool, run_id: Uuid) -> Result<bool> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        update campaign_runs
           set status = 'cancelled',
               cancelled_at_utc = now()
         where run_id = $1
           and status = 'running'
        returning run_id
        "#,
    )
    .bind(run_id)
    .fetch_optional(pool)
    .await
    .context("cancel_run failed")?;
    Ok(row.is_some())
}

/// `running -> completed`. Idempotent; only takes effect from `running`.
pub async fn complete_run(pool: &PgPool, run_id: Uuid) -> Result<bool> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        update campaign_runs
           set status = 'completed',
               completed_at_utc = now()
         where run_id = $1
           and status = 'running'
        returning run_id
        "#,
    )
    .bind(run_id)
    .fetch_optional(pool)
    .await
    .context("complete_run failed")?;
    Ok(row.is_some())
}

/// Drain predicate: true when no queue item across any channel for this run
/// remains `pending` or `processing`.
pub async fn run_is_drained(pool: &PgPool, run_id: Uuid) -> Result<bool> {
    for channel in Channel::all() {
        let table = queue_table(channel);
        let sql = format!(
            "select count(*)::bigint from {table} where run_id = $1 and status in ('pending','processing')"
        );
        let (n,): (i64,) = sqlx::query_as(&sql)
            .bind(run_id)
            .fetch_one(pool)
            .await
            .context("run_is_drained failed")?;
        if n > 0 {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Queue item counts by status across every channel, for `GetRun`'s
/// `counts_by_status` field. Statuses with zero items are omitted.
pub async fn counts_by_status_for_run(
    pool: &PgPool,
    run_id: Uuid,
) -> Result<std::collections::BTreeMap<String, i64>> {
    let mut counts: std::collections::BTreeMap<String, i64> = std::collections::BTreeMap::new();
    for channel in Channel::all() {
        let table = queue_table(channel);
        let sql = format!("select status, count(*)::bigint from {table} where run_id = $1 group by status");
        let rows: Vec<(String, i64)> = sqlx::query_as(&sql)
            .bind(run_id)
            .fetch_all(pool)
            .await
            .context("counts_by_status_for_run failed")?;
        for (status, n) in rows {
            *counts.entry(status).or_insert(0) += n;
        }
    }
    Ok(counts)
}

// ---------------------------------------------------------------------------
// Queue (C1 Store contract consumed by C3/C4/C5/C6/C7)
// ---------------------------------------------------------------------------

fn queue_table(channel: Channel) -> &'static str {
    match channel {
        Channel::Email => "email_queue",
        Channel::Call => "call_queue",
        Channel::Linkedin => "linkedin_queue",
    }
}

#[derive(Debug, Clone)]
pub struct QueueItemRow {
    pub id: Uuid,
    pub company_id: Uuid,
    pub campaign_id: Uuid,
    pub run_id: Uuid,
    pub lead_id: Uuid,
    pub channel: Channel,
    pub stage: String,
    pub status: QueueStatus,
    pub priority: i32,
    pub created_at_utc: DateTime<Utc>,
    pub scheduled_for_utc: DateTime<Utc>,
    pub processed_at_utc: Option<DateTime<Utc>>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub error: Option<String>,
    pub leased_by: Option<String>,
    pub lease_expires_at_utc: Option<DateTime<Utc>>,
    pub parent_log_id: Option<Uuid>,
}

fn queue_row_from(row: sqlx::postgres::PgRow, channel: Channel) -> Result<QueueItemRow> {
    Ok(QueueItemRow {
        id: row.try_get("id")?,
        company_id: row.try_get("company_id")?,
        campaign_id: row.try_get("campaign_id")?,
        run_id: row.try_get("run_id")?,
        lead_id: row.try_get("lead_id")?,
        channel,
        stage: row.try_get("stage")?,
        status: QueueStatus::parse(&row.try_get::<String, _>("status")?)
            .ok_or_else(|| anyhow!("invalid queue status in {} row", queue_table(channel)))?,
        priority: row.try_get("priority")?,
        created_at_utc: row.try_get("created_at_utc")?,
        scheduled_for_utc: row.try_get("scheduled_for_utc")?,
        processed_at_utc: row.try_get("processed_at_utc")?,
        retry_count: row.try_get("retry_count")?,
        max_retries: row.try_get("max_retries")?,
        error: row.try_get("error")?,
        leased_by: row.try_get("leased_by")?,
        lease_expires_at_utc: row.try_get("lease_expires_at_utc")?,
        parent_log_id: row.try_get("parent_log_id")?,
    })
}

#[derive(Debug, Clone)]
pub struct NewQueueItem {
    pub id: Uuid,
    pub company_id: Uuid,
    pub campaign_id: Uuid,
    pub run_id: Uuid,
    pub lead_id: Uuid,
    pub channel: Channel,
    pub stage: String,
    pub priority: i32,
    pub scheduled_for_utc: DateTime<Utc>,
    pub max_retries: i32,
    pub parent_log_id: Option<Uuid>,
}

/// Insert a new queue item. Duplicates within the same `(run_id, lead_id,
/// stage)` are rejected by the unique constraint on the channel's table and
/// surfaced here as `Ok(false)` rather than an error.
pub async fn enqueue(pool: &PgPool, item: &NewQueueItem) -> Result<bool> {
    let table = queue_table(item.channel);
    let sql = format!(
        r#"
        insert into {table} (
          id, company_id, campaign_id, run_id, lead_id, stage, status, priority,
          scheduled_for_utc, max_retries, parent_log_id
        ) values ($1, $2, $3, $4, $5, $6, 'pending', $7, $8, $9, $10)
        on conflict (run_id, lead_id, stage) do nothing
        returning id
        "#
    );

    let row: Option<(Uuid,)> = sqlx::query_as(&sql)
        .bind(item.id)
        .bind(item.company_id)
        .bind(item.campaign_id)
        .bind(item.run_id)
        .bind(item.lead_id)
        .bind(&item.stage)
        .bind(item.priority)
        .bind(item.scheduled_for_utc)
        .bind(item.max_retries)
        .bind(item.parent_log_id)
        .fetch_optional(pool)
        .await
        .context("enqueue failed")?;

    Ok(row.is_some())
}

/// Atomically claim up to `batch_size` `pending`, due (`scheduled_for_utc <=
/// now()`) items for one company on one channel.
///
/// Uses `FOR UPDATE SKIP LOCKED` so concurrent poller workers never claim the
/// same row. Gated behind `runtime-claim`: only the poller may call this —
/// every other crate that depends on `engage-store` leaves the feature off,
/// so attempting to lease from the CLI or daemon fails at compile time.
#[cfg(feature = "runtime-claim")]
pub async fn lease_batch(
    pool: &PgPool,
    channel: Channel,
    company_id: Uuid,
    batch_size: i64,
    worker_id: &str,
    lease_seconds: i64,
) -> Result<Vec<QueueItemRow>> {
    let table = queue_table(channel);
    let sql = format!(
        r#"
        with to_claim as (
            select id
            from {table}
            where company_id = $1
              and status = 'pending'
              and scheduled_for_utc <= now()
            order by priority asc, scheduled_for_utc asc, id asc
            limit $2
            for update skip locked
        )
        update {table}
           set status = 'processing',
               leased_by = $3,
               lease_expires_at_utc = now() + ($4 || ' seconds')::interval
         where id in (select id from to_claim)
        returning id, company_id, campaign_id, run_id, lead_id, stage, status, priority,
                  created_at_utc, scheduled_for_utc, processed_at_utc, retry_count,
                  max_retries, error, leased_by, lease_expires_at_utc, parent_log_id
        "#
    );

    let rows = sqlx::query(&sql)
        .bind(company_id)
        .bind(batch_size)
        .bind(worker_id)
        .bind(lease_seconds.to_string())
        .fetch_all(pool)
        .await
        .context("lease_batch failed")?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(queue_row_from(row, channel)?);
    }
    Ok(out)
}

/// Transition a `processing` item to a terminal state (`sent`, `failed`, or
/// `cancelled`). Returns `false` if the item was not `processing` (already
/// terminated by a racing caller, or never leased).
pub async fn terminate(
    pool: &PgPool,
    channel: Channel,
    id: Uuid,
    status: QueueStatus,
    error: Option<&str>,
) -> Result<bool> {
    if !status.is_terminal() {
        return Err(anyhow!("terminate called with non-terminal status {:?}", status));
    }
    let table = queue_table(channel);
    let sql = format!(
        r#"
        update {table}
           set status = $2,
               processed_at_utc = now(),
               error = $3
         where id = $1
           and status = 'processing'
        returning id
        "#
    );
    let row: Option<(Uuid,)> = sqlx::query_as(&sql)
        .bind(id)
        .bind(status.as_str())
        .bind(error)
        .fetch_optional(pool)
        .await
        .context("terminate failed")?;
    Ok(row.is_some())
}

/// Transition `processing -> pending` with an advanced schedule (C5 retry/backoff).
pub async fn requeue(
    pool: &PgPool,
    channel: Channel,
    id: Uuid,
    scheduled_for_utc: DateTime<Utc>,
    retry_count: i32,
    error: Option<&str>,
) -> Result<bool> {
    let table = queue_table(channel);
    let sql = format!(
        r#"
        update {table}
           set status = 'pending',
               scheduled_for_utc = $2,
               retry_count = $3,
               error = $4,
               leased_by = null,
               lease_expires_at_utc = null
         where id = $1
           and status = 'processing'
        returning id
        "#
    );
    let row: Option<(Uuid,)> = sqlx::query_as(&sql)
        .bind(id)
        .bind(scheduled_for_utc)
        .bind(retry_count)
        .bind(error)
        .fetch_optional(pool)
        .await
        .context("requeue failed")?;
    Ok(row.is_some())
}

/// Bulk-cancel all `pending` items for a lead on a channel (S4 bounce handling,
/// and run cancellation's "pending items transition immediately" clause when
/// scoped to a single run instead of a lead).
pub async fn cancel_pending_for_lead(pool: &PgPool, channel: Channel, lead_id: Uuid) -> Result<i64> {
    let table = queue_table(channel);
    let sql = format!(
        "update {table} set status = 'cancelled', processed_at_utc = now() where lead_id = $1 and status = 'pending'"
    );
    let res = sqlx::query(&sql)
        .bind(lead_id)
        .execute(pool)
        .await
        .context("cancel_pending_for_lead failed")?;
    Ok(res.rows_affected() as i64)
}

/// `cancel(run)`: transition every `pending` item of `run_id` (any channel)
/// to `cancelled` immediately. `processing` items are left alone — the
/// dispatcher checks the run's status before transport and completes or
/// fails them best-effort.
pub async fn cancel_pending_for_run(pool: &PgPool, run_id: Uuid) -> Result<i64> {
    let mut total = 0i64;
    for channel in Channel::all() {
        let table = queue_table(channel);
        let sql = format!(
            "update {table} set status = 'cancelled', processed_at_utc = now() where run_id = $1 and status = 'pending'"
        );
        let res = sqlx::query(&sql)
            .bind(run_id)
            .execute(pool)
            .await
            .context("cancel_pending_for_run failed")?;
        total += res.rows_affected() as i64;
    }
    Ok(total)
}

/// Reclaim leases whose `lease_expires_at_utc` has passed: `processing ->
/// pending`, `scheduled_for_utc` reset to now. A worker that crashed mid-send
/// leaves its items here; this is the deadman-equivalent for queue items.
pub async fn release_stale_leases(pool: &PgPool, channel: Channel, cutoff_seconds: i64) -> Result<i64> {
    if cutoff_seconds <= 0 {
        return Err(anyhow!("release_stale_leases cutoff_seconds must be > 0"));
    }
    let table = queue_table(channel);
    let sql = format!(
        r#"
        update {table}
           set status = 'pending',
               scheduled_for_utc = now(),
               leased_by = null,
               lease_expires_at_utc = null
         where status = 'processing'
           and (lease_expires_at_utc is null or lease_expires_at_utc < now())
           and created_at_utc < now() - ($1 || ' seconds')::interval
        "#
    );
    let res = sqlx::query(&sql)
        .bind(cutoff_seconds.to_string())
        .execute(pool)
        .await
        .context("release_stale_leases failed")?;
    Ok(res.rows_affected() as i64)
}

/// Recovery query: non-terminal items for a run, any channel. Used at
/// startup/ops time to inspect what a crashed poller left behind.
pub async fn list_unterminated_for_run(pool: &PgPool, run_id: Uuid) -> Result<Vec<QueueItemRow>> {
    let mut out = Vec::new();
    for channel in Channel::all() {
        let table = queue_table(channel);
        let sql = format!(
            r#"
            select id, company_id, campaign_id, run_id, lead_id, stage, status, priority,
                   created_at_utc, scheduled_for_utc, processed_at_utc, retry_count,
                   max_retries, error, leased_by, lease_expires_at_utc, parent_log_id
            from {table}
            where run_id = $1
              and status in ('pending', 'processing')
            order by id asc
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(run_id)
            .fetch_all(pool)
            .await
            .context("list_unterminated_for_run failed")?;
        for row in rows {
            out.push(queue_row_from(row, channel)?);
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Throttle settings (persistence backing C2)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ThrottleRow {
    pub company_id: Uuid,
    pub channel: Channel,
    pub enabled: bool,
    pub max_per_hour: i32,
    pub max_per_day: i32,
    pub work_window_start_minute: Option<i32>,
    pub work_window_end_minute: Option<i32>,
    pub timezone: String,
}

pub async fn upsert_throttle_settings(pool: &PgPool, row: &ThrottleRow) -> Result<()> {
    sqlx::query(
        r#"
        insert into throttle_settings (
          company_id, channel, enabled, max_per_hour, max_per_day,
          work_window_start_minute, work_window_end_minute, timezone
        ) values ($1, $2, $3, $4, $5, $6, $7, $8)
        on conflict (company_id, channel) do update
            set enabled = excluded.enabled,
                max_per_hour = excluded.max_per_hour,
                max_per_day = excluded.max_per_day,
                work_window_start_minute = excluded.work_window_start_minute,
                work_window_end_minute = excluded.work_window_end_minute,
                timezone = excluded.timezone
        "#,
    )
    .bind(row.company_id)
    .bind(row.channel.as_str())
    .bind(row.enabled)
    .bind(row.max_per_hour)
    .bind(row.max_per_day)
    .bind(row.work_window_start_minute)
    .bind(row.work_window_end_minute)
    .bind(&row.timezone)
    .execute(pool)
    .await
    .context("upsert_throttle_settings failed")?;
    Ok(())
}

pub async fn fetch_throttle_settings(
    pool: &PgPool,
    company_id: Uuid,
    channel: Channel,
) -> Result<Option<ThrottleRow>> {
    let row = sqlx::query(
        r#"
        select company_id, channel, enabled, max_per_hour, max_per_day,
               work_window_start_minute, work_window_end_minute, timezone
        from throttle_settings
        where company_id = $1 and channel = $2
        "#,
    )
    .bind(company_id)
    .bind(channel.as_str())
    .fetch_optional(pool)
    .await
    .context("fetch_throttle_settings failed")?;

    let Some(row) = row else { return Ok(None) };
    Ok(Some(ThrottleRow {
        company_id: row.try_get("company_id")?,
        channel: Channel::parse(&row.try_get::<String, _>("channel")?)
            .ok_or_else(|| anyhow!("invalid channel in throttle_settings row"))?,
        enabled: row.try_get("enabled")?,
        max_per_hour: row.try_get("max_per_hour")?,
        max_per_day: row.try_get("max_per_day")?,
        work_window_start_minute: row.try_get("work_window_start_minute")?,
        work_window_end_minute: row.try_get("work_window_end_minute")?,
        timezone: row.try_get("timezone")?,
    }))
}

/// Count items sent in the trailing window, used by the rate-limit oracle to
/// decide the remaining budget.
pub async fn count_sent_since(
    pool: &PgPool,
    channel: Channel,
    company_id: Uuid,
    since_utc: DateTime<Utc>,
) -> Result<i64> {
    let table = queue_table(channel);
    let sql = format!(
        "select count(*)::bigint from {table} where company_id = $1 and status = 'sent' and processed_at_utc >= $2"
    );
    let (n,): (i64,) = sqlx::query_as(&sql)
        .bind(company_id)
        .bind(since_utc)
        .fetch_one(pool)
        .await
        .context("count_sent_since failed")?;
    Ok(n)
}

// ---------------------------------------------------------------------------
// Webhook watermarks (persistence backing C8)
// ---------------------------------------------------------------------------

/// Load the last-accepted watermark timestamp for a (company, channel,
/// provider) stream. `None` if no webhook has ever been accepted.
pub async fn load_watermark(
    pool: &PgPool,
    company_id: Uuid,
    channel: Channel,
    provider: &str,
) -> Result<Option<DateTime<Utc>>> {
    let row: Option<(DateTime<Utc>,)> = sqlx::query_as(
        r#"
        select watermark_utc
        from webhook_watermarks
        where company_id = $1 and channel = $2 and provider = $3
        "#,
    )
    .bind(company_id)
    .bind(channel.as_str())
    .bind(provider)
    .fetch_optional(pool)
    .await
    .context("load_watermark failed")?;
    Ok(row.map(|(t,)| t))
}

/// Advance the watermark if `candidate` is newer than the stored value (or
/// none is stored yet). Returns `true` if the watermark advanced, `false` if
/// `candidate` was stale and the row was left untouched.
pub async fn advance_watermark(
    pool: &PgPool,
    company_id: Uuid,
    channel: Channel,
    provider: &str,
    candidate: DateTime<Utc>,
) -> Result<bool> {
    let row: Option<(DateTime<Utc>,)> = sqlx::query_as(
        r#"
        insert into webhook_watermarks (company_id, channel, provider, watermark_utc)
        values ($1, $2, $3, $4)
        on conflict (company_id, channel, provider) do update
            set watermark_utc = excluded.watermark_utc
            where webhook_watermarks.watermark_utc < excluded.watermark_utc
        returning watermark_utc
        "#,
    )
    .bind(company_id)
    .bind(channel.as_str())
    .bind(provider)
    .bind(candidate)
    .fetch_optional(pool)
    .await
    .context("advance_watermark failed")?;
    Ok(row.is_some())
}

// ---------------------------------------------------------------------------
// Campaigns / reminder plans (C7 persistence)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CampaignRow {
    pub campaign_id: Uuid,
    pub company_id: Uuid,
    pub product_id: Uuid,
    pub channels: Vec<Channel>,
    pub reminder_plan: engage_schemas::ReminderPlan,
    pub deleted_at: Option<DateTime<Utc>>,
}

pub async fn fetch_campaign(pool: &PgPool, campaign_id: Uuid) -> Result<CampaignRow> {
    let row = sqlx::query(
        r#"
        select campaign_id, company_id, product_id, channels, reminder_plan_json, deleted_at
        from campaigns
        where campaign_id = $1
        "#,
    )
    .bind(campaign_id)
    .fetch_one(pool)
    .await
    .context("fetch_campaign failed")?;

    let raw_channels: Vec<String> = row.try_get("channels")?;
    let mut channels = Vec::with_capacity(raw_channels.len());
    for c in raw_channels {
        channels.push(Channel::parse(&c).ok_or_else(|| anyhow!("invalid channel '{c}' in campaigns row"))?);
    }
    let reminder_plan: sqlx::types::Json<engage_schemas::ReminderPlan> = row.try_get("reminder_plan_json")?;

    Ok(CampaignRow {
        campaign_id: row.try_get("campaign_id")?,
        company_id: row.try_get("company_id")?,
        product_id: row.try_get("product_id")?,
        channels,
        reminder_plan: reminder_plan.0,
        deleted_at: row.try_get("deleted_at")?,
    })
}

/// All non-deleted campaigns. The reminder scheduler walks this list once per
/// hourly tick and skips any whose plan has `n_reminders == 0`.
pub async fn list_active_campaign_ids(pool: &PgPool) -> Result<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> =
        sqlx::query_as("select campaign_id from campaigns where deleted_at is null order by campaign_id asc")
            .fetch_all(pool)
            .await
            .context("list_active_campaign_ids failed")?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

#[derive(Debug, Clone)]
pub struct EmailLogRow {
    pub email_log_id: Uuid,
    pub company_id: Uuid,
    pub campaign_id: Uuid,
    pub lead_id: Uuid,
    pub run_id: Uuid,
    pub sent_at_utc: DateTime<Utc>,
    pub last_reminder_sent: Option<String>,
    pub last_reminder_sent_at: Option<DateTime<Utc>>,
}

/// Email logs due for reminder stage `stage` (e.g. `"r2"`): not replied, no
/// meeting booked, lead/company/campaign still active, `last_reminder_sent`
/// matching `prior_stage` (`None` for `r1`, meaning the log has had no
/// reminder yet), and last activity at or before `cutoff_utc`.
///
/// `cutoff_utc` is computed by the caller (`now - days_between` for this
/// stage) so this function stays a pure parameterized query, the same shape
/// as [`count_sent_since`].
pub async fn fetch_eligible_reminder_logs(
    pool: &PgPool,
    campaign_id: Uuid,
    prior_stage: Option<&str>,
    cutoff_utc: DateTime<Utc>,
) -> Result<Vec<EmailLogRow>> {
    let sql = r#"
        select el.email_log_id, el.company_id, el.campaign_id, el.lead_id, el.run_id,
               el.sent_at_utc, el.last_reminder_sent, el.last_reminder_sent_at
        from email_logs el
        join leads l on l.lead_id = el.lead_id
        join campaigns c on c.campaign_id = el.campaign_id
        join companies co on co.company_id = c.company_id
        where el.campaign_id = $1
          and el.has_replied = false
          and el.has_meeting_booked = false
          and l.deleted_at is null
          and c.deleted_at is null
          and co.deleted_at is null
          and el.last_reminder_sent is not distinct from $2
          and coalesce(el.last_reminder_sent_at, el.sent_at_utc) <= $3
        order by el.email_log_id asc
    "#;

    let rows = sqlx::query(sql)
        .bind(campaign_id)
        .bind(prior_stage)
        .bind(cutoff_utc)
        .fetch_all(pool)
        .await
        .context("fetch_eligible_reminder_logs failed")?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(EmailLogRow {
            email_log_id: row.try_get("email_log_id")?,
            company_id: row.try_get("company_id")?,
            campaign_id: row.try_get("campaign_id")?,
            lead_id: row.try_get("lead_id")?,
            run_id: row.try_get("run_id")?,
            sent_at_utc: row.try_get("sent_at_utc")?,
            last_reminder_sent: row.try_get("last_reminder_sent")?,
            last_reminder_sent_at: row.try_get("last_reminder_sent_at")?,
        });
    }
    Ok(out)
}

/// Stamp `last_reminder_sent`/`last_reminder_sent_at` on the parent log once
/// its reminder queue item has actually been sent (called from C4, not C7 —
/// enqueuing a reminder does not advance the cadence, sending it does).
pub async fn mark_reminder_sent(
    pool: &PgPool,
    email_log_id: Uuid,
    stage: &str,
    at_utc: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        update email_logs
           set last_reminder_sent = $2,
               last_reminder_sent_at = $3
         where email_log_id = $1
        "#,
    )
    .bind(email_log_id)
    .bind(stage)
    .bind(at_utc)
    .execute(pool)
    .await
    .context("mark_reminder_sent failed")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Webhook handler mutators (C8)
// ---------------------------------------------------------------------------

/// Email reply webhook: set `has_replied` on the specific log the provider's
/// reply-to address resolved to. Idempotent — a duplicate delivery leaves
/// `has_replied_at_utc` at its first-seen value.
pub async fn mark_email_replied(pool: &PgPool, email_log_id: Uuid, at_utc: DateTime<Utc>) -> Result<()> {
    sqlx::query(
        r#"
        update email_logs
           set has_replied = true,
               has_replied_at_utc = coalesce(has_replied_at_utc, $2)
         where email_log_id = $1
        "#,
    )
    .bind(email_log_id)
    .bind(at_utc)
    .execute(pool)
    .await
    .context("mark_email_replied failed")?;
    Ok(())
}

/// Cross-channel reply: a lead that replied over call or LinkedIn still
/// suppresses its email reminder cadence, so this scopes by (campaign, lead)
/// rather than a single log id.
pub async fn mark_replied_for_lead(
    pool: &PgPool,
    campaign_id: Uuid,
    lead_id: Uuid,
    at_utc: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        update email_logs
           set has_replied = true,
               has_replied_at_utc = coalesce(has_replied_at_utc, $3)
         where campaign_id = $1 and lead_id = $2
        "#,
    )
    .bind(campaign_id)
    .bind(lead_id)
    .bind(at_utc)
    .execute(pool)
    .await
    .context("mark_replied_for_lead failed")?;
    Ok(())
}

/// Tracking-pixel open webhook. Idempotent: flipping an already-`true` flag
/// is a no-op.
pub async fn mark_email_opened(pool: &PgPool, email_log_id: Uuid) -> Result<()> {
    sqlx::query("update email_logs set has_opened = true where email_log_id = $1")
        .bind(email_log_id)
        .execute(pool)
        .await
        .context("mark_email_opened failed")?;
    Ok(())
}

/// A meeting booked over any channel suppresses that lead's remaining email
/// reminders (see `fetch_eligible_reminder_logs`'s `has_meeting_booked` guard).
pub async fn mark_meeting_booked(pool: &PgPool, campaign_id: Uuid, lead_id: Uuid) -> Result<()> {
    sqlx::query("update email_logs set has_meeting_booked = true where campaign_id = $1 and lead_id = $2")
        .bind(campaign_id)
        .bind(lead_id)
        .execute(pool)
        .await
        .context("mark_meeting_booked failed")?;
    Ok(())
}

/// Email bounce: pending sends are terminated as `failed` rather than
/// `cancelled` — the item was never going to reach this lead, which is a
/// distinct outcome from an operator-initiated cancellation.
pub async fn fail_pending_for_lead(pool: &PgPool, channel: Channel, lead_id: Uuid, error: &str) -> Result<i64> {
    let table = queue_table(channel);
    let sql = format!(
        "update {table} set status = 'failed', error = $2, processed_at_utc = now() where lead_id = $1 and status = 'pending'"
    );
    let res = sqlx::query(&sql)
        .bind(lead_id)
        .bind(error)
        .execute(pool)
        .await
        .context("fail_pending_for_lead failed")?;
    Ok(res.rows_affected() as i64)
}

/// Call completion webhook, matched by the provider's call id. Returns the
/// `(call_log_id, campaign_id, lead_id)` of the row updated, or `None` if no
/// call log is registered under that provider id yet (a webhook that raced
/// ahead of the dispatcher's own provider-id stamp).
pub async fn apply_call_completion(
    pool: &PgPool,
    provider_call_id: &str,
    duration_seconds: Option<i32>,
    sentiment: Option<&str>,
    summary: Option<&str>,
    transcript: Option<&str>,
    recording_url: Option<&str>,
    completed_at_utc: DateTime<Utc>,
) -> Result<Option<(Uuid, Uuid, Uuid)>> {
    let row: Option<(Uuid, Uuid, Uuid)> = sqlx::query_as(
        r#"
        update call_logs
           set status = 'completed',
               duration_seconds = $2,
               sentiment = $3,
               summary = $4,
               transcript = $5,
               recording_url = $6,
               completed_at_utc = $7
         where provider_call_id = $1
        returning call_log_id, campaign_id, lead_id
        "#,
    )
    .bind(provider_call_id)
    .bind(duration_seconds)
    .bind(sentiment)
    .bind(summary)
    .bind(transcript)
    .bind(recording_url)
    .bind(completed_at_utc)
    .fetch_optional(pool)
    .await
    .context("apply_call_completion failed")?;
    Ok(row)
}

/// LinkedIn message-received webhook, matched by provider message id. Returns
/// `(campaign_id, lead_id)` so the caller can decide whether a reply should
/// also suppress that lead's email reminder cadence.
pub async fn mark_linkedin_replied(
    pool: &PgPool,
    provider_message_id: &str,
    at_utc: DateTime<Utc>,
) -> Result<Option<(Uuid, Uuid)>> {
    let row: Option<(Uuid, Uuid)> = sqlx::query_as(
        r#"
        update linkedin_messages
           set has_replied = true,
               replied_at_utc = coalesce(replied_at_utc, $2)
         where provider_message_id = $1
        returning campaign_id, lead_id
        "#,
    )
    .bind(provider_message_id)
    .bind(at_utc)
    .fetch_optional(pool)
    .await
    .context("mark_linkedin_replied failed")?;
    Ok(row)
}

// ---------------------------------------------------------------------------
// Dispatch logs (per-channel send records, C4)
// ---------------------------------------------------------------------------

/// Create the parent `email_logs` row before the send, so the log id can be
/// embedded in the rendered content (tracking pixel, reply-to address).
/// Only called for the `initial` stage — reminders reuse the original row's
/// id via `parent_log_id` instead of creating a new one.
/// Idempotent under a retried initial send: `email_log_id` is expected to be
/// deterministically derived from `(run_id, lead_id)` by the caller, so a
/// retry after a transient failure conflicts on the unique `(run_id,
/// lead_id)` constraint and reuses the existing row rather than minting a
/// second `email_logs` parent for the same send.
pub async fn insert_email_log(
    pool: &PgPool,
    email_log_id: Uuid,
    company_id: Uuid,
    campaign_id: Uuid,
    lead_id: Uuid,
    run_id: Uuid,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into email_logs (email_log_id, company_id, campaign_id, lead_id, run_id)
        values ($1, $2, $3, $4, $5)
        on conflict (run_id, lead_id) do nothing
        "#,
    )
    .bind(email_log_id)
    .bind(company_id)
    .bind(campaign_id)
    .bind(lead_id)
    .bind(run_id)
    .execute(pool)
    .await
    .context("insert_email_log failed")?;
    Ok(())
}

/// Record one send attempt's detail under an `email_logs` parent. Idempotent
/// under duplicate delivery via the unique constraint on `provider_message_id`.
pub async fn insert_email_log_detail(
    pool: &PgPool,
    email_log_detail_id: Uuid,
    email_log_id: Uuid,
    reminder_type: &str,
    provider_message_id: Option<&str>,
    subject: Option<&str>,
    body: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into email_log_details
          (email_log_detail_id, email_log_id, reminder_type, provider_message_id, subject, body)
        values ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(email_log_detail_id)
    .bind(email_log_id)
    .bind(reminder_type)
    .bind(provider_message_id)
    .bind(subject)
    .bind(body)
    .execute(pool)
    .await
    .context("insert_email_log_detail failed")?;
    Ok(())
}

/// Create a call log row. `provider_call_id` is `None` at creation time for
/// providers that return the id asynchronously; C8 fills it in on webhook.
pub async fn insert_call_log(
    pool: &PgPool,
    call_log_id: Uuid,
    campaign_id: Uuid,
    lead_id: Uuid,
    provider_call_id: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into call_logs (call_log_id, campaign_id, lead_id, provider_call_id)
        values ($1, $2, $3, $4)
        "#,
    )
    .bind(call_log_id)
    .bind(campaign_id)
    .bind(lead_id)
    .bind(provider_call_id)
    .execute(pool)
    .await
    .context("insert_call_log failed")?;
    Ok(())
}

/// Stamp the provider-assigned call id onto an already-created call log row
/// (synchronous telephony ack, or C8's asynchronous webhook).
pub async fn set_call_log_provider_id(pool: &PgPool, call_log_id: Uuid, provider_call_id: &str) -> Result<()> {
    sqlx::query("update call_logs set provider_call_id = $2 where call_log_id = $1")
        .bind(call_log_id)
        .bind(provider_call_id)
        .execute(pool)
        .await
        .context("set_call_log_provider_id failed")?;
    Ok(())
}

/// Record a LinkedIn action (`message`, `invite`, `inmail`). `provider_message_id`
/// is `None` when the provider acknowledges asynchronously.
pub async fn insert_linkedin_message(
    pool: &PgPool,
    linkedin_message_id: Uuid,
    campaign_id: Uuid,
    lead_id: Uuid,
    action: &str,
    provider_message_id: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into linkedin_messages (linkedin_message_id, campaign_id, lead_id, action, provider_message_id)
        values ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(linkedin_message_id)
    .bind(campaign_id)
    .bind(lead_id)
    .bind(action)
    .bind(provider_message_id)
    .execute(pool)
    .await
    .context("insert_linkedin_message failed")?;
    Ok(())
}

/// Stamp the provider-assigned message id onto an already-created LinkedIn
/// message row.
pub async fn set_linkedin_message_provider_id(
    pool: &PgPool,
    linkedin_message_id: Uuid,
    provider_message_id: &str,
) -> Result<()> {
    sqlx::query("update linkedin_messages set provider_message_id = $2 where linkedin_message_id = $1")
        .bind(linkedin_message_id)
        .bind(provider_message_id)
        .execute(pool)
        .await
        .context("set_linkedin_message_provider_id failed")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Audit log (ambient operational history, queryable; complements the
// file-based hash-chained audit written by engage-audit)
// ---------------------------------------------------------------------------

pub async fn insert_audit_log_row(
    pool: &PgPool,
    company_id: Uuid,
    run_id: Option<Uuid>,
    topic: &str,
    event_type: &str,
    payload: Value,
) -> Result<()> {
    sqlx::query(
        r#"
        insert into audit_log (company_id, run_id, topic, event_type, payload, ts_utc)
        values ($1, $2, $3, $4, $5, now())
        "#,
    )
    .bind(company_id)
    .bind(run_id)
    .bind(topic)
    .bind(event_type)
    .bind(payload)
    .execute(pool)
    .await
    .context("insert_audit_log_row failed")?;
    Ok(())
}
