mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use commands::parse_channel;

#[derive(Parser)]
#[command(name = "engage")]
#[command(about = "Outbound sales engagement engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Queue ops tools (process-queues, send-reminders, process-bounces,
    /// process-inbound-email, reclaim-stale-leases)
    Queue {
        #[command(subcommand)]
        cmd: QueueCmd,
    },

    /// Campaign-run lifecycle commands
    Run {
        #[command(subcommand)]
        cmd: RunCmd,
    },

    /// Per-tenant, per-channel rate-limit settings
    Throttle {
        #[command(subcommand)]
        cmd: ThrottleCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,
    Migrate,
}

#[derive(Subcommand)]
enum QueueCmd {
    /// One poll cycle across every active tenant of `--channel`.
    ProcessQueues {
        #[arg(long)]
        channel: String,
    },
    /// One reminder sweep across every active campaign.
    SendReminders,
    /// Apply batched email-bounce webhook payloads (NDJSON on stdin).
    ProcessBounces,
    /// Apply batched inbound-email (reply/open) webhook payloads (NDJSON on stdin).
    ProcessInboundEmail,
    /// Reclaim leases abandoned by a crashed worker.
    ReclaimStaleLeases {
        #[arg(long)]
        channel: Option<String>,
        #[arg(long, default_value_t = 600)]
        cutoff_seconds: i64,
    },
}

#[derive(Subcommand)]
enum RunCmd {
    /// `RunCampaign(campaign_id, lead_filter?) -> run_id`
    Start {
        #[arg(long)]
        campaign: Uuid,
        /// Optional allowlist of lead ids to restrict this run to.
        #[arg(long = "lead-id")]
        lead_ids: Vec<Uuid>,
    },
    /// `CancelRun(run_id)`
    Cancel {
        #[arg(long = "run-id")]
        run_id: Uuid,
    },
    /// `GetRun(run_id) -> {status, leads_total, leads_processed, counts_by_status}`
    Status {
        #[arg(long = "run-id")]
        run_id: Uuid,
    },
}

#[derive(Subcommand)]
enum ThrottleCmd {
    /// `UpsertThrottleSettings(company_id, channel, settings)`
    Set {
        #[arg(long)]
        company: Uuid,
        #[arg(long)]
        channel: String,
        #[arg(long, default_value_t = true)]
        enabled: bool,
        #[arg(long)]
        max_per_hour: i32,
        #[arg(long)]
        max_per_day: i32,
        #[arg(long)]
        window_start_minute: Option<i32>,
        #[arg(long)]
        window_end_minute: Option<i32>,
        #[arg(long, default_value = "UTC")]
        timezone: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => match cmd {
            DbCmd::Status => commands::db::db_status().await?,
            DbCmd::Migrate => commands::db::db_migrate().await?,
        },

        Commands::Queue { cmd } => match cmd {
            QueueCmd::ProcessQueues { channel } => {
                let channel = parse_channel(&channel)?;
                commands::queue::process_queues(channel).await?
            }
            QueueCmd::SendReminders => commands::queue::send_reminders().await?,
            QueueCmd::ProcessBounces => commands::queue::process_bounces().await?,
            QueueCmd::ProcessInboundEmail => commands::queue::process_inbound_email().await?,
            QueueCmd::ReclaimStaleLeases { channel, cutoff_seconds } => {
                let channel = channel.map(|c| parse_channel(&c)).transpose()?;
                commands::queue::reclaim_stale_leases(channel, cutoff_seconds).await?
            }
        },

        Commands::Run { cmd } => match cmd {
            RunCmd::Start { campaign, lead_ids } => {
                let lead_filter = (!lead_ids.is_empty()).then_some(lead_ids);
                commands::run::run_start(campaign, lead_filter).await?
            }
            RunCmd::Cancel { run_id } => commands::run::run_cancel(run_id).await?,
            RunCmd::Status { run_id } => commands::run::run_status(run_id).await?,
        },

        Commands::Throttle { cmd } => match cmd {
            ThrottleCmd::Set {
                company,
                channel,
                enabled,
                max_per_hour,
                max_per_day,
                window_start_minute,
                window_end_minute,
                timezone,
            } => {
                let channel = parse_channel(&channel)?;
                commands::throttle::throttle_set(
                    company,
                    channel,
                    enabled,
                    max_per_hour,
                    max_per_day,
                    window_start_minute,
                    window_end_minute,
                    timezone,
                )
                .await?
            }
        },
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
}
