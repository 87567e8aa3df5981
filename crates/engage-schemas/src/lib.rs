//! Shared domain types for the campaign execution substrate.
//!
//! These are plain data carriers: no IO, no business logic. Every other
//! crate in the workspace builds on top of this one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

pub type CompanyId = Uuid;
pub type ProductId = Uuid;
pub type LeadId = Uuid;
pub type CampaignId = Uuid;
pub type RunId = Uuid;
pub type QueueItemId = Uuid;
pub type LogId = Uuid;

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Call,
    Linkedin,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::Call => "call",
            Channel::Linkedin => "linkedin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "email" => Some(Channel::Email),
            "call" => Some(Channel::Call),
            "linkedin" => Some(Channel::Linkedin),
            _ => None,
        }
    }

    pub fn all() -> [Channel; 3] {
        [Channel::Email, Channel::Call, Channel::Linkedin]
    }
}

// ---------------------------------------------------------------------------
// QueueItem status / stage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Processing,
    Sent,
    Failed,
    Cancelled,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Processing => "processing",
            QueueStatus::Sent => "sent",
            QueueStatus::Failed => "failed",
            QueueStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(QueueStatus::Pending),
            "processing" => Some(QueueStatus::Processing),
            "sent" => Some(QueueStatus::Sent),
            "failed" => Some(QueueStatus::Failed),
            "cancelled" => Some(QueueStatus::Cancelled),
            _ => None,
        }
    }

    /// `sent`, `failed`, and `cancelled` are terminal; no further transition
    /// is legal once an item reaches one of these.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueueStatus::Sent | QueueStatus::Failed | QueueStatus::Cancelled
        )
    }
}

/// `initial`, or `r1`/`r2`/... for reminder stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage(pub String);

impl Stage {
    pub fn initial() -> Self {
        Stage("initial".to_string())
    }

    pub fn reminder(k: u32) -> Self {
        Stage(format!("r{k}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reminder ordinal, if this stage is a reminder stage (`r1` -> `Some(1)`).
    pub fn reminder_ordinal(&self) -> Option<u32> {
        self.0.strip_prefix('r').and_then(|n| n.parse().ok())
    }
}

// ---------------------------------------------------------------------------
// Reminder strategy tags (C7)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyTag {
    Gentle,
    ValueAdd,
    SocialProof,
    ProblemSolution,
    Urgency,
    AltApproach,
    BreakUp,
}

impl StrategyTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyTag::Gentle => "gentle",
            StrategyTag::ValueAdd => "value-add",
            StrategyTag::SocialProof => "social-proof",
            StrategyTag::ProblemSolution => "problem-solution",
            StrategyTag::Urgency => "urgency",
            StrategyTag::AltApproach => "alt-approach",
            StrategyTag::BreakUp => "break-up",
        }
    }
}

/// Per-stage reminder configuration. `days_between` is resolved here rather
/// than on `Campaign` directly so a campaign can mix a uniform cadence with
/// per-stage overrides (see the Reminder Scheduler open question).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderStageConfig {
    pub stage: Stage,
    pub days_between: i64,
    pub strategy_tag: StrategyTag,
}

/// `n_reminders` + cadence, attached to a [`Campaign`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderPlan {
    pub n_reminders: u32,
    /// Uniform fallback used when `per_stage` does not cover a stage.
    pub uniform_days_between: i64,
    pub per_stage: Vec<ReminderStageConfig>,
}

impl ReminderPlan {
    pub fn days_between_for(&self, k: u32) -> i64 {
        let stage = Stage::reminder(k);
        self.per_stage
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.days_between)
            .unwrap_or(self.uniform_days_between)
    }

    pub fn strategy_tag_for(&self, k: u32) -> Option<StrategyTag> {
        let stage = Stage::reminder(k);
        self.per_stage
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.strategy_tag)
    }
}

// ---------------------------------------------------------------------------
// Tenant-facing entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub company_id: CompanyId,
    pub name: String,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Company {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub product_id: ProductId,
    pub company_id: CompanyId,
    pub name: String,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub lead_id: LeadId,
    pub company_id: CompanyId,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_id: Option<String>,
    pub linkedin_network_distance: Option<u8>,
    pub email_bounced: bool,
    pub unsubscribed: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Lead {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn has_contact_for(&self, channel: Channel) -> bool {
        match channel {
            Channel::Email => self.email.is_some() && !self.email_bounced && !self.unsubscribed,
            Channel::Call => self.phone.is_some(),
            Channel::Linkedin => self.linkedin_id.is_some(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub campaign_id: CampaignId,
    pub company_id: CompanyId,
    pub product_id: ProductId,
    pub channels: Vec<Channel>,
    pub reminder_plan: ReminderPlan,
    pub deleted_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// CampaignRun (C6)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    Completed,
    Cancelled,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(RunStatus::Idle),
            "running" => Some(RunStatus::Running),
            "completed" => Some(RunStatus::Completed),
            "cancelled" => Some(RunStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignRun {
    pub run_id: RunId,
    pub campaign_id: CampaignId,
    pub company_id: CompanyId,
    pub status: RunStatus,
    pub leads_total: i64,
    pub leads_processed: i64,
    pub started_at_utc: DateTime<Utc>,
    pub completed_at_utc: Option<DateTime<Utc>>,
    pub cancelled_at_utc: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// QueueItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkWindow {
    /// Minutes since local midnight.
    pub start_minute: u16,
    pub end_minute: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: QueueItemId,
    pub company_id: CompanyId,
    pub campaign_id: CampaignId,
    pub run_id: RunId,
    pub lead_id: LeadId,
    pub channel: Channel,
    pub stage: Stage,
    pub status: QueueStatus,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub scheduled_for: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub error: Option<String>,
    pub work_window: Option<WorkWindow>,
    /// Set when the item is leased; cleared on release to a terminal or
    /// pending state. Used by `release_stale_leases`.
    pub leased_by: Option<String>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    /// Points at the initial log row a reminder item follows up on. `None`
    /// for `stage=initial` items.
    pub parent_log_id: Option<LogId>,
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailLog {
    pub id: LogId,
    pub company_id: CompanyId,
    pub campaign_id: CampaignId,
    pub lead_id: LeadId,
    pub run_id: RunId,
    pub sent_at: DateTime<Utc>,
    pub provider_message_id: String,
    pub subject: String,
    pub has_replied: bool,
    pub has_opened: bool,
    pub has_meeting_booked: bool,
    pub last_reminder_sent: Option<Stage>,
    pub last_reminder_sent_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailLogDetail {
    pub id: Uuid,
    pub email_logs_id: LogId,
    pub sender_type: String,
    pub reminder_type: Option<Stage>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallLog {
    pub id: LogId,
    pub company_id: CompanyId,
    pub campaign_id: CampaignId,
    pub lead_id: LeadId,
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub provider_call_id: String,
    pub duration_secs: Option<i64>,
    pub sentiment: Option<String>,
    pub summary: Option<String>,
    pub transcript: Option<String>,
    pub recording_url: Option<String>,
    pub has_meeting_booked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedinMessage {
    pub id: LogId,
    pub company_id: CompanyId,
    pub campaign_id: CampaignId,
    pub lead_id: LeadId,
    pub run_id: RunId,
    pub sent_at: DateTime<Utc>,
    pub kind: String, // "message" | "invitation" | "inmail"
    pub has_replied: bool,
    pub has_meeting_booked: bool,
}

// ---------------------------------------------------------------------------
// ThrottleSettings (C2)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleSettings {
    pub company_id: CompanyId,
    pub channel: Channel,
    pub enabled: bool,
    pub max_per_hour: i64,
    pub max_per_day: i64,
    pub work_window: Option<WorkWindow>,
    /// IANA timezone name the work window is interpreted in (e.g. `"America/New_York"`).
    pub timezone: Option<String>,
}
