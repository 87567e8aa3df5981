/// Default ceiling on a single poll's batch size, applied even when a
/// tenant's hour/day budget would allow more.
pub const DEFAULT_BATCH_SAFETY_CAP: i64 = 10;

/// Counts observed for a (company, channel) over the relevant windows,
/// supplied by the caller from `engage_store::count_sent_since`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThrottleInput {
    pub sent_last_hour: i64,
    pub sent_last_day: i64,
    /// Ceiling on this call's result regardless of remaining hour/day budget.
    pub batch_safety_cap: i64,
}

impl ThrottleInput {
    pub fn new(sent_last_hour: i64, sent_last_day: i64) -> Self {
        Self {
            sent_last_hour,
            sent_last_day,
            batch_safety_cap: DEFAULT_BATCH_SAFETY_CAP,
        }
    }

    pub fn with_batch_safety_cap(mut self, cap: i64) -> Self {
        self.batch_safety_cap = cap;
        self
    }
}

/// Why the oracle arrived at this budget.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BudgetReason {
    /// Throttle disabled for this company/channel: unlimited, capped only by batch safety.
    Unbounded,
    /// Hourly cap is the binding constraint.
    HourlyCapBinding,
    /// Daily cap is the binding constraint.
    DailyCapBinding,
    /// Remaining budget exceeds the per-batch safety cap; the cap binds.
    BatchSafetyCapBinding,
}

/// Result of one rate-limit evaluation: how many sends a poller may issue
/// right now for this (company, channel).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BudgetDecision {
    pub budget: i64,
    pub reason: BudgetReason,
}
