use engage_schemas::ThrottleSettings;

use crate::{BudgetDecision, BudgetReason, ThrottleInput};

/// Deterministic, pure budget evaluation. No IO, no time, no DB calls: the
/// caller (the poller) supplies the window counts it already fetched from
/// the store.
///
/// `budget = min(max_per_hour - sent_last_hour, max_per_day - sent_last_day)`,
/// floored at 0, then clamped by `input.batch_safety_cap`. When
/// `settings.enabled` is false the hour/day caps are ignored entirely and
/// only the batch safety cap binds.
pub fn evaluate(settings: &ThrottleSettings, input: &ThrottleInput) -> BudgetDecision {
    if !settings.enabled {
        return BudgetDecision {
            budget: input.batch_safety_cap.max(0),
            reason: BudgetReason::Unbounded,
        };
    }

    let hourly_remaining = (settings.max_per_hour - input.sent_last_hour).max(0);
    let daily_remaining = (settings.max_per_day - input.sent_last_day).max(0);

    let (mut budget, mut reason) = if hourly_remaining <= daily_remaining {
        (hourly_remaining, BudgetReason::HourlyCapBinding)
    } else {
        (daily_remaining, BudgetReason::DailyCapBinding)
    };

    if input.batch_safety_cap >= 0 && budget > input.batch_safety_cap {
        budget = input.batch_safety_cap;
        reason = BudgetReason::BatchSafetyCapBinding;
    }

    BudgetDecision { budget, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engage_schemas::Channel;
    use uuid::Uuid;

    fn settings(enabled: bool, max_per_hour: i64, max_per_day: i64) -> ThrottleSettings {
        ThrottleSettings {
            company_id: Uuid::new_v4(),
            channel: Channel::Email,
            enabled,
            max_per_hour,
            max_per_day,
            work_window: None,
            timezone: None,
        }
    }

    #[test]
    fn disabled_throttle_is_unbounded_up_to_batch_cap() {
        let cfg = settings(false, 1, 1);
        let input = ThrottleInput::new(1000, 1000);
        let d = evaluate(&cfg, &input);
        assert_eq!(d.budget, 10);
        assert_eq!(d.reason, BudgetReason::Unbounded);
    }

    #[test]
    fn hourly_cap_binds_when_tighter_than_daily() {
        let cfg = settings(true, 2, 100);
        let input = ThrottleInput::new(0, 0);
        let d = evaluate(&cfg, &input);
        assert_eq!(d.budget, 2);
        assert_eq!(d.reason, BudgetReason::HourlyCapBinding);
    }

    #[test]
    fn daily_cap_binds_when_tighter_than_hourly() {
        let cfg = settings(true, 100, 3);
        let input = ThrottleInput::new(0, 0);
        let d = evaluate(&cfg, &input);
        assert_eq!(d.budget, 3);
        assert_eq!(d.reason, BudgetReason::DailyCapBinding);
    }

    #[test]
    fn exhausted_hourly_budget_yields_zero() {
        let cfg = settings(true, 5, 100);
        let input = ThrottleInput::new(5, 10);
        let d = evaluate(&cfg, &input);
        assert_eq!(d.budget, 0);
    }

    #[test]
    fn negative_remaining_never_goes_below_zero() {
        let cfg = settings(true, 5, 100);
        let input = ThrottleInput::new(9, 10);
        let d = evaluate(&cfg, &input);
        assert_eq!(d.budget, 0, "over-budget sends must not produce a negative budget");
    }

    #[test]
    fn batch_safety_cap_binds_over_large_remaining_budget() {
        let cfg = settings(true, 1000, 1000);
        let input = ThrottleInput::new(0, 0);
        let d = evaluate(&cfg, &input);
        assert_eq!(d.budget, 10);
        assert_eq!(d.reason, BudgetReason::BatchSafetyCapBinding);
    }

    #[test]
    fn custom_batch_safety_cap_is_honored() {
        let cfg = settings(true, 1000, 1000);
        let input = ThrottleInput::new(0, 0).with_batch_safety_cap(3);
        let d = evaluate(&cfg, &input);
        assert_eq!(d.budget, 3);
    }
}
