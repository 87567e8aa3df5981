//! Per-tenant work-window eligibility.
//!
//! Deterministic, pure logic. No wall-clock of its own: the caller supplies
//! `now_utc` and the tenant's IANA timezone name; this module only decides
//! whether the resulting local time-of-day falls inside the configured
//! window.

use anyhow::{Context, Result};
use chrono::{DateTime, Timelike, Utc};
use engage_schemas::WorkWindow;

/// Minutes since local midnight for `now_utc` in `timezone`.
pub fn local_minute_of_day(now_utc: DateTime<Utc>, timezone: &str) -> Result<u16> {
    let tz: chrono_tz::Tz = timezone
        .parse()
        .with_context(|| format!("invalid IANA timezone {timezone:?}"))?;
    let local = now_utc.with_timezone(&tz);
    Ok((local.hour() * 60 + local.minute()) as u16)
}

/// `true` if `minute_of_day` falls within `window`.
///
/// Handles windows that wrap past midnight: when `end_minute < start_minute`
/// the window spans `[start_minute, 1440)` plus `[0, end_minute)`.
pub fn in_window(window: &WorkWindow, minute_of_day: u16) -> bool {
    if window.start_minute <= window.end_minute {
        minute_of_day >= window.start_minute && minute_of_day < window.end_minute
    } else {
        minute_of_day >= window.start_minute || minute_of_day < window.end_minute
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: u16, end: u16) -> WorkWindow {
        WorkWindow {
            start_minute: start,
            end_minute: end,
        }
    }

    #[test]
    fn mid_window_is_eligible() {
        // 09:00-17:00, checking noon.
        assert!(in_window(&window(9 * 60, 17 * 60), 12 * 60));
    }

    #[test]
    fn before_window_is_not_eligible() {
        assert!(!in_window(&window(9 * 60, 17 * 60), 8 * 60));
    }

    #[test]
    fn at_end_boundary_is_not_eligible() {
        assert!(!in_window(&window(9 * 60, 17 * 60), 17 * 60));
    }

    #[test]
    fn wraps_past_midnight() {
        // 22:00-06:00 overnight window.
        let w = window(22 * 60, 6 * 60);
        assert!(in_window(&w, 23 * 60));
        assert!(in_window(&w, 1 * 60));
        assert!(!in_window(&w, 12 * 60));
    }

    #[test]
    fn local_minute_of_day_converts_timezone() {
        // 2024-06-01T14:30:00Z is 10:30 in America/New_York (EDT, UTC-4).
        let now = "2024-06-01T14:30:00Z".parse::<DateTime<Utc>>().unwrap();
        let minute = local_minute_of_day(now, "America/New_York").unwrap();
        assert_eq!(minute, 10 * 60 + 30);
    }

    #[test]
    fn invalid_timezone_is_rejected() {
        let now = Utc::now();
        assert!(local_minute_of_day(now, "Not/A_Zone").is_err());
    }
}
