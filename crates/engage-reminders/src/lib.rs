//! Reminder Scheduler (C7): the hourly sweep that follows up on email
//! threads which have gone quiet, per each campaign's `ReminderPlan`.

mod run_loop;
mod tick;

pub use run_loop::{run_reminder_loop, DEFAULT_INTERVAL};
pub use tick::{run_reminder_tick, ReminderTickSummary};
