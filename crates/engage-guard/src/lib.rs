//! Per-tenant-channel dispatch gating: work-window eligibility and sticky
//! channel-pause state.
//!
//! Pure deterministic logic. No IO, no wall-clock of its own — callers
//! supply `now_utc` and persisted state.

mod channel_pause;
mod work_window;

pub use channel_pause::{ChannelPauseState, PauseReason};
pub use work_window::{in_window, local_minute_of_day};
