//! Queue poller (C3): per-tenant-channel budget → lease → bounded dispatch
//! → drain-check, plus the C4 dispatch-one-item skeleton it drives.

mod budget;
mod dispatch_one;
mod pause_registry;
mod run_loop;
mod tick;
mod window;

pub use budget::compute_budget;
pub use dispatch_one::{dispatch_one, DispatchOutcome};
pub use pause_registry::PauseRegistry;
pub use run_loop::{default_interval, run_channel_loop};
pub use tick::{active_tenants, poll_once, TickSummary, DEFAULT_LEASE_SECONDS, DEFAULT_MAX_PARALLELISM};
pub use window::work_window_eligible;
