//! Sticky per-tenant-channel pause state.
//!
//! # Invariants
//!
//! - **A pause never silently clears itself.** Unlike a boot-time default,
//!   `ChannelPauseState` does not reset when the process restarts — a paused
//!   channel stays paused until an explicit reconnect event is recorded.
//! - **Explicit reconnect is the only escape.** `ChannelPauseState::reconnect()`
//!   is the sole path back to `Active`.
//!
//! All logic here is pure and deterministic — no IO, no clock.

/// The reason a channel is paused.
///
/// Preserved in persistence so operators can see why a channel needs
/// reconnecting before dispatch resumes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PauseReason {
    /// The channel's transport reported the account/session disconnected
    /// (e.g. LinkedIn cookie expired, mailbox auth revoked).
    Disconnected,
    /// Operator explicitly paused the channel.
    ManualPause,
    /// The transport surfaced a provider-side suspension or rate-limit lock.
    ProviderSuspended,
}

/// A tenant-channel's dispatch-eligibility state.
///
/// Tracked in memory and persisted per `(tenant, channel)`. Unlike a
/// fail-closed arm state, restoring this state on restart does not reset
/// `Paused` back to `Active` — the pause is sticky across process restarts
/// and is cleared only by an explicit reconnect event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelPauseState {
    /// Dispatch is permitted on this channel.
    Active,
    /// Dispatch is blocked until an explicit reconnect clears the pause.
    Paused { reason: PauseReason },
}

impl ChannelPauseState {
    /// Restore from a persisted value, defaulting to `Active` only when no
    /// record exists yet (a channel that has never been paused).
    ///
    /// A persisted `Paused` state is carried forward unchanged: restart does
    /// not imply reconnect.
    pub fn restore(persisted: Option<ChannelPauseState>) -> Self {
        persisted.unwrap_or(ChannelPauseState::Active)
    }

    /// Transport reported the channel disconnected.
    pub fn disconnect() -> Self {
        ChannelPauseState::Paused {
            reason: PauseReason::Disconnected,
        }
    }

    /// Operator explicitly paused the channel.
    pub fn manual_pause() -> Self {
        ChannelPauseState::Paused {
            reason: PauseReason::ManualPause,
        }
    }

    /// Provider suspended the account or locked it for rate-limit reasons.
    pub fn provider_suspended() -> Self {
        ChannelPauseState::Paused {
            reason: PauseReason::ProviderSuspended,
        }
    }

    /// Explicit reconnect event — the only way back to `Active`.
    pub fn reconnect() -> Self {
        ChannelPauseState::Active
    }

    /// `true` if dispatch is permitted.
    pub fn is_active(&self) -> bool {
        matches!(self, ChannelPauseState::Active)
    }

    /// `true` if dispatch is blocked.
    pub fn is_paused(&self) -> bool {
        !self.is_active()
    }
}
