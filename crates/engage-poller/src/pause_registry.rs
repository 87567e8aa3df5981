//! In-process registry of sticky per-tenant-channel pause state.
//!
//! `engage_guard::ChannelPauseState` is pure and knows nothing about
//! storage; this registry is the runtime home for it inside one poller
//! process. A future webhook/CLI-driven persistence layer can replace the
//! `HashMap` backing without changing the `PauseRegistry` API.

use std::collections::HashMap;
use std::sync::RwLock;

use engage_guard::{ChannelPauseState, PauseReason};
use engage_schemas::Channel;
use uuid::Uuid;

#[derive(Default)]
pub struct PauseRegistry {
    state: RwLock<HashMap<(Uuid, Channel), ChannelPauseState>>,
}

impl PauseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state for a tenant/channel; `Active` if never set.
    pub fn get(&self, company_id: Uuid, channel: Channel) -> ChannelPauseState {
        self.state
            .read()
            .expect("pause registry lock poisoned")
            .get(&(company_id, channel))
            .cloned()
            .unwrap_or(ChannelPauseState::Active)
    }

    pub fn pause(&self, company_id: Uuid, channel: Channel, reason: PauseReason) {
        let state = match reason {
            PauseReason::Disconnected => ChannelPauseState::disconnect(),
            PauseReason::ManualPause => ChannelPauseState::manual_pause(),
            PauseReason::ProviderSuspended => ChannelPauseState::provider_suspended(),
        };
        self.state
            .write()
            .expect("pause registry lock poisoned")
            .insert((company_id, channel), state);
    }

    pub fn reconnect(&self, company_id: Uuid, channel: Channel) {
        self.state
            .write()
            .expect("pause registry lock poisoned")
            .insert((company_id, channel), ChannelPauseState::reconnect());
    }
}
