//! Internal queue-item → provider message-ID mapping.
//!
//! # Problem
//!
//! After a successful transport send, the provider assigns its own message
//! or call id (`provider_message_id` in `SendResponse`). Reconciliation via
//! webhooks (C8) must match incoming events back to the internal queue item
//! that produced them.
//!
//! # Solution
//!
//! `ProviderIdMap` is the lightweight in-memory store that maps:
//!
//! ```text
//! queue_item_id  →  provider_message_id
//! ```
//!
//! Callers must:
//! 1. Call [`ProviderIdMap::register`] immediately after every successful
//!    send that returns a provider id.
//! 2. Call [`ProviderIdMap::queue_item_id`] when a webhook event arrives, to
//!    resolve it back to the originating queue item. A `None` result means
//!    the event cannot be attributed and must be logged, not guessed.
//! 3. Call [`ProviderIdMap::deregister`] once a log reaches a terminal
//!    reconciliation state, to keep the map bounded.
//!
//! # Thread-safety
//! `ProviderIdMap` is not `Sync`. Wrap it in a `Mutex`/`RwLock` for concurrent
//! access; synchronization is the caller's responsibility.

use std::collections::HashMap;

/// Bidirectional-by-lookup map between queue item ids and provider message ids.
///
/// See the [module documentation][self] for the usage contract.
#[derive(Clone, Debug, Default)]
pub struct ProviderIdMap {
    /// queue_item_id → provider_message_id
    forward: HashMap<String, String>,
    /// provider_message_id → queue_item_id
    reverse: HashMap<String, String>,
}

impl ProviderIdMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mapping after a successful send.
    ///
    /// If the same `queue_item_id` is registered twice (an idempotent retry
    /// the provider accepted again), the mapping is overwritten with the new
    /// `provider_message_id`; the stale reverse entry is removed.
    pub fn register(&mut self, queue_item_id: impl Into<String>, provider_message_id: impl Into<String>) {
        let queue_item_id = queue_item_id.into();
        let provider_message_id = provider_message_id.into();
        if let Some(old_provider_id) = self.forward.get(&queue_item_id) {
            self.reverse.remove(old_provider_id);
        }
        self.reverse
            .insert(provider_message_id.clone(), queue_item_id.clone());
        self.forward.insert(queue_item_id, provider_message_id);
    }

    /// Look up the provider message id for a given queue item.
    pub fn provider_message_id(&self, queue_item_id: &str) -> Option<&str> {
        self.forward.get(queue_item_id).map(|s| s.as_str())
    }

    /// Look up the queue item id that produced a given provider message id.
    ///
    /// Returns `None` if the id is unknown — callers MUST treat this as an
    /// unattributable event and log it, not guess the owning item.
    pub fn queue_item_id(&self, provider_message_id: &str) -> Option<&str> {
        self.reverse.get(provider_message_id).map(|s| s.as_str())
    }

    /// Remove a mapping once reconciliation reaches a terminal state.
    pub fn deregister(&mut self, queue_item_id: &str) {
        if let Some(provider_id) = self.forward.remove(queue_item_id) {
            self.reverse.remove(&provider_id);
        }
    }

    /// Number of live mappings currently tracked.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// `true` if no mappings are currently live.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_lookup_both_directions() {
        let mut m = ProviderIdMap::new();
        m.register("q1", "prov-1");
        assert_eq!(m.provider_message_id("q1"), Some("prov-1"));
        assert_eq!(m.queue_item_id("prov-1"), Some("q1"));
    }

    #[test]
    fn reregistering_drops_the_stale_reverse_entry() {
        let mut m = ProviderIdMap::new();
        m.register("q1", "prov-1");
        m.register("q1", "prov-2");
        assert_eq!(m.provider_message_id("q1"), Some("prov-2"));
        assert_eq!(m.queue_item_id("prov-1"), None);
        assert_eq!(m.queue_item_id("prov-2"), Some("q1"));
    }

    #[test]
    fn deregister_removes_both_directions() {
        let mut m = ProviderIdMap::new();
        m.register("q1", "prov-1");
        m.deregister("q1");
        assert!(m.is_empty());
        assert_eq!(m.queue_item_id("prov-1"), None);
    }

    #[test]
    fn unknown_provider_id_is_none() {
        let m = ProviderIdMap::new();
        assert_eq!(m.queue_item_id("nope"), None);
    }
}
