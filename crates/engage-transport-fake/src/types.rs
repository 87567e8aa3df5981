use chrono::{DateTime, Utc};
use engage_schemas::Channel;
use uuid::Uuid;

/// Record of a message the fake transport accepted, kept for test assertions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    pub queue_item_id: Uuid,
    pub channel: Channel,
    pub body: String,
    pub provider_message_id: String,
    pub sent_at: DateTime<Utc>,
}
