//! Content generation contract: the other half of the per-channel
//! transport/content-generator trait pair described alongside `Transport`.

use engage_schemas::Channel;
use uuid::Uuid;

use crate::types::{Content, DispatchError};

/// Everything a content generator needs to personalize a single send.
/// Deliberately holds ids only, not full records — resolving lead/campaign/
/// product details is the generator implementation's job (it may hit a
/// database, a CRM, or an AI content service), not the dispatch layer's.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentContext {
    pub company_id: Uuid,
    pub campaign_id: Uuid,
    pub lead_id: Uuid,
    pub channel: Channel,
    pub stage: String,
}

/// One production implementor per channel, plus a fake for tests.
pub trait ContentGenerator {
    fn generate(&self, ctx: &ContentContext) -> Result<Content, DispatchError>;
}
