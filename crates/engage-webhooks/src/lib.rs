//! Webhook Ingestor (C8): accepts provider callbacks (email reply/bounce/
//! open, call completion, LinkedIn account status and messages) and
//! reconciles them against stored state.
//!
//! Every handler is gated by [`watermark::gate_monotonic`] before it runs, so
//! a provider's duplicate or out-of-order redelivery is a no-op rather than
//! a double-applied mutation.

mod handlers;
mod types;
mod watermark;
pub mod wire;

pub use handlers::apply_event;
pub use types::{
    CallCompletionEvent, EmailBounceEvent, EmailOpenEvent, EmailReplyEvent, LinkedinAccountStatusEvent,
    LinkedinMessageEvent, WebhookEvent,
};
pub use watermark::{gate_monotonic, IngestOutcome};
pub use wire::{normalize, normalize_json, RawWebhookEvent, WireValidationError};
