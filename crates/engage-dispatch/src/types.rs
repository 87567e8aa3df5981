use chrono::{DateTime, Utc};
use engage_schemas::Channel;
use uuid::Uuid;

/// Generated message content ready to hand to a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Content {
    /// Email subject line. Unused by call/LinkedIn transports.
    pub subject: Option<String>,
    /// Message body: email HTML/plaintext, call script, or LinkedIn message text.
    pub body: String,
}

impl Content {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            subject: None,
            body: body.into(),
        }
    }

    pub fn with_subject(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
            body: body.into(),
        }
    }
}

/// A single outbound send, already content-generated and ready to dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendRequest {
    /// The queue item driving this send; doubles as the idempotency key
    /// handed to the transport so retries reuse the same provider-side id
    /// where the provider supports one.
    pub queue_item_id: Uuid,
    pub company_id: Uuid,
    pub lead_id: Uuid,
    pub channel: Channel,
    pub content: Content,
}

/// Transport acknowledgement of a successful send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendResponse {
    /// Provider-assigned message/call id. `None` for transports that do not
    /// hand back an id synchronously (e.g. a LinkedIn invitation).
    pub provider_message_id: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Classified failure from a transport or content-generation attempt.
///
/// The classification drives the retry/backoff manager: some failures are
/// worth retrying, others must fail the item outright.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchError {
    /// Bad credentials or a disconnected account.
    Authentication(String),
    /// Hard bounce, invalid number, or missing profile — never retryable.
    PermanentDelivery(String),
    /// Missing campaign/lead/product or other referential defect.
    DataIntegrity(String),
    /// Content generation failed or returned malformed output.
    ContentGeneration(String),
    /// Anything else: provider timeout, 5xx, rate limit — worth retrying.
    Transient(String),
}

impl DispatchError {
    /// `true` if the retry/backoff manager should schedule another attempt.
    ///
    /// Only transient failures and content-generation failures are retryable;
    /// the spec treats content-generation failures as bounded inline retries
    /// that fall back to the normal transient retry budget once exhausted.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DispatchError::Transient(_) | DispatchError::ContentGeneration(_)
        )
    }
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Authentication(m) => write!(f, "authentication error: {m}"),
            DispatchError::PermanentDelivery(m) => write!(f, "permanent delivery failure: {m}"),
            DispatchError::DataIntegrity(m) => write!(f, "data integrity error: {m}"),
            DispatchError::ContentGeneration(m) => write!(f, "content generation error: {m}"),
            DispatchError::Transient(m) => write!(f, "transient error: {m}"),
        }
    }
}

impl std::error::Error for DispatchError {}
