//! A retried send for the same queue item must not produce a second message
//! or a different provider id — mirrors what a real provider's idempotency
//! key would guarantee.

use chrono::{TimeZone, Utc};
use engage_dispatch::{Content, DispatchError, SendRequest, Transport};
use engage_schemas::Channel;
use engage_transport_fake::FakeTransport;
use uuid::Uuid;

fn req(queue_item_id: Uuid) -> SendRequest {
    SendRequest {
        queue_item_id,
        company_id: Uuid::new_v4(),
        lead_id: Uuid::new_v4(),
        channel: Channel::Email,
        content: Content::new("hello"),
    }
}

#[test]
fn resending_the_same_queue_item_does_not_duplicate() {
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let transport = FakeTransport::with_fixed_clock(now);
    let item_id = Uuid::new_v4();

    let first = transport.send(&req(item_id)).unwrap();
    let second = transport.send(&req(item_id)).unwrap();

    assert_eq!(first.provider_message_id, second.provider_message_id);
    assert_eq!(transport.len(), 1);
}

#[test]
fn fail_next_surfaces_the_injected_error_once() {
    let transport = FakeTransport::new();
    let item_id = Uuid::new_v4();
    transport.fail_next(DispatchError::Authentication("expired token".into()));

    let err = transport.send(&req(item_id)).unwrap_err();
    assert_eq!(err, DispatchError::Authentication("expired token".into()));

    // The injected failure is consumed; the retry succeeds.
    let ok = transport.send(&req(item_id)).unwrap();
    assert!(ok.provider_message_id.is_some());
}
