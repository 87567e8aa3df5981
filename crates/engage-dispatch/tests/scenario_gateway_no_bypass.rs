//! The gateway is the only public path to a transport, and it evaluates its
//! three gates in fixed order regardless of which fail together.

use chrono::Utc;
use engage_dispatch::{Content, DispatchError, GateRefusal, GateVerdicts, GatewayError, SendRequest, SendResponse, Transport};
use engage_dispatch::DispatchGateway;
use engage_schemas::Channel;
use uuid::Uuid;

struct AlwaysOkTransport;

impl Transport for AlwaysOkTransport {
    fn send(&self, req: &SendRequest) -> Result<SendResponse, DispatchError> {
        Ok(SendResponse {
            provider_message_id: Some(format!("prov-{}", req.queue_item_id)),
            sent_at: Utc::now(),
        })
    }
}

fn req() -> SendRequest {
    SendRequest {
        queue_item_id: Uuid::new_v4(),
        company_id: Uuid::new_v4(),
        lead_id: Uuid::new_v4(),
        channel: Channel::Email,
        content: Content::new("hello"),
    }
}

#[test]
fn every_gate_clear_reaches_the_transport() {
    let gw = DispatchGateway::new(AlwaysOkTransport);
    let resp = gw.send(&req(), &GateVerdicts::all_clear()).unwrap();
    assert!(resp.provider_message_id.is_some());
}

#[test]
fn channel_paused_refuses_before_reaching_transport_even_if_other_gates_also_fail() {
    let gw = DispatchGateway::new(AlwaysOkTransport);
    let verdicts = GateVerdicts {
        channel_active: false,
        lease_valid: false,
        run_active: false,
    };
    let err = gw.send(&req(), &verdicts).unwrap_err();
    assert_eq!(err, GatewayError::Refused(GateRefusal::ChannelPaused));
}

#[test]
fn lease_expired_refuses_when_channel_is_active() {
    let gw = DispatchGateway::new(AlwaysOkTransport);
    let verdicts = GateVerdicts {
        channel_active: true,
        lease_valid: false,
        run_active: true,
    };
    let err = gw.send(&req(), &verdicts).unwrap_err();
    assert_eq!(err, GatewayError::Refused(GateRefusal::LeaseExpired));
}
