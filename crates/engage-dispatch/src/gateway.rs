//! Dispatch Gateway — the SINGLE choke-point for all transport sends.
//!
//! # Invariant (enforced at both compile-time and runtime)
//!
//! **Compile-time:** `Dispatcher` is `pub(crate)` to this module and is
//! never re-exported from `lib.rs` with a way to reach a transport directly.
//! The only public API that reaches a transport is `DispatchGateway`.
//!
//! **Runtime:** every call to `send` evaluates three gate verdicts in order
//! and refuses with `GateRefusal` if any fails:
//!
//! 1. `channel_active` — the tenant's channel is not paused (disconnect, manual pause, provider suspension)
//! 2. `lease_valid`    — the queue item's lease has not exceeded its max hold
//! 3. `run_active`     — the owning campaign run has not been cancelled
//!
//! Callers evaluate each verdict against the store/guard state and pass the
//! result here. The gateway is the final policy enforcer before a send
//! reaches a transport.

use crate::dispatcher::{Dispatcher, Transport};
use crate::types::{DispatchError, SendRequest, SendResponse};

/// Pre-evaluated gate verdicts the caller must supply before every send.
#[derive(Debug, Clone, Copy)]
pub struct GateVerdicts {
    pub channel_active: bool,
    pub lease_valid: bool,
    pub run_active: bool,
}

impl GateVerdicts {
    /// All gates clear — convenience helper for tests and fake-transport runs.
    pub fn all_clear() -> Self {
        Self {
            channel_active: true,
            lease_valid: true,
            run_active: true,
        }
    }
}

/// The reason a send was refused at the gateway, before it ever reached a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRefusal {
    ChannelPaused,
    LeaseExpired,
    RunCancelled,
}

impl std::fmt::Display for GateRefusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateRefusal::ChannelPaused => write!(f, "GATE_REFUSED: channel paused for tenant"),
            GateRefusal::LeaseExpired => write!(f, "GATE_REFUSED: lease no longer valid"),
            GateRefusal::RunCancelled => write!(f, "GATE_REFUSED: run has been cancelled"),
        }
    }
}

impl std::error::Error for GateRefusal {}

/// Error surface of a gated send: either the gateway refused it outright, or
/// the transport itself failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    Refused(GateRefusal),
    Dispatch(DispatchError),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::Refused(r) => write!(f, "{r}"),
            GatewayError::Dispatch(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for GatewayError {}

/// The SINGLE choke-point through which ALL transport sends must flow.
///
/// `DispatchGateway` owns a private `Dispatcher<T>`. Because `Dispatcher`
/// is only constructible within this crate, external code can only reach a
/// transport through `DispatchGateway::send`, which evaluates the three gate
/// checks, in fixed order, before delegating.
pub struct DispatchGateway<T: Transport> {
    dispatcher: Dispatcher<T>,
}

impl<T: Transport> DispatchGateway<T> {
    pub fn new(transport: T) -> Self {
        Self {
            dispatcher: Dispatcher::new(transport),
        }
    }

    fn enforce_gates(verdicts: &GateVerdicts) -> Result<(), GateRefusal> {
        if !verdicts.channel_active {
            return Err(GateRefusal::ChannelPaused);
        }
        if !verdicts.lease_valid {
            return Err(GateRefusal::LeaseExpired);
        }
        if !verdicts.run_active {
            return Err(GateRefusal::RunCancelled);
        }
        Ok(())
    }

    /// Send through the gateway. All three gates must be clear before the
    /// request reaches the underlying transport.
    pub fn send(&self, req: &SendRequest, verdicts: &GateVerdicts) -> Result<SendResponse, GatewayError> {
        Self::enforce_gates(verdicts).map_err(GatewayError::Refused)?;
        self.dispatcher.dispatch(req).map_err(GatewayError::Dispatch)
    }
}
