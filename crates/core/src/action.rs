//! Action types: everything a node state machine can ask the runner to do.

use std::time::Duration;

use crate::TimerId;
use manetsim_types::{Addr, ControlMessage, DataPacket};

/// Payload carried across the wormhole tunnel.
///
/// Control messages are relayed verbatim so the paired endpoint can replay
/// them; data packets traverse the tunnel when the recorded next hop is the
/// paired endpoint.
#[derive(Debug, Clone)]
pub enum TunnelPayload {
    Control(ControlMessage),
    Data(DataPacket),
}

/// Why a data packet was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Route discovery exhausted its retries with no reply.
    DiscoveryFailed,
    /// The per-destination pending queue overflowed while discovering.
    QueueOverflow,
    /// The packet's TTL reached zero in flight.
    TtlExpired,
}

/// All possible outputs from a node state machine.
///
/// Actions are executed by the runner; the state machine itself never
/// performs delivery or timing.
#[derive(Debug, Clone)]
pub enum Action {
    /// Broadcast a control message to every node in radio range.
    BroadcastControl { msg: ControlMessage },

    /// Unicast a control message to a specific neighbor.
    UnicastControl { to: Addr, msg: ControlMessage },

    /// Forward a data packet to the recorded next hop.
    ForwardData { to: Addr, packet: DataPacket },

    /// Relay a payload to the paired tunnel endpoint.
    ///
    /// Only compromised engines emit this; the runner rejects it from nodes
    /// that are not tunnel endpoints.
    TunnelRelay { payload: TunnelPayload },

    /// Arm (or re-arm) a timer.
    SetTimer { id: TimerId, duration: Duration },

    /// Cancel a pending timer. No-op if it already fired.
    CancelTimer { id: TimerId },

    /// Notify observers that the application layer transmitted a packet.
    ///
    /// Emitted exactly once per originated packet, at send-attempt time,
    /// whether or not a route exists yet.
    EmitPacketSent { packet: DataPacket },

    /// Notify observers that a packet reached its destination sink.
    EmitPacketDelivered { packet: DataPacket },

    /// Notify observers that a packet was dropped.
    EmitPacketDropped { packet: DataPacket, reason: DropReason },
}

impl Action {
    /// Action type name for telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::BroadcastControl { .. } => "BroadcastControl",
            Action::UnicastControl { .. } => "UnicastControl",
            Action::ForwardData { .. } => "ForwardData",
            Action::TunnelRelay { .. } => "TunnelRelay",
            Action::SetTimer { .. } => "SetTimer",
            Action::CancelTimer { .. } => "CancelTimer",
            Action::EmitPacketSent { .. } => "EmitPacketSent",
            Action::EmitPacketDelivered { .. } => "EmitPacketDelivered",
            Action::EmitPacketDropped { .. } => "EmitPacketDropped",
        }
    }
}
