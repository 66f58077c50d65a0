//! Event types for the deterministic node state machine.

use crate::TimerId;
use manetsim_types::{Addr, ControlMessage, DataPacket};

/// Priority levels for event ordering within the same timestamp.
///
/// Events at the same simulation time are processed in priority order.
/// Lower values = higher priority (processed first).
///
/// This preserves causality: internal consequences of prior processing are
/// handled before new timer fires, which precede fresh network input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EventPriority {
    /// Consequences of prior event processing.
    Internal = 0,
    /// Timers the node scheduled for itself.
    Timer = 1,
    /// Frames arriving from other nodes (wireless or tunnel).
    Network = 2,
    /// Application-layer activity (traffic source ticks).
    Application = 3,
}

/// All possible inputs a node can receive.
#[derive(Debug, Clone)]
pub enum ProtocolEvent {
    /// A routing control message arrived on the wireless interface.
    ControlReceived {
        /// Wireless address of the transmitting neighbor.
        from: Addr,
        msg: ControlMessage,
    },

    /// A control message relayed verbatim from the paired tunnel endpoint.
    ///
    /// Only ever delivered to the two compromised nodes.
    TunnelControlReceived { msg: ControlMessage },

    /// A data packet arrived on the wireless interface.
    DataReceived { from: Addr, packet: DataPacket },

    /// A data packet arrived through the tunnel.
    TunnelDataReceived { packet: DataPacket },

    /// The constant-rate traffic source is due to emit its next packet.
    SendTick,

    /// Periodic hello beacon is due.
    HelloTimer,

    /// A route discovery for `dest` ran out of time with no reply.
    DiscoveryTimeout { dest: Addr },

    /// Periodic purge of expired route table entries.
    RouteCleanupTimer,
}

impl ProtocolEvent {
    /// Scheduling priority for this event.
    pub fn priority(&self) -> EventPriority {
        match self {
            ProtocolEvent::ControlReceived { .. }
            | ProtocolEvent::TunnelControlReceived { .. }
            | ProtocolEvent::DataReceived { .. }
            | ProtocolEvent::TunnelDataReceived { .. } => EventPriority::Network,

            ProtocolEvent::HelloTimer
            | ProtocolEvent::DiscoveryTimeout { .. }
            | ProtocolEvent::RouteCleanupTimer => EventPriority::Timer,

            ProtocolEvent::SendTick => EventPriority::Application,
        }
    }

    /// The timer that produces this event, if it is a timer fire.
    pub fn timer_id(&self) -> Option<TimerId> {
        match self {
            ProtocolEvent::SendTick => Some(TimerId::SendTick),
            ProtocolEvent::HelloTimer => Some(TimerId::Hello),
            ProtocolEvent::DiscoveryTimeout { dest } => Some(TimerId::Discovery(*dest)),
            ProtocolEvent::RouteCleanupTimer => Some(TimerId::RouteCleanup),
            _ => None,
        }
    }

    /// Event type name for telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            ProtocolEvent::ControlReceived { .. } => "ControlReceived",
            ProtocolEvent::TunnelControlReceived { .. } => "TunnelControlReceived",
            ProtocolEvent::DataReceived { .. } => "DataReceived",
            ProtocolEvent::TunnelDataReceived { .. } => "TunnelDataReceived",
            ProtocolEvent::SendTick => "SendTick",
            ProtocolEvent::HelloTimer => "HelloTimer",
            ProtocolEvent::DiscoveryTimeout { .. } => "DiscoveryTimeout",
            ProtocolEvent::RouteCleanupTimer => "RouteCleanupTimer",
        }
    }
}
