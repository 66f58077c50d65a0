//! Wire types: routing control messages and application data packets.

use crate::{Addr, FlowKey, SeqNum};
use serde::{Deserialize, Serialize};

/// Initial time-to-live for application data packets.
///
/// Guards against forwarding loops while routes converge; generous compared
/// to any sane path length in a static scenario.
pub const DATA_TTL: u8 = 32;

/// Broadcast route discovery request.
///
/// Flooded hop-by-hop with `hop_count` incremented and `ttl` decremented at
/// every relay. `(origin, id)` uniquely identifies a discovery attempt so
/// relays can drop duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRequest {
    /// Discovery attempt id, unique per originator.
    pub id: u32,
    /// Originator's wireless address.
    pub origin: Addr,
    /// Originator's own sequence number at origination time.
    pub origin_seq: SeqNum,
    /// Destination being discovered.
    pub dest: Addr,
    /// Last destination sequence number the originator knew, if any.
    pub dest_seq_known: Option<SeqNum>,
    /// Hops traversed so far.
    pub hop_count: u32,
    /// Remaining relays permitted.
    pub ttl: u8,
}

/// Unicast route reply, sent back along the reverse path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteReply {
    /// Destination the reply describes a route to.
    pub dest: Addr,
    /// Destination's sequence number.
    pub dest_seq: SeqNum,
    /// Hops between the replier and the destination.
    pub hop_count: u32,
    /// Originator of the request this reply answers.
    pub origin: Addr,
}

/// Periodic one-hop liveness beacon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    pub origin: Addr,
    pub seq: SeqNum,
}

/// Routing control message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMessage {
    RouteRequest(RouteRequest),
    RouteReply(RouteReply),
    Hello(Hello),
}

impl ControlMessage {
    /// Message type name for logging and traffic accounting.
    pub fn type_name(&self) -> &'static str {
        match self {
            ControlMessage::RouteRequest(_) => "RouteRequest",
            ControlMessage::RouteReply(_) => "RouteReply",
            ControlMessage::Hello(_) => "Hello",
        }
    }
}

/// Application data packet.
///
/// `hops` counts forwarding steps for path-length measurement; `ttl` bounds
/// them. Both are mutated in place as the packet moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPacket {
    /// Flow this packet belongs to.
    pub flow: FlowKey,
    /// Sequence within the flow, assigned by the source.
    pub seq: u32,
    /// Payload size in bytes (payload content itself is not modeled).
    pub size: usize,
    /// Forwarding steps taken so far.
    pub hops: u32,
    /// Remaining forwarding steps permitted.
    pub ttl: u8,
}

impl DataPacket {
    pub fn new(flow: FlowKey, seq: u32, size: usize) -> Self {
        Self {
            flow,
            seq,
            size,
            hops: 0,
            ttl: DATA_TTL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_type_names() {
        let hello = ControlMessage::Hello(Hello {
            origin: Addr::new(10, 0, 1, 1),
            seq: SeqNum(1),
        });
        assert_eq!(hello.type_name(), "Hello");
    }

    #[test]
    fn data_packet_starts_at_zero_hops() {
        let flow = FlowKey {
            src: Addr::new(10, 0, 1, 1),
            dst: Addr::new(10, 0, 1, 2),
            port: 6,
        };
        let pkt = DataPacket::new(flow, 0, 1040);
        assert_eq!(pkt.hops, 0);
        assert_eq!(pkt.ttl, DATA_TTL);
    }
}
