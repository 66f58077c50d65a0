//! Behavioral split between honest and compromised nodes.

use manetsim_types::ControlMessage;
use std::fmt;

/// Hop count advertised for anything that crossed the tunnel.
///
/// Pinning the metric to one hop is what makes wormhole routes look
/// shorter than any multi-hop wireless path.
pub const TUNNEL_HOP_COUNT: u32 = 1;

/// Hooks the routing engine consults at the points where a compromised
/// node deviates from the protocol. The honest variant is all defaults.
pub trait ProtocolVariant: fmt::Debug + Send {
    /// Whether this node participates in hello beaconing.
    fn hello_enabled(&self) -> bool {
        true
    }

    /// A copy of `msg` to relay through the tunnel, if any.
    fn tunnel_copy(&self, _msg: &ControlMessage) -> Option<ControlMessage> {
        None
    }

    /// Whether routes learned through the tunnel skip the freshness check.
    fn accepts_tunnel_unconditionally(&self) -> bool {
        false
    }
}

/// Protocol-conformant node.
#[derive(Debug, Default, Clone, Copy)]
pub struct Honest;

impl ProtocolVariant for Honest {}

/// Wormhole endpoint.
///
/// Stays silent on hellos, siphons route requests and replies into the
/// tunnel, and trusts anything that comes back out of it.
#[derive(Debug, Default, Clone, Copy)]
pub struct Compromised;

impl ProtocolVariant for Compromised {
    fn hello_enabled(&self) -> bool {
        false
    }

    fn tunnel_copy(&self, msg: &ControlMessage) -> Option<ControlMessage> {
        match msg {
            ControlMessage::RouteRequest(_) | ControlMessage::RouteReply(_) => Some(msg.clone()),
            ControlMessage::Hello(_) => None,
        }
    }

    fn accepts_tunnel_unconditionally(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manetsim_types::{Addr, Hello, RouteRequest, SeqNum};

    fn rreq() -> ControlMessage {
        ControlMessage::RouteRequest(RouteRequest {
            id: 1,
            origin: Addr::new(10, 0, 1, 1),
            origin_seq: SeqNum(1),
            dest: Addr::new(10, 0, 1, 4),
            dest_seq_known: None,
            hop_count: 0,
            ttl: 16,
        })
    }

    #[test]
    fn honest_never_tunnels() {
        assert!(Honest.tunnel_copy(&rreq()).is_none());
        assert!(Honest.hello_enabled());
        assert!(!Honest.accepts_tunnel_unconditionally());
    }

    #[test]
    fn compromised_tunnels_routing_traffic_only() {
        assert!(Compromised.tunnel_copy(&rreq()).is_some());
        let hello = ControlMessage::Hello(Hello {
            origin: Addr::new(10, 1, 2, 1),
            seq: SeqNum(3),
        });
        assert!(Compromised.tunnel_copy(&hello).is_none());
        assert!(!Compromised.hello_enabled());
    }
}
