//! Static topology: node placement, adjacency, tunnel wiring.
//!
//! The topology is fixed input, assembled once before the run. Validation is
//! strict: a misconfigured tunnel is a setup-time error, never a silent
//! no-op attack.

use crate::{Addr, NodeId, NodeRole, Position};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// A single node's static configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    pub role: NodeRole,
    pub position: Position,
    /// Wireless interface address.
    pub addr: Addr,
}

/// The out-of-band tunnel between the two colluding nodes.
///
/// Immutable for the run's duration. The tunnel owns no routing state; it is
/// a transport primitive with a fixed one-way delay and no loss.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TunnelSpec {
    pub a: NodeId,
    pub b: NodeId,
    /// Fixed one-way delay.
    pub delay: Duration,
}

/// Topology validation failures. All of these refuse the run at setup time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("duplicate node id {0}")]
    DuplicateNodeId(NodeId),
    #[error("duplicate address {0} on {1}")]
    DuplicateAddr(Addr, NodeId),
    #[error("tunnel endpoint {0} does not exist")]
    UnknownTunnelEndpoint(NodeId),
    #[error("tunnel endpoints must be two distinct nodes, got {0} twice")]
    DegenerateTunnel(NodeId),
    #[error("tunnel endpoint {0} is not a malicious node")]
    EndpointNotMalicious(NodeId),
    #[error("topology has no nodes")]
    Empty,
}

/// Static assignment of roles, positions, addresses, and the tunnel pair.
///
/// Wireless adjacency is a disc model: two nodes are neighbors when their
/// Euclidean distance is at most `radio_range`.
#[derive(Debug, Clone)]
pub struct StaticTopology {
    nodes: Vec<NodeSpec>,
    by_addr: HashMap<Addr, NodeId>,
    radio_range: f64,
    tunnel: Option<TunnelSpec>,
}

impl StaticTopology {
    /// Build and validate a topology.
    pub fn new(
        nodes: Vec<NodeSpec>,
        radio_range: f64,
        tunnel: Option<TunnelSpec>,
    ) -> Result<Self, TopologyError> {
        if nodes.is_empty() {
            return Err(TopologyError::Empty);
        }

        let mut by_addr = HashMap::new();
        let mut seen_ids = HashMap::new();
        for spec in &nodes {
            if seen_ids.insert(spec.id, ()).is_some() {
                return Err(TopologyError::DuplicateNodeId(spec.id));
            }
            if by_addr.insert(spec.addr, spec.id).is_some() {
                return Err(TopologyError::DuplicateAddr(spec.addr, spec.id));
            }
        }

        if let Some(tunnel) = &tunnel {
            if tunnel.a == tunnel.b {
                return Err(TopologyError::DegenerateTunnel(tunnel.a));
            }
            for endpoint in [tunnel.a, tunnel.b] {
                let spec = nodes
                    .iter()
                    .find(|n| n.id == endpoint)
                    .ok_or(TopologyError::UnknownTunnelEndpoint(endpoint))?;
                if !spec.role.is_malicious() {
                    return Err(TopologyError::EndpointNotMalicious(endpoint));
                }
            }
        }

        Ok(Self {
            nodes,
            by_addr,
            radio_range,
            tunnel,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NodeSpec] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeSpec> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn addr_of(&self, id: NodeId) -> Option<Addr> {
        self.node(id).map(|n| n.addr)
    }

    pub fn node_by_addr(&self, addr: Addr) -> Option<NodeId> {
        self.by_addr.get(&addr).copied()
    }

    pub fn radio_range(&self) -> f64 {
        self.radio_range
    }

    pub fn tunnel(&self) -> Option<&TunnelSpec> {
        self.tunnel.as_ref()
    }

    /// The other end of the tunnel, if `id` is an endpoint.
    pub fn tunnel_peer(&self, id: NodeId) -> Option<NodeId> {
        match self.tunnel {
            Some(TunnelSpec { a, b, .. }) if a == id => Some(b),
            Some(TunnelSpec { a, b, .. }) if b == id => Some(a),
            _ => None,
        }
    }

    /// All nodes within radio range of `id`, excluding `id` itself.
    ///
    /// The tunnel link is not wireless adjacency; endpoints out of radio
    /// range of each other are not neighbors here.
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let Some(center) = self.node(id) else {
            return Vec::new();
        };
        self.nodes
            .iter()
            .filter(|n| {
                n.id != id && n.position.distance_to(&center.position) <= self.radio_range
            })
            .map(|n| n.id)
            .collect()
    }

    /// Whether `b` is within radio range of `a`.
    pub fn in_range(&self, a: NodeId, b: NodeId) -> bool {
        match (self.node(a), self.node(b)) {
            (Some(a), Some(b)) => a.position.distance_to(&b.position) <= self.radio_range,
            _ => false,
        }
    }
}
