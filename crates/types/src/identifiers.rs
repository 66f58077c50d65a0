//! Identifier newtypes and placement primitives.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Deterministic node index.
///
/// Nodes are numbered densely from zero so the runner can index its node
/// vector directly and order events deterministically.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Interface address, rendered dotted-quad.
///
/// One address per node; the tunnel is addressed by node identity and needs
/// no address of its own. Routing state is keyed by `Addr`, never by
/// `NodeId`: the protocol only ever sees addresses.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Addr(pub u32);

impl Addr {
    /// Build an address from dotted-quad octets.
    pub const fn new(a: u8, b: u8, c: u8, d: u8) -> Self {
        Self(u32::from_be_bytes([a, b, c, d]))
    }

    /// Octets in network order.
    pub fn octets(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.octets();
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

impl fmt::Debug for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Addr({self})")
    }
}

/// Transport port used to distinguish application flows.
pub type Port = u16;

/// Flow identity: (source address, destination address, port).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowKey {
    pub src: Addr,
    pub dst: Addr,
    pub port: Port,
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}:{}", self.src, self.dst, self.port)
    }
}

/// Destination sequence number with windowed (wrapping) comparison.
///
/// Wraparound is treated as always-fresher: comparison is done on the signed
/// wrapping difference, so a number just past the wrap point beats one just
/// before it. This pins down the overflow behavior the protocol itself
/// leaves ambiguous.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, PartialOrd, Ord,
)]
#[serde(transparent)]
pub struct SeqNum(pub u32);

impl SeqNum {
    /// Strictly newer under the windowed comparison.
    pub fn newer_than(self, other: SeqNum) -> bool {
        (self.0.wrapping_sub(other.0) as i32) > 0
    }

    /// The next sequence number.
    pub fn next(self) -> SeqNum {
        SeqNum(self.0.wrapping_add(1))
    }
}

/// Role a node plays in the scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    /// Originates the measured application flow.
    Source,
    /// Terminates the measured application flow.
    Sink,
    /// Forwards honestly, no application traffic of its own.
    Normal,
    /// Wormhole tunnel endpoint running the compromised engine.
    Malicious,
}

impl NodeRole {
    pub fn is_malicious(&self) -> bool {
        matches!(self, NodeRole::Malicious)
    }
}

/// Fixed 2D placement. The scenario is static; positions never change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}
