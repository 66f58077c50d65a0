//! Core types for the MANET wormhole simulator.
//!
//! This crate provides the foundational types used throughout the
//! implementation:
//!
//! - **Identifiers**: NodeId, Addr, Port, SeqNum, FlowKey
//! - **Placement**: Position, NodeRole
//! - **Wire types**: RouteRequest, RouteReply, Hello, DataPacket
//! - **Topology**: static node placement with tunnel-endpoint validation
//!
//! # Design Philosophy
//!
//! This crate is self-contained with minimal dependencies. It does not depend
//! on any other workspace crates, making it the foundation layer.

mod identifiers;
mod message;
mod topology;

pub use identifiers::{Addr, FlowKey, NodeId, NodeRole, Port, Position, SeqNum};
pub use message::{ControlMessage, DataPacket, Hello, RouteReply, RouteRequest, DATA_TTL};
pub use topology::{NodeSpec, StaticTopology, TopologyError, TunnelSpec};
