//! Reactive distance-vector routing engine.
//!
//! Per-node protocol state machine: on-demand route discovery (broadcast
//! request, unicast reply along the reverse path), a sequence-numbered route
//! table with freshness-then-shortest-path acceptance, and data forwarding
//! with a bounded pending queue while discovery is in flight.
//!
//! The engine comes in two variants selected at construction:
//!
//! - [`Honest`]: the protocol as specified.
//! - [`Compromised`]: the wormhole endpoints' variant. Control messages heard
//!   on the wireless interface are additionally relayed verbatim through the
//!   out-of-band tunnel; tunnel-relayed messages are re-emitted with the hop
//!   count pinned to one, and routes learned through the tunnel are installed
//!   without the freshness check. Hello beacons are disabled so the true
//!   neighbor set stays hidden.
//!
//! The engine performs no I/O and owns no clock; it turns events into
//! [`Action`](manetsim_core::Action)s for the runner to execute.

mod config;
mod engine;
mod table;
mod variant;

pub use config::RoutingConfig;
pub use engine::RoutingEngine;
pub use table::{RouteEntry, RouteTable};
pub use variant::{Compromised, Honest, ProtocolVariant, TUNNEL_HOP_COUNT};
