//! Deterministic discrete-event simulation of the network.
//!
//! Given the same seed and scenario, a run produces identical results every
//! time: one `ChaCha8Rng` owns all randomness, and the global event queue
//! breaks ties by (time, priority, node, sequence).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  SimulationRunner                       │
//! │                                                         │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │   Event Queue (BTreeMap<EventKey, ProtocolEvent>)  │ │
//! │  │   Ordered by: time, priority, node, sequence       │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │   nodes: Vec<NodeStateMachine>                     │ │
//! │  │   Each processes events sequentially               │ │
//! │  └────────────────────────┬───────────────────────────┘ │
//! │                           │                             │
//! │                           ▼                             │
//! │  ┌────────────────────────────────────────────────────┐ │
//! │  │   Actions → wireless medium / tunnel / timers      │ │
//! │  │           → new events, flow monitor taps          │ │
//! │  └────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod event_queue;
mod medium;
mod runner;
mod scenario;

pub use event_queue::EventKey;
pub use medium::{MediumConfig, WirelessMedium};
pub use runner::{SimulationRunner, SimulationStats};
pub use scenario::WormholeScenario;
