//! Per-node state machine: routing engine plus application layer.

mod state;

pub use state::NodeStateMachine;
