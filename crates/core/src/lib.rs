//! Core abstractions for the MANET simulator.
//!
//! This crate provides the event model shared by every node state machine:
//!
//! - [`ProtocolEvent`]: all possible inputs to a node
//! - [`Action`]: all possible outputs from a node
//! - [`EventPriority`]: ordering priority for events at the same timestamp
//! - [`TimerId`]: identities for cancellable scheduled callbacks
//! - [`StateMachine`]: the trait every per-node machine implements
//!
//! # Architecture
//!
//! ```text
//! ProtocolEvent → StateMachine::handle() → Vec<Action> → runner schedules
//! ```
//!
//! State machines are:
//! - **Synchronous**: no async, no `.await`
//! - **Deterministic**: same state + event = same actions
//! - **Pure-ish**: mutate self, perform no I/O
//!
//! All delivery, timing, and randomness live in the runner; the core never
//! blocks and never spawns threads.

mod action;
mod event;
mod timer;
mod traits;

pub use action::{Action, DropReason, TunnelPayload};
pub use event::{EventPriority, ProtocolEvent};
pub use timer::TimerId;
pub use traits::StateMachine;
