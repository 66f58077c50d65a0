//! Core trait for node state machines.

use crate::{Action, ProtocolEvent};
use std::time::Duration;

/// A state machine that processes events.
///
/// All per-node behavior — routing, forwarding, traffic generation — is
/// implemented as state machines that:
///
/// - **Synchronous**: no async, no `.await`
/// - **Deterministic**: same state + event = same actions
/// - **Pure-ish**: mutate self, but perform no I/O
///
/// The runner delivers events, executes the returned actions, and converts
/// their outcomes back into events.
pub trait StateMachine {
    /// Process an event, returning actions for the runner to execute.
    ///
    /// # Guarantees
    ///
    /// - Never blocks or awaits
    /// - Given the same state and event, always returns the same actions
    /// - All I/O is performed by the runner via the returned actions
    fn handle(&mut self, event: ProtocolEvent) -> Vec<Action>;

    /// Set the current virtual time.
    ///
    /// Called by the runner before each `handle()` call.
    fn set_time(&mut self, now: Duration);

    /// The time last set via `set_time()`.
    fn now(&self) -> Duration;
}
