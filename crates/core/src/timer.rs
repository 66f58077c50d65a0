//! Timer identities for scheduled events.
//!
//! The state machine emits `Action::SetTimer` and `Action::CancelTimer`;
//! the runner converts them into deterministic event-queue entries keyed by
//! `(node, TimerId)` so a later `SetTimer` with the same id re-arms rather
//! than duplicates.

use manetsim_types::Addr;

/// Timer identification for scheduled events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Next constant-rate traffic source emission.
    SendTick,
    /// Next periodic hello beacon.
    Hello,
    /// Route discovery deadline for a destination.
    Discovery(Addr),
    /// Periodic route table purge.
    RouteCleanup,
}
