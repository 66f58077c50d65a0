//! Sequence-numbered route table.

use manetsim_types::{Addr, SeqNum};
use std::collections::HashMap;
use std::time::Duration;

/// One route table entry, keyed externally by destination address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    /// Neighbor (or tunnel peer) to hand packets to.
    pub next_hop: Addr,
    /// Path cost in hops.
    pub hop_count: u32,
    /// Destination sequence number this entry was learned with.
    pub seq: SeqNum,
    /// Virtual time at which the entry stops being valid.
    pub expires_at: Duration,
    /// Whether the entry was learned through the wormhole tunnel.
    pub via_tunnel: bool,
}

/// Per-node route table.
///
/// Expired entries are purged lazily on lookup and in bulk by the periodic
/// cleanup timer. Acceptance of a candidate entry follows the
/// freshness-then-shortest-path rule; [`RouteTable::install`] exists for the
/// compromised variant, which suppresses that check for tunnel-learned
/// routes.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    entries: HashMap<Addr, RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Valid entry for `dest`, purging it first if expired.
    pub fn lookup(&mut self, dest: Addr, now: Duration) -> Option<&RouteEntry> {
        if let Some(entry) = self.entries.get(&dest) {
            if entry.expires_at <= now {
                self.entries.remove(&dest);
                return None;
            }
        }
        self.entries.get(&dest)
    }

    /// Last known destination sequence number, even if the entry expired.
    ///
    /// Used to fill `dest_seq_known` on originated route requests.
    pub fn last_known_seq(&self, dest: Addr) -> Option<SeqNum> {
        self.entries.get(&dest).map(|e| e.seq)
    }

    /// Offer a candidate entry under the honest acceptance rule.
    ///
    /// The candidate is installed iff there is no valid existing entry, or
    /// its sequence number is strictly newer, or the sequence numbers are
    /// equal and the candidate's hop count is strictly smaller. Returns
    /// whether the candidate was installed.
    pub fn offer(&mut self, dest: Addr, candidate: RouteEntry, now: Duration) -> bool {
        match self.entries.get(&dest) {
            Some(current) if current.expires_at > now => {
                let fresher = candidate.seq.newer_than(current.seq);
                let shorter =
                    candidate.seq == current.seq && candidate.hop_count < current.hop_count;
                if fresher || shorter {
                    self.entries.insert(dest, candidate);
                    true
                } else {
                    false
                }
            }
            _ => {
                self.entries.insert(dest, candidate);
                true
            }
        }
    }

    /// Install an entry unconditionally, bypassing the freshness check.
    pub fn install(&mut self, dest: Addr, entry: RouteEntry) {
        self.entries.insert(dest, entry);
    }

    /// Extend the expiry of a route that was just used.
    pub fn refresh(&mut self, dest: Addr, expires_at: Duration) {
        if let Some(entry) = self.entries.get_mut(&dest) {
            if entry.expires_at < expires_at {
                entry.expires_at = expires_at;
            }
        }
    }

    /// Drop every entry whose expiry has passed.
    pub fn purge_expired(&mut self, now: Duration) {
        self.entries.retain(|_, e| e.expires_at > now);
    }

    /// Raw entry access for snapshots and tests (no expiry filtering).
    pub fn get(&self, dest: Addr) -> Option<&RouteEntry> {
        self.entries.get(&dest)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Addr, &RouteEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
