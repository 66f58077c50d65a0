//! Deterministic simulation runner.
//!
//! Owns the global event queue, the wireless medium, the tunnel transport,
//! and the flow monitor. Node state machines never perform delivery or
//! timing themselves; every action they emit comes back through here.

use crate::event_queue::EventKey;
use crate::medium::WirelessMedium;
use manetsim_core::{Action, DropReason, ProtocolEvent, StateMachine, TimerId, TunnelPayload};
use manetsim_metrics::{FlowMonitor, FlowReport};
use manetsim_node::NodeStateMachine;
use manetsim_routing::RouteEntry;
use manetsim_types::{Addr, NodeId, StaticTopology};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Deterministic simulation runner.
///
/// Processes events in deterministic order and executes actions. Given the
/// same seed and topology, produces identical results every run.
pub struct SimulationRunner {
    /// Static placement, adjacency, and tunnel wiring.
    topology: StaticTopology,

    /// All nodes, in topology order.
    nodes: Vec<NodeStateMachine>,

    /// NodeId -> index into `nodes`.
    index_of: HashMap<NodeId, usize>,

    /// Global event queue, ordered deterministically.
    event_queue: BTreeMap<EventKey, ProtocolEvent>,

    /// Sequence counter for deterministic FIFO ordering.
    sequence: u64,

    /// Current simulation time.
    now: Duration,

    /// Wireless loss and latency model.
    medium: WirelessMedium,

    /// RNG for medium conditions (seeded for determinism).
    rng: ChaCha8Rng,

    /// Timer registry for cancellation support.
    /// Maps (node, timer_id) -> event_key for removal.
    timers: HashMap<(NodeId, TimerId), EventKey>,

    /// Per-flow traffic accounting, fed by the observer actions.
    monitor: FlowMonitor,

    /// Statistics.
    stats: SimulationStats,

    started: bool,
}

/// Statistics collected during simulation.
#[derive(Debug, Default, Clone)]
pub struct SimulationStats {
    /// Total events processed.
    pub events_processed: u64,
    /// Events processed by priority class.
    pub events_by_priority: [u64; 4],
    /// Total actions generated.
    pub actions_generated: u64,
    /// Control frames scheduled for delivery.
    pub control_sent: u64,
    /// Data frames scheduled for delivery.
    pub data_sent: u64,
    /// Payloads relayed through the tunnel.
    pub tunnel_relays: u64,
    /// Frames dropped by the loss model.
    pub dropped_loss: u64,
    /// Unicast frames dropped because the target left radio range.
    pub dropped_out_of_range: u64,
    /// Packets originated by traffic sources.
    pub packets_sent: u64,
    /// Packets delivered to their destination sink.
    pub packets_delivered: u64,
    /// Packets dropped, by reason.
    pub packets_dropped_discovery: u64,
    pub packets_dropped_overflow: u64,
    pub packets_dropped_ttl: u64,
    /// Timers set.
    pub timers_set: u64,
    /// Timers cancelled.
    pub timers_cancelled: u64,
}

impl SimulationStats {
    /// Fraction of originated packets that reached their sink.
    pub fn delivery_ratio(&self) -> f64 {
        if self.packets_sent == 0 {
            return 0.0;
        }
        self.packets_delivered as f64 / self.packets_sent as f64
    }

    pub fn packets_dropped(&self) -> u64 {
        self.packets_dropped_discovery + self.packets_dropped_overflow + self.packets_dropped_ttl
    }
}

impl SimulationRunner {
    /// Create a runner over an already-validated topology.
    ///
    /// `nodes` must be in topology order; the scenario builder guarantees
    /// this.
    pub fn new(
        topology: StaticTopology,
        nodes: Vec<NodeStateMachine>,
        medium: WirelessMedium,
        seed: u64,
    ) -> Self {
        let index_of = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id(), i))
            .collect();
        info!(num_nodes = nodes.len(), seed, "Created simulation runner");
        Self {
            topology,
            nodes,
            index_of,
            event_queue: BTreeMap::new(),
            sequence: 0,
            now: Duration::ZERO,
            medium,
            rng: ChaCha8Rng::seed_from_u64(seed),
            timers: HashMap::new(),
            monitor: FlowMonitor::new(),
            stats: SimulationStats::default(),
            started: false,
        }
    }

    /// Run every node's startup hook, arming the initial timers.
    ///
    /// Idempotent; the first call wins.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        for i in 0..self.nodes.len() {
            let node_id = self.nodes[i].id();
            self.nodes[i].set_time(self.now);
            let actions = self.nodes[i].startup();
            self.stats.actions_generated += actions.len() as u64;
            for action in actions {
                self.process_action(node_id, action);
            }
        }
    }

    /// Run simulation until no more events or time limit reached.
    pub fn run_until(&mut self, end_time: Duration) {
        self.start();
        trace!(
            end_time_secs = end_time.as_secs_f64(),
            "Running simulation step"
        );

        while let Some((&key, _)) = self.event_queue.first_key_value() {
            if key.time > end_time {
                debug!(
                    remaining_events = self.event_queue.len(),
                    "Time limit reached"
                );
                break;
            }

            let Some((key, event)) = self.event_queue.pop_first() else {
                break;
            };
            self.now = key.time;
            let node_id = key.node;

            trace!(time = ?self.now, node = %node_id, kind = event.type_name(), "Processing event");

            self.stats.events_processed += 1;
            self.stats.events_by_priority[event.priority() as usize] += 1;

            let Some(&index) = self.index_of.get(&node_id) else {
                warn!(node = %node_id, "event for unknown node");
                continue;
            };
            let node = &mut self.nodes[index];
            node.set_time(self.now);
            let actions = node.handle(event);

            self.stats.actions_generated += actions.len() as u64;
            for action in actions {
                self.process_action(node_id, action);
            }
        }

        // Always advance time to end_time, even if we ran out of events, so
        // callers can rely on `now()` reaching the requested time.
        if self.now < end_time {
            self.now = end_time;
        }

        trace!(
            events_processed = self.stats.events_processed,
            actions_generated = self.stats.actions_generated,
            final_time = ?self.now,
            "Simulation step complete"
        );
    }

    /// Process an action from a node.
    fn process_action(&mut self, from: NodeId, action: Action) {
        match action {
            Action::BroadcastControl { msg } => {
                let Some(from_addr) = self.topology.addr_of(from) else {
                    return;
                };
                for neighbor in self.topology.neighbors(from) {
                    if self.medium.should_drop(&mut self.rng) {
                        self.stats.dropped_loss += 1;
                        trace!(from = %from, to = %neighbor, "broadcast frame lost");
                        continue;
                    }
                    let latency = self.medium.sample_latency(&mut self.rng);
                    self.schedule_event(
                        neighbor,
                        self.now + latency,
                        ProtocolEvent::ControlReceived {
                            from: from_addr,
                            msg: msg.clone(),
                        },
                    );
                    self.stats.control_sent += 1;
                }
            }

            Action::UnicastControl { to, msg } => {
                let Some(from_addr) = self.topology.addr_of(from) else {
                    return;
                };
                if let Some(to_id) = self.deliverable_unicast(from, to) {
                    let latency = self.medium.sample_latency(&mut self.rng);
                    self.schedule_event(
                        to_id,
                        self.now + latency,
                        ProtocolEvent::ControlReceived {
                            from: from_addr,
                            msg,
                        },
                    );
                    self.stats.control_sent += 1;
                }
            }

            Action::ForwardData { to, packet } => {
                let Some(from_addr) = self.topology.addr_of(from) else {
                    return;
                };
                if let Some(to_id) = self.deliverable_unicast(from, to) {
                    let latency = self.medium.sample_latency(&mut self.rng);
                    self.schedule_event(
                        to_id,
                        self.now + latency,
                        ProtocolEvent::DataReceived {
                            from: from_addr,
                            packet,
                        },
                    );
                    self.stats.data_sent += 1;
                }
            }

            Action::TunnelRelay { payload } => {
                let Some(peer) = self.topology.tunnel_peer(from) else {
                    warn!(node = %from, "tunnel relay from non-endpoint, dropping");
                    return;
                };
                let Some(tunnel) = self.topology.tunnel() else {
                    return;
                };
                // Fixed delay plus the sequence counter gives the tunnel
                // FIFO delivery.
                let delivery = self.now + tunnel.delay;
                let event = match payload {
                    TunnelPayload::Control(msg) => ProtocolEvent::TunnelControlReceived { msg },
                    TunnelPayload::Data(packet) => ProtocolEvent::TunnelDataReceived { packet },
                };
                self.schedule_event(peer, delivery, event);
                self.stats.tunnel_relays += 1;
            }

            Action::SetTimer { id, duration } => {
                let fire_time = self.now + duration;
                let event = timer_to_event(id);
                let key = self.schedule_event(from, fire_time, event);
                self.timers.insert((from, id), key);
                self.stats.timers_set += 1;
            }

            Action::CancelTimer { id } => {
                if let Some(key) = self.timers.remove(&(from, id)) {
                    self.event_queue.remove(&key);
                    self.stats.timers_cancelled += 1;
                }
            }

            Action::EmitPacketSent { packet } => {
                self.monitor
                    .record_tx(packet.flow, packet.size as u64, self.now);
                self.stats.packets_sent += 1;
            }

            Action::EmitPacketDelivered { packet } => {
                trace!(node = %from, flow = %packet.flow, seq = packet.seq, hops = packet.hops, "packet delivered");
                self.monitor
                    .record_rx(packet.flow, packet.size as u64, packet.hops, self.now);
                self.stats.packets_delivered += 1;
            }

            Action::EmitPacketDropped { packet, reason } => {
                debug!(node = %from, flow = %packet.flow, seq = packet.seq, ?reason, "packet dropped");
                self.monitor.record_drop(packet.flow, reason);
                match reason {
                    DropReason::DiscoveryFailed => self.stats.packets_dropped_discovery += 1,
                    DropReason::QueueOverflow => self.stats.packets_dropped_overflow += 1,
                    DropReason::TtlExpired => self.stats.packets_dropped_ttl += 1,
                }
            }
        }
    }

    /// Resolve a unicast target and apply range and loss checks.
    fn deliverable_unicast(&mut self, from: NodeId, to: Addr) -> Option<NodeId> {
        let Some(to_id) = self.topology.node_by_addr(to) else {
            warn!(from = %from, to = %to, "unicast to unknown address");
            return None;
        };
        if !self.topology.in_range(from, to_id) {
            self.stats.dropped_out_of_range += 1;
            trace!(from = %from, to = %to_id, "unicast target out of range");
            return None;
        }
        if self.medium.should_drop(&mut self.rng) {
            self.stats.dropped_loss += 1;
            trace!(from = %from, to = %to_id, "unicast frame lost");
            return None;
        }
        Some(to_id)
    }

    /// Schedule an event.
    fn schedule_event(&mut self, node: NodeId, time: Duration, event: ProtocolEvent) -> EventKey {
        self.sequence += 1;
        let key = EventKey::new(time, &event, node, self.sequence);
        self.event_queue.insert(key, event);
        key
    }

    /// Get simulation statistics.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Get current simulation time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Get a reference to a node by id.
    pub fn node(&self, id: NodeId) -> Option<&NodeStateMachine> {
        self.index_of.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn topology(&self) -> &StaticTopology {
        &self.topology
    }

    /// Freeze the flow counters into a report.
    pub fn flow_report(&self) -> FlowReport {
        self.monitor.report()
    }

    /// A node's route table entries, sorted by destination.
    pub fn routes_snapshot(&self, id: NodeId) -> Vec<(Addr, RouteEntry)> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        let mut entries: Vec<(Addr, RouteEntry)> = node
            .routes()
            .iter()
            .map(|(addr, entry)| (*addr, entry.clone()))
            .collect();
        entries.sort_by_key(|(addr, _)| *addr);
        entries
    }

    /// Walk next hops from `src` toward `dst` using current route tables.
    ///
    /// Returns the node path including both endpoints, or `None` if any hop
    /// lacks a route or a forwarding loop is detected.
    pub fn resolve_path(&self, src: NodeId, dst: NodeId) -> Option<Vec<NodeId>> {
        let dst_addr = self.topology.addr_of(dst)?;
        let mut path = vec![src];
        let mut current = src;
        while current != dst {
            if path.len() > self.nodes.len() {
                return None;
            }
            let entry = self.node(current)?.routes().get(dst_addr)?;
            let next = self.topology.node_by_addr(entry.next_hop)?;
            path.push(next);
            current = next;
        }
        Some(path)
    }
}

/// Convert a timer ID to the event it fires.
fn timer_to_event(id: TimerId) -> ProtocolEvent {
    match id {
        TimerId::SendTick => ProtocolEvent::SendTick,
        TimerId::Hello => ProtocolEvent::HelloTimer,
        TimerId::Discovery(dest) => ProtocolEvent::DiscoveryTimeout { dest },
        TimerId::RouteCleanup => ProtocolEvent::RouteCleanupTimer,
    }
}
