//! Per-node routing protocol state machine.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tracing::{debug, trace, warn};

use manetsim_core::{Action, DropReason, TimerId, TunnelPayload};
use manetsim_types::{
    Addr, ControlMessage, DataPacket, Hello, RouteRequest, RouteReply, SeqNum,
};

use crate::config::RoutingConfig;
use crate::table::{RouteEntry, RouteTable};
use crate::variant::{ProtocolVariant, TUNNEL_HOP_COUNT};

/// Data packets parked while a route discovery is in flight.
#[derive(Debug)]
struct PendingDiscovery {
    queued: VecDeque<DataPacket>,
    retries_left: u32,
}

/// Reactive distance-vector routing engine for one node.
///
/// Owns the route table, the duplicate-request cache, and the pending
/// queues. All protocol logic lives here; the node state machine dispatches
/// events into it and the runner executes the actions it returns.
pub struct RoutingEngine {
    addr: Addr,
    config: RoutingConfig,
    variant: Box<dyn ProtocolVariant>,
    /// Paired wormhole endpoint address, for compromised nodes only.
    tunnel_peer: Option<Addr>,

    /// This node's own destination sequence number.
    seq: SeqNum,
    next_rreq_id: u32,
    table: RouteTable,
    pending: HashMap<Addr, PendingDiscovery>,
    /// `(origin, id)` pairs already processed, with insertion time.
    seen_requests: HashMap<(Addr, u32), Duration>,

    now: Duration,
}

impl std::fmt::Debug for RoutingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingEngine")
            .field("addr", &self.addr)
            .field("seq", &self.seq)
            .field("routes", &self.table.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl RoutingEngine {
    pub fn new(
        addr: Addr,
        config: RoutingConfig,
        variant: Box<dyn ProtocolVariant>,
        tunnel_peer: Option<Addr>,
    ) -> Self {
        Self {
            addr,
            config,
            variant,
            tunnel_peer,
            seq: SeqNum(0),
            next_rreq_id: 0,
            table: RouteTable::new(),
            pending: HashMap::new(),
            seen_requests: HashMap::new(),
            now: Duration::ZERO,
        }
    }

    pub fn addr(&self) -> Addr {
        self.addr
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    pub fn set_time(&mut self, now: Duration) {
        self.now = now;
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Actions to run once at simulation start: arm the periodic timers.
    pub fn startup(&self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.variant.hello_enabled() {
            if let Some(interval) = self.config.hello_interval {
                actions.push(Action::SetTimer {
                    id: TimerId::Hello,
                    duration: interval,
                });
            }
        }
        actions.push(Action::SetTimer {
            id: TimerId::RouteCleanup,
            duration: self.config.cleanup_interval,
        });
        actions
    }

    /// Originate a data packet from this node's application layer.
    ///
    /// Forwards immediately when a route exists; otherwise buffers the
    /// packet and starts (or joins) a discovery for the destination.
    pub fn send_data(&mut self, packet: DataPacket) -> Vec<Action> {
        self.forward_or_discover(packet)
    }

    /// A data packet in transit arrived on the wireless interface.
    pub fn on_data(&mut self, from: Addr, mut packet: DataPacket) -> Vec<Action> {
        trace!(node = %self.addr, %from, seq = packet.seq, "data in transit");
        if packet.ttl <= 1 {
            debug!(node = %self.addr, flow = ?packet.flow, seq = packet.seq, "ttl exhausted");
            return vec![Action::EmitPacketDropped {
                packet,
                reason: DropReason::TtlExpired,
            }];
        }
        packet.ttl -= 1;
        self.forward_or_discover(packet)
    }

    /// A data packet arrived through the tunnel.
    pub fn on_tunnel_data(&mut self, packet: DataPacket) -> Vec<Action> {
        if self.tunnel_peer.is_none() {
            warn!(node = %self.addr, "tunnel data at node without tunnel, dropping");
            return Vec::new();
        }
        // Tunnel traversal counts like any other transit hop.
        let from = self.tunnel_peer.unwrap_or(self.addr);
        self.on_data(from, packet)
    }

    /// A routing control message arrived on the wireless interface.
    pub fn handle_control(&mut self, from: Addr, msg: ControlMessage) -> Vec<Action> {
        let mut actions = Vec::new();

        // Compromised endpoints siphon a verbatim copy into the tunnel
        // before normal processing.
        if let Some(copy) = self.variant.tunnel_copy(&msg) {
            trace!(node = %self.addr, kind = msg.type_name(), "relaying into tunnel");
            actions.push(Action::TunnelRelay {
                payload: TunnelPayload::Control(copy),
            });
        }

        match msg {
            ControlMessage::RouteRequest(req) => {
                actions.extend(self.handle_request(from, req));
            }
            ControlMessage::RouteReply(rep) => {
                actions.extend(self.handle_reply(from, rep));
            }
            ControlMessage::Hello(hello) => {
                self.handle_hello(from, hello);
            }
        }
        actions
    }

    /// A control message relayed verbatim by the paired tunnel endpoint.
    pub fn handle_tunnel_control(&mut self, msg: ControlMessage) -> Vec<Action> {
        if !self.variant.accepts_tunnel_unconditionally() || self.tunnel_peer.is_none() {
            debug!(node = %self.addr, kind = msg.type_name(), "ignoring tunnel control");
            return Vec::new();
        }
        match msg {
            ControlMessage::RouteRequest(req) => self.handle_tunnel_request(req),
            ControlMessage::RouteReply(rep) => self.handle_tunnel_reply(rep),
            ControlMessage::Hello(_) => Vec::new(),
        }
    }

    /// A discovery timer for `dest` fired.
    pub fn handle_discovery_timeout(&mut self, dest: Addr) -> Vec<Action> {
        let Some(pending) = self.pending.get_mut(&dest) else {
            // Discovery already completed; timer raced its cancellation.
            return Vec::new();
        };

        // A reply may have landed without flushing (e.g. the route was
        // installed by an unrelated reply). Flush if a route now exists.
        if self.table.lookup(dest, self.now).is_some() {
            return self.complete_discovery(dest);
        }

        if pending.retries_left > 0 {
            pending.retries_left -= 1;
            debug!(node = %self.addr, %dest, "discovery retry");
            return self.originate_request(dest);
        }

        debug!(node = %self.addr, %dest, "discovery failed, dropping queue");
        let pending = self
            .pending
            .remove(&dest)
            .unwrap_or(PendingDiscovery { queued: VecDeque::new(), retries_left: 0 });
        pending
            .queued
            .into_iter()
            .map(|packet| Action::EmitPacketDropped {
                packet,
                reason: DropReason::DiscoveryFailed,
            })
            .collect()
    }

    /// The periodic hello beacon timer fired.
    pub fn handle_hello_timer(&mut self) -> Vec<Action> {
        let Some(interval) = self.config.hello_interval else {
            return Vec::new();
        };
        vec![
            Action::BroadcastControl {
                msg: ControlMessage::Hello(Hello {
                    origin: self.addr,
                    seq: self.seq,
                }),
            },
            Action::SetTimer {
                id: TimerId::Hello,
                duration: interval,
            },
        ]
    }

    /// The periodic cleanup timer fired: purge expired routes and stale
    /// duplicate-cache entries, then re-arm.
    pub fn handle_cleanup(&mut self) -> Vec<Action> {
        self.table.purge_expired(self.now);
        let horizon = self.config.seen_request_lifetime;
        let now = self.now;
        self.seen_requests.retain(|_, seen_at| *seen_at + horizon > now);
        vec![Action::SetTimer {
            id: TimerId::RouteCleanup,
            duration: self.config.cleanup_interval,
        }]
    }

    // --- internals ---

    fn forward_or_discover(&mut self, packet: DataPacket) -> Vec<Action> {
        let dest = packet.flow.dst;
        if let Some(action) = self.transmit(packet.clone()) {
            return vec![action];
        }

        // No route. Buffer and make sure a discovery is running; a second
        // packet for the same destination joins the existing attempt.
        let mut actions = Vec::new();
        let already_discovering = self.pending.contains_key(&dest);
        let pending = self.pending.entry(dest).or_insert_with(|| PendingDiscovery {
            queued: VecDeque::new(),
            retries_left: self.config.discovery_retries,
        });
        pending.queued.push_back(packet);
        if pending.queued.len() > self.config.pending_queue_cap {
            if let Some(oldest) = pending.queued.pop_front() {
                actions.push(Action::EmitPacketDropped {
                    packet: oldest,
                    reason: DropReason::QueueOverflow,
                });
            }
        }
        if !already_discovering {
            actions.extend(self.originate_request(dest));
        }
        actions
    }

    /// Hand a packet to its next hop, if a valid route exists.
    fn transmit(&mut self, mut packet: DataPacket) -> Option<Action> {
        let dest = packet.flow.dst;
        let entry = self.table.lookup(dest, self.now)?.clone();
        self.table.refresh(dest, self.now + self.config.route_lifetime);
        packet.hops += 1;
        if entry.via_tunnel {
            Some(Action::TunnelRelay {
                payload: TunnelPayload::Data(packet),
            })
        } else {
            Some(Action::ForwardData {
                to: entry.next_hop,
                packet,
            })
        }
    }

    fn originate_request(&mut self, dest: Addr) -> Vec<Action> {
        self.seq = self.seq.next();
        let id = self.next_rreq_id;
        self.next_rreq_id += 1;
        // Remember our own request so echoes are ignored.
        self.seen_requests.insert((self.addr, id), self.now);

        let req = RouteRequest {
            id,
            origin: self.addr,
            origin_seq: self.seq,
            dest,
            dest_seq_known: self.table.last_known_seq(dest),
            hop_count: 0,
            ttl: self.config.rreq_ttl,
        };
        debug!(node = %self.addr, %dest, id, "originating route request");
        vec![
            Action::BroadcastControl {
                msg: ControlMessage::RouteRequest(req),
            },
            Action::SetTimer {
                id: TimerId::Discovery(dest),
                duration: self.config.discovery_timeout,
            },
        ]
    }

    fn handle_request(&mut self, from: Addr, req: RouteRequest) -> Vec<Action> {
        if req.ttl == 0 {
            debug!(node = %self.addr, origin = %req.origin, id = req.id, "request arrived with zero ttl");
            return Vec::new();
        }
        if req.origin == self.addr {
            debug!(node = %self.addr, id = req.id, "own request echoed back");
            return Vec::new();
        }
        if self.seen_requests.contains_key(&(req.origin, req.id)) {
            trace!(node = %self.addr, origin = %req.origin, id = req.id, "duplicate request");
            return Vec::new();
        }
        self.seen_requests.insert((req.origin, req.id), self.now);

        // Learn the reverse path toward the originator.
        self.table.offer(
            req.origin,
            RouteEntry {
                next_hop: from,
                hop_count: req.hop_count + 1,
                seq: req.origin_seq,
                expires_at: self.now + self.config.route_lifetime,
                via_tunnel: false,
            },
            self.now,
        );

        if req.dest == self.addr {
            // We are the destination. Make sure our sequence number is at
            // least as fresh as what the requester already knows, then
            // advance it for this reply.
            if let Some(known) = req.dest_seq_known {
                if known.newer_than(self.seq) {
                    self.seq = known;
                }
            }
            self.seq = self.seq.next();
            debug!(node = %self.addr, origin = %req.origin, "replying as destination");
            return vec![Action::UnicastControl {
                to: from,
                msg: ControlMessage::RouteReply(RouteReply {
                    dest: self.addr,
                    dest_seq: self.seq,
                    hop_count: 0,
                    origin: req.origin,
                }),
            }];
        }

        // Gratuitous reply from cache when our entry is fresh enough for
        // the requester.
        if let Some(entry) = self.table.lookup(req.dest, self.now).cloned() {
            let fresh_enough = match req.dest_seq_known {
                Some(known) => !known.newer_than(entry.seq),
                None => true,
            };
            if fresh_enough {
                debug!(node = %self.addr, dest = %req.dest, "replying from cache");
                return vec![Action::UnicastControl {
                    to: from,
                    msg: ControlMessage::RouteReply(RouteReply {
                        dest: req.dest,
                        dest_seq: entry.seq,
                        hop_count: entry.hop_count,
                        origin: req.origin,
                    }),
                }];
            }
        }

        if req.ttl <= 1 {
            return Vec::new();
        }
        let mut rebroadcast = req;
        rebroadcast.hop_count += 1;
        rebroadcast.ttl -= 1;
        vec![Action::BroadcastControl {
            msg: ControlMessage::RouteRequest(rebroadcast),
        }]
    }

    fn handle_reply(&mut self, from: Addr, rep: RouteReply) -> Vec<Action> {
        // Learn the forward path toward the replied-for destination.
        self.table.offer(
            rep.dest,
            RouteEntry {
                next_hop: from,
                hop_count: rep.hop_count + 1,
                seq: rep.dest_seq,
                expires_at: self.now + self.config.route_lifetime,
                via_tunnel: false,
            },
            self.now,
        );

        if rep.origin == self.addr {
            return self.complete_discovery(rep.dest);
        }

        // Relay toward the originator along the reverse path.
        let Some(entry) = self.table.lookup(rep.origin, self.now).cloned() else {
            debug!(node = %self.addr, origin = %rep.origin, "no reverse route for reply");
            return Vec::new();
        };
        if entry.via_tunnel {
            // The verbatim tunnel copy taken on receipt already carries
            // this reply to the paired endpoint.
            return Vec::new();
        }
        let mut forwarded = rep;
        forwarded.hop_count += 1;
        vec![Action::UnicastControl {
            to: entry.next_hop,
            msg: ControlMessage::RouteReply(forwarded),
        }]
    }

    fn handle_hello(&mut self, from: Addr, hello: Hello) {
        let accepted = self.table.offer(
            hello.origin,
            RouteEntry {
                next_hop: from,
                hop_count: 1,
                seq: hello.seq,
                expires_at: self.now + self.config.route_lifetime,
                via_tunnel: false,
            },
            self.now,
        );
        if !accepted {
            // Repeat beacon with an unchanged sequence number still proves
            // the neighbor is alive.
            self.table
                .refresh(hello.origin, self.now + self.config.route_lifetime);
        }
    }

    fn handle_tunnel_request(&mut self, req: RouteRequest) -> Vec<Action> {
        let Some(peer) = self.tunnel_peer else {
            return Vec::new();
        };
        if req.origin == self.addr || self.seen_requests.contains_key(&(req.origin, req.id)) {
            return Vec::new();
        }
        // Suppress the multi-hop wireless copy that will arrive later.
        self.seen_requests.insert((req.origin, req.id), self.now);

        // Trust the tunnel outright: the originator appears one hop away.
        self.table.install(
            req.origin,
            RouteEntry {
                next_hop: peer,
                hop_count: TUNNEL_HOP_COUNT,
                seq: req.origin_seq,
                expires_at: self.now + self.config.route_lifetime,
                via_tunnel: true,
            },
        );

        if req.dest == self.addr {
            self.seq = self.seq.next();
            return vec![Action::TunnelRelay {
                payload: TunnelPayload::Control(ControlMessage::RouteReply(RouteReply {
                    dest: self.addr,
                    dest_seq: self.seq,
                    hop_count: 0,
                    origin: req.origin,
                })),
            }];
        }

        // Re-emit on the wireless side with the hop count pinned, so
        // downstream nodes see the originator as a close neighbor of ours.
        let mut rebroadcast = req;
        rebroadcast.hop_count = TUNNEL_HOP_COUNT;
        debug!(node = %self.addr, origin = %rebroadcast.origin, "replaying tunneled request");
        vec![Action::BroadcastControl {
            msg: ControlMessage::RouteRequest(rebroadcast),
        }]
    }

    fn handle_tunnel_reply(&mut self, rep: RouteReply) -> Vec<Action> {
        let Some(peer) = self.tunnel_peer else {
            return Vec::new();
        };
        self.table.install(
            rep.dest,
            RouteEntry {
                next_hop: peer,
                hop_count: TUNNEL_HOP_COUNT,
                seq: rep.dest_seq,
                expires_at: self.now + self.config.route_lifetime,
                via_tunnel: true,
            },
        );

        if rep.origin == self.addr {
            return self.complete_discovery(rep.dest);
        }

        let Some(entry) = self.table.lookup(rep.origin, self.now).cloned() else {
            debug!(node = %self.addr, origin = %rep.origin, "no wireless route for tunneled reply");
            return Vec::new();
        };
        if entry.via_tunnel {
            // Would bounce straight back into the tunnel.
            return Vec::new();
        }
        let mut forwarded = rep;
        forwarded.hop_count = TUNNEL_HOP_COUNT;
        debug!(node = %self.addr, origin = %forwarded.origin, "replaying tunneled reply");
        vec![Action::UnicastControl {
            to: entry.next_hop,
            msg: ControlMessage::RouteReply(forwarded),
        }]
    }

    /// A usable route to `dest` appeared: cancel the discovery timer and
    /// flush everything queued behind it.
    fn complete_discovery(&mut self, dest: Addr) -> Vec<Action> {
        let Some(pending) = self.pending.remove(&dest) else {
            return Vec::new();
        };
        let mut actions = vec![Action::CancelTimer {
            id: TimerId::Discovery(dest),
        }];
        debug!(node = %self.addr, %dest, queued = pending.queued.len(), "discovery complete");
        for packet in pending.queued {
            if let Some(action) = self.transmit(packet.clone()) {
                actions.push(action);
            } else {
                actions.push(Action::EmitPacketDropped {
                    packet,
                    reason: DropReason::DiscoveryFailed,
                });
            }
        }
        actions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variant::{Compromised, Honest};
    use manetsim_types::FlowKey;

    const A: Addr = Addr::new(10, 0, 1, 1);
    const B: Addr = Addr::new(10, 0, 1, 2);
    const C: Addr = Addr::new(10, 0, 1, 3);
    const D: Addr = Addr::new(10, 0, 1, 4);
    const MAL_PEER: Addr = Addr::new(10, 1, 2, 2);

    fn honest(addr: Addr) -> RoutingEngine {
        RoutingEngine::new(addr, RoutingConfig::default(), Box::new(Honest), None)
    }

    fn compromised(addr: Addr, peer: Addr) -> RoutingEngine {
        RoutingEngine::new(
            addr,
            RoutingConfig::default(),
            Box::new(Compromised),
            Some(peer),
        )
    }

    fn packet(src: Addr, dst: Addr, seq: u32) -> DataPacket {
        DataPacket::new(FlowKey { src, dst, port: 6 }, seq, 1040)
    }

    fn find_rreq(actions: &[Action]) -> Option<&RouteRequest> {
        actions.iter().find_map(|a| match a {
            Action::BroadcastControl {
                msg: ControlMessage::RouteRequest(req),
            } => Some(req),
            _ => None,
        })
    }

    #[test]
    fn no_route_starts_discovery_and_buffers() {
        let mut engine = honest(A);
        let actions = engine.send_data(packet(A, D, 0));
        let req = find_rreq(&actions).expect("request broadcast");
        assert_eq!(req.origin, A);
        assert_eq!(req.dest, D);
        assert_eq!(req.hop_count, 0);
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::SetTimer { id: TimerId::Discovery(d), .. } if *d == D)));
    }

    #[test]
    fn second_send_joins_existing_discovery() {
        let mut engine = honest(A);
        engine.send_data(packet(A, D, 0));
        let actions = engine.send_data(packet(A, D, 1));
        assert!(find_rreq(&actions).is_none(), "no fresh broadcast");
        assert!(actions.is_empty());
    }

    #[test]
    fn destination_replies_with_bumped_seq() {
        let mut engine = honest(D);
        let actions = engine.handle_control(
            C,
            ControlMessage::RouteRequest(RouteRequest {
                id: 0,
                origin: A,
                origin_seq: SeqNum(1),
                dest: D,
                dest_seq_known: Some(SeqNum(5)),
                hop_count: 2,
                ttl: 14,
            }),
        );
        match &actions[..] {
            [Action::UnicastControl {
                to,
                msg: ControlMessage::RouteReply(rep),
            }] => {
                assert_eq!(*to, C);
                assert_eq!(rep.dest, D);
                assert_eq!(rep.hop_count, 0);
                assert!(rep.dest_seq.newer_than(SeqNum(5)), "seq advanced past known");
            }
            other => panic!("unexpected actions: {other:?}"),
        }
        // Reverse route toward the originator was installed.
        let reverse = engine.table().get(A).unwrap();
        assert_eq!(reverse.next_hop, C);
        assert_eq!(reverse.hop_count, 3);
    }

    #[test]
    fn intermediate_rebroadcasts_and_suppresses_duplicates() {
        let mut engine = honest(B);
        let req = RouteRequest {
            id: 7,
            origin: A,
            origin_seq: SeqNum(1),
            dest: D,
            dest_seq_known: None,
            hop_count: 0,
            ttl: 16,
        };
        let actions = engine.handle_control(A, ControlMessage::RouteRequest(req.clone()));
        let out = find_rreq(&actions).expect("rebroadcast");
        assert_eq!(out.hop_count, 1);
        assert_eq!(out.ttl, 15);

        let again = engine.handle_control(C, ControlMessage::RouteRequest(req));
        assert!(again.is_empty(), "duplicate dropped");
    }

    #[test]
    fn exhausted_ttl_stops_the_flood() {
        let mut engine = honest(B);
        let actions = engine.handle_control(
            A,
            ControlMessage::RouteRequest(RouteRequest {
                id: 0,
                origin: A,
                origin_seq: SeqNum(1),
                dest: D,
                dest_seq_known: None,
                hop_count: 15,
                ttl: 1,
            }),
        );
        assert!(find_rreq(&actions).is_none());
    }

    #[test]
    fn zero_ttl_request_is_rejected_before_any_learning() {
        let mut engine = honest(D);
        let actions = engine.handle_control(
            C,
            ControlMessage::RouteRequest(RouteRequest {
                id: 3,
                origin: A,
                origin_seq: SeqNum(1),
                dest: D,
                dest_seq_known: None,
                hop_count: 4,
                ttl: 0,
            }),
        );
        assert!(actions.is_empty(), "no reply from a spent request");
        assert!(engine.table().get(A).is_none(), "no reverse route learned");
    }

    #[test]
    fn reply_completes_discovery_and_flushes_queue() {
        let mut engine = honest(A);
        engine.send_data(packet(A, D, 0));
        engine.send_data(packet(A, D, 1));

        let actions = engine.handle_control(
            B,
            ControlMessage::RouteReply(RouteReply {
                dest: D,
                dest_seq: SeqNum(1),
                hop_count: 2,
                origin: A,
            }),
        );
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::CancelTimer { id: TimerId::Discovery(d) } if *d == D)));
        let forwarded: Vec<_> = actions
            .iter()
            .filter_map(|a| match a {
                Action::ForwardData { to, packet } => Some((*to, packet.seq, packet.hops)),
                _ => None,
            })
            .collect();
        assert_eq!(forwarded, vec![(B, 0, 1), (B, 1, 1)]);
    }

    #[test]
    fn intermediate_forwards_reply_along_reverse_path() {
        let mut engine = honest(B);
        // Learn the reverse route toward the originator first.
        engine.handle_control(
            A,
            ControlMessage::RouteRequest(RouteRequest {
                id: 0,
                origin: A,
                origin_seq: SeqNum(1),
                dest: D,
                dest_seq_known: None,
                hop_count: 0,
                ttl: 16,
            }),
        );
        let actions = engine.handle_control(
            C,
            ControlMessage::RouteReply(RouteReply {
                dest: D,
                dest_seq: SeqNum(1),
                hop_count: 0,
                origin: A,
            }),
        );
        match &actions[..] {
            [Action::UnicastControl {
                to,
                msg: ControlMessage::RouteReply(rep),
            }] => {
                assert_eq!(*to, A);
                assert_eq!(rep.hop_count, 1);
            }
            other => panic!("unexpected actions: {other:?}"),
        }
        // And the forward route was learned from the reply.
        assert_eq!(engine.table().get(D).unwrap().next_hop, C);
    }

    #[test]
    fn cached_route_yields_gratuitous_reply() {
        let mut engine = honest(B);
        engine.handle_control(
            C,
            ControlMessage::RouteReply(RouteReply {
                dest: D,
                dest_seq: SeqNum(4),
                hop_count: 1,
                origin: B,
            }),
        );
        let actions = engine.handle_control(
            A,
            ControlMessage::RouteRequest(RouteRequest {
                id: 0,
                origin: A,
                origin_seq: SeqNum(1),
                dest: D,
                dest_seq_known: Some(SeqNum(4)),
                hop_count: 0,
                ttl: 16,
            }),
        );
        match &actions[..] {
            [Action::UnicastControl {
                to,
                msg: ControlMessage::RouteReply(rep),
            }] => {
                assert_eq!(*to, A);
                assert_eq!(rep.dest, D);
                assert_eq!(rep.dest_seq, SeqNum(4));
                assert_eq!(rep.hop_count, 2);
            }
            other => panic!("unexpected actions: {other:?}"),
        }
    }

    #[test]
    fn stale_cache_rebroadcasts_instead_of_replying() {
        let mut engine = honest(B);
        engine.handle_control(
            C,
            ControlMessage::RouteReply(RouteReply {
                dest: D,
                dest_seq: SeqNum(2),
                hop_count: 1,
                origin: B,
            }),
        );
        let actions = engine.handle_control(
            A,
            ControlMessage::RouteRequest(RouteRequest {
                id: 0,
                origin: A,
                origin_seq: SeqNum(1),
                dest: D,
                dest_seq_known: Some(SeqNum(3)),
                hop_count: 0,
                ttl: 16,
            }),
        );
        assert!(find_rreq(&actions).is_some(), "stale cache must not answer");
    }

    #[test]
    fn timeout_retries_then_drops_queue() {
        let mut engine = honest(A);
        engine.send_data(packet(A, D, 0));

        // Two retries configured by default.
        for _ in 0..2 {
            let actions = engine.handle_discovery_timeout(D);
            assert!(find_rreq(&actions).is_some(), "retry broadcast");
        }
        let actions = engine.handle_discovery_timeout(D);
        match &actions[..] {
            [Action::EmitPacketDropped { reason, .. }] => {
                assert_eq!(*reason, DropReason::DiscoveryFailed);
            }
            other => panic!("unexpected actions: {other:?}"),
        }
        // Stale timer after completion is a no-op.
        assert!(engine.handle_discovery_timeout(D).is_empty());
    }

    #[test]
    fn queue_overflow_drops_oldest() {
        let mut config = RoutingConfig::default();
        config.pending_queue_cap = 2;
        let mut engine = RoutingEngine::new(A, config, Box::new(Honest), None);
        engine.send_data(packet(A, D, 0));
        engine.send_data(packet(A, D, 1));
        let actions = engine.send_data(packet(A, D, 2));
        match &actions[..] {
            [Action::EmitPacketDropped { packet, reason }] => {
                assert_eq!(packet.seq, 0, "oldest evicted");
                assert_eq!(*reason, DropReason::QueueOverflow);
            }
            other => panic!("unexpected actions: {other:?}"),
        }
    }

    #[test]
    fn transit_ttl_expiry_drops() {
        let mut engine = honest(B);
        let mut pkt = packet(A, D, 0);
        pkt.ttl = 1;
        let actions = engine.on_data(A, pkt);
        match &actions[..] {
            [Action::EmitPacketDropped { reason, .. }] => {
                assert_eq!(*reason, DropReason::TtlExpired);
            }
            other => panic!("unexpected actions: {other:?}"),
        }
    }

    #[test]
    fn routes_expire_without_traffic() {
        let mut engine = honest(A);
        engine.handle_control(
            B,
            ControlMessage::RouteReply(RouteReply {
                dest: D,
                dest_seq: SeqNum(1),
                hop_count: 1,
                origin: A,
            }),
        );
        engine.set_time(Duration::from_secs(10));
        let actions = engine.send_data(packet(A, D, 0));
        assert!(find_rreq(&actions).is_some(), "expired route forces rediscovery");
    }

    #[test]
    fn hello_installs_and_refreshes_neighbor() {
        let mut engine = honest(A);
        let beacon = ControlMessage::Hello(Hello {
            origin: B,
            seq: SeqNum(1),
        });
        engine.handle_control(B, beacon.clone());
        let first_expiry = engine.table().get(B).unwrap().expires_at;

        engine.set_time(Duration::from_secs(2));
        engine.handle_control(B, beacon);
        assert!(engine.table().get(B).unwrap().expires_at > first_expiry);
    }

    #[test]
    fn compromised_siphons_requests_into_tunnel() {
        let mut engine = compromised(Addr::new(10, 1, 2, 1), MAL_PEER);
        let actions = engine.handle_control(
            A,
            ControlMessage::RouteRequest(RouteRequest {
                id: 0,
                origin: A,
                origin_seq: SeqNum(1),
                dest: D,
                dest_seq_known: None,
                hop_count: 0,
                ttl: 16,
            }),
        );
        assert!(actions.iter().any(|a| matches!(
            a,
            Action::TunnelRelay {
                payload: TunnelPayload::Control(ControlMessage::RouteRequest(_))
            }
        )));
        // Normal flood processing still happens alongside.
        assert!(find_rreq(&actions).is_some());
    }

    #[test]
    fn tunneled_request_replays_with_pinned_hop_count() {
        let mut engine = compromised(Addr::new(10, 1, 2, 2), Addr::new(10, 1, 2, 1));
        let actions = engine.handle_tunnel_control(ControlMessage::RouteRequest(RouteRequest {
            id: 0,
            origin: A,
            origin_seq: SeqNum(1),
            dest: D,
            dest_seq_known: None,
            hop_count: 0,
            ttl: 16,
        }));
        let out = find_rreq(&actions).expect("wireless replay");
        assert_eq!(out.hop_count, TUNNEL_HOP_COUNT);
        assert_eq!(out.ttl, 16, "ttl not consumed by the tunnel");

        // Route back to the originator goes through the tunnel.
        let entry = engine.table().get(A).unwrap();
        assert!(entry.via_tunnel);
        assert_eq!(entry.hop_count, TUNNEL_HOP_COUNT);

        // The later wireless copy of the same request is suppressed.
        let again = engine.handle_control(
            C,
            ControlMessage::RouteRequest(RouteRequest {
                id: 0,
                origin: A,
                origin_seq: SeqNum(1),
                dest: D,
                dest_seq_known: None,
                hop_count: 3,
                ttl: 13,
            }),
        );
        assert!(!again.iter().any(|a| matches!(a, Action::BroadcastControl { .. })));
    }

    #[test]
    fn tunneled_reply_installs_despite_stale_seq() {
        let mal1 = Addr::new(10, 1, 2, 1);
        let mut engine = compromised(mal1, MAL_PEER);
        // Fresh, short wireless route already installed.
        engine.handle_control(
            B,
            ControlMessage::RouteReply(RouteReply {
                dest: D,
                dest_seq: SeqNum(9),
                hop_count: 0,
                origin: mal1,
            }),
        );
        // Tunneled reply is stale by sequence number but wins anyway.
        engine.handle_tunnel_control(ControlMessage::RouteReply(RouteReply {
            dest: D,
            dest_seq: SeqNum(2),
            hop_count: 0,
            origin: Addr::new(10, 0, 1, 99),
        }));
        let entry = engine.table().get(D).unwrap();
        assert!(entry.via_tunnel);
        assert_eq!(entry.seq, SeqNum(2));
    }

    #[test]
    fn tunneled_reply_forwarded_wireless_toward_origin() {
        let mal1 = Addr::new(10, 1, 2, 1);
        let mut engine = compromised(mal1, MAL_PEER);
        // Wireless reverse route to the originator exists from its request.
        engine.handle_control(
            A,
            ControlMessage::RouteRequest(RouteRequest {
                id: 0,
                origin: A,
                origin_seq: SeqNum(1),
                dest: D,
                dest_seq_known: None,
                hop_count: 0,
                ttl: 16,
            }),
        );
        let actions = engine.handle_tunnel_control(ControlMessage::RouteReply(RouteReply {
            dest: D,
            dest_seq: SeqNum(1),
            hop_count: 0,
            origin: A,
        }));
        match &actions[..] {
            [Action::UnicastControl {
                to,
                msg: ControlMessage::RouteReply(rep),
            }] => {
                assert_eq!(*to, A);
                assert_eq!(rep.hop_count, TUNNEL_HOP_COUNT);
            }
            other => panic!("unexpected actions: {other:?}"),
        }
    }

    #[test]
    fn data_rides_the_tunnel_when_route_says_so() {
        let mal1 = Addr::new(10, 1, 2, 1);
        let mut engine = compromised(mal1, MAL_PEER);
        engine.handle_tunnel_control(ControlMessage::RouteReply(RouteReply {
            dest: D,
            dest_seq: SeqNum(1),
            hop_count: 0,
            origin: Addr::new(10, 0, 1, 99),
        }));
        let actions = engine.on_data(A, packet(A, D, 0));
        match &actions[..] {
            [Action::TunnelRelay {
                payload: TunnelPayload::Data(pkt),
            }] => {
                assert_eq!(pkt.hops, 1);
                assert_eq!(pkt.ttl, manetsim_types::DATA_TTL - 1);
            }
            other => panic!("unexpected actions: {other:?}"),
        }
    }

    #[test]
    fn honest_node_ignores_tunnel_control() {
        let mut engine = honest(A);
        let actions = engine.handle_tunnel_control(ControlMessage::RouteRequest(RouteRequest {
            id: 0,
            origin: B,
            origin_seq: SeqNum(1),
            dest: D,
            dest_seq_known: None,
            hop_count: 0,
            ttl: 16,
        }));
        assert!(actions.is_empty());
    }

    #[test]
    fn startup_arms_timers_per_variant() {
        let honest_actions = honest(A).startup();
        assert!(honest_actions
            .iter()
            .any(|a| matches!(a, Action::SetTimer { id: TimerId::Hello, .. })));

        let mal_actions = compromised(Addr::new(10, 1, 2, 1), MAL_PEER).startup();
        assert!(!mal_actions
            .iter()
            .any(|a| matches!(a, Action::SetTimer { id: TimerId::Hello, .. })));
        assert!(mal_actions
            .iter()
            .any(|a| matches!(a, Action::SetTimer { id: TimerId::RouteCleanup, .. })));
    }
}
