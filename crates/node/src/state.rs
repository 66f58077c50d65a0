//! Node state machine wiring events to the routing engine and traffic layer.

use std::time::Duration;

use tracing::trace;

use manetsim_core::{Action, ProtocolEvent, StateMachine, TimerId};
use manetsim_routing::{RouteTable, RoutingEngine};
use manetsim_traffic::{ConstantRateSource, PacketSink};
use manetsim_types::{Addr, NodeId, NodeRole};

/// One simulated node.
///
/// Dispatches events between the routing engine and the application layer.
/// Data addressed to this node goes to the sink; everything else is the
/// engine's problem.
pub struct NodeStateMachine {
    id: NodeId,
    role: NodeRole,
    engine: RoutingEngine,
    source: Option<ConstantRateSource>,
    sink: PacketSink,
    now: Duration,
}

impl NodeStateMachine {
    pub fn new(
        id: NodeId,
        role: NodeRole,
        engine: RoutingEngine,
        source: Option<ConstantRateSource>,
    ) -> Self {
        Self {
            id,
            role,
            engine,
            source,
            sink: PacketSink::new(),
            now: Duration::ZERO,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    pub fn addr(&self) -> Addr {
        self.engine.addr()
    }

    pub fn routes(&self) -> &RouteTable {
        self.engine.table()
    }

    pub fn sink(&self) -> &PacketSink {
        &self.sink
    }

    /// One-time actions at simulation start: the engine's periodic timers,
    /// plus the first traffic tick if this node carries a source.
    pub fn startup(&self) -> Vec<Action> {
        let mut actions = self.engine.startup();
        if let Some(source) = &self.source {
            actions.push(Action::SetTimer {
                id: TimerId::SendTick,
                duration: source.start(),
            });
        }
        actions
    }

    fn on_send_tick(&mut self) -> Vec<Action> {
        let Some(source) = &mut self.source else {
            return Vec::new();
        };
        let mut actions = Vec::new();
        if let Some(packet) = source.emit(self.now) {
            trace!(node = %self.id, seq = packet.seq, "source tick");
            actions.push(Action::EmitPacketSent {
                packet: packet.clone(),
            });
            actions.extend(self.engine.send_data(packet));
        }
        if let Some(source) = &self.source {
            if let Some(gap) = source.rearm(self.now) {
                actions.push(Action::SetTimer {
                    id: TimerId::SendTick,
                    duration: gap,
                });
            }
        }
        actions
    }

    fn on_data(&mut self, from: Option<Addr>, packet: manetsim_types::DataPacket) -> Vec<Action> {
        if packet.flow.dst == self.addr() {
            self.sink.accept(&packet, self.now);
            return vec![Action::EmitPacketDelivered { packet }];
        }
        match from {
            Some(from) => self.engine.on_data(from, packet),
            None => self.engine.on_tunnel_data(packet),
        }
    }
}

impl StateMachine for NodeStateMachine {
    fn handle(&mut self, event: ProtocolEvent) -> Vec<Action> {
        match event {
            ProtocolEvent::ControlReceived { from, msg } => self.engine.handle_control(from, msg),
            ProtocolEvent::TunnelControlReceived { msg } => self.engine.handle_tunnel_control(msg),
            ProtocolEvent::DataReceived { from, packet } => self.on_data(Some(from), packet),
            ProtocolEvent::TunnelDataReceived { packet } => self.on_data(None, packet),
            ProtocolEvent::SendTick => self.on_send_tick(),
            ProtocolEvent::HelloTimer => self.engine.handle_hello_timer(),
            ProtocolEvent::DiscoveryTimeout { dest } => self.engine.handle_discovery_timeout(dest),
            ProtocolEvent::RouteCleanupTimer => self.engine.handle_cleanup(),
        }
    }

    fn set_time(&mut self, now: Duration) {
        self.now = now;
        self.engine.set_time(now);
    }

    fn now(&self) -> Duration {
        self.now
    }
}
