//! Canonical ten-node wormhole scenario.
//!
//! One constant-rate flow crosses a static field of honest nodes while two
//! colluding nodes at opposite corners of the field share an out-of-band
//! tunnel. With the wormhole enabled, the source's route to the sink
//! collapses onto the tunnel; disabled, the same layout routes over the
//! honest multi-hop path.

use crate::medium::{MediumConfig, WirelessMedium};
use crate::runner::SimulationRunner;
use manetsim_node::NodeStateMachine;
use manetsim_routing::{Compromised, Honest, ProtocolVariant, RoutingConfig, RoutingEngine};
use manetsim_traffic::{ConstantRateSource, TrafficConfig};
use manetsim_types::{
    Addr, FlowKey, NodeId, NodeRole, NodeSpec, Port, Position, StaticTopology, TopologyError,
    TunnelSpec,
};
use std::time::Duration;

const SOURCE: NodeId = NodeId(0);
const MAL_A: NodeId = NodeId(1);
const MAL_B: NodeId = NodeId(2);
const SINK: NodeId = NodeId(3);

/// Builder for the standard wormhole experiment.
#[derive(Debug, Clone)]
pub struct WormholeScenario {
    seed: u64,
    wormhole: bool,
    radio_range: f64,
    tunnel_delay: Duration,
    medium: MediumConfig,
    routing: RoutingConfig,
    traffic: TrafficConfig,
    port: Port,
}

impl Default for WormholeScenario {
    fn default() -> Self {
        Self {
            seed: 0,
            wormhole: true,
            radio_range: 300.0,
            tunnel_delay: Duration::from_millis(1),
            medium: MediumConfig::default(),
            routing: RoutingConfig::default(),
            traffic: TrafficConfig {
                rate_bps: 250_000,
                packet_size: 1040,
                packet_count: 100,
                start: Duration::from_secs(40),
                stop: Duration::from_secs(100),
            },
            port: 6,
        }
    }
}

impl WormholeScenario {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enable or disable the attack. Disabled, the two corner nodes run the
    /// honest protocol and the tunnel is absent.
    pub fn with_wormhole(mut self, wormhole: bool) -> Self {
        self.wormhole = wormhole;
        self
    }

    pub fn with_radio_range(mut self, range: f64) -> Self {
        self.radio_range = range;
        self
    }

    pub fn with_tunnel_delay(mut self, delay: Duration) -> Self {
        self.tunnel_delay = delay;
        self
    }

    pub fn with_medium(mut self, medium: MediumConfig) -> Self {
        self.medium = medium;
        self
    }

    pub fn with_routing(mut self, routing: RoutingConfig) -> Self {
        self.routing = routing;
        self
    }

    pub fn with_traffic(mut self, traffic: TrafficConfig) -> Self {
        self.traffic = traffic;
        self
    }

    pub fn source(&self) -> NodeId {
        SOURCE
    }

    pub fn sink(&self) -> NodeId {
        SINK
    }

    pub fn malicious(&self) -> (NodeId, NodeId) {
        (MAL_A, MAL_B)
    }

    /// Assemble topology, nodes, and runner.
    pub fn build(&self) -> Result<SimulationRunner, TopologyError> {
        let specs = self.node_specs();
        let tunnel = self.wormhole.then_some(TunnelSpec {
            a: MAL_A,
            b: MAL_B,
            delay: self.tunnel_delay,
        });
        let topology = StaticTopology::new(specs, self.radio_range, tunnel)?;

        let flow = FlowKey {
            src: addr_for(SOURCE, self.wormhole),
            dst: addr_for(SINK, self.wormhole),
            port: self.port,
        };

        let nodes: Vec<NodeStateMachine> = topology
            .nodes()
            .iter()
            .map(|spec| {
                let variant: Box<dyn ProtocolVariant> = if spec.role.is_malicious() {
                    Box::new(Compromised)
                } else {
                    Box::new(Honest)
                };
                let tunnel_peer = topology
                    .tunnel_peer(spec.id)
                    .and_then(|peer| topology.addr_of(peer));
                let engine =
                    RoutingEngine::new(spec.addr, self.routing.clone(), variant, tunnel_peer);
                let source = (spec.id == SOURCE)
                    .then(|| ConstantRateSource::new(flow, self.traffic.clone()));
                NodeStateMachine::new(spec.id, spec.role, engine, source)
            })
            .collect();

        Ok(SimulationRunner::new(
            topology,
            nodes,
            WirelessMedium::new(self.medium.clone()),
            self.seed,
        ))
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        let place = |id: NodeId, x: f64, y: f64| {
            let role = match id {
                SOURCE => NodeRole::Source,
                SINK => NodeRole::Sink,
                MAL_A | MAL_B if self.wormhole => NodeRole::Malicious,
                _ => NodeRole::Normal,
            };
            NodeSpec {
                id,
                role,
                position: Position { x, y },
                addr: addr_for(id, self.wormhole),
            }
        };

        vec![
            place(SOURCE, 0.0, 200.0),
            place(MAL_A, 0.0, 80.0),
            place(MAL_B, 544.0, 266.0),
            place(SINK, 520.0, 526.0),
            place(NodeId(4), 533.0, 345.0),
            place(NodeId(5), 0.9, 258.0),
            place(NodeId(6), 218.0, 438.0),
            place(NodeId(7), 175.0, 700.0),
            place(NodeId(8), 345.0, 700.0),
            place(NodeId(9), 700.0, 700.0),
        ]
    }
}

/// Honest nodes live in 10.0.1.0/24, wormhole endpoints in 10.1.2.0/24.
fn addr_for(id: NodeId, wormhole: bool) -> Addr {
    match id {
        MAL_A if wormhole => Addr::new(10, 1, 2, 1),
        MAL_B if wormhole => Addr::new(10, 1, 2, 2),
        NodeId(n) => Addr::new(10, 0, 1, n as u8 + 1),
    }
}
