//! Receiving side of a flow.

use manetsim_types::DataPacket;
use std::time::Duration;

/// Counts packets and bytes delivered to this node's application layer.
#[derive(Debug, Default, Clone)]
pub struct PacketSink {
    packets: u64,
    bytes: u64,
    first_rx: Option<Duration>,
    last_rx: Option<Duration>,
}

impl PacketSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, packet: &DataPacket, now: Duration) {
        self.packets += 1;
        self.bytes += packet.size as u64;
        if self.first_rx.is_none() {
            self.first_rx = Some(now);
        }
        self.last_rx = Some(now);
    }

    pub fn packets(&self) -> u64 {
        self.packets
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn first_rx(&self) -> Option<Duration> {
        self.first_rx
    }

    pub fn last_rx(&self) -> Option<Duration> {
        self.last_rx
    }
}
