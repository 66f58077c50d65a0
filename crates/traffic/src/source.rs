//! Constant-rate packet source.

use manetsim_types::{DataPacket, FlowKey};
use std::time::Duration;

/// Shape of one constant-rate flow.
#[derive(Debug, Clone)]
pub struct TrafficConfig {
    /// Application data rate in bits per second.
    pub rate_bps: u64,
    /// Payload size of each packet in bytes.
    pub packet_size: usize,
    /// Total packets to emit.
    pub packet_count: u32,
    /// Virtual time of the first emission.
    pub start: Duration,
    /// No emissions at or after this time, regardless of count.
    pub stop: Duration,
}

impl TrafficConfig {
    /// Inter-packet gap that realizes `rate_bps` at `packet_size`.
    ///
    /// A zero rate is clamped to 1 bps to keep the gap finite; the stop
    /// time then ends the flow before anything is emitted.
    pub fn interval(&self) -> Duration {
        let rate = self.rate_bps.max(1);
        Duration::from_secs_f64(self.packet_size as f64 * 8.0 / rate as f64)
    }
}

/// Emits fixed-size packets at a fixed rate over a bounded window.
///
/// Purely reactive: the node's tick timer drives it, it never schedules
/// anything itself.
#[derive(Debug, Clone)]
pub struct ConstantRateSource {
    flow: FlowKey,
    config: TrafficConfig,
    sent: u32,
}

impl ConstantRateSource {
    pub fn new(flow: FlowKey, config: TrafficConfig) -> Self {
        Self {
            flow,
            config,
            sent: 0,
        }
    }

    pub fn flow(&self) -> FlowKey {
        self.flow
    }

    /// When the first tick should fire.
    pub fn start(&self) -> Duration {
        self.config.start
    }

    /// Packets emitted so far.
    pub fn sent(&self) -> u32 {
        self.sent
    }

    /// The next packet, if the window and count allow one at `now`.
    pub fn emit(&mut self, now: Duration) -> Option<DataPacket> {
        if self.sent >= self.config.packet_count || now >= self.config.stop {
            return None;
        }
        let packet = DataPacket::new(self.flow, self.sent, self.config.packet_size);
        self.sent += 1;
        Some(packet)
    }

    /// Gap until the next tick, or `None` when the flow is done.
    pub fn rearm(&self, now: Duration) -> Option<Duration> {
        if self.sent >= self.config.packet_count {
            return None;
        }
        let interval = self.config.interval();
        if now + interval >= self.config.stop {
            return None;
        }
        Some(interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manetsim_types::Addr;

    fn source(count: u32) -> ConstantRateSource {
        ConstantRateSource::new(
            FlowKey {
                src: Addr::new(10, 0, 1, 1),
                dst: Addr::new(10, 0, 1, 4),
                port: 6,
            },
            TrafficConfig {
                rate_bps: 250_000,
                packet_size: 1040,
                packet_count: count,
                start: Duration::from_secs(40),
                stop: Duration::from_secs(100),
            },
        )
    }

    #[test]
    fn interval_matches_rate() {
        // 1040 bytes at 250 Kbps is 33.28 ms per packet.
        let got = source(100).config.interval();
        assert!((got.as_secs_f64() - 0.033_28).abs() < 1e-9);
    }

    #[test]
    fn emits_exactly_count_packets() {
        let mut src = source(3);
        let mut now = src.start();
        let mut packets = Vec::new();
        while let Some(pkt) = src.emit(now) {
            packets.push(pkt);
            match src.rearm(now) {
                Some(gap) => now += gap,
                None => break,
            }
        }
        assert_eq!(packets.len(), 3);
        assert_eq!(packets[2].seq, 2);
        assert!(src.emit(now).is_none());
    }

    #[test]
    fn zero_rate_yields_a_finite_gap() {
        let mut src = source(100);
        src.config.rate_bps = 0;
        assert_eq!(src.config.interval(), Duration::from_secs(8320));
        assert!(src.rearm(src.start()).is_none());
    }

    #[test]
    fn stop_time_cuts_the_flow_short() {
        let mut src = source(100);
        assert!(src.emit(Duration::from_secs(100)).is_none());
        assert!(src.emit(Duration::from_secs(99)).is_some());
        assert!(src.rearm(Duration::from_secs(100)).is_none());
    }
}
