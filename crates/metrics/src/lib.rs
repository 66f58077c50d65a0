//! Per-flow traffic accounting.
//!
//! The runner taps [`FlowMonitor`] when it executes the observer actions
//! (`EmitPacketSent`, `EmitPacketDelivered`, `EmitPacketDropped`); node state
//! machines never see it. Transmission is recorded once per originated
//! packet at send-attempt time, so packets buffered behind a route discovery
//! still count as sent.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;

use manetsim_core::DropReason;
use manetsim_types::FlowKey;

/// Running counters for one flow.
#[derive(Debug, Default, Clone)]
struct FlowCounters {
    tx_packets: u64,
    tx_bytes: u64,
    rx_packets: u64,
    rx_bytes: u64,
    dropped_packets: u64,
    hops_total: u64,
    first_tx: Option<Duration>,
    last_rx: Option<Duration>,
}

/// Collects per-flow counters during a run.
#[derive(Debug, Default)]
pub struct FlowMonitor {
    flows: HashMap<FlowKey, FlowCounters>,
}

impl FlowMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tx(&mut self, flow: FlowKey, bytes: u64, now: Duration) {
        let counters = self.flows.entry(flow).or_default();
        counters.tx_packets += 1;
        counters.tx_bytes += bytes;
        if counters.first_tx.is_none() {
            counters.first_tx = Some(now);
        }
    }

    pub fn record_rx(&mut self, flow: FlowKey, bytes: u64, hops: u32, now: Duration) {
        let counters = self.flows.entry(flow).or_default();
        counters.rx_packets += 1;
        counters.rx_bytes += bytes;
        counters.hops_total += u64::from(hops);
        counters.last_rx = Some(now);
    }

    pub fn record_drop(&mut self, flow: FlowKey, _reason: DropReason) {
        self.flows.entry(flow).or_default().dropped_packets += 1;
    }

    /// Freeze the counters into a report.
    pub fn report(&self) -> FlowReport {
        let mut flows: Vec<FlowStats> = self
            .flows
            .iter()
            .map(|(key, c)| FlowStats {
                flow: *key,
                tx_packets: c.tx_packets,
                tx_bytes: c.tx_bytes,
                rx_packets: c.rx_packets,
                rx_bytes: c.rx_bytes,
                dropped_packets: c.dropped_packets,
                delivery_ratio: if c.tx_packets == 0 {
                    0.0
                } else {
                    c.rx_packets as f64 / c.tx_packets as f64
                },
                mean_hop_count: if c.rx_packets == 0 {
                    0.0
                } else {
                    c.hops_total as f64 / c.rx_packets as f64
                },
                throughput_bps: throughput_bps(c),
            })
            .collect();
        flows.sort_by_key(|s| s.flow.src);
        FlowReport { flows }
    }
}

/// Throughput over the active window, guarding a zero or inverted window.
fn throughput_bps(c: &FlowCounters) -> f64 {
    let (Some(first_tx), Some(last_rx)) = (c.first_tx, c.last_rx) else {
        return 0.0;
    };
    let window = last_rx.as_secs_f64() - first_tx.as_secs_f64();
    if window <= 0.0 {
        return 0.0;
    }
    c.rx_bytes as f64 * 8.0 / window
}

/// Final per-flow statistics.
#[derive(Debug, Clone, Serialize)]
pub struct FlowStats {
    pub flow: FlowKey,
    pub tx_packets: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub dropped_packets: u64,
    pub delivery_ratio: f64,
    pub mean_hop_count: f64,
    pub throughput_bps: f64,
}

impl FlowStats {
    /// Packets sent but never delivered. In-flight packets inflate this at
    /// snapshot time, and a packet delivered twice could deflate it, so the
    /// difference saturates rather than underflows.
    pub fn lost_packets(&self) -> u64 {
        self.tx_packets.saturating_sub(self.rx_packets)
    }
}

/// All flows observed during a run.
#[derive(Debug, Clone, Serialize)]
pub struct FlowReport {
    pub flows: Vec<FlowStats>,
}

impl FlowReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manetsim_types::Addr;

    fn flow() -> FlowKey {
        FlowKey {
            src: Addr::new(10, 0, 1, 1),
            dst: Addr::new(10, 0, 1, 4),
            port: 6,
        }
    }

    #[test]
    fn throughput_over_active_window() {
        let mut monitor = FlowMonitor::new();
        monitor.record_tx(flow(), 1000, Duration::from_secs(40));
        monitor.record_rx(flow(), 1000, 3, Duration::from_secs(42));
        let report = monitor.report();
        let stats = &report.flows[0];
        // 8000 bits over 2 seconds.
        assert!((stats.throughput_bps - 4000.0).abs() < 1e-9);
        assert!((stats.mean_hop_count - 3.0).abs() < 1e-9);
        assert!((stats.delivery_ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_received_flow_reports_zero_throughput() {
        let mut monitor = FlowMonitor::new();
        monitor.record_tx(flow(), 1000, Duration::from_secs(40));
        monitor.record_tx(flow(), 1000, Duration::from_secs(41));
        let report = monitor.report();
        let stats = &report.flows[0];
        assert_eq!(stats.rx_packets, 0);
        assert_eq!(stats.throughput_bps, 0.0);
        assert_eq!(stats.mean_hop_count, 0.0);
        assert_eq!(stats.delivery_ratio, 0.0);
    }

    #[test]
    fn simultaneous_tx_rx_does_not_divide_by_zero() {
        let mut monitor = FlowMonitor::new();
        monitor.record_tx(flow(), 1000, Duration::from_secs(40));
        monitor.record_rx(flow(), 1000, 1, Duration::from_secs(40));
        assert_eq!(monitor.report().flows[0].throughput_bps, 0.0);
    }

    #[test]
    fn drops_are_counted_per_flow() {
        let mut monitor = FlowMonitor::new();
        monitor.record_tx(flow(), 1000, Duration::from_secs(40));
        monitor.record_drop(flow(), DropReason::DiscoveryFailed);
        assert_eq!(monitor.report().flows[0].dropped_packets, 1);
    }

    #[test]
    fn lost_packets_saturates_when_rx_exceeds_tx() {
        let mut monitor = FlowMonitor::new();
        monitor.record_tx(flow(), 1000, Duration::from_secs(40));
        monitor.record_rx(flow(), 1000, 1, Duration::from_secs(41));
        monitor.record_rx(flow(), 1000, 1, Duration::from_secs(42));
        assert_eq!(monitor.report().flows[0].lost_packets(), 0);
    }

    #[test]
    fn report_serializes() {
        let mut monitor = FlowMonitor::new();
        monitor.record_tx(flow(), 1000, Duration::from_secs(40));
        let json = monitor.report().to_json().unwrap();
        assert!(json.contains("tx_packets"));
    }
}
