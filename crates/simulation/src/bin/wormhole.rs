//! Run the canonical wormhole scenario and print flow statistics.
//!
//! Pass `--baseline` to run the same layout with the attack disabled.

use manetsim_simulation::WormholeScenario;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let wormhole = !std::env::args().any(|a| a == "--baseline");
    let scenario = WormholeScenario::new().with_wormhole(wormhole).with_seed(1);
    let mut runner = scenario.build()?;

    // Let routing converge and the first few seconds of traffic flow, then
    // snapshot the source's view of the network.
    runner.run_until(Duration::from_secs(45));
    println!(
        "--- route table of {} at t=45s ---",
        scenario.source()
    );
    for (dest, entry) in runner.routes_snapshot(scenario.source()) {
        println!(
            "  {dest:<12} via {:<12} hops {:<2} seq {:<4} {}",
            entry.next_hop.to_string(),
            entry.hop_count,
            entry.seq.0,
            if entry.via_tunnel { "(tunnel)" } else { "" }
        );
    }

    runner.run_until(Duration::from_secs(100));

    println!("\n--- flows ---");
    for stats in &runner.flow_report().flows {
        println!("Flow {}", stats.flow);
        println!("  Tx Packets:   {}", stats.tx_packets);
        println!("  Rx Packets:   {}", stats.rx_packets);
        println!("  Lost:         {}", stats.lost_packets());
        println!("  Mean hops:    {:.2}", stats.mean_hop_count);
        println!("  Throughput:   {:.2} Kbps", stats.throughput_bps / 1000.0);
    }

    let sim = runner.stats();
    println!("\n--- simulation ---");
    println!("  events processed: {}", sim.events_processed);
    println!("  control frames:   {}", sim.control_sent);
    println!("  data frames:      {}", sim.data_sent);
    println!("  tunnel relays:    {}", sim.tunnel_relays);
    println!("  delivery ratio:   {:.3}", sim.delivery_ratio());

    println!("\n{}", runner.flow_report().to_json()?);
    Ok(())
}
