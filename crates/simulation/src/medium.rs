//! Shared wireless medium model.
//!
//! Delivery eligibility (who hears a broadcast) is the topology's disc
//! model; this module only decides loss and per-frame latency.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// Wireless medium parameters.
#[derive(Debug, Clone)]
pub struct MediumConfig {
    /// One-hop propagation plus contention delay.
    pub base_latency: Duration,
    /// Jitter as a fraction of base latency.
    pub jitter_fraction: f64,
    /// Probability that any single frame is lost.
    pub loss_rate: f64,
}

impl Default for MediumConfig {
    fn default() -> Self {
        Self {
            base_latency: Duration::from_millis(2),
            jitter_fraction: 0.1,
            loss_rate: 0.0,
        }
    }
}

/// Samples loss and latency for wireless frames.
#[derive(Debug, Clone)]
pub struct WirelessMedium {
    config: MediumConfig,
}

impl WirelessMedium {
    pub fn new(config: MediumConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MediumConfig {
        &self.config
    }

    /// Whether this frame is lost (probabilistic but deterministic with a
    /// seeded RNG).
    pub fn should_drop(&self, rng: &mut ChaCha8Rng) -> bool {
        self.config.loss_rate > 0.0 && rng.gen::<f64>() < self.config.loss_rate
    }

    /// One-hop delivery latency with jitter.
    pub fn sample_latency(&self, rng: &mut ChaCha8Rng) -> Duration {
        let base = self.config.base_latency.as_secs_f64();
        let jitter_range = base * self.config.jitter_fraction;
        let jitter = if jitter_range > 0.0 {
            rng.gen_range(-jitter_range..jitter_range)
        } else {
            0.0
        };
        Duration::from_secs_f64((base + jitter).max(0.000_1))
    }
}
