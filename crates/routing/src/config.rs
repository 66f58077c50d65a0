//! Routing engine configuration.

use std::time::Duration;

/// Tunables for a single routing engine instance.
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// How long an installed route stays valid without being used.
    pub route_lifetime: Duration,

    /// Hello beacon period. `None` disables hellos regardless of variant.
    pub hello_interval: Option<Duration>,

    /// How long one discovery attempt waits for a reply.
    pub discovery_timeout: Duration,

    /// Re-broadcast attempts after the first request times out.
    pub discovery_retries: u32,

    /// Initial TTL on originated route requests.
    pub rreq_ttl: u8,

    /// Bounded per-destination queue of data packets awaiting a route.
    /// Overflow drops the oldest queued packet.
    pub pending_queue_cap: usize,

    /// Period of the route table / duplicate-cache purge timer.
    pub cleanup_interval: Duration,

    /// How long a seen route-request id suppresses duplicates.
    pub seen_request_lifetime: Duration,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            route_lifetime: Duration::from_secs(3),
            hello_interval: Some(Duration::from_secs(1)),
            discovery_timeout: Duration::from_secs(1),
            discovery_retries: 2,
            rreq_ttl: 16,
            pending_queue_cap: 64,
            cleanup_interval: Duration::from_secs(5),
            seen_request_lifetime: Duration::from_secs(5),
        }
    }
}
