use std::time::Duration;

/// Tuning for one [`crate::DrainScheduler`] instance.
#[derive(Debug, Clone, Copy)]
pub struct DrainConfig {
    /// How long the drain loop sleeps between snapshots of the registry.
    pub iteration_interval: Duration,
    /// Upper bound on rings popped from one lane's submit queue per service.
    pub max_rings_per_service: usize,
    /// Credit awarded to a slot each time it is serviced.
    pub credit_increment: u32,
    /// If `drain_heartbeat_ns` stops advancing for longer than this, the
    /// agent side is expected to treat the drainer as stalled (§7).
    pub heartbeat_stall_threshold: Duration,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            iteration_interval: Duration::from_millis(5),
            max_rings_per_service: 1,
            credit_increment: 1,
            heartbeat_stall_threshold: Duration::from_millis(200),
        }
    }
}
