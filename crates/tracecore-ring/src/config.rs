/// Configuration for a single [`crate::Ring`].
#[derive(Debug, Clone, Copy)]
pub struct RingConfig {
    /// Ring capacity as a power of two (default: 10 = 1024 slots).
    pub ring_bits: u8,
    /// Enable metrics collection (slight overhead on the hot path).
    pub enable_metrics: bool,
}

impl RingConfig {
    /// Creates a new configuration with custom settings.
    ///
    /// # Panics
    ///
    /// Panics if `ring_bits` is 0 or greater than 20 (1M slots max).
    pub const fn new(ring_bits: u8, enable_metrics: bool) -> Self {
        assert!(ring_bits > 0 && ring_bits <= 20, "ring_bits must be between 1 and 20");

        Self {
            ring_bits,
            enable_metrics,
        }
    }

    /// Returns the capacity of the ring buffer.
    #[inline]
    pub const fn capacity(&self) -> usize {
        1 << self.ring_bits
    }

    /// Returns the mask used for index wrapping.
    #[inline]
    pub const fn mask(&self) -> usize {
        self.capacity() - 1
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            ring_bits: 10, // 1024 slots
            enable_metrics: false,
        }
    }
}

/// Tuned for minimal per-record latency: small ring, fits in L1.
pub const LOW_LATENCY_CONFIG: RingConfig = RingConfig::new(8, false);

/// Tuned for burst absorption: large ring, fewer forced swaps.
pub const HIGH_THROUGHPUT_CONFIG: RingConfig = RingConfig::new(14, false);
