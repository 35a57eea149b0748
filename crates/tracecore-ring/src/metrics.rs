use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for a single ring. Cheap to update from the hot path;
/// reads happen only on the drain side via [`RingMetrics::snapshot`].
#[derive(Debug, Default)]
pub struct RingMetrics {
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    batches_sent: AtomicU64,
    batches_received: AtomicU64,
    reserve_spins: AtomicU64,
    overwritten_oldest: AtomicU64,
}

impl RingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_messages_sent(&self, n: u64) {
        self.messages_sent.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_messages_received(&self, n: u64) {
        self.messages_received.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_batches_sent(&self, n: u64) {
        self.batches_sent.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_batches_received(&self, n: u64) {
        self.batches_received.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_reserve_spins(&self, n: u64) {
        self.reserve_spins.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn add_overwritten_oldest(&self, n: u64) {
        self.overwritten_oldest.fetch_add(n, Ordering::Relaxed);
    }

    /// Zeroes every counter. Only sound when called on a ring no producer or
    /// consumer is concurrently touching (see [`crate::Ring::reset`]).
    pub(crate) fn reset(&self) {
        self.messages_sent.store(0, Ordering::Relaxed);
        self.messages_received.store(0, Ordering::Relaxed);
        self.batches_sent.store(0, Ordering::Relaxed);
        self.batches_received.store(0, Ordering::Relaxed);
        self.reserve_spins.store(0, Ordering::Relaxed);
        self.overwritten_oldest.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RingMetricsSnapshot {
        RingMetricsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            batches_received: self.batches_received.load(Ordering::Relaxed),
            reserve_spins: self.reserve_spins.load(Ordering::Relaxed),
            overwritten_oldest: self.overwritten_oldest.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RingMetrics`], safe to pass around or serialize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingMetricsSnapshot {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub batches_sent: u64,
    pub batches_received: u64,
    pub reserve_spins: u64,
    pub overwritten_oldest: u64,
}
