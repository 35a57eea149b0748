use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use tracecore_ring::{Ring, RingConfig};

/// Capacity of the tiny `submit_queue`/`free_queue` id rings. Lane pools are
/// small (2-4 rings), so 16 slots leaves ample headroom.
const QUEUE_RING_BITS: u8 = 4;

/// What happened when a record was handed to a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Written to the active ring without any swap.
    Written,
    /// The active ring was full; a spare was available and is now active.
    /// The old ring was pushed onto the submit queue for draining.
    SwappedAndSubmitted,
    /// The active ring was full and no spare was available (or, for a
    /// detail lane, no marked event had armed a dump); the oldest unread
    /// record in the active ring was overwritten instead.
    DroppedOldest,
}

#[derive(Debug, Default)]
struct LaneMetrics {
    events_written: AtomicU64,
    swapped_and_submitted: AtomicU64,
    dropped_oldest: AtomicU64,
}

impl LaneMetrics {
    fn snapshot(&self) -> LaneMetricsSnapshot {
        LaneMetricsSnapshot {
            events_written: self.events_written.load(Ordering::Relaxed),
            swapped_and_submitted: self.swapped_and_submitted.load(Ordering::Relaxed),
            dropped_oldest: self.dropped_oldest.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.events_written.store(0, Ordering::Relaxed);
        self.swapped_and_submitted.store(0, Ordering::Relaxed);
        self.dropped_oldest.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time copy of a lane's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LaneMetricsSnapshot {
    pub events_written: u64,
    pub swapped_and_submitted: u64,
    pub dropped_oldest: u64,
}

/// A ring id handed to the drainer by [`Lane::try_acquire_drain`]. Must be
/// returned via [`Lane::release_drain`] once the ring has been fully drained.
#[derive(Debug, Clone, Copy)]
pub struct DrainTicket {
    ring_id: u32,
}

impl DrainTicket {
    pub fn ring_id(&self) -> u32 {
        self.ring_id
    }
}

/// Outcome of a non-blocking attempt to take a lane's next full ring.
#[derive(Debug)]
pub enum TryAcquireOutcome {
    /// Nothing has been submitted for drain.
    Empty,
    /// Another drain context already holds this lane (only possible when a
    /// deployment partitions one lane across more than one drain thread).
    Busy,
    /// A full ring is ready to be drained.
    Ready(DrainTicket),
}

/// A pool of `N` rings for one thread, one purpose (index or detail):
/// exactly one ring is "active" at a time; `submit_queue` carries full-ring
/// ids from producer to drainer, `free_queue` carries emptied-ring ids back.
pub struct Lane<T> {
    rings: Vec<Ring<T>>,
    active_ring_idx: AtomicU32,
    submit_queue: Ring<u32>,
    free_queue: Ring<u32>,
    drain_guard: AtomicBool,
    marked_event_seen: AtomicBool,
    metrics: LaneMetrics,
}

impl<T: Copy> Lane<T> {
    /// Builds a lane with `pool_size` rings, ring 0 starting active and the
    /// rest seeded onto the free queue.
    pub fn new(ring_config: RingConfig, pool_size: usize) -> Self {
        assert!(pool_size >= 2, "a lane needs at least one active ring and one spare");

        let mut rings = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            rings.push(Ring::new(ring_config));
        }

        let free_queue = Ring::new(RingConfig::new(QUEUE_RING_BITS, false));
        let submit_queue = Ring::new(RingConfig::new(QUEUE_RING_BITS, false));
        for id in 1..pool_size as u32 {
            assert!(free_queue.push(id), "free queue too small for configured pool size");
        }

        Self {
            rings,
            active_ring_idx: AtomicU32::new(0),
            submit_queue,
            free_queue,
            drain_guard: AtomicBool::new(false),
            marked_event_seen: AtomicBool::new(false),
            metrics: LaneMetrics::default(),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.rings.len()
    }

    /// Records one event, unconditionally swapping to a spare ring (or
    /// dropping the oldest record) when the active ring is full. This is
    /// the index-lane policy: always capture, always try to persist.
    pub fn record(&self, record: T) -> SubmitOutcome {
        let idx = self.active_ring_idx.load(Ordering::Acquire) as usize;
        if self.rings[idx].push(record) {
            self.metrics.events_written.fetch_add(1, Ordering::Relaxed);
            return SubmitOutcome::Written;
        }
        self.swap_or_drop(record, idx)
    }

    /// Records one detail event. Capture is unconditional; persistence is
    /// windowed: the active ring is only swapped out (submitted for
    /// persistence) if a marked event has armed the lane since the last
    /// dump. Otherwise the ring behaves as a pure flight recorder.
    pub fn record_gated(&self, record: T) -> SubmitOutcome {
        let idx = self.active_ring_idx.load(Ordering::Acquire) as usize;
        if self.rings[idx].push(record) {
            self.metrics.events_written.fetch_add(1, Ordering::Relaxed);
            return SubmitOutcome::Written;
        }

        if self.marked_event_seen.swap(false, Ordering::AcqRel) {
            self.swap_or_drop(record, idx)
        } else {
            self.rings[idx].overwrite_oldest(record);
            self.metrics.dropped_oldest.fetch_add(1, Ordering::Relaxed);
            SubmitOutcome::DroppedOldest
        }
    }

    fn swap_or_drop(&self, record: T, old_idx: usize) -> SubmitOutcome {
        let mut free_id = [0u32; 1];
        if self.free_queue.recv(&mut free_id) == 1 {
            let new_idx = free_id[0] as usize;
            self.active_ring_idx.store(new_idx as u32, Ordering::Release);
            assert!(self.rings[new_idx].push(record), "freshly freed ring rejected a push");
            assert!(self.submit_queue.push(old_idx as u32), "submit queue unexpectedly full");
            self.metrics.events_written.fetch_add(1, Ordering::Relaxed);
            self.metrics.swapped_and_submitted.fetch_add(1, Ordering::Relaxed);
            SubmitOutcome::SwappedAndSubmitted
        } else {
            self.rings[old_idx].overwrite_oldest(record);
            self.metrics.dropped_oldest.fetch_add(1, Ordering::Relaxed);
            SubmitOutcome::DroppedOldest
        }
    }

    /// Forces any records buffered in the still-active ring onto the submit
    /// queue for draining, without waiting for it to fill. Swaps in a spare
    /// ring exactly the way [`Self::swap_or_drop`] does, so a ring already
    /// mid-flight through `submit_queue` is never pushed a second time.
    /// Returns `false` (nothing to flush, or no spare ring free yet) without
    /// blocking; the caller retries on a later pass once draining frees one.
    ///
    /// Only safe to call once the owning thread has deregistered and
    /// stopped producing — otherwise a concurrent `record`/`record_gated`
    /// could race this swap.
    pub fn force_submit_active(&self) -> bool {
        let idx = self.active_ring_idx.load(Ordering::Acquire) as usize;
        if self.rings[idx].len() == 0 {
            return false;
        }
        let mut free_id = [0u32; 1];
        if self.free_queue.recv(&mut free_id) != 1 {
            return false;
        }
        let new_idx = free_id[0] as usize;
        self.active_ring_idx.store(new_idx as u32, Ordering::Release);
        assert!(self.submit_queue.push(idx as u32), "submit queue unexpectedly full");
        true
    }

    /// Arms the next full-ring swap for persistence. Only meaningful on a
    /// detail lane, called by the marking policy.
    pub fn mark(&self) {
        self.marked_event_seen.store(true, Ordering::Release);
    }

    pub fn is_marked(&self) -> bool {
        self.marked_event_seen.load(Ordering::Acquire)
    }

    /// Number of full rings waiting to be drained; feeds the drain
    /// scheduler's fairness calculation.
    pub fn pending_len(&self) -> usize {
        self.submit_queue.len()
    }

    /// Non-blocking: takes the next full ring off the submit queue, if any.
    pub fn try_acquire_drain(&self) -> TryAcquireOutcome {
        if self.drain_guard.swap(true, Ordering::AcqRel) {
            return TryAcquireOutcome::Busy;
        }

        let mut id = [0u32; 1];
        if self.submit_queue.recv(&mut id) == 1 {
            TryAcquireOutcome::Ready(DrainTicket { ring_id: id[0] })
        } else {
            self.drain_guard.store(false, Ordering::Release);
            TryAcquireOutcome::Empty
        }
    }

    /// Returns the ring a ticket refers to, for the drainer to read from.
    pub fn ring(&self, ticket: &DrainTicket) -> &Ring<T> {
        &self.rings[ticket.ring_id() as usize]
    }

    /// Returns a drained ring to the free pool and releases the drain guard.
    pub fn release_drain(&self, ticket: DrainTicket) {
        assert!(self.free_queue.push(ticket.ring_id), "free queue unexpectedly full on release");
        self.drain_guard.store(false, Ordering::Release);
    }

    pub fn metrics(&self) -> LaneMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Restores a lane to its just-built state for reuse by a new thread.
    /// Only sound during the quiescent window between a slot's reclaim and
    /// its next register: the CAS in [`crate::Registry::register`] and the
    /// `fetch_and` in [`crate::Registry::reclaim`] establish happens-before
    /// between the drainer's last touch of this lane and this reset, so no
    /// producer or drainer holds a live reference into it here.
    pub fn reset(&self) {
        for ring in &self.rings {
            ring.reset();
        }
        self.active_ring_idx.store(0, Ordering::Relaxed);

        let mut drained = [0u32; 1];
        while self.free_queue.recv(&mut drained) == 1 {}
        while self.submit_queue.recv(&mut drained) == 1 {}
        for id in 1..self.rings.len() as u32 {
            assert!(self.free_queue.push(id), "free queue too small for configured pool size");
        }

        self.drain_guard.store(false, Ordering::Relaxed);
        self.marked_event_seen.store(false, Ordering::Relaxed);
        self.metrics.reset();
    }
}
