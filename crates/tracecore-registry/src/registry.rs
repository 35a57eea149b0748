use crate::error::RegistryError;
use crate::lane::Lane;
use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use tracecore_ring::{DetailSlot, IndexRecord, RingConfig};

/// Upper bound on concurrently registered threads. A single `u64` bitmap
/// drives slot admission; a deployment that needs more threads would shard
/// the bitmap (or switch to a `bitvec`) without changing the register /
/// unregister protocol itself.
pub const MAX_THREADS: usize = 64;

/// Sizing for the index and detail lane pools every registered thread gets.
#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    pub index_ring: RingConfig,
    pub index_pool_size: usize,
    pub detail_ring: RingConfig,
    pub detail_pool_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            index_ring: RingConfig::default(),
            index_pool_size: 3,
            detail_ring: RingConfig::default(),
            detail_pool_size: 2,
        }
    }
}

/// Per-thread registry slot: an index lane, a detail lane, and the
/// scheduling metadata the drainer uses to pick among active threads.
pub struct ThreadLaneSet {
    thread_id: AtomicU32,
    slot_index: u32,
    active: AtomicBool,
    pub index_lane: Lane<IndexRecord>,
    pub detail_lane: Lane<DetailSlot>,
    credits: AtomicU32,
    last_drain_time_ns: AtomicU64,
    detail_seq_cursor: AtomicU32,
}

impl ThreadLaneSet {
    fn new(slot_index: u32, config: RegistryConfig) -> Self {
        Self {
            thread_id: AtomicU32::new(0),
            slot_index,
            active: AtomicBool::new(false),
            index_lane: Lane::new(config.index_ring, config.index_pool_size),
            detail_lane: Lane::new(config.detail_ring, config.detail_pool_size),
            credits: AtomicU32::new(0),
            last_drain_time_ns: AtomicU64::new(0),
            detail_seq_cursor: AtomicU32::new(0),
        }
    }

    pub fn thread_id(&self) -> u32 {
        self.thread_id.load(Ordering::Acquire)
    }

    pub fn slot_index(&self) -> u32 {
        self.slot_index
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn credits(&self) -> u32 {
        self.credits.load(Ordering::Relaxed)
    }

    pub fn add_credits(&self, n: u32) {
        self.credits.fetch_add(n, Ordering::Relaxed);
    }

    pub fn last_drain_time_ns(&self) -> u64 {
        self.last_drain_time_ns.load(Ordering::Relaxed)
    }

    pub fn set_last_drain_time_ns(&self, t: u64) {
        self.last_drain_time_ns.store(t, Ordering::Relaxed);
    }

    /// Reserves this thread's next detail-file sequence number. This is the
    /// single source of truth for "next detail position": the hook stamps
    /// the returned value into `IndexRecord::detail_seq` before the record
    /// ever enters the index ring, and it is the same counter the writer
    /// would assign on append in the common case where nothing is dropped
    /// in between. If the detail lane later evicts that record via
    /// `SubmitOutcome::DroppedOldest` (selective persistence chose not to
    /// keep it), the stamped `detail_seq` ends up referring to a position
    /// the detail file never receives — the same best-effort gap already
    /// accepted for other counted-but-lossy edges of this pipeline (e.g.
    /// pool exhaustion), not a new one introduced by this counter.
    pub fn reserve_detail_seq(&self) -> u32 {
        self.detail_seq_cursor.fetch_add(1, Ordering::Relaxed)
    }

    /// Total records queued for persistence across both lanes; the drain
    /// scheduler's pending-work term.
    pub fn pending(&self) -> usize {
        self.index_lane.pending_len()
            + if self.detail_lane.is_marked() { self.detail_lane.pending_len() } else { 0 }
    }
}

thread_local! {
    static FAST_SLOT: Cell<*const ThreadLaneSet> = Cell::new(std::ptr::null());
}

/// Lock-free admission table mapping threads to their lane sets. A process
/// hosts exactly one session (and therefore one registry) at a time, so
/// `lookup_fast`'s thread-local cache is keyed by thread alone.
pub struct Registry {
    slots: Box<[ThreadLaneSet]>,
    thread_count: AtomicU32,
    slot_bitmap: AtomicU64,
    drain_heartbeat_ns: AtomicU64,
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        let slots: Vec<ThreadLaneSet> =
            (0..MAX_THREADS as u32).map(|i| ThreadLaneSet::new(i, config)).collect();

        Self {
            slots: slots.into_boxed_slice(),
            thread_count: AtomicU32::new(0),
            slot_bitmap: AtomicU64::new(0),
            drain_heartbeat_ns: AtomicU64::new(0),
        }
    }

    /// Claims a slot for `thread_id`, initializes it, and caches it for this
    /// calling thread's subsequent [`Registry::lookup_fast`] calls.
    pub fn register(&self, thread_id: u32) -> Result<&ThreadLaneSet, RegistryError> {
        loop {
            let bitmap = self.slot_bitmap.load(Ordering::Relaxed);
            let free_bit = (!bitmap).trailing_zeros();
            if free_bit as usize >= MAX_THREADS {
                return Err(RegistryError::Capacity { max: MAX_THREADS });
            }
            let claim_mask = 1u64 << free_bit;

            if self
                .slot_bitmap
                .compare_exchange_weak(bitmap, bitmap | claim_mask, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                let slot = &self.slots[free_bit as usize];
                slot.thread_id.store(thread_id, Ordering::Relaxed);
                slot.credits.store(0, Ordering::Relaxed);
                slot.last_drain_time_ns.store(0, Ordering::Relaxed);
                slot.detail_seq_cursor.store(0, Ordering::Relaxed);
                // Sound here for the same reason the scalar resets above
                // are: the CAS above synchronizes-with `reclaim`'s
                // `fetch_and`, so no producer or drainer can be touching
                // this slot's lanes right now.
                slot.index_lane.reset();
                slot.detail_lane.reset();
                // Release: publishes the reset fields above before any
                // Acquire reader (the drainer) can observe `active == true`.
                slot.active.store(true, Ordering::Release);

                self.thread_count.fetch_add(1, Ordering::Relaxed);
                FAST_SLOT.with(|c| c.set(slot as *const ThreadLaneSet));
                return Ok(slot);
            }
        }
    }

    /// Thread-local cached slot lookup; skips the bitmap entirely once a
    /// thread has registered once.
    pub fn lookup_fast(&self) -> Option<&ThreadLaneSet> {
        FAST_SLOT.with(|c| {
            let ptr = c.get();
            if ptr.is_null() {
                None
            } else {
                // SAFETY: the pointer was set by `register` to a slot inside
                // `self.slots`, which lives as long as this `Registry`
                // (never reallocated or moved after construction).
                Some(unsafe { &*ptr })
            }
        })
    }

    /// Marks a thread's slot inactive. The slot's bitmap bit stays claimed
    /// until the drainer performs a final drain and calls [`Registry::reclaim`].
    pub fn unregister(&self, slot: &ThreadLaneSet) {
        slot.active.store(false, Ordering::Release);
    }

    /// Drain-side: releases a slot back to the free pool once its final
    /// drain has completed.
    pub fn reclaim(&self, slot_index: u32) {
        self.slot_bitmap.fetch_and(!(1u64 << slot_index), Ordering::AcqRel);
        self.thread_count.fetch_sub(1, Ordering::Relaxed);
    }

    /// Drain-side: visits every currently active slot.
    pub fn iterate_active<'a>(&'a self) -> impl Iterator<Item = &'a ThreadLaneSet> {
        self.slots.iter().filter(|s| s.is_active())
    }

    /// Drain-side: visits every slot that is either active or has pending
    /// work (so a final drain still sees a just-deactivated slot once more).
    pub fn iterate_active_or_pending<'a>(&'a self) -> impl Iterator<Item = &'a ThreadLaneSet> {
        self.slots.iter().filter(|s| s.is_active() || s.pending() > 0)
    }

    pub fn thread_count(&self) -> u32 {
        self.thread_count.load(Ordering::Relaxed)
    }

    pub fn record_drain_heartbeat(&self, now_ns: u64) {
        self.drain_heartbeat_ns.store(now_ns, Ordering::Relaxed);
    }

    pub fn drain_heartbeat_ns(&self) -> u64 {
        self.drain_heartbeat_ns.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_lookup_fast_on_same_thread() {
        let registry = Registry::new(RegistryConfig::default());
        let slot = registry.register(7).unwrap();
        assert_eq!(slot.thread_id(), 7);
        assert!(slot.is_active());

        let cached = registry.lookup_fast().unwrap();
        assert_eq!(cached.thread_id(), 7);
    }

    #[test]
    fn registering_past_max_threads_fails() {
        let registry = Registry::new(RegistryConfig::default());
        for t in 0..MAX_THREADS as u32 {
            registry.register(t).unwrap();
        }
        let err = registry.register(MAX_THREADS as u32).unwrap_err();
        assert_eq!(err, RegistryError::Capacity { max: MAX_THREADS });
    }

    #[test]
    fn unregister_then_reclaim_frees_the_slot_for_reuse() {
        let registry = Registry::new(RegistryConfig::default());
        let slot_index = registry.register(1).unwrap().slot_index();
        let slot = &registry.slots[slot_index as usize];
        registry.unregister(slot);
        assert!(!slot.is_active());

        registry.reclaim(slot_index);
        assert_eq!(registry.thread_count(), 0);

        // the slot can be claimed again
        let reused = registry.register(2).unwrap();
        assert_eq!(reused.slot_index(), slot_index);
        assert_eq!(reused.thread_id(), 2);
    }

    #[test]
    fn iterate_active_only_yields_registered_threads() {
        let registry = Registry::new(RegistryConfig::default());
        registry.register(1).unwrap();
        registry.register(2).unwrap();
        let ids: Vec<u32> = registry.iterate_active().map(|s| s.thread_id()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&1) && ids.contains(&2));
    }
}
