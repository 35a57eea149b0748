use crate::invariants::{
    debug_assert_bounded_count, debug_assert_head_not_past_tail, debug_assert_initialized_read,
    debug_assert_monotonic, debug_assert_no_wrap,
};
use crate::{Backoff, Reservation, RingConfig, RingMetrics};
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// Unbounded u64 sequence numbers for `head`/`tail` avoid the ABA problem
// without wrapped indices; buffer position is `sequence & mask`, computed
// only at the point of access.
//
// Producer (write path):
//   1. load tail (Relaxed — only the producer writes it)
//   2. load cached_head (UnsafeCell, single-writer, no atomic needed)
//   3. if the cache says there isn't enough room, load head (Acquire) and refresh the cache
//   4. write record bytes (no ordering needed, protected by the protocol below)
//   5. store tail (Release — publishes the writes to the consumer)
//
// Consumer (read path):
//   1. load head (Relaxed — only the consumer writes it)
//   2. load cached_tail (UnsafeCell, single-writer)
//   3. if the cache says nothing is available, load tail (Acquire) and refresh the cache
//   4. read record bytes
//   5. store head (Release — publishes consumption to the producer)
//
// `cached_head`/`cached_tail`/`buffer` are all single-writer: cached_head only
// by the producer, cached_tail only by the consumer, buffer slots by whichever
// side currently owns the range (producer between reserve and commit, consumer
// between readable and advance). That single-writer property is what makes the
// UnsafeCell accesses sound; it is enforced by the ring having exactly one
// producer and one consumer at a time (see `Ring::overwrite_oldest` for the one
// documented exception).
// =============================================================================

/// Single-producer/single-consumer ring of fixed-size records.
///
/// 128-byte aligned hot fields keep producer and consumer cache lines apart;
/// cached cursors keep the common case off the cross-core atomics entirely.
#[repr(C)]
pub struct Ring<T> {
    tail: CacheAligned<AtomicU64>,
    cached_head: CacheAligned<UnsafeCell<u64>>,

    head: CacheAligned<AtomicU64>,
    cached_tail: CacheAligned<UnsafeCell<u64>>,

    closed: AtomicBool,
    metrics: RingMetrics,
    config: RingConfig,

    buffer: UnsafeCell<Box<[MaybeUninit<T>]>>,
}

// SAFETY: the only non-atomic shared state (`buffer`, `cached_head`,
// `cached_tail`) is accessed with the single-writer discipline described
// above, which holds across threads as long as `T: Send`.
unsafe impl<T: Send> Send for Ring<T> {}
unsafe impl<T: Send> Sync for Ring<T> {}

impl<T> Ring<T> {
    pub fn new(config: RingConfig) -> Self {
        let capacity = config.capacity();
        let mut buffer = Vec::with_capacity(capacity);
        buffer.resize_with(capacity, MaybeUninit::uninit);

        Self {
            tail: CacheAligned::new(AtomicU64::new(0)),
            cached_head: CacheAligned::new(UnsafeCell::new(0)),
            head: CacheAligned::new(AtomicU64::new(0)),
            cached_tail: CacheAligned::new(UnsafeCell::new(0)),
            closed: AtomicBool::new(false),
            metrics: RingMetrics::new(),
            config,
            buffer: UnsafeCell::new(buffer.into_boxed_slice()),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    #[inline]
    fn mask(&self) -> usize {
        self.config.mask()
    }

    #[inline]
    pub fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        tail.wrapping_sub(head) as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tail.load(Ordering::Relaxed) == self.head.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity()
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // -------------------------------------------------------------------
    // PRODUCER API
    // -------------------------------------------------------------------

    /// Reserves `n` slots for zero-copy writing. Returns `None` if the ring
    /// cannot currently fit `n` records; never blocks.
    #[allow(clippy::cast_possible_truncation)]
    pub fn reserve(&self, n: usize) -> Option<Reservation<'_, T>> {
        if n == 0 || n > self.capacity() {
            return None;
        }

        let tail = self.tail.load(Ordering::Relaxed);

        // SAFETY: cached_head is written only by the producer, which is
        // executing this very call.
        let cached_head = unsafe { *self.cached_head.get() };
        let space = self.capacity().saturating_sub(tail.wrapping_sub(cached_head) as usize);
        if space >= n {
            return Some(self.make_reservation(tail, n));
        }

        let head = self.head.load(Ordering::Acquire);
        // SAFETY: same single-writer argument; the Acquire load above
        // synchronizes with the consumer's Release store to `head`.
        unsafe {
            *self.cached_head.get() = head;
        }

        let space = self.capacity().saturating_sub(tail.wrapping_sub(head) as usize);
        if space < n {
            return None;
        }
        Some(self.make_reservation(tail, n))
    }

    /// Reserves with adaptive backoff: spins, then yields, then gives up.
    pub fn reserve_with_backoff(&self, n: usize) -> Option<Reservation<'_, T>> {
        let mut backoff = Backoff::new();
        while !backoff.is_completed() {
            if let Some(r) = self.reserve(n) {
                return Some(r);
            }
            if self.is_closed() {
                return None;
            }
            if self.config.enable_metrics {
                self.metrics.add_reserve_spins(1);
            }
            backoff.snooze();
        }
        None
    }

    fn make_reservation(&self, tail: u64, n: usize) -> Reservation<'_, T> {
        let mask = self.mask();
        let idx = (tail as usize) & mask;
        let contiguous = n.min(self.capacity() - idx);
        debug_assert_no_wrap!(idx, contiguous, self.capacity());

        // SAFETY: idx..idx+contiguous lies strictly beyond the consumer's
        // current tail view (verified by the space check in `reserve`), so
        // only the producer touches these slots until `commit_internal`
        // publishes them.
        let slice = unsafe {
            let buffer = &mut *self.buffer.get();
            &mut buffer[idx..idx + contiguous]
        };

        let ring_ptr = self as *const Self;
        Reservation::new(slice, ring_ptr)
    }

    /// Publishes `n` previously reserved slots. Called only by [`Reservation::commit_n`].
    pub(crate) fn commit_internal(&self, n: usize) {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        debug_assert_bounded_count!(head, tail.wrapping_add(n as u64), self.capacity());

        self.tail.store(tail.wrapping_add(n as u64), Ordering::Release);

        if self.config.enable_metrics {
            self.metrics.add_messages_sent(n as u64);
            self.metrics.add_batches_sent(1);
        }
    }

    /// Producer-only escape hatch for drop-oldest: overwrites the single
    /// oldest slot and advances `head` past it, as if the consumer had just
    /// read and released it.
    ///
    /// # Safety contract
    ///
    /// The caller must guarantee no consumer currently holds a reference
    /// into this ring's readable range — i.e. this ring is not the one a
    /// drain is actively iterating. The lane/registry layer upholds this by
    /// only ever calling `overwrite_oldest` on the *active* ring, which by
    /// construction is never the ring a drain has taken off the submit
    /// queue (the swap always happens before submission). Calling this
    /// while a consumer is mid-read races on `head` and violates the SPSC
    /// contract.
    pub fn overwrite_oldest(&self, record: T) {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Relaxed);
        debug_assert_head_not_past_tail!(head, tail);

        let mask = self.mask();
        let idx = (head as usize) & mask;
        // SAFETY: per the contract above, no consumer reads this ring
        // concurrently, so the producer may freely overwrite and retire the
        // oldest slot.
        unsafe {
            let buffer = &mut *self.buffer.get();
            if tail.wrapping_sub(head) as usize >= self.capacity() {
                ptr::drop_in_place(buffer[idx].as_mut_ptr());
            }
            buffer[idx] = MaybeUninit::new(record);
        }

        let new_head = head.wrapping_add(1);
        debug_assert_monotonic!(head, new_head);
        self.head.store(new_head, Ordering::Release);

        let new_tail = tail.wrapping_add(1).max(new_head);
        self.tail.store(new_tail, Ordering::Release);

        if self.config.enable_metrics {
            self.metrics.add_overwritten_oldest(1);
        }
    }

    // -------------------------------------------------------------------
    // CONSUMER API
    // -------------------------------------------------------------------

    pub fn readable(&self) -> Option<&[T]> {
        let head = self.head.load(Ordering::Relaxed);

        // SAFETY: cached_tail is written only by the consumer (this call).
        let mut cached_tail = unsafe { *self.cached_tail.get() };
        let mut avail = cached_tail.wrapping_sub(head) as usize;

        if avail == 0 {
            cached_tail = self.tail.load(Ordering::Acquire);
            // SAFETY: same single-writer argument; Acquire synchronizes
            // with the producer's Release store to `tail`.
            unsafe {
                *self.cached_tail.get() = cached_tail;
            }
            avail = cached_tail.wrapping_sub(head) as usize;
            if avail == 0 {
                return None;
            }
        }

        let mask = self.mask();
        let idx = (head as usize) & mask;
        let contiguous = avail.min(self.capacity() - idx);

        // SAFETY: [head, tail) was published by the producer's Release
        // store, observed here via the Acquire load above; only the
        // consumer reads these slots until `advance` retires them.
        unsafe {
            let buffer = &*self.buffer.get();
            Some(std::slice::from_raw_parts(buffer[idx..].as_ptr().cast::<T>(), contiguous))
        }
    }

    #[inline]
    pub fn advance(&self, n: usize) {
        let head = self.head.load(Ordering::Relaxed);
        self.head.store(head.wrapping_add(n as u64), Ordering::Release);

        if self.config.enable_metrics {
            self.metrics.add_messages_received(n as u64);
            self.metrics.add_batches_received(1);
        }
    }

    /// Consumes every available record with a single head update.
    #[allow(clippy::cast_possible_truncation)]
    pub fn consume_batch<F>(&self, mut handler: F) -> usize
    where
        F: FnMut(&T),
    {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        let avail = tail.wrapping_sub(head) as usize;
        if avail == 0 {
            return 0;
        }

        let mask = self.mask();
        let mut pos = head;
        let mut count = 0;

        while pos != tail {
            let idx = (pos as usize) & mask;
            debug_assert_initialized_read!(pos, head, tail);
            // SAFETY: [head, tail) was fully written by the producer before
            // its Release store to `tail`, observed via the Acquire load above.
            unsafe {
                let buffer = &*self.buffer.get();
                let item = buffer[idx].assume_init_ref();
                handler(item);
            }
            pos = pos.wrapping_add(1);
            count += 1;
        }

        self.head.store(tail, Ordering::Release);

        if self.config.enable_metrics {
            self.metrics.add_messages_received(count as u64);
            self.metrics.add_batches_received(1);
        }

        count
    }

    /// Consumes up to `max_items` records with a single head update.
    #[allow(clippy::cast_possible_truncation)]
    pub fn consume_up_to<F>(&self, max_items: usize, mut handler: F) -> usize
    where
        F: FnMut(&T),
    {
        if max_items == 0 {
            return 0;
        }

        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        let avail = tail.wrapping_sub(head) as usize;
        if avail == 0 {
            return 0;
        }

        let to_consume = avail.min(max_items);
        let mask = self.mask();
        let mut pos = head;
        let mut count = 0;

        while count < to_consume {
            let idx = (pos as usize) & mask;
            debug_assert_initialized_read!(pos, head, tail);
            // SAFETY: see `consume_batch`.
            unsafe {
                let buffer = &*self.buffer.get();
                let item = buffer[idx].assume_init_ref();
                handler(item);
            }
            pos = pos.wrapping_add(1);
            count += 1;
        }

        self.head.store(head.wrapping_add(count as u64), Ordering::Release);

        if self.config.enable_metrics {
            self.metrics.add_messages_received(count as u64);
            self.metrics.add_batches_received(1);
        }

        count
    }

    #[inline]
    pub fn push(&self, item: T) -> bool {
        self.reserve(1).map_or(false, |mut r| {
            r.as_mut_slice()[0] = MaybeUninit::new(item);
            r.commit();
            true
        })
    }

    pub fn send(&self, items: &[T]) -> usize
    where
        T: Copy,
    {
        self.reserve(items.len()).map_or(0, |mut reservation| {
            let slice = reservation.as_mut_slice();
            let n = slice.len();
            for i in 0..n {
                slice[i].write(items[i]);
            }
            reservation.commit();
            n
        })
    }

    pub fn recv(&self, out: &mut [T]) -> usize
    where
        T: Copy,
    {
        self.readable().map_or(0, |slice| {
            let n = slice.len().min(out.len());
            out[..n].copy_from_slice(&slice[..n]);
            self.advance(n);
            n
        })
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Logically empties the ring for reuse by a new occupant. Only sound to
    /// call when no producer or consumer holds a reference into this ring at
    /// the time (e.g. a registry slot between reclaim and the next register).
    /// Never drops buffer contents: callers require `T: Copy`, so stale slots
    /// are simply overwritten by the next writer rather than destructed.
    pub fn reset(&self)
    where
        T: Copy,
    {
        self.tail.store(0, Ordering::Relaxed);
        self.head.store(0, Ordering::Relaxed);
        unsafe {
            *self.cached_head.get() = 0;
            *self.cached_tail.get() = 0;
        }
        self.closed.store(false, Ordering::Relaxed);
        self.metrics.reset();
    }

    pub fn metrics(&self) -> crate::RingMetricsSnapshot {
        if self.config.enable_metrics {
            self.metrics.snapshot()
        } else {
            crate::RingMetricsSnapshot::default()
        }
    }
}

impl<T> Drop for Ring<T> {
    fn drop(&mut self) {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        let count = tail.wrapping_sub(head) as usize;

        if count > 0 {
            let mask = self.mask();
            let buffer = self.buffer.get_mut();

            for i in 0..count {
                let idx = (head as usize).wrapping_add(i) & mask;
                // SAFETY: these are exactly the slots the ring's own
                // bookkeeping considers initialized.
                unsafe {
                    ptr::drop_in_place(buffer[idx].as_mut_ptr());
                }
            }
        }
    }
}

/// 128-byte aligned wrapper to keep hot fields on separate cache lines and
/// away from adjacent-line prefetch false sharing.
#[repr(align(128))]
struct CacheAligned<T> {
    value: T,
}

impl<T> CacheAligned<T> {
    const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> std::ops::Deref for CacheAligned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_commit_then_read() {
        let ring = Ring::<u64>::new(RingConfig::default());

        if let Some(mut r) = ring.reserve(4) {
            let slice = r.as_mut_slice();
            slice[0].write(100);
            slice[1].write(200);
            slice[2].write(300);
            slice[3].write(400);
            r.commit();
        }

        assert_eq!(ring.len(), 4);

        if let Some(slice) = ring.readable() {
            assert_eq!(slice[0], 100);
            assert_eq!(slice[3], 400);
            ring.advance(4);
        }

        assert!(ring.is_empty());
    }

    #[test]
    fn batch_consumption_sees_everything_at_once() {
        let ring = Ring::<u64>::new(RingConfig::default());

        for i in 0..10 {
            if let Some(mut r) = ring.reserve(1) {
                r.as_mut_slice()[0].write(i * 10);
                r.commit();
            }
        }

        let mut sum = 0u64;
        let consumed = ring.consume_batch(|item| sum += item);

        assert_eq!(consumed, 10);
        assert_eq!(sum, (0..10).map(|i| i * 10).sum::<u64>());
        assert!(ring.is_empty());
    }

    #[test]
    fn full_ring_rejects_further_reservations() {
        let config = RingConfig::new(4, false); // 16 slots
        let ring = Ring::<u64>::new(config);

        for i in 0..16 {
            if let Some(mut r) = ring.reserve(1) {
                r.as_mut_slice()[0].write(i);
                r.commit();
            }
        }

        assert!(ring.reserve(1).is_none());
    }

    #[test]
    fn overwrite_oldest_drops_the_earliest_unread_record() {
        let config = RingConfig::new(2, false); // 4 slots
        let ring = Ring::<u64>::new(config);

        for i in 0..4 {
            assert!(ring.push(i));
        }
        assert!(ring.reserve(1).is_none());

        ring.overwrite_oldest(99);
        assert_eq!(ring.len(), 4);

        let mut seen = Vec::new();
        ring.consume_batch(|item| seen.push(*item));
        assert_eq!(seen, vec![1, 2, 3, 99]);
    }
}
