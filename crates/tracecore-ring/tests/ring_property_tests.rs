//! Property-based tests for the SPSC ring's core invariants (§8 of the
//! design: bounded count, no-loss-under-capacity, FIFO ordering).

use proptest::prelude::*;
use std::mem::MaybeUninit;
use tracecore_ring::{Ring, RingConfig};

proptest! {
    /// The ring never reports more items than its capacity, regardless of
    /// how writes and reads are interleaved.
    #[test]
    fn bounded_count_holds(writes in 0usize..200, reads in 0usize..200) {
        let config = RingConfig::default();
        let ring = Ring::<u64>::new(config);
        let capacity = ring.capacity();

        let actual_writes = writes.min(capacity);
        for i in 0..actual_writes {
            if let Some(mut r) = ring.reserve(1) {
                r.as_mut_slice()[0] = MaybeUninit::new(i as u64);
                r.commit();
            }
        }
        prop_assert!(ring.len() <= capacity);

        let mut read_count = 0;
        let _ = reads;
        ring.consume_batch(|_| read_count += 1);
        prop_assert!(ring.len() <= capacity);
        prop_assert!(read_count <= actual_writes);
    }

    /// Records come back out in the order they were written (FIFO), as long
    /// as the ring never overflows.
    #[test]
    fn fifo_ordering_preserved(n in 1usize..64) {
        let ring = Ring::<u64>::new(RingConfig::new(8, false));
        for i in 0..n {
            assert!(ring.push(i as u64));
        }

        let mut seen = Vec::new();
        ring.consume_batch(|item| seen.push(*item));
        prop_assert_eq!(seen, (0..n as u64).collect::<Vec<_>>());
    }

    /// `overwrite_oldest` keeps the ring at capacity and always evicts
    /// exactly the oldest unread record.
    #[test]
    fn overwrite_oldest_keeps_capacity(extra in 0usize..20) {
        let ring = Ring::<u64>::new(RingConfig::new(4, false)); // 16 slots
        let capacity = ring.capacity();

        for i in 0..capacity {
            assert!(ring.push(i as u64));
        }

        for i in 0..extra {
            ring.overwrite_oldest((capacity + i) as u64);
            prop_assert_eq!(ring.len(), capacity);
        }

        let mut seen = Vec::new();
        ring.consume_batch(|item| seen.push(*item));
        let expected_start = extra;
        let expected: Vec<u64> = (expected_start..expected_start + capacity).map(|v| v as u64).collect();
        prop_assert_eq!(seen, expected);
    }
}
