//! Model-checked verification of the ring's release/acquire protocol.
//!
//! Run with: `cargo test --features loom --test loom_tests --release`
//!
//! `loom` exhaustively explores thread interleavings; a plain stress test
//! can miss a reordering bug that only manifests on weaker memory models.

#![cfg(feature = "loom")]

use loom::sync::atomic::{AtomicU64, Ordering};
use loom::sync::Arc;
use loom::thread;
use std::cell::UnsafeCell;

/// Minimal standalone model of the head/tail protocol in `Ring<T>`, kept
/// tiny so loom's state space stays tractable.
struct LoomRing {
    tail: AtomicU64,
    head: AtomicU64,
    buffer: UnsafeCell<[u64; 4]>,
}

unsafe impl Send for LoomRing {}
unsafe impl Sync for LoomRing {}

impl LoomRing {
    fn new() -> Self {
        Self {
            tail: AtomicU64::new(0),
            head: AtomicU64::new(0),
            buffer: UnsafeCell::new([0; 4]),
        }
    }

    fn push(&self, value: u64) -> bool {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);

        if tail.wrapping_sub(head) as usize >= 4 {
            return false;
        }

        let idx = (tail as usize) & 3;
        // SAFETY: space was checked above; only the producer writes ahead of tail.
        unsafe {
            (*self.buffer.get())[idx] = value;
        }
        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        true
    }

    fn pop(&self) -> Option<u64> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);

        if head == tail {
            return None;
        }

        let idx = (head as usize) & 3;
        // SAFETY: Acquire on tail synchronizes with the producer's Release,
        // so the write at idx is visible here.
        let value = unsafe { (*self.buffer.get())[idx] };
        self.head.store(head.wrapping_add(1), Ordering::Release);
        Some(value)
    }
}

#[test]
fn producer_writes_are_visible_before_consumer_reads() {
    loom::model(|| {
        let ring = Arc::new(LoomRing::new());

        let producer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                for v in 0..2 {
                    while !ring.push(v) {
                        loom::thread::yield_now();
                    }
                }
            })
        };

        let consumer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                let mut seen = Vec::new();
                while seen.len() < 2 {
                    if let Some(v) = ring.pop() {
                        seen.push(v);
                    } else {
                        loom::thread::yield_now();
                    }
                }
                seen
            })
        };

        producer.join().unwrap();
        let seen = consumer.join().unwrap();
        assert_eq!(seen, vec![0, 1]);
    });
}
