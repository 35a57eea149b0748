//! Lock-free single-producer/single-consumer ring buffer and the fixed-layout
//! records it carries.
//!
//! Each producer thread owns a private ring; a single drain-side consumer
//! reads it. The ring never blocks and never allocates on the hot path: a
//! full ring simply refuses further writes, leaving swap/drop decisions to
//! the lane that owns it (see `tracecore-registry`).
//!
//! # Example
//!
//! ```
//! use tracecore_ring::{Ring, RingConfig};
//! use std::mem::MaybeUninit;
//!
//! let ring = Ring::<u64>::new(RingConfig::default());
//! if let Some(mut r) = ring.reserve(1) {
//!     r.as_mut_slice()[0] = MaybeUninit::new(42);
//!     r.commit();
//! }
//! ring.consume_batch(|item| println!("{item}"));
//! ```

mod backoff;
mod config;
mod invariants;
mod metrics;
mod record;
mod reservation;
mod ring;

pub use backoff::Backoff;
pub use config::{RingConfig, HIGH_THROUGHPUT_CONFIG, LOW_LATENCY_CONFIG};
pub use metrics::{RingMetrics, RingMetricsSnapshot};
pub use record::{
    DetailRecordHeader, DetailSlot, EventKind, IndexRecord, DETAIL_SEQ_NONE, MAX_STACK_BYTES,
};
pub use reservation::Reservation;
pub use ring::Ring;
