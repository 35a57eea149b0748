//! Thread registry and per-thread lane ring pools.
//!
//! On a thread's first event, [`Registry::register`] claims a slot and
//! publishes a [`lane::Lane`] pair (index + detail) for it; subsequent
//! events on that thread use [`Registry::lookup_fast`], a thread-local
//! pointer cache that never touches shared memory. The drain side walks
//! slots via [`Registry::iterate_active`] and drains lanes whose
//! `submit_queue` is non-empty.

mod error;
mod lane;
mod registry;

pub use error::RegistryError;
pub use lane::{DrainTicket, Lane, LaneMetricsSnapshot, SubmitOutcome, TryAcquireOutcome};
pub use registry::{Registry, RegistryConfig, ThreadLaneSet, MAX_THREADS};
