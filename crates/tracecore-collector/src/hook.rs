//! The minimal surface an external hooker (a dynamic instrumentation layer,
//! or compiler-inserted prologue/epilogue pair) calls on every traced
//! function entry, exit, or exception.

use crate::policy::MarkingPolicy;
use std::sync::atomic::{AtomicU32, Ordering};
use tracecore_arena::clock::monotonic_now_ns;
use tracecore_registry::ThreadLaneSet;
use tracecore_ring::{DetailRecordHeader, DetailSlot, EventKind, IndexRecord, DETAIL_SEQ_NONE, MAX_STACK_BYTES};

/// Bound to exactly one thread's lane set; never shared across threads.
///
/// `next_index_seq` is the producer's own view of the index file's eventual
/// on-disk position. Because a thread's records reach the writer through
/// its own rings in strict FIFO order (ring-granular hand-off preserves
/// ordering across swaps), this producer-side counter lands on the same
/// sequence the writer assigns when it appends — no cross-thread
/// coordination is required to keep them in agreement.
///
/// The detail sequence has no such producer-local counter: detail-lane
/// persistence is selective (a captured record can still be evicted by
/// [`tracecore_registry::Lane::record_gated`] without ever reaching the
/// writer), so a counter living only on this `Hook` would drift from the
/// lane's real position the moment an eviction happened. Instead
/// `detail_seq` is reserved from [`ThreadLaneSet::reserve_detail_seq`], the
/// one counter shared by every `Hook` and drain path for this thread.
pub struct Hook<'a> {
    lanes: &'a ThreadLaneSet,
    policy: &'a MarkingPolicy,
    next_index_seq: AtomicU32,
    capture_stack_bytes: u16,
}

impl<'a> Hook<'a> {
    pub fn new(lanes: &'a ThreadLaneSet, policy: &'a MarkingPolicy, capture_stack_bytes: u16) -> Self {
        Self { lanes, policy, next_index_seq: AtomicU32::new(0), capture_stack_bytes }
    }

    /// Records one call/return/exception event. `stack_snapshot`, when
    /// given, is only captured into a paired detail record if stack capture
    /// is enabled (`capture_stack_bytes > 0`).
    pub fn record_index_event(
        &self,
        function_id: u64,
        event_kind: EventKind,
        call_depth: u32,
        duration_ns: Option<u64>,
        stack_snapshot: Option<&[u8]>,
    ) {
        let timestamp_ns = monotonic_now_ns();
        let index_seq = self.next_index_seq.fetch_add(1, Ordering::Relaxed);
        let thread_id = self.lanes.thread_id();

        let mut record = IndexRecord {
            timestamp_ns,
            function_id,
            thread_id,
            event_kind: event_kind as u32,
            call_depth,
            detail_seq: DETAIL_SEQ_NONE,
        };

        if self.policy.evaluate(&record, duration_ns) {
            self.lanes.detail_lane.mark();
        }

        if self.capture_stack_bytes > 0 {
            if let Some(stack) = stack_snapshot {
                record.detail_seq = self.lanes.reserve_detail_seq();

                let header = DetailRecordHeader {
                    total_length: 0,
                    event_type: event_kind as u16,
                    flags: 0,
                    index_seq,
                    thread_id,
                    timestamp_ns,
                };
                let len = stack.len().min(self.capture_stack_bytes as usize).min(MAX_STACK_BYTES);
                self.lanes.detail_lane.record_gated(DetailSlot::new(header, &stack[..len]));
            }
        }

        self.lanes.index_lane.record(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracecore_registry::{Registry, RegistryConfig};

    #[test]
    fn index_only_event_leaves_detail_seq_unset() {
        let registry = Registry::new(RegistryConfig::default());
        let slot = registry.register(1).unwrap();
        let policy = MarkingPolicy::compile(&[]);
        let hook = Hook::new(slot, &policy, 0);

        hook.record_index_event(7, EventKind::Call, 0, None, None);
        assert_eq!(slot.index_lane.metrics().events_written, 1);
        assert_eq!(slot.detail_lane.metrics().events_written, 0);
    }

    #[test]
    fn stack_capture_writes_a_paired_detail_record() {
        let registry = Registry::new(RegistryConfig::default());
        let slot = registry.register(1).unwrap();
        let policy = MarkingPolicy::compile(&[]);
        let hook = Hook::new(slot, &policy, 64);

        hook.record_index_event(7, EventKind::Call, 0, None, Some(&[1, 2, 3]));
        assert_eq!(slot.index_lane.metrics().events_written, 1);
        assert_eq!(slot.detail_lane.metrics().events_written, 1);
    }

    #[test]
    fn matching_policy_arms_the_detail_lane() {
        use crate::policy::TriggerSpec;
        let registry = Registry::new(RegistryConfig::default());
        let slot = registry.register(1).unwrap();
        let policy = MarkingPolicy::compile(&[TriggerSpec::Exception]);
        let hook = Hook::new(slot, &policy, 0);

        assert!(!slot.detail_lane.is_marked());
        hook.record_index_event(7, EventKind::Exception, 0, None, None);
        assert!(slot.detail_lane.is_marked());
    }
}
