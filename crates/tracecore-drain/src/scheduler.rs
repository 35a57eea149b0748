//! Weighted-fair drain scheduler: each iteration picks the lowest-score
//! active slot with pending work, drains at most `max_rings_per_service`
//! rings from each of its lanes, and performs final drains for threads that
//! have deregistered.

use crate::config::DrainConfig;
use std::collections::HashMap;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracecore_registry::{Registry, ThreadLaneSet, TryAcquireOutcome};
use tracecore_writer::{ThreadTraceWriter, WriteError};

/// Counters returned by one [`DrainScheduler::run_iteration`] call.
#[derive(Debug, Clone, Copy, Default)]
pub struct DrainStats {
    pub rings_drained: usize,
    pub threads_serviced: usize,
    pub threads_finalized: usize,
}

/// Drives one or more registry slots to disk. A deployment partitions the
/// registry's slot space across several schedulers (each on its own thread)
/// via [`DrainScheduler::with_slot_range`]; the default covers every slot.
pub struct DrainScheduler {
    config: DrainConfig,
    base_dir: PathBuf,
    slot_range: Option<Range<u32>>,
    writers: HashMap<u32, ThreadTraceWriter>,
}

impl DrainScheduler {
    pub fn new(config: DrainConfig, base_dir: PathBuf) -> Self {
        Self { config, base_dir, slot_range: None, writers: HashMap::new() }
    }

    pub fn with_slot_range(config: DrainConfig, base_dir: PathBuf, slot_range: Range<u32>) -> Self {
        Self { config, base_dir, slot_range: Some(slot_range), writers: HashMap::new() }
    }

    fn owns_slot(&self, slot_index: u32) -> bool {
        self.slot_range.as_ref().map_or(true, |r| r.contains(&slot_index))
    }

    fn writer_for(&mut self, slot_index: u32, thread_id: u32) -> Result<&mut ThreadTraceWriter, WriteError> {
        if !self.writers.contains_key(&slot_index) {
            let dir = self.base_dir.join(format!("thread-{thread_id}"));
            std::fs::create_dir_all(&dir)?;
            let writer = ThreadTraceWriter::open(&dir, thread_id)?;
            self.writers.insert(slot_index, writer);
        }
        Ok(self.writers.get_mut(&slot_index).unwrap())
    }

    /// Score a slot for selection: lower is more deserving of service.
    /// `credits / max(pending, 1)` so a slot with high pending and low
    /// credits sorts first; servicing raises its credits and pushes it back.
    fn score(slot: &ThreadLaneSet) -> f64 {
        slot.credits() as f64 / slot.pending().max(1) as f64
    }

    fn select_slot<'a>(&self, registry: &'a Registry) -> Option<&'a ThreadLaneSet> {
        registry
            .iterate_active()
            .filter(|s| self.owns_slot(s.slot_index()) && s.pending() > 0)
            .min_by(|a, b| {
                Self::score(a)
                    .partial_cmp(&Self::score(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.last_drain_time_ns().cmp(&b.last_drain_time_ns()))
            })
    }

    /// Drains up to `max_rings_per_service` rings from each of `slot`'s
    /// lanes, appending each batch to that thread's writer. Returns the
    /// number of rings actually drained.
    fn drain_slot(&mut self, slot: &ThreadLaneSet) -> usize {
        let slot_index = slot.slot_index();
        let thread_id = slot.thread_id();
        let mut drained = 0;

        for _ in 0..self.config.max_rings_per_service {
            match slot.index_lane.try_acquire_drain() {
                TryAcquireOutcome::Ready(ticket) => {
                    let mut batch = Vec::new();
                    slot.index_lane.ring(&ticket).consume_batch(|r| batch.push(*r));
                    match self.writer_for(slot_index, thread_id) {
                        Ok(writer) => {
                            if let Err(err) = writer.append_index(&batch) {
                                tracing::warn!(thread_id, %err, "index batch append failed");
                            }
                        }
                        Err(err) => tracing::warn!(thread_id, %err, "could not open index writer"),
                    }
                    slot.index_lane.release_drain(ticket);
                    drained += 1;
                }
                TryAcquireOutcome::Empty | TryAcquireOutcome::Busy => break,
            }
        }

        for _ in 0..self.config.max_rings_per_service {
            match slot.detail_lane.try_acquire_drain() {
                TryAcquireOutcome::Ready(ticket) => {
                    let mut batch = Vec::new();
                    slot.detail_lane.ring(&ticket).consume_batch(|r| batch.push(*r));
                    match self.writer_for(slot_index, thread_id) {
                        Ok(writer) => {
                            if let Err(err) = writer.append_detail(&batch) {
                                tracing::warn!(thread_id, %err, "detail batch append failed");
                            }
                        }
                        Err(err) => tracing::warn!(thread_id, %err, "could not open detail writer"),
                    }
                    slot.detail_lane.release_drain(ticket);
                    drained += 1;
                }
                TryAcquireOutcome::Empty | TryAcquireOutcome::Busy => break,
            }
        }

        drained
    }

    /// Runs one scheduling pass: services the fairest pending slot, then
    /// final-drains and reclaims any owned slot that has deregistered.
    pub fn run_iteration(&mut self, registry: &Registry, now_ns: u64) -> DrainStats {
        let mut stats = DrainStats::default();

        if let Some(slot) = self.select_slot(registry) {
            let drained = self.drain_slot(slot);
            stats.rings_drained += drained;
            if drained > 0 {
                slot.add_credits(self.config.credit_increment);
                slot.set_last_drain_time_ns(now_ns);
                stats.threads_serviced += 1;
            }
        }

        for slot in registry.iterate_active_or_pending() {
            if slot.is_active() || !self.owns_slot(slot.slot_index()) {
                continue;
            }
            if slot.pending() > 0 {
                stats.rings_drained += self.drain_slot(slot);
            }

            // The thread has stopped producing; its active rings may still
            // hold buffered records that never filled a ring on their own.
            // Force them onto the submit queue before deciding to finalize,
            // so a short-lived thread's tail of events is never silently
            // dropped.
            let index_flushed = slot.index_lane.force_submit_active();
            let detail_flushed = slot.detail_lane.force_submit_active();
            if index_flushed || detail_flushed {
                stats.rings_drained += self.drain_slot(slot);
            }

            if slot.pending() == 0 {
                if let Some(mut writer) = self.writers.remove(&slot.slot_index()) {
                    if let Err(err) = writer.finalize() {
                        tracing::warn!(thread_id = slot.thread_id(), %err, "final finalize failed");
                    }
                    stats.threads_finalized += 1;
                }
                registry.reclaim(slot.slot_index());
            }
        }

        registry.record_drain_heartbeat(now_ns);
        stats
    }

    /// Runs `run_iteration` in a loop on a dedicated thread until `stop` is
    /// set, sleeping `iteration_interval` between passes.
    pub fn spawn(mut self, registry: Arc<Registry>, stop: Arc<AtomicBool>) -> JoinHandle<Self> {
        let interval = self.config.iteration_interval;
        std::thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                let now_ns = tracecore_arena::clock::monotonic_now_ns();
                self.run_iteration(&registry, now_ns);
                std::thread::sleep(interval);
            }
            self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracecore_registry::RegistryConfig;
    use tracecore_ring::{EventKind, IndexRecord, DETAIL_SEQ_NONE};

    fn index_record(i: u64, thread_id: u32) -> IndexRecord {
        IndexRecord {
            timestamp_ns: i,
            function_id: i,
            thread_id,
            event_kind: EventKind::Call as u32,
            call_depth: 0,
            detail_seq: DETAIL_SEQ_NONE,
        }
    }

    #[test]
    fn drains_index_lane_and_writes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(RegistryConfig::default());
        let slot = registry.register(1).unwrap();
        for i in 0..slot.index_lane.pool_size() as u64 * 4 {
            slot.index_lane.record(index_record(i, 1));
        }
        assert!(slot.pending() > 0);

        let mut scheduler = DrainScheduler::new(DrainConfig::default(), dir.path().to_path_buf());
        let stats = scheduler.run_iteration(&registry, 1);
        assert!(stats.rings_drained > 0);
    }

    #[test]
    fn deregistered_thread_gets_a_final_drain_and_reclaim() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(RegistryConfig::default());
        let slot_index = registry.register(5).unwrap().slot_index();
        {
            let slot = registry.iterate_active().next().unwrap();
            for i in 0..4u64 {
                slot.index_lane.record(index_record(i, 5));
            }
        }
        let slot_ref = registry.iterate_active().find(|s| s.slot_index() == slot_index).unwrap();
        registry.unregister(slot_ref);

        let mut scheduler = DrainScheduler::new(DrainConfig::default(), dir.path().to_path_buf());
        let stats = scheduler.run_iteration(&registry, 1);
        assert_eq!(stats.threads_finalized, 1);
        assert_eq!(registry.thread_count(), 0);
    }

    #[test]
    fn fairer_scoring_prefers_heavier_pending_slot_first() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Registry::new(RegistryConfig::default());
        registry.register(1).unwrap();
        registry.register(2).unwrap();
        let slots: Vec<_> = registry.iterate_active().collect();
        for i in 0..12u64 {
            slots[0].index_lane.record(index_record(i, 1));
        }
        slots[1].index_lane.record(index_record(0, 2));

        let mut scheduler = DrainScheduler::new(DrainConfig::default(), dir.path().to_path_buf());
        let picked = scheduler.select_slot(&registry).unwrap();
        assert_eq!(picked.thread_id(), 1);
    }
}
