//! `Session`: owns one [`Registry`] and one or more [`DrainScheduler`]
//! threads, and is responsible for startup, the per-thread hook handshake,
//! and graceful shutdown.

use crate::config::TraceConfig;
use crate::error::SessionError;
use crate::hook::Hook;
use crate::policy::MarkingPolicy;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracecore_arena::clock::monotonic_now_ns;
use tracecore_drain::DrainScheduler;
use tracecore_registry::Registry;

thread_local! {
    static THIS_THREAD_ID: u32 = next_thread_id();
}

fn next_thread_id() -> u32 {
    static COUNTER: AtomicU32 = AtomicU32::new(1);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

fn current_thread_id() -> u32 {
    THIS_THREAD_ID.with(|id| *id)
}

/// A running trace session: registry, drain thread(s), and the shared
/// marking policy every [`Hook`] consults.
pub struct Session {
    registry: Arc<Registry>,
    policy: Arc<MarkingPolicy>,
    config: TraceConfig,
    stop: Arc<AtomicBool>,
    drain_handle: Option<JoinHandle<DrainScheduler>>,
    started_ns: u64,
}

impl Session {
    /// Validates `config`, stands up the registry, and starts the drain
    /// thread. Startup is synchronous and effectively instantaneous in this
    /// implementation, but `config.startup_timeout` is still validated so a
    /// future out-of-process arena handshake has somewhere to plug in.
    pub fn start(config: TraceConfig) -> Result<Self, SessionError> {
        config.validate()?;
        std::fs::create_dir_all(&config.session_root)?;

        let registry = Arc::new(Registry::new(config.registry_config()));
        let policy = Arc::new(MarkingPolicy::compile(&config.trigger_kinds));
        let stop = Arc::new(AtomicBool::new(false));

        let scheduler = DrainScheduler::new(config.drain_config(), config.session_root.clone());
        let drain_handle = scheduler.spawn(Arc::clone(&registry), Arc::clone(&stop));

        tracing::info!(session_root = %config.session_root.display(), "trace session started");

        Ok(Self {
            registry,
            policy,
            config,
            stop,
            drain_handle: Some(drain_handle),
            started_ns: monotonic_now_ns(),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn started_ns(&self) -> u64 {
        self.started_ns
    }

    /// Registers the calling thread on first use (idempotent afterward via
    /// the registry's thread-local fast path) and returns a hook bound to
    /// its lane set.
    pub fn hook_for_this_thread(&self) -> Result<Hook<'_>, SessionError> {
        let slot = match self.registry.lookup_fast() {
            Some(slot) => slot,
            None => self.registry.register(current_thread_id())?,
        };
        Ok(Hook::new(slot, &self.policy, self.config.stack_bytes))
    }

    /// Marks the calling thread's slot inactive. The drainer performs one
    /// final drain and reclaims the slot on its next iteration.
    pub fn unregister_this_thread(&self) {
        if let Some(slot) = self.registry.lookup_fast() {
            self.registry.unregister(slot);
        }
    }

    pub fn drain_heartbeat_ns(&self) -> u64 {
        self.registry.drain_heartbeat_ns()
    }

    /// Signals the drain thread to stop and waits for it to finish its
    /// current iteration and finalize any still-open writers.
    pub fn finalize(mut self) -> Result<(), SessionError> {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.drain_handle.take() {
            let _ = handle.join();
        }
        tracing::info!("trace session finalized");
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.drain_handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracecore_ring::EventKind;

    #[test]
    fn start_then_finalize_round_trips_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TraceConfig::default();
        config.session_root = dir.path().to_path_buf();
        config.iteration_interval = std::time::Duration::from_millis(1);

        let session = Session::start(config).unwrap();
        let hook = session.hook_for_this_thread().unwrap();
        for i in 0..4u64 {
            hook.record_index_event(i, EventKind::Call, 0, None, None);
        }
        session.unregister_this_thread();
        std::thread::sleep(std::time::Duration::from_millis(20));
        session.finalize().unwrap();
    }
}
