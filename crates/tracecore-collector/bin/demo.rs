//! End-to-end demonstration: several worker threads call into a shared
//! `Session`, an exception-triggering rule arms selective detail capture on
//! one of them, and the drain thread writes everything to disk.
//!
//! ```bash
//! cargo run -p tracecore-collector --bin demo --release
//! ```

use std::sync::Arc;
use std::time::Duration;
use tracecore_collector::{Session, TraceConfig, TriggerSpec};
use tracecore_ring::EventKind;
use tracecore_writer::{read_index_file, Manifest, MarkingPolicyManifest, ModuleEntry, DropCounters};

const WORKER_COUNT: usize = 6;
const CALLS_PER_WORKER: u64 = 2_000;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::try_init().ok();

    let session_root = std::env::temp_dir().join(format!("tracecore-demo-{}", std::process::id()));

    let config = TraceConfig {
        stack_bytes: 64,
        trigger_kinds: vec![TriggerSpec::Exception, TriggerSpec::Symbol { function_id: 99 }],
        ring_capacity_records: 1 << 8,
        ring_pool_size_per_lane: 3,
        iteration_interval: Duration::from_millis(2),
        session_root: session_root.clone(),
        ..TraceConfig::default()
    };

    println!("tracecore demo: {WORKER_COUNT} workers x {CALLS_PER_WORKER} calls each");
    println!("session root: {}", session_root.display());

    let session = Arc::new(Session::start(config)?);

    let mut handles = Vec::new();
    for worker_id in 0..WORKER_COUNT {
        let session = Arc::clone(&session);
        handles.push(std::thread::spawn(move || run_worker(worker_id, &session)));
    }
    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    // give the drain thread a few more iterations to catch up before final
    // drain on deregistration.
    std::thread::sleep(Duration::from_millis(50));

    let manifest = Manifest {
        session_id: format!("demo-{}", std::process::id()),
        pid: std::process::id(),
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        time_start_ns: session.started_ns(),
        time_end_ns: tracecore_arena::clock::monotonic_now_ns(),
        threads: (0..WORKER_COUNT as u32).collect(),
        modules: vec![ModuleEntry { id: 0, uuid: "demo-module".into() }],
        event_count_total: WORKER_COUNT as u64 * CALLS_PER_WORKER,
        marking_policy: MarkingPolicyManifest {
            rules: vec!["exception".into(), "symbol(99)".into()],
            pre_roll_ns: 0,
            post_roll_ns: 0,
        },
        drop_counters: DropCounters { index_pool_exhausted: 0, detail_pool_exhausted: 0 },
    };
    manifest.write_atomic(&session_root)?;

    let heartbeat = session.drain_heartbeat_ns();
    Arc::try_unwrap(session).ok().expect("workers joined, no outstanding refs").finalize()?;

    println!("drain heartbeat at last sample: {heartbeat} ns");
    for entry in std::fs::read_dir(&session_root)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with("thread-") {
            let index_path = entry.path().join("index.atf");
            if index_path.exists() {
                let recovered = read_index_file(&index_path)?;
                println!(
                    "{}: {} index records, footer_valid={}",
                    entry.path().display(),
                    recovered.records.len(),
                    recovered.footer_valid
                );
            }
        }
    }

    Ok(())
}

fn run_worker(worker_id: usize, session: &Session) {
    let hook = session.hook_for_this_thread().expect("thread registration failed");
    for i in 0..CALLS_PER_WORKER {
        let function_id = (worker_id as u64) * 1000 + (i % 50);
        let kind = if i % 777 == 776 { EventKind::Exception } else { EventKind::Call };
        let stack = [worker_id as u8, (i & 0xff) as u8, ((i >> 8) & 0xff) as u8];
        hook.record_index_event(function_id, kind, (i % 8) as u32, None, Some(&stack));
    }
    session.unregister_this_thread();
}
