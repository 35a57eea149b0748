use std::sync::Arc;
use std::time::Duration;
use tracecore_collector::{Session, TraceConfig, TriggerSpec};
use tracecore_ring::EventKind;
use tracecore_writer::read_index_file;

/// S1-style scenario at reduced scale: several threads record steadily,
/// one thread's events occasionally trip the exception rule, and the
/// session finalizes to a readable, checksum-valid trace on disk.
#[test]
fn multi_thread_session_produces_valid_trace_files() {
    let dir = tempfile::tempdir().unwrap();
    let config = TraceConfig {
        stack_bytes: 32,
        trigger_kinds: vec![TriggerSpec::Exception],
        ring_capacity_records: 1 << 4,
        ring_pool_size_per_lane: 3,
        iteration_interval: Duration::from_millis(1),
        session_root: dir.path().to_path_buf(),
        ..TraceConfig::default()
    };

    let session = Arc::new(Session::start(config).unwrap());
    let mut handles = Vec::new();
    for t in 0..4 {
        let session = Arc::clone(&session);
        handles.push(std::thread::spawn(move || {
            let hook = session.hook_for_this_thread().unwrap();
            for i in 0..200u64 {
                let kind = if t == 0 && i == 150 { EventKind::Exception } else { EventKind::Call };
                hook.record_index_event(t * 1000 + i, kind, 0, None, Some(b"stk"));
            }
            session.unregister_this_thread();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(session.registry().thread_count(), 0);

    let session = Arc::try_unwrap(session).ok().unwrap();
    session.finalize().unwrap();

    // Final drain flushes each thread's still-active ring, so no thread's
    // tail of events is lost just because it never filled a ring. Producers
    // can still outrun the drain thread's 1ms iteration granularity mid-run
    // and exhaust the pool (every spare ring already in flight), which is a
    // separate, accepted lossy path; this asserts the trace is well-formed
    // and non-trivial, not an exact event count.
    let mut total_records = 0usize;
    let mut thread_dirs_seen = 0usize;
    for entry in std::fs::read_dir(dir.path()).unwrap() {
        let entry = entry.unwrap();
        let index_path = entry.path().join("index.atf");
        if index_path.exists() {
            thread_dirs_seen += 1;
            let recovered = read_index_file(&index_path).unwrap();
            assert!(recovered.footer_valid);
            total_records += recovered.records.len();
        }
    }
    assert_eq!(thread_dirs_seen, 4);
    assert!(total_records > 0 && total_records <= 800, "total_records={total_records}");
}

/// S-scenario: a session with no trigger rules configured never arms its
/// detail lanes, so detail files are never created even when every event
/// carries a stack snapshot.
#[test]
fn unmarked_detail_lane_stays_a_pure_flight_recorder() {
    let dir = tempfile::tempdir().unwrap();
    let config = TraceConfig {
        stack_bytes: 16,
        trigger_kinds: vec![],
        ring_capacity_records: 1 << 3,
        ring_pool_size_per_lane: 2,
        iteration_interval: Duration::from_millis(1),
        session_root: dir.path().to_path_buf(),
        ..TraceConfig::default()
    };

    let session = Session::start(config).unwrap();
    let hook = session.hook_for_this_thread().unwrap();
    for i in 0..64u64 {
        hook.record_index_event(i, EventKind::Call, 0, None, Some(b"xyz"));
    }
    session.unregister_this_thread();
    std::thread::sleep(Duration::from_millis(50));
    session.finalize().unwrap();

    let mut saw_index = false;
    for entry in std::fs::read_dir(dir.path()).unwrap() {
        let entry = entry.unwrap();
        if entry.path().join("index.atf").exists() {
            saw_index = true;
            assert!(!entry.path().join("detail.atf").exists());
        }
    }
    assert!(saw_index);
}
