use tracecore_ring::{DetailRecordHeader, DetailSlot, IndexRecord, DETAIL_SEQ_NONE};
use tracecore_writer::{read_index_file, Manifest, MarkingPolicyManifest, ModuleEntry, ThreadTraceWriter, DropCounters};

#[test]
fn index_and_detail_files_survive_a_full_session_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = ThreadTraceWriter::open(dir.path(), 11).unwrap();

    let mut next_detail_seq = 0u32;
    for i in 0..8u64 {
        let detail_seq = if i % 2 == 0 {
            let seq = next_detail_seq;
            next_detail_seq += 1;
            seq
        } else {
            DETAIL_SEQ_NONE
        };
        writer
            .append_index(&[IndexRecord {
                timestamp_ns: 1000 + i,
                function_id: i,
                thread_id: 11,
                event_kind: 1,
                call_depth: (i % 3) as u32,
                detail_seq,
            }])
            .unwrap();
        if detail_seq != DETAIL_SEQ_NONE {
            let header = DetailRecordHeader {
                total_length: 0,
                event_type: 1,
                flags: 0,
                index_seq: i as u32,
                thread_id: 11,
                timestamp_ns: 1000 + i,
            };
            writer.append_detail(&[DetailSlot::new(header, b"abc")]).unwrap();
        }
    }
    writer.finalize().unwrap();

    let recovered = read_index_file(&dir.path().join("index.atf")).unwrap();
    assert!(recovered.footer_valid);
    assert_eq!(recovered.records.len(), 8);
    assert_eq!(recovered.header.thread_id, 11);

    let manifest = Manifest {
        session_id: "sess-xyz".into(),
        pid: 1,
        os: "linux".into(),
        arch: "x86_64".into(),
        time_start_ns: 1000,
        time_end_ns: 1007,
        threads: vec![11],
        modules: vec![ModuleEntry { id: 0, uuid: "mod-a".into() }],
        event_count_total: 8,
        marking_policy: MarkingPolicyManifest { rules: vec![], pre_roll_ns: 0, post_roll_ns: 0 },
        drop_counters: DropCounters { index_pool_exhausted: 0, detail_pool_exhausted: 0 },
    };
    manifest.write_atomic(dir.path()).unwrap();
    let back = Manifest::read(&dir.path().join("manifest.json")).unwrap();
    assert_eq!(back.event_count_total, 8);
}

#[test]
fn finalizing_twice_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = ThreadTraceWriter::open(dir.path(), 1).unwrap();
    writer.finalize().unwrap();
    assert!(writer.finalize().is_err());
}
