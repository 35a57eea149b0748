use tempfile::tempdir;
use tracecore_arena::{Arena, ArenaError, CONTROL_HEADER_SIZE};

#[test]
fn create_rejects_undersized_arenas() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tiny.bin");
    let err = Arena::create(&path, 4).unwrap_err();
    assert!(matches!(err, ArenaError::TooSmall { .. }));
}

#[test]
fn header_round_trips_registry_and_rings_offsets() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("arena.bin");
    let arena = Arena::create(&path, 8192).unwrap();
    let header = arena.header();
    assert_eq!(header.registry_offset, CONTROL_HEADER_SIZE as u64);
    assert_eq!(header.arena_size, 8192);
}
