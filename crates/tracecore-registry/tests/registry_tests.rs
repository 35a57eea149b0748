use std::sync::Arc;
use std::thread;
use tracecore_registry::{Registry, RegistryConfig};

#[test]
fn concurrent_registration_never_double_assigns_a_slot() {
    let registry = Arc::new(Registry::new(RegistryConfig::default()));
    let mut handles = Vec::new();

    for t in 0..16u32 {
        let registry = Arc::clone(&registry);
        handles.push(thread::spawn(move || {
            let slot = registry.register(t).unwrap();
            slot.slot_index()
        }));
    }

    let mut slot_indices: Vec<u32> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    slot_indices.sort_unstable();
    slot_indices.dedup();
    assert_eq!(slot_indices.len(), 16);
    assert_eq!(registry.thread_count(), 16);
}
