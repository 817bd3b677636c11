//! Fuzz target: `PhaseSnapshot::load`
//!
//! Arbitrary bytes in the snapshot slot must either decode to a plausible
//! snapshot or be discarded; never a panic.
//!
//! cargo fuzz run fuzz_snapshot

#![no_main]

use libfuzzer_sys::fuzz_target;
use trafficpilot::adapters::memory_store::MemoryStore;
use trafficpilot::app::ports::StoragePort;
use trafficpilot::app::snapshot::{PhaseSnapshot, SNAPSHOT_KEY, SNAPSHOT_NAMESPACE};

fuzz_target!(|data: &[u8]| {
    let mut store = MemoryStore::new();
    if store.write(SNAPSHOT_NAMESPACE, SNAPSHOT_KEY, data).is_err() {
        return;
    }
    if let Ok(Some(snapshot)) = PhaseSnapshot::load(&store) {
        assert!(snapshot.is_plausible());
    }
});
