#![no_main]

use fixlag_core::{ReconstructOptions, load_snapshots, reconstruct_loaded};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(load) = load_snapshots(text) else {
        return;
    };
    let result = reconstruct_loaded(&load, &ReconstructOptions { parallel: false });
    for record in &result.records {
        assert!(record.fix_duration.is_none_or(|days| days >= 0));
    }
});
