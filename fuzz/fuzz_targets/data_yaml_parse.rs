//! Fuzz target for `data.yaml` manifest parsing.

#![no_main]

use berryscan::dataset::fuzz_parse_manifest;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let Ok(yaml) = std::str::from_utf8(data) else {
        return;
    };

    let _ = fuzz_parse_manifest(yaml);
});
