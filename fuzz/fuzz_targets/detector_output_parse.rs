//! Fuzz target for the detection line printed by external model runners.

#![no_main]

use berryscan::detect::parse_detector_output;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 1024 * 1024 {
        return;
    }

    let Ok(stdout) = std::str::from_utf8(data) else {
        return;
    };

    let _ = parse_detector_output("fuzz", stdout, 640, 480);
});
