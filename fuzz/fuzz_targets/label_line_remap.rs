//! Fuzz target for YOLO label text remapping.
//!
//! Feeds arbitrary UTF-8 label text through the strict remapper, checking
//! for panics, crashes, or hangs.

#![no_main]

use berryscan::dataset::label::fuzz_remap_label_line;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let _ = fuzz_remap_label_line(text);
});
