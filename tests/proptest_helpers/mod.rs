#![allow(dead_code)]

use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// Class names in the styles seen across exported datasets: mixed case,
/// spaces, hyphens and underscores.
pub fn arb_class_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z _-]{0,11}"
}

pub fn arb_class_list(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(arb_class_name(), 0..=max)
}

/// A YOLO geometry token as exporters write it.
pub fn arb_coord_token() -> impl Strategy<Value = String> {
    (0u32..=1_000_000u32, 0usize..=6).prop_map(|(v, decimals)| {
        format!("{:.*}", decimals, f64::from(v) / 1_000_000.0)
    })
}

/// One label line with a class index below `classes` and 4 to 12 geometry
/// tokens (boxes and polygons).
pub fn arb_label_line(classes: usize) -> impl Strategy<Value = (usize, Vec<String>)> {
    (
        0..classes.max(1),
        prop::collection::vec(arb_coord_token(), 4..=12),
    )
}

pub fn arb_box() -> impl Strategy<Value = [f64; 4]> {
    prop::array::uniform4(-200.0f64..900.0)
}
