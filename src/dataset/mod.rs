//! Dataset label unification.
//!
//! Merges one YOLO dataset into another so that both share a single class
//! index space:
//!
//! 1. [`merge_class_names`] unions the two `names` lists, comparing names by
//!    [`normalize_name`] and keeping the target's order as a prefix.
//! 2. [`index_mapping`] maps every source index onto the merged list.
//! 3. [`move_pair`] moves each image and label across, rewriting the label's
//!    class indices through that mapping.
//!
//! [`combine_dataset`] runs the whole procedure split by split.

mod fsutil;
pub mod label;
mod manifest;
mod mover;
mod normalize;
mod relabel;
mod report;

pub use label::{LabelRecord, RemapPolicy, RemapStats};
#[cfg(feature = "fuzzing")]
pub use manifest::fuzz_parse_manifest;
pub use manifest::{
    index_mapping, merge_class_names, DatasetManifest, IndexMapping, ManifestMerge, MANIFEST_FILE,
};
pub use mover::{
    combine_dataset, merge_manifests, move_image, move_pair, preview_merge, MovedPair, Split,
};
pub use normalize::{normalize_name, same_class};
pub use relabel::{parse_mapping_pairs, relabel_dataset};
pub use report::{CombineReport, FileFailure, RelabelReport, SplitReport, SplitStatus};
