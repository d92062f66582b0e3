//! Two-stage region-then-disease inference.
//!
//! In part-first mode a locator model proposes regions (plant parts) on the
//! full image. Each region is clipped and cropped, a classifier model looks
//! for disease inside the crop, and the crop (annotated when anything was
//! found) is pasted back at its original location. Direct mode skips the
//! locator and runs the classifier on the full image.
//!
//! ```no_run
//! use std::path::Path;
//! use berryscan::detect::{Annotator, Detector};
//! use berryscan::pipeline::{
//!     process_image, DetectionMode, OutputOptions, RegionClassifier, RegionDetector,
//!     TwoStagePipeline,
//! };
//!
//! # fn demo(parts: &dyn Detector, disease: &dyn Detector) {
//! let pipeline = TwoStagePipeline::new(
//!     Some(RegionDetector::new(parts, 0.1)),
//!     RegionClassifier::new(disease, 0.1),
//!     Annotator::default(),
//! );
//! let outcome = process_image(
//!     &pipeline,
//!     DetectionMode::PartFirst,
//!     Path::new("leaf.jpg"),
//!     &OutputOptions::new("out"),
//! );
//! println!("{}", serde_json::to_string(&outcome).unwrap());
//! # }
//! ```

mod composite;
mod crop;
mod predict;
mod report;
mod runner;
mod stage;

pub use composite::{composite_region, composite_regions};
pub use crop::{extract_region, RegionCrop};
pub use predict::{
    assemble_direct, assemble_part_first, PipelineOutcome, PredictionRecord, RegionFinding,
    SecondaryDetection,
};
pub use report::{BatchReport, ImageOutcome};
pub use runner::{
    crop_reference, predict_image, process_folder, process_image, ClassifiedRegion, DetectionMode,
    DirectRun, OutputOptions, PartFirstRun, TwoStagePipeline,
};
pub use stage::{RegionClassifier, RegionDetector};
