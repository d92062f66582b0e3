//! The two detector roles of the pipeline.
//!
//! Both wrap a borrowed [`Detector`] with the confidence threshold configured
//! for that role. The same model may serve in either role.

use image::RgbImage;

use crate::detect::{detect_filtered, Detection, Detector};
use crate::error::BerryscanError;

/// Finds regions of interest (plant parts) in a full image.
#[derive(Clone, Copy)]
pub struct RegionDetector<'d> {
    detector: &'d dyn Detector,
    threshold: f64,
}

impl<'d> RegionDetector<'d> {
    pub fn new(detector: &'d dyn Detector, threshold: f64) -> Self {
        Self {
            detector,
            threshold,
        }
    }

    pub fn name(&self) -> &str {
        self.detector.name()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Region proposals with `confidence >= threshold`, in model order.
    pub fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>, BerryscanError> {
        detect_filtered(self.detector, image, self.threshold)
    }
}

/// Finds disease markers, either inside a region crop or on a full image.
#[derive(Clone, Copy)]
pub struct RegionClassifier<'d> {
    detector: &'d dyn Detector,
    threshold: f64,
}

impl<'d> RegionClassifier<'d> {
    pub fn new(detector: &'d dyn Detector, threshold: f64) -> Self {
        Self {
            detector,
            threshold,
        }
    }

    pub fn name(&self) -> &str {
        self.detector.name()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Disease detections with `confidence >= threshold`; boxes are in the
    /// pixel space of `image`.
    pub fn classify(&self, image: &RgbImage) -> Result<Vec<Detection>, BerryscanError> {
        detect_filtered(self.detector, image, self.threshold)
    }
}
