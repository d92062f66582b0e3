//! Detection records and the detector seam.

use image::RgbImage;
use serde::Serialize;

use crate::error::BerryscanError;
use crate::geometry::{BBoxXYXY, Pixel};

/// One box as reported by a model, before thresholding and name lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct RawDetection {
    pub bbox: BBoxXYXY<Pixel>,
    pub class_id: usize,
    pub confidence: f64,
}

/// A thresholded detection with its class name resolved.
///
/// `bbox` is in pixels of the image the detector was given; for a classifier
/// running on a crop that is the crop, not the full image.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub bbox: BBoxXYXY<Pixel>,
    pub class_id: usize,
    pub class_name: String,
    pub confidence: f64,
}

/// An object detection model, treated as a black box.
///
/// Implementations must not keep per-call state: the pipeline calls `infer`
/// many times with one handle and expects the same answer for the same image.
pub trait Detector {
    /// Short name used in logs and output file names.
    fn name(&self) -> &str;

    /// Class names indexed by class id.
    fn class_names(&self) -> &[String];

    /// Runs the model on `image`.
    fn infer(&self, image: &RgbImage) -> Result<Vec<RawDetection>, BerryscanError>;
}

/// Name for `class_id`, or `class_<id>` when the model reports an id outside
/// its own name list.
pub fn class_name_for(names: &[String], class_id: usize) -> String {
    names
        .get(class_id)
        .cloned()
        .unwrap_or_else(|| format!("class_{class_id}"))
}

/// Runs `detector` and keeps detections with `confidence >= threshold`, in
/// the order the model returned them.
pub fn detect_filtered(
    detector: &dyn Detector,
    image: &RgbImage,
    threshold: f64,
) -> Result<Vec<Detection>, BerryscanError> {
    let names = detector.class_names();
    let detections = detector
        .infer(image)?
        .into_iter()
        .filter(|raw| raw.confidence >= threshold)
        .map(|raw| Detection {
            bbox: raw.bbox,
            class_id: raw.class_id,
            class_name: class_name_for(names, raw.class_id),
            confidence: raw.confidence,
        })
        .collect();
    Ok(detections)
}
