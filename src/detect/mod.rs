//! Detectors and what is done with their output.
//!
//! Models are black boxes behind the [`Detector`] trait. The production
//! implementation, [`ExternalDetector`], runs a configured command per image;
//! tests and embedders supply their own.

mod annotate;
mod detection;
mod external;

pub use annotate::{
    class_color, draw_detections, label_text, load_font, system_font, AnnotationStyle, Annotator,
};
pub use detection::{class_name_for, detect_filtered, Detection, Detector, RawDetection};
pub use external::{parse_detector_output, ExternalDetector};
