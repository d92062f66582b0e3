//! Prediction records and the overall outcome of one pipeline run.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::detect::Detection;
use crate::error::BerryscanError;
use crate::geometry::PixelRect;

/// A disease found inside a region.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SecondaryDetection {
    pub disease: String,
    pub confidence: f64,
}

impl From<&Detection> for SecondaryDetection {
    fn from(detection: &Detection) -> Self {
        Self {
            disease: detection.class_name.clone(),
            confidence: detection.confidence,
        }
    }
}

/// One entry of the prediction list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PredictionRecord {
    pub primary_detection: Detection,
    /// The clipped region the classifier saw; part-first mode only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<PixelRect>,
    pub secondary_detections: Vec<SecondaryDetection>,
    /// Where the region crop was saved; empty in direct mode.
    pub crop_reference: String,
}

/// Everything learned about one region in part-first mode.
#[derive(Clone, Debug)]
pub struct RegionFinding {
    pub primary: Detection,
    pub rect: PixelRect,
    pub diseases: Vec<Detection>,
    pub crop_reference: String,
}

/// One record per region, in region order.
pub fn assemble_part_first(findings: Vec<RegionFinding>) -> Vec<PredictionRecord> {
    findings
        .into_iter()
        .map(|finding| PredictionRecord {
            secondary_detections: finding.diseases.iter().map(SecondaryDetection::from).collect(),
            primary_detection: finding.primary,
            region: Some(finding.rect),
            crop_reference: finding.crop_reference,
        })
        .collect()
}

/// One record per detection; each record lists its own detection as the
/// single secondary detection.
pub fn assemble_direct(detections: &[Detection]) -> Vec<PredictionRecord> {
    detections
        .iter()
        .map(|detection| PredictionRecord {
            primary_detection: detection.clone(),
            region: None,
            secondary_detections: vec![SecondaryDetection::from(detection)],
            crop_reference: String::new(),
        })
        .collect()
}

/// Result of running the pipeline on one image.
///
/// Serializes as `{"success": true, "predictions": [...]}` or
/// `{"error": "..."}`.
#[derive(Clone, Debug, PartialEq)]
pub enum PipelineOutcome {
    Success(Vec<PredictionRecord>),
    Error(String),
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn predictions(&self) -> Option<&[PredictionRecord]> {
        match self {
            Self::Success(predictions) => Some(predictions),
            Self::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Error(message) => Some(message),
        }
    }
}

impl From<Result<Vec<PredictionRecord>, BerryscanError>> for PipelineOutcome {
    fn from(result: Result<Vec<PredictionRecord>, BerryscanError>) -> Self {
        match result {
            Ok(predictions) => Self::Success(predictions),
            Err(err) => Self::Error(err.to_string()),
        }
    }
}

impl Serialize for PipelineOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Success(predictions) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("success", &true)?;
                map.serialize_entry("predictions", predictions)?;
                map.end()
            }
            Self::Error(message) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", message)?;
                map.end()
            }
        }
    }
}
