//! Folder batch report and its CSV summary.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::predict::PipelineOutcome;
use super::runner::DetectionMode;
use crate::error::BerryscanError;

/// Outcome of predicting a folder of images.
#[derive(Clone, Debug, Serialize)]
pub struct BatchReport {
    pub input: PathBuf,
    pub mode: DetectionMode,
    pub images: Vec<ImageOutcome>,
}

/// Outcome for one image of a batch.
#[derive(Clone, Debug, Serialize)]
pub struct ImageOutcome {
    /// Path relative to the batch input directory.
    pub image: String,
    pub output_dir: PathBuf,
    #[serde(flatten)]
    pub outcome: PipelineOutcome,
}

/// One line of the CSV summary.
#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    image: &'a str,
    record: Option<usize>,
    primary_class: &'a str,
    primary_confidence: Option<f64>,
    diseases: String,
    crop_reference: &'a str,
    error: &'a str,
}

impl BatchReport {
    pub fn new(input: impl Into<PathBuf>, mode: DetectionMode) -> Self {
        Self {
            input: input.into(),
            mode,
            images: Vec::new(),
        }
    }

    pub fn total(&self) -> usize {
        self.images.len()
    }

    pub fn failed_count(&self) -> usize {
        self.images.iter().filter(|i| !i.outcome.is_success()).count()
    }

    pub fn prediction_count(&self) -> usize {
        self.images
            .iter()
            .filter_map(|i| i.outcome.predictions())
            .map(<[_]>::len)
            .sum()
    }

    pub fn is_complete(&self) -> bool {
        self.failed_count() == 0
    }

    /// Writes the summary CSV: one row per prediction, one row per failed
    /// image.
    pub fn write_csv_summary(&self, path: &Path) -> Result<(), BerryscanError> {
        let file = File::create(path).map_err(BerryscanError::Io)?;
        let mut csv_writer = csv::Writer::from_writer(BufWriter::new(file));
        for row in self.summary_rows() {
            csv_writer
                .serialize(&row)
                .map_err(|source| BerryscanError::CsvWrite {
                    path: path.to_path_buf(),
                    source,
                })?;
        }

        csv_writer
            .into_inner()
            .map_err(|e| BerryscanError::Io(e.into_error()))?
            .flush()
            .map_err(BerryscanError::Io)?;

        Ok(())
    }

    fn summary_rows(&self) -> Vec<SummaryRow<'_>> {
        let mut rows = Vec::new();
        for entry in &self.images {
            match &entry.outcome {
                PipelineOutcome::Success(predictions) => {
                    for (index, record) in predictions.iter().enumerate() {
                        let diseases = record
                            .secondary_detections
                            .iter()
                            .map(|d| format!("{}:{:.3}", d.disease, d.confidence))
                            .collect::<Vec<_>>()
                            .join(";");
                        rows.push(SummaryRow {
                            image: &entry.image,
                            record: Some(index + 1),
                            primary_class: &record.primary_detection.class_name,
                            primary_confidence: Some(record.primary_detection.confidence),
                            diseases,
                            crop_reference: &record.crop_reference,
                            error: "",
                        });
                    }
                }
                PipelineOutcome::Error(message) => rows.push(SummaryRow {
                    image: &entry.image,
                    record: None,
                    primary_class: "",
                    primary_confidence: None,
                    diseases: String::new(),
                    crop_reference: "",
                    error: message,
                }),
            }
        }
        rows
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Predicted {} image(s) from {} ({})",
            self.total(),
            self.input.display(),
            self.mode
        )?;
        for entry in &self.images {
            match &entry.outcome {
                PipelineOutcome::Success(predictions) => {
                    writeln!(f, "  {}: {} prediction(s)", entry.image, predictions.len())?
                }
                PipelineOutcome::Error(message) => {
                    writeln!(f, "  {}: ERROR {}", entry.image, message)?
                }
            }
        }
        writeln!(
            f,
            "{} prediction(s), {} failed image(s)",
            self.prediction_count(),
            self.failed_count()
        )
    }
}
