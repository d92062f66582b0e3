use std::path::PathBuf;
use thiserror::Error;

use crate::dataset::CombineReport;

/// The main error type for berryscan operations.
#[derive(Debug, Error)]
pub enum BerryscanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse dataset manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to write dataset manifest {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Class '{name}' not found in merged manifest")]
    ClassNotInManifest { name: String },

    #[error("Failed to parse label file {path} at line {line}: {message}")]
    LabelParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Label file {path} line {line}: class index {class_id} has no mapping")]
    LabelClassOutOfDomain {
        path: PathBuf,
        line: usize,
        class_id: usize,
    },

    #[error("File already exists: {path}")]
    FileAlreadyExists { path: PathBuf },

    #[error("Invalid dataset layout at {path}: {message}")]
    DatasetLayoutInvalid { path: PathBuf, message: String },

    #[error("Failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write image {path}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Detector '{detector}' failed: {message}")]
    DetectorFailed { detector: String, message: String },

    #[error("Detector '{detector}' produced unreadable output: {source}")]
    DetectorOutputParse {
        detector: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse pipeline config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid pipeline config: {message}")]
    ConfigInvalid { message: String },

    #[error("Failed to write CSV summary {path}: {source}")]
    CsvWrite {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Dataset combine finished with {failed_splits} failed split(s) and {failed_files} failed file(s)")]
    CombineIncomplete {
        failed_splits: usize,
        failed_files: usize,
        report: CombineReport,
    },

    #[error("Prediction failed for {failed} of {total} image(s)")]
    BatchIncomplete { failed: usize, total: usize },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}
