//! Pipeline configuration file.
//!
//! ```yaml
//! locator:
//!   name: strawberry_part_detection
//!   command: python
//!   args: ["scripts/yolo_detect.py", "--weights", "{model}", "--source", "{image}"]
//!   model: models/strawberry_part_detection.pt
//!   manifest: datasets/parts/data.yaml
//!   confidence: 0.1
//! classifier:
//!   name: best_strawberry_disease_model
//!   command: python
//!   args: ["scripts/yolo_detect.py", "--weights", "{model}", "--source", "{image}"]
//!   model: models/best_strawberry_disease_model.pt
//!   names: [Angular Leafspot, Anthracnose Fruit Rot, Gray Mold, Leaf Spot, Powdery Mildew Leaf]
//! annotation:
//!   line_width: 4
//!   font_size: 10
//! output:
//!   crop_url_root: public
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dataset::DatasetManifest;
use crate::detect::AnnotationStyle;
use crate::error::BerryscanError;

/// Confidence threshold used when a model entry does not set one.
pub const DEFAULT_CONFIDENCE: f64 = 0.1;

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

/// Everything needed to run the two-stage pipeline.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Region detector; only needed for part-first mode.
    #[serde(default)]
    pub locator: Option<ModelSpec>,
    pub classifier: ModelSpec,
    #[serde(default)]
    pub annotation: AnnotationStyle,
    #[serde(default)]
    pub output: OutputConfig,
}

/// How to invoke one detection model.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub model: Option<PathBuf>,
    /// Class names in index order.
    #[serde(default)]
    pub names: Option<Vec<String>>,
    /// A `data.yaml` to take class names from instead of `names`.
    #[serde(default)]
    pub manifest: Option<PathBuf>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

impl ModelSpec {
    /// The configured name, else the model file stem, else the command.
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        self.model
            .as_deref()
            .and_then(Path::file_stem)
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.command.clone())
    }

    /// Class names from `names` or from `manifest`.
    pub fn resolve_names(&self) -> Result<Vec<String>, BerryscanError> {
        match (&self.names, &self.manifest) {
            (Some(names), None) => Ok(names.clone()),
            (None, Some(manifest)) => Ok(DatasetManifest::read(manifest)?.names),
            (None, None) => Err(BerryscanError::ConfigInvalid {
                message: format!(
                    "model '{}' needs either `names` or `manifest`",
                    self.display_name()
                ),
            }),
            (Some(_), Some(_)) => Err(BerryscanError::ConfigInvalid {
                message: format!(
                    "model '{}' sets both `names` and `manifest`",
                    self.display_name()
                ),
            }),
        }
    }

    fn resolve_paths(&mut self, base: &Path) {
        if let Some(model) = &self.model {
            self.model = Some(resolve(base, model));
        }
        if let Some(manifest) = &self.manifest {
            self.manifest = Some(resolve(base, manifest));
        }
        // Bare program names are looked up on PATH; only explicit paths move.
        if Path::new(&self.command).components().count() > 1 {
            self.command = resolve(base, Path::new(&self.command))
                .to_string_lossy()
                .into_owned();
        }
    }

    fn validate(&self, role: &str) -> Result<(), BerryscanError> {
        validate_threshold(&format!("{role}.confidence"), self.confidence)?;
        if self.command.trim().is_empty() {
            return Err(BerryscanError::ConfigInvalid {
                message: format!("{role}.command must not be empty"),
            });
        }
        Ok(())
    }
}

/// Where outputs go and how crops are referenced.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Crops under this directory are referenced as `/`-rooted URLs relative
    /// to it (for serving from a web root).
    #[serde(default)]
    pub crop_url_root: Option<PathBuf>,
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Checks that a confidence threshold lies in `[0, 1]`.
pub fn validate_threshold(field: &str, value: f64) -> Result<(), BerryscanError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(BerryscanError::ConfigInvalid {
            message: format!("{field} must be in [0, 1], got {value}"),
        })
    }
}

impl PipelineConfig {
    /// Parses a config from YAML text; `path` is only used in errors.
    pub fn from_yaml_str(yaml: &str, path: &Path) -> Result<Self, BerryscanError> {
        serde_yaml::from_str(yaml).map_err(|source| BerryscanError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads, resolves and validates the config file at `path`.
    pub fn from_yaml_file(path: &Path) -> Result<Self, BerryscanError> {
        let yaml = fs::read_to_string(path).map_err(BerryscanError::Io)?;
        let mut config = Self::from_yaml_str(&yaml, path)?;
        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    /// Makes every relative path in the config relative to `base` instead.
    pub fn resolve_paths(&mut self, base: &Path) {
        if let Some(locator) = &mut self.locator {
            locator.resolve_paths(base);
        }
        self.classifier.resolve_paths(base);
        if let Some(root) = &self.output.crop_url_root {
            self.output.crop_url_root = Some(resolve(base, root));
        }
        if let Some(font) = &self.annotation.font {
            self.annotation.font = Some(resolve(base, font));
        }
    }

    pub fn validate(&self) -> Result<(), BerryscanError> {
        if let Some(locator) = &self.locator {
            locator.validate("locator")?;
        }
        self.classifier.validate("classifier")?;
        if self.annotation.line_width == 0 {
            return Err(BerryscanError::ConfigInvalid {
                message: "annotation.line_width must be at least 1".to_string(),
            });
        }
        let font_size = self.annotation.font_size;
        if !font_size.is_finite() || font_size < 1.0 {
            return Err(BerryscanError::ConfigInvalid {
                message: format!("annotation.font_size must be at least 1, got {font_size}"),
            });
        }
        Ok(())
    }
}
