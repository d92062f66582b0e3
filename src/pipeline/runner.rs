//! Running the pipeline on images and writing its outputs.
//!
//! For an image `IMG_0042.jpg` in part-first mode with locator `parts` and
//! classifier `disease`, the output directory receives:
//!
//! ```text
//! IMG_0042_parts_disease_annotated.jpg
//! crops_parts_disease/crop_1.jpg
//! crops_parts_disease/crop_2.jpg
//! ```
//!
//! Direct mode writes only `IMG_0042_disease_annotated.jpg`.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::{ImageFormat, RgbImage};
use log::{debug, info, warn};
use serde::Serialize;

use super::composite::composite_regions;
use super::crop::{extract_region, RegionCrop};
use super::predict::{assemble_direct, assemble_part_first, PipelineOutcome, PredictionRecord, RegionFinding};
use super::report::{BatchReport, ImageOutcome};
use super::stage::{RegionClassifier, RegionDetector};
use crate::detect::{Annotator, Detection};
use crate::error::BerryscanError;
use crate::files::{collect_images, rel_string};

/// Which flow to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionMode {
    /// Locate plant parts, then look for disease inside each part.
    PartFirst,
    /// Look for disease on the full image.
    Direct,
}

impl DetectionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PartFirst => "part-first",
            Self::Direct => "direct",
        }
    }
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectionMode {
    type Err = BerryscanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "part-first" => Ok(Self::PartFirst),
            "direct" => Ok(Self::Direct),
            other => Err(BerryscanError::UnsupportedFormat(format!(
                "detection mode '{other}' (supported: part-first, direct)"
            ))),
        }
    }
}

/// One region after classification.
#[derive(Clone, Debug)]
pub struct ClassifiedRegion {
    pub crop: RegionCrop,
    pub diseases: Vec<Detection>,
    /// What was pasted back: the crop itself, or the crop with disease boxes.
    pub patch: RgbImage,
}

/// In-memory result of a part-first run.
#[derive(Clone, Debug)]
pub struct PartFirstRun {
    pub annotated: RgbImage,
    pub regions: Vec<ClassifiedRegion>,
}

/// In-memory result of a direct run.
#[derive(Clone, Debug)]
pub struct DirectRun {
    pub annotated: RgbImage,
    pub detections: Vec<Detection>,
}

/// A locator/classifier pair plus how to draw their findings.
pub struct TwoStagePipeline<'d> {
    locator: Option<RegionDetector<'d>>,
    classifier: RegionClassifier<'d>,
    annotator: Annotator,
}

impl<'d> TwoStagePipeline<'d> {
    pub fn new(
        locator: Option<RegionDetector<'d>>,
        classifier: RegionClassifier<'d>,
        annotator: Annotator,
    ) -> Self {
        Self {
            locator,
            classifier,
            annotator,
        }
    }

    pub fn classifier(&self) -> &RegionClassifier<'d> {
        &self.classifier
    }

    /// The locator, which part-first mode cannot run without.
    pub fn locator(&self) -> Result<&RegionDetector<'d>, BerryscanError> {
        self.locator.as_ref().ok_or_else(|| BerryscanError::ConfigInvalid {
            message: "part-first mode needs a locator model".to_string(),
        })
    }

    /// Locates regions, classifies each crop and composites the patches over
    /// a copy of `image` in locator order.
    ///
    /// Regions whose clipped box is empty are dropped. A region with no
    /// disease detections is pasted back unmodified.
    pub fn run_part_first(&self, image: &RgbImage) -> Result<PartFirstRun, BerryscanError> {
        let locator = self.locator()?;
        let proposals = locator.detect(image)?;
        debug!("{}: {} region(s) proposed", locator.name(), proposals.len());

        let mut regions = Vec::with_capacity(proposals.len());
        for proposal in &proposals {
            let Some(crop) = extract_region(image, proposal) else {
                debug!("dropping empty region {:?}", proposal.bbox);
                continue;
            };
            let diseases = self.classifier.classify(&crop.image)?;
            let patch = if diseases.is_empty() {
                crop.image.clone()
            } else {
                let mut annotated = crop.image.clone();
                self.annotator.draw(&mut annotated, &diseases);
                annotated
            };
            debug!(
                "region {:?} ({}): {} disease detection(s)",
                crop.rect,
                crop.detection.class_name,
                diseases.len()
            );
            regions.push(ClassifiedRegion {
                crop,
                diseases,
                patch,
            });
        }

        let annotated = composite_regions(
            image.clone(),
            regions.iter().map(|region| (&region.crop.rect, &region.patch)),
        );
        Ok(PartFirstRun { annotated, regions })
    }

    /// Runs the classifier on the whole image and draws what it kept.
    pub fn run_direct(&self, image: &RgbImage) -> Result<DirectRun, BerryscanError> {
        let detections = self.classifier.classify(image)?;
        let mut annotated = image.clone();
        self.annotator.draw(&mut annotated, &detections);
        Ok(DirectRun {
            annotated,
            detections,
        })
    }
}

/// Where outputs are written.
#[derive(Clone, Debug, Default)]
pub struct OutputOptions {
    pub output_dir: PathBuf,
    /// Crops under this directory are referenced by a `/`-rooted path
    /// relative to it.
    pub crop_url_root: Option<PathBuf>,
}

impl OutputOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            crop_url_root: None,
        }
    }

    fn with_output_dir(&self, output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            crop_url_root: self.crop_url_root.clone(),
        }
    }
}

/// Runs the pipeline on the image at `image_path`, writing the annotated
/// image (and crops) into `output.output_dir`.
///
/// Never fails: errors are folded into [`PipelineOutcome::Error`].
pub fn process_image(
    pipeline: &TwoStagePipeline<'_>,
    mode: DetectionMode,
    image_path: &Path,
    output: &OutputOptions,
) -> PipelineOutcome {
    PipelineOutcome::from(predict_image(pipeline, mode, image_path, output))
}

/// [`process_image`] with the error kept typed.
pub fn predict_image(
    pipeline: &TwoStagePipeline<'_>,
    mode: DetectionMode,
    image_path: &Path,
    output: &OutputOptions,
) -> Result<Vec<PredictionRecord>, BerryscanError> {
    let image = image::open(image_path)
        .map_err(|source| BerryscanError::ImageRead {
            path: image_path.to_path_buf(),
            source,
        })?
        .to_rgb8();
    let stem = image_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let classifier_name = file_token(pipeline.classifier().name());

    fs::create_dir_all(&output.output_dir)?;

    match mode {
        DetectionMode::PartFirst => {
            let locator_name = file_token(pipeline.locator()?.name());
            let run = pipeline.run_part_first(&image)?;

            let crop_dir = output
                .output_dir
                .join(format!("crops_{locator_name}_{classifier_name}"));
            fs::create_dir_all(&crop_dir)?;

            let mut findings = Vec::with_capacity(run.regions.len());
            for (index, region) in run.regions.into_iter().enumerate() {
                let crop_path = crop_dir.join(format!("crop_{}.jpg", index + 1));
                save_jpeg(&region.patch, &crop_path)?;
                findings.push(RegionFinding {
                    primary: region.crop.detection,
                    rect: region.crop.rect,
                    diseases: region.diseases,
                    crop_reference: crop_reference(&crop_path, output.crop_url_root.as_deref()),
                });
            }

            let annotated_path = output.output_dir.join(format!(
                "{stem}_{locator_name}_{classifier_name}_annotated.jpg"
            ));
            save_jpeg(&run.annotated, &annotated_path)?;
            Ok(assemble_part_first(findings))
        }
        DetectionMode::Direct => {
            let run = pipeline.run_direct(&image)?;
            let annotated_path = output
                .output_dir
                .join(format!("{stem}_{classifier_name}_annotated.jpg"));
            save_jpeg(&run.annotated, &annotated_path)?;
            Ok(assemble_direct(&run.detections))
        }
    }
}

/// Runs the pipeline on every image under `input_dir`, in sorted order.
///
/// Each image gets its own output directory,
/// `<output_dir>/<relative parent>/<stem>/`, or `<file name>/` when another
/// image in the same folder has the same stem (`leaf.jpg` and `leaf.png`).
/// A failing image is recorded in the report and does not stop the batch.
pub fn process_folder(
    pipeline: &TwoStagePipeline<'_>,
    mode: DetectionMode,
    input_dir: &Path,
    output: &OutputOptions,
    recursive: bool,
) -> Result<BatchReport, BerryscanError> {
    if !input_dir.is_dir() {
        return Err(BerryscanError::DatasetLayoutInvalid {
            path: input_dir.to_path_buf(),
            message: "input must be a directory".to_string(),
        });
    }

    let images = collect_images(input_dir, recursive)?;
    info!(
        "predicting {} image(s) from {} ({mode})",
        images.len(),
        input_dir.display()
    );

    let mut stems: HashMap<PathBuf, usize> = HashMap::new();
    for image_path in &images {
        *stems.entry(image_path.with_extension("")).or_default() += 1;
    }

    let mut report = BatchReport::new(input_dir, mode);
    for image_path in images {
        let rel = rel_string(input_dir, &image_path);
        let shared_stem = stems
            .get(&image_path.with_extension(""))
            .is_some_and(|count| *count > 1);
        let image_dir = image_output_dir(&output.output_dir, input_dir, &image_path, shared_stem);

        let outcome = process_image(pipeline, mode, &image_path, &output.with_output_dir(image_dir.clone()));
        match &outcome {
            PipelineOutcome::Success(predictions) => {
                info!("{rel}: {} prediction(s)", predictions.len())
            }
            PipelineOutcome::Error(message) => warn!("{rel}: {message}"),
        }
        report.images.push(ImageOutcome {
            image: rel,
            output_dir: image_dir,
            outcome,
        });
    }

    Ok(report)
}

fn image_output_dir(output_root: &Path, input_dir: &Path, image_path: &Path, shared_stem: bool) -> PathBuf {
    let rel_path = image_path.strip_prefix(input_dir).unwrap_or(image_path);
    let mut image_dir = output_root.to_path_buf();
    if let Some(parent) = rel_path.parent() {
        image_dir.push(parent);
    }
    let name = if shared_stem {
        image_path.file_name()
    } else {
        image_path.file_stem()
    };
    if let Some(name) = name {
        image_dir.push(name);
    }
    image_dir
}

/// How a saved crop is referred to in the prediction record.
///
/// Both paths are made absolute first, so a relative output directory
/// still matches an absolute root.
pub fn crop_reference(crop_path: &Path, url_root: Option<&Path>) -> String {
    let under_root = url_root.and_then(|root| {
        let crop = std::path::absolute(crop_path).ok()?;
        let root = std::path::absolute(root).ok()?;
        crop.strip_prefix(&root).ok().map(Path::to_path_buf)
    });
    match under_root {
        Some(rel) => format!("/{}", rel.to_string_lossy().replace('\\', "/")),
        None => crop_path.to_string_lossy().into_owned(),
    }
}

/// Makes a model name safe to embed in a file name.
fn file_token(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | ' ' => '_',
            c => c,
        })
        .collect()
}

fn save_jpeg(image: &RgbImage, path: &Path) -> Result<(), BerryscanError> {
    image
        .save_with_format(path, ImageFormat::Jpeg)
        .map_err(|source| BerryscanError::ImageWrite {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_and_displays_kebab_case() {
        assert_eq!("part-first".parse::<DetectionMode>().expect("parse"), DetectionMode::PartFirst);
        assert_eq!(DetectionMode::Direct.to_string(), "direct");
        assert!("both".parse::<DetectionMode>().is_err());
        assert_eq!(
            serde_json::to_value(DetectionMode::PartFirst).expect("json"),
            "part-first"
        );
    }

    #[test]
    fn crop_reference_is_url_under_root() {
        let root = Path::new("/srv/app/public");
        assert_eq!(
            crop_reference(Path::new("/srv/app/public/results/crops_a_b/crop_1.jpg"), Some(root)),
            "/results/crops_a_b/crop_1.jpg"
        );
        assert_eq!(
            crop_reference(Path::new("/tmp/out/crop_1.jpg"), Some(root)),
            "/tmp/out/crop_1.jpg"
        );
        assert_eq!(
            crop_reference(Path::new("out/crop_2.jpg"), None),
            "out/crop_2.jpg"
        );
    }

    #[test]
    fn crop_reference_matches_relative_crop_against_absolute_root() {
        let root = std::env::current_dir().expect("current dir").join("public");
        assert_eq!(
            crop_reference(Path::new("public/results/crops_a_b/crop_1.jpg"), Some(&root)),
            "/results/crops_a_b/crop_1.jpg"
        );
        assert_eq!(
            crop_reference(Path::new("elsewhere/crop_1.jpg"), Some(&root)),
            "elsewhere/crop_1.jpg"
        );
    }

    #[test]
    fn shared_stems_keep_their_extension_in_the_output_dir() {
        let input = Path::new("/in");
        let out = Path::new("/out");
        assert_eq!(
            image_output_dir(out, input, Path::new("/in/sub/leaf.jpg"), false),
            PathBuf::from("/out/sub/leaf")
        );
        assert_eq!(
            image_output_dir(out, input, Path::new("/in/sub/leaf.jpg"), true),
            PathBuf::from("/out/sub/leaf.jpg")
        );
    }

    #[test]
    fn file_token_replaces_separators() {
        assert_eq!(file_token("strawberry parts/v2"), "strawberry_parts_v2");
        assert_eq!(file_token("leafblight"), "leafblight");
    }
}
