//! Detectors backed by an external command.
//!
//! The image is written to a temporary PNG and the command is run once per
//! image. `{image}` and `{model}` in the configured arguments are replaced by
//! the image and model paths; without an `{image}` placeholder the image path
//! is appended as the last argument. The last non-empty line on stdout must be
//! a JSON object:
//!
//! ```json
//! {"detections": [{"xyxy": [12.0, 30.5, 220.0, 310.0], "class": 2, "confidence": 0.87}]}
//! ```
//!
//! `xyxyn` (coordinates normalized to the image size) may be sent instead of
//! `xyxy`.

use std::path::PathBuf;
use std::process::Command;

use image::{ImageFormat, RgbImage};
use log::{debug, trace};
use serde::Deserialize;

use super::detection::{Detector, RawDetection};
use crate::config::ModelSpec;
use crate::error::BerryscanError;
use crate::geometry::{BBoxXYXY, Normalized, Pixel};

const IMAGE_PLACEHOLDER: &str = "{image}";
const MODEL_PLACEHOLDER: &str = "{model}";

#[derive(Debug, Deserialize)]
struct WireOutput {
    detections: Vec<WireDetection>,
}

#[derive(Debug, Deserialize)]
struct WireDetection {
    #[serde(default)]
    xyxy: Option<BBoxXYXY<Pixel>>,
    #[serde(default)]
    xyxyn: Option<BBoxXYXY<Normalized>>,
    class: usize,
    confidence: f64,
}

/// A [`Detector`] that shells out to a model runner.
#[derive(Clone, Debug)]
pub struct ExternalDetector {
    name: String,
    command: String,
    args: Vec<String>,
    model: Option<PathBuf>,
    class_names: Vec<String>,
}

impl ExternalDetector {
    pub fn new(
        name: impl Into<String>,
        command: impl Into<String>,
        args: Vec<String>,
        model: Option<PathBuf>,
        class_names: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args,
            model,
            class_names,
        }
    }

    /// Builds a detector from a config entry whose paths are already resolved.
    ///
    /// Fails if the model file is missing or no class names are configured.
    pub fn from_spec(spec: &ModelSpec) -> Result<Self, BerryscanError> {
        if let Some(model) = &spec.model {
            if !model.is_file() {
                return Err(BerryscanError::ConfigInvalid {
                    message: format!("model file not found: {}", model.display()),
                });
            }
        }
        let class_names = spec.resolve_names()?;
        Ok(Self::new(
            spec.display_name(),
            spec.command.clone(),
            spec.args.clone(),
            spec.model.clone(),
            class_names,
        ))
    }

    fn command_args(&self, image_path: &str) -> Vec<String> {
        let model = self
            .model
            .as_ref()
            .map(|m| m.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut saw_image = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                saw_image |= arg.contains(IMAGE_PLACEHOLDER);
                arg.replace(IMAGE_PLACEHOLDER, image_path)
                    .replace(MODEL_PLACEHOLDER, &model)
            })
            .collect();
        if !saw_image {
            args.push(image_path.to_string());
        }
        args
    }

    fn failed(&self, message: impl Into<String>) -> BerryscanError {
        BerryscanError::DetectorFailed {
            detector: self.name.clone(),
            message: message.into(),
        }
    }
}

impl Detector for ExternalDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn infer(&self, image: &RgbImage) -> Result<Vec<RawDetection>, BerryscanError> {
        let input = tempfile::Builder::new()
            .prefix("berryscan-")
            .suffix(".png")
            .tempfile()?;
        image
            .save_with_format(input.path(), ImageFormat::Png)
            .map_err(|source| BerryscanError::ImageWrite {
                path: input.path().to_path_buf(),
                source,
            })?;

        let image_path = input.path().to_string_lossy().into_owned();
        let args = self.command_args(&image_path);
        debug!("{}: running {} {:?}", self.name, self.command, args);

        let output = Command::new(&self.command)
            .args(&args)
            .output()
            .map_err(|err| self.failed(format!("could not start '{}': {err}", self.command)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.failed(format!("{}: {}", output.status, stderr.trim())));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        trace!("{}: stdout {}", self.name, stdout.trim());
        parse_detector_output(&self.name, &stdout, image.width(), image.height())
    }
}

/// Parses the detection line a model runner prints, scaling normalized boxes
/// to a `width` x `height` image.
pub fn parse_detector_output(
    detector: &str,
    stdout: &str,
    width: u32,
    height: u32,
) -> Result<Vec<RawDetection>, BerryscanError> {
    let Some(line) = stdout.lines().rev().find(|line| !line.trim().is_empty()) else {
        return Err(BerryscanError::DetectorFailed {
            detector: detector.to_string(),
            message: "no output on stdout".to_string(),
        });
    };

    let wire: WireOutput =
        serde_json::from_str(line.trim()).map_err(|source| BerryscanError::DetectorOutputParse {
            detector: detector.to_string(),
            source,
        })?;

    wire.detections
        .into_iter()
        .enumerate()
        .map(|(index, det)| {
            let bbox = match (det.xyxy, det.xyxyn) {
                (Some(bbox), _) => bbox,
                (None, Some(bbox)) => bbox.to_pixel(f64::from(width), f64::from(height)),
                (None, None) => {
                    return Err(BerryscanError::DetectorFailed {
                        detector: detector.to_string(),
                        message: format!("detection {index} has neither `xyxy` nor `xyxyn`"),
                    })
                }
            };
            Ok(RawDetection {
                bbox,
                class_id: det.class,
                confidence: det.confidence,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_last_non_empty_line() {
        let stdout = "loading weights...\n{\"detections\":[{\"xyxy\":[1,2,3,4],\"class\":1,\"confidence\":0.5}]}\n\n";
        let parsed = parse_detector_output("m", stdout, 10, 10).expect("parse");
        assert_eq!(
            parsed,
            vec![RawDetection {
                bbox: BBoxXYXY::from_xyxy(1.0, 2.0, 3.0, 4.0),
                class_id: 1,
                confidence: 0.5,
            }]
        );
    }

    #[test]
    fn normalized_boxes_are_scaled() {
        let stdout = "{\"detections\":[{\"xyxyn\":[0.25,0.5,0.75,1.0],\"class\":0,\"confidence\":0.9}]}";
        let parsed = parse_detector_output("m", stdout, 640, 480).expect("parse");
        assert_eq!(parsed[0].bbox, BBoxXYXY::from_xyxy(160.0, 240.0, 480.0, 480.0));
    }

    #[test]
    fn empty_detection_list_is_fine() {
        let parsed = parse_detector_output("m", "{\"detections\":[]}", 1, 1).expect("parse");
        assert!(parsed.is_empty());
    }

    #[test]
    fn garbage_and_silence_are_errors() {
        assert!(matches!(
            parse_detector_output("m", "", 1, 1),
            Err(BerryscanError::DetectorFailed { .. })
        ));
        assert!(matches!(
            parse_detector_output("m", "Traceback (most recent call last)", 1, 1),
            Err(BerryscanError::DetectorOutputParse { .. })
        ));
        assert!(matches!(
            parse_detector_output("m", "{\"detections\":[{\"class\":0,\"confidence\":1}]}", 1, 1),
            Err(BerryscanError::DetectorFailed { .. })
        ));
    }

    #[test]
    fn placeholders_are_substituted_or_image_appended() {
        let detector = ExternalDetector::new(
            "m",
            "run",
            vec!["--weights".into(), "{model}".into(), "--source={image}".into()],
            Some(PathBuf::from("/models/leaf.pt")),
            vec![],
        );
        assert_eq!(
            detector.command_args("/tmp/x.png"),
            vec!["--weights", "/models/leaf.pt", "--source=/tmp/x.png"]
        );

        let bare = ExternalDetector::new("m", "run", vec!["-q".into()], None, vec![]);
        assert_eq!(bare.command_args("/tmp/x.png"), vec!["-q", "/tmp/x.png"]);
    }

    #[test]
    fn from_spec_requires_existing_model() {
        let spec: ModelSpec = serde_yaml::from_str(
            "command: run\nmodel: /definitely/not/here.pt\nnames: [leaf]\n",
        )
        .expect("parse");
        assert!(matches!(
            ExternalDetector::from_spec(&spec),
            Err(BerryscanError::ConfigInvalid { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn runs_command_and_reads_its_detections() {
        let detector = ExternalDetector::new(
            "shell",
            "sh",
            vec![
                "-c".into(),
                "test -s \"$1\" && echo '{\"detections\":[{\"xyxy\":[0,0,2,2],\"class\":0,\"confidence\":0.7}]}'".into(),
                "sh".into(),
                "{image}".into(),
            ],
            None,
            vec!["leaf".into()],
        );
        let found = detector.infer(&RgbImage::new(4, 4)).expect("infer");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].confidence, 0.7);
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_reports_stderr() {
        let detector = ExternalDetector::new(
            "shell",
            "sh",
            vec!["-c".into(), "echo 'CUDA out of memory' >&2; exit 3".into()],
            None,
            vec![],
        );
        let err = detector.infer(&RgbImage::new(2, 2)).unwrap_err();
        match err {
            BerryscanError::DetectorFailed { detector, message } => {
                assert_eq!(detector, "shell");
                assert!(message.contains("CUDA out of memory"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
