#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use berryscan::detect::{Detector, RawDetection};
use berryscan::geometry::BBoxXYXY;
use berryscan::BerryscanError;
use image::{Rgb, RgbImage};

/// A deterministic test image: a colour gradient so that any crop or paste
/// mistake shows up as a pixel mismatch.
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 251) as u8, (y % 241) as u8, ((x + y) % 239) as u8])
    })
}

/// Writes `image` to `path` (format from the extension), creating parents.
pub fn write_image(path: &Path, image: &RgbImage) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    image.save(path).expect("write image file");
}

/// Writes a small solid image; used where pixel content does not matter.
pub fn write_solid(path: &Path, width: u32, height: u32) {
    write_image(path, &RgbImage::from_pixel(width, height, Rgb([40, 120, 40])));
}

pub fn write_manifest(root: &Path, names: &[&str]) {
    fs::create_dir_all(root).expect("create dataset root");
    let mut yaml = String::from("train: ../train/images\nval: ../valid/images\ntest: ../test/images\n\n");
    yaml.push_str(&format!("nc: {}\nnames:\n", names.len()));
    for name in names {
        yaml.push_str(&format!("  - {}\n", name));
    }
    fs::write(root.join("data.yaml"), yaml).expect("write data.yaml");
}

/// Adds an image (and, when `label` is given, its label file) to a split.
pub fn add_sample(root: &Path, split: &str, file_name: &str, label: Option<&str>) {
    let image_path = root.join(split).join("images").join(file_name);
    write_solid(&image_path, 8, 8);
    let labels_dir = root.join(split).join("labels");
    fs::create_dir_all(&labels_dir).expect("create labels dir");
    if let Some(label) = label {
        let stem = Path::new(file_name)
            .file_stem()
            .expect("file stem")
            .to_string_lossy()
            .into_owned();
        fs::write(labels_dir.join(format!("{stem}.txt")), label).expect("write label");
    }
}

pub fn read_label(root: &Path, split: &str, stem: &str) -> String {
    fs::read_to_string(root.join(split).join("labels").join(format!("{stem}.txt")))
        .expect("read label")
}

pub fn raw(bbox: [f64; 4], class_id: usize, confidence: f64) -> RawDetection {
    RawDetection {
        bbox: BBoxXYXY::from_array(bbox),
        class_id,
        confidence,
    }
}

/// An in-process detector that answers by input image size.
///
/// Locators see the full image and classifiers see crops, so keying on the
/// size lets one test script both stages.
pub struct ScriptedDetector {
    name: String,
    names: Vec<String>,
    by_size: HashMap<(u32, u32), Vec<RawDetection>>,
    fallback: Vec<RawDetection>,
    fail_on: Option<(u32, u32)>,
    calls: Cell<usize>,
}

impl ScriptedDetector {
    pub fn new(name: &str, names: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            names: names.iter().map(|n| n.to_string()).collect(),
            by_size: HashMap::new(),
            fallback: Vec::new(),
            fail_on: None,
            calls: Cell::new(0),
        }
    }

    pub fn on_size(mut self, width: u32, height: u32, detections: Vec<RawDetection>) -> Self {
        self.by_size.insert((width, height), detections);
        self
    }

    pub fn always(mut self, detections: Vec<RawDetection>) -> Self {
        self.fallback = detections;
        self
    }

    pub fn failing_on(mut self, width: u32, height: u32) -> Self {
        self.fail_on = Some((width, height));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Detector for ScriptedDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn class_names(&self) -> &[String] {
        &self.names
    }

    fn infer(&self, image: &RgbImage) -> Result<Vec<RawDetection>, BerryscanError> {
        self.calls.set(self.calls.get() + 1);
        let size = image.dimensions();
        if self.fail_on == Some(size) {
            return Err(BerryscanError::DetectorFailed {
                detector: self.name.clone(),
                message: format!("scripted failure on {}x{}", size.0, size.1),
            });
        }
        Ok(self
            .by_size
            .get(&size)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}
