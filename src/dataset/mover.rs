//! Moving one dataset into another.
//!
//! Both datasets use the Roboflow-style layout:
//!
//! ```text
//! <root>/data.yaml
//! <root>/{train,valid,test}/images/<stem>.<ext>
//! <root>/{train,valid,test}/labels/<stem>.txt
//! ```
//!
//! The source dataset is consumed: its files are moved, not copied.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::fsutil::{create_new_file, relocate_file};
use super::label::{remap_label_file, RemapPolicy, RemapStats};
use super::manifest::{
    index_mapping, merge_class_names, DatasetManifest, IndexMapping, ManifestMerge, MANIFEST_FILE,
};
use super::report::{CombineReport, FileFailure, SplitReport};
use crate::error::BerryscanError;
use crate::files::{collect_images, LABEL_EXTENSION};

/// A dataset split directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Split {
    Train,
    Valid,
    Test,
}

impl Split {
    pub const ALL: [Split; 3] = [Split::Train, Split::Valid, Split::Test];

    pub fn dir_name(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Valid => "valid",
            Split::Test => "test",
        }
    }

    pub fn images_dir(self, root: &Path) -> PathBuf {
        root.join(self.dir_name()).join("images")
    }

    pub fn labels_dir(self, root: &Path) -> PathBuf {
        root.join(self.dir_name()).join("labels")
    }
}

/// Where a moved image (and its label, if any) ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MovedPair {
    pub image: PathBuf,
    pub label: Option<PathBuf>,
    pub stats: RemapStats,
    /// Problems that did not stop the move.
    pub notes: Vec<String>,
}

fn target_path(source: &Path, target_dir: &Path) -> Result<PathBuf, BerryscanError> {
    let name = source
        .file_name()
        .ok_or_else(|| BerryscanError::DatasetLayoutInvalid {
            path: source.to_path_buf(),
            message: "path has no file name".to_string(),
        })?;
    Ok(target_dir.join(name))
}

/// Moves an image and its label file into the target dataset.
///
/// The label's class indices are rewritten through `mapping`; geometry tokens
/// are copied unchanged. Nothing is touched when either target file already
/// exists or when a label line has no mapping. The label is written under a
/// temporary name and renamed into place, and if that fails the image is
/// moved back. Once both files are in the target the pair counts as moved;
/// a source label that cannot be deleted afterwards is only noted.
pub fn move_pair(
    source_image: &Path,
    source_label: &Path,
    target_image_dir: &Path,
    target_label_dir: &Path,
    mapping: &IndexMapping,
) -> Result<MovedPair, BerryscanError> {
    let target_image = target_path(source_image, target_image_dir)?;
    let target_label = target_path(source_label, target_label_dir)?;

    for target in [&target_image, &target_label] {
        if target.exists() {
            return Err(BerryscanError::FileAlreadyExists {
                path: target.clone(),
            });
        }
    }

    let (label_text, stats) = remap_label_file(source_label, mapping, RemapPolicy::Strict)?;

    relocate_file(source_image, &target_image)?;
    if let Err(err) = create_new_file(&target_label, label_text.as_bytes()) {
        if let Err(rollback) = relocate_file(&target_image, source_image) {
            warn!(
                "could not move {} back after label write failed: {}",
                target_image.display(),
                rollback
            );
        }
        return Err(err);
    }
    let notes = remove_moved_source(source_label).into_iter().collect();

    debug!(
        "moved {} ({} label line(s), {} remapped)",
        target_image.display(),
        stats.lines,
        stats.changed
    );

    Ok(MovedPair {
        image: target_image,
        label: Some(target_label),
        stats,
        notes,
    })
}

/// Deletes a source file whose contents already reached the target,
/// returning a note when it has to stay behind.
fn remove_moved_source(path: &Path) -> Option<String> {
    match fs::remove_file(path) {
        Ok(()) => None,
        Err(err) => {
            warn!("could not remove {} after moving it: {}", path.display(), err);
            Some(format!(
                "stale source label left at {}: {}",
                path.display(),
                err
            ))
        }
    }
}

/// Moves an image that has no label file (a background image).
pub fn move_image(source_image: &Path, target_image_dir: &Path) -> Result<MovedPair, BerryscanError> {
    let target_image = target_path(source_image, target_image_dir)?;
    relocate_file(source_image, &target_image)?;
    Ok(MovedPair {
        image: target_image,
        label: None,
        stats: RemapStats::default(),
        notes: Vec::new(),
    })
}

/// Computes the merged class list for `source_root` into `target_root`
/// without writing anything.
pub fn preview_merge(source_root: &Path, target_root: &Path) -> Result<ManifestMerge, BerryscanError> {
    let source = DatasetManifest::read_from_root(source_root)?;
    let target = DatasetManifest::read_from_root(target_root)?;
    merge_class_names(&target.names, &source.names)
}

/// Merges the source manifest into the target manifest on disk and returns
/// the mapping from source indices to the indices now on disk.
///
/// Safe to call repeatedly: once the target already lists every source
/// class, the manifest is left alone and the same mapping comes back.
pub fn merge_manifests(source_root: &Path, target_root: &Path) -> Result<IndexMapping, BerryscanError> {
    let source = DatasetManifest::read_from_root(source_root)?;
    let target_path = target_root.join(MANIFEST_FILE);
    let target = DatasetManifest::read(&target_path)?;

    let merge = merge_class_names(&target.names, &source.names)?;
    let merged = target.with_names(merge.names);
    if merged != target {
        if !merge.appended.is_empty() {
            info!(
                "adding {} class(es) to {}: {}",
                merge.appended.len(),
                target_path.display(),
                merge.appended.join(", ")
            );
        }
        merged.write(&target_path)?;
    }

    // Resolve against what is actually stored, not the in-memory merge.
    let stored = DatasetManifest::read(&target_path)?;
    index_mapping(&source.names, &stored.names)
}

/// Moves every split of `source_root` into `target_root`.
///
/// Splits are independent: a split whose manifest merge fails is reported
/// and left in place, and the remaining splits still run. Within a split,
/// files that cannot be moved are reported and skipped.
pub fn combine_dataset(source_root: &Path, target_root: &Path) -> Result<CombineReport, BerryscanError> {
    for root in [source_root, target_root] {
        if !root.is_dir() {
            return Err(BerryscanError::DatasetLayoutInvalid {
                path: root.to_path_buf(),
                message: "dataset root must be a directory".to_string(),
            });
        }
    }

    let mut report = CombineReport::new(source_root, target_root);
    for split in Split::ALL {
        report
            .splits
            .push(combine_split(source_root, target_root, split));
    }
    Ok(report)
}

fn combine_split(source_root: &Path, target_root: &Path, split: Split) -> SplitReport {
    let name = split.dir_name();
    let source_images = split.images_dir(source_root);
    if !source_images.is_dir() {
        info!("[{}] no {} in source; skipping", name, source_images.display());
        return SplitReport::skipped(name, format!("{} not found", source_images.display()));
    }

    let mapping = match merge_manifests(source_root, target_root) {
        Ok(mapping) => mapping,
        Err(err) => {
            warn!("[{}] manifest merge failed; leaving split in place: {}", name, err);
            return SplitReport::failed(name, err.to_string());
        }
    };

    let source_labels = split.labels_dir(source_root);
    let target_images = split.images_dir(target_root);
    let target_labels = split.labels_dir(target_root);

    let images = match fs::create_dir_all(&target_images)
        .and_then(|_| fs::create_dir_all(&target_labels))
        .map_err(BerryscanError::Io)
        .and_then(|_| collect_images(&source_images, false))
    {
        Ok(images) => images,
        Err(err) => {
            warn!("[{}] cannot prepare split: {}", name, err);
            return SplitReport::failed(name, err.to_string());
        }
    };

    info!(
        "[{}] moving {} image(s) with mapping {}",
        name,
        images.len(),
        mapping
    );

    let mut report = SplitReport::new(name);
    let mut claimed_labels: HashSet<PathBuf> = HashSet::new();
    for image in images {
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let label = image
            .file_stem()
            .map(|stem| source_labels.join(format!("{}.{LABEL_EXTENSION}", stem.to_string_lossy())));

        let result = match &label {
            // `a.jpg` and `a.png` cannot both own `a.txt`; the first in sorted
            // order keeps it.
            Some(label) if claimed_labels.contains(label) => Err(BerryscanError::DatasetLayoutInvalid {
                path: image.clone(),
                message: format!(
                    "label {} belongs to another image with the same stem",
                    label.display()
                ),
            }),
            Some(label) if label.is_file() => {
                claimed_labels.insert(label.clone());
                move_pair(&image, label, &target_images, &target_labels, &mapping)
            }
            _ => {
                let moved = move_image(&image, &target_images);
                if moved.is_ok() {
                    report.unlabeled.push(file_name.clone());
                }
                moved
            }
        };

        match result {
            Ok(moved) => {
                report.moved += 1;
                report
                    .notes
                    .extend(moved.notes.into_iter().map(|note| format!("{file_name}: {note}")));
            }
            Err(err) => {
                warn!("[{}] {}: {}", name, file_name, err);
                report.failures.push(FileFailure {
                    file: file_name,
                    message: err.to_string(),
                });
            }
        }
    }

    report.mapping = Some(mapping);
    report
}
