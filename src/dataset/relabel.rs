//! In-place class-index rewriting for a whole dataset.
//!
//! Used to fold classes together or reorder them before a merge. Indices not
//! named in the mapping are left as they are.

use std::fs;
use std::path::Path;

use log::{debug, info};
use walkdir::WalkDir;

use super::fsutil::replace_file;
use super::label::{remap_label_text, RemapPolicy};
use super::manifest::IndexMapping;
use super::mover::Split;
use super::report::RelabelReport;
use crate::error::BerryscanError;
use crate::files::{has_extension, LABEL_EXTENSION};

/// Rewrites every label file of every split under `root` through `mapping`.
///
/// Each file is fully parsed before it is replaced, so a malformed file is
/// reported without being modified. Files processed before the failure keep
/// their new contents.
pub fn relabel_dataset(root: &Path, mapping: &IndexMapping) -> Result<RelabelReport, BerryscanError> {
    if !root.is_dir() {
        return Err(BerryscanError::DatasetLayoutInvalid {
            path: root.to_path_buf(),
            message: "dataset root must be a directory".to_string(),
        });
    }

    let mut report = RelabelReport {
        root: root.to_path_buf(),
        ..Default::default()
    };

    for split in Split::ALL {
        let labels_dir = split.labels_dir(root);
        if !labels_dir.is_dir() {
            report.splits_missing.push(split.dir_name().to_string());
            continue;
        }

        let mut label_files = Vec::new();
        for entry in WalkDir::new(&labels_dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|source| BerryscanError::DatasetLayoutInvalid {
                path: labels_dir.clone(),
                message: format!("failed while traversing directory: {source}"),
            })?;
            if entry.file_type().is_file() && has_extension(entry.path(), &[LABEL_EXTENSION]) {
                label_files.push(entry.into_path());
            }
        }
        label_files.sort();

        info!(
            "[{}] relabeling {} file(s)",
            split.dir_name(),
            label_files.len()
        );

        for path in label_files {
            let content = fs::read_to_string(&path).map_err(BerryscanError::Io)?;
            let (rewritten, stats) =
                remap_label_text(&content, mapping, RemapPolicy::PassThrough, &path)?;
            // Only class indices count; line endings alone are not a reason
            // to rewrite a file.
            if stats.changed > 0 {
                replace_file(&path, rewritten.as_bytes())?;
                report.files_rewritten += 1;
                report.lines_changed += stats.changed;
                debug!("{}: {} line(s) changed", path.display(), stats.changed);
            }
        }
    }

    Ok(report)
}

/// Parses `OLD=NEW` pairs as given on the command line.
pub fn parse_mapping_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<IndexMapping, BerryscanError> {
    let mut mapping = IndexMapping::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let parsed = pair
            .split_once('=')
            .and_then(|(from, to)| Some((from.trim().parse().ok()?, to.trim().parse().ok()?)));
        let Some((from, to)) = parsed else {
            return Err(BerryscanError::ConfigInvalid {
                message: format!("invalid class mapping '{pair}'; expected OLD=NEW"),
            });
        };
        if mapping.insert(from, to).is_some() {
            return Err(BerryscanError::ConfigInvalid {
                message: format!("class {from} is mapped more than once"),
            });
        }
    }
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relabel_rewrites_mapped_indices_and_keeps_the_rest() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let labels = temp.path().join("train/labels");
        fs::create_dir_all(&labels).expect("create labels");
        fs::write(labels.join("a.txt"), "0 0.1 0.1 0.1 0.1\n2 0.2 0.2 0.2 0.2\n")
            .expect("write a");
        fs::write(labels.join("b.txt"), "2 0.3 0.3 0.3 0.3\n").expect("write b");

        let mapping = parse_mapping_pairs(&["0=1"]).expect("parse mapping");
        let report = relabel_dataset(temp.path(), &mapping).expect("relabel");

        assert_eq!(
            fs::read_to_string(labels.join("a.txt")).expect("read a"),
            "1 0.1 0.1 0.1 0.1\n2 0.2 0.2 0.2 0.2\n"
        );
        assert_eq!(
            fs::read_to_string(labels.join("b.txt")).expect("read b"),
            "2 0.3 0.3 0.3 0.3\n"
        );
        assert_eq!(report.files_rewritten, 1);
        assert_eq!(report.lines_changed, 1);
        assert_eq!(report.splits_missing, vec!["valid", "test"]);
    }

    #[test]
    fn relabel_leaves_malformed_file_untouched() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let labels = temp.path().join("valid/labels");
        fs::create_dir_all(&labels).expect("create labels");
        fs::write(labels.join("bad.txt"), "0 0.1 0.1 0.1 0.1\nx 0.2\n").expect("write bad");

        let mapping = parse_mapping_pairs(&["0=5"]).expect("parse mapping");
        let err = relabel_dataset(temp.path(), &mapping).unwrap_err();

        assert!(matches!(err, BerryscanError::LabelParse { line: 2, .. }));
        assert_eq!(
            fs::read_to_string(labels.join("bad.txt")).expect("read bad"),
            "0 0.1 0.1 0.1 0.1\nx 0.2\n"
        );
    }

    #[test]
    fn relabel_counts_only_files_with_changed_classes() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let labels = temp.path().join("test/labels");
        fs::create_dir_all(&labels).expect("create labels");
        fs::write(labels.join("crlf.txt"), "2 0.1 0.1 0.1 0.1\r\n").expect("write crlf");
        fs::write(labels.join("mapped.txt"), "0 0.1 0.1 0.1 0.1\r\n").expect("write mapped");

        let mapping = parse_mapping_pairs(&["0=1"]).expect("parse mapping");
        let report = relabel_dataset(temp.path(), &mapping).expect("relabel");

        assert_eq!(report.files_rewritten, 1);
        assert_eq!(report.lines_changed, 1);
        assert_eq!(
            fs::read_to_string(labels.join("crlf.txt")).expect("read crlf"),
            "2 0.1 0.1 0.1 0.1\r\n"
        );
        assert_eq!(
            fs::read_to_string(labels.join("mapped.txt")).expect("read mapped"),
            "1 0.1 0.1 0.1 0.1\n"
        );
    }

    #[test]
    fn parse_mapping_pairs_rejects_garbage_and_duplicates() {
        assert!(parse_mapping_pairs(&["3"]).is_err());
        assert!(parse_mapping_pairs(&["a=1"]).is_err());
        assert!(parse_mapping_pairs(&["1=2", "1=3"]).is_err());

        let mapping = parse_mapping_pairs(&["1 = 2", "0=0"]).expect("parse");
        assert_eq!(mapping.get(1), Some(2));
        assert_eq!(mapping.len(), 2);
    }
}
