//! YOLO label lines and class-index rewriting.
//!
//! A label line is `<class_index> <geometry tokens...>`. Geometry is opaque
//! here: boxes, polygons and keypoints all pass through as the exact token
//! strings that were read. Only the class index is ever rewritten.

use std::fs;
use std::path::Path;

use super::manifest::IndexMapping;
use crate::error::BerryscanError;

/// One non-empty line of a label file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelRecord<'a> {
    pub class_id: usize,
    pub geometry: Vec<&'a str>,
}

impl LabelRecord<'_> {
    /// Renders the record as a single space-separated line (no newline).
    pub fn to_line(&self) -> String {
        let mut line = self.class_id.to_string();
        for token in &self.geometry {
            line.push(' ');
            line.push_str(token);
        }
        line
    }
}

/// What to do with a class index that the mapping does not cover.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemapPolicy {
    /// Fail with [`BerryscanError::LabelClassOutOfDomain`].
    Strict,
    /// Keep the original index.
    PassThrough,
}

/// Parses one label line; blank lines yield `None`.
pub fn parse_label_line<'a>(
    line: &'a str,
    path: &Path,
    line_num: usize,
) -> Result<Option<LabelRecord<'a>>, BerryscanError> {
    let mut tokens = line.split_whitespace();
    let Some(class_token) = tokens.next() else {
        return Ok(None);
    };

    let class_id = class_token
        .parse::<usize>()
        .map_err(|_| BerryscanError::LabelParse {
            path: path.to_path_buf(),
            line: line_num,
            message: format!("invalid class index '{class_token}'; expected non-negative integer"),
        })?;

    Ok(Some(LabelRecord {
        class_id,
        geometry: tokens.collect(),
    }))
}

/// Statistics from rewriting one label file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RemapStats {
    pub lines: usize,
    pub changed: usize,
}

/// Rewrites every class index in `content` through `mapping`.
///
/// The whole text is processed before anything is returned, so a bad line
/// anywhere fails the file as a unit. Blank lines are dropped and every
/// output line ends with `\n`.
pub fn remap_label_text(
    content: &str,
    mapping: &IndexMapping,
    policy: RemapPolicy,
    path: &Path,
) -> Result<(String, RemapStats), BerryscanError> {
    let mut out = String::with_capacity(content.len());
    let mut stats = RemapStats::default();

    for (line_idx, line) in content.lines().enumerate() {
        let line_num = line_idx + 1;
        let Some(mut record) = parse_label_line(line, path, line_num)? else {
            continue;
        };

        let new_id = match (mapping.get(record.class_id), policy) {
            (Some(id), _) => id,
            (None, RemapPolicy::PassThrough) => record.class_id,
            (None, RemapPolicy::Strict) => {
                return Err(BerryscanError::LabelClassOutOfDomain {
                    path: path.to_path_buf(),
                    line: line_num,
                    class_id: record.class_id,
                })
            }
        };

        if new_id != record.class_id {
            stats.changed += 1;
        }
        record.class_id = new_id;
        stats.lines += 1;

        out.push_str(&record.to_line());
        out.push('\n');
    }

    Ok((out, stats))
}

/// Reads `path` and returns its remapped text without touching the file.
pub fn remap_label_file(
    path: &Path,
    mapping: &IndexMapping,
    policy: RemapPolicy,
) -> Result<(String, RemapStats), BerryscanError> {
    let content = fs::read_to_string(path).map_err(BerryscanError::Io)?;
    remap_label_text(&content, mapping, policy, path)
}

/// Fuzz-only entrypoint for single-line label remapping.
#[cfg(feature = "fuzzing")]
pub fn fuzz_remap_label_line(input: &str) -> Result<(), BerryscanError> {
    let mapping: IndexMapping = (0..16).map(|i| (i, 15 - i)).collect();
    let _ = remap_label_text(input, &mapping, RemapPolicy::Strict, Path::new("<fuzz>"))?;
    Ok(())
}
