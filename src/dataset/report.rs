//! Reports for dataset combine and relabel runs.
//!
//! A combine run touches three splits independently; the report records what
//! happened to each one so that a partial run can be finished by hand.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use super::manifest::IndexMapping;

/// Outcome of combining one dataset into another.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CombineReport {
    pub source: PathBuf,
    pub target: PathBuf,
    pub splits: Vec<SplitReport>,
}

impl CombineReport {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            splits: Vec::new(),
        }
    }

    /// Number of splits whose manifest merge failed.
    pub fn failed_split_count(&self) -> usize {
        self.splits
            .iter()
            .filter(|s| s.status == SplitStatus::Failed)
            .count()
    }

    /// Number of individual files that could not be moved.
    pub fn failed_file_count(&self) -> usize {
        self.splits.iter().map(|s| s.failures.len()).sum()
    }

    /// Total image/label pairs (or lone images) moved.
    pub fn moved_count(&self) -> usize {
        self.splits.iter().map(|s| s.moved).sum()
    }

    /// Returns true if every split completed without file failures.
    pub fn is_complete(&self) -> bool {
        self.failed_split_count() == 0 && self.failed_file_count() == 0
    }
}

impl fmt::Display for CombineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Combined {} into {}",
            self.source.display(),
            self.target.display()
        )?;

        for split in &self.splits {
            writeln!(f)?;
            write!(f, "{}", split)?;
        }

        writeln!(f)?;
        writeln!(
            f,
            "{} file(s) moved, {} failed split(s), {} failed file(s)",
            self.moved_count(),
            self.failed_split_count(),
            self.failed_file_count()
        )
    }
}

/// What happened to one split (`train`, `valid` or `test`).
#[derive(Clone, Debug, Serialize)]
pub struct SplitReport {
    pub split: String,
    pub status: SplitStatus,
    /// Present once the manifest merge for this split succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping: Option<IndexMapping>,
    pub moved: usize,
    /// Images moved without a label file.
    pub unlabeled: Vec<String>,
    pub failures: Vec<FileFailure>,
    /// Things that went wrong without stopping a move.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    /// Why the split was skipped or failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl SplitReport {
    pub fn new(split: impl Into<String>) -> Self {
        Self {
            split: split.into(),
            status: SplitStatus::Completed,
            mapping: None,
            moved: 0,
            unlabeled: Vec::new(),
            failures: Vec::new(),
            notes: Vec::new(),
            reason: None,
        }
    }

    pub fn skipped(split: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status: SplitStatus::Skipped,
            reason: Some(reason.into()),
            ..Self::new(split)
        }
    }

    pub fn failed(split: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            status: SplitStatus::Failed,
            reason: Some(reason.into()),
            ..Self::new(split)
        }
    }
}

impl fmt::Display for SplitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self.status {
            SplitStatus::Completed => "completed",
            SplitStatus::Skipped => "skipped",
            SplitStatus::Failed => "FAILED",
        };
        write!(f, "[{}] {}", self.split, status)?;
        if let Some(reason) = &self.reason {
            write!(f, ": {}", reason)?;
        }
        writeln!(f)?;

        if let Some(mapping) = &self.mapping {
            writeln!(f, "  class mapping: {}", mapping)?;
        }
        if self.status == SplitStatus::Completed {
            writeln!(f, "  moved: {}", self.moved)?;
        }
        if !self.unlabeled.is_empty() {
            writeln!(f, "  moved without label ({}):", self.unlabeled.len())?;
            for name in &self.unlabeled {
                writeln!(f, "    - {}", name)?;
            }
        }
        if !self.notes.is_empty() {
            writeln!(f, "  notes ({}):", self.notes.len())?;
            for note in &self.notes {
                writeln!(f, "    - {}", note)?;
            }
        }
        if !self.failures.is_empty() {
            writeln!(f, "  failures ({}):", self.failures.len())?;
            for failure in &self.failures {
                writeln!(f, "    - {}: {}", failure.file, failure.message)?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStatus {
    Completed,
    /// The source dataset has no such split.
    Skipped,
    /// The manifest merge failed; no file of this split was moved.
    Failed,
}

/// A single file that could not be moved.
#[derive(Clone, Debug, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub message: String,
}

/// Outcome of rewriting label files in place.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RelabelReport {
    pub root: PathBuf,
    pub files_rewritten: usize,
    pub lines_changed: usize,
    pub splits_missing: Vec<String>,
}

impl fmt::Display for RelabelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Relabeled {}: {} file(s) rewritten, {} line(s) changed",
            self.root.display(),
            self.files_rewritten,
            self.lines_changed
        )?;
        if !self.splits_missing.is_empty() {
            writeln!(f, "  missing splits: {}", self.splits_missing.join(", "))?;
        }
        Ok(())
    }
}
