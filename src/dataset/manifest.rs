//! Dataset manifests (`data.yaml`) and class-space merging.
//!
//! A manifest's `names` list defines the dataset's class-index space: the
//! position of a name is the class index used in every label file. Merging two
//! datasets means building one list that covers both and a mapping that moves
//! the source dataset's indices onto it.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use super::normalize::normalize_name;
use crate::error::BerryscanError;

/// File name of the manifest at the root of a dataset.
pub const MANIFEST_FILE: &str = "data.yaml";

/// A parsed `data.yaml`.
///
/// The split path fields and any extra keys are carried as raw YAML so that
/// rewriting the manifest never changes them.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct DatasetManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub val: Option<serde_yaml::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<serde_yaml::Value>,
    #[serde(deserialize_with = "deserialize_names")]
    pub names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nc: Option<usize>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Highest class index accepted in an index-keyed `names` mapping.
const MAX_CLASS_INDEX: usize = 65_535;

#[derive(Deserialize)]
#[serde(untagged)]
enum DataYamlNames {
    Sequence(Vec<String>),
    Mapping(BTreeMap<usize, String>),
}

fn deserialize_names<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let names = match DataYamlNames::deserialize(deserializer)? {
        DataYamlNames::Sequence(names) => names,
        DataYamlNames::Mapping(mapping) => {
            let len = mapping.keys().next_back().map_or(0, |max| max + 1);
            if len > MAX_CLASS_INDEX + 1 {
                return Err(serde::de::Error::custom(format!(
                    "class index {} exceeds the supported maximum of {MAX_CLASS_INDEX}",
                    len - 1
                )));
            }
            let mut names: Vec<String> = (0..len).map(|i| format!("class_{i}")).collect();
            for (index, name) in mapping {
                if !name.trim().is_empty() {
                    names[index] = name;
                }
            }
            names
        }
    };
    Ok(names)
}

impl DatasetManifest {
    /// Reads the manifest stored at `path`.
    pub fn read(path: &Path) -> Result<Self, BerryscanError> {
        let data = fs::read_to_string(path).map_err(BerryscanError::Io)?;
        let manifest: Self =
            serde_yaml::from_str(&data).map_err(|source| BerryscanError::ManifestParse {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some(nc) = manifest.nc {
            if nc != manifest.names.len() {
                log::warn!(
                    "{}: nc is {} but {} name(s) are listed; using the names",
                    path.display(),
                    nc,
                    manifest.names.len()
                );
            }
        }

        Ok(manifest)
    }

    /// Reads `<root>/data.yaml`.
    pub fn read_from_root(root: &Path) -> Result<Self, BerryscanError> {
        Self::read(&root.join(MANIFEST_FILE))
    }

    /// Writes the manifest to `path`, replacing whatever is there.
    pub fn write(&self, path: &Path) -> Result<(), BerryscanError> {
        let yaml = serde_yaml::to_string(self).map_err(|source| BerryscanError::ManifestWrite {
            path: path.to_path_buf(),
            source,
        })?;
        super::fsutil::replace_file(path, yaml.as_bytes())
    }

    /// Returns a copy with `names` replaced and `nc` set to match.
    pub fn with_names(&self, names: Vec<String>) -> Self {
        Self {
            nc: Some(names.len()),
            names,
            ..self.clone()
        }
    }
}

/// Fuzz-only entrypoint for manifest parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_manifest(yaml: &str) -> Result<(), BerryscanError> {
    let manifest: DatasetManifest =
        serde_yaml::from_str(yaml).map_err(|source| BerryscanError::ManifestParse {
            path: Path::new("<fuzz>").to_path_buf(),
            source,
        })?;
    let _ = merge_class_names(&manifest.names, &manifest.names)?;
    Ok(())
}

/// Mapping from source class index to target class index.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IndexMapping(BTreeMap<usize, usize>);

impl IndexMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: usize, to: usize) -> Option<usize> {
        self.0.insert(from, to)
    }

    #[inline]
    pub fn get(&self, from: usize) -> Option<usize> {
        self.0.get(&from).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true when every index maps to itself.
    pub fn is_identity(&self) -> bool {
        self.0.iter().all(|(from, to)| from == to)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.iter().map(|(from, to)| (*from, *to))
    }
}

impl FromIterator<(usize, usize)> for IndexMapping {
    fn from_iter<I: IntoIterator<Item = (usize, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for IndexMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (from, to) in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{from}->{to}")?;
            first = false;
        }
        Ok(())
    }
}

/// Result of merging a source class list into a target class list.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ManifestMerge {
    /// Target names in their original order, followed by new source names.
    pub names: Vec<String>,
    /// Source index to merged index, total over the source names.
    pub mapping: IndexMapping,
    /// Source names that were not already present (original spelling).
    pub appended: Vec<String>,
}

/// Merges `source` class names into `target`.
///
/// Names are compared by [`normalize_name`]. A source name missing from the
/// merged list is appended in its original spelling, in source order; names
/// already present keep the target's spelling and index.
pub fn merge_class_names(
    target: &[String],
    source: &[String],
) -> Result<ManifestMerge, BerryscanError> {
    let mut names = target.to_vec();
    let mut seen: Vec<String> = names.iter().map(|name| normalize_name(name)).collect();
    let mut appended = Vec::new();

    for name in source {
        let normalized = normalize_name(name);
        if !seen.contains(&normalized) {
            names.push(name.clone());
            appended.push(name.clone());
            seen.push(normalized);
        }
    }

    let mapping = index_mapping(source, &names)?;

    Ok(ManifestMerge {
        names,
        mapping,
        appended,
    })
}

/// Maps each source index onto the first merged name with the same
/// normalized form.
///
/// Fails with [`BerryscanError::ClassNotInManifest`] on the first source name
/// that has no counterpart; no partial mapping is returned.
pub fn index_mapping(source: &[String], merged: &[String]) -> Result<IndexMapping, BerryscanError> {
    let merged_normalized: Vec<String> = merged.iter().map(|name| normalize_name(name)).collect();

    source
        .iter()
        .enumerate()
        .map(|(index, name)| {
            let normalized = normalize_name(name);
            merged_normalized
                .iter()
                .position(|candidate| *candidate == normalized)
                .map(|target_index| (index, target_index))
                .ok_or_else(|| BerryscanError::ClassNotInManifest { name: name.clone() })
        })
        .collect()
}
