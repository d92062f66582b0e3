//! Image discovery shared by the dataset mover and the batch predictor.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::BerryscanError;

/// File extensions treated as images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// Extension of YOLO label files.
pub const LABEL_EXTENSION: &str = "txt";

/// Returns true if `path` has one of `allowed` as its extension.
pub fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    allowed
        .iter()
        .any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext))
}

/// Collects image files under `root`, sorted by relative path.
///
/// With `recursive == false` only the direct children of `root` are listed.
pub fn collect_images(root: &Path, recursive: bool) -> Result<Vec<PathBuf>, BerryscanError> {
    let mut walker = WalkDir::new(root).min_depth(1).follow_links(true);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| BerryscanError::DatasetLayoutInvalid {
            path: root.to_path_buf(),
            message: format!("failed while traversing directory: {source}"),
        })?;

        if entry.file_type().is_file() && has_extension(entry.path(), &IMAGE_EXTENSIONS) {
            files.push(entry.into_path());
        }
    }

    files.sort_by_cached_key(|path| rel_string(root, path));
    Ok(files)
}

/// Path of `path` relative to `root`, with forward slashes.
pub fn rel_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn has_extension_ignores_case() {
        assert!(has_extension(Path::new("a/IMG_01.JPG"), &IMAGE_EXTENSIONS));
        assert!(!has_extension(Path::new("a/notes.txt"), &IMAGE_EXTENSIONS));
        assert!(!has_extension(Path::new("a/no_extension"), &IMAGE_EXTENSIONS));
    }

    #[test]
    fn collect_images_sorts_and_respects_depth() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(temp.path().join("leaf spot")).expect("create subdir");
        fs::write(temp.path().join("b.png"), b"x").expect("write b");
        fs::write(temp.path().join("a.jpg"), b"x").expect("write a");
        fs::write(temp.path().join("readme.md"), b"x").expect("write readme");
        fs::write(temp.path().join("leaf spot/c.jpeg"), b"x").expect("write c");

        let flat = collect_images(temp.path(), false).expect("collect flat");
        let flat: Vec<String> = flat.iter().map(|p| rel_string(temp.path(), p)).collect();
        assert_eq!(flat, vec!["a.jpg", "b.png"]);

        let deep = collect_images(temp.path(), true).expect("collect recursive");
        let deep: Vec<String> = deep.iter().map(|p| rel_string(temp.path(), p)).collect();
        assert_eq!(deep, vec!["a.jpg", "b.png", "leaf spot/c.jpeg"]);
    }
}
