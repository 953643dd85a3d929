//! Fixed source and build tree layout.
//!
//! Everything here is computed once at startup from the source directory
//! and handed to the components by reference. No component looks at the
//! process environment on its own.

use crate::error::Result;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// File whose presence marks a configured build directory.
pub const BUILD_CACHE_MARKER: &str = "CMakeCache.txt";

/// Project file left behind by the unsupported IDE generator.
pub const UNSUPPORTED_GENERATOR_ARTIFACT: &str = "Swift.xcodeproj";

/// Prefix of the per-target test output directory (`test-<target>`).
pub const TEST_SUBDIR_PREFIX: &str = "test-";

/// Prefix of the per-target validation output directory.
pub const VALIDATION_TEST_SUBDIR_PREFIX: &str = "validation-test-";

/// Prefix of the per-host build subdirectory tried in explicit mode.
pub const BUILD_SUBDIR_PREFIX: &str = "swift-";

/// Results file written by the test engine inside the result directory.
pub const RESULTS_FILE_NAME: &str = "lit-tests.xml";

/// Coverage-merge worker log inside the result directory.
pub const COVERAGE_LOG_FILE_NAME: &str = "profdata_merge.log";

/// Source and tool locations for one checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLayout {
    /// Root of the source checkout.
    pub source_dir: PathBuf,

    /// Root of the standard test tree.
    pub test_root: PathBuf,

    /// Root of the validation test tree.
    pub validation_test_root: PathBuf,

    /// Default test-engine script.
    pub default_lit: PathBuf,

    /// Coverage-merge worker entry point.
    pub coverage_worker: PathBuf,
}

impl SourceLayout {
    /// Derive every location from the source checkout root.
    pub fn new(source_dir: &Path) -> Result<Self> {
        let source_dir = absolutize(source_dir)?;
        Ok(Self {
            test_root: source_dir.join("test"),
            validation_test_root: source_dir.join("validation-test"),
            default_lit: absolutize(
                &source_dir.join("../llvm-project/llvm/utils/lit/lit.py"),
            )?,
            coverage_worker: source_dir.join("utils/profdata_merge/main.py"),
            source_dir,
        })
    }

    /// `(source root, build subdirectory prefix)` pairs, standard tree first.
    pub fn test_trees(&self) -> [(&Path, &'static str); 2] {
        [
            (self.test_root.as_path(), TEST_SUBDIR_PREFIX),
            (
                self.validation_test_root.as_path(),
                VALIDATION_TEST_SUBDIR_PREFIX,
            ),
        ]
    }
}

/// Make `path` absolute and fold `.` and `..` lexically.
///
/// Symlinks are not resolved, so this never touches the filesystem for
/// paths that are already absolute.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut out = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_from_source_dir() {
        let layout = SourceLayout::new(Path::new("/src/swift")).unwrap();
        assert_eq!(layout.source_dir, PathBuf::from("/src/swift"));
        assert_eq!(layout.test_root, PathBuf::from("/src/swift/test"));
        assert_eq!(
            layout.validation_test_root,
            PathBuf::from("/src/swift/validation-test")
        );
        assert_eq!(
            layout.default_lit,
            PathBuf::from("/src/llvm-project/llvm/utils/lit/lit.py")
        );
        assert_eq!(
            layout.coverage_worker,
            PathBuf::from("/src/swift/utils/profdata_merge/main.py")
        );
    }

    #[test]
    fn test_absolutize_folds_dots() {
        assert_eq!(
            absolutize(Path::new("/a/./b/../c/")).unwrap(),
            PathBuf::from("/a/c")
        );
        assert_eq!(absolutize(Path::new("/..")).unwrap(), PathBuf::from("/"));
    }

    #[test]
    fn test_absolutize_relative_uses_cwd() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolutize(Path::new("x/y")).unwrap(), cwd.join("x/y"));
    }

    #[test]
    fn test_trees_order() {
        let layout = SourceLayout::new(Path::new("/src/swift")).unwrap();
        let trees = layout.test_trees();
        assert_eq!(trees[0].1, "test-");
        assert_eq!(trees[1].1, "validation-test-");
    }
}
