//! Build directory recognition.

use crate::layout::{BUILD_CACHE_MARKER, TEST_SUBDIR_PREFIX, UNSUPPORTED_GENERATOR_ARTIFACT};
use crate::target::DeploymentTarget;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Which project generator produced a build directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    /// Makefiles / Ninja; dependency builds are supported.
    Standard,

    /// IDE project; dependency builds are skipped with a warning.
    UnsupportedIdeProject,
}

/// A validated build directory. Never mutated after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildDirectory {
    /// Absolute path.
    pub path: PathBuf,

    /// Host target it was validated against.
    pub host_target: DeploymentTarget,

    pub generator: GeneratorKind,
}

impl BuildDirectory {
    /// Classify `path`, returning `None` if it is not a build directory.
    pub fn classify(path: &Path, host_target: &DeploymentTarget) -> Option<Self> {
        if !is_build_directory(path, host_target) {
            return None;
        }
        let generator = if is_unsupported_generator_layout(path) {
            GeneratorKind::UnsupportedIdeProject
        } else {
            GeneratorKind::Standard
        };
        Some(Self {
            path: path.to_path_buf(),
            host_target: host_target.clone(),
            generator,
        })
    }

    pub fn supports_dependency_build(&self) -> bool {
        self.generator == GeneratorKind::Standard
    }
}

/// True iff the cache marker file and `test-<host>` directory both exist
/// directly under `path`.
pub fn is_build_directory(path: &Path, host_target: &DeploymentTarget) -> bool {
    let test_dir = path.join(format!("{TEST_SUBDIR_PREFIX}{host_target}"));
    path.join(BUILD_CACHE_MARKER).is_file() && test_dir.is_dir()
}

/// True iff the IDE project artifact exists under `path`.
pub fn is_unsupported_generator_layout(path: &Path) -> bool {
    path.join(UNSUPPORTED_GENERATOR_ARTIFACT).exists()
}
