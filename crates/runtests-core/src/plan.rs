//! Dependency build planning.

use crate::layout::VALIDATION_TEST_SUBDIR_PREFIX;
use crate::target::DeploymentTarget;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Targets always built first, in this order.
pub const BASE_TARGETS: [&str; 2] = ["all", "SwiftUnitTests"];

const VALIDATION_STDLIB_PREFIX: &str = "swift-stdlib-";
const STANDARD_STDLIB_PREFIX: &str = "swift-test-stdlib-";
const UPLOAD_STDLIB_PREFIX: &str = "upload-stdlib-";

/// Build targets for the two build-driver calls.
///
/// The upload-stdlib targets are a separate call so a failure in either
/// one is attributed to its own stage, and the second never runs if the
/// first fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyTargetSet {
    /// First call: base targets then one stdlib target per deployment target.
    pub dependencies: Vec<String>,

    /// Second call: one upload-stdlib target per deployment target.
    pub upload_stdlib: Vec<String>,

    /// Whether any resolved path is in the validation tier.
    pub needs_validation: bool,
}

impl DependencyTargetSet {
    /// Plan targets for `targets` given the final resolved test paths.
    pub fn plan(targets: &[DeploymentTarget], resolved_paths: &[PathBuf]) -> Self {
        let needs_validation = resolved_paths.iter().any(|p| is_validation_path(p));
        let stdlib_prefix = if needs_validation {
            VALIDATION_STDLIB_PREFIX
        } else {
            STANDARD_STDLIB_PREFIX
        };

        let mut dependencies: Vec<String> = BASE_TARGETS.iter().map(|t| t.to_string()).collect();
        let mut upload_stdlib = Vec::with_capacity(targets.len());
        for target in targets {
            dependencies.push(format!("{stdlib_prefix}{target}"));
            upload_stdlib.push(format!("{UPLOAD_STDLIB_PREFIX}{target}"));
        }

        Self {
            dependencies,
            upload_stdlib,
            needs_validation,
        }
    }
}

/// True if some component of `path` is a `validation-test-<target>` directory.
pub fn is_validation_path(path: &Path) -> bool {
    path.components().any(|component| {
        component
            .as_os_str()
            .to_str()
            .is_some_and(|name| name.starts_with(VALIDATION_TEST_SUBDIR_PREFIX))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(names: &[&str]) -> Vec<DeploymentTarget> {
        names.iter().map(|n| DeploymentTarget::new(*n)).collect()
    }

    #[test]
    fn test_standard_paths_use_test_stdlib() {
        let plan = DependencyTargetSet::plan(
            &targets(&["A", "B"]),
            &[PathBuf::from("/b/test-A/Sema"), PathBuf::from("/b/test-B/Sema")],
        );
        assert!(!plan.needs_validation);
        assert_eq!(
            plan.dependencies,
            ["all", "SwiftUnitTests", "swift-test-stdlib-A", "swift-test-stdlib-B"]
        );
        assert_eq!(plan.upload_stdlib, ["upload-stdlib-A", "upload-stdlib-B"]);
    }

    #[test]
    fn test_validation_paths_use_full_stdlib() {
        let plan = DependencyTargetSet::plan(
            &targets(&["A", "B"]),
            &[
                PathBuf::from("/b/test-A/Sema"),
                PathBuf::from("/b/validation-test-A/stdlib"),
            ],
        );
        assert!(plan.needs_validation);
        assert_eq!(
            plan.dependencies,
            ["all", "SwiftUnitTests", "swift-stdlib-A", "swift-stdlib-B"]
        );
        assert_eq!(plan.upload_stdlib, ["upload-stdlib-A", "upload-stdlib-B"]);
    }

    #[test]
    fn test_duplicate_targets_are_kept() {
        let plan = DependencyTargetSet::plan(&targets(&["A", "A"]), &[]);
        assert_eq!(
            plan.dependencies,
            ["all", "SwiftUnitTests", "swift-test-stdlib-A", "swift-test-stdlib-A"]
        );
        assert_eq!(plan.upload_stdlib.len(), 2);
    }

    #[test]
    fn test_validation_source_dir_is_not_a_validation_build_path() {
        // The source tree root is `validation-test`, without a target suffix.
        assert!(!is_validation_path(Path::new("/src/swift/validation-test/x")));
        assert!(is_validation_path(Path::new("/b/validation-test-linux-x86_64")));
        assert!(!is_validation_path(Path::new("/b/my-validation-test-x")));
    }
}
