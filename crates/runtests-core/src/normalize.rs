//! Source-tree to build-tree test path mapping.

use crate::error::Result;
use crate::layout::{absolutize, SourceLayout};
use crate::target::DeploymentTarget;
use std::path::{Path, PathBuf};

/// Map `path` from a source test tree into `build_dir` for `variant`.
///
/// `<root>/a/b` becomes `<build_dir>/<prefix><variant>/a/b` for the first
/// tree whose root contains `path`; the root itself maps to the bare
/// subdirectory. Containment compares whole components, so a sibling
/// like `<source>/test-extra` is left alone. Anything outside both trees
/// is returned unchanged.
pub fn normalize(
    path: &Path,
    layout: &SourceLayout,
    build_dir: &Path,
    variant: &DeploymentTarget,
) -> Result<PathBuf> {
    let absolute = absolutize(path)?;

    for (root, prefix) in layout.test_trees() {
        if let Ok(relative) = absolute.strip_prefix(root) {
            let mut mapped = build_dir.join(format!("{prefix}{variant}"));
            if !relative.as_os_str().is_empty() {
                mapped.push(relative);
            }
            return Ok(mapped);
        }
    }

    Ok(path.to_path_buf())
}

/// Normalize every path for every target, target-major.
///
/// N targets yield N entries per requested path; nothing is deduplicated.
pub fn normalize_all(
    paths: &[PathBuf],
    layout: &SourceLayout,
    build_dir: Option<&Path>,
    targets: &[DeploymentTarget],
) -> Result<Vec<PathBuf>> {
    let mut resolved = Vec::with_capacity(paths.len() * targets.len());
    for target in targets {
        for path in paths {
            resolved.push(match build_dir {
                Some(dir) => normalize(path, layout, dir, target)?,
                None => path.clone(),
            });
        }
    }
    Ok(resolved)
}
