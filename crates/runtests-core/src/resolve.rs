//! Build directory resolution.
//!
//! The build directory is found by walking an ordered list of candidate
//! strategies and stopping at the first candidate the classifier accepts:
//!
//! - explicit mode (`--build-dir` given): the directory itself, then its
//!   `swift-<host>` subdirectory
//! - inferred mode: every ancestor of the first test path's parent, nearest
//!   first, stopping before the filesystem root
//!
//! Each strategy yields a finite sequence bounded by path depth.

use crate::classify::BuildDirectory;
use crate::config::RunConfiguration;
use crate::error::{Result, RunTestsError};
use crate::layout::{absolutize, SourceLayout, BUILD_SUBDIR_PREFIX};
use crate::target::DeploymentTarget;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One way of proposing build directory candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStrategy {
    /// The path itself.
    Direct(PathBuf),

    /// `<path>/swift-<host>`.
    HostSubdirectory(PathBuf),

    /// `<path>`, then each parent up to (not including) the root.
    UpwardWalk(PathBuf),
}

impl SearchStrategy {
    /// Candidates proposed by this strategy, nearest first.
    pub fn candidates<'a>(
        &'a self,
        host: &'a DeploymentTarget,
    ) -> Box<dyn Iterator<Item = PathBuf> + 'a> {
        match self {
            SearchStrategy::Direct(path) => Box::new(std::iter::once(path.clone())),
            SearchStrategy::HostSubdirectory(path) => Box::new(std::iter::once(
                path.join(format!("{BUILD_SUBDIR_PREFIX}{host}")),
            )),
            SearchStrategy::UpwardWalk(start) => Box::new(
                start
                    .ancestors()
                    .take_while(|dir| dir.parent().is_some())
                    .map(Path::to_path_buf),
            ),
        }
    }
}

/// Evaluate strategies lazily, returning the first accepted candidate.
pub fn first_match(
    strategies: &[SearchStrategy],
    host: &DeploymentTarget,
) -> Option<BuildDirectory> {
    strategies
        .iter()
        .flat_map(|strategy| strategy.candidates(host))
        .find_map(|candidate| {
            debug!(candidate = %candidate.display(), "Checking build directory candidate");
            BuildDirectory::classify(&candidate, host)
        })
}

/// Outcome of resolution: the build directory and the effective test paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// `None` only in inferred mode with the build skipped and no match.
    pub build_directory: Option<BuildDirectory>,

    /// Requested paths, defaulted in explicit mode, not yet normalized.
    pub paths: Vec<PathBuf>,
}

/// Resolve the build directory for this run.
pub fn resolve(
    config: &RunConfiguration,
    layout: &SourceLayout,
    host: &DeploymentTarget,
) -> Result<Resolution> {
    match config.build_dir() {
        Some(explicit) => resolve_explicit(explicit, config, layout, host),
        None => resolve_inferred(config, host),
    }
}

fn resolve_explicit(
    explicit: &Path,
    config: &RunConfiguration,
    layout: &SourceLayout,
    host: &DeploymentTarget,
) -> Result<Resolution> {
    let candidate = absolutize(explicit)?;
    let strategies = [
        SearchStrategy::Direct(candidate.clone()),
        SearchStrategy::HostSubdirectory(candidate),
    ];

    let build = first_match(&strategies, host)
        .ok_or_else(|| RunTestsError::NotABuildDirectory(explicit.to_path_buf()))?;
    info!(build_dir = %build.path.display(), "Using build directory");

    let paths = if config.paths().is_empty() {
        vec![layout.test_root.clone()]
    } else {
        config.paths().to_vec()
    };

    Ok(Resolution {
        build_directory: Some(build),
        paths,
    })
}

fn resolve_inferred(config: &RunConfiguration, host: &DeploymentTarget) -> Result<Resolution> {
    let first = config.paths().first().ok_or_else(|| {
        RunTestsError::Configuration(
            "too few arguments: give at least one test path or --build-dir".to_string(),
        )
    })?;

    let absolute = absolutize(first)?;
    let strategies: Vec<SearchStrategy> = absolute
        .parent()
        .map(|dir| SearchStrategy::UpwardWalk(dir.to_path_buf()))
        .into_iter()
        .collect();

    let build_directory = match first_match(&strategies, host) {
        Some(build) => {
            info!(build_dir = %build.path.display(), "Inferred build directory");
            Some(build)
        }
        None if config.build_policy().is_skip() => {
            debug!(path = %first.display(), "No build directory found; not needed with build skipped");
            None
        }
        None => return Err(RunTestsError::CannotInferBuildDirectory(first.clone())),
    };

    Ok(Resolution {
        build_directory,
        paths: config.paths().to_vec(),
    })
}
