//! Run configuration: the user's choices, validated once.

use crate::error::{Result, RunTestsError};
use crate::layout::absolutize;
use crate::target::DeploymentTarget;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Optimization mode passed to the test engine as `swift_test_mode`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TestMode {
    #[default]
    OptimizeNone,
    Optimize,
    OptimizeUnchecked,
    OnlyExecutable,
    OnlyNonExecutable,
}

impl TestMode {
    pub const NAMES: [&'static str; 5] = [
        "optimize_none",
        "optimize",
        "optimize_unchecked",
        "only_executable",
        "only_non_executable",
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestMode::OptimizeNone => "optimize_none",
            TestMode::Optimize => "optimize",
            TestMode::OptimizeUnchecked => "optimize_unchecked",
            TestMode::OnlyExecutable => "only_executable",
            TestMode::OnlyNonExecutable => "only_non_executable",
        }
    }
}

impl FromStr for TestMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "optimize_none" => Ok(TestMode::OptimizeNone),
            "optimize" => Ok(TestMode::Optimize),
            "optimize_unchecked" => Ok(TestMode::OptimizeUnchecked),
            "only_executable" => Ok(TestMode::OnlyExecutable),
            "only_non_executable" => Ok(TestMode::OnlyNonExecutable),
            other => Err(format!("unknown test mode: {other}")),
        }
    }
}

/// Test subset passed to the test engine as `swift_test_subset`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TestSubset {
    #[default]
    Primary,
    Validation,
    All,
    OnlyValidation,
    OnlyLong,
}

impl TestSubset {
    pub const NAMES: [&'static str; 5] =
        ["primary", "validation", "all", "only_validation", "only_long"];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestSubset::Primary => "primary",
            TestSubset::Validation => "validation",
            TestSubset::All => "all",
            TestSubset::OnlyValidation => "only_validation",
            TestSubset::OnlyLong => "only_long",
        }
    }
}

impl FromStr for TestSubset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "primary" => Ok(TestSubset::Primary),
            "validation" => Ok(TestSubset::Validation),
            "all" => Ok(TestSubset::All),
            "only_validation" => Ok(TestSubset::OnlyValidation),
            "only_long" => Ok(TestSubset::OnlyLong),
            other => Err(format!("unknown test subset: {other}")),
        }
    }
}

/// Whether and how to build test dependencies first.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuildPolicy {
    /// Build quietly (`true` on the command line).
    #[default]
    Build,
    /// Build with the driver's verbose flag.
    Verbose,
    /// Do not build.
    Skip,
}

impl BuildPolicy {
    pub const NAMES: [&'static str; 3] = ["true", "verbose", "skip"];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildPolicy::Build => "true",
            BuildPolicy::Verbose => "verbose",
            BuildPolicy::Skip => "skip",
        }
    }

    pub fn is_skip(&self) -> bool {
        *self == BuildPolicy::Skip
    }
}

impl FromStr for BuildPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "true" => Ok(BuildPolicy::Build),
            "verbose" => Ok(BuildPolicy::Verbose),
            "skip" => Ok(BuildPolicy::Skip),
            other => Err(format!("unknown build policy: {other}")),
        }
    }
}

/// Raw options as collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub paths: Vec<PathBuf>,
    pub build_dir: Option<PathBuf>,
    pub build: BuildPolicy,
    pub targets: Vec<DeploymentTarget>,
    pub mode: TestMode,
    pub subset: TestSubset,
    pub verbose: bool,
    pub params: Vec<String>,
    pub result_dir: Option<PathBuf>,
    pub merge_coverage: bool,
}

/// Immutable snapshot of every user choice for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfiguration {
    paths: Vec<PathBuf>,
    build_dir: Option<PathBuf>,
    build: BuildPolicy,
    targets: Vec<DeploymentTarget>,
    mode: TestMode,
    subset: TestSubset,
    verbose: bool,
    params: Vec<String>,
    result_dir: Option<PathBuf>,
    merge_coverage: bool,
}

impl RunConfiguration {
    /// Validate options and fill defaults.
    ///
    /// Targets default to `host`. Coverage merging without a result
    /// directory is rejected here, before anything touches the disk.
    pub fn new(options: RunOptions, host: &DeploymentTarget) -> Result<Self> {
        if options.merge_coverage && options.result_dir.is_none() {
            return Err(RunTestsError::Configuration(
                "--result-dir is required when --merge-coverage is set".to_string(),
            ));
        }

        let targets = if options.targets.is_empty() {
            vec![host.clone()]
        } else {
            options.targets
        };

        let result_dir = options
            .result_dir
            .as_deref()
            .map(absolutize)
            .transpose()?;

        Ok(Self {
            paths: options.paths,
            build_dir: options.build_dir,
            build: options.build,
            targets,
            mode: options.mode,
            subset: options.subset,
            verbose: options.verbose,
            params: options.params,
            result_dir,
            merge_coverage: options.merge_coverage,
        })
    }

    /// Test paths exactly as the user gave them.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Explicit build directory candidate, if any.
    pub fn build_dir(&self) -> Option<&Path> {
        self.build_dir.as_deref()
    }

    pub fn build_policy(&self) -> BuildPolicy {
        self.build
    }

    /// Deployment targets, never empty.
    pub fn targets(&self) -> &[DeploymentTarget] {
        &self.targets
    }

    pub fn mode(&self) -> TestMode {
        self.mode
    }

    pub fn subset(&self) -> TestSubset {
        self.subset
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// User `key=value` parameters, verbatim and in order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Absolute result directory, if configured.
    pub fn result_dir(&self) -> Option<&Path> {
        self.result_dir.as_deref()
    }

    pub fn merge_coverage(&self) -> bool {
        self.merge_coverage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> DeploymentTarget {
        DeploymentTarget::new("linux-x86_64")
    }

    #[test]
    fn test_defaults() {
        let config = RunConfiguration::new(RunOptions::default(), &host()).unwrap();
        assert_eq!(config.mode(), TestMode::OptimizeNone);
        assert_eq!(config.subset(), TestSubset::Primary);
        assert_eq!(config.build_policy(), BuildPolicy::Build);
        assert_eq!(config.targets(), &[host()]);
        assert!(!config.verbose());
        assert!(config.result_dir().is_none());
    }

    #[test]
    fn test_explicit_targets_replace_host() {
        let options = RunOptions {
            targets: vec![DeploymentTarget::new("iphoneos-arm64")],
            ..Default::default()
        };
        let config = RunConfiguration::new(options, &host()).unwrap();
        assert_eq!(config.targets(), &[DeploymentTarget::new("iphoneos-arm64")]);
    }

    #[test]
    fn test_coverage_requires_result_dir() {
        let options = RunOptions {
            merge_coverage: true,
            ..Default::default()
        };
        let err = RunConfiguration::new(options, &host()).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("--result-dir"));
    }

    #[test]
    fn test_coverage_with_result_dir_is_valid() {
        let options = RunOptions {
            merge_coverage: true,
            result_dir: Some(PathBuf::from("/tmp/results")),
            ..Default::default()
        };
        let config = RunConfiguration::new(options, &host()).unwrap();
        assert!(config.merge_coverage());
        assert_eq!(config.result_dir(), Some(Path::new("/tmp/results")));
    }

    #[test]
    fn test_relative_result_dir_is_made_absolute() {
        let options = RunOptions {
            result_dir: Some(PathBuf::from("results")),
            ..Default::default()
        };
        let config = RunConfiguration::new(options, &host()).unwrap();
        assert!(config.result_dir().unwrap().is_absolute());
    }

    #[test]
    fn test_enum_names_round_trip() {
        for name in TestMode::NAMES {
            assert_eq!(name.parse::<TestMode>().unwrap().as_str(), name);
        }
        for name in TestSubset::NAMES {
            assert_eq!(name.parse::<TestSubset>().unwrap().as_str(), name);
        }
        for name in BuildPolicy::NAMES {
            assert_eq!(name.parse::<BuildPolicy>().unwrap().as_str(), name);
        }
        assert!("fast".parse::<TestMode>().is_err());
        assert!("some".parse::<TestSubset>().is_err());
        assert!("false".parse::<BuildPolicy>().is_err());
    }
}
