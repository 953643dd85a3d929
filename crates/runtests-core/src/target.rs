//! Deployment targets (OS/architecture tags).

use crate::error::{Result, RunTestsError};
use serde::{Deserialize, Serialize};

/// A tag such as `linux-x86_64` or `macosx-arm64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentTarget(String);

impl DeploymentTarget {
    pub fn new(name: impl Into<String>) -> Self {
        DeploymentTarget(name.into())
    }

    /// The target matching the machine running this binary.
    pub fn host() -> Self {
        Self::from_os_arch(std::env::consts::OS, std::env::consts::ARCH)
    }

    fn from_os_arch(os: &str, arch: &str) -> Self {
        let os = match os {
            "macos" => "macosx",
            other => other,
        };
        let arch = match (os, arch) {
            ("macosx", "aarch64") => "arm64",
            (_, other) => other,
        };
        DeploymentTarget(format!("{os}-{arch}"))
    }

    /// Shell-split each raw `--target` value and concatenate the pieces
    /// in order. Duplicates are kept.
    pub fn parse_list<I, S>(raw: I) -> Result<Vec<Self>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut targets = Vec::new();
        for value in raw {
            let value = value.as_ref();
            let words = shlex::split(value).ok_or_else(|| {
                RunTestsError::Configuration(format!("cannot split target list '{value}'"))
            })?;
            targets.extend(words.into_iter().map(DeploymentTarget::new));
        }
        Ok(targets)
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeploymentTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
