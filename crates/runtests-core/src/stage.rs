//! External invocation stages and their command lines.

use serde::{Deserialize, Serialize, Serializer};
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

/// Each external process a run may start.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// First build-driver call: umbrella, unit-test and stdlib targets.
    DependencyBuild,

    /// Second build-driver call: upload-stdlib targets.
    UploadStdlibBuild,

    /// Coverage-merge worker `start`.
    CoverageStart,

    /// The test engine itself.
    Tests,

    /// Coverage-merge worker `stop`.
    CoverageStop,
}

impl Stage {
    /// Get the stage name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::DependencyBuild => "dependency build",
            Stage::UploadStdlibBuild => "upload-stdlib build",
            Stage::CoverageStart => "coverage-merge start",
            Stage::Tests => "test run",
            Stage::CoverageStop => "coverage-merge stop",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully assembled external command line.
///
/// Arguments are OS strings so paths reach the child process byte for
/// byte; lossy conversion only happens for display and serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageCommand {
    /// Which stage this command belongs to.
    pub stage: Stage,

    /// Executable to launch.
    pub program: PathBuf,

    /// Arguments, in order.
    #[serde(serialize_with = "serialize_os_args")]
    pub args: Vec<OsString>,
}

impl StageCommand {
    pub fn new(stage: Stage, program: impl Into<PathBuf>) -> Self {
        Self {
            stage,
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Render as a single shell-like line for logs.
    pub fn display_line(&self) -> String {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Serialize OS-string arguments as plain strings, replacing invalid
/// UTF-8 sequences.
pub(crate) fn serialize_os_args<S>(args: &[OsString], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(args.iter().map(|a| a.to_string_lossy()))
}
