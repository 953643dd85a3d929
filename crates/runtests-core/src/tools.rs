//! External collaborators: build driver, test engine, coverage worker.
//!
//! Each seam is a trait so the run controller can be driven by in-memory
//! fakes; the process-backed implementations below only assemble a
//! [`StageCommand`] and hand it to [`ProcessRunner`].

use crate::error::Result;
use crate::invocation::TestInvocation;
use crate::runner::{ProcessRunner, StageResult};
use crate::stage::{Stage, StageCommand};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One build-driver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// `DependencyBuild` or `UploadStdlibBuild`.
    pub stage: Stage,
    pub build_dir: PathBuf,
    pub targets: Vec<String>,
    /// Parallelism hint handed through to the driver.
    pub jobs: usize,
    pub verbose: bool,
}

/// Builds a list of targets in a build directory.
#[async_trait]
pub trait BuildDriver: Send + Sync {
    async fn build(&self, request: &BuildRequest) -> Result<StageResult>;
}

/// Runs the test suite.
#[async_trait]
pub trait TestEngine: Send + Sync {
    async fn run(&self, invocation: &TestInvocation) -> Result<StageResult>;
}

/// Long-lived coverage profile merger controlled by start/stop calls.
#[async_trait]
pub trait CoverageWorker: Send + Sync {
    async fn start(&self, log_file: &Path, output_dir: &Path) -> Result<StageResult>;
    async fn stop(&self) -> Result<StageResult>;
}

/// The three collaborators a run needs.
#[derive(Clone)]
pub struct Collaborators {
    pub build: Arc<dyn BuildDriver>,
    pub tests: Arc<dyn TestEngine>,
    pub coverage: Arc<dyn CoverageWorker>,
}

/// Number of processing units, used as the build parallelism hint.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// `cmake --build <dir> -- [-v] -j<N> <targets...>`
#[derive(Debug, Clone)]
pub struct CmakeBuildDriver {
    pub program: PathBuf,
}

impl Default for CmakeBuildDriver {
    fn default() -> Self {
        Self {
            program: PathBuf::from("cmake"),
        }
    }
}

impl CmakeBuildDriver {
    pub fn command(&self, request: &BuildRequest) -> StageCommand {
        let mut cmd = StageCommand::new(request.stage, &self.program)
            .arg("--build")
            .arg(&request.build_dir)
            .arg("--");
        if request.verbose {
            cmd = cmd.arg("-v");
        }
        cmd.arg(format!("-j{}", request.jobs))
            .args(request.targets.iter().cloned())
    }
}

#[async_trait]
impl BuildDriver for CmakeBuildDriver {
    async fn build(&self, request: &BuildRequest) -> Result<StageResult> {
        ProcessRunner::execute(&self.command(request)).await
    }
}

/// `<interpreter> <lit.py> <args...>`
#[derive(Debug, Clone)]
pub struct LitEngine {
    pub interpreter: PathBuf,
    pub lit: PathBuf,
}

impl LitEngine {
    pub fn new(interpreter: impl Into<PathBuf>, lit: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            lit: lit.into(),
        }
    }

    pub fn command(&self, invocation: &TestInvocation) -> StageCommand {
        StageCommand::new(Stage::Tests, &self.interpreter)
            .arg(&self.lit)
            .args(invocation.args.iter().cloned())
    }
}

#[async_trait]
impl TestEngine for LitEngine {
    async fn run(&self, invocation: &TestInvocation) -> Result<StageResult> {
        ProcessRunner::execute(&self.command(invocation)).await
    }
}

/// `<interpreter> <profdata_merge/main.py> start -l <log> -o <dir>` / `stop`
#[derive(Debug, Clone)]
pub struct ProfdataMergeWorker {
    pub interpreter: PathBuf,
    pub script: PathBuf,
}

impl ProfdataMergeWorker {
    pub fn new(interpreter: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
        }
    }

    pub fn start_command(&self, log_file: &Path, output_dir: &Path) -> StageCommand {
        StageCommand::new(Stage::CoverageStart, &self.interpreter)
            .arg(&self.script)
            .arg("start")
            .arg("-l")
            .arg(log_file)
            .arg("-o")
            .arg(output_dir)
    }

    pub fn stop_command(&self) -> StageCommand {
        StageCommand::new(Stage::CoverageStop, &self.interpreter)
            .arg(&self.script)
            .arg("stop")
    }
}

#[async_trait]
impl CoverageWorker for ProfdataMergeWorker {
    async fn start(&self, log_file: &Path, output_dir: &Path) -> Result<StageResult> {
        ProcessRunner::execute(&self.start_command(log_file, output_dir)).await
    }

    async fn stop(&self) -> Result<StageResult> {
        ProcessRunner::execute(&self.stop_command()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(verbose: bool) -> BuildRequest {
        BuildRequest {
            stage: Stage::DependencyBuild,
            build_dir: PathBuf::from("/tmp/build"),
            targets: vec!["all".to_string(), "SwiftUnitTests".to_string()],
            jobs: 8,
            verbose,
        }
    }

    #[test]
    fn test_cmake_command() {
        let cmd = CmakeBuildDriver::default().command(&request(false));
        assert_eq!(cmd.stage, Stage::DependencyBuild);
        assert_eq!(cmd.program, PathBuf::from("cmake"));
        assert_eq!(
            cmd.args,
            ["--build", "/tmp/build", "--", "-j8", "all", "SwiftUnitTests"]
        );
    }

    #[test]
    fn test_cmake_verbose_command() {
        let cmd = CmakeBuildDriver::default().command(&request(true));
        assert_eq!(
            cmd.args,
            ["--build", "/tmp/build", "--", "-v", "-j8", "all", "SwiftUnitTests"]
        );
    }

    #[test]
    fn test_lit_command() {
        let engine = LitEngine::new("python3", "/src/lit.py");
        let invocation = TestInvocation {
            args: vec!["-sv".into(), "/b/test-linux-x86_64".into()],
            results_file: None,
        };
        let cmd = engine.command(&invocation);
        assert_eq!(cmd.stage, Stage::Tests);
        assert_eq!(cmd.program, PathBuf::from("python3"));
        assert_eq!(cmd.args, ["/src/lit.py", "-sv", "/b/test-linux-x86_64"]);
    }

    #[test]
    fn test_coverage_commands() {
        let worker = ProfdataMergeWorker::new("python3", "/src/utils/profdata_merge/main.py");
        let start = worker.start_command(Path::new("/r/profdata_merge.log"), Path::new("/r"));
        assert_eq!(start.stage, Stage::CoverageStart);
        assert_eq!(
            start.args,
            [
                "/src/utils/profdata_merge/main.py",
                "start",
                "-l",
                "/r/profdata_merge.log",
                "-o",
                "/r"
            ]
        );

        let stop = worker.stop_command();
        assert_eq!(stop.stage, Stage::CoverageStop);
        assert_eq!(stop.args, ["/src/utils/profdata_merge/main.py", "stop"]);
    }

    #[test]
    fn test_default_jobs_positive() {
        assert!(default_jobs() >= 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_lit_engine_propagates_exit_status() {
        // `sh -c 'exit 3' <args>` stands in for the interpreter and script.
        let engine = LitEngine::new("sh", "-c");
        let invocation = TestInvocation {
            args: vec!["exit 3".into()],
            results_file: None,
        };
        let result = engine.run(&invocation).await.unwrap();
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stage, Stage::Tests);
    }
}
