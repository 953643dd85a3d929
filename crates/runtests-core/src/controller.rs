//! Run sequencing.
//!
//! A run moves through these states:
//!
//! ```text
//! Init -> DirectoryResolved -> BuildSkipped | BuildRunning -> ResultsPrepared
//!      -> CoverageStarted | NoCoverage -> TestsRunning -> [CoverageStopped] -> Done
//! ```
//!
//! Every fatal configuration or resolution error surfaces before the
//! result directory is touched or any process is started. Once the
//! coverage worker is started, `stop` is always attempted after the test
//! engine returns, whatever it returned.

use crate::classify::BuildDirectory;
use crate::config::{BuildPolicy, RunConfiguration};
use crate::error::Result;
use crate::invocation::TestInvocation;
use crate::layout::{SourceLayout, COVERAGE_LOG_FILE_NAME};
use crate::normalize::normalize_all;
use crate::obs;
use crate::plan::DependencyTargetSet;
use crate::resolve::resolve;
use crate::stage::Stage;
use crate::target::DeploymentTarget;
use crate::tools::{default_jobs, BuildRequest, Collaborators};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Instrument};
use uuid::Uuid;

/// Controller states, in the order a run can visit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Init,
    DirectoryResolved,
    BuildSkipped,
    BuildRunning,
    ResultsPrepared,
    CoverageStarted,
    NoCoverage,
    TestsRunning,
    CoverageStopped,
    Done,
}

impl RunState {
    pub fn name(&self) -> &'static str {
        match self {
            RunState::Init => "init",
            RunState::DirectoryResolved => "directory_resolved",
            RunState::BuildSkipped => "build_skipped",
            RunState::BuildRunning => "build_running",
            RunState::ResultsPrepared => "results_prepared",
            RunState::CoverageStarted => "coverage_started",
            RunState::NoCoverage => "no_coverage",
            RunState::TestsRunning => "tests_running",
            RunState::CoverageStopped => "coverage_stopped",
            RunState::Done => "done",
        }
    }
}

/// Why the dependency build does not run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// `--build skip`.
    Requested,
    /// The build directory was generated for an IDE.
    UnsupportedGenerator,
}

/// What the build phase will do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildDecision {
    Run(DependencyTargetSet),
    Skip(SkipReason),
}

/// Everything decided before any side effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunPlan {
    pub build_directory: Option<BuildDirectory>,

    /// Normalized test paths, target-major.
    pub resolved_paths: Vec<PathBuf>,

    pub build: BuildDecision,

    pub invocation: TestInvocation,

    /// Directory wiped and recreated before the tests run.
    pub result_dir: Option<PathBuf>,

    /// Coverage worker log, present iff coverage merging is on.
    pub coverage_log: Option<PathBuf>,
}

/// Outcome of a run that reached the test engine.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: String,

    /// States visited, in order.
    pub states: Vec<RunState>,

    pub plan: RunPlan,

    /// Test engine exit status; the run's own exit status.
    pub exit_code: i32,

    pub duration_ms: u64,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }
}

/// Sequences one run against a set of collaborators.
pub struct RunController<'a> {
    config: &'a RunConfiguration,
    layout: &'a SourceLayout,
    host: &'a DeploymentTarget,
    tools: Collaborators,
    jobs: usize,
}

impl<'a> RunController<'a> {
    pub fn new(
        config: &'a RunConfiguration,
        layout: &'a SourceLayout,
        host: &'a DeploymentTarget,
        tools: Collaborators,
    ) -> Self {
        Self {
            config,
            layout,
            host,
            tools,
            jobs: default_jobs(),
        }
    }

    /// Override the build parallelism hint.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Resolve, normalize, plan and assemble without side effects.
    pub fn plan(&self) -> Result<RunPlan> {
        let resolution = resolve(self.config, self.layout, self.host)?;
        let build_dir = resolution.build_directory.as_ref().map(|b| b.path.as_path());
        let resolved_paths =
            normalize_all(&resolution.paths, self.layout, build_dir, self.config.targets())?;

        let build = match &resolution.build_directory {
            _ if self.config.build_policy().is_skip() => BuildDecision::Skip(SkipReason::Requested),
            Some(dir) if !dir.supports_dependency_build() => {
                BuildDecision::Skip(SkipReason::UnsupportedGenerator)
            }
            _ => BuildDecision::Run(DependencyTargetSet::plan(
                self.config.targets(),
                &resolved_paths,
            )),
        };

        let invocation = TestInvocation::assemble(self.config, &resolved_paths);
        let result_dir = self.config.result_dir().map(Path::to_path_buf);
        let coverage_log = if self.config.merge_coverage() {
            result_dir.as_ref().map(|dir| dir.join(COVERAGE_LOG_FILE_NAME))
        } else {
            None
        };

        Ok(RunPlan {
            build_directory: resolution.build_directory,
            resolved_paths,
            build,
            invocation,
            result_dir,
            coverage_log,
        })
    }

    /// Execute the whole run.
    ///
    /// Returns `Ok` once the test engine has run, even if it reported
    /// failures; `exit_code` carries its status. Build failures and
    /// coverage start failures are errors.
    ///
    /// A configured result directory is deleted recursively and recreated
    /// empty before the tests start. Anything in it is lost.
    pub async fn run(&self) -> Result<RunReport> {
        let run_id = Uuid::new_v4().to_string();
        let span = obs::run_span(&run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: String) -> Result<RunReport> {
        let start = Instant::now();
        let mut states = Vec::new();
        enter(&mut states, RunState::Init);

        let plan = self.plan()?;
        enter(&mut states, RunState::DirectoryResolved);

        match (&plan.build, &plan.build_directory) {
            (BuildDecision::Run(targets), Some(dir)) => {
                enter(&mut states, RunState::BuildRunning);
                self.run_build(dir, targets).await?;
            }
            (BuildDecision::Skip(SkipReason::UnsupportedGenerator), Some(dir)) => {
                obs::emit_generator_unsupported(&dir.path);
                enter(&mut states, RunState::BuildSkipped);
            }
            _ => enter(&mut states, RunState::BuildSkipped),
        }

        if let Some(dir) = &plan.result_dir {
            prepare_result_dir(dir).await?;
            obs::emit_results_prepared(dir);
        }
        enter(&mut states, RunState::ResultsPrepared);

        let coverage_started = match (&plan.coverage_log, &plan.result_dir) {
            (Some(log), Some(dir)) => {
                self.tools.coverage.start(log, dir).await?.into_checked()?;
                enter(&mut states, RunState::CoverageStarted);
                true
            }
            _ => {
                enter(&mut states, RunState::NoCoverage);
                false
            }
        };

        enter(&mut states, RunState::TestsRunning);
        info!(paths = plan.resolved_paths.len(), "Running tests");
        let test_result = self.tools.tests.run(&plan.invocation).await;

        if coverage_started {
            match self.tools.coverage.stop().await {
                Ok(result) if !result.passed() => obs::emit_coverage_stop_failed(&format!(
                    "{} exited with status {}",
                    Stage::CoverageStop,
                    result.exit_code
                )),
                Ok(_) => {}
                Err(e) => obs::emit_coverage_stop_failed(&e),
            }
            enter(&mut states, RunState::CoverageStopped);
        }

        let test_result = test_result?;
        obs::emit_tests_finished(test_result.exit_code, test_result.duration_ms);
        enter(&mut states, RunState::Done);

        Ok(RunReport {
            run_id,
            states,
            plan,
            exit_code: test_result.exit_code,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Two build-driver calls; the second runs only if the first passed.
    async fn run_build(&self, dir: &BuildDirectory, targets: &DependencyTargetSet) -> Result<()> {
        obs::emit_build_started(&targets.dependencies);

        let phases = [
            (Stage::DependencyBuild, &targets.dependencies),
            (Stage::UploadStdlibBuild, &targets.upload_stdlib),
        ];
        for (stage, list) in phases {
            let request = BuildRequest {
                stage,
                build_dir: dir.path.clone(),
                targets: list.clone(),
                jobs: self.jobs,
                verbose: self.config.build_policy() == BuildPolicy::Verbose,
            };
            let result = self.tools.build.build(&request).await?;
            obs::emit_build_stage_finished(stage, result.exit_code, result.duration_ms);
            result.into_checked()?;
        }

        obs::emit_build_finished();
        Ok(())
    }
}

fn enter(states: &mut Vec<RunState>, state: RunState) {
    obs::emit_state(state);
    states.push(state);
}

/// Delete `dir` if present, then recreate it empty.
async fn prepare_result_dir(dir: &Path) -> Result<()> {
    if tokio::fs::try_exists(dir).await? {
        tokio::fs::remove_dir_all(dir).await?;
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(())
}
