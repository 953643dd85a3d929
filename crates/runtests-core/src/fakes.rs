//! In-memory fakes for the collaborator traits (testing only)
//!
//! `RecordingTools` implements all three seams on one value so a test can
//! inspect the exact order of external calls a run made.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{Result, RunTestsError};
use crate::invocation::TestInvocation;
use crate::runner::StageResult;
use crate::stage::Stage;
use crate::tools::{BuildDriver, BuildRequest, Collaborators, CoverageWorker, TestEngine};

/// One call observed by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub stage: Stage,
    /// Build targets, test arguments, or `[log, output_dir]` for coverage start.
    pub args: Vec<String>,
}

/// Records every call and answers with a configurable exit code per stage.
///
/// The test engine writes a small XML file when asked for one, and the
/// coverage worker creates its log file, so tests can inspect the result
/// directory the way a real run leaves it.
#[derive(Debug, Default)]
pub struct RecordingTools {
    calls: Mutex<Vec<RecordedCall>>,
    exit_codes: Mutex<HashMap<Stage, i32>>,
    spawn_failures: Mutex<HashSet<Stage>>,
}

impl RecordingTools {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every call for `stage` exit with `code`.
    pub fn fail_stage(&self, stage: Stage, code: i32) {
        let mut codes = self.exit_codes.lock().unwrap();
        codes.insert(stage, code);
    }

    /// Make every call for `stage` fail as if its program could not be
    /// launched. The call is still recorded.
    pub fn fail_to_spawn(&self, stage: Stage) {
        self.spawn_failures.lock().unwrap().insert(stage);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.calls().into_iter().map(|c| c.stage).collect()
    }

    /// The same fake behind all three seams.
    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            build: self.clone(),
            tests: self.clone(),
            coverage: self.clone(),
        }
    }

    fn record(&self, stage: Stage, args: Vec<String>) -> Result<StageResult> {
        self.calls.lock().unwrap().push(RecordedCall { stage, args });
        if self.spawn_failures.lock().unwrap().contains(&stage) {
            return Err(RunTestsError::Spawn {
                stage,
                program: "fake".to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such program"),
            });
        }
        let code = self
            .exit_codes
            .lock()
            .unwrap()
            .get(&stage)
            .copied()
            .unwrap_or(0);
        Ok(StageResult::new(stage, code, 0))
    }
}

#[async_trait]
impl BuildDriver for RecordingTools {
    async fn build(&self, request: &BuildRequest) -> Result<StageResult> {
        self.record(request.stage, request.targets.clone())
    }
}

#[async_trait]
impl TestEngine for RecordingTools {
    async fn run(&self, invocation: &TestInvocation) -> Result<StageResult> {
        if let Some(file) = &invocation.results_file {
            std::fs::write(file, b"<testsuites/>\n")?;
        }
        let args = invocation
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        self.record(Stage::Tests, args)
    }
}

#[async_trait]
impl CoverageWorker for RecordingTools {
    async fn start(&self, log_file: &Path, output_dir: &Path) -> Result<StageResult> {
        std::fs::write(log_file, b"")?;
        self.record(
            Stage::CoverageStart,
            vec![
                log_file.to_string_lossy().into_owned(),
                output_dir.to_string_lossy().into_owned(),
            ],
        )
    }

    async fn stop(&self) -> Result<StageResult> {
        self.record(Stage::CoverageStop, Vec::new())
    }
}
