//! External process execution.

use crate::error::{Result, RunTestsError};
use crate::stage::{Stage, StageCommand};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::debug;

/// Result of one external process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    /// Stage the process ran for.
    pub stage: Stage,

    /// Exit code (0 = success, -1 = killed by a signal).
    pub exit_code: i32,

    /// Duration in milliseconds.
    pub duration_ms: u64,
}

impl StageResult {
    pub fn new(stage: Stage, exit_code: i32, duration_ms: u64) -> Self {
        Self {
            stage,
            exit_code,
            duration_ms,
        }
    }

    /// Whether this stage passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.exit_code == 0
    }

    /// Turn a non-zero exit into an `ExternalProcess` error.
    pub fn into_checked(self) -> Result<Self> {
        if self.passed() {
            Ok(self)
        } else {
            Err(RunTestsError::ExternalProcess {
                stage: self.stage,
                code: self.exit_code,
            })
        }
    }
}

/// Runs a stage command to completion with inherited stdio.
pub struct ProcessRunner;

impl ProcessRunner {
    /// Execute a command and wait for it to exit.
    ///
    /// Output is streamed straight to the terminal; nothing is captured.
    /// There is no timeout: a hung tool hangs the run.
    pub async fn execute(command: &StageCommand) -> Result<StageResult> {
        let start = Instant::now();
        debug!(stage = %command.stage, command = %command.display_line(), "Spawning");

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let status = cmd
            .status()
            .await
            .map_err(|source| RunTestsError::Spawn {
                stage: command.stage,
                program: command.program.display().to_string(),
                source,
            })?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = status.code().unwrap_or(-1);
        debug!(stage = %command.stage, exit_code, duration_ms, "Process exited");

        Ok(StageResult::new(command.stage, exit_code, duration_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_result_passed() {
        let result = StageResult::new(Stage::Tests, 0, 100);
        assert!(result.passed());
        assert!(result.into_checked().is_ok());
    }

    #[test]
    fn test_stage_result_failed() {
        let result = StageResult::new(Stage::DependencyBuild, 2, 100);
        assert!(!result.passed());
        match result.into_checked() {
            Err(RunTestsError::ExternalProcess { stage, code }) => {
                assert_eq!(stage, Stage::DependencyBuild);
                assert_eq!(code, 2);
            }
            other => panic!("expected ExternalProcess, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_simple_command() {
        let cmd = StageCommand::new(Stage::Tests, "true");
        let result = ProcessRunner::execute(&cmd).await.expect("execute failed");
        assert!(result.passed());
        assert_eq!(result.stage, Stage::Tests);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_failing_command() {
        let cmd = StageCommand::new(Stage::Tests, "false");
        let result = ProcessRunner::execute(&cmd).await.expect("execute failed");
        assert!(!result.passed());
        assert_ne!(result.exit_code, 0);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_execute_passes_non_utf8_path_verbatim() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join(OsStr::from_bytes(b"caf\xe9.marker"));
        let cmd = StageCommand::new(Stage::Tests, "sh")
            .args(["-c", "touch \"$0\""])
            .arg(&marker);
        let result = ProcessRunner::execute(&cmd).await.expect("execute failed");
        assert!(result.passed());
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn test_execute_missing_program_is_spawn_error() {
        let cmd = StageCommand::new(Stage::CoverageStart, "/definitely/not/a/real/program");
        let err = ProcessRunner::execute(&cmd).await.unwrap_err();
        assert!(matches!(
            err,
            RunTestsError::Spawn {
                stage: Stage::CoverageStart,
                ..
            }
        ));
    }
}
