//! Error types for run-tests

use crate::stage::Stage;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a test run
#[derive(Error, Debug)]
pub enum RunTestsError {
    /// Invalid or missing option combination
    #[error("{0}")]
    Configuration(String),

    /// Explicit build directory failed validation
    #[error("'{}' is not a valid build directory", .0.display())]
    NotABuildDirectory(PathBuf),

    /// Upward search from a test path found no build directory
    #[error("cannot infer build directory from '{}'", .0.display())]
    CannotInferBuildDirectory(PathBuf),

    /// An external tool ran and exited non-zero
    #[error("{stage} failed with exit status {code}")]
    ExternalProcess { stage: Stage, code: i32 },

    /// An external tool could not be launched at all
    #[error("failed to launch {program} for {stage}: {source}")]
    Spawn {
        stage: Stage,
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunTestsError {
    /// Process exit status to report for this error.
    ///
    /// External failures propagate the tool's own status; everything raised
    /// by run-tests itself, and tools killed by a signal, exit with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunTestsError::ExternalProcess { code, .. } if *code > 0 => *code,
            _ => 1,
        }
    }

    /// Whether the error was detected before any external process started.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RunTestsError::Configuration(_)
                | RunTestsError::NotABuildDirectory(_)
                | RunTestsError::CannotInferBuildDirectory(_)
        )
    }
}

/// Result type for run-tests operations
pub type Result<T> = std::result::Result<T, RunTestsError>;
