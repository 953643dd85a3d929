//! run-tests core - test orchestration front end
//!
//! Given test paths and deployment targets, this crate:
//! - Finds or validates the build directory
//! - Maps source-tree test paths onto the build tree per target
//! - Plans and runs the dependency build (two build-driver calls)
//! - Assembles the lit command line and runs it
//! - Brackets the test run with the coverage-merge worker when asked
//!
//! It never runs tests or reads their results itself.

pub mod classify;
pub mod config;
pub mod controller;
pub mod error;
pub mod fakes;
pub mod invocation;
pub mod layout;
pub mod normalize;
pub mod obs;
pub mod plan;
pub mod resolve;
pub mod runner;
pub mod stage;
pub mod target;
pub mod telemetry;
pub mod tools;

// Re-export key types
pub use classify::{BuildDirectory, GeneratorKind};
pub use config::{BuildPolicy, RunConfiguration, RunOptions, TestMode, TestSubset};
pub use controller::{BuildDecision, RunController, RunPlan, RunReport, RunState, SkipReason};
pub use error::{Result, RunTestsError};
pub use invocation::TestInvocation;
pub use layout::SourceLayout;
pub use plan::DependencyTargetSet;
pub use runner::{ProcessRunner, StageResult};
pub use stage::{Stage, StageCommand};
pub use target::DeploymentTarget;
pub use telemetry::init_tracing;
pub use tools::{
    BuildDriver, BuildRequest, CmakeBuildDriver, Collaborators, CoverageWorker, LitEngine,
    ProfdataMergeWorker, TestEngine,
};

/// run-tests version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
