//! Structured events for the run lifecycle.
//!
//! Every run is wrapped in a `runtests.run` span carrying its run id, and
//! each state transition is emitted as `event = "run.state"`.

use crate::controller::RunState;
use crate::stage::Stage;
use std::path::Path;
use tracing::{info, warn};

/// Span tagged with the run id. Attach with `Instrument` so it follows
/// the run across await points.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("runtests.run", run_id = %run_id)
}

/// Emit event: the controller entered `state`.
pub fn emit_state(state: RunState) {
    info!(event = "run.state", state = state.name());
}

/// Emit event: build phase starting with the first call's targets.
pub fn emit_build_started(targets: &[String]) {
    info!(
        event = "build.started",
        "--- Building test dependencies {} ---",
        targets.join(", ")
    );
}

/// Emit event: one build-driver call finished.
pub fn emit_build_stage_finished(stage: Stage, exit_code: i32, duration_ms: u64) {
    info!(
        event = "build.stage_finished",
        stage = %stage,
        exit_code = exit_code,
        duration_ms = duration_ms,
    );
}

/// Emit event: build phase finished.
pub fn emit_build_finished() {
    info!(event = "build.finished", "--- Build finished ---");
}

/// Emit event: the build directory was generated for an IDE (warning level).
pub fn emit_generator_unsupported(build_dir: &Path) {
    warn!(
        event = "build.generator_unsupported",
        build_dir = %build_dir.display(),
        "Building an IDE project is not supported yet. Skipping..."
    );
}

/// Emit event: result directory wiped and recreated.
pub fn emit_results_prepared(result_dir: &Path) {
    info!(event = "results.prepared", result_dir = %result_dir.display());
}

/// Emit event: test engine exited.
pub fn emit_tests_finished(exit_code: i32, duration_ms: u64) {
    info!(
        event = "tests.finished",
        exit_code = exit_code,
        duration_ms = duration_ms,
        passed = exit_code == 0,
    );
}

/// Emit event: coverage worker stop failed (warning level).
pub fn emit_coverage_stop_failed(error: &dyn std::fmt::Display) {
    warn!(event = "coverage.stop_failed", error = %error);
}
