//! run-tests - build test dependencies and run the lit test suite
//!
//! Two ways to point at a build:
//!
//! - `run-tests --build-dir <dir> [paths...]`: validate `<dir>` (or its
//!   `swift-<host>` subdirectory) and map source-tree test paths into it.
//!   With no paths, the whole primary suite runs.
//! - `run-tests <build-tree paths...>`: find the build directory by
//!   walking up from the first path.
//!
//! `--result-dir` is wiped and recreated on every run.

use anyhow::{Context, Result};
use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::Parser;
use runtests_core::tools::default_jobs;
use runtests_core::{
    init_tracing, BuildDecision, BuildPolicy, BuildRequest, CmakeBuildDriver, Collaborators,
    DeploymentTarget, LitEngine, ProfdataMergeWorker, RunConfiguration, RunController,
    RunOptions, RunPlan, RunTestsError, SourceLayout, Stage, TestMode, TestSubset,
};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "run-tests")]
#[command(version = runtests_core::VERSION)]
#[command(about = "Build test dependencies and run the test suite with lit", long_about = None)]
struct Cli {
    /// Test files or directories, in the source tree or a build tree
    paths: Vec<PathBuf>,

    /// Run lit in verbose mode and log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Build directory (or its parent holding `swift-<host>`)
    #[arg(long, env = "RUN_TESTS_BUILD_DIR")]
    build_dir: Option<PathBuf>,

    /// Build test dependencies before running tests
    #[arg(
        long,
        default_value = "true",
        value_parser = PossibleValuesParser::new(BuildPolicy::NAMES)
            .try_map(|s| s.parse::<BuildPolicy>())
    )]
    build: BuildPolicy,

    /// Deployment target(s) to test; repeatable, shell-split
    #[arg(long = "target", value_name = "TARGET")]
    targets: Vec<String>,

    /// Test mode
    #[arg(
        long,
        default_value = "optimize_none",
        value_parser = PossibleValuesParser::new(TestMode::NAMES)
            .try_map(|s| s.parse::<TestMode>())
    )]
    mode: TestMode,

    /// Test subset
    #[arg(
        long,
        default_value = "primary",
        value_parser = PossibleValuesParser::new(TestSubset::NAMES)
            .try_map(|s| s.parse::<TestSubset>())
    )]
    subset: TestSubset,

    /// Extra lit parameter, passed through verbatim; repeatable
    #[arg(long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Directory for results; deleted and recreated on every run
    #[arg(long)]
    result_dir: Option<PathBuf>,

    /// Run the coverage-merge worker around the tests (needs --result-dir)
    #[arg(long)]
    merge_coverage: bool,

    /// Path to lit.py (default: llvm-project next to the source checkout)
    #[arg(long, env = "RUN_TESTS_LIT")]
    lit: Option<PathBuf>,

    /// Interpreter used to run lit and the coverage-merge worker
    #[arg(long, env = "RUN_TESTS_PYTHON", default_value = "python3")]
    python: PathBuf,

    /// Build driver executable
    #[arg(long, env = "RUN_TESTS_CMAKE", default_value = "cmake")]
    cmake: PathBuf,

    /// Root of the source checkout (default: current directory)
    #[arg(long, env = "RUN_TESTS_SOURCE_DIR")]
    source_dir: Option<PathBuf>,

    /// Print what would run, then exit without touching anything
    #[arg(long)]
    dry_run: bool,

    /// With --dry-run, print the plan as JSON
    #[arg(long, requires = "dry_run")]
    json: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn run_options(&self) -> runtests_core::Result<RunOptions> {
        Ok(RunOptions {
            paths: self.paths.clone(),
            build_dir: self.build_dir.clone(),
            build: self.build,
            targets: DeploymentTarget::parse_list(&self.targets)?,
            mode: self.mode,
            subset: self.subset,
            verbose: self.verbose,
            params: self.params.clone(),
            result_dir: self.result_dir.clone(),
            merge_coverage: self.merge_coverage,
        })
    }
}

/// The concrete tools for one invocation.
struct Toolset {
    cmake: CmakeBuildDriver,
    lit: LitEngine,
    coverage: ProfdataMergeWorker,
}

impl Toolset {
    fn new(cli: &Cli, layout: &SourceLayout) -> Self {
        let lit = cli.lit.clone().unwrap_or_else(|| layout.default_lit.clone());
        Self {
            cmake: CmakeBuildDriver {
                program: cli.cmake.clone(),
            },
            lit: LitEngine::new(&cli.python, lit),
            coverage: ProfdataMergeWorker::new(&cli.python, &layout.coverage_worker),
        }
    }

    fn collaborators(&self) -> Collaborators {
        Collaborators {
            build: Arc::new(self.cmake.clone()),
            tests: Arc::new(self.lit.clone()),
            coverage: Arc::new(self.coverage.clone()),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.log_json, level);

    match run(cli).await {
        Ok(code) => exit_code(code),
        Err(err) => {
            eprintln!("run-tests: error: {err:#}");
            let code = err
                .downcast_ref::<RunTestsError>()
                .map(RunTestsError::exit_code)
                .unwrap_or(1);
            exit_code(code)
        }
    }
}

/// Run and return the test engine's exit status.
async fn run(cli: Cli) -> Result<i32> {
    let host = DeploymentTarget::host();
    let source_dir = match &cli.source_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let layout = SourceLayout::new(&source_dir)?;
    report_source_root(&layout);
    let config = RunConfiguration::new(cli.run_options()?, &host)?;
    let tools = Toolset::new(&cli, &layout);

    let controller = RunController::new(&config, &layout, &host, tools.collaborators());

    if cli.dry_run {
        let plan = controller.plan()?;
        if cli.json {
            let doc = json!({
                "host_target": host,
                "configuration": config,
                "plan": plan,
                "test_command": tools.lit.command(&plan.invocation),
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        } else {
            let verbose = config.build_policy() == BuildPolicy::Verbose;
            print!("{}", render_plan(&plan, &tools, default_jobs(), verbose));
        }
        return Ok(0);
    }

    let report = controller.run().await?;
    info!(
        run_id = %report.run_id,
        exit_code = report.exit_code,
        duration_ms = report.duration_ms,
        "Run finished"
    );
    Ok(report.exit_code)
}

/// Log the source root and warn when it has no test tree. Returns
/// whether the test tree was found.
fn report_source_root(layout: &SourceLayout) -> bool {
    info!(source_dir = %layout.source_dir.display(), "Using source checkout");
    let present = layout.test_root.is_dir();
    if !present {
        warn!(
            test_root = %layout.test_root.display(),
            "No test tree in the source checkout; source paths will not be mapped \
             into the build directory (pass --source-dir)"
        );
    }
    present
}

/// Human-readable dry-run output.
fn render_plan(plan: &RunPlan, tools: &Toolset, jobs: usize, verbose: bool) -> String {
    let mut out = String::new();

    let build_dir = plan
        .build_directory
        .as_ref()
        .map(|b| b.path.display().to_string())
        .unwrap_or_else(|| "(none)".to_string());
    out.push_str(&format!("Build directory: {build_dir}\n"));

    match (&plan.build, &plan.build_directory) {
        (BuildDecision::Run(targets), Some(dir)) => {
            for (stage, list) in [
                (Stage::DependencyBuild, &targets.dependencies),
                (Stage::UploadStdlibBuild, &targets.upload_stdlib),
            ] {
                let request = BuildRequest {
                    stage,
                    build_dir: dir.path.clone(),
                    targets: list.clone(),
                    jobs,
                    verbose,
                };
                out.push_str(&format!(
                    "{stage}: {}\n",
                    tools.cmake.command(&request).display_line()
                ));
            }
        }
        (BuildDecision::Skip(reason), _) => {
            out.push_str(&format!("Build: skipped ({reason:?})\n"));
        }
        (BuildDecision::Run(_), None) => {}
    }

    if let Some(dir) = &plan.result_dir {
        out.push_str(&format!(
            "Result directory (will be recreated): {}\n",
            dir.display()
        ));
    }
    if let Some(log) = &plan.coverage_log {
        out.push_str(&format!("Coverage log: {}\n", log.display()));
    }

    out.push_str(&format!(
        "Test command: {}\n",
        tools.lit.command(&plan.invocation).display_line()
    ));
    out
}

fn exit_code(code: i32) -> ExitCode {
    match u8::try_from(code) {
        Ok(code) => ExitCode::from(code),
        Err(_) => ExitCode::FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["run-tests", "test/Sema"]).unwrap();
        assert_eq!(cli.paths, vec![PathBuf::from("test/Sema")]);
        assert_eq!(cli.build, BuildPolicy::Build);
        assert_eq!(cli.mode, TestMode::OptimizeNone);
        assert_eq!(cli.subset, TestSubset::Primary);
        assert!(!cli.verbose);
        assert!(!cli.merge_coverage);
    }

    #[test]
    fn test_cli_full() {
        let cli = Cli::try_parse_from([
            "run-tests",
            "-v",
            "--build-dir",
            "/b",
            "--build",
            "skip",
            "--target",
            "linux-x86_64 linux-aarch64",
            "--target",
            "android-aarch64",
            "--mode",
            "optimize",
            "--subset",
            "only_long",
            "--param",
            "a=1",
            "--param",
            "b",
            "--result-dir",
            "/r",
            "--merge-coverage",
            "a",
            "b",
        ])
        .unwrap();

        let options = cli.run_options().unwrap();
        assert_eq!(options.build, BuildPolicy::Skip);
        assert_eq!(options.mode, TestMode::Optimize);
        assert_eq!(options.subset, TestSubset::OnlyLong);
        assert_eq!(options.params, ["a=1", "b"]);
        let targets: Vec<_> = options.targets.iter().map(|t| t.name().to_string()).collect();
        assert_eq!(targets, ["linux-x86_64", "linux-aarch64", "android-aarch64"]);
        assert_eq!(options.paths, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert!(options.merge_coverage);
    }

    #[test]
    fn test_version_comes_from_core() {
        use clap::CommandFactory;
        assert_eq!(
            Cli::command().get_version(),
            Some(runtests_core::VERSION)
        );
    }

    #[test]
    fn test_report_source_root_detects_missing_test_tree() {
        let root = tempdir().unwrap();
        let layout = SourceLayout::new(root.path()).unwrap();
        assert!(!report_source_root(&layout));

        fs::create_dir(root.path().join("test")).unwrap();
        assert!(report_source_root(&layout));
    }

    #[test]
    fn test_target_values_are_shell_split() {
        let cli = Cli::try_parse_from(["run-tests", "--target", "'a b' c", "x"]).unwrap();
        let options = cli.run_options().unwrap();
        let targets: Vec<_> = options.targets.iter().map(|t| t.name().to_string()).collect();
        assert_eq!(targets, ["a b", "c"]);

        let cli = Cli::try_parse_from(["run-tests", "--target", "'a", "x"]).unwrap();
        assert!(cli.run_options().unwrap_err().is_configuration());
    }

    #[test]
    fn test_cli_rejects_unknown_enum_values() {
        assert!(Cli::try_parse_from(["run-tests", "--mode", "fast"]).is_err());
        assert!(Cli::try_parse_from(["run-tests", "--subset", "some"]).is_err());
        assert!(Cli::try_parse_from(["run-tests", "--build", "false"]).is_err());
    }

    #[test]
    fn test_json_requires_dry_run() {
        assert!(Cli::try_parse_from(["run-tests", "--json", "x"]).is_err());
        assert!(Cli::try_parse_from(["run-tests", "--dry-run", "--json", "x"]).is_ok());
    }

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(exit_code(0), ExitCode::SUCCESS);
        assert_eq!(exit_code(3), ExitCode::from(3));
        assert_eq!(exit_code(-1), ExitCode::FAILURE);
        assert_eq!(exit_code(300), ExitCode::FAILURE);
    }

    #[test]
    fn test_render_plan_lists_build_and_test_commands() {
        let root = tempdir().unwrap();
        let build = root.path().join("build");
        let host = DeploymentTarget::new("linux-x86_64");
        fs::create_dir_all(build.join("test-linux-x86_64")).unwrap();
        fs::write(build.join("CMakeCache.txt"), b"").unwrap();

        let cli = Cli::try_parse_from([
            "run-tests",
            "--build-dir",
            build.to_str().unwrap(),
            "--lit",
            "/llvm/lit.py",
            "--result-dir",
            "/r",
        ])
        .unwrap();
        let layout = SourceLayout::new(&root.path().join("swift")).unwrap();
        let config = RunConfiguration::new(cli.run_options().unwrap(), &host).unwrap();
        let tools = Toolset::new(&cli, &layout);
        let plan = RunController::new(&config, &layout, &host, tools.collaborators())
            .plan()
            .unwrap();

        let text = render_plan(&plan, &tools, 8, false);
        assert!(text.contains(&format!("Build directory: {}", build.display())));
        assert!(text.contains("dependency build: cmake --build"));
        assert!(text.contains("-j8 all SwiftUnitTests swift-test-stdlib-linux-x86_64"));
        assert!(text.contains("upload-stdlib build: cmake --build"));
        assert!(text.contains("Result directory (will be recreated): /r"));
        assert!(text.contains("Test command: python3 /llvm/lit.py -sv"));
        assert!(text.contains("--xunit-xml-output=/r/lit-tests.xml"));
    }
}
