//! Test-engine argument assembly.

use crate::config::RunConfiguration;
use crate::layout::RESULTS_FILE_NAME;
use crate::stage::serialize_os_args;
use serde::Serialize;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Verbose progress output.
pub const VERBOSE_FLAG: &str = "-v";
/// Succinct progress, verbose failures.
pub const SUCCINCT_FLAG: &str = "-sv";

pub const MODE_PARAM: &str = "swift_test_mode";
pub const SUBSET_PARAM: &str = "swift_test_subset";

/// Arguments for one test-engine run, in final order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestInvocation {
    /// Flags, parameters and paths. Paths are kept as OS strings.
    #[serde(serialize_with = "serialize_os_args")]
    pub args: Vec<OsString>,

    /// Where the engine is asked to write its XML results, if anywhere.
    pub results_file: Option<PathBuf>,
}

impl TestInvocation {
    /// Assemble arguments: verbosity, mode, subset, user parameters,
    /// results flag, then every resolved path.
    ///
    /// User parameters are passed through verbatim; the engine rejects
    /// malformed ones.
    pub fn assemble(config: &RunConfiguration, resolved_paths: &[PathBuf]) -> Self {
        let mut args: Vec<OsString> = Vec::new();

        let verbosity = if config.verbose() {
            VERBOSE_FLAG
        } else {
            SUCCINCT_FLAG
        };
        args.push(verbosity.into());
        push_param(&mut args, &format!("{MODE_PARAM}={}", config.mode().as_str()));
        push_param(&mut args, &format!("{SUBSET_PARAM}={}", config.subset().as_str()));
        for param in config.params() {
            push_param(&mut args, param);
        }

        let results_file = config.result_dir().map(results_file_in);
        if let Some(file) = &results_file {
            let mut flag = OsString::from("--xunit-xml-output=");
            flag.push(file);
            args.push(flag);
        }

        args.extend(resolved_paths.iter().map(|p| p.as_os_str().to_os_string()));

        Self { args, results_file }
    }
}

/// Location of the results file inside a result directory.
pub fn results_file_in(result_dir: &Path) -> PathBuf {
    result_dir.join(RESULTS_FILE_NAME)
}

fn push_param(args: &mut Vec<OsString>, param: impl AsRef<OsStr>) {
    args.push("--param".into());
    args.push(param.as_ref().to_os_string());
}
