//! Tracing initialisation for the run-tests binary.
//!
//! Call [`init_tracing`] once at program start. Later calls are ignored
//! because the global subscriber can only be set once per process.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the process-wide subscriber.
///
/// `RUST_LOG` wins when set; otherwise events at `level` and above are
/// shown. With `json` each event is one JSON object per line. Everything
/// is written to stderr: stdout belongs to the dry-run plan, and the
/// child tools share the terminal through inherited stdio.
pub fn init_tracing(json: bool, level: Level) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    // Each layer is built separately so it can infer its own subscriber type.
    let (plain, structured) = if json {
        let lines = fmt::layer().with_target(false).with_writer(std::io::stderr);
        (None, Some(lines.json()))
    } else {
        let lines = fmt::layer().with_target(false).with_writer(std::io::stderr);
        (Some(lines), None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(plain)
        .with(structured)
        .try_init()
        .ok();
}
