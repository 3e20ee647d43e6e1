use std::{path::Path, sync::LazyLock};

use anyhow::{anyhow, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{format::FmtSpan, writer::MakeWriterExt},
    EnvFilter,
};

pub const CLI_PREFIX: &str = "cli";

const LOG_DIR: &str = "logs";
const MAX_LOG_FILES: usize = 5;

fn log_filter(log_level: Option<LevelFilter>) -> EnvFilter {
    let level = log_level
        .map(|v| v.to_string())
        .unwrap_or_else(|| std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));

    // Http internals only matter when they fail.
    EnvFilter::new(format!(
        "{}={level},reqwest=warn",
        env!("CARGO_PKG_NAME").replace("-", "_"),
    ))
}

/// Starts logging into `<application_data_path>/logs`, rotated daily. When `show_std` is set the
/// same events are mirrored to stderr so they don't interleave with the dashboard on stdout.
pub fn enable_logging(
    prefix: &str,
    application_data_path: &Path,
    log_level: Option<LevelFilter>,
    show_std: bool,
) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(prefix)
        .build(application_data_path.join(LOG_DIR))?;

    let stderr = std::io::stderr.with_filter(move |_| show_std);

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(log_level))
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(stderr.and(appender))
        .pretty()
        .try_init()
        .map_err(|e| anyhow!("Failed to install the log subscriber {e}"))?;
    Ok(())
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .try_init();
});
