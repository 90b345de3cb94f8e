use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::MintConfig;

const LOG_FILE_PREFIX: &str = "mintpad";
const MAX_LOG_FILES: usize = 14;
const WORKSPACE_CRATES: [&str; 4] = ["mint_app", "mint_core", "mint_chain", "mint_session"];

/// Filter putting the workspace crates at `level` and everything else at `warn`.
pub fn default_filter(level: &str) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(WORKSPACE_CRATES.iter().map(|krate| format!("{krate}={level}")));
    directives.join(",")
}

/// File logging under `~/.mintpad/logs` plus a compact console layer, at the
/// configured `log_level`. `RUST_LOG` overrides the level when set.
///
/// The returned guard flushes the file writer; keep it alive until exit.
pub fn init_logging(config: &MintConfig) -> Result<WorkerGuard> {
    let logs_dir = MintConfig::logs_dir()?;
    install(&logs_dir, &default_filter(&config.log_level), true)
}

/// File-only logging into `logs_dir` with an explicit filter.
pub fn init_logging_to_dir(logs_dir: &Path, filter: &str) -> Result<WorkerGuard> {
    install(logs_dir, filter, false)
}

fn install(logs_dir: &Path, filter: &str, console: bool) -> Result<WorkerGuard> {
    let (writer, guard) = file_writer(logs_dir)?;

    let file_layer = fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .with_writer(writer);
    let console_layer = console.then(|| fmt::layer().with_target(false).compact());

    tracing_subscriber::registry()
        .with(env_filter(filter)?)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("logging already initialized")?;

    Ok(guard)
}

fn env_filter(fallback: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(fallback)
            .with_context(|| format!("invalid log filter {fallback:?}")),
    }
}

fn file_writer(logs_dir: &Path) -> Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("failed to create log directory: {}", logs_dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(logs_dir)
        .context("failed to open log file")?;

    Ok(tracing_appender::non_blocking(appender))
}
