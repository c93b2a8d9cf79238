//! Tracing setup for the server.
//!
//! Events go to stdout and to a log file. `RUST_LOG` controls filtering; without it the
//! server logs at `info` and keeps the HTTP and PDF libraries at `warn`.
//! `RUSTY_PAPER_LOG_FILE` picks the file (appended to), `off` disables it, and the default is
//! `logs/rusty-paper.log`.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_VAR: &str = "RUSTY_PAPER_LOG_FILE";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "rusty-paper.log";
const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn,lopdf=warn";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where file logs are written.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogFile {
    Disabled,
    Path(PathBuf),
}

fn log_file_from(value: Option<String>) -> LogFile {
    match value.as_deref().map(str::trim) {
        Some(value) if value.eq_ignore_ascii_case("off") => LogFile::Disabled,
        Some(value) if !value.is_empty() => LogFile::Path(PathBuf::from(value)),
        _ => LogFile::Path(Path::new(DEFAULT_LOG_DIR).join(DEFAULT_LOG_FILE)),
    }
}

/// Install the global subscriber: stdout plus the configured log file.
///
/// Must run once, after configuration is loaded. The file writer's guard lives for the rest of
/// the process.
pub fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    match file_writer(log_file_from(std::env::var(LOG_FILE_VAR).ok())) {
        Some(writer) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }
}

/// Open the log file for appending behind a non-blocking writer.
///
/// Failures are reported on stderr and leave stdout logging in place.
fn file_writer(target: LogFile) -> Option<NonBlocking> {
    let LogFile::Path(path) = target else {
        return None;
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        if let Err(err) = std::fs::create_dir_all(parent) {
            eprintln!("Failed to create log directory {}: {err}", parent.display());
            return None;
        }
    }
    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(non_blocking)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}
