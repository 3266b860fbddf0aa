//! Tracing configuration and log routing.
//!
//! The server logs to stdout through a compact formatter and appends to a log file:
//! `SUSTAINLENS_LOG_FILE` when set, `logs/sustainlens.log` otherwise. File output goes through a
//! non-blocking writer so request handlers never wait on disk.
//!
//! The command line runner prints its results as JSON on stdout, so it logs to stderr only.
use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_DIR: &str = "logs";
const LOG_FILE_NAME: &str = "sustainlens.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the server subscriber: `RUST_LOG` filter (default `info`), stdout, and a log file.
pub fn init_tracing() {
    let registry = tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(fmt::layer().with_target(false).compact());

    match file_writer() {
        Some(writer) => registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_ansi(false)
                    .compact(),
            )
            .init(),
        None => registry.init(),
    }
}

/// Install the command line subscriber: stderr only, `warn` unless `RUST_LOG` says otherwise.
pub fn init_cli_tracing() {
    tracing_subscriber::registry()
        .with(env_filter("warn"))
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Returns `None` when the log file cannot be opened; stdout logging still works then.
fn file_writer() -> Option<NonBlocking> {
    let appender = match std::env::var("SUSTAINLENS_LOG_FILE") {
        Ok(path) => open_append(Path::new(&path))?,
        Err(_) => {
            if let Err(err) = std::fs::create_dir_all(LOG_DIR) {
                eprintln!("Failed to create logs directory: {err}");
                return None;
            }
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(LOG_DIR, LOG_FILE_NAME));
            let _ = LOG_GUARD.set(guard);
            return Some(writer);
        }
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    Some(writer)
}

fn open_append(path: &Path) -> Option<std::fs::File> {
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| eprintln!("Failed to open log file {}: {err}", path.display()))
        .ok()
}
