//! Logging setup
//!
//! Every run appends to `<log dir>/circup.log`. With `--verbose` the same
//! events are also written to stderr. The level defaults to `info` and can be
//! changed with `RUST_LOG`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::paths::LOG_FILE;

/// Keeps the file writer alive; dropping it flushes the log
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
    pub log_file: Option<PathBuf>,
}

/// Create the log directory and return the log file path in it
pub fn prepare_log_file(log_dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(log_dir)?;
    Ok(log_dir.join(LOG_FILE))
}

/// Install the global subscriber
///
/// When the log directory cannot be created, file logging is skipped.
pub fn init_logging(log_dir: Option<&Path>, verbose: bool) -> LoggingGuard {
    let log_file = log_dir.and_then(|dir| match prepare_log_file(dir) {
        Ok(path) => Some(path),
        Err(e) => {
            if verbose {
                eprintln!("Unable to log to {}: {}", dir.display(), e);
            }
            None
        }
    });

    let (file_layer, file_guard) = match log_file.as_deref().zip(log_dir) {
        Some((_, dir)) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stderr_layer = verbose.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .without_time()
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Fails only when a subscriber is already set, which keeps the first one.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    LoggingGuard {
        _file_guard: file_guard,
        log_file,
    }
}
