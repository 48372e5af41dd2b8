use crate::core::{AppResult, ResultExt};
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder as RollingBuilder, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_KEEP_DAYS: u64 = 7;
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_FILE_PREFIX: &str = "dlcdeck";
const LOG_FILE_SUFFIX: &str = "log";

#[derive(Debug, Clone)]
pub struct LoggingGuard {
    log_dir: PathBuf,
    level: String,
}

impl LoggingGuard {
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn level(&self) -> &str {
        &self.level
    }
}

fn worker_guard_slot() -> &'static Mutex<Option<WorkerGuard>> {
    static SLOT: OnceLock<Mutex<Option<WorkerGuard>>> = OnceLock::new();
    SLOT.get_or_init(|| Mutex::new(None))
}

pub fn resolve_log_level() -> String {
    std::env::var("DLCDECK_LOG")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

/// Removes rotated log files older than `keep_days`. Individual removal
/// failures are skipped; only an unreadable log directory is an error.
pub fn cleanup_expired_logs(log_dir: &Path, keep_days: u64) -> AppResult<usize> {
    let cutoff = SystemTime::now() - Duration::from_secs(keep_days * 24 * 60 * 60);
    cleanup_logs_before(log_dir, cutoff)
}

fn cleanup_logs_before(log_dir: &Path, cutoff: SystemTime) -> AppResult<usize> {
    let entries = fs::read_dir(log_dir)
        .with_context(|| format!("failed to list log directory: {}", log_dir.display()))
        .with_code("log_dir_list_failed", "failed to list the log directory")?;

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if !file_name.starts_with(LOG_FILE_PREFIX) || !file_name.ends_with(LOG_FILE_SUFFIX) {
            continue;
        }
        let expired = entry
            .metadata()
            .and_then(|metadata| metadata.modified())
            .map(|modified| modified < cutoff)
            .unwrap_or(false);
        if expired && fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }
    Ok(removed)
}

/// Installs the global subscriber: a daily-rolling JSON file layer, plus a
/// compact stderr layer in debug builds. Idempotent when a dispatcher is
/// already set.
pub fn init_logging(data_dir: &Path) -> AppResult<LoggingGuard> {
    let log_dir = data_dir.join("logs");
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory: {}", log_dir.display()))
        .with_code("log_dir_create_failed", "failed to create the log directory")?;
    cleanup_expired_logs(&log_dir, DEFAULT_KEEP_DAYS)?;

    let file_appender = RollingBuilder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(&log_dir)
        .with_context(|| format!("failed to create log writer: {}", log_dir.display()))
        .with_code("log_appender_create_failed", "failed to create the log writer")?;
    let (file_writer, worker_guard) = tracing_appender::non_blocking(file_appender);

    if let Ok(mut slot) = worker_guard_slot().lock() {
        *slot = Some(worker_guard);
    }

    let level = resolve_log_level();
    if !tracing::dispatcher::has_been_set() {
        let env_filter = EnvFilter::new(level.clone());
        let file_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(file_writer)
            .with_current_span(false)
            .with_span_list(false);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer);
        #[cfg(debug_assertions)]
        let subscriber = subscriber.with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_target(true)
                .with_writer(std::io::stderr),
        );

        subscriber
            .try_init()
            .with_context(|| format!("failed to install log subscriber: level={level}"))
            .with_code(
                "log_subscriber_init_failed",
                "failed to install the log subscriber",
            )?;
    }

    Ok(LoggingGuard { log_dir, level })
}

#[cfg(test)]
#[path = "../../tests/infrastructure/logging_tests.rs"]
mod tests;
