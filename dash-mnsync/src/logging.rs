//! Logging setup: console output and an optional log file rotated at every start.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{LoggingError, LoggingResult};

/// Prefix of archived log files.
const LOG_FILE_PREFIX: &str = "mnsync.";
/// Name of the log file of the running process.
const ACTIVE_LOG_NAME: &str = "mnsync.log";

/// Keeps the file writer alive. Buffered entries are flushed when it is dropped.
#[derive(Debug)]
pub struct LoggingGuard {
    _worker_guard: Option<WorkerGuard>,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `None` defers to `RUST_LOG`, then to INFO.
    pub level: Option<LevelFilter>,
    /// Log to stderr.
    pub console: bool,
    pub file: Option<LogFileConfig>,
}

impl LoggingConfig {
    pub fn console(level: LevelFilter) -> Self {
        Self {
            level: Some(level),
            console: true,
            file: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogFileConfig {
    pub log_dir: PathBuf,
    /// Archived files kept besides the active one.
    pub max_files: usize,
}

/// Console logging at `level`.
pub fn init_console_logging(level: LevelFilter) -> LoggingResult<LoggingGuard> {
    init_logging(LoggingConfig::console(level))
}

/// Installs the global subscriber described by `config`.
///
/// With neither console nor file output nothing is installed and the tracing
/// macros stay no-ops. Fails if a subscriber is already installed or the log
/// directory cannot be prepared.
pub fn init_logging(config: LoggingConfig) -> LoggingResult<LoggingGuard> {
    if !config.console && config.file.is_none() {
        return Ok(LoggingGuard {
            _worker_guard: None,
        });
    }

    let env_filter = match config.level {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(LevelFilter::INFO.to_string())),
    };

    let (file_layer, guard) = match config.file {
        Some(ref file_config) => {
            let (writer, guard) = open_log_file(file_config)?;
            let layer = fmt::layer().with_target(true).with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    let console_layer = config.console.then(|| fmt::layer().with_target(true));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| LoggingError::SubscriberInit(e.to_string()))?;

    Ok(LoggingGuard {
        _worker_guard: guard,
    })
}

/// Archives the previous log, drops the oldest archives and opens a fresh log file.
fn open_log_file(config: &LogFileConfig) -> LoggingResult<(NonBlocking, WorkerGuard)> {
    fs::create_dir_all(&config.log_dir)?;
    archive_active_log(&config.log_dir)?;
    remove_old_archives(&config.log_dir, config.max_files)?;
    let file = File::create(config.log_dir.join(ACTIVE_LOG_NAME))?;
    Ok(tracing_appender::non_blocking(file))
}

/// Renames the active log to `mnsync.<date>.<time>.log` after its modification time.
fn archive_active_log(log_dir: &Path) -> LoggingResult<()> {
    let active = log_dir.join(ACTIVE_LOG_NAME);
    if !active.exists() {
        return Ok(());
    }
    let modified: DateTime<Local> = fs::metadata(&active)
        .and_then(|metadata| metadata.modified())
        .map(DateTime::from)
        .unwrap_or_else(|_| Local::now());
    let stamp = modified.format("%Y-%m-%d.%H%M%S").to_string();

    let target = std::iter::once(format!("{}{}.log", LOG_FILE_PREFIX, stamp))
        .chain((1..=999).map(|i| format!("{}{}-{}.log", LOG_FILE_PREFIX, stamp, i)))
        .map(|name| log_dir.join(name))
        .find(|path| !path.exists())
        .ok_or_else(|| LoggingError::RotationFailed(format!("no free archive name for {}", stamp)))?;

    fs::rename(&active, &target).map_err(|e| LoggingError::RotationFailed(e.to_string()))
}

fn is_archive(name: &str) -> bool {
    name != ACTIVE_LOG_NAME && name.starts_with(LOG_FILE_PREFIX) && name.ends_with(".log")
}

/// Deletes the oldest archives beyond `max_files`.
fn remove_old_archives(log_dir: &Path, max_files: usize) -> LoggingResult<()> {
    let mut archives: Vec<_> = fs::read_dir(log_dir)
        .map_err(|e| LoggingError::RotationFailed(format!("failed to read log dir: {}", e)))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_str().is_some_and(is_archive))
        .collect();
    if archives.len() <= max_files {
        return Ok(());
    }

    archives.sort_by_key(|entry| entry.metadata().and_then(|m| m.modified()).ok());
    let excess = archives.len() - max_files;
    for entry in archives.into_iter().take(excess) {
        if let Err(e) = fs::remove_file(entry.path()) {
            tracing::warn!("Failed to remove old log file {:?}: {}", entry.path(), e);
        }
    }
    Ok(())
}
