//! Logging
//!
//! tracing-based logging shared by the anim2mp4 binary and library:
//! - human-readable events on stderr
//! - a daily-rotated log file in a log directory (system temp dir by default)
//! - one structured record per external tool run
//!
//! # Examples
//!
//! ```no_run
//! use shared_utils::logging::{init_logging, LogConfig};
//! use tracing::info;
//!
//! init_logging("anim2mp4", LogConfig::default()).expect("Failed to initialize logging");
//! info!("Program started");
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::ffmpeg_process::ToolInvocation;

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory holding `<program>.log.<date>` files.
    pub log_dir: PathBuf,
    /// Number of log files kept per program; older ones are removed at startup.
    pub max_files: usize,
    pub level: Level,
    /// Most verbose level echoed on stderr; the log file follows `level`.
    pub console_level: Level,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: std::env::temp_dir(),
            max_files: 5,
            level: Level::INFO,
            console_level: Level::WARN,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.log_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_max_files(mut self, count: usize) -> Self {
        self.max_files = count;
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_console_level(mut self, level: Level) -> Self {
        self.console_level = level;
        self
    }

    /// `-v` switches both the log file and stderr to DEBUG.
    pub fn verbose(self, verbose: bool) -> Self {
        if verbose {
            self.with_level(Level::DEBUG).with_console_level(Level::DEBUG)
        } else {
            self
        }
    }
}

/// Default filter directive when `RUST_LOG` is not set.
pub fn default_filter(program_name: &str, level: Level) -> String {
    format!("{}={},shared_utils={}", program_name, level, level)
}

/// Installs the global subscriber (stderr + rolling file) and prunes old log files.
///
/// A second call in the same process is a no-op for the subscriber.
pub fn init_logging(program_name: &str, config: LogConfig) -> Result<()> {
    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", config.log_dir))?;

    let log_file_name = format!("{}.log", program_name);
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &config.log_dir, &log_file_name);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(program_name, config.level)));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .without_time()
        .with_filter(LevelFilter::from_level(config.console_level));

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .is_err()
    {
        return Ok(());
    }

    tracing::debug!(
        program = program_name,
        log_dir = ?config.log_dir,
        log_file = log_file_name,
        max_files = config.max_files,
        level = ?config.level,
        console_level = ?config.console_level,
        "Logging system initialized"
    );

    cleanup_old_logs(&config.log_dir, program_name, config.max_files)?;
    Ok(())
}

/// Keeps the newest `max_files` log files of `program_name`, deleting the rest.
fn cleanup_old_logs(log_dir: &Path, program_name: &str, max_files: usize) -> Result<()> {
    use std::fs;

    let prefix = format!("{}.log", program_name);
    let entries = fs::read_dir(log_dir)
        .with_context(|| format!("Failed to read log directory: {:?}", log_dir))?;

    let mut log_files: Vec<(PathBuf, std::time::SystemTime)> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().starts_with(&prefix))
                .unwrap_or(false)
        })
        .filter_map(|p| {
            let modified = fs::metadata(&p).and_then(|m| m.modified()).ok()?;
            Some((p, modified))
        })
        .collect();

    if log_files.len() <= max_files {
        return Ok(());
    }

    log_files.sort_by(|a, b| b.1.cmp(&a.1));
    for (path, _) in log_files.iter().skip(max_files) {
        match fs::remove_file(path) {
            Ok(()) => tracing::debug!(path = ?path, "Removed old log file"),
            Err(e) => tracing::warn!(path = ?path, error = %e, "Failed to remove old log file"),
        }
    }

    Ok(())
}

/// Records one external tool run: command, duration and exit status.
///
/// A non-zero exit is not an error at this level: the caller holds the
/// failure and decides whether it is fatal or recovered from. Captured output
/// is only logged at debug level.
pub fn log_external_tool(
    invocation: &ToolInvocation,
    exit_code: Option<i32>,
    output: &str,
    duration: Duration,
) {
    let tool = invocation.program.as_str();
    match exit_code {
        Some(0) => {
            tracing::info!(
                tool,
                command = %invocation,
                duration_secs = duration.as_secs_f64(),
                "External tool completed successfully"
            );
            tracing::debug!(tool, output = %output, "External tool output");
        }
        Some(code) => {
            tracing::info!(
                tool,
                command = %invocation,
                duration_secs = duration.as_secs_f64(),
                exit_code = code,
                "External tool exited with failure"
            );
            tracing::debug!(tool, output = %output, "External tool output");
        }
        None => {
            tracing::info!(
                tool,
                command = %invocation,
                duration_secs = duration.as_secs_f64(),
                "External tool terminated without exit code"
            );
            tracing::debug!(tool, output = %output, "External tool output");
        }
    }
}
