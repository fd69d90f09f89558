//! Leveled file logging for the backlog engine.
//!
//! Log levels:
//! - ERROR: a store operation failed for reasons outside the caller's control
//! - WARN: a mutation was rejected (cycle, self-dependency) or a task failed scoring
//! - INFO: store lifecycle (open, migrate, close) and CLI commands
//! - DEBUG: every mutation and query with its arguments
//! - TRACE: per-task scoring and similarity values
//!
//! Nothing is written until [`init`] or [`init_with_debug`] has run, so the
//! library stays silent when embedded. Debug mode can be enabled with the
//! `--debug` flag or the `TUSK_DEBUG=1` env var.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Log levels for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

/// Initialize logging to ~/.tusk/tusk.log
pub fn init() {
    init_with_debug(false);
}

/// Initialize logging to ~/.tusk/tusk.log with an explicit debug setting.
pub fn init_with_debug(debug: bool) {
    if let Some(dir) = dirs::home_dir().map(|h| h.join(".tusk")) {
        init_in(&dir, debug);
    }
}

/// Initialize logging into `dir/tusk.log`.
///
/// The log is appended to, not truncated: several CLI processes driven by
/// parallel agents share one file.
pub fn init_in(dir: &Path, debug: bool) {
    let env_debug = std::env::var("TUSK_DEBUG")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let level = if debug || env_debug {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    set_level(level);

    if std::fs::create_dir_all(dir).is_ok() {
        LOG_PATH.set(dir.join("tusk.log")).ok();
    }
}

/// Check if debug output is enabled.
pub fn is_debug() -> bool {
    get_level() >= LogLevel::Debug
}

/// Set the minimum log level for output.
pub fn set_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Get the current log level.
pub fn get_level() -> LogLevel {
    LogLevel::from_u8(LOG_LEVEL.load(Ordering::Relaxed))
}

/// Log a message at the specified level.
pub fn log_at(level: LogLevel, msg: &str) {
    if level > get_level() {
        return;
    }

    let Some(path) = LOG_PATH.get() else {
        return;
    };
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
        let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
        let _ = writeln!(
            file,
            "[{}] [{}] [pid {}] {}",
            timestamp,
            level.as_str(),
            std::process::id(),
            msg
        );
    }
}

pub fn error(msg: &str) {
    log_at(LogLevel::Error, msg);
}

pub fn warn(msg: &str) {
    log_at(LogLevel::Warn, msg);
}

pub fn info(msg: &str) {
    log_at(LogLevel::Info, msg);
}

pub fn debug(msg: &str) {
    log_at(LogLevel::Debug, msg);
}

pub fn trace(msg: &str) {
    log_at(LogLevel::Trace, msg);
}

/// Log at INFO level.
#[macro_export]
macro_rules! tlog {
    ($($arg:tt)*) => {
        $crate::log::info(&format!($($arg)*))
    };
}

/// Log at ERROR level.
#[macro_export]
macro_rules! tlog_error {
    ($($arg:tt)*) => {
        $crate::log::error(&format!($($arg)*))
    };
}

/// Log at WARN level.
#[macro_export]
macro_rules! tlog_warn {
    ($($arg:tt)*) => {
        $crate::log::warn(&format!($($arg)*))
    };
}

/// Log at DEBUG level (only written in debug mode).
#[macro_export]
macro_rules! tlog_debug {
    ($($arg:tt)*) => {
        if $crate::log::is_debug() {
            $crate::log::debug(&format!($($arg)*))
        }
    };
}

/// Log at TRACE level. Arguments are not formatted below TRACE.
#[macro_export]
macro_rules! tlog_trace {
    ($($arg:tt)*) => {
        if $crate::log::get_level() >= $crate::log::LogLevel::Trace {
            $crate::log::trace(&format!($($arg)*))
        }
    };
}
