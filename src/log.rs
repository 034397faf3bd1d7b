//! Internal diagnostic log file at `~/.convoy/convoy.log`.
//!
//! Distinct from [`ExecutionLog`](crate::events::ExecutionLog), which is
//! part of the observable run state; this file is for debugging convoy
//! itself. Three levels: ERROR (failures), INFO (lifecycle events), and
//! DEBUG (scheduler traces, off unless enabled). Setting `CONVOY_DEBUG=1`
//! in the environment widens the level regardless of how `init` is called.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::OnceLock;

static SINK: OnceLock<Sink> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Info,
    Debug,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

struct Sink {
    path: PathBuf,
    level: LogLevel,
}

/// Initialize the log file, truncating any previous contents.
///
/// Idempotent; the first call wins. Without a home directory the sink is
/// never installed and every write is a no-op.
pub fn init(debug: bool) {
    let env_debug = std::env::var("CONVOY_DEBUG")
        .map(|v| env_enables_debug(&v))
        .unwrap_or(false);
    let level = if debug || env_debug {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    if let Some(dir) = dirs::home_dir().map(|h| h.join(".convoy")) {
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("convoy.log");
        let _ = std::fs::write(&path, "");
        SINK.set(Sink { path, level }).ok();
    }
}

fn env_enables_debug(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

fn format_line(level: LogLevel, timestamp: &str, msg: &str) -> String {
    format!("[{}] [{}] {}", timestamp, level.as_str(), msg)
}

fn write_at(level: LogLevel, msg: &str) {
    let Some(sink) = SINK.get() else {
        return;
    };
    if level > sink.level {
        return;
    }
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&sink.path) {
        let timestamp = chrono::Utc::now().format("%H:%M:%S%.3f").to_string();
        let _ = writeln!(file, "{}", format_line(level, &timestamp, msg));
    }
}

pub fn error(msg: &str) {
    write_at(LogLevel::Error, msg);
}

pub fn info(msg: &str) {
    write_at(LogLevel::Info, msg);
}

/// Suppressed unless `init(true)` or `CONVOY_DEBUG` widened the level.
pub fn debug(msg: &str) {
    write_at(LogLevel::Debug, msg);
}

#[macro_export]
macro_rules! clog {
    ($($arg:tt)*) => {
        $crate::log::info(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! clog_error {
    ($($arg:tt)*) => {
        $crate::log::error(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! clog_debug {
    ($($arg:tt)*) => {
        $crate::log::debug(&format!($($arg)*))
    };
}
