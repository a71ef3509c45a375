//! Internal logging system for the Galaxy3D presentation core
//!
//! This module provides a flexible logging system with:
//! - Customizable logger via Logger trait
//! - Severity levels (Trace, Debug, Info, Warn, Error)
//! - Colored console output by default
//! - Thread-safe global logger behind an RwLock, so fence and queue
//!   callbacks running off the loop thread can log too
//! - File and line information for detailed ERROR logs

use colored::*;
use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Logger trait for custom logging implementations
///
/// Implement this trait to create custom loggers (file logging, network logging, etc.)
///
/// # Example
///
/// ```no_run
/// use galaxy_3d_presentation::galaxy3d::log::{Logger, LogEntry};
///
/// struct FileLogger {
///     file: std::fs::File,
/// }
///
/// impl Logger for FileLogger {
///     fn log(&self, entry: &LogEntry) {
///         // Write to file...
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Log an entry
    fn log(&self, entry: &LogEntry);
}

/// Log entry containing all information about a log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity level (Trace, Debug, Info, Warn, Error)
    pub severity: LogSeverity,

    /// Timestamp when the log was created
    pub timestamp: SystemTime,

    /// Source module (e.g., "galaxy3d::PresentationEngine", "galaxy3d::Swapchain")
    pub source: String,

    /// Log message
    pub message: String,

    /// Source file (only for detailed ERROR logs)
    pub file: Option<&'static str>,

    /// Source line (only for detailed ERROR logs)
    pub line: Option<u32>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    /// Per-frame state transitions (very verbose)
    Trace,

    /// Development/debugging information
    Debug,

    /// Important informational messages (swapchain created, engine started)
    Info,

    /// Warning messages (swapchain replaced without presenting)
    Warn,

    /// Error messages (with file:line details)
    Error,
}

/// Default logger implementation using colored console output
///
/// Format:
/// - Normal: `[timestamp] [SEVERITY] [source] message`
/// - Error: `[timestamp] [ERROR] [source] message (file:line)`
pub struct DefaultLogger;

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        let severity_str = match entry.severity {
            LogSeverity::Trace => "TRACE".bright_black(),
            LogSeverity::Debug => "DEBUG".cyan(),
            LogSeverity::Info => "INFO ".green(),
            LogSeverity::Warn => "WARN ".yellow(),
            LogSeverity::Error => "ERROR".red().bold(),
        };

        let source = entry.source.bright_blue();

        if let (Some(file), Some(line)) = (entry.file, entry.line) {
            println!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp,
                severity_str,
                source,
                entry.message,
                file,
                line
            );
        } else {
            println!(
                "[{}] [{}] [{}] {}",
                timestamp,
                severity_str,
                source,
                entry.message
            );
        }
    }
}

// ===== GLOBAL LOGGER =====

static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

fn logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)))
}

/// Replace the global logger
pub fn set_logger<L: Logger + 'static>(logger_impl: L) {
    if let Ok(mut lock) = logger().write() {
        *lock = Box::new(logger_impl);
    }
}

/// Restore the [`DefaultLogger`]
pub fn reset_logger() {
    if let Ok(mut lock) = logger().write() {
        *lock = Box::new(DefaultLogger);
    }
}

/// Log a message without file:line (used by engine_trace! .. engine_warn!)
pub fn log(severity: LogSeverity, source: &str, message: String) {
    if let Ok(lock) = logger().read() {
        lock.log(&LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: None,
            line: None,
        });
    }
}

/// Log a message with file:line (used by engine_error! and engine_err!)
pub fn log_detailed(
    severity: LogSeverity,
    source: &str,
    message: String,
    file: &'static str,
    line: u32,
) {
    if let Ok(lock) = logger().read() {
        lock.log(&LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: Some(file),
            line: Some(line),
        });
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message (per-frame state transitions)
///
/// ```ignore
/// engine_trace!("galaxy3d::PresentationEngine", "{}: handle_frame_started", order);
/// ```
#[macro_export]
macro_rules! engine_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log(
            $crate::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message (development information)
#[macro_export]
macro_rules! engine_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log(
            $crate::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message (important events)
#[macro_export]
macro_rules! engine_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log(
            $crate::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message (potential issues)
#[macro_export]
macro_rules! engine_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log(
            $crate::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
///
/// ```ignore
/// engine_error!("galaxy3d::PresentationEngine", "Fail to create swapchain: {}", err);
/// ```
#[macro_export]
macro_rules! engine_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::log::log_detailed(
            $crate::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
