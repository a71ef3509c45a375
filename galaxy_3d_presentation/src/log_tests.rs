//! Unit tests for log.rs
//!
//! Tests Logger trait, LogEntry, LogSeverity, DefaultLogger and the global logger.

use crate::log::{self, DefaultLogger, LogEntry, LogSeverity, Logger};
use serial_test::serial;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

fn entry(severity: LogSeverity, file: Option<&'static str>, line: Option<u32>) -> LogEntry {
    LogEntry {
        severity,
        timestamp: SystemTime::now(),
        source: "galaxy3d::PresentationEngine".to_string(),
        message: format!("{:?} message", severity),
        file,
        line,
    }
}

// ============================================================================
// LOG SEVERITY TESTS
// ============================================================================

#[test]
fn test_log_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}

#[test]
fn test_log_severity_debug() {
    assert_eq!(format!("{:?}", LogSeverity::Trace), "Trace");
    assert_eq!(format!("{:?}", LogSeverity::Error), "Error");
}

// ============================================================================
// LOG ENTRY TESTS
// ============================================================================

#[test]
fn test_log_entry_creation_with_file_line() {
    let e = entry(LogSeverity::Error, Some("swapchain.rs"), Some(42));

    assert_eq!(e.severity, LogSeverity::Error);
    assert_eq!(e.source, "galaxy3d::PresentationEngine");
    assert_eq!(e.file, Some("swapchain.rs"));
    assert_eq!(e.line, Some(42));
}

#[test]
fn test_log_entry_clone() {
    let e1 = entry(LogSeverity::Warn, None, None);
    let e2 = e1.clone();

    assert_eq!(e1.severity, e2.severity);
    assert_eq!(e1.source, e2.source);
    assert_eq!(e1.message, e2.message);
}

// ============================================================================
// DEFAULT LOGGER TESTS
// ============================================================================

#[test]
fn test_default_logger_all_severities() {
    let logger = DefaultLogger;

    for severity in [
        LogSeverity::Trace,
        LogSeverity::Debug,
        LogSeverity::Info,
        LogSeverity::Warn,
        LogSeverity::Error,
    ] {
        // Just verify neither branch panics
        logger.log(&entry(severity, None, None));
        logger.log(&entry(severity, Some("test.rs"), Some(7)));
    }
}

#[test]
fn test_logger_trait_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<DefaultLogger>();
}

// ============================================================================
// GLOBAL LOGGER TESTS
// ============================================================================

struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

#[test]
#[serial]
fn test_macros_route_to_custom_logger() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    log::set_logger(TestLogger { entries: entries.clone() });

    crate::engine_trace!("galaxy3d::test", "trace {}", 1);
    crate::engine_debug!("galaxy3d::test", "debug {}", 2);
    crate::engine_info!("galaxy3d::test", "info {}", 3);
    crate::engine_warn!("galaxy3d::test", "warn {}", 4);
    crate::engine_error!("galaxy3d::test", "error {}", 5);

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 5);
    assert_eq!(captured[0].severity, LogSeverity::Trace);
    assert_eq!(captured[0].message, "trace 1");
    assert!(captured[3].file.is_none());
    assert_eq!(captured[4].severity, LogSeverity::Error);
    assert!(captured[4].file.is_some());
    drop(captured);

    log::reset_logger();
}

#[test]
#[serial]
fn test_reset_logger_stops_capture() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    log::set_logger(TestLogger { entries: entries.clone() });
    log::reset_logger();

    crate::engine_info!("galaxy3d::test", "goes to console");

    assert!(entries.lock().unwrap().is_empty());
}
