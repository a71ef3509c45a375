//! Integration tests for the presentation logging system
//!
//! These tests verify the global logger and the messages the engine emits.
//! No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests


use galaxy_3d_presentation::galaxy3d::log::{Logger, LogEntry, LogSeverity};
use galaxy_3d_presentation::galaxy3d::UpdateConstraintsFlags;
use galaxy_3d_presentation::log::{log, log_detailed, reset_logger, set_logger};
use presentation_test_utils::{on_demand_options, Harness, QueueState, SurfaceState, WindowState};
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

fn messages_from(entries: &Arc<Mutex<Vec<LogEntry>>>, source: &str) -> Vec<String> {
    entries
        .lock()
        .unwrap()
        .iter()
        .filter(|entry| entry.source == source)
        .map(|entry| entry.message.clone())
        .collect()
}

// ============================================================================
// LOGGER TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger() {
    let (test_logger, entries) = TestLogger::new();
    set_logger(test_logger);

    log(LogSeverity::Info, "test::module", "Test info message".to_string());
    log(LogSeverity::Warn, "test::module", "Test warning message".to_string());
    log(LogSeverity::Error, "test::module", "Test error message".to_string());

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 3);

        assert_eq!(captured[0].severity, LogSeverity::Info);
        assert_eq!(captured[0].source, "test::module");
        assert_eq!(captured[0].message, "Test info message");
        assert_eq!(captured[0].file, None);

        assert_eq!(captured[1].severity, LogSeverity::Warn);
        assert_eq!(captured[1].message, "Test warning message");

        assert_eq!(captured[2].severity, LogSeverity::Error);
        assert_eq!(captured[2].message, "Test error message");
    }

    reset_logger();
}

#[test]
#[serial]
fn test_integration_error_logging_with_location() {
    let (test_logger, entries) = TestLogger::new();
    set_logger(test_logger);

    log_detailed(
        LogSeverity::Error,
        "test::error",
        "Critical error occurred".to_string(),
        "test_file.rs",
        42,
    );

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 1);

        let entry = &captured[0];
        assert_eq!(entry.severity, LogSeverity::Error);
        assert_eq!(entry.source, "test::error");
        assert_eq!(entry.message, "Critical error occurred");
        assert_eq!(entry.file, Some("test_file.rs"));
        assert_eq!(entry.line, Some(42));
    }

    reset_logger();
}

#[test]
#[serial]
fn test_integration_logger_reset() {
    let (test_logger, entries) = TestLogger::new();
    set_logger(test_logger);

    log(LogSeverity::Info, "test", "Message 1".to_string());
    assert_eq!(entries.lock().unwrap().len(), 1);

    reset_logger();

    // goes to the default logger
    log(LogSeverity::Info, "test", "Message 2".to_string());
    assert_eq!(entries.lock().unwrap().len(), 1);
}

#[test]
#[serial]
fn test_integration_logging_different_severities() {
    let (test_logger, entries) = TestLogger::new();
    set_logger(test_logger);

    log(LogSeverity::Trace, "test", "Trace message".to_string());
    log(LogSeverity::Debug, "test", "Debug message".to_string());
    log(LogSeverity::Info, "test", "Info message".to_string());
    log(LogSeverity::Warn, "test", "Warn message".to_string());
    log(LogSeverity::Error, "test", "Error message".to_string());

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 5);
        assert_eq!(captured[0].severity, LogSeverity::Trace);
        assert_eq!(captured[1].severity, LogSeverity::Debug);
        assert_eq!(captured[2].severity, LogSeverity::Info);
        assert_eq!(captured[3].severity, LogSeverity::Warn);
        assert_eq!(captured[4].severity, LogSeverity::Error);
    }

    reset_logger();
}

// ============================================================================
// ENGINE MESSAGES
// ============================================================================

#[test]
#[serial]
fn test_integration_engine_logs_lifecycle() {
    let (test_logger, entries) = TestLogger::new();
    set_logger(test_logger);

    let mut h = Harness::new(on_demand_options());
    h.start();
    h.engine.end();

    let messages = messages_from(&entries, "galaxy3d::PresentationEngine");
    assert!(messages.iter().any(|m| m == "Presentation engine started"));
    assert!(messages.iter().any(|m| m == "Presentation engine stopped"));

    reset_logger();
}

#[test]
#[serial]
fn test_integration_engine_logs_swapchain_failure_with_location() {
    let (test_logger, entries) = TestLogger::new();
    set_logger(test_logger);

    let surface = SurfaceState {
        fail_create: true,
        ..Default::default()
    };
    let mut h = Harness::with_states(on_demand_options(), WindowState::default(), surface, QueueState::default());
    assert!(h.engine.run().is_err());

    {
        let captured = entries.lock().unwrap();
        let surface_error = captured
            .iter()
            .find(|entry| entry.source == "test::MockSurface")
            .expect("surface error should be logged");
        assert_eq!(surface_error.severity, LogSeverity::Error);
        assert_eq!(surface_error.message, "surface lost");
        assert!(surface_error.file.is_some());
        assert!(surface_error.line.is_some());
    }

    let messages = messages_from(&entries, "galaxy3d::PresentationEngine");
    assert!(messages.iter().any(|m| m.starts_with("Fail to create swapchain")));

    reset_logger();
}

#[test]
#[serial]
fn test_integration_engine_logs_end_of_life() {
    let (test_logger, entries) = TestLogger::new();
    set_logger(test_logger);

    let mut h = Harness::new(on_demand_options());
    h.start();
    h.engine.update_constraints(UpdateConstraintsFlags::END_OF_LIFE);
    h.engine.poll();

    let messages = messages_from(&entries, "galaxy3d::PresentationEngine");
    assert!(messages.iter().any(|m| m == "End of life requested, finalizing"));

    reset_logger();
}
