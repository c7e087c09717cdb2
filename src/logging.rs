//! Logging utilities for structured tracing

use std::time::Instant;

/// Track operation timing and log on drop
pub struct Timer {
    start: Instant,
    operation: String,
    database: String,
}

impl Timer {
    /// Create a new timer for an operation on one database
    pub fn new(operation: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            operation: operation.into(),
            database: database.into(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        tracing::debug!(
            operation = %self.operation,
            database = %self.database,
            duration_ms = self.elapsed_ms(),
            "Operation completed"
        );
    }
}

/// Log an error with structured context
pub fn log_error(operation: &str, database: &str, error: &impl std::error::Error) {
    tracing::error!(
        operation = %operation,
        database = %database,
        error = %error,
        error_kind = std::any::type_name_of_val(error),
        "Operation failed"
    );
}
