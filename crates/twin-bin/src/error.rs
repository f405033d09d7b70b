// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the opcua-twin binary.

use thiserror::Error;
use twin_opcua::OpcUaError;

/// Result type alias for twin-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Errors that can occur in the opcua-twin binary.
#[derive(Debug, Error)]
pub enum BinError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid command input.
    #[error("Invalid input: {0}")]
    Input(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),

    /// Façade error.
    #[error("{0}")]
    Facade(#[from] OpcUaError),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        /// The context description.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates an input error.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Creates an I/O error.
    pub fn io(msg: impl Into<String>) -> Self {
        Self::Io(msg.into())
    }

    /// Adds context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) => 1,
            Self::Input(_) => 2,
            Self::Io(_) => 4,
            Self::Facade(OpcUaError::Configuration(_)) => 1,
            Self::Facade(_) => 3,
            Self::WithContext { source, .. } => source.exit_code(),
        }
    }
}

impl From<std::io::Error> for BinError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BinError {
    fn from(err: serde_json::Error) -> Self {
        Self::Input(err.to_string())
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Reports an error with appropriate formatting.
pub fn report_error(error: &BinError) {
    eprintln!("Error: {}", error);

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {}", cause);
        source = cause.source();
    }

    if let Some(facade) = facade_error(error) {
        for hint in facade.recovery_hints() {
            eprintln!("  Hint: {}", hint);
        }
    }
}

/// Reports an error and exits with the appropriate code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

fn facade_error(error: &BinError) -> Option<&OpcUaError> {
    match error {
        BinError::Facade(inner) => Some(inner),
        BinError::WithContext { source, .. } => facade_error(source),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = BinError::config("test error");
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_error_with_context() {
        let err = BinError::input("inner error").with_context("outer context");
        assert_eq!(err.to_string(), "outer context: Invalid input: inner error");
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(BinError::config("test").exit_code(), 1);
        assert_eq!(BinError::input("test").exit_code(), 2);
        assert_eq!(BinError::io("test").exit_code(), 4);
        assert_eq!(
            BinError::from(OpcUaError::invalid_address("x=1", "unknown kind")).exit_code(),
            3
        );
        assert_eq!(
            BinError::config("test").with_context("loading").exit_code(),
            1
        );
    }

    #[test]
    fn test_facade_error_found_through_context() {
        let err = BinError::from(OpcUaError::type_mismatch("Double", "string")).with_context("encode");
        assert!(facade_error(&err).is_some());
        assert!(facade_error(&BinError::io("disk")).is_none());
    }
}
