// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the node access façade.
//!
//! Every failure the façade can produce is an [`OpcUaError`]. The error knows
//! the OPC UA status code it maps to, so it can be turned into the uniform
//! `{status_code, diagnostics}` envelope returned to callers.
//!
//! # Error Categories
//!
//! ```text
//! OpcUaError
//! ├── Address       - Malformed/unresolvable addresses, browse path resolution
//! ├── Browse        - Continuation tokens and browse failures
//! ├── Conversion    - Variant codec failures (type mismatch, out of range)
//! ├── Service       - Failures reported by the server (status code)
//! ├── Transport     - Systemic failures of the collaborator stack
//! ├── Configuration - Invalid settings
//! ├── Cancelled     - Caller cancelled the operation
//! └── Timeout       - Operation exceeded its deadline
//! ```
//!
//! # Examples
//!
//! ```
//! use twin_opcua::error::{OpcUaError, AddressError, status_codes};
//!
//! let error = OpcUaError::address(AddressError::no_match("Objects/Boiler"));
//! assert_eq!(error.status_code(), status_codes::BAD_NO_MATCH);
//! assert!(!error.is_retryable());
//! ```

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::Level;

// =============================================================================
// OpcUaError - Main Error Type
// =============================================================================

/// The main error type for façade operations.
#[derive(Debug, Error)]
pub enum OpcUaError {
    /// Address translation and browse path resolution errors.
    #[error("{0}")]
    Address(#[from] AddressError),

    /// Browse and continuation errors.
    #[error("{0}")]
    Browse(#[from] BrowseError),

    /// Variant codec errors.
    #[error("{0}")]
    Conversion(#[from] ConversionError),

    /// Failure reported by the server.
    #[error("{0}")]
    Service(#[from] ServiceError),

    /// Systemic failure of the underlying client stack.
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Configuration errors.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// The caller cancelled the operation.
    #[error("Operation '{operation}' was cancelled")]
    Cancelled {
        /// The operation that was cancelled.
        operation: String,
    },

    /// The operation exceeded its deadline.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The deadline that was exceeded.
        duration: Duration,
    },
}

impl OpcUaError {
    // =========================================================================
    // Factory Methods
    // =========================================================================

    /// Creates an address error.
    #[inline]
    pub fn address(error: AddressError) -> Self {
        Self::Address(error)
    }

    /// Creates a browse error.
    #[inline]
    pub fn browse(error: BrowseError) -> Self {
        Self::Browse(error)
    }

    /// Creates a conversion error.
    #[inline]
    pub fn conversion(error: ConversionError) -> Self {
        Self::Conversion(error)
    }

    /// Creates a service error.
    #[inline]
    pub fn service(error: ServiceError) -> Self {
        Self::Service(error)
    }

    /// Creates a transport error.
    #[inline]
    pub fn transport(error: TransportError) -> Self {
        Self::Transport(error)
    }

    /// Creates a configuration error.
    #[inline]
    pub fn configuration(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }

    // =========================================================================
    // Convenience Constructors
    // =========================================================================

    /// Creates an invalid address error.
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Address(AddressError::invalid(address, reason))
    }

    /// Creates a server fault from a bad status code.
    pub fn server_fault(status_code: u32, message: impl Into<String>) -> Self {
        Self::Service(ServiceError::fault(status_code, message))
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::Conversion(ConversionError::type_mismatch(expected, actual))
    }

    /// Creates a cancellation error.
    pub fn cancelled(operation: impl Into<String>) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    // =========================================================================
    // Error Properties
    // =========================================================================

    /// Returns the OPC UA status code this error maps to.
    pub fn status_code(&self) -> u32 {
        match self {
            Self::Address(e) => e.status_code(),
            Self::Browse(e) => e.status_code(),
            Self::Conversion(e) => e.status_code(),
            Self::Service(e) => e.status_code,
            Self::Transport(e) => e.status_code(),
            Self::Configuration(_) => status_codes::BAD_CONFIGURATION_ERROR,
            Self::Cancelled { .. } => status_codes::BAD_REQUEST_CANCELLED_BY_CLIENT,
            Self::Timeout { .. } => status_codes::BAD_TIMEOUT,
        }
    }

    /// Returns `true` for failures of the collaborator stack itself.
    ///
    /// Systemic errors are the only ones that leave the façade as `Err`;
    /// everything else is reported inside the response envelope.
    pub fn is_systemic(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Browse(e) => e.is_retryable(),
            Self::Service(e) => e.is_retryable(),
            Self::Transport(e) => e.is_retryable(),
            Self::Timeout { .. } => true,
            Self::Address(_)
            | Self::Conversion(_)
            | Self::Configuration(_)
            | Self::Cancelled { .. } => false,
        }
    }

    /// Returns the suggested retry delay for this error.
    ///
    /// Returns `None` if the error is not retryable.
    pub fn suggested_retry_delay(&self) -> Option<Duration> {
        if !self.is_retryable() {
            return None;
        }

        match self {
            Self::Transport(e) => Some(e.suggested_retry_delay()),
            Self::Timeout { duration, .. } => Some((*duration / 2).max(Duration::from_millis(100))),
            _ => Some(Duration::from_millis(500)),
        }
    }

    /// Returns the severity level of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Address(_) | Self::Browse(_) => ErrorSeverity::Warning,
            Self::Conversion(_) => ErrorSeverity::Warning,
            Self::Service(e) => e.severity(),
            Self::Transport(_) => ErrorSeverity::Error,
            Self::Configuration(_) => ErrorSeverity::Critical,
            Self::Cancelled { .. } => ErrorSeverity::Info,
            Self::Timeout { .. } => ErrorSeverity::Warning,
        }
    }

    /// Returns the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Address(_) => "address",
            Self::Browse(_) => "browse",
            Self::Conversion(_) => "conversion",
            Self::Service(_) => "service",
            Self::Transport(_) => "transport",
            Self::Configuration(_) => "configuration",
            Self::Cancelled { .. } => "cancelled",
            Self::Timeout { .. } => "timeout",
        }
    }

    /// Returns a unique error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Address(e) => e.error_code(),
            Self::Browse(e) => e.error_code(),
            Self::Conversion(e) => e.error_code(),
            Self::Service(_) => ErrorCode::new(4, 1),
            Self::Transport(e) => e.error_code(),
            Self::Configuration(_) => ErrorCode::new(6, 1),
            Self::Cancelled { .. } => ErrorCode::new(7, 1),
            Self::Timeout { .. } => ErrorCode::new(7, 2),
        }
    }

    /// Returns recovery hints for this error.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::Address(e) => e.recovery_hints(),
            Self::Browse(e) => e.recovery_hints(),
            Self::Conversion(e) => e.recovery_hints(),
            Self::Service(_) => vec![
                "Inspect the status code and diagnostics returned by the server",
                "Verify the node exists and is accessible for the session user",
            ],
            Self::Transport(e) => e.recovery_hints(),
            Self::Configuration(_) => vec!["Review the façade configuration file"],
            Self::Cancelled { .. } => vec!["Reissue the request if the result is still needed"],
            Self::Timeout { .. } => vec![
                "Increase the operation timeout",
                "Reduce max_references to shrink browse pages",
            ],
        }
    }

    /// Returns the tracing level for this error.
    pub fn tracing_level(&self) -> Level {
        self.severity().to_tracing_level()
    }

    /// Logs this error with appropriate level and context.
    pub fn log(&self, context: &str) {
        let code = self.error_code();
        let status = status_codes::name(self.status_code());

        match self.tracing_level() {
            Level::ERROR => tracing::error!(
                error_code = %code,
                status = status,
                category = self.category(),
                context = context,
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                status = status,
                category = self.category(),
                context = context,
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                status = status,
                category = self.category(),
                context = context,
                "{self}"
            ),
        }
    }
}

// =============================================================================
// AddressError
// =============================================================================

/// Address translation and browse path resolution errors.
#[derive(Debug, Error)]
pub enum AddressError {
    /// Malformed or unresolvable address text.
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress {
        /// The offending address text.
        address: String,
        /// Reason.
        reason: String,
    },

    /// A browse path step matched no node.
    #[error("Browse path '{path}' did not resolve to any node")]
    NoMatch {
        /// The path (or the failing step).
        path: String,
    },

    /// A browse path step matched more than one node.
    #[error("Browse path '{path}' resolved to {count} nodes")]
    Ambiguous {
        /// The path (or the failing step).
        path: String,
        /// Number of candidates found.
        count: usize,
    },
}

impl AddressError {
    /// Creates an invalid address error.
    pub fn invalid(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Creates a no-match error.
    pub fn no_match(path: impl Into<String>) -> Self {
        Self::NoMatch { path: path.into() }
    }

    /// Creates an ambiguous-match error.
    pub fn ambiguous(path: impl Into<String>, count: usize) -> Self {
        Self::Ambiguous {
            path: path.into(),
            count,
        }
    }

    /// Returns the OPC UA status code.
    pub fn status_code(&self) -> u32 {
        match self {
            Self::InvalidAddress { .. } => status_codes::BAD_NODE_ID_INVALID,
            Self::NoMatch { .. } => status_codes::BAD_NO_MATCH,
            Self::Ambiguous { .. } => status_codes::BAD_BROWSE_NAME_DUPLICATED,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidAddress { .. } => ErrorCode::new(1, 1),
            Self::NoMatch { .. } => ErrorCode::new(1, 2),
            Self::Ambiguous { .. } => ErrorCode::new(1, 3),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidAddress { .. } => vec![
                "Address formats: ns=<index>;i=<numeric>, <namespace-uri>#s=<string>",
                "Identifier kinds are i=, s=, g= and b=",
            ],
            Self::NoMatch { .. } => vec![
                "Browse the start node to check the available browse names",
                "Qualify the element with a reference type, e.g. <HasComponent>Name",
            ],
            Self::Ambiguous { .. } => vec![
                "Qualify the browse name with its namespace, e.g. <uri>#Name",
                "Restrict the reference type of the ambiguous element",
            ],
        }
    }
}

// =============================================================================
// BrowseError
// =============================================================================

/// Node browsing errors.
#[derive(Debug, Error)]
pub enum BrowseError {
    /// Malformed, expired or exhausted continuation token.
    #[error("Invalid continuation token: {reason}")]
    InvalidContinuation {
        /// Reason.
        reason: String,
    },

    /// Browse failed for a node.
    #[error("Browse failed for node '{node_id}': {message}")]
    BrowseFailed {
        /// Node being browsed.
        node_id: String,
        /// Error message.
        message: String,
    },
}

impl BrowseError {
    /// Creates an invalid continuation error.
    pub fn invalid_continuation(reason: impl Into<String>) -> Self {
        Self::InvalidContinuation {
            reason: reason.into(),
        }
    }

    /// Creates a browse failed error.
    pub fn browse_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BrowseFailed {
            node_id: node_id.into(),
            message: message.into(),
        }
    }

    /// Returns the OPC UA status code.
    pub fn status_code(&self) -> u32 {
        match self {
            Self::InvalidContinuation { .. } => status_codes::BAD_CONTINUATION_POINT_INVALID,
            Self::BrowseFailed { .. } => status_codes::BAD_NOT_FOUND,
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BrowseFailed { .. })
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::InvalidContinuation { .. } => ErrorCode::new(2, 1),
            Self::BrowseFailed { .. } => ErrorCode::new(2, 2),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidContinuation { .. } => vec![
                "Restart the browse with browse_first",
                "Continuation tokens are only valid on the session that issued them",
            ],
            Self::BrowseFailed { .. } => vec!["Check server connection", "Retry the operation"],
        }
    }
}

// =============================================================================
// ConversionError
// =============================================================================

/// Variant codec errors.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Value shape does not fit the declared type.
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type.
        expected: String,
        /// Actual type.
        actual: String,
    },

    /// Numeric value does not fit the declared type.
    #[error("Value {value} out of range for {target_type}")]
    OutOfRange {
        /// Value text.
        value: String,
        /// Target type.
        target_type: String,
    },

    /// Text could not be parsed into the declared type.
    #[error("Invalid {target_type} format: {message}")]
    InvalidFormat {
        /// Target type.
        target_type: String,
        /// Message.
        message: String,
    },

    /// Declared type name is not known.
    #[error("Unsupported data type: {type_name}")]
    UnsupportedType {
        /// Type name.
        type_name: String,
    },

    /// Too many arguments supplied for a method.
    #[error("Too many arguments: {supplied} supplied, method declares {declared}")]
    TooManyArguments {
        /// Supplied argument count.
        supplied: usize,
        /// Declared argument count.
        declared: usize,
    },
}

impl ConversionError {
    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an out of range error.
    pub fn out_of_range(value: impl fmt::Display, target_type: impl Into<String>) -> Self {
        Self::OutOfRange {
            value: value.to_string(),
            target_type: target_type.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(target_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            target_type: target_type.into(),
            message: message.into(),
        }
    }

    /// Creates an unsupported type error.
    pub fn unsupported_type(type_name: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
        }
    }

    /// Returns the OPC UA status code.
    pub fn status_code(&self) -> u32 {
        match self {
            Self::TypeMismatch { .. } | Self::InvalidFormat { .. } => {
                status_codes::BAD_TYPE_MISMATCH
            }
            Self::OutOfRange { .. } => status_codes::BAD_OUT_OF_RANGE,
            Self::UnsupportedType { .. } => status_codes::BAD_DATA_TYPE_ID_UNKNOWN,
            Self::TooManyArguments { .. } => status_codes::BAD_TOO_MANY_ARGUMENTS,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::TypeMismatch { .. } => ErrorCode::new(3, 1),
            Self::OutOfRange { .. } => ErrorCode::new(3, 2),
            Self::InvalidFormat { .. } => ErrorCode::new(3, 3),
            Self::UnsupportedType { .. } => ErrorCode::new(3, 4),
            Self::TooManyArguments { .. } => ErrorCode::new(3, 5),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::TypeMismatch { .. } | Self::InvalidFormat { .. } => vec![
                "Check the declared data type and value rank of the node",
                "Use {\"Type\": <name>, \"Body\": <value>} to pin an explicit type",
            ],
            Self::OutOfRange { .. } => vec!["Use a wider data type or a smaller value"],
            Self::UnsupportedType { .. } => vec!["Use a built-in type name or a data type node id"],
            Self::TooManyArguments { .. } => vec!["Fetch the method metadata to see its arguments"],
        }
    }
}

// =============================================================================
// ServiceError
// =============================================================================

/// A failure reported by the server for an operation.
#[derive(Debug, Clone, Error)]
#[error("Server fault {status_name}: {message}")]
pub struct ServiceError {
    /// OPC UA status code.
    pub status_code: u32,
    /// Symbolic status name.
    pub status_name: &'static str,
    /// Error message.
    pub message: String,
    /// Server-side diagnostic detail, when the server returned any.
    pub diagnostic_info: Option<String>,
}

impl ServiceError {
    /// Creates a server fault.
    pub fn fault(status_code: u32, message: impl Into<String>) -> Self {
        Self {
            status_code,
            status_name: status_codes::name(status_code),
            message: message.into(),
            diagnostic_info: None,
        }
    }

    /// Attaches server diagnostic detail.
    pub fn with_diagnostic_info(mut self, info: impl Into<String>) -> Self {
        self.diagnostic_info = Some(info.into());
        self
    }

    /// Returns `true` if the server indicated a transient condition.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.status_code,
            status_codes::BAD_TIMEOUT
                | status_codes::BAD_RESOURCE_UNAVAILABLE
                | status_codes::BAD_TOO_MANY_OPERATIONS
        )
    }

    /// Returns the severity level.
    pub fn severity(&self) -> ErrorSeverity {
        if status_codes::is_uncertain(self.status_code) {
            ErrorSeverity::Info
        } else {
            ErrorSeverity::Warning
        }
    }
}

// =============================================================================
// TransportError
// =============================================================================

/// Systemic failures of the collaborator client stack.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No session is available.
    #[error("Not connected to server")]
    NotConnected,

    /// The session was closed or is invalid.
    #[error("Session '{session_id}' is no longer valid: {reason}")]
    SessionInvalid {
        /// Session identifier.
        session_id: String,
        /// Reason.
        reason: String,
    },

    /// Communication failure on the secure channel.
    #[error("Communication failure: {message}")]
    Communication {
        /// Error message.
        message: String,
    },
}

impl TransportError {
    /// Creates a communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::Communication {
            message: message.into(),
        }
    }

    /// Returns the OPC UA status code.
    pub fn status_code(&self) -> u32 {
        match self {
            Self::NotConnected => status_codes::BAD_SERVER_NOT_CONNECTED,
            Self::SessionInvalid { .. } => status_codes::BAD_SESSION_ID_INVALID,
            Self::Communication { .. } => status_codes::BAD_COMMUNICATION_ERROR,
        }
    }

    /// Returns `true` if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        true
    }

    /// Returns the suggested retry delay.
    pub fn suggested_retry_delay(&self) -> Duration {
        match self {
            Self::NotConnected => Duration::from_secs(5),
            Self::SessionInvalid { .. } => Duration::from_secs(1),
            Self::Communication { .. } => Duration::from_secs(2),
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotConnected => ErrorCode::new(5, 1),
            Self::SessionInvalid { .. } => ErrorCode::new(5, 2),
            Self::Communication { .. } => ErrorCode::new(5, 3),
        }
    }

    /// Returns recovery hints.
    pub fn recovery_hints(&self) -> Vec<&'static str> {
        match self {
            Self::NotConnected => vec!["Connect the client session before issuing requests"],
            Self::SessionInvalid { .. } => vec!["Recreate the session and restart the operation"],
            Self::Communication { .. } => vec![
                "Check network connectivity to the server",
                "Verify the secure channel is still open",
            ],
        }
    }
}

// =============================================================================
// ConfigurationError
// =============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Invalid configuration value.
    #[error("Invalid configuration for '{field}': {reason}")]
    InvalidValue {
        /// Field name.
        field: String,
        /// Reason.
        reason: String,
    },

    /// Configuration file could not be read or parsed.
    #[error("Failed to load configuration from '{path}': {message}")]
    LoadFailed {
        /// File path.
        path: String,
        /// Error message.
        message: String,
    },
}

impl ConfigurationError {
    /// Creates an invalid value error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a load failure.
    pub fn load_failed(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LoadFailed {
            path: path.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Status Codes
// =============================================================================

/// OPC UA status codes used by the façade.
pub mod status_codes {
    /// Good.
    pub const GOOD: u32 = 0x0000_0000;
    /// Uncertain.
    pub const UNCERTAIN: u32 = 0x4000_0000;
    /// Bad.
    pub const BAD: u32 = 0x8000_0000;
    /// BadUnexpectedError.
    pub const BAD_UNEXPECTED_ERROR: u32 = 0x8001_0000;
    /// BadInternalError.
    pub const BAD_INTERNAL_ERROR: u32 = 0x8002_0000;
    /// BadResourceUnavailable.
    pub const BAD_RESOURCE_UNAVAILABLE: u32 = 0x8004_0000;
    /// BadCommunicationError.
    pub const BAD_COMMUNICATION_ERROR: u32 = 0x8005_0000;
    /// BadEncodingError.
    pub const BAD_ENCODING_ERROR: u32 = 0x8006_0000;
    /// BadDecodingError.
    pub const BAD_DECODING_ERROR: u32 = 0x8007_0000;
    /// BadTimeout.
    pub const BAD_TIMEOUT: u32 = 0x800A_0000;
    /// BadServiceUnsupported.
    pub const BAD_SERVICE_UNSUPPORTED: u32 = 0x800B_0000;
    /// BadServerNotConnected.
    pub const BAD_SERVER_NOT_CONNECTED: u32 = 0x800D_0000;
    /// BadNothingToDo.
    pub const BAD_NOTHING_TO_DO: u32 = 0x800F_0000;
    /// BadTooManyOperations.
    pub const BAD_TOO_MANY_OPERATIONS: u32 = 0x8010_0000;
    /// BadDataTypeIdUnknown.
    pub const BAD_DATA_TYPE_ID_UNKNOWN: u32 = 0x8011_0000;
    /// BadUserAccessDenied.
    pub const BAD_USER_ACCESS_DENIED: u32 = 0x801F_0000;
    /// BadSessionIdInvalid.
    pub const BAD_SESSION_ID_INVALID: u32 = 0x8025_0000;
    /// BadSessionClosed.
    pub const BAD_SESSION_CLOSED: u32 = 0x8026_0000;
    /// BadRequestCancelledByClient.
    pub const BAD_REQUEST_CANCELLED_BY_CLIENT: u32 = 0x802C_0000;
    /// BadNodeIdInvalid.
    pub const BAD_NODE_ID_INVALID: u32 = 0x8033_0000;
    /// BadNodeIdUnknown.
    pub const BAD_NODE_ID_UNKNOWN: u32 = 0x8034_0000;
    /// BadAttributeIdInvalid.
    pub const BAD_ATTRIBUTE_ID_INVALID: u32 = 0x8035_0000;
    /// BadNotReadable.
    pub const BAD_NOT_READABLE: u32 = 0x803A_0000;
    /// BadNotWritable.
    pub const BAD_NOT_WRITABLE: u32 = 0x803B_0000;
    /// BadOutOfRange.
    pub const BAD_OUT_OF_RANGE: u32 = 0x803C_0000;
    /// BadNotSupported.
    pub const BAD_NOT_SUPPORTED: u32 = 0x803D_0000;
    /// BadNotFound.
    pub const BAD_NOT_FOUND: u32 = 0x803E_0000;
    /// BadContinuationPointInvalid.
    pub const BAD_CONTINUATION_POINT_INVALID: u32 = 0x804A_0000;
    /// BadNoContinuationPoints.
    pub const BAD_NO_CONTINUATION_POINTS: u32 = 0x804B_0000;
    /// BadReferenceTypeIdInvalid.
    pub const BAD_REFERENCE_TYPE_ID_INVALID: u32 = 0x804C_0000;
    /// BadBrowseDirectionInvalid.
    pub const BAD_BROWSE_DIRECTION_INVALID: u32 = 0x804D_0000;
    /// BadBrowseNameDuplicated.
    pub const BAD_BROWSE_NAME_DUPLICATED: u32 = 0x8061_0000;
    /// BadNoMatch.
    pub const BAD_NO_MATCH: u32 = 0x806F_0000;
    /// BadWriteNotSupported.
    pub const BAD_WRITE_NOT_SUPPORTED: u32 = 0x8073_0000;
    /// BadTypeMismatch.
    pub const BAD_TYPE_MISMATCH: u32 = 0x8074_0000;
    /// BadMethodInvalid.
    pub const BAD_METHOD_INVALID: u32 = 0x8075_0000;
    /// BadArgumentsMissing.
    pub const BAD_ARGUMENTS_MISSING: u32 = 0x8076_0000;
    /// BadConfigurationError.
    pub const BAD_CONFIGURATION_ERROR: u32 = 0x8089_0000;
    /// BadInvalidArgument.
    pub const BAD_INVALID_ARGUMENT: u32 = 0x80AB_0000;
    /// BadTooManyArguments.
    pub const BAD_TOO_MANY_ARGUMENTS: u32 = 0x80E5_0000;
    /// BadNotExecutable.
    pub const BAD_NOT_EXECUTABLE: u32 = 0x8111_0000;

    /// Returns `true` if the code is in the Good range.
    #[inline]
    pub const fn is_good(code: u32) -> bool {
        code & 0xC000_0000 == 0
    }

    /// Returns `true` if the code is in the Uncertain range.
    #[inline]
    pub const fn is_uncertain(code: u32) -> bool {
        code & 0xC000_0000 == UNCERTAIN
    }

    /// Returns `true` if the code is in the Bad range.
    #[inline]
    pub const fn is_bad(code: u32) -> bool {
        code & 0x8000_0000 != 0
    }

    /// Returns the symbolic name for a status code.
    ///
    /// The low 16 bits (info bits) are ignored.
    pub fn name(code: u32) -> &'static str {
        match code & 0xFFFF_0000 {
            GOOD => "Good",
            UNCERTAIN => "Uncertain",
            BAD => "Bad",
            BAD_UNEXPECTED_ERROR => "BadUnexpectedError",
            BAD_INTERNAL_ERROR => "BadInternalError",
            BAD_RESOURCE_UNAVAILABLE => "BadResourceUnavailable",
            BAD_COMMUNICATION_ERROR => "BadCommunicationError",
            BAD_ENCODING_ERROR => "BadEncodingError",
            BAD_DECODING_ERROR => "BadDecodingError",
            BAD_TIMEOUT => "BadTimeout",
            BAD_SERVICE_UNSUPPORTED => "BadServiceUnsupported",
            BAD_SERVER_NOT_CONNECTED => "BadServerNotConnected",
            BAD_NOTHING_TO_DO => "BadNothingToDo",
            BAD_TOO_MANY_OPERATIONS => "BadTooManyOperations",
            BAD_DATA_TYPE_ID_UNKNOWN => "BadDataTypeIdUnknown",
            BAD_USER_ACCESS_DENIED => "BadUserAccessDenied",
            BAD_SESSION_ID_INVALID => "BadSessionIdInvalid",
            BAD_SESSION_CLOSED => "BadSessionClosed",
            BAD_REQUEST_CANCELLED_BY_CLIENT => "BadRequestCancelledByClient",
            BAD_NODE_ID_INVALID => "BadNodeIdInvalid",
            BAD_NODE_ID_UNKNOWN => "BadNodeIdUnknown",
            BAD_ATTRIBUTE_ID_INVALID => "BadAttributeIdInvalid",
            BAD_NOT_READABLE => "BadNotReadable",
            BAD_NOT_WRITABLE => "BadNotWritable",
            BAD_OUT_OF_RANGE => "BadOutOfRange",
            BAD_NOT_SUPPORTED => "BadNotSupported",
            BAD_NOT_FOUND => "BadNotFound",
            BAD_CONTINUATION_POINT_INVALID => "BadContinuationPointInvalid",
            BAD_NO_CONTINUATION_POINTS => "BadNoContinuationPoints",
            BAD_REFERENCE_TYPE_ID_INVALID => "BadReferenceTypeIdInvalid",
            BAD_BROWSE_DIRECTION_INVALID => "BadBrowseDirectionInvalid",
            BAD_BROWSE_NAME_DUPLICATED => "BadBrowseNameDuplicated",
            BAD_NO_MATCH => "BadNoMatch",
            BAD_WRITE_NOT_SUPPORTED => "BadWriteNotSupported",
            BAD_TYPE_MISMATCH => "BadTypeMismatch",
            BAD_METHOD_INVALID => "BadMethodInvalid",
            BAD_ARGUMENTS_MISSING => "BadArgumentsMissing",
            BAD_CONFIGURATION_ERROR => "BadConfigurationError",
            BAD_INVALID_ARGUMENT => "BadInvalidArgument",
            BAD_TOO_MANY_ARGUMENTS => "BadTooManyArguments",
            BAD_NOT_EXECUTABLE => "BadNotExecutable",
            c if is_uncertain(c) => "Uncertain",
            c if is_bad(c) => "Bad",
            _ => "Good",
        }
    }
}

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Informational - no action required.
    Info,
    /// Warning - action may be required.
    Warning,
    /// Error - action required, but recoverable.
    Error,
    /// Critical - immediate action required.
    Critical,
}

impl ErrorSeverity {
    /// Converts to tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Structured error code for categorization.
///
/// Format: `UA-XXYY` where XX is category and YY is specific error.
///
/// Categories:
/// - 1: Address
/// - 2: Browse
/// - 3: Conversion
/// - 4: Service
/// - 5: Transport
/// - 6: Configuration
/// - 7: Cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category (1-7).
    pub category: u8,
    /// Specific error within category.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }

    /// Returns the full error code as a u16.
    pub fn as_u16(&self) -> u16 {
        ((self.category as u16) << 8) | (self.code as u16)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UA-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// A Result type with OpcUaError.
pub type OpcUaResult<T> = Result<T, OpcUaError>;

// =============================================================================
// Tests
// =============================================================================
