// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Request diagnostics and the uniform error envelope.
//!
//! Every façade call accepts a [`DiagnosticsModel`] in its request header.
//! Operations performed on behalf of the call are recorded in a
//! [`DiagnosticsCollector`]; when the call fails, the collected entries are
//! attached to the [`ServiceResult`] in the shape selected by the level:
//!
//! | Level        | `diagnostics`                                        |
//! |--------------|------------------------------------------------------|
//! | `none`       | absent                                               |
//! | `status`     | `["BadNodeIdUnknown", ...]`                          |
//! | `operations` | `{"BadNodeIdUnknown": [{operation, message}, ...]}`  |
//! | `verbose`    | `[{symbolic_id, status_code, operation, ...}, ...]`  |

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{status_codes, ConfigurationError, OpcUaError, ServiceError};

// =============================================================================
// DiagnosticsLevel
// =============================================================================

/// How much diagnostic detail accompanies an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticsLevel {
    /// Status code only.
    #[default]
    None,
    /// Status names of every failed operation.
    Status,
    /// Failed operations grouped by status name.
    Operations,
    /// Every recorded operation with full detail.
    Verbose,
}

impl DiagnosticsLevel {
    /// Returns the level name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Status => "status",
            Self::Operations => "operations",
            Self::Verbose => "verbose",
        }
    }
}

impl fmt::Display for DiagnosticsLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagnosticsLevel {
    type Err = OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "status" => Ok(Self::Status),
            "operations" => Ok(Self::Operations),
            "verbose" => Ok(Self::Verbose),
            other => Err(ConfigurationError::invalid_value(
                "diagnostics_level",
                format!("unknown level '{}'", other),
            )
            .into()),
        }
    }
}

// =============================================================================
// Request / response headers
// =============================================================================

/// Diagnostics requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DiagnosticsModel {
    /// Caller supplied audit id, logged with the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_id: Option<String>,
    /// Caller timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Level.
    #[serde(default)]
    pub level: DiagnosticsLevel,
}

impl DiagnosticsModel {
    /// Creates a model with `level`.
    pub fn with_level(level: DiagnosticsLevel) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }
}

/// Common request header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RequestHeader {
    /// Requested diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<DiagnosticsModel>,
}

impl RequestHeader {
    /// Creates a header requesting `level`.
    pub fn with_level(level: DiagnosticsLevel) -> Self {
        Self {
            diagnostics: Some(DiagnosticsModel::with_level(level)),
        }
    }
}

// =============================================================================
// Diagnostics payload
// =============================================================================

/// A recorded operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    /// Status name.
    pub symbolic_id: String,
    /// Status code.
    pub status_code: u32,
    /// Operation, e.g. `Browse_i=85`.
    pub operation: String,
    /// Message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Additional server information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<String>,
    /// Status of the underlying failure, when it differs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_status: Option<String>,
}

/// An operation tagged with its message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationNote {
    /// Operation.
    pub operation: String,
    /// Message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Diagnostics attached to an error, shaped by level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Diagnostics {
    /// Status names.
    Status(Vec<String>),
    /// Operations grouped by status name.
    Operations(BTreeMap<String, Vec<OperationNote>>),
    /// Full entries.
    Verbose(Vec<DiagnosticEntry>),
}

// =============================================================================
// DiagnosticsCollector
// =============================================================================

/// Records the operations of one façade call.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsCollector {
    level: DiagnosticsLevel,
    entries: Vec<DiagnosticEntry>,
}

impl DiagnosticsCollector {
    /// Creates a collector for `level`.
    pub fn new(level: DiagnosticsLevel) -> Self {
        Self {
            level,
            entries: Vec::new(),
        }
    }

    /// Returns the level.
    #[inline]
    pub fn level(&self) -> DiagnosticsLevel {
        self.level
    }

    /// Returns the recorded entries.
    pub fn entries(&self) -> &[DiagnosticEntry] {
        &self.entries
    }

    /// Records an operation outcome.
    ///
    /// Good outcomes are only kept at verbose level.
    pub fn record(&mut self, operation: impl Into<String>, status_code: u32, message: Option<String>) {
        if self.level == DiagnosticsLevel::None {
            return;
        }
        if status_codes::is_good(status_code) && self.level != DiagnosticsLevel::Verbose {
            return;
        }
        self.entries.push(DiagnosticEntry {
            symbolic_id: status_codes::name(status_code).to_string(),
            status_code,
            operation: operation.into(),
            message,
            additional_info: None,
            inner_status: None,
        });
    }

    /// Records a failed operation.
    pub fn record_error(&mut self, operation: impl Into<String>, error: &OpcUaError) {
        if self.level == DiagnosticsLevel::None {
            return;
        }
        let (additional_info, inner_status) = match error {
            OpcUaError::Service(ServiceError {
                diagnostic_info,
                status_name,
                ..
            }) => (diagnostic_info.clone(), Some(status_name.to_string())),
            _ => (None, None),
        };
        let status_code = error.status_code();
        self.entries.push(DiagnosticEntry {
            symbolic_id: status_codes::name(status_code).to_string(),
            status_code,
            operation: operation.into(),
            message: Some(error.to_string()),
            additional_info,
            inner_status,
        });
    }

    /// Builds the payload for the collected entries.
    pub fn finish(&self) -> Option<Diagnostics> {
        match self.level {
            DiagnosticsLevel::None => None,
            _ if self.entries.is_empty() => None,
            DiagnosticsLevel::Status => {
                let mut names: Vec<String> = Vec::new();
                for entry in &self.entries {
                    if !names.contains(&entry.symbolic_id) {
                        names.push(entry.symbolic_id.clone());
                    }
                }
                Some(Diagnostics::Status(names))
            }
            DiagnosticsLevel::Operations => {
                let mut grouped: BTreeMap<String, Vec<OperationNote>> = BTreeMap::new();
                for entry in &self.entries {
                    grouped
                        .entry(entry.symbolic_id.clone())
                        .or_default()
                        .push(OperationNote {
                            operation: entry.operation.clone(),
                            message: entry.message.clone(),
                        });
                }
                Some(Diagnostics::Operations(grouped))
            }
            DiagnosticsLevel::Verbose => Some(Diagnostics::Verbose(self.entries.clone())),
        }
    }
}

// =============================================================================
// ServiceResult
// =============================================================================

/// Uniform error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceResult {
    /// Status code.
    pub status_code: u32,
    /// Status name.
    pub status: String,
    /// Error message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Diagnostics at the requested level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}

impl ServiceResult {
    /// Creates an envelope for a status code.
    pub fn from_status(status_code: u32) -> Self {
        Self {
            status_code,
            status: status_codes::name(status_code).to_string(),
            error_message: None,
            diagnostics: None,
        }
    }

    /// Creates an envelope for an error and the call's diagnostics.
    pub fn from_error(error: &OpcUaError, collector: &DiagnosticsCollector) -> Self {
        Self {
            error_message: Some(error.to_string()),
            diagnostics: collector.finish(),
            ..Self::from_status(error.status_code())
        }
    }

    /// Returns `true` unless the status is bad.
    pub fn is_good(&self) -> bool {
        !status_codes::is_bad(self.status_code)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AddressError;

    fn collector(level: DiagnosticsLevel) -> DiagnosticsCollector {
        let mut collector = DiagnosticsCollector::new(level);
        collector.record("Browse_i=85", status_codes::GOOD, None);
        collector.record(
            "Read_ns=1;i=7",
            status_codes::BAD_NODE_ID_UNKNOWN,
            Some("unknown node".into()),
        );
        collector.record_error("Resolve_browse_path", &AddressError::no_match("/Boiler").into());
        collector.record("Read_ns=1;i=8", status_codes::BAD_NODE_ID_UNKNOWN, None);
        collector
    }

    #[test]
    fn test_level_none_has_no_diagnostics() {
        assert!(collector(DiagnosticsLevel::None).finish().is_none());
    }

    #[test]
    fn test_level_status_lists_names() {
        match collector(DiagnosticsLevel::Status).finish() {
            Some(Diagnostics::Status(names)) => {
                assert_eq!(names, vec!["BadNodeIdUnknown".to_string(), "BadNoMatch".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_level_operations_groups_by_status() {
        match collector(DiagnosticsLevel::Operations).finish() {
            Some(Diagnostics::Operations(grouped)) => {
                assert_eq!(grouped["BadNodeIdUnknown"].len(), 2);
                assert_eq!(grouped["BadNoMatch"][0].operation, "Resolve_browse_path");
                assert!(!grouped.contains_key("Good"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_level_verbose_keeps_everything() {
        match collector(DiagnosticsLevel::Verbose).finish() {
            Some(Diagnostics::Verbose(entries)) => {
                assert_eq!(entries.len(), 4);
                assert_eq!(entries[0].symbolic_id, "Good");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_service_result_from_error() {
        let error: OpcUaError = AddressError::ambiguous("/Pump", 2).into();
        let result = ServiceResult::from_error(&error, &DiagnosticsCollector::default());
        assert_eq!(result.status_code, status_codes::BAD_BROWSE_NAME_DUPLICATED);
        assert_eq!(result.status, "BadBrowseNameDuplicated");
        assert!(!result.is_good());
        assert!(result.diagnostics.is_none());
    }

    #[test]
    fn test_service_error_inner_status() {
        let mut collector = DiagnosticsCollector::new(DiagnosticsLevel::Verbose);
        let error: OpcUaError = ServiceError::fault(status_codes::BAD_NOT_WRITABLE, "read-only")
            .with_diagnostic_info("AccessLevel=1")
            .into();
        collector.record_error("Write_ns=1;i=9", &error);
        let entry = &collector.entries()[0];
        assert_eq!(entry.symbolic_id, "BadNotWritable");
        assert_eq!(entry.additional_info.as_deref(), Some("AccessLevel=1"));
        assert_eq!(entry.inner_status.as_deref(), Some("BadNotWritable"));
    }

    #[test]
    fn test_level_parse_and_serde() {
        assert_eq!("Operations".parse::<DiagnosticsLevel>().unwrap(), DiagnosticsLevel::Operations);
        assert!("loud".parse::<DiagnosticsLevel>().is_err());

        let model: DiagnosticsModel = serde_json::from_str(r#"{"level":"verbose","audit_id":"a-1"}"#).unwrap();
        assert_eq!(model.level, DiagnosticsLevel::Verbose);
        assert_eq!(model.audit_id.as_deref(), Some("a-1"));
    }
}
