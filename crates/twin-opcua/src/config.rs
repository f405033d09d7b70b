// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Façade configuration.
//!
//! # Loading Pipeline
//!
//! 1. Parse the YAML, TOML or JSON file
//! 2. Apply `TWIN_*` environment overrides
//! 3. Validate
//!
//! ```yaml
//! diagnostics_level: status
//! max_references: 100
//! look_ahead: true
//! operation_timeout: 30s
//! address_format: expanded
//! max_type_depth: 16
//! codec:
//!   lenient_strings: true
//! ```
//!
//! ```text
//! TWIN_DIAGNOSTICS_LEVEL=verbose
//! TWIN_MAX_REFERENCES=50
//! TWIN_OPERATION_TIMEOUT=5s
//! ```

use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::address::AddressFormat;
use crate::codec::CodecOptions;
use crate::diagnostics::DiagnosticsLevel;
use crate::error::{ConfigurationError, OpcUaResult};

/// Default environment variable prefix.
pub const ENV_PREFIX: &str = "TWIN";

/// Longest supertype chain followed when resolving a declared type.
const MAX_TYPE_DEPTH_LIMIT: u32 = 64;

// =============================================================================
// FacadeConfig
// =============================================================================

/// Settings shared by every façade call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacadeConfig {
    /// Diagnostics level for requests without a header.
    pub diagnostics_level: DiagnosticsLevel,

    /// Default page size for browse requests (0 = server default).
    pub max_references: u32,

    /// Run the children look-ahead for browsed targets.
    pub look_ahead: bool,

    /// Deadline of each collaborator call when the caller sets none
    /// (0 disables).
    #[serde(with = "crate::types::humantime_serde")]
    pub operation_timeout: Duration,

    /// Rendering of addresses in responses.
    pub address_format: AddressFormat,

    /// Supertype hops followed to find a built-in or abstract data type.
    pub max_type_depth: u32,

    /// Codec options.
    pub codec: CodecOptions,
}

impl Default for FacadeConfig {
    fn default() -> Self {
        Self {
            diagnostics_level: DiagnosticsLevel::None,
            max_references: 0,
            look_ahead: true,
            operation_timeout: Duration::from_secs(30),
            address_format: AddressFormat::Expanded,
            max_type_depth: 16,
            codec: CodecOptions::default(),
        }
    }
}

impl FacadeConfig {
    /// Returns the operation timeout, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (!self.operation_timeout.is_zero()).then_some(self.operation_timeout)
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidValue`] for the first invalid field.
    pub fn validate(&self) -> OpcUaResult<()> {
        if self.max_type_depth == 0 || self.max_type_depth > MAX_TYPE_DEPTH_LIMIT {
            return Err(ConfigurationError::invalid_value(
                "max_type_depth",
                format!("must be between 1 and {}", MAX_TYPE_DEPTH_LIMIT),
            )
            .into());
        }
        if self.operation_timeout > Duration::from_secs(3600) {
            return Err(ConfigurationError::invalid_value(
                "operation_timeout",
                "must not exceed 1h",
            )
            .into());
        }
        Ok(())
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file extension.
    pub fn from_path(path: &Path) -> OpcUaResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            _ => Err(ConfigurationError::load_failed(
                path.display().to_string(),
                "unsupported file extension (expected .yaml, .yml, .toml or .json)",
            )
            .into()),
        }
    }
}

// =============================================================================
// ConfigLoader
// =============================================================================

/// Loads [`FacadeConfig`] from files and the environment.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_prefix: String,
    apply_env: bool,
}

impl ConfigLoader {
    /// Creates a loader using the `TWIN` prefix.
    pub fn new() -> Self {
        Self {
            env_prefix: ENV_PREFIX.to_string(),
            apply_env: true,
        }
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables environment overrides.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.apply_env = enabled;
        self
    }

    /// Loads and validates a configuration file.
    pub fn load(&self, path: impl AsRef<Path>) -> OpcUaResult<FacadeConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let format = ConfigFormat::from_path(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigurationError::load_failed(path.display().to_string(), e.to_string())
        })?;

        self.load_from_str(&content, format).map_err(|e| match e {
            crate::error::OpcUaError::Configuration(ConfigurationError::LoadFailed { message, .. }) => {
                ConfigurationError::load_failed(path.display().to_string(), message).into()
            }
            other => other,
        })
    }

    /// Parses, overrides and validates configuration text.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> OpcUaResult<FacadeConfig> {
        let mut config = parse_str(content, format)?;
        if self.apply_env {
            self.apply_env_overrides(&mut config)?;
        }
        config.validate()?;

        debug!(
            diagnostics_level = %config.diagnostics_level,
            max_references = config.max_references,
            look_ahead = config.look_ahead,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Returns the defaults with environment overrides applied.
    pub fn load_defaults(&self) -> OpcUaResult<FacadeConfig> {
        let mut config = FacadeConfig::default();
        if self.apply_env {
            self.apply_env_overrides(&mut config)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn var(&self, name: &str) -> Option<(String, String)> {
        let key = format!("{}_{}", self.env_prefix, name);
        env::var(&key).ok().map(|value| (key, value))
    }

    fn apply_env_overrides(&self, config: &mut FacadeConfig) -> OpcUaResult<()> {
        if let Some((_, value)) = self.var("DIAGNOSTICS_LEVEL") {
            config.diagnostics_level = value.parse()?;
        }
        if let Some((key, value)) = self.var("MAX_REFERENCES") {
            config.max_references = value
                .parse()
                .map_err(|_| ConfigurationError::invalid_value(key, "expected a non-negative number"))?;
        }
        if let Some((_, value)) = self.var("LOOK_AHEAD") {
            config.look_ahead = parse_bool(&value);
        }
        if let Some((key, value)) = self.var("OPERATION_TIMEOUT") {
            config.operation_timeout = humantime::parse_duration(&value)
                .map_err(|e| ConfigurationError::invalid_value(key, e.to_string()))?;
        }
        if let Some((_, value)) = self.var("ADDRESS_FORMAT") {
            config.address_format = value.parse()?;
        }
        if let Some((key, value)) = self.var("MAX_TYPE_DEPTH") {
            config.max_type_depth = value
                .parse()
                .map_err(|_| ConfigurationError::invalid_value(key, "expected a number"))?;
        }
        if let Some((_, value)) = self.var("LENIENT_STRINGS") {
            config.codec.lenient_strings = parse_bool(&value);
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_str(content: &str, format: ConfigFormat) -> OpcUaResult<FacadeConfig> {
    let parsed = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| ConfigurationError::load_failed("<inline>", message).into())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "true" | "1" | "yes" | "on" | "enabled"
    )
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const YAML: &str = r#"
diagnostics_level: operations
max_references: 25
look_ahead: false
operation_timeout: 5s
address_format: numeric
codec:
  lenient_strings: false
"#;

    #[test]
    fn test_defaults_are_valid() {
        let config = FacadeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert!(config.look_ahead);
    }

    #[test]
    fn test_load_yaml() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let config = ConfigLoader::new().with_env_vars(false).load(file.path()).unwrap();
        assert_eq!(config.diagnostics_level, DiagnosticsLevel::Operations);
        assert_eq!(config.max_references, 25);
        assert!(!config.look_ahead);
        assert_eq!(config.operation_timeout, Duration::from_secs(5));
        assert_eq!(config.address_format, AddressFormat::Numeric);
        assert!(!config.codec.lenient_strings);
        assert_eq!(config.max_type_depth, 16);
    }

    #[test]
    fn test_load_toml() {
        let toml = "max_references = 10\noperation_timeout = \"0s\"\n\n[codec]\nlenient_strings = true\n";
        let config = ConfigLoader::new()
            .with_env_vars(false)
            .load_from_str(toml, ConfigFormat::Toml)
            .unwrap();
        assert_eq!(config.max_references, 10);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_validation_rejects_depth() {
        let err = ConfigLoader::new()
            .with_env_vars(false)
            .load_from_str("max_type_depth: 0", ConfigFormat::Yaml)
            .unwrap_err();
        assert!(err.to_string().contains("max_type_depth"));
    }

    #[test]
    fn test_env_overrides() {
        let loader = ConfigLoader::new().with_env_prefix("TWIN_TEST_CONFIG");
        env::set_var("TWIN_TEST_CONFIG_MAX_REFERENCES", "7");
        env::set_var("TWIN_TEST_CONFIG_DIAGNOSTICS_LEVEL", "verbose");
        let config = loader.load_defaults().unwrap();
        env::remove_var("TWIN_TEST_CONFIG_MAX_REFERENCES");
        env::remove_var("TWIN_TEST_CONFIG_DIAGNOSTICS_LEVEL");

        assert_eq!(config.max_references, 7);
        assert_eq!(config.diagnostics_level, DiagnosticsLevel::Verbose);
    }

    #[test]
    fn test_config_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")).unwrap(), ConfigFormat::Toml);
        assert!(ConfigFormat::from_path(Path::new("a.ini")).is_err());
    }

    #[test]
    fn test_file_not_found() {
        let err = ConfigLoader::new().load("/nonexistent/twin.yaml").unwrap_err();
        assert!(matches!(
            err,
            crate::error::OpcUaError::Configuration(ConfigurationError::LoadFailed { .. })
        ));
    }
}
