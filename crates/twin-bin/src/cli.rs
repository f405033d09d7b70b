// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! The `opcua-twin` binary exposes the session-independent parts of the
//! façade for offline use:
//!
//! - `address`: Parse a node address and render it back
//! - `path`: Parse browse path elements and render them back
//! - `encode`: Encode a JSON value for a declared data type
//! - `decode`: Encode, then decode the wire variant back to JSON
//! - `validate`: Validate the façade configuration file
//! - `version`: Show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use twin_opcua::AddressFormat;

// =============================================================================
// Main CLI Structure
// =============================================================================

/// opcua-twin - OPC UA node access façade tooling
///
/// Translates textual node addresses and browse paths, and converts dynamic
/// JSON values to and from OPC UA variants, without a server connection.
#[derive(Parser, Debug)]
#[command(
    name = "opcua-twin",
    author = "Sylvex <contact@sylvex.io>",
    version = crate::VERSION,
    about = "OPC UA node access façade tooling",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "opcua-twin.yaml",
        env = "TWIN_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short,
        long,
        default_value = "warn",
        env = "TWIN_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json, compact)
    #[arg(long, default_value = "text", env = "TWIN_LOG_FORMAT", global = true)]
    pub log_format: LogFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the opcua-twin CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Parse a node address and render it back
    ///
    /// Accepts `<uri>#<kind>=<value>`, `ns=<index>;<kind>=<value>`,
    /// `<kind>=<value>` and standard data type names.
    Address(AddressArgs),

    /// Parse browse path elements and render them back
    ///
    /// Elements use the relative path syntax: `/Name` follows hierarchical
    /// references, `.Name` aggregates, `<!#Ref>Name` an explicit reference
    /// type (`!` inverse, `#` without subtypes), and a bare name any reference.
    Path(PathArgs),

    /// Encode a JSON value for a declared data type
    Encode(CodecArgs),

    /// Encode a JSON value, then decode the wire variant back
    Decode(CodecArgs),

    /// Validate the configuration file
    ///
    /// Loads the configuration with environment overrides applied and
    /// checks every setting.
    Validate(ValidateArgs),

    /// Show version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `address` command.
#[derive(Args, Debug, Clone)]
pub struct AddressArgs {
    /// Address text
    pub address: String,

    /// Namespace URIs of the session, in index order starting at 1
    #[arg(short, long = "namespace")]
    pub namespaces: Vec<String>,

    /// Rendering of the parsed address
    #[arg(short, long, default_value = "expanded", value_parser = parse_address_format)]
    pub format: AddressFormat,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the `path` command.
#[derive(Args, Debug, Clone)]
pub struct PathArgs {
    /// Path elements
    #[arg(required = true)]
    pub elements: Vec<String>,

    /// Namespace URIs of the session, in index order starting at 1
    #[arg(short, long = "namespace")]
    pub namespaces: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the `encode` and `decode` commands.
#[derive(Args, Debug, Clone)]
pub struct CodecArgs {
    /// Declared data type name (e.g. Double, Number, Enumeration)
    #[arg(short = 't', long = "type")]
    pub data_type: String,

    /// Declared value rank (-2 any, -1 scalar, 1 one dimension)
    #[arg(short, long, default_value = "-2", allow_negative_numbers = true)]
    pub rank: i32,

    /// Reject textual coercion of strings
    #[arg(long)]
    pub strict: bool,

    /// JSON value
    pub value: String,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Clone, Default)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

fn parse_address_format(value: &str) -> Result<AddressFormat, String> {
    value.parse().map_err(|e: twin_opcua::OpcUaError| e.to_string())
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_command() {
        let cli = Cli::parse_from([
            "opcua-twin",
            "address",
            "ns=1;s=Boiler",
            "-n",
            "urn:plant",
            "--format",
            "numeric",
        ]);
        match cli.command {
            Commands::Address(args) => {
                assert_eq!(args.address, "ns=1;s=Boiler");
                assert_eq!(args.namespaces, vec!["urn:plant".to_string()]);
                assert_eq!(args.format, AddressFormat::Numeric);
            }
            other => panic!("Expected Address command, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_address_format_rejected() {
        let result = Cli::try_parse_from(["opcua-twin", "address", "i=85", "--format", "binary"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_path_requires_elements() {
        assert!(Cli::try_parse_from(["opcua-twin", "path"]).is_err());

        let cli = Cli::parse_from(["opcua-twin", "path", "/Objects", "<HasComponent>Boiler"]);
        match cli.command {
            Commands::Path(args) => assert_eq!(args.elements.len(), 2),
            other => panic!("Expected Path command, got {:?}", other),
        }
    }

    #[test]
    fn test_codec_command_accepts_negative_rank() {
        let cli = Cli::parse_from(["opcua-twin", "encode", "--type", "Double", "--rank", "-1", "21.5"]);
        match cli.command {
            Commands::Encode(args) => {
                assert_eq!(args.data_type, "Double");
                assert_eq!(args.rank, -1);
                assert_eq!(args.value, "21.5");
                assert!(!args.strict);
            }
            other => panic!("Expected Encode command, got {:?}", other),
        }
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["opcua-twin", "-c", "/etc/twin/facade.toml", "version"]);
        assert_eq!(cli.config, PathBuf::from("/etc/twin/facade.toml"));
    }

    #[test]
    fn test_log_options() {
        let cli = Cli::parse_from(["opcua-twin", "-l", "debug", "--log-format", "json", "version"]);
        assert_eq!(cli.log_level, "debug");
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["opcua-twin", "validate", "--show-config"]);
        match cli.command {
            Commands::Validate(args) => assert!(args.show_config),
            other => panic!("Expected Validate command, got {:?}", other),
        }
    }
}
