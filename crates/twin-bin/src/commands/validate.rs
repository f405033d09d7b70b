// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use twin_opcua::{ConfigLoader, DiagnosticsLevel, FacadeConfig};

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Executes the `validate` command to validate configuration.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let config_path = &cli.config;

    if !config_path.exists() {
        return Err(BinError::Configuration(format!(
            "Configuration file not found: {}",
            config_path.display()
        )));
    }

    let config = ConfigLoader::new()
        .load(config_path)
        .map_err(|e| BinError::from(e).with_context("Configuration validation failed"))?;

    let warnings = collect_warnings(&config);

    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", config_path.display());
            println!();
            println!("Summary:");
            println!("  Diagnostics:       {}", config.diagnostics_level);
            println!("  Max references:    {}", config.max_references);
            println!("  Look-ahead:        {}", if config.look_ahead { "enabled" } else { "disabled" });
            println!("  Operation timeout: {:?}", config.operation_timeout);
            println!("  Address format:    {:?}", config.address_format);
            println!("  Lenient strings:   {}", config.codec.lenient_strings);

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "warnings": warnings,
                "config": if args.show_config { Some(&config) } else { None },
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Returns settings that are valid but likely unintended.
pub(crate) fn collect_warnings(config: &FacadeConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.timeout().is_none() {
        warnings.push("operation_timeout is 0: collaborator calls never time out".to_string());
    }
    if config.diagnostics_level == DiagnosticsLevel::Verbose {
        warnings.push("Verbose diagnostics are returned for every request without a header".to_string());
    }
    if config.look_ahead && config.max_references == 0 {
        warnings.push(
            "Look-ahead with unlimited pages issues one extra browse per target".to_string(),
        );
    }

    warnings
}
