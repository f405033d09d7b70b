// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `address` command.

use serde_json::{json, Value};
use tracing::debug;
use twin_opcua::{AddressFormat, NamespaceTable, NodeAddress};

use crate::cli::{AddressArgs, Cli, OutputFormat};
use crate::error::BinResult;

/// Executes the `address` command.
pub fn address(_cli: &Cli, args: AddressArgs) -> BinResult<()> {
    let report = describe(&args.address, &args.namespaces, args.format)?;

    match args.output {
        OutputFormat::Text => {
            println!("{}", report["rendered"].as_str().unwrap_or_default());
            println!();
            println!("  Expanded:  {}", report["expanded"].as_str().unwrap_or_default());
            println!("  Numeric:   {}", report["numeric"].as_str().unwrap_or_default());
            println!("  Namespace: {}", report["namespace"].as_str().unwrap_or_default());
            println!("  Standard:  {}", report["standard"]);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

/// Parses `text` against a session table built from `namespaces` and
/// describes the result.
pub(crate) fn describe(text: &str, namespaces: &[String], format: AddressFormat) -> BinResult<Value> {
    let table = NamespaceTable::from_uris(namespaces);
    let address = NodeAddress::parse(text, &table)?;
    debug!(input = text, address = %address, "Parsed address");

    let node_id = address.to_node_id(&table).ok().map(|id| id.to_string());

    Ok(json!({
        "input": text,
        "rendered": address.render(&table, format),
        "expanded": address.render(&table, AddressFormat::Expanded),
        "numeric": address.render(&table, AddressFormat::Numeric),
        "namespace": address.namespace.to_string(),
        "standard": address.is_standard(),
        "node_id": node_id,
    }))
}
