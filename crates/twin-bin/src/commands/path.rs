// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `path` command.

use serde_json::{json, Value};
use twin_opcua::{AddressFormat, BrowsePath, NamespaceTable};

use crate::cli::{Cli, OutputFormat, PathArgs};
use crate::error::BinResult;

/// Executes the `path` command.
pub fn path(_cli: &Cli, args: PathArgs) -> BinResult<()> {
    let report = describe(&args.elements, &args.namespaces)?;

    match args.output {
        OutputFormat::Text => {
            let rendered: Vec<&str> = report["rendered"]
                .as_array()
                .map(|items| items.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            println!("{}", rendered.join(""));
            println!();
            for (index, element) in report["elements"].as_array().into_iter().flatten().enumerate() {
                println!(
                    "  [{}] {} via {}{}{}",
                    index,
                    element["target"].as_str().unwrap_or_default(),
                    element["reference_type"].as_str().unwrap_or_default(),
                    if element["inverse"] == true { " (inverse)" } else { "" },
                    if element["include_subtypes"] == true { "" } else { " (exact)" },
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

pub(crate) fn describe(elements: &[String], namespaces: &[String]) -> BinResult<Value> {
    let table = NamespaceTable::from_uris(namespaces);
    let path = BrowsePath::parse(elements, &table)?;

    let described: Vec<Value> = path
        .elements
        .iter()
        .map(|element| {
            json!({
                "reference_type": element.reference_type.render(&table, AddressFormat::Expanded),
                "inverse": element.inverse,
                "include_subtypes": element.include_subtypes,
                "target": element.target.render(&table),
            })
        })
        .collect();

    Ok(json!({
        "rendered": path.render(&table),
        "elements": described,
    }))
}
