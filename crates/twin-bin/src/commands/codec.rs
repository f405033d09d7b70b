// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `encode` and `decode` commands.
//!
//! Both run the value through [`VariantCodec::encode`] against a session
//! table holding only the standard namespace. `decode` then feeds the wire
//! variant back through [`VariantCodec::decode`], which shows how a value
//! read from a node of that type would come back to the caller.

use serde_json::{json, Value};
use tracing::debug;
use twin_opcua::variant::TypedVariant;
use twin_opcua::{CodecOptions, DeclaredType, DynamicValue, NamespaceTable, Variant, VariantCodec};

use crate::cli::{Cli, CodecArgs};
use crate::error::{BinError, BinResult};

/// Executes the `encode` command.
pub fn encode(_cli: &Cli, args: CodecArgs) -> BinResult<()> {
    let (typed, _) = run(&args)?;
    println!("{}", serde_json::to_string_pretty(&describe_variant(&typed))?);
    Ok(())
}

/// Executes the `decode` command.
pub fn decode(_cli: &Cli, args: CodecArgs) -> BinResult<()> {
    let (typed, table) = run(&args)?;
    let value = codec(&args)
        .decode(&typed.variant, Some(&typed.type_name), &table)
        .map_err(|e| BinError::from(e).with_context("decode"))?;
    println!("{}", serde_json::to_string_pretty(&value.to_json())?);
    Ok(())
}

fn codec(args: &CodecArgs) -> VariantCodec {
    VariantCodec::new(CodecOptions {
        lenient_strings: !args.strict,
    })
}

fn run(args: &CodecArgs) -> BinResult<(TypedVariant, NamespaceTable)> {
    let table = NamespaceTable::new();
    let declared = DeclaredType::from_name(&args.data_type, args.rank)?;
    let value = parse_value(&args.value);
    debug!(declared = %declared.name, rank = declared.value_rank, input = value.kind_name(), "Encoding CLI value");

    let typed = codec(args)
        .encode(&value, &declared, &table)
        .map_err(|e| BinError::from(e).with_context("encode"))?;
    Ok((typed, table))
}

/// Parses JSON input, treating anything that is not JSON as a string.
pub(crate) fn parse_value(text: &str) -> DynamicValue {
    match serde_json::from_str::<Value>(text) {
        Ok(json) => DynamicValue::from_json(&json),
        Err(_) => DynamicValue::String(text.to_string()),
    }
}

/// Describes an encoded variant for display.
pub(crate) fn describe_variant(typed: &TypedVariant) -> Value {
    let (shape, length) = match &typed.variant {
        Variant::Empty => ("empty", None),
        Variant::Scalar(_) => ("scalar", None),
        Variant::Array { items, .. } => ("array", Some(items.len())),
    };
    json!({
        "type_name": typed.type_name,
        "built_in_type": typed.variant.built_in_type().map(|t| t.to_string()),
        "shape": shape,
        "length": length,
        "wire": format!("{:?}", typed.variant),
    })
}
