// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `address`: Parse and render a node address
//! - `path`: Parse and render browse path elements
//! - `encode` / `decode`: Run a value through the variant codec
//! - `validate`: Validate configuration file
//! - `version`: Show version information

mod address;
mod codec;
mod path;
mod validate;
mod version;

pub use address::address;
pub use codec::{decode, encode};
pub use path::path;
pub use validate::validate;
pub use version::version;

use crate::cli::{Cli, Commands};
use crate::error::BinResult;

/// Executes the appropriate command based on CLI arguments.
pub fn execute(cli: Cli) -> BinResult<()> {
    match cli.command.clone() {
        Commands::Address(args) => address::address(&cli, args),
        Commands::Path(args) => path::path(&cli, args),
        Commands::Encode(args) => codec::encode(&cli, args),
        Commands::Decode(args) => codec::decode(&cli, args),
        Commands::Validate(args) => validate::validate(&cli, args),
        Commands::Version => version::version(&cli),
    }
}
