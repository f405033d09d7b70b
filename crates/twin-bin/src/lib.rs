// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # twin-bin
//!
//! CLI binary for the OPC UA node access façade.
//!
//! The binary works without a server session: it exercises the address
//! translator, the browse path parser and the variant codec, and checks
//! façade configuration files before deployment.
//!
//! ## Architecture
//!
//! ```text
//!            main.rs
//!               │
//!        ┌──────▼──────┐
//!        │   cli.rs    │
//!        └──────┬──────┘
//!               │
//!       ┌───────┼────────┐
//!       ▼       ▼        ▼
//!   commands  logging  error
//!       │
//!       ▼
//!   twin-opcua
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Render an address in both forms
//! opcua-twin address "ns=1;s=Boiler" -n urn:plant
//!
//! # Parse a browse path
//! opcua-twin path /Objects "<HasComponent>Boiler"
//!
//! # Encode for an abstract type, then decode
//! opcua-twin decode --type Number 42
//!
//! # Validate configuration
//! opcua-twin -c facade.yaml validate
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
