// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Address-space-agnostic OPC UA node access façade.
//!
//! This crate sits between callers that speak textual node addresses and
//! dynamic JSON-like values, and an OPC UA client stack that speaks node
//! ids and typed variants. It knows nothing about any particular address
//! space: every operation is a composition of the raw Browse, BrowseNext,
//! Read, Write and Call services of an [`OpcUaTransport`].
//!
//! # Layers
//!
//! ```text
//! NodeServices            browse / values / attributes / methods
//! ├── BrowseWalker        paging, class filter, children look-ahead
//! ├── VariantCodec        DynamicValue <-> Variant for a declared type
//! ├── resolve_browse_path textual paths -> node ids
//! ├── parse / render      textual addresses <-> node ids
//! └── OpcUaTransport      raw services (implemented by the client stack)
//! ```
//!
//! # Error Handling
//!
//! ```text
//! OpcUaError
//! ├── Address       - InvalidAddress, NoMatch, Ambiguous
//! ├── Browse        - InvalidContinuation
//! ├── Conversion    - TypeMismatch, OutOfRange
//! ├── Service       - ServerFault
//! ├── Transport     - Systemic client stack failures
//! ├── Configuration - Invalid settings
//! ├── Cancelled     - Caller cancelled the operation
//! └── Timeout       - Operation exceeded its deadline
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use twin_opcua::{BrowseRequest, FacadeConfig, NodeServices, SessionContext};
//!
//! async fn list_root(transport: Arc<impl twin_opcua::OpcUaTransport>) -> twin_opcua::OpcUaResult<()> {
//!     let services = NodeServices::new(transport, FacadeConfig::default());
//!     let ctx = SessionContext::new("session-1");
//!
//!     let response = services.browse_first(&ctx, BrowseRequest::default()).await?;
//!     for reference in &response.references {
//!         println!("{}", reference.target.node_id);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod address;
pub mod argument;
pub mod browse;
pub mod codec;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod path;
pub mod services;
pub mod transport;
pub mod types;
pub mod value;
pub mod variant;

// Re-export commonly used types
pub use error::{
    AddressError, BrowseError, ConfigurationError, ConversionError, ErrorCode, ErrorSeverity,
    OpcUaError, OpcUaResult, ServiceError, TransportError,
};

pub use types::{
    AttributeId, BrowseDirection, LocalizedText, NodeClass, NodeId, NodeIdentifier,
    QualifiedName, TimestampsToReturn,
};

pub use address::{parse_node_id, render_node_id, AddressFormat, NamespaceRef, NamespaceTable, NodeAddress};
pub use path::{resolve_browse_path, BrowsePath, PathElement, ReferenceLookup, TargetName};
pub use value::DynamicValue;
pub use variant::{AbstractType, BuiltInType, DeclaredType, ExtensionObject, Scalar, TypeKind, Variant};
pub use codec::{CodecOptions, VariantCodec};
pub use argument::{ArgumentDescriptor, MethodArgument};

// Re-export transport types
pub use transport::{
    BrowseDescription, BrowsePage, CallOutcome, CancelToken, DataValue, MethodCall,
    OpcUaTransport, RawReference, ReadValueId, SessionContext, WriteValue,
};

// Re-export browse types
pub use browse::{
    BrowseOutcome, BrowseWalker, ContinuationToken, NodeDetail, NodeSnapshot, ReferenceRecord,
    WalkOptions,
};

pub use diagnostics::{DiagnosticsCollector, DiagnosticsLevel, RequestHeader, ServiceResult};
pub use config::{ConfigFormat, ConfigLoader, FacadeConfig};

// Re-export service models
pub use services::{
    AttributeReadItem, AttributeReadResult, AttributeWriteItem, AttributeWriteResult,
    BrowseNextRequest, BrowseNextResponse, BrowsePathRequest, BrowsePathResponse, BrowseRequest,
    BrowseResponse, MethodCallArgument, MethodCallRequest, MethodCallResponse,
    MethodMetadataRequest, MethodMetadataResponse, NodeServices, PathTarget, ReadRequest,
    ReadResponse, ValueReadRequest, ValueReadResponse, ValueWriteRequest, ValueWriteResponse,
    WriteRequest, WriteResponse,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
