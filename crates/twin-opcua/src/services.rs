// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Node access façade.
//!
//! [`NodeServices`] turns textual requests into raw service calls on an
//! [`OpcUaTransport`] and shapes the results into serde response models.
//!
//! # Operations
//!
//! | Operation          | Raw services                                     |
//! |--------------------|--------------------------------------------------|
//! | `browse_first`     | Read (start node), Browse, Read/Browse per target |
//! | `browse_next`      | BrowseNext, Read/Browse per target               |
//! | `browse_path`      | Browse per step, Read per target                 |
//! | `read_attributes`  | Read                                             |
//! | `write_attributes` | Read (declared types), Write                     |
//! | `read_value`       | Browse (path), Read                              |
//! | `write_value`      | Browse (path), Read (declared type), Write       |
//! | `call_method`      | Browse (path, arguments), Read, Call             |
//! | `method_metadata`  | Browse (path, arguments), Read                   |
//!
//! # Failures
//!
//! Only systemic transport failures are returned as `Err`. Every other
//! failure becomes the response's `error_info`, carrying the diagnostics the
//! caller asked for.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::address::{parse_node_id, render_node_id, NamespaceTable};
use crate::argument::{ArgumentDescriptor, MethodArgument};
use crate::browse::{
    attr_i32, attr_node_id, attr_text, is_interruption, BrowseWalker, ContinuationToken, NodeSnapshot,
    ReferenceRecord, WalkOptions,
};
use crate::codec::VariantCodec;
use crate::config::FacadeConfig;
use crate::diagnostics::{DiagnosticsCollector, RequestHeader, ServiceResult};
use crate::error::{
    status_codes, AddressError, ConversionError, OpcUaError, OpcUaResult, ServiceError,
};
use crate::path::{collect_path_targets, resolve_browse_path, BrowsePath, ChildReference, LookupRequest, ReferenceLookup};
use crate::transport::{
    BrowseDescription, DataValue, MethodCall, OpcUaTransport, RawReference, ReadValueId,
    SessionContext, WriteValue,
};
use crate::types::{
    value_rank, well_known, AttributeId, BrowseDirection, NodeClass, NodeId, TimestampsToReturn,
};
use crate::value::DynamicValue;
use crate::variant::{BuiltInType, DeclaredType, TypeKind, Variant};

// =============================================================================
// Request / response models
// =============================================================================

/// Browse descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseRequest {
    /// Request header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Node to browse; RootFolder when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Reference type; HierarchicalReferences when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_type_id: Option<String>,
    /// Direction; forward when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<BrowseDirection>,
    /// Do not follow subtypes of the reference type.
    pub no_subtypes: bool,
    /// Page size; configured default when absent, 0 = server default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_references: Option<u32>,
    /// Keep only these node classes; empty keeps all.
    pub node_class_filter: Vec<NodeClass>,
    /// Return targets only, deduplicated.
    pub target_nodes_only: bool,
    /// Skip the attribute fetch of targets.
    pub node_ids_only: bool,
    /// Read variable values along.
    pub read_variable_values: bool,
}

/// Result of [`NodeServices::browse_first`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowseResponse {
    /// The browsed node.
    pub node: NodeSnapshot,
    /// References in server order.
    pub references: Vec<ReferenceRecord>,
    /// Present when the server holds more references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<ContinuationToken>,
    /// Failure envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

impl Default for BrowseResponse {
    fn default() -> Self {
        Self {
            node: NodeSnapshot::bare(""),
            references: Vec::new(),
            continuation_token: None,
            error_info: None,
        }
    }
}

/// Continuation of a browse.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseNextRequest {
    /// Request header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Token from the previous page.
    pub continuation_token: String,
    /// Release the cursor instead of continuing.
    pub abort: bool,
    /// Keep only these node classes.
    pub node_class_filter: Vec<NodeClass>,
    /// Return targets only.
    pub target_nodes_only: bool,
    /// Skip the attribute fetch of targets.
    pub node_ids_only: bool,
    /// Read variable values along.
    pub read_variable_values: bool,
}

/// Result of [`NodeServices::browse_next`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BrowseNextResponse {
    /// References in server order.
    pub references: Vec<ReferenceRecord>,
    /// Present when the server holds more references.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<ContinuationToken>,
    /// Failure envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

/// Translation of browse paths into nodes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowsePathRequest {
    /// Request header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Start node; RootFolder when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Paths to translate.
    pub browse_paths: Vec<Vec<String>>,
    /// Skip the attribute fetch of targets.
    pub node_ids_only: bool,
    /// Read variable values along.
    pub read_variable_values: bool,
}

/// One node reached by a browse path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathTarget {
    /// The path as requested.
    pub browse_path: Vec<String>,
    /// The node reached.
    pub target: NodeSnapshot,
}

/// Result of [`NodeServices::browse_path`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BrowsePathResponse {
    /// Every node reached, grouped by path in request order.
    pub targets: Vec<PathTarget>,
    /// Failure envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

/// One attribute to read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeReadItem {
    /// Node address.
    pub node_id: String,
    /// Attribute.
    pub attribute: AttributeId,
}

/// Batch attribute read.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadRequest {
    /// Request header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Items, each answered independently.
    pub attributes: Vec<AttributeReadItem>,
}

/// Outcome of one attribute read.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributeReadResult {
    /// Value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<DynamicValue>,
    /// Failure of this item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

/// Result of [`NodeServices::read_attributes`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReadResponse {
    /// One result per requested item, in order.
    pub results: Vec<AttributeReadResult>,
    /// Failure envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

/// One attribute to write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeWriteItem {
    /// Node address.
    pub node_id: String,
    /// Attribute.
    pub attribute: AttributeId,
    /// New value.
    pub value: DynamicValue,
}

/// Batch attribute write.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteRequest {
    /// Request header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Items, each answered independently.
    pub attributes: Vec<AttributeWriteItem>,
}

/// Outcome of one attribute write.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttributeWriteResult {
    /// Failure of this item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

/// Result of [`NodeServices::write_attributes`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WriteResponse {
    /// One result per requested item, in order.
    pub results: Vec<AttributeWriteResult>,
    /// Failure envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

/// Value read by id, by id and relative path, or by path from the root.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueReadRequest {
    /// Request header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Node address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Path relative to `node_id`, or to the root without it.
    pub browse_path: Vec<String>,
    /// Index range of an array value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_range: Option<String>,
}

/// Result of [`NodeServices::read_value`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueReadResponse {
    /// Value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<DynamicValue>,
    /// Declared data type name, or the wire tag when undeclared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Source timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_timestamp: Option<DateTime<Utc>>,
    /// Server timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_timestamp: Option<DateTime<Utc>>,
    /// Failure envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

/// Value write.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ValueWriteRequest {
    /// Request header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Node address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// Path relative to `node_id`, or to the root without it.
    pub browse_path: Vec<String>,
    /// Value to write.
    pub value: DynamicValue,
    /// Declared type; the node's DataType when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    /// Index range of an array value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_range: Option<String>,
}

/// Result of [`NodeServices::write_value`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValueWriteResponse {
    /// Failure envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

/// A method input or output.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodCallArgument {
    /// Value; the declared default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<DynamicValue>,
    /// Type name; overrides the declared type of an input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

/// Method invocation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodCallRequest {
    /// Request header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Method address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_id: Option<String>,
    /// Path to the method, relative to the object.
    pub method_browse_path: Vec<String>,
    /// Object address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// Path to the object, relative to the root.
    pub object_browse_path: Vec<String>,
    /// Inputs in declared order; trailing inputs may be left out.
    pub arguments: Vec<MethodCallArgument>,
}

/// Result of [`NodeServices::call_method`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MethodCallResponse {
    /// Outputs in declared order.
    pub results: Vec<MethodCallArgument>,
    /// Failure envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

/// Method metadata lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodMetadataRequest {
    /// Request header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<RequestHeader>,
    /// Method address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_id: Option<String>,
    /// Path to the method, relative to `method_id` or the root.
    pub method_browse_path: Vec<String>,
}

/// Result of [`NodeServices::method_metadata`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MethodMetadataResponse {
    /// Object owning the method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// Declared inputs.
    pub input_arguments: Vec<MethodArgument>,
    /// Declared outputs.
    pub output_arguments: Vec<MethodArgument>,
    /// Failure envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_info: Option<ServiceResult>,
}

trait ServiceResponse: Default {
    fn error_info_mut(&mut self) -> &mut Option<ServiceResult>;
}

macro_rules! service_response {
    ($($ty:ty),* $(,)?) => {
        $(impl ServiceResponse for $ty {
            fn error_info_mut(&mut self) -> &mut Option<ServiceResult> {
                &mut self.error_info
            }
        })*
    };
}

service_response!(
    BrowseResponse,
    BrowseNextResponse,
    BrowsePathResponse,
    ReadResponse,
    WriteResponse,
    ValueReadResponse,
    ValueWriteResponse,
    MethodCallResponse,
    MethodMetadataResponse,
);

// =============================================================================
// NodeServices
// =============================================================================

/// Per-call state: context with deadline, namespace table and diagnostics.
struct Scope {
    ctx: SessionContext,
    table: NamespaceTable,
}

/// Arguments of a method and the object owning it.
#[derive(Debug, Default)]
struct ArgumentSet {
    object_id: Option<NodeId>,
    inputs: Vec<ArgumentDescriptor>,
    outputs: Vec<ArgumentDescriptor>,
}

/// The node access façade.
///
/// Holds no mutable state; one instance serves concurrent calls.
pub struct NodeServices<T: OpcUaTransport + ?Sized> {
    transport: Arc<T>,
    config: FacadeConfig,
    codec: VariantCodec,
}

impl<T: OpcUaTransport + ?Sized> NodeServices<T> {
    /// Creates the façade over `transport`.
    pub fn new(transport: Arc<T>, config: FacadeConfig) -> Self {
        let codec = VariantCodec::new(config.codec);
        Self {
            transport,
            config,
            codec,
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &FacadeConfig {
        &self.config
    }

    /// Returns the codec.
    pub fn codec(&self) -> &VariantCodec {
        &self.codec
    }

    // =========================================================================
    // Browse
    // =========================================================================

    /// Browses a node: its snapshot, the first page of references and a
    /// continuation token when the server holds more.
    pub async fn browse_first(
        &self,
        ctx: &SessionContext,
        request: BrowseRequest,
    ) -> OpcUaResult<BrowseResponse> {
        let mut diagnostics = self.collector(request.header.as_ref());
        let result = self.browse_first_inner(ctx, &request, &mut diagnostics).await;
        self.complete(ctx, "Browse", result, diagnostics)
    }

    async fn browse_first_inner(
        &self,
        ctx: &SessionContext,
        request: &BrowseRequest,
        diagnostics: &mut DiagnosticsCollector,
    ) -> OpcUaResult<BrowseResponse> {
        let scope = self.scope(ctx).await?;
        let node_id = match request.node_id.as_deref().filter(|s| !s.is_empty()) {
            Some(text) => parse_node_id(text, &scope.table)?,
            None => well_known::ROOT_FOLDER,
        };
        let reference_type_id = match request.reference_type_id.as_deref().filter(|s| !s.is_empty()) {
            Some(text) => parse_reference_type(text, &scope.table)?,
            None => well_known::HIERARCHICAL_REFERENCES,
        };

        let description = BrowseDescription {
            node_id: node_id.clone(),
            direction: request.direction.unwrap_or_default(),
            reference_type_id,
            include_subtypes: !request.no_subtypes,
            node_class_mask: NodeClass::mask(&request.node_class_filter),
        };
        let options = WalkOptions {
            node_class_filter: request.node_class_filter.clone(),
            target_nodes_only: request.target_nodes_only,
            node_ids_only: request.node_ids_only,
            read_variable_values: request.read_variable_values,
            look_ahead: self.config.look_ahead,
        };
        let max_references = request.max_references.unwrap_or(self.config.max_references);

        let walker = self.walker(&scope);
        let mut node = if request.node_ids_only {
            NodeSnapshot::bare(self.render(&node_id, &scope.table))
        } else {
            walker
                .snapshot(&node_id, None, request.read_variable_values, diagnostics)
                .await?
        };

        let outcome = walker.start(&description, max_references, &options, diagnostics).await?;
        if !request.node_ids_only {
            node.has_children = Some(!outcome.references.is_empty());
        }

        Ok(BrowseResponse {
            node,
            references: outcome.references,
            continuation_token: outcome.continuation_token,
            error_info: None,
        })
    }

    /// Continues or aborts a browse.
    pub async fn browse_next(
        &self,
        ctx: &SessionContext,
        request: BrowseNextRequest,
    ) -> OpcUaResult<BrowseNextResponse> {
        let mut diagnostics = self.collector(request.header.as_ref());
        let result = self.browse_next_inner(ctx, &request, &mut diagnostics).await;
        self.complete(ctx, "BrowseNext", result, diagnostics)
    }

    async fn browse_next_inner(
        &self,
        ctx: &SessionContext,
        request: &BrowseNextRequest,
        diagnostics: &mut DiagnosticsCollector,
    ) -> OpcUaResult<BrowseNextResponse> {
        let token = ContinuationToken::parse(&request.continuation_token)?;
        let scope = self.scope(ctx).await?;
        let options = WalkOptions {
            node_class_filter: request.node_class_filter.clone(),
            target_nodes_only: request.target_nodes_only,
            node_ids_only: request.node_ids_only,
            read_variable_values: request.read_variable_values,
            look_ahead: self.config.look_ahead,
        };

        let outcome = self
            .walker(&scope)
            .resume(&token, request.abort, &options, diagnostics)
            .await?;

        Ok(BrowseNextResponse {
            references: outcome.references,
            continuation_token: outcome.continuation_token,
            error_info: None,
        })
    }

    /// Translates browse paths from a start node into every node they reach.
    pub async fn browse_path(
        &self,
        ctx: &SessionContext,
        request: BrowsePathRequest,
    ) -> OpcUaResult<BrowsePathResponse> {
        let mut diagnostics = self.collector(request.header.as_ref());
        let result = self.browse_path_inner(ctx, &request, &mut diagnostics).await;
        self.complete(ctx, "BrowsePath", result, diagnostics)
    }

    async fn browse_path_inner(
        &self,
        ctx: &SessionContext,
        request: &BrowsePathRequest,
        diagnostics: &mut DiagnosticsCollector,
    ) -> OpcUaResult<BrowsePathResponse> {
        let scope = self.scope(ctx).await?;
        let start = match request.node_id.as_deref().filter(|s| !s.is_empty()) {
            Some(text) => parse_node_id(text, &scope.table)?,
            None => well_known::ROOT_FOLDER,
        };
        let lookup = TransportLookup {
            transport: self.transport.as_ref(),
            ctx: &scope.ctx,
        };
        let walker = self.walker(&scope);

        let mut targets = Vec::new();
        for elements in &request.browse_paths {
            let path = BrowsePath::parse(elements, &scope.table)?;
            let operation = format!("BrowsePath_{}", elements.join(""));
            let reached = collect_path_targets(&start, &path, &lookup, &scope.table).await?;
            if reached.is_empty() {
                diagnostics.record(operation, status_codes::BAD_NO_MATCH, None);
                continue;
            }
            for node_id in reached {
                let target = if request.node_ids_only {
                    NodeSnapshot::bare(self.render(&node_id, &scope.table))
                } else {
                    match walker
                        .snapshot(&node_id, None, request.read_variable_values, diagnostics)
                        .await
                    {
                        Ok(snapshot) => snapshot,
                        Err(e) if e.is_systemic() || is_interruption(&e) => return Err(e),
                        Err(e) => {
                            // The target was reached; only its attributes are missing.
                            debug!(node = %node_id, error = %e, "Browse path target unreadable");
                            diagnostics.record_error(&operation, &e);
                            NodeSnapshot::bare(self.render(&node_id, &scope.table))
                        }
                    }
                };
                targets.push(PathTarget {
                    browse_path: elements.clone(),
                    target,
                });
            }
        }

        if targets.is_empty() && !request.browse_paths.is_empty() {
            let described = request
                .browse_paths
                .iter()
                .map(|p| p.join(""))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(AddressError::no_match(described).into());
        }

        Ok(BrowsePathResponse {
            targets,
            error_info: None,
        })
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// Reads attributes; each item succeeds or fails on its own.
    pub async fn read_attributes(
        &self,
        ctx: &SessionContext,
        request: ReadRequest,
    ) -> OpcUaResult<ReadResponse> {
        let mut diagnostics = self.collector(request.header.as_ref());
        let result = self.read_attributes_inner(ctx, &request, &mut diagnostics).await;
        self.complete(ctx, "Read", result, diagnostics)
    }

    async fn read_attributes_inner(
        &self,
        ctx: &SessionContext,
        request: &ReadRequest,
        diagnostics: &mut DiagnosticsCollector,
    ) -> OpcUaResult<ReadResponse> {
        let scope = self.scope(ctx).await?;
        let mut results = vec![AttributeReadResult::default(); request.attributes.len()];

        let mut pending = Vec::new();
        let mut items = Vec::new();
        for (index, item) in request.attributes.iter().enumerate() {
            match parse_node_id(&item.node_id, &scope.table) {
                Ok(node_id) => {
                    pending.push(index);
                    items.push(ReadValueId::new(node_id, item.attribute));
                }
                Err(e) => results[index].error_info = Some(self.item_error(&e, diagnostics, &item.node_id)),
            }
        }

        if !items.is_empty() {
            let values = scope
                .ctx
                .run("Read", self.transport.read(&scope.ctx, &items, TimestampsToReturn::Both))
                .await?;
            let answered = values.len();
            let mut values = values.into_iter();
            for (index, item) in pending.into_iter().zip(&items) {
                let operation = format!("Read_{}_{}", self.render(&item.node_id, &scope.table), item.attribute_id.as_str());
                let Some(value) = values.next() else {
                    let error = unanswered(answered, items.len());
                    results[index].error_info = Some(self.item_error(&error, diagnostics, &operation));
                    continue;
                };
                results[index] = match self.decode_data_value(&value, None, &scope.table) {
                    Ok(decoded) => {
                        diagnostics.record(operation, status_codes::GOOD, None);
                        AttributeReadResult {
                            value: Some(decoded),
                            error_info: None,
                        }
                    }
                    Err(e) => AttributeReadResult {
                        value: None,
                        error_info: Some(self.item_error(&e, diagnostics, &operation)),
                    },
                };
            }
        }

        Ok(ReadResponse {
            results,
            error_info: None,
        })
    }

    /// Writes attributes; each item succeeds or fails on its own.
    ///
    /// Values of the `Value` attribute are encoded for the node's declared
    /// type; other attributes use their fixed standard types.
    pub async fn write_attributes(
        &self,
        ctx: &SessionContext,
        request: WriteRequest,
    ) -> OpcUaResult<WriteResponse> {
        let mut diagnostics = self.collector(request.header.as_ref());
        let result = self.write_attributes_inner(ctx, &request, &mut diagnostics).await;
        self.complete(ctx, "Write", result, diagnostics)
    }

    async fn write_attributes_inner(
        &self,
        ctx: &SessionContext,
        request: &WriteRequest,
        diagnostics: &mut DiagnosticsCollector,
    ) -> OpcUaResult<WriteResponse> {
        let scope = self.scope(ctx).await?;
        let mut results = vec![AttributeWriteResult::default(); request.attributes.len()];

        let mut pending = Vec::new();
        let mut items = Vec::new();
        for (index, item) in request.attributes.iter().enumerate() {
            match self.prepare_write(&scope, item).await {
                Ok(write) => {
                    pending.push(index);
                    items.push(write);
                }
                Err(e) if e.is_systemic() => return Err(e),
                Err(e) => results[index].error_info = Some(self.item_error(&e, diagnostics, &item.node_id)),
            }
        }

        if !items.is_empty() {
            let statuses = scope
                .ctx
                .run("Write", self.transport.write(&scope.ctx, &items))
                .await?;
            let answered = statuses.len();
            let mut statuses = statuses.into_iter();
            for (index, item) in pending.into_iter().zip(&items) {
                let operation = format!("Write_{}_{}", self.render(&item.node_id, &scope.table), item.attribute_id.as_str());
                let Some(status) = statuses.next() else {
                    let error = unanswered(answered, items.len());
                    results[index].error_info = Some(self.item_error(&error, diagnostics, &operation));
                    continue;
                };
                diagnostics.record(&operation, status, None);
                if status_codes::is_bad(status) {
                    results[index].error_info = Some(ServiceResult::from_status(status));
                }
            }
        }

        Ok(WriteResponse {
            results,
            error_info: None,
        })
    }

    async fn prepare_write(&self, scope: &Scope, item: &AttributeWriteItem) -> OpcUaResult<WriteValue> {
        let node_id = parse_node_id(&item.node_id, &scope.table)?;
        let declared = match attribute_type(item.attribute) {
            Some(declared) => declared,
            None => self.node_declared_type(scope, &node_id, None).await?,
        };
        let encoded = self.codec.encode(&item.value, &declared, &scope.table)?;
        Ok(WriteValue {
            node_id,
            attribute_id: item.attribute,
            index_range: None,
            value: DataValue::good(encoded.variant),
        })
    }

    // =========================================================================
    // Values
    // =========================================================================

    /// Reads the value of a node addressed by id, id and path, or path.
    pub async fn read_value(
        &self,
        ctx: &SessionContext,
        request: ValueReadRequest,
    ) -> OpcUaResult<ValueReadResponse> {
        let mut diagnostics = self.collector(request.header.as_ref());
        let result = self.read_value_inner(ctx, &request, &mut diagnostics).await;
        self.complete(ctx, "ValueRead", result, diagnostics)
    }

    async fn read_value_inner(
        &self,
        ctx: &SessionContext,
        request: &ValueReadRequest,
        diagnostics: &mut DiagnosticsCollector,
    ) -> OpcUaResult<ValueReadResponse> {
        let scope = self.scope(ctx).await?;
        let node_id = self
            .resolve_target(&scope, request.node_id.as_deref(), &request.browse_path)
            .await?;
        let operation = format!("ReadValue_{}", self.render(&node_id, &scope.table));

        let items = [
            ReadValueId {
                index_range: request.index_range.clone(),
                ..ReadValueId::new(node_id.clone(), AttributeId::Value)
            },
            ReadValueId::new(node_id.clone(), AttributeId::DataType),
            ReadValueId::new(node_id.clone(), AttributeId::ValueRank),
        ];
        let values = scope
            .ctx
            .run(&operation, self.transport.read(&scope.ctx, &items, TimestampsToReturn::Both))
            .await?;
        let value = values.first().cloned().unwrap_or_else(|| DataValue::bad(status_codes::BAD_UNEXPECTED_ERROR));
        diagnostics.record(&operation, value.status_code, None);
        if !value.is_usable() {
            return Err(ServiceError::fault(value.status_code, format!("{} failed", operation)).into());
        }

        let declared = match values.get(1).and_then(attr_node_id) {
            Some(data_type) => {
                let rank = values.get(2).and_then(attr_i32).unwrap_or(value_rank::ANY);
                match self.declared_type(&scope, &data_type, rank).await {
                    Ok(declared) => Some(declared),
                    Err(e) if e.is_systemic() => return Err(e),
                    Err(e) => {
                        debug!(node = %node_id, error = %e, "Declared type unresolved, decoding by wire tag");
                        None
                    }
                }
            }
            None => None,
        };

        let declared_name = declared.as_ref().map(|d| d.name.as_str());
        let decoded = self.codec.decode(&value.value, declared_name, &scope.table)?;
        let data_type = declared_name
            .map(str::to_string)
            .or_else(|| value.value.built_in_type().map(|t| t.name().to_string()));

        Ok(ValueReadResponse {
            value: Some(decoded),
            data_type,
            source_timestamp: value.source_timestamp,
            server_timestamp: value.server_timestamp,
            error_info: None,
        })
    }

    /// Writes the value of a node, encoded for its declared type.
    pub async fn write_value(
        &self,
        ctx: &SessionContext,
        request: ValueWriteRequest,
    ) -> OpcUaResult<ValueWriteResponse> {
        let mut diagnostics = self.collector(request.header.as_ref());
        let result = self.write_value_inner(ctx, &request, &mut diagnostics).await;
        self.complete(ctx, "ValueWrite", result, diagnostics)
    }

    async fn write_value_inner(
        &self,
        ctx: &SessionContext,
        request: &ValueWriteRequest,
        diagnostics: &mut DiagnosticsCollector,
    ) -> OpcUaResult<ValueWriteResponse> {
        let scope = self.scope(ctx).await?;
        let node_id = self
            .resolve_target(&scope, request.node_id.as_deref(), &request.browse_path)
            .await?;
        let operation = format!("WriteValue_{}", self.render(&node_id, &scope.table));

        let declared = self
            .node_declared_type(&scope, &node_id, request.data_type.as_deref())
            .await?;
        let encoded = self.codec.encode(&request.value, &declared, &scope.table)?;
        debug!(node = %node_id, declared = %encoded.type_name, "Writing value");

        let items = [WriteValue {
            node_id,
            attribute_id: AttributeId::Value,
            index_range: request.index_range.clone(),
            value: DataValue::good(encoded.variant),
        }];
        let statuses = scope
            .ctx
            .run(&operation, self.transport.write(&scope.ctx, &items))
            .await?;
        let status = statuses.first().copied().unwrap_or(status_codes::BAD_UNEXPECTED_ERROR);
        diagnostics.record(&operation, status, None);
        if status_codes::is_bad(status) {
            return Err(ServiceError::fault(status, format!("{} failed", operation)).into());
        }

        Ok(ValueWriteResponse { error_info: None })
    }

    // =========================================================================
    // Methods
    // =========================================================================

    /// Calls a method.
    ///
    /// An id wins over a path for both method and object. A method path
    /// without id starts at the object; an object path without id starts at
    /// the root. Without any object the owner is found through an inverse
    /// HasComponent reference. Missing trailing inputs take the declared
    /// default or the zero value of their type.
    pub async fn call_method(
        &self,
        ctx: &SessionContext,
        request: MethodCallRequest,
    ) -> OpcUaResult<MethodCallResponse> {
        let mut diagnostics = self.collector(request.header.as_ref());
        let result = self.call_method_inner(ctx, &request, &mut diagnostics).await;
        self.complete(ctx, "Call", result, diagnostics)
    }

    async fn call_method_inner(
        &self,
        ctx: &SessionContext,
        request: &MethodCallRequest,
        diagnostics: &mut DiagnosticsCollector,
    ) -> OpcUaResult<MethodCallResponse> {
        let scope = self.scope(ctx).await?;

        let object_id = self
            .resolve_optional(&scope, request.object_id.as_deref(), &request.object_browse_path, None)
            .await?;
        let method_id = self
            .resolve_optional(
                &scope,
                request.method_id.as_deref(),
                &request.method_browse_path,
                object_id.as_ref(),
            )
            .await?
            .ok_or_else(|| OpcUaError::invalid_address("method_id", "a method id or browse path is required"))?;

        let arguments = self.argument_set(&scope, &method_id, diagnostics).await?;
        let object_id = match object_id.or(arguments.object_id.clone()) {
            Some(id) => id,
            None => {
                return Err(OpcUaError::invalid_address(
                    self.render(&method_id, &scope.table),
                    "the method has no owning object",
                ))
            }
        };

        if request.arguments.len() > arguments.inputs.len() {
            return Err(ConversionError::TooManyArguments {
                supplied: request.arguments.len(),
                declared: arguments.inputs.len(),
            }
            .into());
        }

        let mut inputs = Vec::with_capacity(arguments.inputs.len());
        for (index, descriptor) in arguments.inputs.iter().enumerate() {
            let declared = self.argument_type(&scope, descriptor).await?;
            let supplied = request.arguments.get(index);
            let variant = match supplied.and_then(|a| a.value.as_ref()) {
                Some(value) => {
                    let declared = match supplied.and_then(|a| a.data_type.as_deref()) {
                        Some(name) => self.named_type(&scope, name, descriptor.value_rank).await?,
                        None => declared,
                    };
                    self.codec.encode(value, &declared, &scope.table)?.variant
                }
                None => descriptor
                    .default_value
                    .clone()
                    .unwrap_or_else(|| VariantCodec::default_value(&declared)),
            };
            inputs.push(variant);
        }

        let operation = format!("Call_{}", self.render(&method_id, &scope.table));
        let call = MethodCall {
            object_id,
            method_id,
            input_arguments: inputs,
        };
        let outcome = scope
            .ctx
            .run(&operation, self.transport.call(&scope.ctx, &call))
            .await?;

        for (index, status) in outcome.input_argument_results.iter().enumerate() {
            if status_codes::is_bad(*status) {
                diagnostics.record(format!("{}_Argument{}", operation, index), *status, None);
            }
        }
        diagnostics.record(&operation, outcome.status_code, None);
        if status_codes::is_bad(outcome.status_code) {
            return Err(ServiceError::fault(outcome.status_code, format!("{} failed", operation)).into());
        }

        let mut results = Vec::with_capacity(outcome.output_arguments.len());
        for (index, output) in outcome.output_arguments.iter().enumerate() {
            let descriptor = arguments.outputs.get(index);
            let declared = match descriptor {
                Some(descriptor) => Some(self.argument_type(&scope, descriptor).await?),
                None => None,
            };
            let variant = match (output, descriptor.and_then(|d| d.default_value.as_ref())) {
                (Variant::Empty, Some(default)) => default,
                (output, _) => output,
            };
            let declared_name = declared.as_ref().map(|d| d.name.clone());
            let value = self.codec.decode(variant, declared_name.as_deref(), &scope.table)?;
            results.push(MethodCallArgument {
                value: Some(value),
                data_type: declared_name.or_else(|| variant.built_in_type().map(|t| t.name().to_string())),
            });
        }

        Ok(MethodCallResponse {
            results,
            error_info: None,
        })
    }

    /// Returns the owning object and declared arguments of a method.
    pub async fn method_metadata(
        &self,
        ctx: &SessionContext,
        request: MethodMetadataRequest,
    ) -> OpcUaResult<MethodMetadataResponse> {
        let mut diagnostics = self.collector(request.header.as_ref());
        let result = self.method_metadata_inner(ctx, &request, &mut diagnostics).await;
        self.complete(ctx, "MethodMetadata", result, diagnostics)
    }

    async fn method_metadata_inner(
        &self,
        ctx: &SessionContext,
        request: &MethodMetadataRequest,
        diagnostics: &mut DiagnosticsCollector,
    ) -> OpcUaResult<MethodMetadataResponse> {
        let scope = self.scope(ctx).await?;
        let method_id = self
            .resolve_target(&scope, request.method_id.as_deref(), &request.method_browse_path)
            .await?;
        let arguments = self.argument_set(&scope, &method_id, diagnostics).await?;

        let mut input_arguments = Vec::with_capacity(arguments.inputs.len());
        for descriptor in &arguments.inputs {
            input_arguments.push(self.describe_argument(&scope, descriptor).await?);
        }
        let mut output_arguments = Vec::with_capacity(arguments.outputs.len());
        for descriptor in &arguments.outputs {
            output_arguments.push(self.describe_argument(&scope, descriptor).await?);
        }

        Ok(MethodMetadataResponse {
            object_id: arguments.object_id.map(|id| self.render(&id, &scope.table)),
            input_arguments,
            output_arguments,
            error_info: None,
        })
    }

    async fn describe_argument(&self, scope: &Scope, descriptor: &ArgumentDescriptor) -> OpcUaResult<MethodArgument> {
        let data_type_name = match scope
            .ctx
            .run(
                "ReadDataTypeName",
                self.transport.read_one(&scope.ctx, &descriptor.data_type, AttributeId::DisplayName),
            )
            .await
        {
            Ok(value) => attr_text(&value),
            Err(e) if e.is_systemic() || is_interruption(&e) => return Err(e),
            Err(_) => None,
        };

        let default_value = match &descriptor.default_value {
            Some(value) => Some(self.codec.decode(value, None, &scope.table)?),
            None => None,
        };

        Ok(MethodArgument {
            name: descriptor.name.clone(),
            data_type: self.render(&descriptor.data_type, &scope.table),
            data_type_name,
            value_rank: (descriptor.value_rank != value_rank::SCALAR).then_some(descriptor.value_rank),
            array_dimensions: descriptor.array_dimensions.clone(),
            description: descriptor.description.as_ref().map(|d| d.text.clone()),
            default_value,
        })
    }

    /// Browses the aggregates of a method in both directions: the forward
    /// argument properties and the inverse HasComponent owner.
    async fn argument_set(
        &self,
        scope: &Scope,
        method_id: &NodeId,
        diagnostics: &mut DiagnosticsCollector,
    ) -> OpcUaResult<ArgumentSet> {
        let operation = format!("Browse_{}", self.render(method_id, &scope.table));
        let description = BrowseDescription {
            node_id: method_id.clone(),
            direction: BrowseDirection::Both,
            reference_type_id: well_known::AGGREGATES,
            include_subtypes: true,
            node_class_mask: 0,
        };
        let references = browse_all(self.transport.as_ref(), &scope.ctx, &description).await;
        if let Err(e) = &references {
            diagnostics.record_error(&operation, e);
        }

        let mut set = ArgumentSet::default();
        for reference in references? {
            if !reference.is_forward {
                if reference.reference_type_id == well_known::HAS_COMPONENT && set.object_id.is_none() {
                    set.object_id = Some(reference.target);
                }
                continue;
            }
            let is_input = reference.browse_name.name == well_known::INPUT_ARGUMENTS;
            if !is_input && reference.browse_name.name != well_known::OUTPUT_ARGUMENTS {
                continue;
            }

            let property = format!("ReadValue_{}", self.render(&reference.target, &scope.table));
            let value = scope
                .ctx
                .run(
                    &property,
                    self.transport.read_one(&scope.ctx, &reference.target, AttributeId::Value),
                )
                .await?;
            diagnostics.record(&property, value.status_code, None);
            if !value.is_usable() {
                continue;
            }

            let arguments = ArgumentDescriptor::list_from_variant(&value.value)?;
            if is_input {
                set.inputs = arguments;
            } else {
                set.outputs = arguments;
            }
        }
        Ok(set)
    }

    // =========================================================================
    // Type resolution
    // =========================================================================

    /// Follows supertypes until a built-in or abstract standard type.
    async fn declared_type(&self, scope: &Scope, data_type_id: &NodeId, rank: i32) -> OpcUaResult<DeclaredType> {
        let mut current = data_type_id.clone();
        for _ in 0..=self.config.max_type_depth {
            if let Some(kind) = current.as_ns0().and_then(TypeKind::from_data_type_id) {
                let name = match kind {
                    TypeKind::Concrete(t) => t.name(),
                    TypeKind::Abstract(a) => a.name(),
                };
                return Ok(DeclaredType {
                    name: name.to_string(),
                    kind,
                    value_rank: rank,
                });
            }
            let parent = scope
                .ctx
                .run("ResolveDataType", self.transport.super_type(&scope.ctx, &current))
                .await?;
            match parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Err(ConversionError::unsupported_type(self.render(data_type_id, &scope.table)).into())
    }

    /// Resolves a caller supplied type name or type address.
    async fn named_type(&self, scope: &Scope, name: &str, rank: i32) -> OpcUaResult<DeclaredType> {
        if TypeKind::from_name(name).is_some() {
            return DeclaredType::from_name(name, rank);
        }
        let data_type_id = parse_node_id(name, &scope.table)?;
        self.declared_type(scope, &data_type_id, rank).await
    }

    async fn argument_type(&self, scope: &Scope, descriptor: &ArgumentDescriptor) -> OpcUaResult<DeclaredType> {
        self.declared_type(scope, &descriptor.data_type, descriptor.value_rank).await
    }

    /// Declared type of a node's value; `data_type` overrides the node's
    /// DataType, the shape always comes from its ValueRank.
    async fn node_declared_type(
        &self,
        scope: &Scope,
        node_id: &NodeId,
        data_type: Option<&str>,
    ) -> OpcUaResult<DeclaredType> {
        let items = [
            ReadValueId::new(node_id.clone(), AttributeId::DataType),
            ReadValueId::new(node_id.clone(), AttributeId::ValueRank),
        ];
        let operation = format!("ReadDataType_{}", self.render(node_id, &scope.table));
        let values = scope
            .ctx
            .run(&operation, self.transport.read(&scope.ctx, &items, TimestampsToReturn::Neither))
            .await?;
        let rank = values.get(1).and_then(attr_i32).unwrap_or(value_rank::ANY);

        if let Some(name) = data_type.filter(|s| !s.is_empty()) {
            return self.named_type(scope, name, rank).await;
        }
        match values.first() {
            Some(value) if !value.is_usable() => {
                Err(ServiceError::fault(value.status_code, format!("{} failed", operation)).into())
            }
            Some(value) => match attr_node_id(value) {
                Some(data_type_id) => self.declared_type(scope, &data_type_id, rank).await,
                None => Err(ConversionError::type_mismatch("NodeId", "DataType attribute").into()),
            },
            None => Err(ServiceError::fault(status_codes::BAD_UNEXPECTED_ERROR, "Read returned no results").into()),
        }
    }

    // =========================================================================
    // Addressing
    // =========================================================================

    /// Id wins over path; a path alone starts at `base` or the root.
    async fn resolve_optional(
        &self,
        scope: &Scope,
        node_id: Option<&str>,
        path: &[String],
        base: Option<&NodeId>,
    ) -> OpcUaResult<Option<NodeId>> {
        let has_path = path.iter().any(|p| !p.is_empty());
        if let Some(text) = node_id.filter(|s| !s.is_empty()) {
            let node_id = parse_node_id(text, &scope.table)?;
            if has_path {
                debug!(node = %node_id, "Both id and browse path supplied, using id");
            }
            return Ok(Some(node_id));
        }
        if !has_path {
            return Ok(None);
        }

        let path = BrowsePath::parse(path, &scope.table)?;
        let start = base.cloned().unwrap_or(well_known::ROOT_FOLDER);
        let lookup = TransportLookup {
            transport: self.transport.as_ref(),
            ctx: &scope.ctx,
        };
        resolve_browse_path(&start, &path, &lookup, &scope.table).await.map(Some)
    }

    /// A path is resolved relative to the id when both are given.
    async fn resolve_target(&self, scope: &Scope, node_id: Option<&str>, path: &[String]) -> OpcUaResult<NodeId> {
        let base = match node_id.filter(|s| !s.is_empty()) {
            Some(text) => Some(parse_node_id(text, &scope.table)?),
            None => None,
        };
        let resolved = if path.iter().any(|p| !p.is_empty()) {
            self.resolve_optional(scope, None, path, base.as_ref()).await?
        } else {
            base
        };
        resolved.ok_or_else(|| OpcUaError::invalid_address("node_id", "a node id or browse path is required"))
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    async fn scope(&self, ctx: &SessionContext) -> OpcUaResult<Scope> {
        let mut ctx = ctx.clone();
        if ctx.timeout().is_none() {
            if let Some(timeout) = self.config.timeout() {
                ctx = ctx.with_timeout(timeout);
            }
        }
        let table = ctx
            .run("NamespaceTable", self.transport.namespace_table(&ctx))
            .await?;
        Ok(Scope { ctx, table })
    }

    fn walker<'a>(&'a self, scope: &'a Scope) -> BrowseWalker<'a, T> {
        BrowseWalker::new(
            self.transport.as_ref(),
            &scope.ctx,
            &scope.table,
            self.codec,
            self.config.address_format,
        )
    }

    fn render(&self, node_id: &NodeId, table: &NamespaceTable) -> String {
        render_node_id(node_id, table, self.config.address_format)
    }

    fn collector(&self, header: Option<&RequestHeader>) -> DiagnosticsCollector {
        let level = header
            .and_then(|h| h.diagnostics.as_ref())
            .map(|d| d.level)
            .unwrap_or(self.config.diagnostics_level);
        DiagnosticsCollector::new(level)
    }

    fn decode_data_value(&self, value: &DataValue, declared: Option<&str>, table: &NamespaceTable) -> OpcUaResult<DynamicValue> {
        if !value.is_usable() {
            return Err(ServiceError::fault(value.status_code, status_codes::name(value.status_code)).into());
        }
        self.codec.decode(&value.value, declared, table)
    }

    fn item_error(&self, error: &OpcUaError, diagnostics: &mut DiagnosticsCollector, operation: &str) -> ServiceResult {
        diagnostics.record_error(operation, error);
        ServiceResult {
            error_message: Some(error.to_string()),
            ..ServiceResult::from_status(error.status_code())
        }
    }

    fn complete<R: ServiceResponse>(
        &self,
        ctx: &SessionContext,
        operation: &str,
        result: OpcUaResult<R>,
        mut diagnostics: DiagnosticsCollector,
    ) -> OpcUaResult<R> {
        match result {
            Ok(mut response) => {
                if let Some(details) = diagnostics.finish() {
                    response
                        .error_info_mut()
                        .get_or_insert_with(|| ServiceResult::from_status(status_codes::GOOD))
                        .diagnostics = Some(details);
                }
                info!(session = ctx.session_id(), operation = operation, "Service call completed");
                Ok(response)
            }
            Err(e) if e.is_systemic() => {
                e.log(operation);
                Err(e)
            }
            Err(e) => {
                e.log(operation);
                diagnostics.record_error(operation, &e);
                let mut response = R::default();
                *response.error_info_mut() = Some(ServiceResult::from_error(&e, &diagnostics));
                Ok(response)
            }
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Single-level lookups through the transport, used to resolve paths.
struct TransportLookup<'a, T: OpcUaTransport + ?Sized> {
    transport: &'a T,
    ctx: &'a SessionContext,
}

#[async_trait]
impl<T: OpcUaTransport + ?Sized> ReferenceLookup for TransportLookup<'_, T> {
    async fn children(&self, request: LookupRequest<'_>) -> OpcUaResult<Vec<ChildReference>> {
        let description = BrowseDescription {
            node_id: request.node_id.clone(),
            direction: if request.inverse {
                BrowseDirection::Inverse
            } else {
                BrowseDirection::Forward
            },
            reference_type_id: request.reference_type_id.clone(),
            include_subtypes: request.include_subtypes,
            node_class_mask: 0,
        };
        let references = browse_all(self.transport, self.ctx, &description).await?;
        Ok(references
            .into_iter()
            .map(|r| ChildReference {
                node_id: r.target,
                browse_name: r.browse_name,
            })
            .collect())
    }
}

/// Browses every page of `description`.
async fn browse_all<T: OpcUaTransport + ?Sized>(
    transport: &T,
    ctx: &SessionContext,
    description: &BrowseDescription,
) -> OpcUaResult<Vec<RawReference>> {
    let operation = "Browse";
    let mut page = ctx.run(operation, transport.browse(ctx, description, 0)).await?;
    let mut references = std::mem::take(&mut page.references);
    while let Some(cp) = page.continuation_point.take().filter(|cp| !cp.is_empty()) {
        page = ctx.run(operation, transport.browse_next(ctx, &cp, false)).await?;
        references.append(&mut page.references);
    }
    Ok(references)
}

fn parse_reference_type(text: &str, table: &NamespaceTable) -> OpcUaResult<NodeId> {
    match well_known::reference_type_id(text) {
        Some(id) => Ok(NodeId::ns0(id)),
        None => parse_node_id(text, table),
    }
}

/// Error for items the server returned no result for.
fn unanswered(answered: usize, requested: usize) -> OpcUaError {
    ServiceError::fault(
        status_codes::BAD_UNEXPECTED_ERROR,
        format!("Server answered {} of {} items", answered, requested),
    )
    .into()
}

/// Fixed type of every attribute except `Value`.
fn attribute_type(attribute: AttributeId) -> Option<DeclaredType> {
    use AttributeId as A;
    let built_in = match attribute {
        A::Value => return None,
        A::NodeId | A::DataType => BuiltInType::NodeId,
        A::NodeClass | A::ValueRank => BuiltInType::Int32,
        A::BrowseName => BuiltInType::QualifiedName,
        A::DisplayName | A::Description | A::InverseName => BuiltInType::LocalizedText,
        A::WriteMask | A::UserWriteMask => BuiltInType::UInt32,
        A::IsAbstract
        | A::Symmetric
        | A::ContainsNoLoops
        | A::Historizing
        | A::Executable
        | A::UserExecutable => BuiltInType::Boolean,
        A::EventNotifier | A::AccessLevel | A::UserAccessLevel => BuiltInType::Byte,
        A::MinimumSamplingInterval => BuiltInType::Double,
        A::ArrayDimensions => return Some(DeclaredType::array(BuiltInType::UInt32)),
    };
    Some(DeclaredType::scalar(built_in))
}
