// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Paginated browsing with continuation tokens and children look-ahead.
//!
//! # State machine
//!
//! ```text
//!            start(descriptor)                 resume(token, abort = false)
//!                  │                                    │
//!                  ▼                                    ▼
//!        ┌───────────────────┐               ┌───────────────────┐
//!        │  Browse (bounded) │               │    BrowseNext     │
//!        └─────────┬─────────┘               └─────────┬─────────┘
//!                  └──────────────┬────────────────────┘
//!                                 ▼
//!                   filter node classes (after fetch)
//!                                 │
//!                                 ▼
//!              per reference: snapshot + children look-ahead
//!                                 │
//!                ┌────────────────┴────────────────┐
//!                ▼                                 ▼
//!     server returned a cursor           no cursor: exhausted
//!     → ContinuationToken
//!
//!            resume(token, abort = true) → release cursor, no references
//! ```
//!
//! The token is only issued when the server signals more results, never
//! inferred from the page size. A look-ahead failure leaves `has_children`
//! unknown and never fails the page.

use std::collections::HashSet;
use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::address::{render_node_id, AddressFormat, NamespaceTable};
use crate::codec::VariantCodec;
use crate::diagnostics::DiagnosticsCollector;
use crate::error::{status_codes, BrowseError, OpcUaError, OpcUaResult};
use crate::path::TargetName;
use crate::transport::{
    BrowseDescription, BrowsePage, DataValue, OpcUaTransport, RawReference, ReadValueId,
    SessionContext,
};
use crate::types::{
    well_known, AttributeId, BrowseDirection, LocalizedText, NodeClass, NodeId, QualifiedName,
    TimestampsToReturn,
};
use crate::value::DynamicValue;
use crate::variant::{Scalar, Variant};

// =============================================================================
// ContinuationToken
// =============================================================================

/// Opaque browse cursor: base64 of the server's continuation point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    /// Wraps a server continuation point.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(BASE64.encode(bytes))
    }

    /// Validates a token received from a caller.
    ///
    /// # Errors
    ///
    /// Returns [`BrowseError::InvalidContinuation`] for empty or non-base64 text.
    pub fn parse(text: &str) -> OpcUaResult<Self> {
        let token = Self(text.trim().to_string());
        token.to_bytes()?;
        Ok(token)
    }

    /// Returns the server continuation point.
    pub fn to_bytes(&self) -> OpcUaResult<Vec<u8>> {
        let bytes = BASE64
            .decode(&self.0)
            .map_err(|e| BrowseError::invalid_continuation(format!("token is not base64: {}", e)))?;
        if bytes.is_empty() {
            return Err(BrowseError::invalid_continuation("token is empty").into());
        }
        Ok(bytes)
    }

    /// Returns the token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Snapshots
// =============================================================================

/// Class specific attributes of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeDetail {
    /// Object.
    Object {
        /// Event notifier mask.
        event_notifier: Option<u8>,
    },
    /// Variable.
    Variable {
        /// Data type address.
        data_type: Option<String>,
        /// Value rank.
        value_rank: Option<i32>,
        /// Array dimensions.
        array_dimensions: Option<Vec<u32>>,
        /// Access level mask.
        access_level: Option<u8>,
        /// User access level mask.
        user_access_level: Option<u8>,
        /// Historizing flag.
        historizing: Option<bool>,
        /// Minimum sampling interval in milliseconds.
        minimum_sampling_interval: Option<f64>,
    },
    /// Method.
    Method {
        /// Executable flag.
        executable: Option<bool>,
        /// User executable flag.
        user_executable: Option<bool>,
    },
    /// Object type.
    ObjectType {
        /// Abstract flag.
        is_abstract: Option<bool>,
    },
    /// Variable type.
    VariableType {
        /// Data type address.
        data_type: Option<String>,
        /// Value rank.
        value_rank: Option<i32>,
        /// Abstract flag.
        is_abstract: Option<bool>,
    },
    /// Reference type.
    ReferenceType {
        /// Abstract flag.
        is_abstract: Option<bool>,
        /// Symmetric flag.
        symmetric: Option<bool>,
        /// Inverse name.
        inverse_name: Option<String>,
    },
    /// Data type.
    DataType {
        /// Abstract flag.
        is_abstract: Option<bool>,
    },
    /// View.
    View {
        /// Contains-no-loops flag.
        contains_no_loops: Option<bool>,
        /// Event notifier mask.
        event_notifier: Option<u8>,
    },
}

impl NodeDetail {
    /// Attributes read for a node class, in the order [`NodeDetail::from_values`] expects.
    pub fn attributes(class: NodeClass) -> &'static [AttributeId] {
        match class {
            NodeClass::Object => &[AttributeId::EventNotifier],
            NodeClass::Variable => &[
                AttributeId::DataType,
                AttributeId::ValueRank,
                AttributeId::ArrayDimensions,
                AttributeId::AccessLevel,
                AttributeId::UserAccessLevel,
                AttributeId::Historizing,
                AttributeId::MinimumSamplingInterval,
            ],
            NodeClass::Method => &[AttributeId::Executable, AttributeId::UserExecutable],
            NodeClass::ObjectType | NodeClass::DataType => &[AttributeId::IsAbstract],
            NodeClass::VariableType => &[
                AttributeId::DataType,
                AttributeId::ValueRank,
                AttributeId::IsAbstract,
            ],
            NodeClass::ReferenceType => &[
                AttributeId::IsAbstract,
                AttributeId::Symmetric,
                AttributeId::InverseName,
            ],
            NodeClass::View => &[AttributeId::ContainsNoLoops, AttributeId::EventNotifier],
        }
    }

    /// Builds the detail from values read for [`NodeDetail::attributes`].
    pub fn from_values(class: NodeClass, values: &[DataValue], table: &NamespaceTable, format: AddressFormat) -> Self {
        let at = |i: usize| values.get(i);
        let data_type = |i: usize| at(i).and_then(attr_node_id).map(|id| render_node_id(&id, table, format));
        match class {
            NodeClass::Object => Self::Object {
                event_notifier: at(0).and_then(attr_u8),
            },
            NodeClass::Variable => Self::Variable {
                data_type: data_type(0),
                value_rank: at(1).and_then(attr_i32),
                array_dimensions: at(2).and_then(attr_u32_list),
                access_level: at(3).and_then(attr_u8),
                user_access_level: at(4).and_then(attr_u8),
                historizing: at(5).and_then(attr_bool),
                minimum_sampling_interval: at(6).and_then(attr_f64),
            },
            NodeClass::Method => Self::Method {
                executable: at(0).and_then(attr_bool),
                user_executable: at(1).and_then(attr_bool),
            },
            NodeClass::ObjectType => Self::ObjectType {
                is_abstract: at(0).and_then(attr_bool),
            },
            NodeClass::DataType => Self::DataType {
                is_abstract: at(0).and_then(attr_bool),
            },
            NodeClass::VariableType => Self::VariableType {
                data_type: data_type(0),
                value_rank: at(1).and_then(attr_i32),
                is_abstract: at(2).and_then(attr_bool),
            },
            NodeClass::ReferenceType => Self::ReferenceType {
                is_abstract: at(0).and_then(attr_bool),
                symmetric: at(1).and_then(attr_bool),
                inverse_name: at(2).and_then(attr_text),
            },
            NodeClass::View => Self::View {
                contains_no_loops: at(0).and_then(attr_bool),
                event_notifier: at(1).and_then(attr_u8),
            },
        }
    }

    /// Returns the data type address of variables and variable types.
    pub fn data_type(&self) -> Option<&str> {
        match self {
            Self::Variable { data_type, .. } | Self::VariableType { data_type, .. } => data_type.as_deref(),
            _ => None,
        }
    }
}

/// A node as seen by a browse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    /// Address.
    pub node_id: String,
    /// Node class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_class: Option<NodeClass>,
    /// Browse name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browse_name: Option<String>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether hierarchical children exist; `None` when unknown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_children: Option<bool>,
    /// Type definition address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_definition_id: Option<String>,
    /// Class specific attributes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<NodeDetail>,
    /// Current value, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<DynamicValue>,
    /// Data type name of `value`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type_name: Option<String>,
}

impl NodeSnapshot {
    /// Creates a snapshot carrying only the address.
    pub fn bare(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            node_class: None,
            browse_name: None,
            display_name: None,
            description: None,
            has_children: None,
            type_definition_id: None,
            detail: None,
            value: None,
            data_type_name: None,
        }
    }
}

/// A reference and its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    /// Reference type address; absent with target-nodes-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_type_id: Option<String>,
    /// Direction; absent with target-nodes-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<BrowseDirection>,
    /// Target node.
    pub target: NodeSnapshot,
}

/// References of one page and the cursor for the next.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BrowseOutcome {
    /// References in server order.
    pub references: Vec<ReferenceRecord>,
    /// Cursor; `None` when exhausted.
    pub continuation_token: Option<ContinuationToken>,
}

// =============================================================================
// WalkOptions
// =============================================================================

/// Per-page projection options.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WalkOptions {
    /// Keep only these classes; empty keeps all.
    pub node_class_filter: Vec<NodeClass>,
    /// Emit only targets, deduplicated.
    pub target_nodes_only: bool,
    /// Skip the snapshot fetch.
    pub node_ids_only: bool,
    /// Read variable values along.
    pub read_variable_values: bool,
    /// Run the children look-ahead.
    pub look_ahead: bool,
}

impl WalkOptions {
    fn retains(&self, class: NodeClass) -> bool {
        self.node_class_filter.is_empty() || self.node_class_filter.contains(&class)
    }
}

// =============================================================================
// BrowseWalker
// =============================================================================

/// Drives one browse operation against a transport.
pub struct BrowseWalker<'a, T: OpcUaTransport + ?Sized> {
    transport: &'a T,
    ctx: &'a SessionContext,
    table: &'a NamespaceTable,
    codec: VariantCodec,
    format: AddressFormat,
}

impl<'a, T: OpcUaTransport + ?Sized> BrowseWalker<'a, T> {
    /// Creates a walker.
    pub fn new(
        transport: &'a T,
        ctx: &'a SessionContext,
        table: &'a NamespaceTable,
        codec: VariantCodec,
        format: AddressFormat,
    ) -> Self {
        Self {
            transport,
            ctx,
            table,
            codec,
            format,
        }
    }

    fn render(&self, node_id: &NodeId) -> String {
        render_node_id(node_id, self.table, self.format)
    }

    /// Issues the first bounded browse and processes its page.
    pub async fn start(
        &self,
        description: &BrowseDescription,
        max_references: u32,
        options: &WalkOptions,
        diagnostics: &mut DiagnosticsCollector,
    ) -> OpcUaResult<BrowseOutcome> {
        let operation = format!("Browse_{}", self.render(&description.node_id));
        // Class filtering happens locally so the page size is the server's
        let request = BrowseDescription {
            node_class_mask: 0,
            ..description.clone()
        };

        let page = self
            .ctx
            .run(&operation, self.transport.browse(self.ctx, &request, max_references))
            .await;
        let page = self.record(&operation, page, diagnostics)?;

        debug!(
            node = %description.node_id,
            references = page.references.len(),
            more = page.continuation_point.is_some(),
            "Browse page received"
        );
        self.process_page(page, options, diagnostics).await
    }

    /// Continues with a token; `abort` releases the cursor instead.
    pub async fn resume(
        &self,
        token: &ContinuationToken,
        abort: bool,
        options: &WalkOptions,
        diagnostics: &mut DiagnosticsCollector,
    ) -> OpcUaResult<BrowseOutcome> {
        let continuation_point = token.to_bytes()?;
        let operation = format!("BrowseNext_{}", token);

        let page = self
            .ctx
            .run(
                &operation,
                self.transport.browse_next(self.ctx, &continuation_point, abort),
            )
            .await
            .map_err(|e| match e {
                OpcUaError::Service(fault)
                    if fault.status_code == status_codes::BAD_CONTINUATION_POINT_INVALID =>
                {
                    OpcUaError::from(BrowseError::invalid_continuation(fault.message))
                }
                other => other,
            });
        let page = self.record(&operation, page, diagnostics)?;

        if abort {
            debug!(token = %token, "Browse cursor released");
            return Ok(BrowseOutcome::default());
        }
        self.process_page(page, options, diagnostics).await
    }

    fn record<R>(
        &self,
        operation: &str,
        result: OpcUaResult<R>,
        diagnostics: &mut DiagnosticsCollector,
    ) -> OpcUaResult<R> {
        match result {
            Ok(value) => {
                diagnostics.record(operation, status_codes::GOOD, None);
                Ok(value)
            }
            Err(e) => {
                diagnostics.record_error(operation, &e);
                Err(e)
            }
        }
    }

    async fn process_page(
        &self,
        page: BrowsePage,
        options: &WalkOptions,
        diagnostics: &mut DiagnosticsCollector,
    ) -> OpcUaResult<BrowseOutcome> {
        let BrowsePage {
            references,
            continuation_point,
        } = page;

        let mut records = Vec::with_capacity(references.len());
        let mut seen_targets = HashSet::new();

        for reference in references.iter().filter(|r| options.retains(r.node_class)) {
            if self.ctx.is_cancelled() {
                self.release(continuation_point.as_deref()).await;
                return Err(OpcUaError::cancelled("Browse"));
            }
            if options.target_nodes_only && !seen_targets.insert(reference.target.clone()) {
                continue;
            }

            let target = match self.target_snapshot(reference, options, diagnostics).await {
                Ok(target) => target,
                Err(e) => {
                    self.release(continuation_point.as_deref()).await;
                    return Err(e);
                }
            };

            records.push(if options.target_nodes_only {
                ReferenceRecord {
                    reference_type_id: None,
                    direction: None,
                    target,
                }
            } else {
                ReferenceRecord {
                    reference_type_id: Some(self.render(&reference.reference_type_id)),
                    direction: Some(if reference.is_forward {
                        BrowseDirection::Forward
                    } else {
                        BrowseDirection::Inverse
                    }),
                    target,
                }
            });
        }

        Ok(BrowseOutcome {
            references: records,
            continuation_token: continuation_point
                .filter(|cp| !cp.is_empty())
                .map(|cp| ContinuationToken::from_bytes(&cp)),
        })
    }

    /// Snapshot of a reference target; falls back to the reference's own
    /// metadata when the attribute read fails for the node.
    async fn target_snapshot(
        &self,
        reference: &RawReference,
        options: &WalkOptions,
        diagnostics: &mut DiagnosticsCollector,
    ) -> OpcUaResult<NodeSnapshot> {
        let mut snapshot = if options.node_ids_only {
            self.reference_snapshot(reference)
        } else {
            match self
                .snapshot(&reference.target, Some(reference.node_class), options.read_variable_values, diagnostics)
                .await
            {
                Ok(snapshot) => snapshot,
                Err(e) if e.is_systemic() || is_interruption(&e) => return Err(e),
                Err(_) => self.reference_snapshot(reference),
            }
        };

        if !options.node_ids_only && options.look_ahead {
            snapshot.has_children = self.has_children(&reference.target, diagnostics).await;
        }
        snapshot.type_definition_id = reference.type_definition.as_ref().map(|id| self.render(id));
        Ok(snapshot)
    }

    fn reference_snapshot(&self, reference: &RawReference) -> NodeSnapshot {
        NodeSnapshot {
            node_class: Some(reference.node_class),
            browse_name: Some(self.browse_name(&reference.browse_name)),
            display_name: Some(reference.display_name.text.clone()),
            ..NodeSnapshot::bare(self.render(&reference.target))
        }
    }

    fn browse_name(&self, name: &QualifiedName) -> String {
        TargetName {
            namespace: Some(self.table.namespace_ref(name.namespace_index)),
            name: name.name.clone(),
        }
        .render(self.table)
    }

    /// Children look-ahead: a forward hierarchical browse capped at one
    /// result. `None` when the look-ahead itself fails.
    pub async fn has_children(&self, node_id: &NodeId, diagnostics: &mut DiagnosticsCollector) -> Option<bool> {
        let operation = format!("FetchChildren_{}", self.render(node_id));
        let description = BrowseDescription::hierarchical(node_id.clone());

        match self
            .ctx
            .run(&operation, self.transport.browse(self.ctx, &description, 1))
            .await
        {
            Ok(page) => {
                if let Some(cp) = page.continuation_point.as_deref() {
                    self.release(Some(cp)).await;
                }
                Some(!page.references.is_empty())
            }
            Err(e) => {
                warn!(node = %node_id, error = %e, "Children look-ahead failed");
                diagnostics.record_error(operation, &e);
                None
            }
        }
    }

    /// Frees a server cursor; failures are only logged.
    async fn release(&self, continuation_point: Option<&[u8]>) {
        let Some(cp) = continuation_point.filter(|cp| !cp.is_empty()) else {
            return;
        };
        if let Err(e) = self.transport.browse_next(self.ctx, cp, true).await {
            debug!(error = %e, "Releasing continuation point failed");
        }
    }

    /// Reads a node's snapshot: common attributes, class specific
    /// attributes and optionally the value.
    pub async fn snapshot(
        &self,
        node_id: &NodeId,
        node_class: Option<NodeClass>,
        read_value: bool,
        diagnostics: &mut DiagnosticsCollector,
    ) -> OpcUaResult<NodeSnapshot> {
        let operation = format!("ReadNode_{}", self.render(node_id));

        let node_class = match node_class {
            Some(class) => class,
            None => {
                let value = self.read(&operation, node_id, &[AttributeId::NodeClass], diagnostics).await?;
                value
                    .first()
                    .and_then(attr_i32)
                    .and_then(|v| NodeClass::from_value(v as u32))
                    .ok_or_else(|| {
                        OpcUaError::server_fault(status_codes::BAD_NODE_ID_UNKNOWN, format!("{} has no node class", node_id))
                    })?
            }
        };

        let class_attributes = NodeDetail::attributes(node_class);
        let with_value = read_value && matches!(node_class, NodeClass::Variable | NodeClass::VariableType);

        let mut attributes = vec![AttributeId::BrowseName, AttributeId::DisplayName, AttributeId::Description];
        attributes.extend_from_slice(class_attributes);
        if with_value {
            attributes.push(AttributeId::Value);
        }

        let values = self.read(&operation, node_id, &attributes, diagnostics).await?;
        let detail = NodeDetail::from_values(node_class, values.get(3..).unwrap_or_default(), self.table, self.format);

        let mut snapshot = NodeSnapshot {
            node_class: Some(node_class),
            browse_name: values.first().and_then(attr_qualified_name).map(|n| self.browse_name(&n)),
            display_name: values.get(1).and_then(attr_text),
            description: values.get(2).and_then(attr_text),
            ..NodeSnapshot::bare(self.render(node_id))
        };

        if with_value {
            if let Some(value) = values.last().filter(|v| v.is_usable()) {
                let data_type = values.get(3).and_then(attr_node_id).map(|id| {
                    id.as_ns0()
                        .and_then(well_known::data_type_name)
                        .map(str::to_string)
                        .unwrap_or_else(|| self.render(&id))
                });
                match self.codec.decode(&value.value, data_type.as_deref(), self.table) {
                    Ok(decoded) => {
                        snapshot.value = Some(decoded);
                        snapshot.data_type_name = data_type;
                    }
                    Err(e) => diagnostics.record_error(format!("DecodeValue_{}", snapshot.node_id), &e),
                }
            }
        }
        snapshot.detail = Some(detail);
        Ok(snapshot)
    }

    async fn read(
        &self,
        operation: &str,
        node_id: &NodeId,
        attributes: &[AttributeId],
        diagnostics: &mut DiagnosticsCollector,
    ) -> OpcUaResult<Vec<DataValue>> {
        let items: Vec<ReadValueId> = attributes
            .iter()
            .map(|attribute| ReadValueId::new(node_id.clone(), *attribute))
            .collect();
        let result = self
            .ctx
            .run(
                operation,
                self.transport.read(self.ctx, &items, TimestampsToReturn::Neither),
            )
            .await;
        self.record(operation, result, diagnostics)
    }
}

pub(crate) fn is_interruption(error: &OpcUaError) -> bool {
    matches!(error, OpcUaError::Cancelled { .. } | OpcUaError::Timeout { .. })
}

// =============================================================================
// Attribute value helpers
// =============================================================================

fn attr_scalar(value: &DataValue) -> Option<&Scalar> {
    if !value.is_usable() {
        return None;
    }
    match &value.value {
        Variant::Scalar(scalar) => Some(scalar),
        _ => None,
    }
}

pub(crate) fn attr_bool(value: &DataValue) -> Option<bool> {
    match attr_scalar(value)? {
        Scalar::Boolean(v) => Some(*v),
        _ => None,
    }
}

pub(crate) fn attr_u8(value: &DataValue) -> Option<u8> {
    match attr_scalar(value)? {
        Scalar::Byte(v) => Some(*v),
        _ => None,
    }
}

pub(crate) fn attr_i32(value: &DataValue) -> Option<i32> {
    match attr_scalar(value)? {
        Scalar::Int32(v) => Some(*v),
        _ => None,
    }
}

pub(crate) fn attr_f64(value: &DataValue) -> Option<f64> {
    match attr_scalar(value)? {
        Scalar::Double(v) => Some(*v),
        Scalar::Float(v) => Some(f64::from(*v)),
        _ => None,
    }
}

pub(crate) fn attr_node_id(value: &DataValue) -> Option<NodeId> {
    match attr_scalar(value)? {
        Scalar::NodeId(id) => Some(id.clone()),
        _ => None,
    }
}

pub(crate) fn attr_text(value: &DataValue) -> Option<String> {
    match attr_scalar(value)? {
        Scalar::LocalizedText(LocalizedText { text, .. }) => Some(text.clone()),
        Scalar::String(text) => Some(text.clone()),
        _ => None,
    }
}

pub(crate) fn attr_qualified_name(value: &DataValue) -> Option<QualifiedName> {
    match attr_scalar(value)? {
        Scalar::QualifiedName(name) => Some(name.clone()),
        _ => None,
    }
}

pub(crate) fn attr_u32_list(value: &DataValue) -> Option<Vec<u32>> {
    if !value.is_usable() {
        return None;
    }
    match &value.value {
        Variant::Array { items, .. } => items
            .iter()
            .map(|item| match item {
                Scalar::UInt32(v) => Some(*v),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
