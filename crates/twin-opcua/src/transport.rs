// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The collaborator interface to an OPC UA client stack.
//!
//! The façade never opens connections or encodes wire messages itself. It
//! drives an [`OpcUaTransport`], which exposes the raw service primitives
//! (Browse, BrowseNext, Read, Write, Call) of an already established session.
//!
//! Every call carries a [`SessionContext`]: the session handle, a
//! cancellation token and an optional deadline.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::address::NamespaceTable;
use crate::error::{status_codes, OpcUaError, OpcUaResult};
use crate::types::{
    well_known, AttributeId, BrowseDirection, LocalizedText, NodeClass, NodeId, QualifiedName,
    TimestampsToReturn,
};
use crate::variant::Variant;

// =============================================================================
// CancelToken
// =============================================================================

/// Cooperative cancellation signal shared between a caller and an operation.
///
/// Clones observe the same signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Signals cancellation to every clone.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    /// Returns `true` once cancelled.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Waits until the token is cancelled.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // The sender lives as long as any clone, so wait_for only fails
        // if every handle is gone, which cannot happen while `self` exists.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SessionContext
// =============================================================================

/// Per-call session context.
#[derive(Debug, Clone)]
pub struct SessionContext {
    session_id: String,
    cancel: CancelToken,
    timeout: Option<Duration>,
}

impl SessionContext {
    /// Creates a context for the session `session_id`.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            cancel: CancelToken::new(),
            timeout: None,
        }
    }

    /// Sets the deadline for each collaborator call made with this context.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replaces the cancellation token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the session id.
    #[inline]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Returns the cancellation token.
    #[inline]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Returns the deadline.
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns `true` if the caller cancelled.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fails with `Cancelled` if the caller cancelled.
    pub fn check(&self, operation: &str) -> OpcUaResult<()> {
        if self.is_cancelled() {
            return Err(OpcUaError::cancelled(operation));
        }
        Ok(())
    }

    /// Runs `future` under this context's cancellation token and deadline.
    pub async fn run<F, T>(&self, operation: &str, future: F) -> OpcUaResult<T>
    where
        F: Future<Output = OpcUaResult<T>>,
    {
        self.check(operation)?;

        let guarded = async {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(OpcUaError::cancelled(operation)),
                result = future => result,
            }
        };

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, guarded)
                .await
                .map_err(|_| OpcUaError::timeout(operation, limit))?,
            None => guarded.await,
        }
    }
}

// =============================================================================
// Raw service types
// =============================================================================

/// Parameters of a single-node Browse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowseDescription {
    /// Node to browse.
    pub node_id: NodeId,
    /// Direction.
    pub direction: BrowseDirection,
    /// Reference type to follow.
    pub reference_type_id: NodeId,
    /// Follow subtypes of the reference type.
    pub include_subtypes: bool,
    /// Node class mask (0 = all).
    pub node_class_mask: u32,
}

impl BrowseDescription {
    /// Forward hierarchical browse of `node_id`.
    pub fn hierarchical(node_id: NodeId) -> Self {
        Self {
            node_id,
            direction: BrowseDirection::Forward,
            reference_type_id: well_known::HIERARCHICAL_REFERENCES,
            include_subtypes: true,
            node_class_mask: 0,
        }
    }
}

/// A reference as returned by Browse.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReference {
    /// Reference type.
    pub reference_type_id: NodeId,
    /// `true` for forward references.
    pub is_forward: bool,
    /// Target node.
    pub target: NodeId,
    /// Browse name of the target.
    pub browse_name: QualifiedName,
    /// Display name of the target.
    pub display_name: LocalizedText,
    /// Node class of the target.
    pub node_class: NodeClass,
    /// Type definition of the target, for objects and variables.
    pub type_definition: Option<NodeId>,
}

/// One page of Browse or BrowseNext results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BrowsePage {
    /// References in server order.
    pub references: Vec<RawReference>,
    /// Opaque server cursor; `None` when the server has no more results.
    pub continuation_point: Option<Vec<u8>>,
}

/// Attribute to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadValueId {
    /// Node.
    pub node_id: NodeId,
    /// Attribute.
    pub attribute_id: AttributeId,
    /// Optional index range of an array value.
    pub index_range: Option<String>,
}

impl ReadValueId {
    /// Reads `attribute_id` of `node_id`.
    pub fn new(node_id: NodeId, attribute_id: AttributeId) -> Self {
        Self {
            node_id,
            attribute_id,
            index_range: None,
        }
    }
}

/// Value with status and timestamps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataValue {
    /// Value.
    pub value: Variant,
    /// Status code.
    pub status_code: u32,
    /// Source timestamp.
    pub source_timestamp: Option<DateTime<Utc>>,
    /// Server timestamp.
    pub server_timestamp: Option<DateTime<Utc>>,
}

impl DataValue {
    /// Creates a good value without timestamps.
    pub fn good(value: Variant) -> Self {
        Self {
            value,
            ..Default::default()
        }
    }

    /// Creates a bad result.
    pub fn bad(status_code: u32) -> Self {
        Self {
            status_code,
            ..Default::default()
        }
    }

    /// Returns `true` unless the status is bad.
    #[inline]
    pub fn is_usable(&self) -> bool {
        !status_codes::is_bad(self.status_code)
    }
}

/// Attribute to write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteValue {
    /// Node.
    pub node_id: NodeId,
    /// Attribute.
    pub attribute_id: AttributeId,
    /// Optional index range of an array value.
    pub index_range: Option<String>,
    /// Value to write.
    pub value: DataValue,
}

/// Method invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// Object the method is called on.
    pub object_id: NodeId,
    /// Method.
    pub method_id: NodeId,
    /// Input arguments in declared order.
    pub input_arguments: Vec<Variant>,
}

/// Result of a method invocation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallOutcome {
    /// Status of the call.
    pub status_code: u32,
    /// Per-input status codes.
    pub input_argument_results: Vec<u32>,
    /// Output arguments in declared order.
    pub output_arguments: Vec<Variant>,
}

// =============================================================================
// OpcUaTransport
// =============================================================================

/// Raw service primitives of an established OPC UA session.
///
/// A per-node service failure (a bad operation status) is returned as
/// [`OpcUaError::Service`]; a failure of the channel or session is returned
/// as [`OpcUaError::Transport`].
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the façade calls them from
/// concurrent tasks.
#[async_trait]
pub trait OpcUaTransport: Send + Sync {
    /// Returns the server's namespace table.
    async fn namespace_table(&self, ctx: &SessionContext) -> OpcUaResult<NamespaceTable>;

    /// Browses one node, returning at most `max_references` references
    /// (0 = server default).
    async fn browse(
        &self,
        ctx: &SessionContext,
        description: &BrowseDescription,
        max_references: u32,
    ) -> OpcUaResult<BrowsePage>;

    /// Continues a browse; with `release` the cursor is freed and an empty
    /// page is returned.
    async fn browse_next(
        &self,
        ctx: &SessionContext,
        continuation_point: &[u8],
        release: bool,
    ) -> OpcUaResult<BrowsePage>;

    /// Reads attributes; one result per item, in order.
    async fn read(
        &self,
        ctx: &SessionContext,
        items: &[ReadValueId],
        timestamps: TimestampsToReturn,
    ) -> OpcUaResult<Vec<DataValue>>;

    /// Writes attributes; one status code per item, in order.
    async fn write(&self, ctx: &SessionContext, items: &[WriteValue]) -> OpcUaResult<Vec<u32>>;

    /// Calls a method.
    async fn call(&self, ctx: &SessionContext, call: &MethodCall) -> OpcUaResult<CallOutcome>;

    /// Returns the supertype of a data type, `None` at the root.
    ///
    /// The default implementation follows the inverse HasSubtype reference.
    async fn super_type(&self, ctx: &SessionContext, data_type_id: &NodeId) -> OpcUaResult<Option<NodeId>> {
        let description = BrowseDescription {
            node_id: data_type_id.clone(),
            direction: BrowseDirection::Inverse,
            reference_type_id: well_known::HAS_SUBTYPE,
            include_subtypes: false,
            node_class_mask: NodeClass::DataType.value(),
        };
        let page = self.browse(ctx, &description, 1).await?;
        if let Some(cp) = &page.continuation_point {
            self.browse_next(ctx, cp, true).await?;
        }
        Ok(page.references.into_iter().next().map(|r| r.target))
    }

    /// Reads a single attribute.
    async fn read_one(
        &self,
        ctx: &SessionContext,
        node_id: &NodeId,
        attribute_id: AttributeId,
    ) -> OpcUaResult<DataValue> {
        let items = [ReadValueId::new(node_id.clone(), attribute_id)];
        let mut values = self.read(ctx, &items, TimestampsToReturn::Neither).await?;
        values.pop().ok_or_else(|| {
            OpcUaError::server_fault(
                status_codes::BAD_UNEXPECTED_ERROR,
                "Read returned no results",
            )
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
