// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory address space shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use twin_opcua::error::{status_codes, OpcUaError, OpcUaResult, ServiceError, TransportError};
use twin_opcua::types::{access_level, value_rank, well_known};
use twin_opcua::{
    ArgumentDescriptor, AttributeId, BrowseDescription, BrowseDirection, BrowsePage, BuiltInType,
    CallOutcome, DataValue, FacadeConfig, LocalizedText, MethodCall, NamespaceTable, NodeClass,
    NodeId, NodeServices, OpcUaTransport, QualifiedName, RawReference, ReadValueId, Scalar,
    SessionContext, TimestampsToReturn, Variant, WriteValue,
};

/// Namespace of the test nodes.
pub const TEST_NAMESPACE: &str = "urn:twin:test";

/// Session id used by every test.
pub const SESSION: &str = "test-session";

// =============================================================================
// Address space
// =============================================================================

/// A node of the mock address space.
#[derive(Debug, Clone)]
pub struct MockNode {
    pub class: NodeClass,
    pub browse_name: QualifiedName,
    pub display_name: LocalizedText,
    pub description: Option<LocalizedText>,
    pub type_definition: Option<NodeId>,
    pub attributes: HashMap<AttributeId, Variant>,
}

impl MockNode {
    pub fn new(class: NodeClass, namespace_index: u16, name: &str) -> Self {
        Self {
            class,
            browse_name: QualifiedName::new(namespace_index, name),
            display_name: LocalizedText::new(name),
            description: None,
            type_definition: None,
            attributes: HashMap::new(),
        }
    }

    pub fn with(mut self, attribute: AttributeId, value: Variant) -> Self {
        self.attributes.insert(attribute, value);
        self
    }

    pub fn described(mut self, text: &str) -> Self {
        self.description = Some(LocalizedText::new(text));
        self
    }
}

/// A forward reference; inverse references are derived.
#[derive(Debug, Clone)]
struct MockReference {
    source: NodeId,
    reference_type_id: NodeId,
    target: NodeId,
}

struct Cursor {
    remaining: Vec<RawReference>,
    page_size: usize,
}

/// Mock OPC UA transport over an in-memory address space.
pub struct MockTransport {
    nodes: RwLock<HashMap<NodeId, MockNode>>,
    references: RwLock<Vec<MockReference>>,
    cursors: RwLock<HashMap<Vec<u8>, Cursor>>,
    next_cursor: AtomicU32,
    method_outputs: RwLock<HashMap<NodeId, Vec<Variant>>>,
    calls: RwLock<Vec<MethodCall>>,
    writes: RwLock<Vec<WriteValue>>,
    failing_browse: RwLock<Vec<NodeId>>,
    failing_read: RwLock<Vec<NodeId>>,
    result_limit: RwLock<Option<usize>>,
    offline: AtomicBool,
    pub browse_calls: AtomicU32,
    pub browse_next_calls: AtomicU32,
    pub released_cursors: AtomicU32,
    pub read_calls: AtomicU32,
}

impl MockTransport {
    /// Creates an empty address space.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(HashMap::new()),
            references: RwLock::new(Vec::new()),
            cursors: RwLock::new(HashMap::new()),
            next_cursor: AtomicU32::new(1),
            method_outputs: RwLock::new(HashMap::new()),
            calls: RwLock::new(Vec::new()),
            writes: RwLock::new(Vec::new()),
            failing_browse: RwLock::new(Vec::new()),
            failing_read: RwLock::new(Vec::new()),
            result_limit: RwLock::new(None),
            offline: AtomicBool::new(false),
            browse_calls: AtomicU32::new(0),
            browse_next_calls: AtomicU32::new(0),
            released_cursors: AtomicU32::new(0),
            read_calls: AtomicU32::new(0),
        }
    }

    pub fn add_node(&self, node_id: NodeId, node: MockNode) {
        self.nodes.write().unwrap().insert(node_id, node);
    }

    pub fn add_reference(&self, source: &NodeId, reference_type_id: NodeId, target: &NodeId) {
        self.references.write().unwrap().push(MockReference {
            source: source.clone(),
            reference_type_id,
            target: target.clone(),
        });
    }

    /// Adds a node below `parent` through `reference_type_id`.
    pub fn add_child(&self, parent: &NodeId, reference_type_id: NodeId, node_id: NodeId, node: MockNode) {
        self.add_node(node_id.clone(), node);
        self.add_reference(parent, reference_type_id, &node_id);
    }

    pub fn set_method_outputs(&self, method_id: &NodeId, outputs: Vec<Variant>) {
        self.method_outputs.write().unwrap().insert(method_id.clone(), outputs);
    }

    /// Makes every Browse starting at `node_id` fail.
    pub fn fail_browse_of(&self, node_id: &NodeId) {
        self.failing_browse.write().unwrap().push(node_id.clone());
    }

    /// Makes every Read of `node_id` answer BadNodeIdUnknown.
    pub fn fail_read_of(&self, node_id: &NodeId) {
        self.failing_read.write().unwrap().push(node_id.clone());
    }

    /// Answers at most `limit` items of every Read and Write.
    pub fn limit_results(&self, limit: usize) {
        *self.result_limit.write().unwrap() = Some(limit);
    }

    /// Makes every service fail as if the channel were closed.
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn attribute(&self, node_id: &NodeId, attribute: AttributeId) -> Option<Variant> {
        self.nodes
            .read()
            .unwrap()
            .get(node_id)
            .and_then(|node| node.attributes.get(&attribute).cloned())
    }

    pub fn calls(&self) -> Vec<MethodCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<WriteValue> {
        self.writes.read().unwrap().clone()
    }

    pub fn open_cursors(&self) -> usize {
        self.cursors.read().unwrap().len()
    }

    fn check_online(&self) -> OpcUaResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::communication("secure channel closed").into());
        }
        Ok(())
    }

    fn raw_reference(&self, reference_type_id: &NodeId, is_forward: bool, target: &NodeId) -> Option<RawReference> {
        let nodes = self.nodes.read().unwrap();
        let node = nodes.get(target)?;
        Some(RawReference {
            reference_type_id: reference_type_id.clone(),
            is_forward,
            target: target.clone(),
            browse_name: node.browse_name.clone(),
            display_name: node.display_name.clone(),
            node_class: node.class,
            type_definition: node.type_definition.clone(),
        })
    }

    fn matching_references(&self, description: &BrowseDescription) -> Vec<RawReference> {
        let references = self.references.read().unwrap().clone();
        let type_matches = |candidate: &NodeId| {
            candidate == &description.reference_type_id
                || (description.include_subtypes && is_subtype(candidate, &description.reference_type_id))
        };

        let mut out = Vec::new();
        if matches!(description.direction, BrowseDirection::Forward | BrowseDirection::Both) {
            out.extend(
                references
                    .iter()
                    .filter(|r| r.source == description.node_id && type_matches(&r.reference_type_id))
                    .filter_map(|r| self.raw_reference(&r.reference_type_id, true, &r.target)),
            );
        }
        if matches!(description.direction, BrowseDirection::Inverse | BrowseDirection::Both) {
            out.extend(
                references
                    .iter()
                    .filter(|r| r.target == description.node_id && type_matches(&r.reference_type_id))
                    .filter_map(|r| self.raw_reference(&r.reference_type_id, false, &r.source)),
            );
        }
        if description.node_class_mask != 0 {
            out.retain(|r| description.node_class_mask & r.node_class.value() != 0);
        }
        out
    }

    fn page(&self, mut references: Vec<RawReference>, page_size: usize) -> BrowsePage {
        if page_size == 0 || references.len() <= page_size {
            return BrowsePage {
                references,
                continuation_point: None,
            };
        }
        let remaining = references.split_off(page_size);
        let key = self.next_cursor.fetch_add(1, Ordering::SeqCst).to_le_bytes().to_vec();
        self.cursors
            .write()
            .unwrap()
            .insert(key.clone(), Cursor { remaining, page_size });
        BrowsePage {
            references,
            continuation_point: Some(key),
        }
    }

    fn read_attribute(&self, item: &ReadValueId) -> DataValue {
        if self.failing_read.read().unwrap().contains(&item.node_id) {
            return DataValue::bad(status_codes::BAD_NODE_ID_UNKNOWN);
        }
        let nodes = self.nodes.read().unwrap();
        let Some(node) = nodes.get(&item.node_id) else {
            return DataValue::bad(status_codes::BAD_NODE_ID_UNKNOWN);
        };
        let value = match item.attribute_id {
            AttributeId::NodeId => Some(Variant::Scalar(Scalar::NodeId(item.node_id.clone()))),
            AttributeId::NodeClass => Some(Variant::Scalar(Scalar::Int32(node.class.value() as i32))),
            AttributeId::BrowseName => Some(Variant::Scalar(Scalar::QualifiedName(node.browse_name.clone()))),
            AttributeId::DisplayName => Some(Variant::Scalar(Scalar::LocalizedText(node.display_name.clone()))),
            AttributeId::Description => node
                .description
                .clone()
                .map(|text| Variant::Scalar(Scalar::LocalizedText(text))),
            other => node.attributes.get(&other).cloned(),
        };
        match value {
            Some(value) => DataValue::good(value),
            None => DataValue::bad(status_codes::BAD_ATTRIBUTE_ID_INVALID),
        }
    }

    fn write_attribute(&self, item: &WriteValue) -> u32 {
        let mut nodes = self.nodes.write().unwrap();
        let Some(node) = nodes.get_mut(&item.node_id) else {
            return status_codes::BAD_NODE_ID_UNKNOWN;
        };
        if item.attribute_id == AttributeId::Value {
            let writable = match node.attributes.get(&AttributeId::AccessLevel) {
                Some(Variant::Scalar(Scalar::Byte(level))) => level & access_level::CURRENT_WRITE != 0,
                _ => true,
            };
            if !writable {
                return status_codes::BAD_NOT_WRITABLE;
            }
            let declared = match node.attributes.get(&AttributeId::DataType) {
                Some(Variant::Scalar(Scalar::NodeId(id))) => id.as_ns0().and_then(BuiltInType::from_id),
                _ => None,
            };
            if let (Some(declared), Some(actual)) = (declared, item.value.value.built_in_type()) {
                if declared != actual {
                    return status_codes::BAD_TYPE_MISMATCH;
                }
            }
        }
        match item.attribute_id {
            AttributeId::DisplayName => match &item.value.value {
                Variant::Scalar(Scalar::LocalizedText(text)) => node.display_name = text.clone(),
                _ => return status_codes::BAD_TYPE_MISMATCH,
            },
            AttributeId::Description => match &item.value.value {
                Variant::Scalar(Scalar::LocalizedText(text)) => node.description = Some(text.clone()),
                _ => return status_codes::BAD_TYPE_MISMATCH,
            },
            AttributeId::NodeId | AttributeId::NodeClass | AttributeId::BrowseName => {
                return status_codes::BAD_NOT_WRITABLE;
            }
            other => {
                node.attributes.insert(other, item.value.value.clone());
            }
        }
        status_codes::GOOD
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OpcUaTransport for MockTransport {
    async fn namespace_table(&self, _ctx: &SessionContext) -> OpcUaResult<NamespaceTable> {
        self.check_online()?;
        Ok(NamespaceTable::from_uris(["http://opcfoundation.org/UA/", TEST_NAMESPACE]))
    }

    async fn browse(
        &self,
        _ctx: &SessionContext,
        description: &BrowseDescription,
        max_references: u32,
    ) -> OpcUaResult<BrowsePage> {
        self.check_online()?;
        self.browse_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_browse.read().unwrap().contains(&description.node_id) {
            return Err(ServiceError::fault(status_codes::BAD_USER_ACCESS_DENIED, "browse denied").into());
        }
        if !self.nodes.read().unwrap().contains_key(&description.node_id) {
            return Err(ServiceError::fault(status_codes::BAD_NODE_ID_UNKNOWN, "unknown node").into());
        }
        let references = self.matching_references(description);
        Ok(self.page(references, max_references as usize))
    }

    async fn browse_next(
        &self,
        _ctx: &SessionContext,
        continuation_point: &[u8],
        release: bool,
    ) -> OpcUaResult<BrowsePage> {
        self.check_online()?;
        self.browse_next_calls.fetch_add(1, Ordering::SeqCst);
        let cursor = self.cursors.write().unwrap().remove(continuation_point);
        let Some(cursor) = cursor else {
            return Err(ServiceError::fault(
                status_codes::BAD_CONTINUATION_POINT_INVALID,
                "continuation point is unknown",
            )
            .into());
        };
        if release {
            self.released_cursors.fetch_add(1, Ordering::SeqCst);
            return Ok(BrowsePage::default());
        }
        Ok(self.page(cursor.remaining, cursor.page_size))
    }

    async fn read(
        &self,
        _ctx: &SessionContext,
        items: &[ReadValueId],
        timestamps: TimestampsToReturn,
    ) -> OpcUaResult<Vec<DataValue>> {
        self.check_online()?;
        self.read_calls.fetch_add(1, Ordering::SeqCst);
        let stamp = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).single();
        let limit = self.result_limit.read().unwrap().unwrap_or(items.len());
        Ok(items
            .iter()
            .take(limit)
            .map(|item| {
                let mut value = self.read_attribute(item);
                if value.is_usable() && item.attribute_id == AttributeId::Value {
                    if matches!(timestamps, TimestampsToReturn::Source | TimestampsToReturn::Both) {
                        value.source_timestamp = stamp;
                    }
                    if matches!(timestamps, TimestampsToReturn::Server | TimestampsToReturn::Both) {
                        value.server_timestamp = stamp;
                    }
                }
                value
            })
            .collect())
    }

    async fn write(&self, _ctx: &SessionContext, items: &[WriteValue]) -> OpcUaResult<Vec<u32>> {
        self.check_online()?;
        self.writes.write().unwrap().extend(items.iter().cloned());
        let limit = self.result_limit.read().unwrap().unwrap_or(items.len());
        Ok(items.iter().take(limit).map(|item| self.write_attribute(item)).collect())
    }

    async fn call(&self, _ctx: &SessionContext, call: &MethodCall) -> OpcUaResult<CallOutcome> {
        self.check_online()?;
        self.calls.write().unwrap().push(call.clone());
        let outputs = self.method_outputs.read().unwrap().get(&call.method_id).cloned();
        Ok(match outputs {
            Some(output_arguments) => CallOutcome {
                status_code: status_codes::GOOD,
                input_argument_results: vec![status_codes::GOOD; call.input_arguments.len()],
                output_arguments,
            },
            None => CallOutcome {
                status_code: status_codes::BAD_METHOD_INVALID,
                ..Default::default()
            },
        })
    }
}

/// Parent of each standard reference type used by the fixture.
fn super_reference_type(id: u32) -> Option<u32> {
    match id {
        32 | 33 => Some(31),
        34 | 35 => Some(33),
        44 | 45 => Some(34),
        46 | 47 => Some(44),
        40 => Some(32),
        _ => None,
    }
}

fn is_subtype(candidate: &NodeId, base: &NodeId) -> bool {
    let (Some(mut current), Some(base)) = (candidate.as_ns0(), base.as_ns0()) else {
        return false;
    };
    while let Some(parent) = super_reference_type(current) {
        if parent == base {
            return true;
        }
        current = parent;
    }
    false
}

// =============================================================================
// Standard fixture
// =============================================================================

/// Node ids of the standard fixture.
pub mod ids {
    use twin_opcua::NodeId;

    pub fn boiler() -> NodeId {
        NodeId::string(1, "Boiler")
    }
    pub fn temperature() -> NodeId {
        NodeId::string(1, "Boiler.Temperature")
    }
    pub fn flags() -> NodeId {
        NodeId::string(1, "Boiler.Flags")
    }
    pub fn setpoint() -> NodeId {
        NodeId::string(1, "Boiler.Setpoint")
    }
    pub fn counter() -> NodeId {
        NodeId::string(1, "Boiler.Counter")
    }
    pub fn mode() -> NodeId {
        NodeId::string(1, "Boiler.Mode")
    }
    pub fn locked() -> NodeId {
        NodeId::string(1, "Boiler.Locked")
    }
    pub fn reset() -> NodeId {
        NodeId::string(1, "Boiler.Reset")
    }
    pub fn reset_inputs() -> NodeId {
        NodeId::string(1, "Boiler.Reset.InputArguments")
    }
    pub fn reset_outputs() -> NodeId {
        NodeId::string(1, "Boiler.Reset.OutputArguments")
    }
    pub fn sensors() -> NodeId {
        NodeId::string(1, "Sensors")
    }
    pub fn sensor(index: usize) -> NodeId {
        NodeId::string(1, format!("Sensors.S{}", index))
    }
    pub fn mode_type() -> NodeId {
        NodeId::numeric(1, 3000)
    }
    pub fn base_object_type() -> NodeId {
        NodeId::ns0(58)
    }
    pub fn folder_type() -> NodeId {
        NodeId::ns0(61)
    }
}

/// Number of sensors below the `Sensors` folder.
pub const SENSOR_COUNT: usize = 5;

fn variable(name: &str, data_type: u32, rank: i32, value: Variant) -> MockNode {
    MockNode::new(NodeClass::Variable, 1, name)
        .with(AttributeId::DataType, Variant::Scalar(Scalar::NodeId(NodeId::ns0(data_type))))
        .with(AttributeId::ValueRank, Variant::Scalar(Scalar::Int32(rank)))
        .with(
            AttributeId::AccessLevel,
            Variant::Scalar(Scalar::Byte(access_level::CURRENT_READ | access_level::CURRENT_WRITE)),
        )
        .with(AttributeId::Value, value)
}

fn folder(name: &str, namespace_index: u16) -> MockNode {
    let mut node = MockNode::new(NodeClass::Object, namespace_index, name)
        .with(AttributeId::EventNotifier, Variant::Scalar(Scalar::Byte(0)));
    node.type_definition = Some(ids::folder_type());
    node
}

fn argument_list(arguments: &[ArgumentDescriptor]) -> Variant {
    Variant::Array {
        element_type: BuiltInType::ExtensionObject,
        items: arguments
            .iter()
            .map(|a| Scalar::ExtensionObject(a.to_extension_object()))
            .collect(),
    }
}

impl MockTransport {
    /// Root with the standard folders, a `Boiler` object and a `Sensors`
    /// folder holding [`SENSOR_COUNT`] variables.
    pub fn standard() -> Self {
        let mock = Self::new();
        let root = well_known::ROOT_FOLDER;
        let objects = well_known::OBJECTS_FOLDER;
        let types = well_known::TYPES_FOLDER;
        let views = well_known::VIEWS_FOLDER;

        mock.add_node(root.clone(), folder("Root", 0));
        mock.add_child(&root, well_known::ORGANIZES, objects.clone(), folder("Objects", 0));
        mock.add_child(&root, well_known::ORGANIZES, types.clone(), folder("Types", 0));
        mock.add_child(&root, well_known::ORGANIZES, views.clone(), folder("Views", 0));

        // Types
        let data_types = NodeId::ns0(90);
        mock.add_child(&types, well_known::ORGANIZES, data_types.clone(), folder("DataTypes", 0));
        for (id, name) in [(1, "Boolean"), (7, "UInt32"), (11, "Double"), (12, "String"), (29, "Enumeration")] {
            mock.add_child(
                &data_types,
                well_known::ORGANIZES,
                NodeId::ns0(id),
                MockNode::new(NodeClass::DataType, 0, name)
                    .with(AttributeId::IsAbstract, Variant::Scalar(Scalar::Boolean(id == 29))),
            );
        }
        mock.add_child(
            &NodeId::ns0(29),
            well_known::HAS_SUBTYPE,
            ids::mode_type(),
            MockNode::new(NodeClass::DataType, 1, "BoilerMode")
                .with(AttributeId::IsAbstract, Variant::Scalar(Scalar::Boolean(false))),
        );
        mock.add_node(
            ids::folder_type(),
            MockNode::new(NodeClass::ObjectType, 0, "FolderType")
                .with(AttributeId::IsAbstract, Variant::Scalar(Scalar::Boolean(false))),
        );

        // Boiler
        let boiler = ids::boiler();
        let mut boiler_node = MockNode::new(NodeClass::Object, 1, "Boiler")
            .described("Main boiler")
            .with(AttributeId::EventNotifier, Variant::Scalar(Scalar::Byte(1)));
        boiler_node.type_definition = Some(ids::base_object_type());
        mock.add_child(&objects, well_known::ORGANIZES, boiler.clone(), boiler_node);

        mock.add_child(
            &boiler,
            well_known::HAS_COMPONENT,
            ids::temperature(),
            variable("Temperature", 11, value_rank::SCALAR, Variant::Scalar(Scalar::Double(21.5))),
        );
        mock.add_child(
            &boiler,
            well_known::HAS_COMPONENT,
            ids::flags(),
            variable("Flags", 1, value_rank::ONE_DIMENSION, Variant::empty_array(BuiltInType::Boolean)),
        );
        mock.add_child(
            &boiler,
            well_known::HAS_COMPONENT,
            ids::setpoint(),
            variable("Setpoint", 26, value_rank::SCALAR, Variant::Scalar(Scalar::Double(1.0))),
        );
        mock.add_child(
            &boiler,
            well_known::HAS_COMPONENT,
            ids::counter(),
            variable("Counter", 27, value_rank::SCALAR, Variant::Scalar(Scalar::Int64(0))),
        );

        let mut mode = variable("Mode", 0, value_rank::SCALAR, Variant::Scalar(Scalar::Int32(1)));
        mode.attributes.insert(
            AttributeId::DataType,
            Variant::Scalar(Scalar::NodeId(ids::mode_type())),
        );
        mock.add_child(&boiler, well_known::HAS_COMPONENT, ids::mode(), mode);

        let locked = variable("Locked", 12, value_rank::SCALAR, Variant::Scalar(Scalar::String("sealed".into())))
            .with(AttributeId::AccessLevel, Variant::Scalar(Scalar::Byte(access_level::CURRENT_READ)));
        mock.add_child(&boiler, well_known::HAS_COMPONENT, ids::locked(), locked);

        // Reset(Gain: Double, Count: UInt32 = 3, Label: String) -> (Result: Double)
        let reset = ids::reset();
        mock.add_child(
            &boiler,
            well_known::HAS_COMPONENT,
            reset.clone(),
            MockNode::new(NodeClass::Method, 1, "Reset")
                .with(AttributeId::Executable, Variant::Scalar(Scalar::Boolean(true)))
                .with(AttributeId::UserExecutable, Variant::Scalar(Scalar::Boolean(true))),
        );
        let inputs = [
            ArgumentDescriptor::new("Gain", NodeId::ns0(11), value_rank::SCALAR).with_description("Loop gain"),
            ArgumentDescriptor::new("Count", NodeId::ns0(7), value_rank::SCALAR)
                .with_default(Variant::Scalar(Scalar::UInt32(3))),
            ArgumentDescriptor::new("Label", NodeId::ns0(12), value_rank::SCALAR),
        ];
        let outputs = [ArgumentDescriptor::new("Result", NodeId::ns0(11), value_rank::SCALAR)];
        mock.add_child(
            &reset,
            well_known::HAS_PROPERTY,
            ids::reset_inputs(),
            MockNode::new(NodeClass::Variable, 0, well_known::INPUT_ARGUMENTS)
                .with(AttributeId::Value, argument_list(&inputs)),
        );
        mock.add_child(
            &reset,
            well_known::HAS_PROPERTY,
            ids::reset_outputs(),
            MockNode::new(NodeClass::Variable, 0, well_known::OUTPUT_ARGUMENTS)
                .with(AttributeId::Value, argument_list(&outputs)),
        );
        mock.set_method_outputs(&reset, vec![Variant::Scalar(Scalar::Double(0.5))]);

        // Sensors
        let sensors = ids::sensors();
        mock.add_child(&objects, well_known::ORGANIZES, sensors.clone(), folder("Sensors", 1));
        for index in 0..SENSOR_COUNT {
            mock.add_child(
                &sensors,
                well_known::ORGANIZES,
                ids::sensor(index),
                variable(
                    &format!("S{}", index),
                    11,
                    value_rank::SCALAR,
                    Variant::Scalar(Scalar::Double(index as f64)),
                ),
            );
        }

        mock
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Façade over the standard fixture.
pub fn services() -> (Arc<MockTransport>, NodeServices<MockTransport>) {
    let mock = Arc::new(MockTransport::standard());
    let services = NodeServices::new(Arc::clone(&mock), FacadeConfig::default());
    (mock, services)
}

pub fn ctx() -> SessionContext {
    SessionContext::new(SESSION)
}

/// Address of a fixture node as the façade renders it.
pub fn address(node_id: &NodeId) -> String {
    let table = NamespaceTable::from_uris(["http://opcfoundation.org/UA/", TEST_NAMESPACE]);
    twin_opcua::render_node_id(node_id, &table, twin_opcua::AddressFormat::Expanded)
}

pub fn assert_fault(error: &OpcUaError, status_code: u32) {
    assert_eq!(error.status_code(), status_code, "unexpected error: {}", error);
}
