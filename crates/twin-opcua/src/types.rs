// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Native OPC UA protocol types.
//!
//! These are the session-local shapes exchanged with the client stack:
//!
//! - **NodeId**: namespace index plus one of the four identifier kinds
//! - **NodeClass / BrowseDirection / AttributeId**: protocol enumerations
//! - **QualifiedName / LocalizedText**: browse and display names
//! - **well_known**: standard ns=0 node ids used by the façade
//!
//! Portable, namespace-stable addresses live in [`crate::address`].
//!
//! # Examples
//!
//! ```
//! use twin_opcua::types::NodeId;
//!
//! let node_id: NodeId = "ns=2;s=Boiler.Temperature".parse().unwrap();
//! assert_eq!(node_id.namespace_index, 2);
//! assert_eq!(node_id.to_opc_string(), "ns=2;s=Boiler.Temperature");
//! ```

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AddressError, OpcUaError};

// =============================================================================
// NodeId
// =============================================================================

/// OPC UA Node Identifier.
///
/// A NodeId identifies a node within one session: the namespace index is
/// only meaningful against that session's namespace table.
///
/// # Examples
///
/// ```
/// use twin_opcua::types::NodeId;
///
/// let numeric = NodeId::numeric(2, 1001);
/// let string = NodeId::string(2, "MyDevice.Temperature");
/// let parsed: NodeId = "ns=2;s=MyDevice.Temperature".parse().unwrap();
/// assert_eq!(parsed, string);
/// assert_ne!(parsed, numeric);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index (0 = OPC UA standard namespace).
    pub namespace_index: u16,

    /// The node identifier.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates a numeric node ID.
    #[inline]
    pub const fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a numeric node ID in the standard namespace.
    #[inline]
    pub const fn ns0(value: u32) -> Self {
        Self::numeric(0, value)
    }

    /// Creates a string node ID.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node ID.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Creates an opaque (byte string) node ID.
    #[inline]
    pub fn opaque(namespace_index: u16, value: Vec<u8>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Opaque(value),
        }
    }

    /// Returns the null node ID (ns=0, i=0).
    #[inline]
    pub const fn null() -> Self {
        Self::numeric(0, 0)
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Returns `true` if this is a null node ID (ns=0, i=0).
    #[inline]
    pub fn is_null(&self) -> bool {
        self.namespace_index == 0 && matches!(self.identifier, NodeIdentifier::Numeric(0))
    }

    /// Returns `true` if this is in the standard namespace (ns=0).
    #[inline]
    pub const fn is_standard(&self) -> bool {
        self.namespace_index == 0
    }

    /// Returns the numeric value if this is a numeric identifier.
    #[inline]
    pub fn as_numeric(&self) -> Option<u32> {
        match &self.identifier {
            NodeIdentifier::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the ns=0 numeric value, if this is a standard numeric node.
    #[inline]
    pub fn as_ns0(&self) -> Option<u32> {
        if self.namespace_index == 0 {
            self.as_numeric()
        } else {
            None
        }
    }

    /// Returns the string value if this is a string identifier.
    #[inline]
    pub fn as_string(&self) -> Option<&str> {
        match &self.identifier {
            NodeIdentifier::String(v) => Some(v),
            _ => None,
        }
    }

    /// Converts to the OPC UA string format.
    ///
    /// Format: `ns=<namespace>;{i|s|g|b}=<identifier>`, with the namespace
    /// part omitted for ns=0.
    pub fn to_opc_string(&self) -> String {
        if self.namespace_index == 0 {
            self.identifier.to_string()
        } else {
            format!("ns={};{}", self.namespace_index, self.identifier)
        }
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_opc_string())
    }
}

impl FromStr for NodeId {
    type Err = OpcUaError;

    /// Parses a NodeId from OPC UA string format.
    ///
    /// Supported formats:
    /// - `ns=2;i=1001` (numeric)
    /// - `ns=2;s=MyNode` (string)
    /// - `ns=2;g=550e8400-e29b-41d4-a716-446655440000` (GUID)
    /// - `ns=2;b=SGVsbG8=` (opaque, base64 encoded)
    /// - `i=1001` (numeric, namespace 0)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (namespace_index, identifier_part) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let (ns_str, id) = rest.split_once(';').ok_or_else(|| {
                    AddressError::invalid(s, "Missing identifier after namespace")
                })?;
                let ns: u16 = ns_str
                    .parse()
                    .map_err(|_| AddressError::invalid(s, "Invalid namespace index"))?;
                (ns, id)
            }
            None => (0, s),
        };

        let identifier = NodeIdentifier::parse(identifier_part)
            .map_err(|reason| AddressError::invalid(s, reason))?;

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}

// =============================================================================
// NodeIdentifier
// =============================================================================

/// OPC UA node identifier kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum NodeIdentifier {
    /// Numeric identifier (most efficient, commonly used for standard nodes).
    Numeric(u32),

    /// String identifier (human-readable, used for custom nodes).
    String(String),

    /// GUID identifier (globally unique).
    Guid(Uuid),

    /// Opaque identifier (application-specific byte array).
    Opaque(Vec<u8>),
}

impl NodeIdentifier {
    /// Returns the identifier type prefix for OPC UA string format.
    pub const fn type_prefix(&self) -> char {
        match self {
            Self::Numeric(_) => 'i',
            Self::String(_) => 's',
            Self::Guid(_) => 'g',
            Self::Opaque(_) => 'b',
        }
    }

    /// Parses `<kind>=<value>` text.
    ///
    /// The error is a human readable reason, attached to the full address by
    /// the caller.
    pub fn parse(text: &str) -> Result<Self, String> {
        let (kind, value) = text
            .split_once('=')
            .ok_or_else(|| "Expected <kind>=<value> identifier".to_string())?;

        match kind {
            "i" => value
                .parse::<u32>()
                .map(Self::Numeric)
                .map_err(|_| format!("Invalid numeric identifier '{}'", value)),
            "s" => Ok(Self::String(value.to_string())),
            "g" => Uuid::parse_str(value)
                .map(Self::Guid)
                .map_err(|e| format!("Invalid GUID: {}", e)),
            "b" => BASE64
                .decode(value)
                .map(Self::Opaque)
                .map_err(|e| format!("Invalid base64: {}", e)),
            other => Err(format!(
                "Unknown identifier type '{}'. Expected i=, s=, g=, or b=",
                other
            )),
        }
    }
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "i={}", v),
            Self::String(v) => write!(f, "s={}", v),
            Self::Guid(v) => write!(f, "g={}", v),
            Self::Opaque(v) => write!(f, "b={}", BASE64.encode(v)),
        }
    }
}

// =============================================================================
// Well-known nodes
// =============================================================================

/// Standard ns=0 node ids the façade relies on.
pub mod well_known {
    use super::NodeId;

    /// Root folder.
    pub const ROOT_FOLDER: NodeId = NodeId::ns0(84);
    /// Objects folder.
    pub const OBJECTS_FOLDER: NodeId = NodeId::ns0(85);
    /// Types folder.
    pub const TYPES_FOLDER: NodeId = NodeId::ns0(86);
    /// Views folder.
    pub const VIEWS_FOLDER: NodeId = NodeId::ns0(87);
    /// Server object.
    pub const SERVER: NodeId = NodeId::ns0(2253);

    /// References (root of all reference types).
    pub const REFERENCES: NodeId = NodeId::ns0(31);
    /// NonHierarchicalReferences.
    pub const NON_HIERARCHICAL_REFERENCES: NodeId = NodeId::ns0(32);
    /// HierarchicalReferences.
    pub const HIERARCHICAL_REFERENCES: NodeId = NodeId::ns0(33);
    /// HasChild.
    pub const HAS_CHILD: NodeId = NodeId::ns0(34);
    /// Organizes.
    pub const ORGANIZES: NodeId = NodeId::ns0(35);
    /// HasTypeDefinition.
    pub const HAS_TYPE_DEFINITION: NodeId = NodeId::ns0(40);
    /// Aggregates.
    pub const AGGREGATES: NodeId = NodeId::ns0(44);
    /// HasSubtype.
    pub const HAS_SUBTYPE: NodeId = NodeId::ns0(45);
    /// HasProperty.
    pub const HAS_PROPERTY: NodeId = NodeId::ns0(46);
    /// HasComponent.
    pub const HAS_COMPONENT: NodeId = NodeId::ns0(47);

    /// Argument structure data type.
    pub const ARGUMENT: NodeId = NodeId::ns0(296);
    /// Default binary encoding of Argument.
    pub const ARGUMENT_ENCODING_BINARY: NodeId = NodeId::ns0(298);

    /// Browse name of the input arguments property of a method.
    pub const INPUT_ARGUMENTS: &str = "InputArguments";
    /// Browse name of the output arguments property of a method.
    pub const OUTPUT_ARGUMENTS: &str = "OutputArguments";

    /// Returns the browse name of a standard reference type.
    pub fn reference_type_name(id: u32) -> Option<&'static str> {
        Some(match id {
            31 => "References",
            32 => "NonHierarchicalReferences",
            33 => "HierarchicalReferences",
            34 => "HasChild",
            35 => "Organizes",
            36 => "HasEventSource",
            37 => "HasModellingRule",
            38 => "HasEncoding",
            39 => "HasDescription",
            40 => "HasTypeDefinition",
            41 => "GeneratesEvent",
            44 => "Aggregates",
            45 => "HasSubtype",
            46 => "HasProperty",
            47 => "HasComponent",
            48 => "HasNotifier",
            49 => "HasOrderedComponent",
            _ => return None,
        })
    }

    /// Returns the id of a standard reference type by browse name.
    pub fn reference_type_id(name: &str) -> Option<u32> {
        (31..=49).find(|id| reference_type_name(*id) == Some(name))
    }

    /// Returns the name of a built-in or abstract standard data type.
    pub fn data_type_name(id: u32) -> Option<&'static str> {
        Some(match id {
            1 => "Boolean",
            2 => "SByte",
            3 => "Byte",
            4 => "Int16",
            5 => "UInt16",
            6 => "Int32",
            7 => "UInt32",
            8 => "Int64",
            9 => "UInt64",
            10 => "Float",
            11 => "Double",
            12 => "String",
            13 => "DateTime",
            14 => "Guid",
            15 => "ByteString",
            16 => "XmlElement",
            17 => "NodeId",
            18 => "ExpandedNodeId",
            19 => "StatusCode",
            20 => "QualifiedName",
            21 => "LocalizedText",
            22 => "Structure",
            23 => "DataValue",
            24 => "BaseDataType",
            25 => "DiagnosticInfo",
            26 => "Number",
            27 => "Integer",
            28 => "UInteger",
            29 => "Enumeration",
            _ => return None,
        })
    }

    /// Returns the id of a standard data type by name (case-insensitive).
    ///
    /// Built-in type aliases `ExtensionObject` and `Variant` are accepted.
    pub fn data_type_id(name: &str) -> Option<u32> {
        if name.eq_ignore_ascii_case("ExtensionObject") {
            return Some(22);
        }
        if name.eq_ignore_ascii_case("Variant") {
            return Some(24);
        }
        (1..=29).find(|id| data_type_name(*id).is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }
}

// =============================================================================
// QualifiedName / LocalizedText
// =============================================================================

/// A browse name: namespace index plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Namespace index.
    pub namespace_index: u16,
    /// Name.
    pub name: String,
}

impl QualifiedName {
    /// Creates a new qualified name.
    pub fn new(namespace_index: u16, name: impl Into<String>) -> Self {
        Self {
            namespace_index,
            name: name.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_index == 0 {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}:{}", self.namespace_index, self.name)
        }
    }
}

/// Human readable text with an optional locale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct LocalizedText {
    /// Locale identifier, e.g. `en-US`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// Text.
    pub text: String,
}

impl LocalizedText {
    /// Creates localized text without a locale.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            locale: None,
            text: text.into(),
        }
    }
}

impl fmt::Display for LocalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// =============================================================================
// BrowseDirection
// =============================================================================

/// OPC UA browse direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrowseDirection {
    /// Browse forward references.
    #[default]
    Forward,

    /// Browse inverse references.
    Inverse,

    /// Browse both forward and inverse references.
    Both,
}

impl BrowseDirection {
    /// Returns the OPC UA value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::Forward => 0,
            Self::Inverse => 1,
            Self::Both => 2,
        }
    }

    /// Returns the direction as a string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Inverse => "inverse",
            Self::Both => "both",
        }
    }
}

impl fmt::Display for BrowseDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// NodeClass
// =============================================================================

/// OPC UA node class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeClass {
    /// Object node.
    Object,
    /// Variable node.
    Variable,
    /// Method node.
    Method,
    /// Object type node.
    ObjectType,
    /// Variable type node.
    VariableType,
    /// Reference type node.
    ReferenceType,
    /// Data type node.
    DataType,
    /// View node.
    View,
}

impl NodeClass {
    /// All node classes in bit order.
    pub const ALL: [NodeClass; 8] = [
        Self::Object,
        Self::Variable,
        Self::Method,
        Self::ObjectType,
        Self::VariableType,
        Self::ReferenceType,
        Self::DataType,
        Self::View,
    ];

    /// Returns the OPC UA bit mask value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::Object => 1,
            Self::Variable => 2,
            Self::Method => 4,
            Self::ObjectType => 8,
            Self::VariableType => 16,
            Self::ReferenceType => 32,
            Self::DataType => 64,
            Self::View => 128,
        }
    }

    /// Creates from OPC UA value.
    pub fn from_value(value: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|class| class.value() == value)
    }

    /// Returns the combined mask of a set of classes; an empty set is 0 (all).
    pub fn mask(classes: &[NodeClass]) -> u32 {
        classes.iter().fold(0, |mask, class| mask | class.value())
    }

    /// Returns the class name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Object => "Object",
            Self::Variable => "Variable",
            Self::Method => "Method",
            Self::ObjectType => "ObjectType",
            Self::VariableType => "VariableType",
            Self::ReferenceType => "ReferenceType",
            Self::DataType => "DataType",
            Self::View => "View",
        }
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeClass {
    type Err = OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|class| class.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                OpcUaError::invalid_address(s, "Unknown node class")
            })
    }
}

// =============================================================================
// AttributeId
// =============================================================================

/// OPC UA attribute IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AttributeId {
    /// Node ID attribute.
    NodeId,
    /// Node class attribute.
    NodeClass,
    /// Browse name attribute.
    BrowseName,
    /// Display name attribute.
    DisplayName,
    /// Description attribute.
    Description,
    /// Write mask attribute.
    WriteMask,
    /// User write mask attribute.
    UserWriteMask,
    /// Is abstract attribute.
    IsAbstract,
    /// Symmetric attribute.
    Symmetric,
    /// Inverse name attribute.
    InverseName,
    /// Contains no loops attribute.
    ContainsNoLoops,
    /// Event notifier attribute.
    EventNotifier,
    /// Value attribute.
    #[default]
    Value,
    /// Data type attribute.
    DataType,
    /// Value rank attribute.
    ValueRank,
    /// Array dimensions attribute.
    ArrayDimensions,
    /// Access level attribute.
    AccessLevel,
    /// User access level attribute.
    UserAccessLevel,
    /// Minimum sampling interval attribute.
    MinimumSamplingInterval,
    /// Historizing attribute.
    Historizing,
    /// Executable attribute.
    Executable,
    /// User executable attribute.
    UserExecutable,
}

impl AttributeId {
    /// All attributes in id order.
    pub const ALL: [AttributeId; 22] = [
        Self::NodeId,
        Self::NodeClass,
        Self::BrowseName,
        Self::DisplayName,
        Self::Description,
        Self::WriteMask,
        Self::UserWriteMask,
        Self::IsAbstract,
        Self::Symmetric,
        Self::InverseName,
        Self::ContainsNoLoops,
        Self::EventNotifier,
        Self::Value,
        Self::DataType,
        Self::ValueRank,
        Self::ArrayDimensions,
        Self::AccessLevel,
        Self::UserAccessLevel,
        Self::MinimumSamplingInterval,
        Self::Historizing,
        Self::Executable,
        Self::UserExecutable,
    ];

    /// Returns the OPC UA numeric value.
    pub const fn value(&self) -> u32 {
        *self as u32 + 1
    }

    /// Creates from the OPC UA numeric value.
    pub fn from_value(value: u32) -> Option<Self> {
        value
            .checked_sub(1)
            .and_then(|index| Self::ALL.get(index as usize).copied())
    }

    /// Returns the attribute name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NodeId => "NodeId",
            Self::NodeClass => "NodeClass",
            Self::BrowseName => "BrowseName",
            Self::DisplayName => "DisplayName",
            Self::Description => "Description",
            Self::WriteMask => "WriteMask",
            Self::UserWriteMask => "UserWriteMask",
            Self::IsAbstract => "IsAbstract",
            Self::Symmetric => "Symmetric",
            Self::InverseName => "InverseName",
            Self::ContainsNoLoops => "ContainsNoLoops",
            Self::EventNotifier => "EventNotifier",
            Self::Value => "Value",
            Self::DataType => "DataType",
            Self::ValueRank => "ValueRank",
            Self::ArrayDimensions => "ArrayDimensions",
            Self::AccessLevel => "AccessLevel",
            Self::UserAccessLevel => "UserAccessLevel",
            Self::MinimumSamplingInterval => "MinimumSamplingInterval",
            Self::Historizing => "Historizing",
            Self::Executable => "Executable",
            Self::UserExecutable => "UserExecutable",
        }
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttributeId {
    type Err = OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(value) = s.parse::<u32>() {
            if let Some(attribute) = Self::from_value(value) {
                return Ok(attribute);
            }
        }
        Self::ALL
            .into_iter()
            .find(|attribute| attribute.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| OpcUaError::invalid_address(s, "Unknown attribute"))
    }
}

// =============================================================================
// Value rank / access level
// =============================================================================

/// Value rank constants.
pub mod value_rank {
    /// Scalar or one dimensional array.
    pub const SCALAR_OR_ONE_DIMENSION: i32 = -3;
    /// Any shape.
    pub const ANY: i32 = -2;
    /// Scalar.
    pub const SCALAR: i32 = -1;
    /// Array with one or more dimensions.
    pub const ONE_OR_MORE_DIMENSIONS: i32 = 0;
    /// One dimensional array.
    pub const ONE_DIMENSION: i32 = 1;
}

/// Access level mask bits.
pub mod access_level {
    /// Current value readable.
    pub const CURRENT_READ: u8 = 0x01;
    /// Current value writable.
    pub const CURRENT_WRITE: u8 = 0x02;
    /// History readable.
    pub const HISTORY_READ: u8 = 0x04;
}

/// Which timestamps a read returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimestampsToReturn {
    /// Source timestamp only.
    Source,
    /// Server timestamp only.
    Server,
    /// Both timestamps.
    #[default]
    Both,
    /// No timestamps.
    Neither,
}

// =============================================================================
// humantime_serde helper
// =============================================================================

pub(crate) mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        humantime::format_duration(*duration)
            .to_string()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // NodeId Tests
    // =========================================================================

    #[test]
    fn test_node_id_numeric() {
        let node = NodeId::numeric(2, 1001);
        assert_eq!(node.namespace_index, 2);
        assert_eq!(node.as_numeric(), Some(1001));
        assert_eq!(node.to_opc_string(), "ns=2;i=1001");
    }

    #[test]
    fn test_node_id_string() {
        let node = NodeId::string(2, "Temperature.Value");
        assert_eq!(node.as_string(), Some("Temperature.Value"));
        assert_eq!(node.to_opc_string(), "ns=2;s=Temperature.Value");
    }

    #[test]
    fn test_node_id_guid() {
        let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let node = NodeId::guid(2, uuid);
        assert_eq!(node.to_opc_string(), "ns=2;g=550e8400-e29b-41d4-a716-446655440000");
    }

    #[test]
    fn test_node_id_opaque() {
        let node = NodeId::opaque(2, vec![1, 2, 3, 4]);
        assert_eq!(node.to_opc_string(), "ns=2;b=AQIDBA==");
        let parsed: NodeId = "ns=2;b=AQIDBA==".parse().unwrap();
        assert_eq!(parsed, node);
    }

    #[test]
    fn test_node_id_parse() {
        let node: NodeId = "ns=2;i=1001".parse().unwrap();
        assert_eq!(node.namespace_index, 2);
        assert_eq!(node.as_numeric(), Some(1001));

        let node: NodeId = "ns=2;s=My;Node".parse().unwrap();
        assert_eq!(node.as_string(), Some("My;Node"));

        let node: NodeId = "i=85".parse().unwrap();
        assert_eq!(node, well_known::OBJECTS_FOLDER);
    }

    #[test]
    fn test_node_id_parse_errors() {
        assert!("ns=x;i=1".parse::<NodeId>().is_err());
        assert!("ns=2".parse::<NodeId>().is_err());
        assert!("i=abc".parse::<NodeId>().is_err());
        assert!("q=1".parse::<NodeId>().is_err());
        assert!("g=not-a-guid".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_node_id_standard_nodes() {
        assert_eq!(well_known::ROOT_FOLDER.as_ns0(), Some(84));
        assert_eq!(NodeId::numeric(1, 84).as_ns0(), None);
        assert!(NodeId::null().is_null());
    }

    #[test]
    fn test_reference_type_names() {
        assert_eq!(well_known::reference_type_name(47), Some("HasComponent"));
        assert_eq!(well_known::reference_type_id("Organizes"), Some(35));
        assert_eq!(well_known::reference_type_id("NoSuchReference"), None);
    }

    #[test]
    fn test_data_type_names() {
        assert_eq!(well_known::data_type_name(11), Some("Double"));
        assert_eq!(well_known::data_type_name(0), None);
        assert_eq!(well_known::data_type_id("double"), Some(11));
        assert_eq!(well_known::data_type_id("Variant"), Some(24));
        assert_eq!(well_known::data_type_id("Objects"), None);
    }

    // =========================================================================
    // Enum Tests
    // =========================================================================

    #[test]
    fn test_node_class() {
        assert_eq!(NodeClass::Variable.value(), 2);
        assert_eq!(NodeClass::from_value(128), Some(NodeClass::View));
        assert_eq!(NodeClass::from_value(3), None);
        assert_eq!(NodeClass::mask(&[NodeClass::Object, NodeClass::Variable]), 3);
        assert_eq!(NodeClass::mask(&[]), 0);
        assert_eq!("variabletype".parse::<NodeClass>().unwrap(), NodeClass::VariableType);
    }

    #[test]
    fn test_attribute_id() {
        assert_eq!(AttributeId::NodeId.value(), 1);
        assert_eq!(AttributeId::Value.value(), 13);
        assert_eq!(AttributeId::UserExecutable.value(), 22);
        assert_eq!(AttributeId::from_value(14), Some(AttributeId::DataType));
        assert_eq!(AttributeId::from_value(0), None);
        assert_eq!(AttributeId::from_value(23), None);
        assert_eq!("displayname".parse::<AttributeId>().unwrap(), AttributeId::DisplayName);
        assert_eq!("13".parse::<AttributeId>().unwrap(), AttributeId::Value);
    }

    #[test]
    fn test_qualified_name_display() {
        assert_eq!(QualifiedName::new(0, "Objects").to_string(), "Objects");
        assert_eq!(QualifiedName::new(2, "Boiler").to_string(), "2:Boiler");
    }
}
