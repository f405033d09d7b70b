// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Protocol-level tagged values.
//!
//! A [`Variant`] carries a built-in type tag and either a scalar or a
//! homogeneous one-dimensional array of that tag. Structured values travel as
//! [`ExtensionObject`]s.
//!
//! [`DeclaredType`] describes what a node, argument or caller declares the
//! value to be: a concrete built-in type or one of the abstract types whose
//! wire tag is inferred from the value.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConversionError, OpcUaError};
use crate::types::{value_rank, well_known, LocalizedText, NodeId, QualifiedName};

// =============================================================================
// BuiltInType
// =============================================================================

/// OPC UA built-in types supported by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum BuiltInType {
    /// Boolean.
    Boolean = 1,
    /// Signed byte.
    SByte = 2,
    /// Unsigned byte.
    Byte = 3,
    /// 16-bit signed integer.
    Int16 = 4,
    /// 16-bit unsigned integer.
    UInt16 = 5,
    /// 32-bit signed integer.
    Int32 = 6,
    /// 32-bit unsigned integer.
    UInt32 = 7,
    /// 64-bit signed integer.
    Int64 = 8,
    /// 64-bit unsigned integer.
    UInt64 = 9,
    /// 32-bit float.
    Float = 10,
    /// 64-bit float.
    Double = 11,
    /// Text.
    String = 12,
    /// Timestamp.
    DateTime = 13,
    /// GUID.
    Guid = 14,
    /// Byte string.
    ByteString = 15,
    /// XML element.
    XmlElement = 16,
    /// Node id.
    NodeId = 17,
    /// Expanded node id.
    ExpandedNodeId = 18,
    /// Status code.
    StatusCode = 19,
    /// Qualified name.
    QualifiedName = 20,
    /// Localized text.
    LocalizedText = 21,
    /// Extension object.
    ExtensionObject = 22,
    /// Nested variant.
    Variant = 24,
}

impl BuiltInType {
    /// All supported built-in types in id order.
    pub const ALL: [BuiltInType; 23] = [
        Self::Boolean,
        Self::SByte,
        Self::Byte,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
        Self::Float,
        Self::Double,
        Self::String,
        Self::DateTime,
        Self::Guid,
        Self::ByteString,
        Self::XmlElement,
        Self::NodeId,
        Self::ExpandedNodeId,
        Self::StatusCode,
        Self::QualifiedName,
        Self::LocalizedText,
        Self::ExtensionObject,
        Self::Variant,
    ];

    /// Returns the built-in type id.
    pub const fn id(&self) -> u8 {
        *self as u8
    }

    /// Creates from the built-in type id.
    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() as u32 == id)
    }

    /// Returns the type name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::SByte => "SByte",
            Self::Byte => "Byte",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::String => "String",
            Self::DateTime => "DateTime",
            Self::Guid => "Guid",
            Self::ByteString => "ByteString",
            Self::XmlElement => "XmlElement",
            Self::NodeId => "NodeId",
            Self::ExpandedNodeId => "ExpandedNodeId",
            Self::StatusCode => "StatusCode",
            Self::QualifiedName => "QualifiedName",
            Self::LocalizedText => "LocalizedText",
            Self::ExtensionObject => "ExtensionObject",
            Self::Variant => "Variant",
        }
    }

    /// Returns `true` for integer types.
    pub const fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::SByte
                | Self::Byte
                | Self::Int16
                | Self::UInt16
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
        )
    }

    /// Returns `true` for signed integer types.
    pub const fn is_signed_integer(&self) -> bool {
        matches!(self, Self::SByte | Self::Int16 | Self::Int32 | Self::Int64)
    }

    /// Returns `true` for floating-point types.
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    /// Returns `true` for numeric types.
    pub const fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Returns `true` for types whose values decode to a plain string.
    pub const fn is_textual(&self) -> bool {
        matches!(self, Self::String | Self::XmlElement)
    }

    /// Returns `true` if a plain decoded leaf cannot tell this tag apart
    /// from another one, so it needs a `{Type, Body}` envelope.
    pub const fn needs_envelope(&self) -> bool {
        matches!(
            self,
            Self::XmlElement
                | Self::NodeId
                | Self::ExpandedNodeId
                | Self::StatusCode
                | Self::QualifiedName
                | Self::LocalizedText
        )
    }

    /// Returns the integer range of an integer type.
    pub fn integer_range(&self) -> Option<(i128, i128)> {
        Some(match self {
            Self::SByte => (i8::MIN as i128, i8::MAX as i128),
            Self::Byte => (0, u8::MAX as i128),
            Self::Int16 => (i16::MIN as i128, i16::MAX as i128),
            Self::UInt16 => (0, u16::MAX as i128),
            Self::Int32 => (i32::MIN as i128, i32::MAX as i128),
            Self::UInt32 => (0, u32::MAX as i128),
            Self::Int64 => (i64::MIN as i128, i64::MAX as i128),
            Self::UInt64 => (0, u64::MAX as i128),
            _ => return None,
        })
    }
}

impl fmt::Display for BuiltInType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BuiltInType {
    type Err = OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .or_else(|| {
                if s.eq_ignore_ascii_case("Structure") {
                    Some(Self::ExtensionObject)
                } else if s.eq_ignore_ascii_case("Bytes") {
                    Some(Self::ByteString)
                } else {
                    None
                }
            })
            .ok_or_else(|| ConversionError::unsupported_type(s).into())
    }
}

// =============================================================================
// ExpandedNodeId / ExtensionObject
// =============================================================================

/// A node id that may name its namespace and server by URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ExpandedNodeId {
    /// Node id; the index is ignored when `namespace_uri` is set.
    pub node_id: NodeId,
    /// Namespace URI.
    pub namespace_uri: Option<String>,
    /// Server URI.
    pub server_uri: Option<String>,
}

/// Encoding of an extension object body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum BodyEncoding {
    /// Binary encoded body.
    #[default]
    Binary,
    /// XML encoded body.
    Xml,
    /// JSON encoded body.
    Json,
}

impl BodyEncoding {
    /// Returns the encoding name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Binary => "Binary",
            Self::Xml => "Xml",
            Self::Json => "Json",
        }
    }

    /// Creates from the numeric encoding mask (1 = Binary, 2 = Xml, otherwise Json).
    pub fn from_value(value: i128) -> Self {
        match value {
            1 => Self::Binary,
            2 => Self::Xml,
            _ => Self::Json,
        }
    }
}

impl FromStr for BodyEncoding {
    type Err = OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binary" | "uabinary" => Ok(Self::Binary),
            "xml" | "uaxml" => Ok(Self::Xml),
            "json" | "uajson" => Ok(Self::Json),
            other => Err(ConversionError::invalid_format(
                "ExtensionObject",
                format!("unknown body encoding '{}'", other),
            )
            .into()),
        }
    }
}

/// Body of an extension object.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtensionBody {
    /// Already serialized binary body.
    Binary(Vec<u8>),
    /// Already serialized XML body.
    Xml(String),
    /// Structured JSON body with typed fields.
    Json(BTreeMap<String, Variant>),
}

impl ExtensionBody {
    /// Returns the body's encoding.
    pub fn encoding(&self) -> BodyEncoding {
        match self {
            Self::Binary(_) => BodyEncoding::Binary,
            Self::Xml(_) => BodyEncoding::Xml,
            Self::Json(_) => BodyEncoding::Json,
        }
    }
}

/// Typed, encoded structured value.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionObject {
    /// Data type or encoding id of the body.
    pub type_id: NodeId,
    /// Body.
    pub body: ExtensionBody,
}

impl ExtensionObject {
    /// Returns the null extension object.
    pub fn null() -> Self {
        Self {
            type_id: NodeId::null(),
            body: ExtensionBody::Binary(Vec::new()),
        }
    }
}

// =============================================================================
// Scalar / Variant
// =============================================================================

/// A single tagged value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Boolean.
    Boolean(bool),
    /// Signed byte.
    SByte(i8),
    /// Unsigned byte.
    Byte(u8),
    /// 16-bit signed integer.
    Int16(i16),
    /// 16-bit unsigned integer.
    UInt16(u16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 32-bit unsigned integer.
    UInt32(u32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit unsigned integer.
    UInt64(u64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// Text.
    String(String),
    /// Timestamp.
    DateTime(DateTime<Utc>),
    /// GUID.
    Guid(Uuid),
    /// Byte string.
    ByteString(Vec<u8>),
    /// XML element.
    XmlElement(String),
    /// Node id.
    NodeId(NodeId),
    /// Expanded node id.
    ExpandedNodeId(ExpandedNodeId),
    /// Status code.
    StatusCode(u32),
    /// Qualified name.
    QualifiedName(QualifiedName),
    /// Localized text.
    LocalizedText(LocalizedText),
    /// Extension object.
    ExtensionObject(ExtensionObject),
    /// Nested variant (array elements of abstract types).
    Variant(Box<Variant>),
}

impl Scalar {
    /// Returns the built-in type tag.
    pub fn built_in_type(&self) -> BuiltInType {
        match self {
            Self::Boolean(_) => BuiltInType::Boolean,
            Self::SByte(_) => BuiltInType::SByte,
            Self::Byte(_) => BuiltInType::Byte,
            Self::Int16(_) => BuiltInType::Int16,
            Self::UInt16(_) => BuiltInType::UInt16,
            Self::Int32(_) => BuiltInType::Int32,
            Self::UInt32(_) => BuiltInType::UInt32,
            Self::Int64(_) => BuiltInType::Int64,
            Self::UInt64(_) => BuiltInType::UInt64,
            Self::Float(_) => BuiltInType::Float,
            Self::Double(_) => BuiltInType::Double,
            Self::String(_) => BuiltInType::String,
            Self::DateTime(_) => BuiltInType::DateTime,
            Self::Guid(_) => BuiltInType::Guid,
            Self::ByteString(_) => BuiltInType::ByteString,
            Self::XmlElement(_) => BuiltInType::XmlElement,
            Self::NodeId(_) => BuiltInType::NodeId,
            Self::ExpandedNodeId(_) => BuiltInType::ExpandedNodeId,
            Self::StatusCode(_) => BuiltInType::StatusCode,
            Self::QualifiedName(_) => BuiltInType::QualifiedName,
            Self::LocalizedText(_) => BuiltInType::LocalizedText,
            Self::ExtensionObject(_) => BuiltInType::ExtensionObject,
            Self::Variant(_) => BuiltInType::Variant,
        }
    }
}

/// Tagged protocol value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Variant {
    /// No value.
    #[default]
    Empty,
    /// Single value.
    Scalar(Scalar),
    /// One-dimensional array; every item carries `element_type`.
    Array {
        /// Tag shared by all items.
        element_type: BuiltInType,
        /// Items.
        items: Vec<Scalar>,
    },
}

impl Variant {
    /// Creates an empty array of `element_type`.
    pub fn empty_array(element_type: BuiltInType) -> Self {
        Self::Array {
            element_type,
            items: Vec::new(),
        }
    }

    /// Returns the wire tag, `None` for `Empty`.
    pub fn built_in_type(&self) -> Option<BuiltInType> {
        match self {
            Self::Empty => None,
            Self::Scalar(scalar) => Some(scalar.built_in_type()),
            Self::Array { element_type, .. } => Some(*element_type),
        }
    }

    /// Returns `true` for arrays.
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array { .. })
    }

    /// Returns `true` for `Empty`.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<Scalar> for Variant {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

/// A variant together with the type name it was encoded for.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedVariant {
    /// Encoded value.
    pub variant: Variant,
    /// Declared type name, abstract names included.
    pub type_name: String,
}

// =============================================================================
// DeclaredType
// =============================================================================

/// Abstract data types whose wire tag is inferred from the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbstractType {
    /// Any numeric type.
    Number,
    /// Any signed integer type.
    Integer,
    /// Any unsigned integer type.
    UInteger,
    /// Any type.
    BaseDataType,
    /// Enumerations, carried as Int32.
    Enumeration,
}

impl AbstractType {
    /// Returns the standard data type id.
    pub const fn data_type_id(&self) -> u32 {
        match self {
            Self::BaseDataType => 24,
            Self::Number => 26,
            Self::Integer => 27,
            Self::UInteger => 28,
            Self::Enumeration => 29,
        }
    }

    /// Returns the type name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Number => "Number",
            Self::Integer => "Integer",
            Self::UInteger => "UInteger",
            Self::BaseDataType => "BaseDataType",
            Self::Enumeration => "Enumeration",
        }
    }

    /// Returns `true` if `tag` belongs to this family.
    pub fn admits(&self, tag: BuiltInType) -> bool {
        match self {
            Self::Number => tag.is_numeric(),
            Self::Integer => tag.is_signed_integer(),
            Self::UInteger => tag.is_integer() && !tag.is_signed_integer(),
            Self::BaseDataType => true,
            Self::Enumeration => tag == BuiltInType::Int32,
        }
    }

    /// Returns `true` if `other` is this type or a subtype of it.
    pub fn admits_abstract(&self, other: AbstractType) -> bool {
        match self {
            Self::BaseDataType => true,
            Self::Number => matches!(other, Self::Number | Self::Integer | Self::UInteger),
            _ => *self == other,
        }
    }

    /// Creates from a standard data type id.
    pub fn from_data_type_id(id: u32) -> Option<Self> {
        Some(match id {
            24 => Self::BaseDataType,
            26 => Self::Number,
            27 => Self::Integer,
            28 => Self::UInteger,
            29 => Self::Enumeration,
            _ => return None,
        })
    }
}

/// How a declared type maps to wire tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Fixed wire tag.
    Concrete(BuiltInType),
    /// Tag inferred from the value.
    Abstract(AbstractType),
}

impl TypeKind {
    /// Resolves a standard data type id (1-29).
    pub fn from_data_type_id(id: u32) -> Option<Self> {
        if let Some(abstract_type) = AbstractType::from_data_type_id(id) {
            return Some(Self::Abstract(abstract_type));
        }
        BuiltInType::from_id(id).map(Self::Concrete)
    }

    /// Resolves a standard data type name.
    pub fn from_name(name: &str) -> Option<Self> {
        well_known::data_type_id(name).and_then(Self::from_data_type_id)
    }
}

/// The declared type of a value: name, wire mapping and value rank.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclaredType {
    /// Declared type name reported back to callers.
    pub name: String,
    /// Wire mapping.
    pub kind: TypeKind,
    /// Declared value rank.
    pub value_rank: i32,
}

impl DeclaredType {
    /// Creates a scalar declared type of a built-in kind.
    pub fn scalar(built_in: BuiltInType) -> Self {
        Self {
            name: built_in.name().to_string(),
            kind: TypeKind::Concrete(built_in),
            value_rank: value_rank::SCALAR,
        }
    }

    /// Creates a one-dimensional array declared type of a built-in kind.
    pub fn array(built_in: BuiltInType) -> Self {
        Self::scalar(built_in).with_value_rank(value_rank::ONE_DIMENSION)
    }

    /// Creates a declared abstract type.
    pub fn abstract_type(abstract_type: AbstractType, value_rank: i32) -> Self {
        Self {
            name: abstract_type.name().to_string(),
            kind: TypeKind::Abstract(abstract_type),
            value_rank,
        }
    }

    /// Resolves a standard data type name.
    ///
    /// The name is reported back as the caller spelled it (`Variant`,
    /// `Structure`); only the wire mapping is normalised.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::UnsupportedType`] for names that are not
    /// standard built-in or abstract data types.
    pub fn from_name(name: &str, value_rank: i32) -> Result<Self, OpcUaError> {
        let name = name.trim();
        let kind = TypeKind::from_name(name)
            .ok_or_else(|| ConversionError::unsupported_type(name))?;
        Ok(Self {
            name: name.to_string(),
            kind,
            value_rank,
        })
    }

    /// Replaces the value rank.
    pub fn with_value_rank(mut self, value_rank: i32) -> Self {
        self.value_rank = value_rank;
        self
    }

    /// Replaces the reported name, keeping the wire mapping.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Returns `true` if values must be arrays.
    pub fn requires_array(&self) -> bool {
        self.value_rank >= value_rank::ONE_OR_MORE_DIMENSIONS
    }

    /// Returns `true` if values must be scalars.
    pub fn requires_scalar(&self) -> bool {
        self.value_rank == value_rank::SCALAR
    }
}

// =============================================================================
// Tests
// =============================================================================
