// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Method argument descriptors.
//!
//! The `InputArguments` and `OutputArguments` properties of a method hold
//! arrays of `Argument` extension objects. A body arrives either already
//! structured (JSON body with named fields) or as the standard binary
//! encoding:
//!
//! ```text
//! Argument
//! ├── Name            String          i32 length + UTF-8, -1 = null
//! ├── DataType        NodeId          encoding byte + namespace + identifier
//! ├── ValueRank       Int32
//! ├── ArrayDimensions UInt32[]        i32 count, -1 = null
//! └── Description     LocalizedText   mask (0x01 locale, 0x02 text) + strings
//! ```
//!
//! All binary fields are little endian. A structured body may carry an
//! extra `Value` field holding the argument's default value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConversionError, OpcUaResult};
use crate::types::{well_known, LocalizedText, NodeId, NodeIdentifier};
use crate::value::DynamicValue;
use crate::variant::{BuiltInType, ExtensionBody, ExtensionObject, Scalar, Variant};

const NAME: &str = "Name";
const DATA_TYPE: &str = "DataType";
const VALUE_RANK: &str = "ValueRank";
const ARRAY_DIMENSIONS: &str = "ArrayDimensions";
const DESCRIPTION: &str = "Description";
const VALUE: &str = "Value";

// =============================================================================
// ArgumentDescriptor
// =============================================================================

/// Declaration of one method argument as stored on the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDescriptor {
    /// Argument name.
    pub name: String,
    /// Data type node.
    pub data_type: NodeId,
    /// Value rank.
    pub value_rank: i32,
    /// Array dimensions.
    pub array_dimensions: Option<Vec<u32>>,
    /// Description.
    pub description: Option<LocalizedText>,
    /// Default value.
    pub default_value: Option<Variant>,
}

impl ArgumentDescriptor {
    /// Creates a scalar argument without description or default.
    pub fn new(name: impl Into<String>, data_type: NodeId, value_rank: i32) -> Self {
        Self {
            name: name.into(),
            data_type,
            value_rank,
            array_dimensions: None,
            description: None,
            default_value: None,
        }
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: Variant) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(LocalizedText::new(text));
        self
    }

    /// Decodes an `Argument` extension object.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError`] if the body is XML, truncated, or lacks a
    /// data type.
    pub fn from_extension_object(object: &ExtensionObject) -> OpcUaResult<Self> {
        match &object.body {
            ExtensionBody::Json(fields) => Self::from_fields(fields),
            ExtensionBody::Binary(bytes) => Self::from_binary(bytes),
            ExtensionBody::Xml(_) => {
                Err(ConversionError::unsupported_type("Argument with XML body").into())
            }
        }
    }

    /// Decodes every argument of an `InputArguments`/`OutputArguments` value.
    pub fn list_from_variant(value: &Variant) -> OpcUaResult<Vec<Self>> {
        let items: Vec<&Scalar> = match value {
            Variant::Empty => Vec::new(),
            Variant::Scalar(scalar) => vec![scalar],
            Variant::Array { items, .. } => items.iter().collect(),
        };

        items
            .into_iter()
            .map(|item| match item {
                Scalar::ExtensionObject(object) => Self::from_extension_object(object),
                other => Err(ConversionError::type_mismatch(
                    "Argument",
                    other.built_in_type().name(),
                )
                .into()),
            })
            .collect()
    }

    /// Encodes the argument with a structured body.
    pub fn to_extension_object(&self) -> ExtensionObject {
        let mut fields = BTreeMap::new();
        fields.insert(NAME.to_string(), Scalar::String(self.name.clone()).into());
        fields.insert(DATA_TYPE.to_string(), Scalar::NodeId(self.data_type.clone()).into());
        fields.insert(VALUE_RANK.to_string(), Scalar::Int32(self.value_rank).into());
        if let Some(dimensions) = &self.array_dimensions {
            fields.insert(
                ARRAY_DIMENSIONS.to_string(),
                Variant::Array {
                    element_type: BuiltInType::UInt32,
                    items: dimensions.iter().map(|d| Scalar::UInt32(*d)).collect(),
                },
            );
        }
        if let Some(description) = &self.description {
            fields.insert(DESCRIPTION.to_string(), Scalar::LocalizedText(description.clone()).into());
        }
        if let Some(value) = &self.default_value {
            fields.insert(VALUE.to_string(), value.clone());
        }
        ExtensionObject {
            type_id: well_known::ARGUMENT,
            body: ExtensionBody::Json(fields),
        }
    }

    /// Encodes the argument with the standard binary body.
    pub fn to_binary_extension_object(&self) -> ExtensionObject {
        let mut writer = BinaryWriter::default();
        writer.string(Some(&self.name));
        writer.node_id(&self.data_type);
        writer.i32(self.value_rank);
        match &self.array_dimensions {
            Some(dimensions) => {
                writer.i32(dimensions.len() as i32);
                dimensions.iter().for_each(|d| writer.u32(*d));
            }
            None => writer.i32(-1),
        }
        writer.localized_text(self.description.as_ref());
        ExtensionObject {
            type_id: well_known::ARGUMENT_ENCODING_BINARY,
            body: ExtensionBody::Binary(writer.finish()),
        }
    }

    fn from_fields(fields: &BTreeMap<String, Variant>) -> OpcUaResult<Self> {
        let scalar = |key: &str| match fields.get(key) {
            Some(Variant::Scalar(scalar)) => Some(scalar),
            _ => None,
        };

        let data_type = match scalar(DATA_TYPE) {
            Some(Scalar::NodeId(id)) => id.clone(),
            Some(Scalar::ExpandedNodeId(id)) => id.node_id.clone(),
            _ => {
                return Err(ConversionError::invalid_format("Argument", "missing DataType field").into())
            }
        };

        let name = match scalar(NAME) {
            Some(Scalar::String(name)) => name.clone(),
            Some(Scalar::QualifiedName(name)) => name.name.clone(),
            _ => String::new(),
        };

        let value_rank = match scalar(VALUE_RANK) {
            Some(Scalar::Int32(rank)) => *rank,
            _ => crate::types::value_rank::SCALAR,
        };

        let array_dimensions = match fields.get(ARRAY_DIMENSIONS) {
            Some(Variant::Array { items, .. }) => Some(
                items
                    .iter()
                    .filter_map(|item| match item {
                        Scalar::UInt32(d) => Some(*d),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        };

        let description = match scalar(DESCRIPTION) {
            Some(Scalar::LocalizedText(text)) => Some(text.clone()),
            Some(Scalar::String(text)) => Some(LocalizedText::new(text.clone())),
            _ => None,
        };

        let default_value = fields.get(VALUE).filter(|v| !v.is_empty()).cloned();

        Ok(Self {
            name,
            data_type,
            value_rank,
            array_dimensions,
            description,
            default_value,
        })
    }

    fn from_binary(bytes: &[u8]) -> OpcUaResult<Self> {
        let mut reader = BinaryReader::new(bytes);
        let name = reader.string()?.unwrap_or_default();
        let data_type = reader.node_id()?;
        let value_rank = reader.i32()?;
        let array_dimensions = match reader.i32()? {
            count if count < 0 => None,
            count => Some((0..count).map(|_| reader.u32()).collect::<OpcUaResult<Vec<_>>>()?),
        };
        let description = reader.localized_text()?;

        Ok(Self {
            name,
            data_type,
            value_rank,
            array_dimensions,
            description,
            default_value: None,
        })
    }
}

// =============================================================================
// MethodArgument
// =============================================================================

/// Argument metadata returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MethodArgument {
    /// Argument name.
    pub name: String,
    /// Data type address.
    pub data_type: String,
    /// Display name of the data type node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type_name: Option<String>,
    /// Value rank; absent for scalars.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_rank: Option<i32>,
    /// Array dimensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_dimensions: Option<Vec<u32>>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DynamicValue>,
}

// =============================================================================
// Binary body
// =============================================================================

struct BinaryReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> BinaryReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    fn take(&mut self, count: usize) -> OpcUaResult<&'a [u8]> {
        let end = self.position.saturating_add(count);
        let slice = self.bytes.get(self.position..end).ok_or_else(|| {
            ConversionError::invalid_format(
                "Argument",
                format!("body truncated at byte {} (needed {})", self.position, count),
            )
        })?;
        self.position = end;
        Ok(slice)
    }

    fn u8(&mut self) -> OpcUaResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> OpcUaResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> OpcUaResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn i32(&mut self) -> OpcUaResult<i32> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn byte_string(&mut self) -> OpcUaResult<Option<Vec<u8>>> {
        match self.i32()? {
            length if length < 0 => Ok(None),
            length => Ok(Some(self.take(length as usize)?.to_vec())),
        }
    }

    fn string(&mut self) -> OpcUaResult<Option<String>> {
        match self.byte_string()? {
            None => Ok(None),
            Some(bytes) => String::from_utf8(bytes).map(Some).map_err(|e| {
                ConversionError::invalid_format("String", format!("invalid UTF-8: {}", e)).into()
            }),
        }
    }

    fn node_id(&mut self) -> OpcUaResult<NodeId> {
        match self.u8()? & 0x0F {
            0x00 => Ok(NodeId::ns0(u32::from(self.u8()?))),
            0x01 => {
                let namespace = u16::from(self.u8()?);
                Ok(NodeId::numeric(namespace, u32::from(self.u16()?)))
            }
            0x02 => {
                let namespace = self.u16()?;
                Ok(NodeId::numeric(namespace, self.u32()?))
            }
            0x03 => {
                let namespace = self.u16()?;
                Ok(NodeId::string(namespace, self.string()?.unwrap_or_default()))
            }
            0x04 => {
                let namespace = self.u16()?;
                let d1 = self.u32()?;
                let d2 = self.u16()?;
                let d3 = self.u16()?;
                let mut d4 = [0u8; 8];
                d4.copy_from_slice(self.take(8)?);
                Ok(NodeId::guid(namespace, Uuid::from_fields(d1, d2, d3, &d4)))
            }
            0x05 => {
                let namespace = self.u16()?;
                Ok(NodeId::opaque(namespace, self.byte_string()?.unwrap_or_default()))
            }
            other => Err(ConversionError::invalid_format(
                "NodeId",
                format!("unknown encoding byte 0x{:02X}", other),
            )
            .into()),
        }
    }

    fn localized_text(&mut self) -> OpcUaResult<Option<LocalizedText>> {
        if self.position >= self.bytes.len() {
            return Ok(None);
        }
        let mask = self.u8()?;
        let locale = if mask & 0x01 != 0 { self.string()? } else { None };
        let text = if mask & 0x02 != 0 { self.string()? } else { None };
        Ok(match (locale, text) {
            (None, None) => None,
            (locale, text) => Some(LocalizedText {
                locale,
                text: text.unwrap_or_default(),
            }),
        })
    }
}

#[derive(Default)]
struct BinaryWriter {
    bytes: Vec<u8>,
}

impl BinaryWriter {
    fn finish(self) -> Vec<u8> {
        self.bytes
    }

    fn u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    fn u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn i32(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    fn byte_string(&mut self, value: Option<&[u8]>) {
        match value {
            Some(bytes) => {
                self.i32(bytes.len() as i32);
                self.bytes.extend_from_slice(bytes);
            }
            None => self.i32(-1),
        }
    }

    fn string(&mut self, value: Option<&str>) {
        self.byte_string(value.map(str::as_bytes));
    }

    fn node_id(&mut self, node_id: &NodeId) {
        let namespace = node_id.namespace_index;
        match &node_id.identifier {
            NodeIdentifier::Numeric(id) if namespace == 0 && *id <= 0xFF => {
                self.u8(0x00);
                self.u8(*id as u8);
            }
            NodeIdentifier::Numeric(id) if namespace <= 0xFF && *id <= 0xFFFF => {
                self.u8(0x01);
                self.u8(namespace as u8);
                self.u16(*id as u16);
            }
            NodeIdentifier::Numeric(id) => {
                self.u8(0x02);
                self.u16(namespace);
                self.u32(*id);
            }
            NodeIdentifier::String(text) => {
                self.u8(0x03);
                self.u16(namespace);
                self.string(Some(text));
            }
            NodeIdentifier::Guid(guid) => {
                self.u8(0x04);
                self.u16(namespace);
                let (d1, d2, d3, d4) = guid.as_fields();
                self.u32(d1);
                self.u16(d2);
                self.u16(d3);
                self.bytes.extend_from_slice(d4);
            }
            NodeIdentifier::Opaque(bytes) => {
                self.u8(0x05);
                self.u16(namespace);
                self.byte_string(Some(bytes));
            }
        }
    }

    fn localized_text(&mut self, text: Option<&LocalizedText>) {
        let Some(text) = text else {
            self.u8(0);
            return;
        };
        let mask = if text.locale.is_some() { 0x03 } else { 0x02 };
        self.u8(mask);
        if let Some(locale) = &text.locale {
            self.string(Some(locale));
        }
        self.string(Some(&text.text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OpcUaError;

    fn double_array() -> ArgumentDescriptor {
        ArgumentDescriptor {
            array_dimensions: Some(vec![0]),
            ..ArgumentDescriptor::new("Samples", NodeId::ns0(11), 1)
        }
        .with_description("Measured samples")
    }

    #[test]
    fn test_structured_body() {
        let argument = ArgumentDescriptor::new("Setpoint", NodeId::ns0(6), -1)
            .with_default(Scalar::Int32(42).into());
        let decoded = ArgumentDescriptor::from_extension_object(&argument.to_extension_object()).unwrap();
        assert_eq!(decoded, argument);
    }

    #[test]
    fn test_binary_body() {
        let argument = double_array();
        let object = argument.to_binary_extension_object();
        assert_eq!(object.type_id, well_known::ARGUMENT_ENCODING_BINARY);
        assert_eq!(ArgumentDescriptor::from_extension_object(&object).unwrap(), argument);
    }

    #[test]
    fn test_binary_node_id_forms() {
        let guid = Uuid::parse_str("72962b91-fa75-4ae6-8d28-b404dc7daf63").unwrap();
        for data_type in [
            NodeId::numeric(3, 70_000),
            NodeId::string(2, "Custom"),
            NodeId::guid(4, guid),
            NodeId::opaque(5, vec![1, 2, 3]),
        ] {
            let argument = ArgumentDescriptor::new("X", data_type, -1);
            let object = argument.to_binary_extension_object();
            assert_eq!(ArgumentDescriptor::from_extension_object(&object).unwrap(), argument);
        }
    }

    #[test]
    fn test_truncated_binary_body() {
        let object = ExtensionObject {
            type_id: well_known::ARGUMENT_ENCODING_BINARY,
            body: ExtensionBody::Binary(vec![4, 0, 0, 0, b'a']),
        };
        let err = ArgumentDescriptor::from_extension_object(&object).unwrap_err();
        assert!(matches!(err, OpcUaError::Conversion(ConversionError::InvalidFormat { .. })));
    }

    #[test]
    fn test_list_from_variant() {
        let value = Variant::Array {
            element_type: BuiltInType::ExtensionObject,
            items: vec![
                Scalar::ExtensionObject(double_array().to_extension_object()),
                Scalar::ExtensionObject(ArgumentDescriptor::new("Flag", NodeId::ns0(1), -1).to_binary_extension_object()),
            ],
        };
        let arguments = ArgumentDescriptor::list_from_variant(&value).unwrap();
        assert_eq!(arguments.len(), 2);
        assert_eq!(arguments[1].name, "Flag");
        assert!(ArgumentDescriptor::list_from_variant(&Variant::Empty).unwrap().is_empty());
    }

    #[test]
    fn test_missing_data_type_rejected() {
        let object = ExtensionObject {
            type_id: well_known::ARGUMENT,
            body: ExtensionBody::Json(BTreeMap::new()),
        };
        assert!(ArgumentDescriptor::from_extension_object(&object).is_err());
    }
}
