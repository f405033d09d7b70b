// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Conversion between [`DynamicValue`] and [`Variant`].
//!
//! # Encoding rules
//!
//! ```text
//! declared type          value rank     input            wire
//! ─────────────────────  ─────────────  ───────────────  ──────────────────────────
//! concrete T             -1             leaf / null      Scalar(T) / zero of T
//! concrete T             >= 0           list / null      Array(T) / empty Array(T)
//! concrete T             -2, -3         leaf or list     Scalar(T) or Array(T)
//! Number                 any            leaf             Double (Float stays Float)
//! Integer / UInteger     any            leaf             own tag or Int64 / UInt64
//! Enumeration            any            leaf             Int32
//! BaseDataType           any            leaf             the leaf's own tag
//! abstract (not Enum)    array          list             Array(Variant)
//! any                    any            {Type, Body}     Type, checked against the family
//! ```
//!
//! Multi-dimensional values (value rank > 1, nested lists) are not supported
//! and fail with a type mismatch.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;
use uuid::Uuid;

use crate::address::{parse_node_id, render_node_id, AddressFormat, NamespaceRef, NamespaceTable, NodeAddress};
use crate::error::{AddressError, ConversionError, OpcUaError, OpcUaResult};
use crate::path::TargetName;
use crate::types::{value_rank, LocalizedText, NodeId, QualifiedName};
use crate::value::{parse_f64, DynamicValue};
use crate::variant::{
    AbstractType, BodyEncoding, BuiltInType, DeclaredType, ExpandedNodeId, ExtensionBody,
    ExtensionObject, Scalar, TypeKind, TypedVariant, Variant,
};

/// Envelope field naming the wire type.
pub const TYPE_FIELD: &str = "Type";
/// Envelope field holding the value.
pub const BODY_FIELD: &str = "Body";
/// Extension object field holding the type id.
pub const TYPE_ID_FIELD: &str = "TypeId";
/// Extension object field holding the body encoding.
pub const ENCODING_FIELD: &str = "Encoding";

/// Largest integer magnitude a Double holds exactly.
const MAX_EXACT_DOUBLE: i128 = 1 << 53;

// =============================================================================
// Options
// =============================================================================

/// Codec options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    /// Parse strings for numeric and boolean targets, and split `"[1,2]"`
    /// and `"1, 2"` into lists for array targets.
    pub lenient_strings: bool,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            lenient_strings: true,
        }
    }
}

// =============================================================================
// VariantCodec
// =============================================================================

/// Encodes and decodes values against declared types.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariantCodec {
    options: CodecOptions,
}

impl VariantCodec {
    /// Creates a codec.
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }

    /// Creates a codec that does not coerce strings.
    pub fn strict() -> Self {
        Self::new(CodecOptions {
            lenient_strings: false,
        })
    }

    /// Returns the options.
    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    // =========================================================================
    // Encode
    // =========================================================================

    /// Encodes `value` for the declared type.
    ///
    /// # Errors
    ///
    /// - [`ConversionError::TypeMismatch`] if the shape or kind does not fit
    /// - [`ConversionError::OutOfRange`] if a number does not fit the target
    /// - [`ConversionError::InvalidFormat`] if a string cannot be parsed
    pub fn encode(
        &self,
        value: &DynamicValue,
        declared: &DeclaredType,
        table: &NamespaceTable,
    ) -> OpcUaResult<TypedVariant> {
        trace!(declared = %declared.name, rank = declared.value_rank, input = value.kind_name(), "Encoding value");

        if declared.value_rank > value_rank::ONE_DIMENSION {
            return Err(multi_dimensional(format!("ValueRank {}", declared.value_rank)));
        }

        let split = self.split_list(value, declared);
        let value = split.as_ref().unwrap_or(value);

        let variant = match value {
            DynamicValue::Null => Self::default_value(declared),
            DynamicValue::List(items) => {
                if declared.requires_scalar() {
                    return Err(ConversionError::type_mismatch(
                        format!("scalar {}", declared.name),
                        "list",
                    )
                    .into());
                }
                self.encode_array(items, declared.kind, table)?
            }
            other => {
                if declared.requires_array() {
                    return Err(ConversionError::type_mismatch(
                        format!("array of {}", declared.name),
                        other.kind_name(),
                    )
                    .into());
                }
                let variant = match declared.kind {
                    TypeKind::Concrete(t) => Variant::Scalar(self.encode_concrete(other, t, table)?),
                    TypeKind::Abstract(a) => self.encode_abstract(other, a, table)?,
                };
                if variant.is_array() && declared.requires_scalar() {
                    return Err(ConversionError::type_mismatch(
                        format!("scalar {}", declared.name),
                        "array",
                    )
                    .into());
                }
                variant
            }
        };

        Ok(TypedVariant {
            variant,
            type_name: declared.name.clone(),
        })
    }

    /// Returns the value used when nothing is supplied for `declared`.
    ///
    /// Arrays default to an empty array of the element tag, scalars to the
    /// zero value of the type.
    pub fn default_value(declared: &DeclaredType) -> Variant {
        if declared.requires_array() {
            return Variant::empty_array(array_element_type(declared.kind));
        }
        match declared.kind {
            TypeKind::Concrete(t) => Variant::Scalar(zero_scalar(t)),
            TypeKind::Abstract(AbstractType::Number) => Variant::Scalar(Scalar::Double(0.0)),
            TypeKind::Abstract(AbstractType::Integer) => Variant::Scalar(Scalar::Int64(0)),
            TypeKind::Abstract(AbstractType::UInteger) => Variant::Scalar(Scalar::UInt64(0)),
            TypeKind::Abstract(AbstractType::Enumeration) => Variant::Scalar(Scalar::Int32(0)),
            TypeKind::Abstract(AbstractType::BaseDataType) => Variant::Empty,
        }
    }

    /// Splits textual lists for array-capable targets.
    fn split_list(&self, value: &DynamicValue, declared: &DeclaredType) -> Option<DynamicValue> {
        let text = value.as_str()?;
        if !self.options.lenient_strings || declared.requires_scalar() {
            return None;
        }

        let trimmed = text.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            if let Ok(json @ serde_json::Value::Array(_)) = serde_json::from_str(trimmed) {
                return Some(DynamicValue::from_json(&json));
            }
        }

        if trimmed.contains(',') && !is_text_kind(declared.kind) {
            let items = trimmed
                .split(',')
                .map(|item| DynamicValue::String(item.trim().to_string()))
                .collect();
            return Some(DynamicValue::List(items));
        }

        None
    }

    fn encode_array(
        &self,
        items: &[DynamicValue],
        kind: TypeKind,
        table: &NamespaceTable,
    ) -> OpcUaResult<Variant> {
        if items.iter().any(|item| matches!(item, DynamicValue::List(_))) {
            return Err(multi_dimensional("nested list".to_string()));
        }

        let element_type = array_element_type(kind);
        let items = items
            .iter()
            .map(|item| match kind {
                TypeKind::Concrete(t) => self.encode_concrete(item, t, table),
                TypeKind::Abstract(AbstractType::Enumeration) => self.encode_enumeration(item),
                TypeKind::Abstract(a) => {
                    let inner = match item {
                        DynamicValue::Null => Variant::Empty,
                        other => self.encode_abstract(other, a, table)?,
                    };
                    Ok(Scalar::Variant(Box::new(inner)))
                }
            })
            .collect::<OpcUaResult<Vec<_>>>()?;

        Ok(Variant::Array {
            element_type,
            items,
        })
    }

    // =========================================================================
    // Abstract types
    // =========================================================================

    fn encode_abstract(
        &self,
        value: &DynamicValue,
        abstract_type: AbstractType,
        table: &NamespaceTable,
    ) -> OpcUaResult<Variant> {
        if let Some((type_name, body)) = envelope(value) {
            return self.encode_envelope(type_name, body, abstract_type, table);
        }

        let scalar = match abstract_type {
            AbstractType::Number => self.encode_number(value)?,
            AbstractType::Integer => self.encode_integer_family(value, true)?,
            AbstractType::UInteger => self.encode_integer_family(value, false)?,
            AbstractType::Enumeration => self.encode_enumeration(value)?,
            AbstractType::BaseDataType => match value {
                DynamicValue::Null => return Ok(Variant::Empty),
                DynamicValue::List(items) => {
                    return self.encode_array(items, TypeKind::Abstract(AbstractType::BaseDataType), table)
                }
                other => self.encode_leaf(other, table)?,
            },
        };
        Ok(Variant::Scalar(scalar))
    }

    /// Encodes `{Type, Body}` under an abstract declared type.
    fn encode_envelope(
        &self,
        type_name: &str,
        body: &DynamicValue,
        declared: AbstractType,
        table: &NamespaceTable,
    ) -> OpcUaResult<Variant> {
        let kind = TypeKind::from_name(type_name)
            .ok_or_else(|| ConversionError::unsupported_type(type_name))?;

        match kind {
            TypeKind::Abstract(inner) => {
                if !declared.admits_abstract(inner) {
                    return Err(ConversionError::type_mismatch(declared.name(), inner.name()).into());
                }
                self.encode_abstract(body, inner, table)
            }
            TypeKind::Concrete(t) => {
                if !declared.admits(t) {
                    return Err(ConversionError::type_mismatch(declared.name(), t.name()).into());
                }
                match body {
                    DynamicValue::List(items) => self.encode_array(items, kind, table),
                    other => Ok(Variant::Scalar(self.encode_concrete(other, t, table)?)),
                }
            }
        }
    }

    fn encode_number(&self, value: &DynamicValue) -> OpcUaResult<Scalar> {
        match value {
            DynamicValue::Null => Ok(Scalar::Double(0.0)),
            DynamicValue::Float(v) => Ok(Scalar::Float(*v)),
            DynamicValue::Double(v) => Ok(Scalar::Double(*v)),
            v if v.is_integer() => {
                let n = v.as_i128().unwrap_or_default();
                if n.abs() > MAX_EXACT_DOUBLE {
                    return Err(ConversionError::out_of_range(n, "Double").into());
                }
                Ok(Scalar::Double(n as f64))
            }
            DynamicValue::String(text) => self
                .parse_float_text(text, "Number")
                .map(Scalar::Double),
            other => Err(ConversionError::type_mismatch("Number", other.kind_name()).into()),
        }
    }

    /// Integer keeps signed leaves, UInteger keeps unsigned leaves; other
    /// inputs widen to Int64 / UInt64.
    fn encode_integer_family(&self, value: &DynamicValue, signed: bool) -> OpcUaResult<Scalar> {
        let keep = match value {
            DynamicValue::SByte(v) if signed => Some(Scalar::SByte(*v)),
            DynamicValue::Int16(v) if signed => Some(Scalar::Int16(*v)),
            DynamicValue::Int32(v) if signed => Some(Scalar::Int32(*v)),
            DynamicValue::Int64(v) if signed => Some(Scalar::Int64(*v)),
            DynamicValue::Byte(v) if !signed => Some(Scalar::Byte(*v)),
            DynamicValue::UInt16(v) if !signed => Some(Scalar::UInt16(*v)),
            DynamicValue::UInt32(v) if !signed => Some(Scalar::UInt32(*v)),
            DynamicValue::UInt64(v) if !signed => Some(Scalar::UInt64(*v)),
            _ => None,
        };
        if let Some(scalar) = keep {
            return Ok(scalar);
        }

        let (target, name) = if signed {
            (BuiltInType::Int64, "Integer")
        } else {
            (BuiltInType::UInt64, "UInteger")
        };
        let n = self.integer_of(value, name)?;
        integer_scalar(n, target)
    }

    /// Enumerations travel as Int32; `Name_5` strings carry the value after
    /// the last underscore.
    fn encode_enumeration(&self, value: &DynamicValue) -> OpcUaResult<Scalar> {
        if let DynamicValue::String(text) = value {
            let digits = text.rsplit_once('_').map_or(text.as_str(), |(_, n)| n);
            let n = digits.trim().parse::<i128>().map_err(|_| {
                ConversionError::invalid_format("Enumeration", format!("'{}' is not an enumeration value", text))
            })?;
            return integer_scalar(n, BuiltInType::Int32);
        }
        let n = self.integer_of(value, "Enumeration")?;
        integer_scalar(n, BuiltInType::Int32)
    }

    /// A leaf under BaseDataType keeps its own tag.
    fn encode_leaf(&self, value: &DynamicValue, table: &NamespaceTable) -> OpcUaResult<Scalar> {
        Ok(match value {
            DynamicValue::Boolean(v) => Scalar::Boolean(*v),
            DynamicValue::SByte(v) => Scalar::SByte(*v),
            DynamicValue::Byte(v) => Scalar::Byte(*v),
            DynamicValue::Int16(v) => Scalar::Int16(*v),
            DynamicValue::UInt16(v) => Scalar::UInt16(*v),
            DynamicValue::Int32(v) => Scalar::Int32(*v),
            DynamicValue::UInt32(v) => Scalar::UInt32(*v),
            DynamicValue::Int64(v) => Scalar::Int64(*v),
            DynamicValue::UInt64(v) => Scalar::UInt64(*v),
            DynamicValue::Float(v) => Scalar::Float(*v),
            DynamicValue::Double(v) => Scalar::Double(*v),
            DynamicValue::String(v) => Scalar::String(v.clone()),
            DynamicValue::Bytes(v) => Scalar::ByteString(v.clone()),
            DynamicValue::DateTime(v) => Scalar::DateTime(*v),
            DynamicValue::Guid(v) => Scalar::Guid(*v),
            DynamicValue::Record(_) if value.get(TYPE_ID_FIELD).is_some() => {
                Scalar::ExtensionObject(self.encode_extension_object(value, table)?)
            }
            other => {
                return Err(ConversionError::type_mismatch("BaseDataType", other.kind_name()).into())
            }
        })
    }

    // =========================================================================
    // Concrete types
    // =========================================================================

    fn encode_concrete(
        &self,
        value: &DynamicValue,
        target: BuiltInType,
        table: &NamespaceTable,
    ) -> OpcUaResult<Scalar> {
        if let Some((type_name, body)) = envelope(value) {
            let tag = type_name.parse::<BuiltInType>()?;
            if tag != target {
                return Err(ConversionError::type_mismatch(target.name(), tag.name()).into());
            }
            return self.encode_concrete(body, target, table);
        }

        if value.is_null() {
            return Ok(zero_scalar(target));
        }

        let mismatch = || -> OpcUaError {
            ConversionError::type_mismatch(target.name(), value.kind_name()).into()
        };

        match target {
            BuiltInType::Boolean => match value {
                DynamicValue::Boolean(v) => Ok(Scalar::Boolean(*v)),
                DynamicValue::String(text) if self.options.lenient_strings => {
                    match text.trim().to_ascii_lowercase().as_str() {
                        "true" | "1" => Ok(Scalar::Boolean(true)),
                        "false" | "0" => Ok(Scalar::Boolean(false)),
                        _ => Err(ConversionError::invalid_format("Boolean", format!("'{}' is not a boolean", text)).into()),
                    }
                }
                _ => Err(mismatch()),
            },
            t if t.is_integer() => {
                let n = self.integer_of(value, t.name())?;
                integer_scalar(n, t)
            }
            BuiltInType::Float => {
                let v = self.float_of(value, "Float")?;
                if v.is_finite() && v.abs() > f64::from(f32::MAX) {
                    return Err(ConversionError::out_of_range(v, "Float").into());
                }
                Ok(Scalar::Float(v as f32))
            }
            BuiltInType::Double => self.float_of(value, "Double").map(Scalar::Double),
            BuiltInType::String => match value {
                DynamicValue::String(v) => Ok(Scalar::String(v.clone())),
                DynamicValue::Record(_) | DynamicValue::Bytes(_) => Err(mismatch()),
                other if self.options.lenient_strings => Ok(Scalar::String(other.to_string())),
                _ => Err(mismatch()),
            },
            BuiltInType::DateTime => match value {
                DynamicValue::DateTime(v) => Ok(Scalar::DateTime(*v)),
                DynamicValue::String(text) => DateTime::parse_from_rfc3339(text.trim())
                    .map(|dt| Scalar::DateTime(dt.with_timezone(&Utc)))
                    .map_err(|e| ConversionError::invalid_format("DateTime", e.to_string()).into()),
                _ => Err(mismatch()),
            },
            BuiltInType::Guid => match value {
                DynamicValue::Guid(v) => Ok(Scalar::Guid(*v)),
                DynamicValue::String(text) => Uuid::parse_str(text.trim())
                    .map(Scalar::Guid)
                    .map_err(|e| ConversionError::invalid_format("Guid", e.to_string()).into()),
                _ => Err(mismatch()),
            },
            BuiltInType::ByteString => bytes_of(value, "ByteString").map(Scalar::ByteString),
            BuiltInType::XmlElement => match value {
                DynamicValue::String(v) => Ok(Scalar::XmlElement(v.clone())),
                _ => Err(mismatch()),
            },
            BuiltInType::NodeId => match value {
                DynamicValue::String(text) => parse_node_id(text, table).map(Scalar::NodeId),
                _ => Err(mismatch()),
            },
            BuiltInType::ExpandedNodeId => match value {
                DynamicValue::String(text) => {
                    expanded_node_id(text, table).map(Scalar::ExpandedNodeId)
                }
                _ => Err(mismatch()),
            },
            BuiltInType::StatusCode => {
                let n = self.integer_of(value, "StatusCode")?;
                match integer_scalar(n, BuiltInType::UInt32)? {
                    Scalar::UInt32(code) => Ok(Scalar::StatusCode(code)),
                    _ => Err(mismatch()),
                }
            }
            BuiltInType::QualifiedName => match value {
                DynamicValue::String(text) => qualified_name(text, table).map(Scalar::QualifiedName),
                _ => Err(mismatch()),
            },
            BuiltInType::LocalizedText => match value {
                DynamicValue::String(text) => Ok(Scalar::LocalizedText(LocalizedText::new(text.clone()))),
                DynamicValue::Record(_) => {
                    let text = value.get("Text").and_then(DynamicValue::as_str).ok_or_else(mismatch)?;
                    Ok(Scalar::LocalizedText(LocalizedText {
                        locale: value.get("Locale").and_then(DynamicValue::as_str).map(str::to_string),
                        text: text.to_string(),
                    }))
                }
                _ => Err(mismatch()),
            },
            BuiltInType::ExtensionObject => match value {
                DynamicValue::Record(_) => self
                    .encode_extension_object(value, table)
                    .map(Scalar::ExtensionObject),
                _ => Err(mismatch()),
            },
            BuiltInType::Variant => {
                let inner = self.encode_abstract(value, AbstractType::BaseDataType, table)?;
                Ok(Scalar::Variant(Box::new(inner)))
            }
            _ => Err(mismatch()),
        }
    }

    /// Encodes `{TypeId, Encoding?, Body}`.
    fn encode_extension_object(
        &self,
        value: &DynamicValue,
        table: &NamespaceTable,
    ) -> OpcUaResult<ExtensionObject> {
        let type_id = match value.get(TYPE_ID_FIELD) {
            Some(DynamicValue::String(text)) => parse_node_id(text, table)?,
            Some(other) => {
                return Err(ConversionError::type_mismatch("TypeId address", other.kind_name()).into())
            }
            None => {
                return Err(ConversionError::invalid_format("ExtensionObject", "missing TypeId").into())
            }
        };

        let encoding = match value.get(ENCODING_FIELD) {
            None | Some(DynamicValue::Null) => BodyEncoding::Binary,
            Some(DynamicValue::String(text)) => text.parse()?,
            Some(other) => match other.as_i128() {
                Some(n) => BodyEncoding::from_value(n),
                None => {
                    return Err(ConversionError::type_mismatch("Encoding", other.kind_name()).into())
                }
            },
        };

        let body = value.get(BODY_FIELD).unwrap_or(&DynamicValue::Null);
        let body = match encoding {
            BodyEncoding::Binary => match body {
                DynamicValue::Null => ExtensionBody::Binary(Vec::new()),
                other => ExtensionBody::Binary(bytes_of(other, "ExtensionObject")?),
            },
            BodyEncoding::Xml => match body {
                DynamicValue::String(text) => ExtensionBody::Xml(text.clone()),
                other => {
                    return Err(ConversionError::type_mismatch("Xml body", other.kind_name()).into())
                }
            },
            BodyEncoding::Json => match body {
                DynamicValue::Record(fields) => {
                    let declared = DeclaredType::abstract_type(
                        AbstractType::BaseDataType,
                        value_rank::SCALAR_OR_ONE_DIMENSION,
                    );
                    let fields = fields
                        .iter()
                        .map(|(name, field)| {
                            self.encode(field, &declared, table)
                                .map(|typed| (name.clone(), typed.variant))
                        })
                        .collect::<OpcUaResult<BTreeMap<_, _>>>()?;
                    ExtensionBody::Json(fields)
                }
                other => {
                    return Err(ConversionError::type_mismatch("Json body record", other.kind_name()).into())
                }
            },
        };

        Ok(ExtensionObject { type_id, body })
    }

    // =========================================================================
    // Leaf coercion
    // =========================================================================

    fn integer_of(&self, value: &DynamicValue, target: &str) -> OpcUaResult<i128> {
        if let Some(n) = value.as_i128() {
            return Ok(n);
        }
        match value {
            DynamicValue::Float(_) | DynamicValue::Double(_) => {
                let v = value.as_f64().unwrap_or(f64::NAN);
                if !v.is_finite() || v.fract() != 0.0 {
                    return Err(ConversionError::type_mismatch(target, format!("non-integral number {}", v)).into());
                }
                if v.abs() >= 1e38 {
                    return Err(ConversionError::out_of_range(v, target).into());
                }
                Ok(v as i128)
            }
            DynamicValue::String(text) if self.options.lenient_strings => {
                let text = text.trim();
                text.parse::<i128>().or_else(|_| parse_hex(text)).map_err(|_| {
                    ConversionError::invalid_format(target, format!("'{}' is not an integer", text)).into()
                })
            }
            other => Err(ConversionError::type_mismatch(target, other.kind_name()).into()),
        }
    }

    fn float_of(&self, value: &DynamicValue, target: &str) -> OpcUaResult<f64> {
        match value {
            DynamicValue::String(text) => self.parse_float_text(text, target),
            other => other
                .as_f64()
                .ok_or_else(|| ConversionError::type_mismatch(target, other.kind_name()).into()),
        }
    }

    /// NaN and the infinities are accepted as text even when strict.
    fn parse_float_text(&self, text: &str, target: &str) -> OpcUaResult<f64> {
        let parsed = parse_f64(text);
        match parsed {
            Some(v) if !v.is_finite() || self.options.lenient_strings => Ok(v),
            _ if !self.options.lenient_strings => {
                Err(ConversionError::type_mismatch(target, "String").into())
            }
            _ => Err(ConversionError::invalid_format(target, format!("'{}' is not a number", text)).into()),
        }
    }

    // =========================================================================
    // Decode
    // =========================================================================

    /// Decodes a variant into a value tree.
    ///
    /// `declared_type_name` pins the wire tag: when it names the tag exactly,
    /// tags that a plain leaf cannot describe decode to the leaf; otherwise
    /// they decode to `{Type, Body}`.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionError::TypeMismatch`] for multi-dimensional input.
    pub fn decode(
        &self,
        variant: &Variant,
        declared_type_name: Option<&str>,
        table: &NamespaceTable,
    ) -> OpcUaResult<DynamicValue> {
        let pinned = declared_type_name.and_then(TypeKind::from_name).and_then(|kind| match kind {
            TypeKind::Concrete(t) => Some(t),
            TypeKind::Abstract(_) => None,
        });
        self.decode_variant(variant, pinned, table)
    }

    fn decode_variant(
        &self,
        variant: &Variant,
        pinned: Option<BuiltInType>,
        table: &NamespaceTable,
    ) -> OpcUaResult<DynamicValue> {
        match variant {
            Variant::Empty => Ok(DynamicValue::Null),
            Variant::Scalar(scalar) => self.decode_scalar(scalar, pinned, table),
            Variant::Array { items, .. } => items
                .iter()
                .map(|item| {
                    if matches!(item, Scalar::Variant(inner) if inner.is_array()) {
                        return Err(multi_dimensional("nested array".to_string()));
                    }
                    self.decode_scalar(item, pinned, table)
                })
                .collect::<OpcUaResult<Vec<_>>>()
                .map(DynamicValue::List),
        }
    }

    fn decode_scalar(
        &self,
        scalar: &Scalar,
        pinned: Option<BuiltInType>,
        table: &NamespaceTable,
    ) -> OpcUaResult<DynamicValue> {
        if let Scalar::Variant(inner) = scalar {
            return self.decode_variant(inner, None, table);
        }

        let tag = scalar.built_in_type();
        let plain = self.decode_plain(scalar, table)?;
        if tag.needs_envelope() && pinned != Some(tag) {
            return Ok(DynamicValue::record([
                (TYPE_FIELD, DynamicValue::from(tag.name())),
                (BODY_FIELD, plain),
            ]));
        }
        Ok(plain)
    }

    fn decode_plain(&self, scalar: &Scalar, table: &NamespaceTable) -> OpcUaResult<DynamicValue> {
        Ok(match scalar {
            Scalar::Boolean(v) => DynamicValue::Boolean(*v),
            Scalar::SByte(v) => DynamicValue::SByte(*v),
            Scalar::Byte(v) => DynamicValue::Byte(*v),
            Scalar::Int16(v) => DynamicValue::Int16(*v),
            Scalar::UInt16(v) => DynamicValue::UInt16(*v),
            Scalar::Int32(v) => DynamicValue::Int32(*v),
            Scalar::UInt32(v) => DynamicValue::UInt32(*v),
            Scalar::Int64(v) => DynamicValue::Int64(*v),
            Scalar::UInt64(v) => DynamicValue::UInt64(*v),
            Scalar::Float(v) => DynamicValue::Float(*v),
            Scalar::Double(v) => DynamicValue::Double(*v),
            Scalar::String(v) | Scalar::XmlElement(v) => DynamicValue::String(v.clone()),
            Scalar::DateTime(v) => DynamicValue::DateTime(*v),
            Scalar::Guid(v) => DynamicValue::Guid(*v),
            Scalar::ByteString(v) => DynamicValue::Bytes(v.clone()),
            Scalar::NodeId(id) => {
                DynamicValue::String(render_node_id(id, table, AddressFormat::Expanded))
            }
            Scalar::ExpandedNodeId(id) => {
                DynamicValue::String(render_expanded(id, table))
            }
            Scalar::StatusCode(code) => DynamicValue::UInt32(*code),
            Scalar::QualifiedName(name) => {
                let target = TargetName {
                    namespace: Some(table.namespace_ref(name.namespace_index)),
                    name: name.name.clone(),
                };
                DynamicValue::String(target.render(table))
            }
            Scalar::LocalizedText(text) => match &text.locale {
                Some(locale) => DynamicValue::record([
                    ("Locale", DynamicValue::from(locale.as_str())),
                    ("Text", DynamicValue::from(text.text.as_str())),
                ]),
                None => DynamicValue::String(text.text.clone()),
            },
            Scalar::ExtensionObject(object) => self.decode_extension_object(object, table)?,
            Scalar::Variant(inner) => self.decode_variant(inner, None, table)?,
        })
    }

    fn decode_extension_object(
        &self,
        object: &ExtensionObject,
        table: &NamespaceTable,
    ) -> OpcUaResult<DynamicValue> {
        let body = match &object.body {
            ExtensionBody::Binary(bytes) => DynamicValue::Bytes(bytes.clone()),
            ExtensionBody::Xml(text) => DynamicValue::String(text.clone()),
            ExtensionBody::Json(fields) => DynamicValue::Record(
                fields
                    .iter()
                    .map(|(name, field)| -> OpcUaResult<(String, DynamicValue)> {
                        Ok((name.clone(), self.decode_variant(field, None, table)?))
                    })
                    .collect::<OpcUaResult<BTreeMap<_, _>>>()?,
            ),
        };

        Ok(DynamicValue::record([
            (
                TYPE_ID_FIELD,
                DynamicValue::String(render_node_id(&object.type_id, table, AddressFormat::Expanded)),
            ),
            (ENCODING_FIELD, DynamicValue::from(object.body.encoding().as_str())),
            (BODY_FIELD, body),
        ]))
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Returns `(Type, Body)` if `value` is an envelope record.
fn envelope(value: &DynamicValue) -> Option<(&str, &DynamicValue)> {
    let fields = value.as_record()?;
    if fields.len() != 2 {
        return None;
    }
    let type_name = fields.get(TYPE_FIELD)?.as_str()?;
    let body = fields.get(BODY_FIELD)?;
    Some((type_name, body))
}

fn array_element_type(kind: TypeKind) -> BuiltInType {
    match kind {
        TypeKind::Concrete(t) => t,
        TypeKind::Abstract(AbstractType::Enumeration) => BuiltInType::Int32,
        TypeKind::Abstract(_) => BuiltInType::Variant,
    }
}

/// Text-valued kinds keep comma-separated strings intact.
fn is_text_kind(kind: TypeKind) -> bool {
    match kind {
        TypeKind::Concrete(t) => matches!(
            t,
            BuiltInType::String
                | BuiltInType::XmlElement
                | BuiltInType::LocalizedText
                | BuiltInType::QualifiedName
                | BuiltInType::ByteString
        ),
        TypeKind::Abstract(a) => a == AbstractType::BaseDataType,
    }
}

fn multi_dimensional(actual: String) -> OpcUaError {
    ConversionError::type_mismatch("scalar or one-dimensional array", actual).into()
}

fn zero_scalar(t: BuiltInType) -> Scalar {
    match t {
        BuiltInType::Boolean => Scalar::Boolean(false),
        BuiltInType::SByte => Scalar::SByte(0),
        BuiltInType::Byte => Scalar::Byte(0),
        BuiltInType::Int16 => Scalar::Int16(0),
        BuiltInType::UInt16 => Scalar::UInt16(0),
        BuiltInType::Int32 => Scalar::Int32(0),
        BuiltInType::UInt32 => Scalar::UInt32(0),
        BuiltInType::Int64 => Scalar::Int64(0),
        BuiltInType::UInt64 => Scalar::UInt64(0),
        BuiltInType::Float => Scalar::Float(0.0),
        BuiltInType::Double => Scalar::Double(0.0),
        BuiltInType::String => Scalar::String(String::new()),
        BuiltInType::DateTime => Scalar::DateTime(min_date_time()),
        BuiltInType::Guid => Scalar::Guid(Uuid::nil()),
        BuiltInType::ByteString => Scalar::ByteString(Vec::new()),
        BuiltInType::XmlElement => Scalar::XmlElement(String::new()),
        BuiltInType::NodeId => Scalar::NodeId(NodeId::null()),
        BuiltInType::ExpandedNodeId => Scalar::ExpandedNodeId(ExpandedNodeId::default()),
        BuiltInType::StatusCode => Scalar::StatusCode(0),
        BuiltInType::QualifiedName => Scalar::QualifiedName(QualifiedName::default()),
        BuiltInType::LocalizedText => Scalar::LocalizedText(LocalizedText::default()),
        BuiltInType::ExtensionObject => Scalar::ExtensionObject(ExtensionObject::null()),
        BuiltInType::Variant => Scalar::Variant(Box::new(Variant::Empty)),
    }
}

/// OPC UA's null DateTime, 1601-01-01T00:00:00Z.
fn min_date_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1601, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

fn integer_scalar(n: i128, target: BuiltInType) -> OpcUaResult<Scalar> {
    let (min, max) = target
        .integer_range()
        .ok_or_else(|| ConversionError::unsupported_type(target.name()))?;
    if n < min || n > max {
        return Err(ConversionError::out_of_range(n, target.name()).into());
    }
    // Range checked above
    Ok(match target {
        BuiltInType::SByte => Scalar::SByte(n as i8),
        BuiltInType::Byte => Scalar::Byte(n as u8),
        BuiltInType::Int16 => Scalar::Int16(n as i16),
        BuiltInType::UInt16 => Scalar::UInt16(n as u16),
        BuiltInType::Int32 => Scalar::Int32(n as i32),
        BuiltInType::UInt32 => Scalar::UInt32(n as u32),
        BuiltInType::Int64 => Scalar::Int64(n as i64),
        _ => Scalar::UInt64(n as u64),
    })
}

fn parse_hex(text: &str) -> Result<i128, std::num::ParseIntError> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or("not hex");
    i128::from_str_radix(digits, 16)
}

fn bytes_of(value: &DynamicValue, target: &str) -> OpcUaResult<Vec<u8>> {
    match value {
        DynamicValue::Bytes(bytes) => Ok(bytes.clone()),
        DynamicValue::String(text) => BASE64
            .decode(text.trim())
            .map_err(|e| ConversionError::invalid_format(target, e.to_string()).into()),
        DynamicValue::List(items) => items
            .iter()
            .map(|item| -> OpcUaResult<u8> {
                match item.as_i128() {
                    Some(n) if (0..=255).contains(&n) => Ok(n as u8),
                    Some(n) => Err(ConversionError::out_of_range(n, "Byte").into()),
                    None => Err(ConversionError::type_mismatch("Byte", item.kind_name()).into()),
                }
            })
            .collect(),
        other => Err(ConversionError::type_mismatch(target, other.kind_name()).into()),
    }
}

fn expanded_node_id(text: &str, table: &NamespaceTable) -> OpcUaResult<ExpandedNodeId> {
    let address = NodeAddress::parse(text, table)?;
    let index = table.resolve(&address.namespace);
    let namespace_uri = match (&address.namespace, index) {
        (NamespaceRef::Uri(uri), None) => Some(uri.clone()),
        (NamespaceRef::Index(_), None) => {
            return Err(AddressError::invalid(text, "Namespace index is not in the namespace table").into())
        }
        _ => None,
    };
    Ok(ExpandedNodeId {
        node_id: NodeId {
            namespace_index: index.unwrap_or(0),
            identifier: address.identifier,
        },
        namespace_uri,
        server_uri: address.server_uri,
    })
}

fn render_expanded(id: &ExpandedNodeId, table: &NamespaceTable) -> String {
    let mut address = NodeAddress::from_node_id(&id.node_id, table);
    if let Some(uri) = &id.namespace_uri {
        address.namespace = NamespaceRef::Uri(uri.clone());
    }
    address.server_uri = id.server_uri.clone();
    address.render(table, AddressFormat::Expanded)
}

fn qualified_name(text: &str, table: &NamespaceTable) -> OpcUaResult<QualifiedName> {
    let target = TargetName::parse(text, table);
    let namespace_index = match &target.namespace {
        None => 0,
        Some(namespace) => table.resolve(namespace).ok_or_else(|| {
            AddressError::invalid(text, format!("Namespace '{}' is not in the namespace table", namespace))
        })?,
    };
    Ok(QualifiedName::new(namespace_index, target.name))
}

// =============================================================================
// Tests
// =============================================================================
