// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The public, self-describing value tree.
//!
//! [`DynamicValue`] is what callers read, write and pass as method arguments.
//! It is a closed sum type, so every codec rule is checked exhaustively by
//! the compiler.
//!
//! # JSON mapping
//!
//! | DynamicValue         | JSON                                      |
//! |----------------------|-------------------------------------------|
//! | `Null`               | `null`                                    |
//! | integers             | number                                    |
//! | `Float` / `Double`   | number, or `"NaN"`, `"Infinity"`, `"-Infinity"` |
//! | `Bytes`              | base64 string                             |
//! | `DateTime`           | RFC 3339 string                           |
//! | `Guid`               | hyphenated string                         |
//! | `List` / `Record`    | array / object                            |
//!
//! JSON input never produces `Float`, `Bytes`, `DateTime` or `Guid` leaves;
//! the codec recovers them from the declared type.

use std::collections::BTreeMap;
use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

// =============================================================================
// DynamicValue
// =============================================================================

/// Self-describing value tree.
#[derive(Debug, Clone, Default)]
pub enum DynamicValue {
    /// Absent value.
    #[default]
    Null,
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
    /// Byte sequence.
    Bytes(Vec<u8>),
    /// UTC timestamp.
    DateTime(DateTime<Utc>),
    /// GUID.
    Guid(Uuid),
    /// Ordered list.
    List(Vec<DynamicValue>),
    /// Keyed record.
    Record(BTreeMap<String, DynamicValue>),
}

impl DynamicValue {
    /// Returns the name of this value's shape, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "Boolean",
            Self::SByte(_) => "SByte",
            Self::Byte(_) => "Byte",
            Self::Int16(_) => "Int16",
            Self::UInt16(_) => "UInt16",
            Self::Int32(_) => "Int32",
            Self::UInt32(_) => "UInt32",
            Self::Int64(_) => "Int64",
            Self::UInt64(_) => "UInt64",
            Self::Float(_) => "Float",
            Self::Double(_) => "Double",
            Self::String(_) => "String",
            Self::Bytes(_) => "ByteString",
            Self::DateTime(_) => "DateTime",
            Self::Guid(_) => "Guid",
            Self::List(_) => "list",
            Self::Record(_) => "record",
        }
    }

    /// Returns `true` if this is `Null`.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for integer leaves.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::SByte(_)
                | Self::Byte(_)
                | Self::Int16(_)
                | Self::UInt16(_)
                | Self::Int32(_)
                | Self::UInt32(_)
                | Self::Int64(_)
                | Self::UInt64(_)
        )
    }

    /// Returns the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns an integer leaf as i128, which holds every integer exactly.
    pub fn as_i128(&self) -> Option<i128> {
        Some(match self {
            Self::SByte(v) => *v as i128,
            Self::Byte(v) => *v as i128,
            Self::Int16(v) => *v as i128,
            Self::UInt16(v) => *v as i128,
            Self::Int32(v) => *v as i128,
            Self::UInt32(v) => *v as i128,
            Self::Int64(v) => *v as i128,
            Self::UInt64(v) => *v as i128,
            _ => return None,
        })
    }

    /// Returns a numeric leaf as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            other => other.as_i128().map(|v| v as f64),
        }
    }

    /// Returns the value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the items of a list.
    pub fn as_list(&self) -> Option<&[DynamicValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the fields of a record.
    pub fn as_record(&self) -> Option<&BTreeMap<String, DynamicValue>> {
        match self {
            Self::Record(fields) => Some(fields),
            _ => None,
        }
    }

    /// Looks up a record field.
    pub fn get(&self, key: &str) -> Option<&DynamicValue> {
        self.as_record().and_then(|fields| fields.get(key))
    }

    /// Creates a record from field pairs.
    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, DynamicValue)>,
        K: Into<String>,
    {
        Self::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    // =========================================================================
    // JSON
    // =========================================================================

    /// Converts from JSON.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(v) => Self::Boolean(*v),
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Self::Int64(v)
                } else if let Some(v) = n.as_u64() {
                    Self::UInt64(v)
                } else {
                    Self::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(v) => Self::String(v.clone()),
            serde_json::Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            serde_json::Value::Object(fields) => Self::Record(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts to JSON.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            Self::Null => Value::Null,
            Self::Boolean(v) => Value::Bool(*v),
            Self::SByte(v) => Value::from(*v),
            Self::Byte(v) => Value::from(*v),
            Self::Int16(v) => Value::from(*v),
            Self::UInt16(v) => Value::from(*v),
            Self::Int32(v) => Value::from(*v),
            Self::UInt32(v) => Value::from(*v),
            Self::Int64(v) => Value::from(*v),
            Self::UInt64(v) => Value::from(*v),
            // Shortest decimal of the f32, not of its f64 widening
            Self::Float(v) => float_to_json(v.to_string().parse::<f64>().unwrap_or(f64::NAN)),
            Self::Double(v) => float_to_json(*v),
            Self::String(v) => Value::String(v.clone()),
            Self::Bytes(v) => Value::String(BASE64.encode(v)),
            Self::DateTime(v) => Value::String(v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Guid(v) => Value::String(v.hyphenated().to_string()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Record(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

fn float_to_json(v: f64) -> serde_json::Value {
    if v.is_nan() {
        serde_json::Value::String("NaN".into())
    } else if v == f64::INFINITY {
        serde_json::Value::String("Infinity".into())
    } else if v == f64::NEG_INFINITY {
        serde_json::Value::String("-Infinity".into())
    } else {
        serde_json::Number::from_f64(v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// Parses the textual float specials and plain numbers.
pub(crate) fn parse_f64(text: &str) -> Option<f64> {
    match text.trim() {
        "NaN" | "nan" => Some(f64::NAN),
        "Infinity" | "+Infinity" | "inf" | "INF" => Some(f64::INFINITY),
        "-Infinity" | "-inf" | "-INF" => Some(f64::NEG_INFINITY),
        other => other.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}

impl PartialEq for DynamicValue {
    /// Structural equality where NaN equals NaN.
    fn eq(&self, other: &Self) -> bool {
        fn same_f64(a: f64, b: f64) -> bool {
            a == b || (a.is_nan() && b.is_nan())
        }

        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::SByte(a), Self::SByte(b)) => a == b,
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Int16(a), Self::Int16(b)) => a == b,
            (Self::UInt16(a), Self::UInt16(b)) => a == b,
            (Self::Int32(a), Self::Int32(b)) => a == b,
            (Self::UInt32(a), Self::UInt32(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::UInt64(a), Self::UInt64(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => same_f64(f64::from(*a), f64::from(*b)),
            (Self::Double(a), Self::Double(b)) => same_f64(*a, *b),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::Guid(a), Self::Guid(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Record(a), Self::Record(b)) => a == b,
            _ => false,
        }
    }
}

impl Serialize for DynamicValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DynamicValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(|v| Self::from_json(&v))
    }
}

impl fmt::Display for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(v) => write!(f, "{}", v),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for DynamicValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Boolean,
    i8 => SByte,
    u8 => Byte,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    String => String,
    Vec<u8> => Bytes,
    DateTime<Utc> => DateTime,
    Uuid => Guid,
    Vec<DynamicValue> => List,
}

impl From<&str> for DynamicValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<serde_json::Value> for DynamicValue {
    fn from(v: serde_json::Value) -> Self {
        Self::from_json(&v)
    }
}

// =============================================================================
// Tests
// =============================================================================
