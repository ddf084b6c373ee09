//! Dynamic values
//!
//! Codecs are built at runtime from declarations, so the values they read and
//! write are dynamic too. A [`Value`] is what callers hand to
//! [`Codec::encode`](crate::Codec::encode) and what
//! [`Codec::decode`](crate::Codec::decode) hands back.
//!
//! Several variants exist only as alternative input shapes for `i64`:
//! [`Value::Long`] and [`Value::Timestamp`], plus hex strings, 8-byte binaries
//! and byte lists. See [`codec::int64`](crate::codec::int64).

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Struct fields by name
pub type Record = IndexMap<String, Value>;

/// A dynamically typed Thrift value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// No value; an unset struct field
    Null,
    Bool(bool),
    /// Any integer: `byte`, `i16`, `i32`, an `i64` number, or an enum value
    Int(i64),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
    /// `list` and `set` contents
    List(Vec<Value>),
    /// A map keyed by host-hashable keys
    Map(IndexMap<MapKey, Value>),
    /// A map as ordered key/value pairs
    Entries(Vec<(Value, Value)>),
    /// `struct`, `union` and `exception` fields
    Struct(Record),
    /// A 64-bit integer held as two 32-bit words
    Long(Long),
    /// A point in time, carried on the wire as i64 milliseconds
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Build a struct value from `(name, value)` pairs
    pub fn record<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Struct(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a keyed map value from `(key, value)` pairs
    pub fn map<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (MapKey, Value)>,
    {
        Value::Map(entries.into_iter().collect())
    }

    /// Whether this is [`Value::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer payload, if any
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// String payload, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Struct fields, if any
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Struct(r) => Some(r),
            _ => None,
        }
    }

    /// Short name of the variant for error messages
    pub fn shape(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Entries(_) => "entries",
            Value::Struct(_) => "struct",
            Value::Long(_) => "long",
            Value::Timestamp(_) => "timestamp",
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<Long> for Value {
    fn from(value: Long) -> Self {
        Value::Long(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Timestamp(value)
    }
}

/// A value usable as a key of a keyed map
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    String(String),
    Binary(Vec<u8>),
}

impl MapKey {
    /// Convert a decoded key; `None` for values that cannot index a map
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(MapKey::Bool(b)),
            Value::Int(i) => Some(MapKey::Int(i)),
            Value::String(s) => Some(MapKey::String(s)),
            Value::Binary(b) => Some(MapKey::Binary(b)),
            _ => None,
        }
    }

    /// The key as a plain value, for encoding through the key codec
    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Bool(b) => Value::Bool(*b),
            MapKey::Int(i) => Value::Int(*i),
            MapKey::String(s) => Value::String(s.clone()),
            MapKey::Binary(b) => Value::Binary(b.clone()),
        }
    }
}

impl From<&str> for MapKey {
    fn from(value: &str) -> Self {
        MapKey::String(value.to_owned())
    }
}

impl From<i64> for MapKey {
    fn from(value: i64) -> Self {
        MapKey::Int(value)
    }
}

/// A 64-bit integer as high and low 32-bit words
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Long {
    pub high: i32,
    pub low: i32,
}

impl Long {
    pub fn new(high: i32, low: i32) -> Self {
        Self { high, low }
    }

    pub fn from_i64(value: i64) -> Self {
        Self {
            high: (value >> 32) as i32,
            low: value as i32,
        }
    }

    pub fn to_i64(self) -> i64 {
        (i64::from(self.high) << 32) | i64::from(self.low as u32)
    }

    /// Big-endian wire bytes
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.to_i64().to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
        Self::from_i64(i64::from_be_bytes(bytes))
    }
}
