//! Thrift codec error types
//!
//! Compile-time, encode-time and decode-time failures live in separate enums
//! so callers can tell schema problems, unusable input values and malformed
//! or mismatched wire bytes apart. Every variant has a stable tag via `kind()`.

use std::borrow::Cow;

use thiserror::Error;

use crate::protocol::TypeId;

/// Which 32-bit word of an i64 an error refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordHalf {
    High,
    Low,
}

/// Errors raised while building the registry or compiling codecs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A type reference names nothing in the registry
    #[error("unknown type \"{name}\"")]
    UnknownType { name: String },

    /// A type name was declared twice
    #[error("duplicate type \"{name}\"")]
    DuplicateType { name: String },

    /// Two fields of one struct share an id
    #[error("duplicate field id {id} in \"{struct_name}\" (fields \"{first}\" and \"{second}\")")]
    DuplicateFieldId {
        struct_name: String,
        id: i16,
        first: String,
        second: String,
    },

    /// Two enum constants share a name
    #[error("duplicate name \"{name}\" in enum \"{enum_name}\"")]
    DuplicateEnumName { enum_name: String, name: String },

    /// Two enum constants share a value
    #[error("duplicate value {value} in enum \"{enum_name}\" (\"{first}\" and \"{second}\")")]
    DuplicateEnumValue {
        enum_name: String,
        value: i32,
        first: String,
        second: String,
    },

    /// An implicit enum value would follow `i32::MAX`
    #[error("implicit value of \"{name}\" in enum \"{enum_name}\" overflows i32")]
    EnumValueOverflow { enum_name: String, name: String },

    /// A representation annotation carries a value we do not know
    #[error("{message}")]
    InvalidAnnotation { message: String },

    /// A chain of typedefs loops back on itself
    #[error("typedef cycle through \"{name}\"")]
    TypedefCycle { name: String },

    /// A keyed map was declared over a key type that cannot index a host map
    #[error("map key type \"{key_type}\" cannot be a map key, annotate the map with \"entries\"")]
    UnhashableMapKey { key_type: String },

    /// A default value references an unknown constant
    #[error("unknown constant \"{name}\"")]
    UnknownConstant { name: String },
}

impl CompileError {
    /// Stable machine-readable tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownType { .. } => "thrift-unknown-type",
            Self::DuplicateType { .. } => "thrift-duplicate-type",
            Self::DuplicateFieldId { .. } => "thrift-duplicate-field-id",
            Self::DuplicateEnumName { .. } => "thrift-duplicate-enum-name",
            Self::DuplicateEnumValue { .. } => "thrift-duplicate-enum-value",
            Self::EnumValueOverflow { .. } => "thrift-enum-value-overflow",
            Self::InvalidAnnotation { .. } => "thrift-invalid-annotation",
            Self::TypedefCycle { .. } => "thrift-typedef-cycle",
            Self::UnhashableMapKey { .. } => "thrift-unhashable-map-key",
            Self::UnknownConstant { .. } => "thrift-unknown-constant",
        }
    }
}

/// Errors raised while coercing a value into wire bytes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The value matches none of the representations its type accepts
    #[error("invalid argument, {message}")]
    InvalidArgument {
        message: Cow<'static, str>,
        /// Set when an i64 coercion failed on one specific word
        half: Option<WordHalf>,
    },

    /// A union value did not carry exactly one field
    #[error("union \"{union_name}\" must have exactly one field set, found {set}")]
    UnionEncode { union_name: String, set: usize },
}

impl EncodeError {
    pub(crate) fn invalid(message: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            half: None,
        }
    }

    pub(crate) fn invalid_half(message: &'static str, half: WordHalf) -> Self {
        Self::InvalidArgument {
            message: Cow::Borrowed(message),
            half: Some(half),
        }
    }

    /// Stable machine-readable tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "thrift-invalid-argument",
            Self::UnionEncode { .. } => "thrift-union-encode",
        }
    }
}

/// Errors raised while reading wire bytes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Tried to read past the end of the buffer
    #[error("buffer underrun at offset {offset}: needed {needed} bytes, {available} available")]
    BufferUnderrun {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A list or set header names a different element type
    #[error("encoded {container} element typeid {found} doesn't match expected type \"{expected_name}\" (id: {expected_id})")]
    ElementTypeidMismatch {
        container: &'static str,
        found: u8,
        expected_name: String,
        expected_id: TypeId,
    },

    /// A map header names a different key type
    #[error("encoded map key typeid {found} doesn't match expected type \"{expected_name}\" (id: {expected_id})")]
    MapKeyTypeidMismatch {
        found: u8,
        expected_name: String,
        expected_id: TypeId,
    },

    /// A map header names a different value type
    #[error("encoded map value typeid {found} doesn't match expected type \"{expected_name}\" (id: {expected_id})")]
    MapValTypeidMismatch {
        found: u8,
        expected_name: String,
        expected_id: TypeId,
    },

    /// A known field arrived with a different type
    #[error("encoded typeid {found} of field \"{field}\" (id: {field_id}) in \"{struct_name}\" doesn't match expected type \"{expected_name}\" (id: {expected_id})")]
    FieldTypeidMismatch {
        struct_name: String,
        field: String,
        field_id: i16,
        found: u8,
        expected_name: String,
        expected_id: TypeId,
    },

    /// A required field without a default never arrived
    #[error("missing required field \"{field}\" in \"{struct_name}\"")]
    MissingRequiredField { struct_name: String, field: String },

    /// A union arrived with zero fields or more than one field
    #[error("invalid union \"{union_name}\": {reason}")]
    UnionDecode { union_name: String, reason: String },

    /// String bytes are not UTF-8
    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    /// A type id byte that no Thrift type uses
    #[error("unknown typeid {typeid} at offset {offset}")]
    UnknownTypeid { typeid: u8, offset: usize },

    /// An i32 that names no constant of the enum
    #[error("value {value} is not a member of enum \"{enum_name}\"")]
    UnknownEnumValue { enum_name: String, value: i32 },

    /// A timestamp outside the range chrono can represent
    #[error("timestamp {millis}ms is out of range")]
    TimestampOutOfRange { millis: i64 },

    /// Nesting deeper than the configured limit
    #[error("recursion depth exceeded (max {max})")]
    RecursionDepthExceeded { max: usize },
}

impl DecodeError {
    /// Stable machine-readable tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BufferUnderrun { .. } => "thrift-buffer-underrun",
            Self::ElementTypeidMismatch { .. } => "thrift-element-typeid-mismatch",
            Self::MapKeyTypeidMismatch { .. } => "thrift-map-key-typeid-mismatch",
            Self::MapValTypeidMismatch { .. } => "thrift-map-val-typeid-mismatch",
            Self::FieldTypeidMismatch { .. } => "thrift-field-typeid-mismatch",
            Self::MissingRequiredField { .. } => "thrift-missing-required-field",
            Self::UnionDecode { .. } => "thrift-union-decode",
            Self::InvalidUtf8 { .. } => "thrift-invalid-utf8",
            Self::UnknownTypeid { .. } => "thrift-unknown-typeid",
            Self::UnknownEnumValue { .. } => "thrift-unknown-enum-value",
            Self::TimestampOutOfRange { .. } => "thrift-timestamp-out-of-range",
            Self::RecursionDepthExceeded { .. } => "thrift-recursion-depth-exceeded",
        }
    }
}

/// Result type for registry and compiler operations
pub type CompileResult<T> = std::result::Result<T, CompileError>;

/// Result type for encoding
pub type EncodeResult<T> = std::result::Result<T, EncodeError>;

/// Result type for decoding
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_message() {
        let err = EncodeError::invalid("expected i64 representation");
        assert_eq!(
            err.to_string(),
            "invalid argument, expected i64 representation"
        );
        assert_eq!(err.kind(), "thrift-invalid-argument");
    }

    #[test]
    fn test_map_key_mismatch_message() {
        let err = DecodeError::MapKeyTypeidMismatch {
            found: 9,
            expected_name: "string".to_string(),
            expected_id: TypeId::String,
        };
        assert_eq!(
            err.to_string(),
            "encoded map key typeid 9 doesn't match expected type \"string\" (id: 11)"
        );
        assert_eq!(err.kind(), "thrift-map-key-typeid-mismatch");
    }
}
