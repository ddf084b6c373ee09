//! List, set and map codecs

use crate::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
use crate::protocol::{TypeId, WireReader, WireWriter};
use crate::registry::{MapRepr, TypeKey, TypeRegistry};
use crate::value::{MapKey, Value};

use super::{CodecTable, Nested, WireCodec};

/// Which homogeneous collection a [`SequenceCodec`] handles
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SequenceKind {
    List,
    Set,
}

impl SequenceKind {
    fn label(self) -> &'static str {
        match self {
            SequenceKind::List => "list",
            SequenceKind::Set => "set",
        }
    }
}

/// `[elem typeid][count][elements...]`
#[derive(Debug)]
pub(crate) struct SequenceCodec {
    kind: SequenceKind,
    element: Nested,
}

impl SequenceCodec {
    pub(crate) fn new(registry: &TypeRegistry, kind: SequenceKind, element: TypeKey) -> Self {
        Self {
            kind,
            element: Nested::new(registry, element),
        }
    }
}

impl WireCodec for SequenceCodec {
    fn type_id(&self) -> TypeId {
        match self.kind {
            SequenceKind::List => TypeId::List,
            SequenceKind::Set => TypeId::Set,
        }
    }

    fn encode(&self, cx: &CodecTable, value: &Value, writer: &mut WireWriter<'_>) -> EncodeResult<()> {
        let Value::List(items) = value else {
            return Err(EncodeError::invalid(format!(
                "expected a {}, got {}",
                self.kind.label(),
                value.shape()
            )));
        };
        let codec = cx.codec(self.element.key);
        writer.write_type_id(self.element.type_id);
        writer.write_len(items.len())?;
        for item in items {
            codec.encode(cx, item, writer)?;
        }
        Ok(())
    }

    fn decode(&self, cx: &CodecTable, reader: &mut WireReader<'_>) -> DecodeResult<Value> {
        let found = reader.read_u8()?;
        if found != self.element.type_id.as_u8() {
            return Err(DecodeError::ElementTypeidMismatch {
                container: self.kind.label(),
                found,
                expected_name: self.element.name.clone(),
                expected_id: self.element.type_id,
            });
        }
        let count = reader.read_len()?;

        let codec = cx.codec(self.element.key);
        let hint = reader.capacity_hint(count, self.element.type_id.min_width());
        let mut items = Vec::with_capacity(hint);
        reader.enter()?;
        for _ in 0..count {
            items.push(codec.decode(cx, reader)?);
        }
        reader.leave();
        Ok(Value::List(items))
    }
}

/// `[key typeid][value typeid][count][(key, value)...]`
#[derive(Debug)]
pub(crate) struct MapCodec {
    key: Nested,
    value: Nested,
    repr: MapRepr,
}

impl MapCodec {
    pub(crate) fn new(registry: &TypeRegistry, key: TypeKey, value: TypeKey, repr: MapRepr) -> Self {
        Self {
            key: Nested::new(registry, key),
            value: Nested::new(registry, value),
            repr,
        }
    }

    fn write_header(&self, writer: &mut WireWriter<'_>, len: usize) -> EncodeResult<()> {
        writer.write_type_id(self.key.type_id);
        writer.write_type_id(self.value.type_id);
        writer.write_len(len)
    }

    fn read_header(&self, reader: &mut WireReader<'_>) -> DecodeResult<usize> {
        let key = reader.read_u8()?;
        let value = reader.read_u8()?;
        if key != self.key.type_id.as_u8() {
            return Err(DecodeError::MapKeyTypeidMismatch {
                found: key,
                expected_name: self.key.name.clone(),
                expected_id: self.key.type_id,
            });
        }
        if value != self.value.type_id.as_u8() {
            return Err(DecodeError::MapValTypeidMismatch {
                found: value,
                expected_name: self.value.name.clone(),
                expected_id: self.value.type_id,
            });
        }
        reader.read_len()
    }
}

impl WireCodec for MapCodec {
    fn type_id(&self) -> TypeId {
        TypeId::Map
    }

    /// Either in-memory shape is accepted regardless of the declared one.
    fn encode(&self, cx: &CodecTable, value: &Value, writer: &mut WireWriter<'_>) -> EncodeResult<()> {
        let key_codec = cx.codec(self.key.key);
        let value_codec = cx.codec(self.value.key);
        match value {
            Value::Map(entries) => {
                self.write_header(writer, entries.len())?;
                for (key, value) in entries {
                    key_codec.encode(cx, &key.to_value(), writer)?;
                    value_codec.encode(cx, value, writer)?;
                }
            }
            Value::Entries(entries) => {
                self.write_header(writer, entries.len())?;
                for (key, value) in entries {
                    key_codec.encode(cx, key, writer)?;
                    value_codec.encode(cx, value, writer)?;
                }
            }
            other => {
                return Err(EncodeError::invalid(format!(
                    "expected a map, got {}",
                    other.shape()
                )))
            }
        }
        Ok(())
    }

    fn decode(&self, cx: &CodecTable, reader: &mut WireReader<'_>) -> DecodeResult<Value> {
        let count = self.read_header(reader)?;
        let key_codec = cx.codec(self.key.key);
        let value_codec = cx.codec(self.value.key);
        let width = self.key.type_id.min_width() + self.value.type_id.min_width();
        let capacity = reader.capacity_hint(count, width);

        reader.enter()?;
        let decoded = match self.repr {
            MapRepr::Entries => {
                let mut entries = Vec::with_capacity(capacity);
                for _ in 0..count {
                    let key = key_codec.decode(cx, reader)?;
                    let value = value_codec.decode(cx, reader)?;
                    entries.push((key, value));
                }
                Value::Entries(entries)
            }
            MapRepr::Keyed => {
                let mut entries = indexmap::IndexMap::with_capacity(capacity);
                for _ in 0..count {
                    let key = key_codec.decode(cx, reader)?;
                    let key = MapKey::from_value(key).ok_or_else(|| {
                        DecodeError::MapKeyTypeidMismatch {
                            found: self.key.type_id.as_u8(),
                            expected_name: self.key.name.clone(),
                            expected_id: self.key.type_id,
                        }
                    })?;
                    let value = value_codec.decode(cx, reader)?;
                    // Last occurrence wins, first position is kept
                    entries.insert(key, value);
                }
                Value::Map(entries)
            }
        };
        reader.leave();
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::codec::{Codec, Compiler};
    use crate::registry::{BaseType, Declaration, TypeExpr};

    fn codec(target: TypeExpr) -> Codec {
        let registry = TypeRegistry::builder()
            .program(vec![Declaration::typedef("T", target)])
            .build()
            .unwrap();
        Compiler::new(Arc::new(registry)).compile("T").unwrap()
    }

    fn str_i16() -> TypeExpr {
        TypeExpr::map(TypeExpr::base(BaseType::String), TypeExpr::base(BaseType::I16))
    }

    fn str_i16_wire() -> Vec<u8> {
        vec![
            0x0b, 0x06, 0, 0, 0, 3, // string -> i16, 3 entries
            0, 0, 0, 3, b'a', b'b', b'c', 0, 1, //
            0, 0, 0, 3, b'd', b'e', b'f', 0, 2, //
            0, 0, 0, 3, b'g', b'h', b'i', 0, 3,
        ]
    }

    #[test]
    fn test_keyed_map() {
        let codec = codec(str_i16());
        let value = Value::map([
            (MapKey::from("abc"), Value::Int(1)),
            (MapKey::from("def"), Value::Int(2)),
            (MapKey::from("ghi"), Value::Int(3)),
        ]);
        let bytes = codec.encode(&value).unwrap();
        assert_eq!(bytes, str_i16_wire());

        let decoded = codec.decode(&bytes, 0).unwrap();
        assert_eq!(decoded.value, value);
        assert_eq!(decoded.offset, bytes.len());
    }

    #[test]
    fn test_entries_map() {
        let codec = codec(str_i16().annotate("rs.type", "entries"));
        let value = Value::Entries(vec![
            (Value::from("abc"), Value::Int(1)),
            (Value::from("def"), Value::Int(2)),
            (Value::from("ghi"), Value::Int(3)),
        ]);
        let bytes = codec.encode(&value).unwrap();
        assert_eq!(bytes, str_i16_wire());
        assert_eq!(codec.decode(&bytes, 0).unwrap().value, value);
    }

    #[test]
    fn test_keyed_map_last_wins() {
        let codec = codec(str_i16());
        let bytes = [
            0x0b, 0x06, 0, 0, 0, 2, //
            0, 0, 0, 1, b'a', 0, 1, //
            0, 0, 0, 1, b'a', 0, 2,
        ];
        let decoded = codec.decode(&bytes, 0).unwrap();
        assert_eq!(decoded.value, Value::map([(MapKey::from("a"), Value::Int(2))]));
    }

    #[test]
    fn test_map_key_mismatch() {
        let codec = codec(str_i16());
        let err = codec.decode(&[0x09, 0x06, 0, 0, 0, 0], 0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "encoded map key typeid 9 doesn't match expected type \"string\" (id: 11)"
        );
    }

    #[test]
    fn test_map_value_mismatch() {
        let codec = codec(str_i16());
        let err = codec.decode(&[0x0b, 0x09, 0, 0, 0, 0], 0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "encoded map value typeid 9 doesn't match expected type \"i16\" (id: 6)"
        );
        assert_eq!(err.kind(), "thrift-map-val-typeid-mismatch");
    }

    #[test]
    fn test_list_round_trip() {
        let codec = codec(TypeExpr::list(TypeExpr::base(BaseType::I32)));
        let value = Value::List(vec![Value::Int(1), Value::Int(-1)]);
        let bytes = codec.encode(&value).unwrap();
        assert_eq!(
            bytes,
            [0x08, 0, 0, 0, 2, 0, 0, 0, 1, 0xff, 0xff, 0xff, 0xff]
        );
        assert_eq!(codec.decode(&bytes, 0).unwrap().value, value);
    }

    #[test]
    fn test_set_element_mismatch() {
        let codec = codec(TypeExpr::set(TypeExpr::base(BaseType::String)));
        assert_eq!(codec.type_id(), TypeId::Set);
        let err = codec.decode(&[0x09, 0, 0, 0, 0], 0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "encoded set element typeid 9 doesn't match expected type \"string\" (id: 11)"
        );
    }

    #[test]
    fn test_list_element_mismatch() {
        let codec = codec(TypeExpr::list(TypeExpr::base(BaseType::I32)));
        let err = codec.decode(&[0x0b, 0, 0, 0, 0], 0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "encoded list element typeid 11 doesn't match expected type \"i32\" (id: 8)"
        );
        assert_eq!(err.kind(), "thrift-element-typeid-mismatch");
    }

    #[test]
    fn test_map_count_past_end() {
        let codec = codec(str_i16());
        let err = codec
            .decode(&[0x0b, 0x06, 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 0, 0, 1], 0)
            .unwrap_err();
        assert_eq!(err.kind(), "thrift-buffer-underrun");
    }

    #[test]
    fn test_list_count_past_end() {
        let codec = codec(TypeExpr::list(TypeExpr::base(BaseType::I32)));
        let err = codec
            .decode(&[0x08, 0xff, 0xff, 0xff, 0xff, 0, 0, 0, 1], 0)
            .unwrap_err();
        assert_eq!(err.kind(), "thrift-buffer-underrun");
    }

    #[test]
    fn test_nested_lists() {
        let codec = codec(TypeExpr::list(TypeExpr::list(TypeExpr::base(BaseType::Byte))));
        let value = Value::List(vec![
            Value::List(vec![Value::Int(1), Value::Int(2)]),
            Value::List(vec![]),
        ]);
        let bytes = codec.encode(&value).unwrap();
        assert_eq!(
            bytes,
            [0x0f, 0, 0, 0, 2, 0x03, 0, 0, 0, 2, 1, 2, 0x03, 0, 0, 0, 0]
        );
        assert_eq!(codec.decode(&bytes, 0).unwrap().value, value);
    }

    #[test]
    fn test_rejects_non_list() {
        let codec = codec(TypeExpr::list(TypeExpr::base(BaseType::I32)));
        assert_eq!(
            codec.encode(&Value::Int(1)).unwrap_err().to_string(),
            "invalid argument, expected a list, got integer"
        );
    }
}
