//! Enum codec: an i32 on the wire, the constant name in memory

use crate::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
use crate::protocol::{TypeId, WireReader, WireWriter};
use crate::registry::EnumDescriptor;
use crate::value::Value;

use super::{CodecTable, WireCodec};

#[derive(Debug)]
pub(crate) struct EnumCodec {
    name: String,
    constants: EnumDescriptor,
}

impl EnumCodec {
    pub(crate) fn new(name: &str, constants: EnumDescriptor) -> Self {
        Self {
            name: name.to_string(),
            constants,
        }
    }

    fn value_of(&self, value: &Value) -> Option<i32> {
        match value {
            Value::String(name) => self.constants.value_of(name),
            Value::Int(n) => {
                let n = i32::try_from(*n).ok()?;
                self.constants.name_of(n).map(|_| n)
            }
            _ => None,
        }
    }
}

impl WireCodec for EnumCodec {
    fn type_id(&self) -> TypeId {
        TypeId::I32
    }

    fn encode(&self, _cx: &CodecTable, value: &Value, writer: &mut WireWriter<'_>) -> EncodeResult<()> {
        let n = self.value_of(value).ok_or_else(|| {
            EncodeError::invalid(format!("expected a name of enum \"{}\"", self.name))
        })?;
        writer.write_i32(n);
        Ok(())
    }

    fn decode(&self, _cx: &CodecTable, reader: &mut WireReader<'_>) -> DecodeResult<Value> {
        let value = reader.read_i32()?;
        match self.constants.name_of(value) {
            Some(name) => Ok(Value::String(name.to_string())),
            None => Err(DecodeError::UnknownEnumValue {
                enum_name: self.name.clone(),
                value,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::codec::{Codec, Compiler};
    use crate::registry::{Declaration, EnumConstant, TypeRegistry};

    fn color() -> Codec {
        let registry = TypeRegistry::builder()
            .program(vec![Declaration::enumeration(
                "Color",
                vec![
                    EnumConstant::new("RED", None),
                    EnumConstant::new("GREEN", Some(7)),
                    EnumConstant::new("BLUE", None),
                ],
            )])
            .build()
            .unwrap();
        Compiler::new(Arc::new(registry)).compile("Color").unwrap()
    }

    #[test]
    fn test_encode_by_name_or_value() {
        let codec = color();
        assert_eq!(codec.type_id(), TypeId::I32);
        assert_eq!(codec.encode(&Value::from("GREEN")).unwrap(), [0, 0, 0, 7]);
        assert_eq!(codec.encode(&Value::Int(8)).unwrap(), [0, 0, 0, 8]);
    }

    #[test]
    fn test_decode_to_name() {
        let codec = color();
        let decoded = codec.decode(&[0, 0, 0, 8], 0).unwrap();
        assert_eq!(decoded.value, Value::from("BLUE"));
        assert_eq!(decoded.offset, 4);
    }

    #[test]
    fn test_rejects_undeclared() {
        let codec = color();
        assert_eq!(
            codec.encode(&Value::from("PURPLE")).unwrap_err().to_string(),
            "invalid argument, expected a name of enum \"Color\""
        );
        assert!(codec.encode(&Value::Int(3)).is_err());
        assert_eq!(
            codec.decode(&[0, 0, 0, 3], 0).unwrap_err(),
            DecodeError::UnknownEnumValue {
                enum_name: "Color".into(),
                value: 3,
            }
        );
    }
}
