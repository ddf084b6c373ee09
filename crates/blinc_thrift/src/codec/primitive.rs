//! Fixed-layout primitive codecs

use crate::error::{DecodeResult, EncodeError, EncodeResult};
use crate::protocol::{TypeId, WireReader, WireWriter};
use crate::value::Value;

use super::{CodecTable, WireCodec};

fn expected(what: &str, value: &Value) -> EncodeError {
    EncodeError::invalid(format!("expected {what}, got {}", value.shape()))
}

#[derive(Debug)]
pub(crate) struct BoolCodec;

impl WireCodec for BoolCodec {
    fn type_id(&self) -> TypeId {
        TypeId::Bool
    }

    fn encode(&self, _cx: &CodecTable, value: &Value, writer: &mut WireWriter<'_>) -> EncodeResult<()> {
        match value {
            Value::Bool(b) => {
                writer.write_bool(*b);
                Ok(())
            }
            other => Err(expected("a bool", other)),
        }
    }

    fn decode(&self, _cx: &CodecTable, reader: &mut WireReader<'_>) -> DecodeResult<Value> {
        Ok(Value::Bool(reader.read_bool()?))
    }
}

/// Width of a fixed-size signed integer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum IntWidth {
    I8,
    I16,
    I32,
}

impl IntWidth {
    fn bounds(self) -> (i64, i64) {
        match self {
            IntWidth::I8 => (i64::from(i8::MIN), i64::from(i8::MAX)),
            IntWidth::I16 => (i64::from(i16::MIN), i64::from(i16::MAX)),
            IntWidth::I32 => (i64::from(i32::MIN), i64::from(i32::MAX)),
        }
    }

    fn name(self) -> &'static str {
        match self {
            IntWidth::I8 => "byte",
            IntWidth::I16 => "i16",
            IntWidth::I32 => "i32",
        }
    }
}

/// `byte`, `i16` and `i32`
#[derive(Debug)]
pub(crate) struct IntCodec {
    width: IntWidth,
}

impl IntCodec {
    pub(crate) fn new(width: IntWidth) -> Self {
        Self { width }
    }
}

impl WireCodec for IntCodec {
    fn type_id(&self) -> TypeId {
        match self.width {
            IntWidth::I8 => TypeId::I8,
            IntWidth::I16 => TypeId::I16,
            IntWidth::I32 => TypeId::I32,
        }
    }

    fn encode(&self, _cx: &CodecTable, value: &Value, writer: &mut WireWriter<'_>) -> EncodeResult<()> {
        let (min, max) = self.width.bounds();
        let n = match value {
            Value::Int(n) if (min..=max).contains(n) => *n,
            Value::Int(n) => {
                return Err(EncodeError::invalid(format!(
                    "expected {} in [{min}, {max}], got {n}",
                    self.width.name()
                )))
            }
            other => return Err(expected(&format!("an integer ({})", self.width.name()), other)),
        };
        // Range checked above.
        match self.width {
            IntWidth::I8 => writer.write_i8(n as i8),
            IntWidth::I16 => writer.write_i16(n as i16),
            IntWidth::I32 => writer.write_i32(n as i32),
        }
        Ok(())
    }

    fn decode(&self, _cx: &CodecTable, reader: &mut WireReader<'_>) -> DecodeResult<Value> {
        let n = match self.width {
            IntWidth::I8 => i64::from(reader.read_i8()?),
            IntWidth::I16 => i64::from(reader.read_i16()?),
            IntWidth::I32 => i64::from(reader.read_i32()?),
        };
        Ok(Value::Int(n))
    }
}

#[derive(Debug)]
pub(crate) struct DoubleCodec;

impl WireCodec for DoubleCodec {
    fn type_id(&self) -> TypeId {
        TypeId::Double
    }

    fn encode(&self, _cx: &CodecTable, value: &Value, writer: &mut WireWriter<'_>) -> EncodeResult<()> {
        let n = match value {
            Value::Double(n) => *n,
            Value::Int(n) => *n as f64,
            other => return Err(expected("a double", other)),
        };
        writer.write_f64(n);
        Ok(())
    }

    fn decode(&self, _cx: &CodecTable, reader: &mut WireReader<'_>) -> DecodeResult<Value> {
        Ok(Value::Double(reader.read_f64()?))
    }
}

#[derive(Debug)]
pub(crate) struct StringCodec;

impl WireCodec for StringCodec {
    fn type_id(&self) -> TypeId {
        TypeId::String
    }

    fn encode(&self, _cx: &CodecTable, value: &Value, writer: &mut WireWriter<'_>) -> EncodeResult<()> {
        match value {
            Value::String(s) => writer.write_binary(s.as_bytes()),
            other => Err(expected("a string", other)),
        }
    }

    fn decode(&self, _cx: &CodecTable, reader: &mut WireReader<'_>) -> DecodeResult<Value> {
        Ok(Value::String(reader.read_string()?))
    }
}

/// Opaque bytes; strings are accepted and written as their UTF-8 bytes
#[derive(Debug)]
pub(crate) struct BinaryCodec;

impl WireCodec for BinaryCodec {
    fn type_id(&self) -> TypeId {
        TypeId::String
    }

    fn encode(&self, _cx: &CodecTable, value: &Value, writer: &mut WireWriter<'_>) -> EncodeResult<()> {
        match value {
            Value::Binary(b) => writer.write_binary(b),
            Value::String(s) => writer.write_binary(s.as_bytes()),
            other => Err(expected("binary", other)),
        }
    }

    fn decode(&self, _cx: &CodecTable, reader: &mut WireReader<'_>) -> DecodeResult<Value> {
        Ok(Value::Binary(reader.read_binary()?.to_vec()))
    }
}
