//! Struct, union and exception codec
//!
//! Fields are written in declaration order as
//! `[typeid][field id: i16][value]` and closed by STOP. On decode, fields
//! may arrive in any order; ids this codec does not know are skipped.

use rustc_hash::FxHashMap;

use crate::error::{DecodeError, DecodeResult, EncodeError, EncodeResult};
use crate::protocol::{TypeId, WireReader, WireWriter};
use crate::registry::{Requiredness, StructDescriptor, StructFlavor, TypeRegistry};
use crate::value::{Record, Value};

use super::{CodecTable, Nested, WireCodec};

#[derive(Debug)]
struct FieldCodec {
    id: i16,
    name: String,
    ty: Nested,
    requiredness: Requiredness,
    default: Option<Value>,
}

#[derive(Debug)]
pub(crate) struct StructCodec {
    name: String,
    flavor: StructFlavor,
    fields: Vec<FieldCodec>,
    by_id: FxHashMap<i16, usize>,
}

impl StructCodec {
    pub(crate) fn new(registry: &TypeRegistry, name: &str, desc: &StructDescriptor) -> Self {
        let fields: Vec<FieldCodec> = desc
            .fields
            .iter()
            .map(|field| FieldCodec {
                id: field.id,
                name: field.name.clone(),
                ty: Nested::new(registry, field.ty),
                requiredness: field.requiredness,
                default: field.default.clone(),
            })
            .collect();
        let by_id = fields
            .iter()
            .enumerate()
            .map(|(index, field)| (field.id, index))
            .collect();

        Self {
            name: name.to_string(),
            flavor: desc.flavor,
            fields,
            by_id,
        }
    }

    fn encode_field(
        &self,
        cx: &CodecTable,
        field: &FieldCodec,
        value: &Value,
        writer: &mut WireWriter<'_>,
    ) -> EncodeResult<()> {
        writer.write_field_header(field.ty.type_id, field.id);
        cx.codec(field.ty.key).encode(cx, value, writer)
    }

    fn encode_union(
        &self,
        cx: &CodecTable,
        record: &Record,
        writer: &mut WireWriter<'_>,
    ) -> EncodeResult<()> {
        let mut set = self
            .fields
            .iter()
            .filter_map(|field| match record.get(&field.name) {
                Some(value) if !value.is_null() => Some((field, value)),
                _ => None,
            });
        match (set.next(), set.count()) {
            (Some((field, value)), 0) => self.encode_field(cx, field, value, writer),
            (first, rest) => Err(EncodeError::UnionEncode {
                union_name: self.name.clone(),
                set: usize::from(first.is_some()) + rest,
            }),
        }
    }

    fn encode_struct(
        &self,
        cx: &CodecTable,
        record: &Record,
        writer: &mut WireWriter<'_>,
    ) -> EncodeResult<()> {
        for field in &self.fields {
            let value = match record.get(&field.name) {
                Some(value) if !value.is_null() => value,
                _ => match (&field.default, field.requiredness) {
                    (Some(default), _) => default,
                    (None, Requiredness::Required) => {
                        return Err(EncodeError::invalid(format!(
                            "missing required field \"{}\" in \"{}\"",
                            field.name, self.name
                        )))
                    }
                    (None, _) => continue,
                },
            };
            self.encode_field(cx, field, value, writer)?;
        }
        Ok(())
    }

    /// Fill in defaults and check required fields once STOP has been read
    fn finish(&self, record: &mut Record) -> DecodeResult<()> {
        if self.flavor == StructFlavor::Union {
            if record.is_empty() {
                return Err(DecodeError::UnionDecode {
                    union_name: self.name.clone(),
                    reason: "no field set".to_string(),
                });
            }
            return Ok(());
        }

        for field in &self.fields {
            if record.contains_key(&field.name) {
                continue;
            }
            match (&field.default, field.requiredness) {
                (Some(default), _) => {
                    record.insert(field.name.clone(), default.clone());
                }
                (None, Requiredness::Required) => {
                    return Err(DecodeError::MissingRequiredField {
                        struct_name: self.name.clone(),
                        field: field.name.clone(),
                    })
                }
                (None, _) => {}
            }
        }
        Ok(())
    }
}

impl WireCodec for StructCodec {
    fn type_id(&self) -> TypeId {
        TypeId::Struct
    }

    fn encode(&self, cx: &CodecTable, value: &Value, writer: &mut WireWriter<'_>) -> EncodeResult<()> {
        let Value::Struct(record) = value else {
            return Err(EncodeError::invalid(format!(
                "expected a struct \"{}\", got {}",
                self.name,
                value.shape()
            )));
        };
        match self.flavor {
            StructFlavor::Union => self.encode_union(cx, record, writer)?,
            StructFlavor::Struct | StructFlavor::Exception => {
                self.encode_struct(cx, record, writer)?
            }
        }
        writer.write_stop();
        Ok(())
    }

    fn decode(&self, cx: &CodecTable, reader: &mut WireReader<'_>) -> DecodeResult<Value> {
        reader.enter()?;
        let mut record = Record::with_capacity(self.fields.len());
        loop {
            let typeid = reader.read_u8()?;
            if typeid == TypeId::Stop.as_u8() {
                break;
            }
            let id = reader.read_i16()?;

            let Some(&index) = self.by_id.get(&id) else {
                tracing::trace!("Skipping unknown field {} (typeid {}) in {}", id, typeid, self.name);
                reader.skip(typeid)?;
                continue;
            };
            let field = &self.fields[index];
            if typeid != field.ty.type_id.as_u8() {
                return Err(DecodeError::FieldTypeidMismatch {
                    struct_name: self.name.clone(),
                    field: field.name.clone(),
                    field_id: id,
                    found: typeid,
                    expected_name: field.ty.name.clone(),
                    expected_id: field.ty.type_id,
                });
            }
            if self.flavor == StructFlavor::Union && !record.is_empty() {
                return Err(DecodeError::UnionDecode {
                    union_name: self.name.clone(),
                    reason: format!("second field \"{}\" (id: {})", field.name, id),
                });
            }

            let value = cx.codec(field.ty.key).decode(cx, reader)?;
            record.insert(field.name.clone(), value);
        }
        reader.leave();

        self.finish(&mut record)?;
        Ok(Value::Struct(record))
    }
}
