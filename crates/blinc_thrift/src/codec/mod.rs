//! Codec compiler
//!
//! A [`Compiler`] turns registry descriptors into [`Codec`]s. Each descriptor
//! is compiled at most once; the resulting node is shared by every codec that
//! reaches it. Nodes refer to nested types by [`TypeKey`] and look them up in
//! the codec's table at call time, which is how recursive structs compile
//! without building an infinite tree.
//!
//! ```ignore
//! let mut compiler = Compiler::new(Arc::new(registry));
//! let codec = compiler.compile("Point")?;
//!
//! let bytes = codec.encode(&Value::record([("x", 1.into()), ("y", 2.into())]))?;
//! let decoded = codec.decode(&bytes, 0)?;
//! assert_eq!(decoded.offset, bytes.len());
//! ```

mod collection;
mod enumeration;
pub mod int64;
mod primitive;
mod structure;

use std::fmt;
use std::sync::Arc;

use slotmap::SecondaryMap;

use crate::error::{CompileError, CompileResult, DecodeResult, EncodeResult};
use crate::protocol::{TypeId, WireReader, WireWriter};
use crate::registry::{TypeKey, TypeKind, TypeRegistry};
use crate::value::Value;

use collection::{MapCodec, SequenceCodec, SequenceKind};
use enumeration::EnumCodec;
use int64::I64Codec;
use primitive::{BinaryCodec, BoolCodec, DoubleCodec, IntCodec, IntWidth, StringCodec};
use structure::StructCodec;

/// Encode/decode behaviour of one resolved type
pub(crate) trait WireCodec: fmt::Debug + Send + Sync {
    /// Wire id written in struct field and collection headers
    fn type_id(&self) -> TypeId;

    fn encode(&self, cx: &CodecTable, value: &Value, writer: &mut WireWriter<'_>) -> EncodeResult<()>;

    fn decode(&self, cx: &CodecTable, reader: &mut WireReader<'_>) -> DecodeResult<Value>;
}

/// Codecs reachable from one root, by key
#[derive(Debug)]
pub(crate) struct CodecTable {
    codecs: SecondaryMap<TypeKey, Arc<dyn WireCodec>>,
    max_depth: usize,
}

impl CodecTable {
    /// Codec of a type reachable from this table's root
    pub(crate) fn codec(&self, key: TypeKey) -> &dyn WireCodec {
        self.codecs[key].as_ref()
    }
}

/// Result of a decode: the value and the offset just past it
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded {
    pub value: Value,
    pub offset: usize,
}

/// Compiled encoder/decoder for one Thrift type
///
/// Cheap to clone, holds no per-call state and may be used from many threads
/// at once.
#[derive(Clone, Debug)]
pub struct Codec {
    table: Arc<CodecTable>,
    root: TypeKey,
    name: Arc<str>,
}

impl Codec {
    /// Name of the compiled type
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire type id of the compiled type
    pub fn type_id(&self) -> TypeId {
        self.table.codec(self.root).type_id()
    }

    /// Encode a value into a fresh buffer
    pub fn encode(&self, value: &Value) -> EncodeResult<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_into(value, &mut out)?;
        Ok(out)
    }

    /// Append the encoding of `value` to `out`, returning the bytes written
    ///
    /// On failure `out` is left as it was.
    pub fn encode_into(&self, value: &Value, out: &mut Vec<u8>) -> EncodeResult<usize> {
        let mut writer = WireWriter::new(out);
        match self.table.codec(self.root).encode(&self.table, value, &mut writer) {
            Ok(()) => Ok(writer.written()),
            Err(err) => {
                writer.rollback();
                Err(err)
            }
        }
    }

    /// Decode one value starting at `offset`
    pub fn decode(&self, bytes: &[u8], offset: usize) -> DecodeResult<Decoded> {
        let mut reader = WireReader::new(bytes, offset).with_max_depth(self.table.max_depth);
        let value = self.table.codec(self.root).decode(&self.table, &mut reader)?;
        Ok(Decoded {
            value,
            offset: reader.offset(),
        })
    }
}

/// Compiles and memoizes codecs for the types of one registry
#[derive(Debug)]
pub struct Compiler {
    registry: Arc<TypeRegistry>,
    memo: SecondaryMap<TypeKey, Arc<dyn WireCodec>>,
}

impl Compiler {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            memo: SecondaryMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Compile a declared type by name
    pub fn compile(&mut self, name: &str) -> CompileResult<Codec> {
        let key = self.registry.lookup(name)?;
        self.compile_key(key)
    }

    /// Compile a type by key, e.g. an anonymous collection type
    ///
    /// The key must come from this compiler's registry.
    pub fn compile_key(&mut self, key: TypeKey) -> CompileResult<Codec> {
        if self.registry.get(key).is_none() {
            return Err(CompileError::UnknownType {
                name: format!("{key:?}"),
            });
        }
        let root = self.registry.resolve(key);
        let mut codecs: SecondaryMap<TypeKey, Arc<dyn WireCodec>> = SecondaryMap::new();
        let mut pending = vec![root];
        let mut built = 0usize;

        while let Some(key) = pending.pop() {
            if codecs.contains_key(key) {
                continue;
            }
            let codec = match self.memo.get(key) {
                Some(codec) => codec.clone(),
                None => {
                    let codec = self.build(key);
                    self.memo.insert(key, codec.clone());
                    built += 1;
                    codec
                }
            };
            codecs.insert(key, codec);
            pending.extend(self.children(key));
        }

        let name: Arc<str> = Arc::from(self.registry.descriptor(key).name.as_str());
        tracing::debug!(
            "Compiled codec {}: {} linked, {} newly built",
            name,
            codecs.len(),
            built
        );

        Ok(Codec {
            table: Arc::new(CodecTable {
                codecs,
                max_depth: self.registry.config().max_depth,
            }),
            root,
            name,
        })
    }

    /// Resolved keys of the types nested directly inside `key`
    fn children(&self, key: TypeKey) -> Vec<TypeKey> {
        let registry = &self.registry;
        match &registry.descriptor(key).kind {
            TypeKind::List { element } | TypeKind::Set { element } => {
                vec![registry.resolve(*element)]
            }
            TypeKind::Map { key, value, .. } => {
                vec![registry.resolve(*key), registry.resolve(*value)]
            }
            TypeKind::Struct(desc) => desc
                .fields
                .iter()
                .map(|field| registry.resolve(field.ty))
                .collect(),
            TypeKind::Typedef { target } => vec![registry.resolve(*target)],
            _ => Vec::new(),
        }
    }

    fn build(&self, key: TypeKey) -> Arc<dyn WireCodec> {
        let registry = &self.registry;
        let desc = registry.descriptor(key);
        match &desc.kind {
            TypeKind::Bool => Arc::new(BoolCodec),
            TypeKind::Byte => Arc::new(IntCodec::new(IntWidth::I8)),
            TypeKind::I16 => Arc::new(IntCodec::new(IntWidth::I16)),
            TypeKind::I32 => Arc::new(IntCodec::new(IntWidth::I32)),
            TypeKind::I64(repr) => Arc::new(I64Codec::new(*repr)),
            TypeKind::Double => Arc::new(DoubleCodec),
            TypeKind::String => Arc::new(StringCodec),
            TypeKind::Binary => Arc::new(BinaryCodec),
            TypeKind::Enum(constants) => Arc::new(EnumCodec::new(&desc.name, constants.clone())),
            TypeKind::Typedef { target } => self.build(registry.resolve(*target)),
            TypeKind::List { element } => Arc::new(SequenceCodec::new(
                registry,
                SequenceKind::List,
                *element,
            )),
            TypeKind::Set { element } => Arc::new(SequenceCodec::new(
                registry,
                SequenceKind::Set,
                *element,
            )),
            TypeKind::Map { key, value, repr } => {
                Arc::new(MapCodec::new(registry, *key, *value, *repr))
            }
            TypeKind::Struct(fields) => Arc::new(StructCodec::new(registry, &desc.name, fields)),
        }
    }
}

/// Name and wire id of a nested type, for headers and mismatch errors
#[derive(Clone, Debug)]
pub(crate) struct Nested {
    pub key: TypeKey,
    pub type_id: TypeId,
    pub name: String,
}

impl Nested {
    pub(crate) fn new(registry: &TypeRegistry, key: TypeKey) -> Self {
        let key = registry.resolve(key);
        Self {
            key,
            type_id: registry.type_id(key),
            name: registry.descriptor(key).name.clone(),
        }
    }
}
