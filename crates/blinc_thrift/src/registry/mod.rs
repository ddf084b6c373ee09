//! Type registry
//!
//! Resolved declarations live in an arena of [`TypeDescriptor`]s addressed by
//! [`TypeKey`]. Descriptors refer to each other by key, never by pointer, so
//! recursive and mutually recursive structs need no special casing.
//!
//! The registry is assembled by a [`RegistryBuilder`] and never changes after
//! [`RegistryBuilder::build`] returns. Share it behind an `Arc`.
//!
//! ```ignore
//! use blinc_thrift::registry::{Declaration, FieldDecl, TypeExpr, BaseType, TypeRegistry};
//!
//! let registry = TypeRegistry::builder()
//!     .program(vec![Declaration::structure(
//!         "Point",
//!         vec![
//!             FieldDecl::new(1, "x", TypeExpr::base(BaseType::I32)).required(),
//!             FieldDecl::new(2, "y", TypeExpr::base(BaseType::I32)).required(),
//!         ],
//!     )])
//!     .build()?;
//! let point = registry.lookup("Point")?;
//! ```

mod builder;
mod declaration;

pub use builder::RegistryBuilder;
pub use declaration::{
    Annotations, BaseType, ConstValue, Declaration, EnumConstant, FieldDecl, Requiredness,
    StructFlavor, TypeExpr,
};

use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

use crate::config::ThriftConfig;
use crate::error::{CompileError, CompileResult};
use crate::protocol::TypeId;
use crate::value::Value;

new_key_type! {
    /// Stable identifier of a type in a registry
    pub struct TypeKey;
}

/// In-memory shape of an `i64`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum I64Repr {
    /// 8 raw big-endian bytes
    #[default]
    Bytes,
    /// High and low 32-bit words
    Long,
    /// Milliseconds since the Unix epoch
    Timestamp,
}

impl I64Repr {
    pub(crate) fn from_annotation(value: &str) -> CompileResult<Self> {
        match value {
            "bytes" => Ok(I64Repr::Bytes),
            "long" => Ok(I64Repr::Long),
            "timestamp" => Ok(I64Repr::Timestamp),
            other => Err(CompileError::InvalidAnnotation {
                message: format!("unexpected i64 type annotation \"{other}\""),
            }),
        }
    }
}

/// In-memory shape of a `map`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MapRepr {
    /// [`Value::Map`], keys must be host-hashable
    #[default]
    Keyed,
    /// [`Value::Entries`], ordered pairs
    Entries,
}

impl MapRepr {
    pub(crate) fn from_annotation(value: &str) -> CompileResult<Self> {
        match value {
            "entries" => Ok(MapRepr::Entries),
            other => Err(CompileError::InvalidAnnotation {
                message: format!("unexpected map type annotation \"{other}\""),
            }),
        }
    }
}

/// A resolved Thrift type
#[derive(Clone, Debug, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub kind: TypeKind,
}

/// Kind-specific payload of a descriptor
#[derive(Clone, Debug, PartialEq)]
pub enum TypeKind {
    Bool,
    Byte,
    I16,
    I32,
    I64(I64Repr),
    Double,
    String,
    Binary,
    Enum(EnumDescriptor),
    Typedef { target: TypeKey },
    Struct(StructDescriptor),
    List { element: TypeKey },
    Set { element: TypeKey },
    Map {
        key: TypeKey,
        value: TypeKey,
        repr: MapRepr,
    },
}

impl TypeKind {
    /// Wire id, or `None` for a typedef which takes its target's id
    pub fn direct_type_id(&self) -> Option<TypeId> {
        Some(match self {
            TypeKind::Bool => TypeId::Bool,
            TypeKind::Byte => TypeId::I8,
            TypeKind::I16 => TypeId::I16,
            TypeKind::I32 | TypeKind::Enum(_) => TypeId::I32,
            TypeKind::I64(_) => TypeId::I64,
            TypeKind::Double => TypeId::Double,
            TypeKind::String | TypeKind::Binary => TypeId::String,
            TypeKind::Struct(_) => TypeId::Struct,
            TypeKind::List { .. } => TypeId::List,
            TypeKind::Set { .. } => TypeId::Set,
            TypeKind::Map { .. } => TypeId::Map,
            TypeKind::Typedef { .. } => return None,
        })
    }
}

/// Constants of an enum
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EnumDescriptor {
    constants: Vec<(String, i32)>,
    by_name: FxHashMap<String, i32>,
    by_value: FxHashMap<i32, usize>,
}

impl EnumDescriptor {
    /// Assign values and check uniqueness
    pub(crate) fn new(enum_name: &str, constants: &[EnumConstant]) -> CompileResult<Self> {
        let mut out = EnumDescriptor::default();
        // None once an explicit value of i32::MAX leaves no successor
        let mut next = Some(0i32);
        for constant in constants {
            let value = constant
                .value
                .or(next)
                .ok_or_else(|| CompileError::EnumValueOverflow {
                    enum_name: enum_name.to_string(),
                    name: constant.name.clone(),
                })?;
            next = value.checked_add(1);

            if out.by_name.contains_key(&constant.name) {
                return Err(CompileError::DuplicateEnumName {
                    enum_name: enum_name.to_string(),
                    name: constant.name.clone(),
                });
            }
            if let Some(&index) = out.by_value.get(&value) {
                return Err(CompileError::DuplicateEnumValue {
                    enum_name: enum_name.to_string(),
                    value,
                    first: out.constants[index].0.clone(),
                    second: constant.name.clone(),
                });
            }

            out.by_name.insert(constant.name.clone(), value);
            out.by_value.insert(value, out.constants.len());
            out.constants.push((constant.name.clone(), value));
        }
        Ok(out)
    }

    /// Value of a named constant
    pub fn value_of(&self, name: &str) -> Option<i32> {
        self.by_name.get(name).copied()
    }

    /// Name of the constant with this value
    pub fn name_of(&self, value: i32) -> Option<&str> {
        self.by_value
            .get(&value)
            .map(|&index| self.constants[index].0.as_str())
    }

    /// Constants in declaration order
    pub fn constants(&self) -> impl Iterator<Item = (&str, i32)> {
        self.constants.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

/// Fields of a struct, union or exception
#[derive(Clone, Debug, PartialEq)]
pub struct StructDescriptor {
    pub flavor: StructFlavor,
    pub fields: Vec<FieldDescriptor>,
}

/// A resolved struct field
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    pub id: i16,
    pub name: String,
    pub ty: TypeKey,
    pub requiredness: Requiredness,
    pub default: Option<Value>,
}

/// Arena of resolved types, immutable once built
#[derive(Debug)]
pub struct TypeRegistry {
    types: SlotMap<TypeKey, TypeDescriptor>,
    names: FxHashMap<String, TypeKey>,
    consts: FxHashMap<String, Value>,
    config: ThriftConfig,
}

impl TypeRegistry {
    /// Start building a registry with the default configuration
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new(ThriftConfig::default())
    }

    pub(crate) fn from_parts(
        types: SlotMap<TypeKey, TypeDescriptor>,
        names: FxHashMap<String, TypeKey>,
        consts: FxHashMap<String, Value>,
        config: ThriftConfig,
    ) -> Self {
        Self {
            types,
            names,
            consts,
            config,
        }
    }

    /// Key of a declared type (`Name` or `include.Name`)
    pub fn lookup(&self, name: &str) -> CompileResult<TypeKey> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| CompileError::UnknownType {
                name: name.to_string(),
            })
    }

    /// Descriptor behind a key
    pub fn get(&self, key: TypeKey) -> Option<&TypeDescriptor> {
        self.types.get(key)
    }

    /// Descriptor behind a key handed out by this registry
    pub fn descriptor(&self, key: TypeKey) -> &TypeDescriptor {
        &self.types[key]
    }

    /// Follow typedefs to the underlying type
    pub fn resolve(&self, mut key: TypeKey) -> TypeKey {
        // The builder rejects typedef cycles, the bound only guards the loop.
        for _ in 0..=self.types.len() {
            match self.types[key].kind {
                TypeKind::Typedef { target } => key = target,
                _ => break,
            }
        }
        key
    }

    /// Wire type id, looking through typedefs
    pub fn type_id(&self, key: TypeKey) -> TypeId {
        let resolved = self.resolve(key);
        self.types[resolved]
            .kind
            .direct_type_id()
            .unwrap_or(TypeId::Struct)
    }

    /// Value of a declared constant
    pub fn constant(&self, name: &str) -> Option<&Value> {
        self.consts.get(name)
    }

    /// Names of all declared types
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    /// Number of descriptors, including anonymous collection types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn config(&self) -> &ThriftConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_implicit_values() {
        let desc = EnumDescriptor::new(
            "Color",
            &[
                EnumConstant::new("RED", None),
                EnumConstant::new("GREEN", Some(5)),
                EnumConstant::new("BLUE", None),
            ],
        )
        .unwrap();
        assert_eq!(desc.value_of("RED"), Some(0));
        assert_eq!(desc.value_of("BLUE"), Some(6));
        assert_eq!(desc.name_of(5), Some("GREEN"));
        assert_eq!(desc.name_of(1), None);
    }

    #[test]
    fn test_enum_duplicates() {
        let err = EnumDescriptor::new(
            "E",
            &[EnumConstant::new("A", None), EnumConstant::new("A", Some(3))],
        )
        .unwrap_err();
        assert_eq!(err.kind(), "thrift-duplicate-enum-name");

        let err = EnumDescriptor::new(
            "E",
            &[EnumConstant::new("A", Some(1)), EnumConstant::new("B", Some(1))],
        )
        .unwrap_err();
        assert_eq!(
            err,
            CompileError::DuplicateEnumValue {
                enum_name: "E".into(),
                value: 1,
                first: "A".into(),
                second: "B".into(),
            }
        );
    }

    #[test]
    fn test_enum_implicit_value_overflow() {
        let err = EnumDescriptor::new(
            "E",
            &[
                EnumConstant::new("MAX", Some(i32::MAX)),
                EnumConstant::new("NEXT", None),
            ],
        )
        .unwrap_err();
        assert_eq!(
            err,
            CompileError::EnumValueOverflow {
                enum_name: "E".into(),
                name: "NEXT".into(),
            }
        );
        assert_eq!(err.kind(), "thrift-enum-value-overflow");

        // an explicit value after the maximum is fine
        let desc = EnumDescriptor::new(
            "E",
            &[
                EnumConstant::new("MAX", Some(i32::MAX)),
                EnumConstant::new("MIN", Some(i32::MIN)),
            ],
        )
        .unwrap();
        assert_eq!(desc.value_of("MIN"), Some(i32::MIN));
    }

    #[test]
    fn test_annotation_values() {
        assert_eq!(I64Repr::from_annotation("long"), Ok(I64Repr::Long));
        assert_eq!(
            MapRepr::from_annotation("bogus").unwrap_err().to_string(),
            "unexpected map type annotation \"bogus\""
        );
        assert_eq!(
            I64Repr::from_annotation("Date").unwrap_err().to_string(),
            "unexpected i64 type annotation \"Date\""
        );
    }
}
