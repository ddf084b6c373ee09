//! Declarations handed over by the IDL parser
//!
//! These mirror resolved Thrift syntax closely and derive serde so a parser
//! living elsewhere can ship them as JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// `(key = "value")` annotations on a type
pub type Annotations = BTreeMap<String, String>;

/// A top-level declaration of a Thrift program
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    /// `typedef <target> <name>`
    Typedef { name: String, target: TypeExpr },
    /// `enum <name> { ... }`
    Enum {
        name: String,
        values: Vec<EnumConstant>,
    },
    /// `struct`, `union` or `exception`
    Struct {
        name: String,
        #[serde(default)]
        flavor: StructFlavor,
        fields: Vec<FieldDecl>,
    },
    /// `const <type> <name> = <value>`
    Const { name: String, value: ConstValue },
}

impl Declaration {
    pub fn typedef(name: impl Into<String>, target: TypeExpr) -> Self {
        Declaration::Typedef {
            name: name.into(),
            target,
        }
    }

    pub fn enumeration(name: impl Into<String>, values: Vec<EnumConstant>) -> Self {
        Declaration::Enum {
            name: name.into(),
            values,
        }
    }

    pub fn structure(name: impl Into<String>, fields: Vec<FieldDecl>) -> Self {
        Self::with_flavor(name, StructFlavor::Struct, fields)
    }

    pub fn union(name: impl Into<String>, fields: Vec<FieldDecl>) -> Self {
        Self::with_flavor(name, StructFlavor::Union, fields)
    }

    pub fn exception(name: impl Into<String>, fields: Vec<FieldDecl>) -> Self {
        Self::with_flavor(name, StructFlavor::Exception, fields)
    }

    pub fn constant(name: impl Into<String>, value: ConstValue) -> Self {
        Declaration::Const {
            name: name.into(),
            value,
        }
    }

    fn with_flavor(name: impl Into<String>, flavor: StructFlavor, fields: Vec<FieldDecl>) -> Self {
        Declaration::Struct {
            name: name.into(),
            flavor,
            fields,
        }
    }

    /// Declared name
    pub fn name(&self) -> &str {
        match self {
            Declaration::Typedef { name, .. }
            | Declaration::Enum { name, .. }
            | Declaration::Struct { name, .. }
            | Declaration::Const { name, .. } => name,
        }
    }
}

/// Built-in Thrift types
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseType {
    Bool,
    #[serde(alias = "i8")]
    Byte,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
}

impl BaseType {
    pub fn name(self) -> &'static str {
        match self {
            BaseType::Bool => "bool",
            BaseType::Byte => "byte",
            BaseType::I16 => "i16",
            BaseType::I32 => "i32",
            BaseType::I64 => "i64",
            BaseType::Double => "double",
            BaseType::String => "string",
            BaseType::Binary => "binary",
        }
    }
}

/// A type as written at a use site
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeExpr {
    Base {
        name: BaseType,
        #[serde(default)]
        annotations: Annotations,
    },
    /// A reference to a declared type, possibly `include.Name`
    Named { name: String },
    List {
        element: Box<TypeExpr>,
        #[serde(default)]
        annotations: Annotations,
    },
    Set {
        element: Box<TypeExpr>,
        #[serde(default)]
        annotations: Annotations,
    },
    Map {
        key: Box<TypeExpr>,
        value: Box<TypeExpr>,
        #[serde(default)]
        annotations: Annotations,
    },
}

impl TypeExpr {
    pub fn base(name: BaseType) -> Self {
        TypeExpr::Base {
            name,
            annotations: Annotations::new(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named { name: name.into() }
    }

    pub fn list(element: TypeExpr) -> Self {
        TypeExpr::List {
            element: Box::new(element),
            annotations: Annotations::new(),
        }
    }

    pub fn set(element: TypeExpr) -> Self {
        TypeExpr::Set {
            element: Box::new(element),
            annotations: Annotations::new(),
        }
    }

    pub fn map(key: TypeExpr, value: TypeExpr) -> Self {
        TypeExpr::Map {
            key: Box::new(key),
            value: Box::new(value),
            annotations: Annotations::new(),
        }
    }

    /// Add an annotation; named references carry none and are returned unchanged
    pub fn annotate(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        match &mut self {
            TypeExpr::Base { annotations, .. }
            | TypeExpr::List { annotations, .. }
            | TypeExpr::Set { annotations, .. }
            | TypeExpr::Map { annotations, .. } => {
                annotations.insert(key.into(), value.into());
            }
            TypeExpr::Named { .. } => {}
        }
        self
    }

    pub fn annotations(&self) -> Option<&Annotations> {
        match self {
            TypeExpr::Base { annotations, .. }
            | TypeExpr::List { annotations, .. }
            | TypeExpr::Set { annotations, .. }
            | TypeExpr::Map { annotations, .. } => Some(annotations),
            TypeExpr::Named { .. } => None,
        }
    }
}

/// Field requiredness
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Requiredness {
    Required,
    Optional,
    #[default]
    Default,
}

/// Which struct-like declaration this is
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StructFlavor {
    #[default]
    Struct,
    Union,
    Exception,
}

/// One field of a struct, union or exception
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct FieldDecl {
    pub id: i16,
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeExpr,
    #[serde(default)]
    pub requiredness: Requiredness,
    #[serde(default)]
    pub default: Option<ConstValue>,
}

impl FieldDecl {
    pub fn new(id: i16, name: impl Into<String>, ty: TypeExpr) -> Self {
        Self {
            id,
            name: name.into(),
            ty,
            requiredness: Requiredness::Default,
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.requiredness = Requiredness::Required;
        self
    }

    pub fn optional(mut self) -> Self {
        self.requiredness = Requiredness::Optional;
        self
    }

    pub fn with_default(mut self, default: ConstValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// A named enum constant; `value` defaults to the previous value plus one
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct EnumConstant {
    pub name: String,
    #[serde(default)]
    pub value: Option<i32>,
}

impl EnumConstant {
    pub fn new(name: impl Into<String>, value: Option<i32>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A constant expression: a literal or a reference to a const / enum member
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstValue {
    Literal(Value),
    /// `NAME`, `include.NAME` or `Enum.MEMBER`
    Reference(String),
}
