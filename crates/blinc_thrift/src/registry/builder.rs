//! Registry construction
//!
//! Building runs in passes so declaration order never matters:
//!
//! 1. every named type gets a slot (forward references become resolvable)
//! 2. typedef targets are resolved and alias cycles rejected
//! 3. struct fields and their defaults are resolved, constants evaluated
//! 4. keyed maps over unhashable keys are rejected

use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::config::ThriftConfig;
use crate::error::{CompileError, CompileResult};
use crate::value::Value;

use super::{
    Annotations, BaseType, ConstValue, Declaration, EnumDescriptor, FieldDescriptor, I64Repr,
    MapRepr, StructDescriptor, TypeDescriptor, TypeExpr, TypeKey, TypeKind, TypeRegistry,
};

/// Longest chain of constant references followed before giving up
const MAX_CONST_DEPTH: usize = 32;

/// Declarations of one program; `scope` is the include name, `None` for the root
#[derive(Debug)]
struct Program {
    scope: Option<String>,
    declarations: Vec<Declaration>,
}

/// Collects programs and resolves them into a [`TypeRegistry`]
#[derive(Debug)]
pub struct RegistryBuilder {
    config: ThriftConfig,
    programs: Vec<Program>,
}

impl RegistryBuilder {
    pub fn new(config: ThriftConfig) -> Self {
        Self {
            config,
            programs: Vec::new(),
        }
    }

    /// Add the root program; its names are registered unqualified
    pub fn program(mut self, declarations: Vec<Declaration>) -> Self {
        self.programs.push(Program {
            scope: None,
            declarations,
        });
        self
    }

    /// Add an included program; its names are registered as `name.Type`
    pub fn include(mut self, name: impl Into<String>, declarations: Vec<Declaration>) -> Self {
        self.programs.push(Program {
            scope: Some(name.into()),
            declarations,
        });
        self
    }

    /// Resolve everything added so far
    pub fn build(self) -> CompileResult<TypeRegistry> {
        let mut resolver = Resolver {
            config: self.config,
            types: SlotMap::with_key(),
            names: FxHashMap::default(),
            base_types: FxHashMap::default(),
            raw_consts: FxHashMap::default(),
        };

        for program in &self.programs {
            resolver.declare(program)?;
        }
        for program in &self.programs {
            resolver.define_typedefs(program)?;
        }
        resolver.check_typedef_cycles()?;
        for program in &self.programs {
            resolver.define_structs(program)?;
        }
        let consts = resolver.evaluate_consts()?;
        resolver.check_map_keys()?;

        tracing::debug!(
            "Type registry built: {} named types, {} descriptors, {} constants",
            resolver.names.len(),
            resolver.types.len(),
            consts.len()
        );

        Ok(TypeRegistry::from_parts(
            resolver.types,
            resolver.names,
            consts,
            resolver.config,
        ))
    }
}

struct Resolver {
    config: ThriftConfig,
    types: SlotMap<TypeKey, TypeDescriptor>,
    names: FxHashMap<String, TypeKey>,
    /// Base types are shared per (type, representation)
    base_types: FxHashMap<(BaseType, I64Repr), TypeKey>,
    raw_consts: FxHashMap<String, (Option<String>, ConstValue)>,
}

/// The annotation key was set on a type with only one in-memory shape
fn unexpected_annotation(type_name: &str, value: &str) -> CompileError {
    CompileError::InvalidAnnotation {
        message: format!("unexpected {type_name} type annotation \"{value}\""),
    }
}

fn qualify(scope: Option<&str>, name: &str) -> String {
    match scope {
        Some(scope) => format!("{scope}.{name}"),
        None => name.to_string(),
    }
}

impl Resolver {
    fn declare(&mut self, program: &Program) -> CompileResult<()> {
        let scope = program.scope.as_deref();
        for decl in &program.declarations {
            let name = qualify(scope, decl.name());
            if self.names.contains_key(&name) || self.raw_consts.contains_key(&name) {
                return Err(CompileError::DuplicateType { name });
            }

            let key = match decl {
                Declaration::Const { value, .. } => {
                    self.raw_consts
                        .insert(name, (program.scope.clone(), value.clone()));
                    continue;
                }
                // Placeholder alias to itself, replaced in `define_typedefs`.
                Declaration::Typedef { .. } => self.types.insert_with_key(|key| TypeDescriptor {
                    name: name.clone(),
                    kind: TypeKind::Typedef { target: key },
                }),
                Declaration::Enum { values, .. } => {
                    let kind = TypeKind::Enum(EnumDescriptor::new(&name, values)?);
                    self.types.insert(TypeDescriptor {
                        name: name.clone(),
                        kind,
                    })
                }
                Declaration::Struct { flavor, .. } => self.types.insert(TypeDescriptor {
                    name: name.clone(),
                    kind: TypeKind::Struct(StructDescriptor {
                        flavor: *flavor,
                        fields: Vec::new(),
                    }),
                }),
            };
            self.names.insert(name, key);
        }
        Ok(())
    }

    fn define_typedefs(&mut self, program: &Program) -> CompileResult<()> {
        let scope = program.scope.as_deref();
        for decl in &program.declarations {
            if let Declaration::Typedef { name, target } = decl {
                let key = self.lookup(None, &qualify(scope, name))?;
                let target = self.resolve_expr(scope, target)?;
                self.types[key].kind = TypeKind::Typedef { target };
            }
        }
        Ok(())
    }

    fn define_structs(&mut self, program: &Program) -> CompileResult<()> {
        let scope = program.scope.as_deref();
        for decl in &program.declarations {
            if let Declaration::Struct { name, fields, .. } = decl {
                let struct_name = qualify(scope, name);
                let key = self.lookup(None, &struct_name)?;

                let mut resolved: Vec<FieldDescriptor> = Vec::with_capacity(fields.len());
                let mut ids: FxHashMap<i16, usize> = FxHashMap::default();
                for field in fields {
                    if let Some(&index) = ids.get(&field.id) {
                        return Err(CompileError::DuplicateFieldId {
                            struct_name,
                            id: field.id,
                            first: resolved[index].name.clone(),
                            second: field.name.clone(),
                        });
                    }
                    ids.insert(field.id, resolved.len());

                    let default = match &field.default {
                        Some(value) => Some(self.evaluate(scope, value, 0)?),
                        None => None,
                    };
                    resolved.push(FieldDescriptor {
                        id: field.id,
                        name: field.name.clone(),
                        ty: self.resolve_expr(scope, &field.ty)?,
                        requiredness: field.requiredness,
                        default,
                    });
                }

                if let TypeKind::Struct(desc) = &mut self.types[key].kind {
                    desc.fields = resolved;
                }
            }
        }
        Ok(())
    }

    fn evaluate_consts(&self) -> CompileResult<FxHashMap<String, Value>> {
        self.raw_consts
            .iter()
            .map(|(name, (scope, value))| {
                Ok((name.clone(), self.evaluate(scope.as_deref(), value, 0)?))
            })
            .collect()
    }

    fn check_typedef_cycles(&self) -> CompileResult<()> {
        let limit = self.types.len();
        for (key, desc) in &self.types {
            if !matches!(desc.kind, TypeKind::Typedef { .. }) {
                continue;
            }
            let mut current = key;
            let mut steps = 0;
            while let TypeKind::Typedef { target } = self.types[current].kind {
                current = target;
                steps += 1;
                if steps > limit {
                    return Err(CompileError::TypedefCycle {
                        name: desc.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_map_keys(&self) -> CompileResult<()> {
        for desc in self.types.values() {
            if let TypeKind::Map {
                key,
                repr: MapRepr::Keyed,
                ..
            } = desc.kind
            {
                let resolved = self.resolve(key);
                let hashable = matches!(
                    self.types[resolved].kind,
                    TypeKind::Bool
                        | TypeKind::Byte
                        | TypeKind::I16
                        | TypeKind::I32
                        | TypeKind::I64(I64Repr::Bytes)
                        | TypeKind::String
                        | TypeKind::Binary
                        | TypeKind::Enum(_)
                );
                if !hashable {
                    return Err(CompileError::UnhashableMapKey {
                        key_type: self.types[key].name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn resolve(&self, mut key: TypeKey) -> TypeKey {
        while let TypeKind::Typedef { target } = self.types[key].kind {
            key = target;
        }
        key
    }

    /// Find a named type, preferring the current program's scope
    fn lookup(&self, scope: Option<&str>, name: &str) -> CompileResult<TypeKey> {
        if let Some(scope) = scope {
            if let Some(&key) = self.names.get(&qualify(Some(scope), name)) {
                return Ok(key);
            }
        }
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| CompileError::UnknownType {
                name: name.to_string(),
            })
    }

    fn annotation<'a>(&self, annotations: &'a Annotations) -> Option<&'a str> {
        annotations
            .get(&self.config.annotation_key)
            .map(String::as_str)
    }

    fn resolve_expr(&mut self, scope: Option<&str>, expr: &TypeExpr) -> CompileResult<TypeKey> {
        match expr {
            TypeExpr::Named { name } => self.lookup(scope, name),
            TypeExpr::Base { name, annotations } => {
                let repr = match (name, self.annotation(annotations)) {
                    (BaseType::I64, Some(value)) => I64Repr::from_annotation(value)?,
                    (_, Some(value)) => return Err(unexpected_annotation(name.name(), value)),
                    (_, None) => I64Repr::Bytes,
                };
                if let Some(&key) = self.base_types.get(&(*name, repr)) {
                    return Ok(key);
                }
                let kind = match name {
                    BaseType::Bool => TypeKind::Bool,
                    BaseType::Byte => TypeKind::Byte,
                    BaseType::I16 => TypeKind::I16,
                    BaseType::I32 => TypeKind::I32,
                    BaseType::I64 => TypeKind::I64(repr),
                    BaseType::Double => TypeKind::Double,
                    BaseType::String => TypeKind::String,
                    BaseType::Binary => TypeKind::Binary,
                };
                let key = self.types.insert(TypeDescriptor {
                    name: name.name().to_string(),
                    kind,
                });
                self.base_types.insert((*name, repr), key);
                Ok(key)
            }
            TypeExpr::List {
                element,
                annotations,
            } => {
                if let Some(value) = self.annotation(annotations) {
                    return Err(unexpected_annotation("list", value));
                }
                let element = self.resolve_expr(scope, element)?;
                let name = format!("list<{}>", self.types[element].name);
                Ok(self.types.insert(TypeDescriptor {
                    name,
                    kind: TypeKind::List { element },
                }))
            }
            TypeExpr::Set {
                element,
                annotations,
            } => {
                if let Some(value) = self.annotation(annotations) {
                    return Err(unexpected_annotation("set", value));
                }
                let element = self.resolve_expr(scope, element)?;
                let name = format!("set<{}>", self.types[element].name);
                Ok(self.types.insert(TypeDescriptor {
                    name,
                    kind: TypeKind::Set { element },
                }))
            }
            TypeExpr::Map {
                key,
                value,
                annotations,
            } => {
                let repr = match self.annotation(annotations) {
                    Some(value) => MapRepr::from_annotation(value)?,
                    None => MapRepr::Keyed,
                };
                let key = self.resolve_expr(scope, key)?;
                let value = self.resolve_expr(scope, value)?;
                let name = format!(
                    "map<{}, {}>",
                    self.types[key].name, self.types[value].name
                );
                Ok(self.types.insert(TypeDescriptor {
                    name,
                    kind: TypeKind::Map { key, value, repr },
                }))
            }
        }
    }

    fn evaluate(&self, scope: Option<&str>, value: &ConstValue, depth: usize) -> CompileResult<Value> {
        let name = match value {
            ConstValue::Literal(value) => return Ok(value.clone()),
            ConstValue::Reference(name) => name,
        };
        let unknown = || CompileError::UnknownConstant { name: name.clone() };
        if depth > MAX_CONST_DEPTH {
            return Err(unknown());
        }

        let scoped = scope
            .map(|scope| qualify(Some(scope), name))
            .and_then(|qualified| self.raw_consts.get(&qualified));
        if let Some((const_scope, target)) = scoped.or_else(|| self.raw_consts.get(name)) {
            return self.evaluate(const_scope.as_deref(), target, depth + 1);
        }

        // `Enum.MEMBER`, where `Enum` may itself be `include.Enum`
        let (enum_name, member) = name.rsplit_once('.').ok_or_else(unknown)?;
        let key = self.lookup(scope, enum_name).map_err(|_| unknown())?;
        match &self.types[self.resolve(key)].kind {
            TypeKind::Enum(desc) if desc.value_of(member).is_some() => {
                Ok(Value::String(member.to_string()))
            }
            _ => Err(unknown()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{EnumConstant, FieldDecl, Requiredness, StructFlavor};

    fn i32_type() -> TypeExpr {
        TypeExpr::base(BaseType::I32)
    }

    #[test]
    fn test_forward_references() {
        let registry = TypeRegistry::builder()
            .program(vec![
                Declaration::structure(
                    "Node",
                    vec![
                        FieldDecl::new(1, "value", TypeExpr::named("Weight")),
                        FieldDecl::new(2, "next", TypeExpr::named("Node")),
                    ],
                ),
                Declaration::typedef("Weight", i32_type()),
            ])
            .build()
            .unwrap();

        let node = registry.lookup("Node").unwrap();
        let TypeKind::Struct(desc) = &registry.descriptor(node).kind else {
            panic!("expected struct");
        };
        assert_eq!(desc.flavor, StructFlavor::Struct);
        assert_eq!(desc.fields[1].ty, node);

        let weight = registry.lookup("Weight").unwrap();
        assert_eq!(registry.descriptor(registry.resolve(weight)).kind, TypeKind::I32);
        assert_eq!(registry.type_id(weight), crate::protocol::TypeId::I32);
    }

    #[test]
    fn test_unknown_type() {
        let err = TypeRegistry::builder()
            .program(vec![Declaration::typedef("Alias", TypeExpr::named("Missing"))])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownType {
                name: "Missing".into()
            }
        );
    }

    #[test]
    fn test_duplicate_field_id() {
        let err = TypeRegistry::builder()
            .program(vec![Declaration::structure(
                "S",
                vec![
                    FieldDecl::new(1, "a", i32_type()),
                    FieldDecl::new(1, "b", i32_type()),
                ],
            )])
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), "thrift-duplicate-field-id");
        assert_eq!(
            err.to_string(),
            "duplicate field id 1 in \"S\" (fields \"a\" and \"b\")"
        );
    }

    #[test]
    fn test_duplicate_type() {
        let err = TypeRegistry::builder()
            .program(vec![
                Declaration::typedef("T", i32_type()),
                Declaration::structure("T", vec![]),
            ])
            .build()
            .unwrap_err();
        assert_eq!(err, CompileError::DuplicateType { name: "T".into() });
    }

    #[test]
    fn test_typedef_cycle() {
        let err = TypeRegistry::builder()
            .program(vec![
                Declaration::typedef("A", TypeExpr::named("B")),
                Declaration::typedef("B", TypeExpr::named("A")),
            ])
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), "thrift-typedef-cycle");
    }

    #[test]
    fn test_invalid_map_annotation() {
        let err = TypeRegistry::builder()
            .program(vec![Declaration::structure(
                "Graph",
                vec![FieldDecl::new(
                    1,
                    "edges",
                    TypeExpr::map(TypeExpr::base(BaseType::Byte), TypeExpr::base(BaseType::Byte))
                        .annotate("rs.type", "bogus"),
                )
                .required()],
            )])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::InvalidAnnotation {
                message: "unexpected map type annotation \"bogus\"".into()
            }
        );
    }

    #[test]
    fn test_annotation_on_single_shape_types() {
        let build = |ty: TypeExpr| {
            TypeRegistry::builder()
                .program(vec![Declaration::typedef("T", ty)])
                .build()
                .unwrap_err()
                .to_string()
        };
        assert_eq!(
            build(TypeExpr::list(i32_type()).annotate("rs.type", "bogus")),
            "unexpected list type annotation \"bogus\""
        );
        assert_eq!(
            build(TypeExpr::set(i32_type()).annotate("rs.type", "entries")),
            "unexpected set type annotation \"entries\""
        );
        assert_eq!(
            build(TypeExpr::base(BaseType::String).annotate("rs.type", "long")),
            "unexpected string type annotation \"long\""
        );

        // other annotation keys are left alone
        TypeRegistry::builder()
            .program(vec![Declaration::typedef(
                "T",
                TypeExpr::list(i32_type()).annotate("cpp.type", "std::deque"),
            )])
            .build()
            .unwrap();
    }

    #[test]
    fn test_custom_annotation_key() {
        let config = ThriftConfig::default().with_annotation_key("js.type");
        let registry = RegistryBuilder::new(config)
            .program(vec![Declaration::typedef(
                "Pairs",
                TypeExpr::map(TypeExpr::base(BaseType::String), TypeExpr::base(BaseType::I16))
                    .annotate("js.type", "entries")
                    .annotate("rs.type", "ignored"),
            )])
            .build()
            .unwrap();
        let key = registry.resolve(registry.lookup("Pairs").unwrap());
        assert!(matches!(
            registry.descriptor(key).kind,
            TypeKind::Map {
                repr: MapRepr::Entries,
                ..
            }
        ));
    }

    #[test]
    fn test_keyed_map_requires_hashable_key() {
        let err = TypeRegistry::builder()
            .program(vec![
                Declaration::structure("Point", vec![FieldDecl::new(1, "x", i32_type())]),
                Declaration::typedef(
                    "Grid",
                    TypeExpr::map(TypeExpr::named("Point"), TypeExpr::base(BaseType::Bool)),
                ),
            ])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::UnhashableMapKey {
                key_type: "Point".into()
            }
        );

        TypeRegistry::builder()
            .program(vec![
                Declaration::structure("Point", vec![FieldDecl::new(1, "x", i32_type())]),
                Declaration::typedef(
                    "Grid",
                    TypeExpr::map(TypeExpr::named("Point"), TypeExpr::base(BaseType::Bool))
                        .annotate("rs.type", "entries"),
                ),
            ])
            .build()
            .unwrap();
    }

    #[test]
    fn test_includes_and_constants() {
        let registry = TypeRegistry::builder()
            .include(
                "shared",
                vec![
                    Declaration::enumeration(
                        "Status",
                        vec![EnumConstant::new("OK", None), EnumConstant::new("FAILED", None)],
                    ),
                    Declaration::constant("LIMIT", ConstValue::Literal(Value::Int(10))),
                    Declaration::structure(
                        "Header",
                        vec![FieldDecl::new(1, "status", TypeExpr::named("Status"))
                            .with_default(ConstValue::Reference("Status.OK".into()))],
                    ),
                ],
            )
            .program(vec![
                Declaration::constant("DEFAULT_LIMIT", ConstValue::Reference("shared.LIMIT".into())),
                Declaration::structure(
                    "Request",
                    vec![
                        FieldDecl::new(1, "header", TypeExpr::named("shared.Header")).required(),
                        FieldDecl::new(2, "limit", i32_type())
                            .with_default(ConstValue::Reference("DEFAULT_LIMIT".into())),
                        FieldDecl::new(3, "status", TypeExpr::named("shared.Status"))
                            .with_default(ConstValue::Reference("shared.Status.FAILED".into())),
                    ],
                ),
            ])
            .build()
            .unwrap();

        assert_eq!(registry.constant("DEFAULT_LIMIT"), Some(&Value::Int(10)));
        assert!(registry.lookup("shared.Header").is_ok());
        assert!(registry.lookup("Header").is_err());

        let request = registry.lookup("Request").unwrap();
        let TypeKind::Struct(desc) = &registry.descriptor(request).kind else {
            panic!("expected struct");
        };
        assert_eq!(desc.fields[0].requiredness, Requiredness::Required);
        assert_eq!(desc.fields[1].default, Some(Value::Int(10)));
        assert_eq!(desc.fields[2].default, Some(Value::String("FAILED".into())));
    }

    #[test]
    fn test_unknown_constant() {
        let err = TypeRegistry::builder()
            .program(vec![Declaration::structure(
                "S",
                vec![FieldDecl::new(1, "a", i32_type())
                    .with_default(ConstValue::Reference("Nope.X".into()))],
            )])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownConstant {
                name: "Nope.X".into()
            }
        );
    }

    #[test]
    fn test_base_types_are_shared() {
        let registry = TypeRegistry::builder()
            .program(vec![
                Declaration::typedef("A", i32_type()),
                Declaration::typedef("B", i32_type()),
                Declaration::typedef("C", TypeExpr::base(BaseType::I64).annotate("rs.type", "long")),
            ])
            .build()
            .unwrap();
        let a = registry.resolve(registry.lookup("A").unwrap());
        let b = registry.resolve(registry.lookup("B").unwrap());
        assert_eq!(a, b);
        let c = registry.resolve(registry.lookup("C").unwrap());
        assert_eq!(registry.descriptor(c).kind, TypeKind::I64(I64Repr::Long));
    }
}
