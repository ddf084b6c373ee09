//! Blinc Thrift - Binary Protocol Codecs
//!
//! This crate compiles resolved Thrift IDL declarations into codecs that read
//! and write the Thrift Binary Protocol.
//!
//! # Wire Format
//!
//! - Big-endian integers and IEEE 754 doubles
//! - Strings and binaries prefixed with a 4-byte length
//! - Structs as `[typeid][field id]` headers closed by a STOP byte
//! - Collections prefixed with their element type ids and a 4-byte count
//!
//! # Pipeline
//!
//! ```text
//! Declarations ──► RegistryBuilder ──► TypeRegistry ──► Compiler ──► Codec
//!  (from a parser)    (resolve names,     (arena of        (memoized    encode / decode
//!                      check schema)       descriptors)      per type)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use blinc_thrift::prelude::*;
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
//!
//! let mut compiler = Compiler::new(Arc::new(registry));
//! let point = compiler.compile("Point")?;
//!
//! let bytes = point.encode(&Value::record([("x", 1.into()), ("y", 2.into())]))?;
//! let decoded = point.decode(&bytes, 0)?;
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod value;

pub use codec::{Codec, Compiler, Decoded};
pub use config::ThriftConfig;
pub use error::{
    CompileError, CompileResult, DecodeError, DecodeResult, EncodeError, EncodeResult, WordHalf,
};
pub use protocol::TypeId;
pub use registry::{
    BaseType, ConstValue, Declaration, EnumConstant, FieldDecl, RegistryBuilder, Requiredness,
    StructFlavor, TypeExpr, TypeKey, TypeRegistry,
};
pub use value::{Long, MapKey, Record, Value};

/// Prelude for common imports
pub mod prelude {
    pub use super::{
        BaseType, Codec, Compiler, ConstValue, Declaration, EnumConstant, FieldDecl, Long,
        MapKey, StructFlavor, ThriftConfig, TypeExpr, TypeRegistry, Value,
    };
}
