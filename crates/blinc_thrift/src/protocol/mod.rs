//! Thrift Binary Protocol wire primitives
//!
//! Every value on the wire is introduced (inside structs and collection
//! headers) by a one-byte type id. Integers are big-endian, two's complement.
//!
//! ```text
//! struct:  [type:1][id:2] field ... [STOP:1]
//! list:    [elem type:1][count:4] elem ...
//! set:     [elem type:1][count:4] elem ...
//! map:     [key type:1][val type:1][count:4] (key, val) ...
//! string:  [len:4] bytes
//! ```

mod reader;
mod writer;

pub use reader::{WireReader, DEFAULT_MAX_DEPTH};
pub use writer::WireWriter;

use std::fmt;

/// Wire type id of a Thrift value
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeId {
    /// Terminates a struct's field list
    Stop = 0,
    Bool = 2,
    I8 = 3,
    Double = 4,
    I16 = 6,
    I32 = 8,
    I64 = 10,
    /// Shared by `string` and `binary`
    String = 11,
    Struct = 12,
    Map = 13,
    Set = 14,
    List = 15,
}

impl TypeId {
    /// Parse a type id byte read from the wire
    pub fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => Self::Stop,
            2 => Self::Bool,
            3 => Self::I8,
            4 => Self::Double,
            6 => Self::I16,
            8 => Self::I32,
            10 => Self::I64,
            11 => Self::String,
            12 => Self::Struct,
            13 => Self::Map,
            14 => Self::Set,
            15 => Self::List,
            _ => return None,
        })
    }

    /// The byte written on the wire
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Fixed encoded width, or `None` for variable-length types
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            Self::Bool | Self::I8 => Some(1),
            Self::I16 => Some(2),
            Self::I32 => Some(4),
            Self::Double | Self::I64 => Some(8),
            _ => None,
        }
    }

    /// Smallest number of bytes any value of this type occupies
    pub fn min_width(self) -> usize {
        match self {
            Self::Stop | Self::Struct => 1,
            Self::String => 4,
            Self::Set | Self::List => 5,
            Self::Map => 6,
            other => other.fixed_width().unwrap_or(1),
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_id_bytes() {
        for byte in 0..=u8::MAX {
            if let Some(id) = TypeId::from_u8(byte) {
                assert_eq!(id.as_u8(), byte);
            }
        }
        assert_eq!(TypeId::from_u8(1), None);
        assert_eq!(TypeId::from_u8(9), None);
        assert_eq!(TypeId::String.as_u8(), 0x0b);
        assert_eq!(TypeId::List.as_u8(), 0x0f);
    }
}
