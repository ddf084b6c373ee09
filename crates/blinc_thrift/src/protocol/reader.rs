//! Binary protocol reader

use crate::error::{DecodeError, DecodeResult};

use super::TypeId;

/// Default nesting limit for structs and collections
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Upper bound on slots reserved before a collection's elements are read
const MAX_PREALLOC: usize = 1024;

/// Reads Thrift Binary Protocol data from a borrowed buffer
#[derive(Debug)]
pub struct WireReader<'a> {
    /// Input bytes
    bytes: &'a [u8],
    /// Current read position
    offset: usize,
    /// Current nesting depth
    depth: usize,
    max_depth: usize,
}

impl<'a> WireReader<'a> {
    /// Create a reader positioned at `offset`
    pub fn new(bytes: &'a [u8], offset: usize) -> Self {
        Self {
            bytes,
            offset,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limit how deeply structs and collections may nest
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Current offset
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Remaining bytes
    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    fn check_remaining(&self, needed: usize) -> DecodeResult<()> {
        if self.remaining() < needed {
            return Err(DecodeError::BufferUnderrun {
                offset: self.offset,
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        self.check_remaining(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[self.offset..self.offset + N]);
        self.offset += N;
        Ok(out)
    }

    /// Read a u8
    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        let [byte] = self.read_array::<1>()?;
        Ok(byte)
    }

    /// Read a bool (any non-zero byte is true)
    pub fn read_bool(&mut self) -> DecodeResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Read an i8
    pub fn read_i8(&mut self) -> DecodeResult<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Read an i16
    pub fn read_i16(&mut self) -> DecodeResult<i16> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    /// Read an i32
    pub fn read_i32(&mut self) -> DecodeResult<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    /// Read a u32
    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Read the raw 8 bytes of an i64
    pub fn read_i64_bytes(&mut self) -> DecodeResult<[u8; 8]> {
        self.read_array()
    }

    /// Read an i64
    pub fn read_i64(&mut self) -> DecodeResult<i64> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    /// Read an f64
    pub fn read_f64(&mut self) -> DecodeResult<f64> {
        Ok(f64::from_be_bytes(self.read_array()?))
    }

    /// Read raw bytes
    pub fn read_bytes(&mut self, len: usize) -> DecodeResult<&'a [u8]> {
        self.check_remaining(len)?;
        let data = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(data)
    }

    /// Read a collection or string length prefix
    pub fn read_len(&mut self) -> DecodeResult<usize> {
        Ok(self.read_u32()? as usize)
    }

    /// Read length-prefixed bytes
    pub fn read_binary(&mut self) -> DecodeResult<&'a [u8]> {
        let len = self.read_len()?;
        self.read_bytes(len)
    }

    /// Read a length-prefixed UTF-8 string
    pub fn read_string(&mut self) -> DecodeResult<String> {
        let len = self.read_len()?;
        let start = self.offset;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8 { offset: start })
    }

    /// Capacity hint for a collection claiming `count` elements
    ///
    /// Each element occupies at least `min_width` bytes on the wire, so the
    /// hint never exceeds what the remaining input could hold. It is also
    /// capped at a fixed number of slots; larger collections grow as their
    /// elements are pushed.
    pub fn capacity_hint(&self, count: usize, min_width: usize) -> usize {
        count
            .min(self.remaining() / min_width.max(1))
            .min(MAX_PREALLOC)
    }

    /// Enter a nested struct or collection
    pub fn enter(&mut self) -> DecodeResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(DecodeError::RecursionDepthExceeded {
                max: self.max_depth,
            });
        }
        Ok(())
    }

    /// Leave a nested struct or collection
    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn type_id(&self, typeid: u8, at: usize) -> DecodeResult<TypeId> {
        match TypeId::from_u8(typeid) {
            Some(TypeId::Stop) | None => Err(DecodeError::UnknownTypeid { typeid, offset: at }),
            Some(id) => Ok(id),
        }
    }

    /// Skip one value of the given wire type without materializing it
    pub fn skip(&mut self, typeid: u8) -> DecodeResult<()> {
        let id = self.type_id(typeid, self.offset)?;
        if let Some(width) = id.fixed_width() {
            self.read_bytes(width)?;
            return Ok(());
        }
        match id {
            TypeId::String => {
                self.read_binary()?;
            }
            TypeId::Struct => {
                self.enter()?;
                loop {
                    let field_type = self.read_u8()?;
                    if field_type == TypeId::Stop.as_u8() {
                        break;
                    }
                    self.read_i16()?;
                    self.skip(field_type)?;
                }
                self.leave();
            }
            TypeId::Map => {
                let at = self.offset;
                let key = self.read_u8()?;
                let val = self.read_u8()?;
                let count = self.read_len()?;
                let key_id = self.type_id(key, at)?;
                let val_id = self.type_id(val, at + 1)?;
                match (key_id.fixed_width(), val_id.fixed_width()) {
                    (Some(k), Some(v)) => self.skip_fixed(count, k + v)?,
                    _ => {
                        self.enter()?;
                        for _ in 0..count {
                            self.skip(key)?;
                            self.skip(val)?;
                        }
                        self.leave();
                    }
                }
            }
            TypeId::Set | TypeId::List => {
                let at = self.offset;
                let elem = self.read_u8()?;
                let count = self.read_len()?;
                match self.type_id(elem, at)?.fixed_width() {
                    Some(width) => self.skip_fixed(count, width)?,
                    None => {
                        self.enter()?;
                        for _ in 0..count {
                            self.skip(elem)?;
                        }
                        self.leave();
                    }
                }
            }
            _ => unreachable!("fixed-width types are skipped above"),
        }
        Ok(())
    }

    fn skip_fixed(&mut self, count: usize, width: usize) -> DecodeResult<()> {
        let needed = count.checked_mul(width).unwrap_or(usize::MAX);
        self.read_bytes(needed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_primitives() {
        let bytes = [
            1u8, // bool
            0xff, // i8
            0, 2, // i16
            0, 0, 0, 3, // i32
            0, 0, 0, 0, 0, 0, 0, 4, // i64
        ];

        let mut reader = WireReader::new(&bytes, 0);
        assert!(reader.read_bool().unwrap());
        assert_eq!(reader.read_i8().unwrap(), -1);
        assert_eq!(reader.read_i16().unwrap(), 2);
        assert_eq!(reader.read_i32().unwrap(), 3);
        assert_eq!(reader.read_i64().unwrap(), 4);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_capacity_hint_is_bounded() {
        let bytes = [0u8; 9];
        let reader = WireReader::new(&bytes, 1);
        assert_eq!(reader.capacity_hint(u32::MAX as usize, 4), 2);
        assert_eq!(reader.capacity_hint(u32::MAX as usize, 1), 8);
        assert_eq!(reader.capacity_hint(3, 1), 3);
        assert_eq!(reader.capacity_hint(u32::MAX as usize, 0), 8);

        let big = vec![0u8; 1 << 20];
        let reader = WireReader::new(&big, 0);
        assert_eq!(reader.capacity_hint(u32::MAX as usize, 1), MAX_PREALLOC);
    }

    #[test]
    fn test_buffer_underrun() {
        let bytes = [0, 0, 0];
        let mut reader = WireReader::new(&bytes, 1);
        assert_eq!(
            reader.read_i32(),
            Err(DecodeError::BufferUnderrun {
                offset: 1,
                needed: 4,
                available: 2,
            })
        );
    }

    #[test]
    fn test_string_length_past_end() {
        let bytes = [0, 0, 0, 9, b'a'];
        let mut reader = WireReader::new(&bytes, 0);
        assert!(matches!(
            reader.read_string(),
            Err(DecodeError::BufferUnderrun { needed: 9, .. })
        ));
    }

    #[test]
    fn test_skip_nested_struct() {
        let bytes = [
            0x0b, 0, 1, 0, 0, 0, 2, b'h', b'i', // 1: string "hi"
            0x0f, 0, 2, 0x08, 0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 2, // 2: list<i32> [1, 2]
            0x0c, 0, 3, 0x02, 0, 1, 1, 0x00, // 3: struct { 1: bool true }
            0x0d, 0, 4, 0x0b, 0x03, 0, 0, 0, 1, 0, 0, 0, 1, b'k', 7, // 4: map<string, byte>
            0x00, // STOP
            0xee, // trailing
        ];
        let mut reader = WireReader::new(&bytes, 0);
        reader.skip(TypeId::Struct.as_u8()).unwrap();
        assert_eq!(reader.offset(), bytes.len() - 1);
    }

    #[test]
    fn test_skip_unknown_typeid() {
        let bytes = [0x09, 0, 0, 0, 0];
        let mut reader = WireReader::new(&bytes, 0);
        assert_eq!(
            reader.skip(0x09),
            Err(DecodeError::UnknownTypeid {
                typeid: 0x09,
                offset: 0,
            })
        );
    }

    #[test]
    fn test_skip_huge_fixed_list_fails_fast() {
        let bytes = [0x08, 0xff, 0xff, 0xff, 0xff, 0, 0];
        let mut reader = WireReader::new(&bytes, 0);
        assert!(matches!(
            reader.skip(TypeId::List.as_u8()),
            Err(DecodeError::BufferUnderrun { .. })
        ));
    }

    #[test]
    fn test_depth_limit() {
        // list<list<list<...>>> deeper than the limit
        let mut bytes = Vec::new();
        for _ in 0..4 {
            bytes.extend_from_slice(&[0x0f, 0, 0, 0, 1]);
        }
        bytes.extend_from_slice(&[0x08, 0, 0, 0, 0]);
        let mut reader = WireReader::new(&bytes, 0).with_max_depth(2);
        assert_eq!(
            reader.skip(TypeId::List.as_u8()),
            Err(DecodeError::RecursionDepthExceeded { max: 2 })
        );
    }
}
