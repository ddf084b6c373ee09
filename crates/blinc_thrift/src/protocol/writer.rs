//! Binary protocol writer

use crate::error::{EncodeError, EncodeResult};

use super::TypeId;

/// Appends Thrift Binary Protocol data to a caller-owned buffer
///
/// Remembers where it started so a failed encode can drop whatever it
/// already wrote.
#[derive(Debug)]
pub struct WireWriter<'a> {
    bytes: &'a mut Vec<u8>,
    start: usize,
}

impl<'a> WireWriter<'a> {
    /// Create a writer appending to `bytes`
    pub fn new(bytes: &'a mut Vec<u8>) -> Self {
        let start = bytes.len();
        Self { bytes, start }
    }

    /// Write a type id
    pub fn write_type_id(&mut self, id: TypeId) {
        self.bytes.push(id.as_u8());
    }

    /// Write a bool
    pub fn write_bool(&mut self, value: bool) {
        self.bytes.push(u8::from(value));
    }

    /// Write an i8
    pub fn write_i8(&mut self, value: i8) {
        self.bytes.push(value as u8);
    }

    /// Write an i16
    pub fn write_i16(&mut self, value: i16) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    /// Write an i32
    pub fn write_i32(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    /// Write a u32
    pub fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    /// Write an i64
    pub fn write_i64(&mut self, value: i64) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    /// Write an f64
    pub fn write_f64(&mut self, value: f64) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    /// Write raw bytes with no length prefix
    pub fn write_raw(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    /// Write a collection or string length prefix
    pub fn write_len(&mut self, len: usize) -> EncodeResult<()> {
        let len = u32::try_from(len)
            .map_err(|_| EncodeError::invalid(format!("length {len} exceeds u32 range")))?;
        self.write_u32(len);
        Ok(())
    }

    /// Write length-prefixed bytes (`string` and `binary`)
    pub fn write_binary(&mut self, data: &[u8]) -> EncodeResult<()> {
        self.write_len(data.len())?;
        self.write_raw(data);
        Ok(())
    }

    /// Write a struct field header
    pub fn write_field_header(&mut self, id: TypeId, field_id: i16) {
        self.write_type_id(id);
        self.write_i16(field_id);
    }

    /// Write the STOP marker that ends a struct
    pub fn write_stop(&mut self) {
        self.write_type_id(TypeId::Stop);
    }

    /// Bytes written by this writer so far
    pub fn written(&self) -> usize {
        self.bytes.len() - self.start
    }

    /// Drop everything this writer appended
    pub fn rollback(self) {
        self.bytes.truncate(self.start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_primitives_big_endian() {
        let mut out = Vec::new();
        let mut writer = WireWriter::new(&mut out);
        writer.write_bool(true);
        writer.write_i16(2);
        writer.write_i32(-1);
        writer.write_i64(0x0102030405060708);
        assert_eq!(writer.written(), 1 + 2 + 4 + 8);
        assert_eq!(
            out,
            [1, 0, 2, 0xff, 0xff, 0xff, 0xff, 1, 2, 3, 4, 5, 6, 7, 8]
        );
    }

    #[test]
    fn test_write_binary() {
        let mut out = Vec::new();
        let mut writer = WireWriter::new(&mut out);
        writer.write_binary(b"abc").unwrap();
        assert_eq!(out, [0, 0, 0, 3, b'a', b'b', b'c']);
    }

    #[test]
    fn test_rollback_keeps_prefix() {
        let mut out = vec![0xaa];
        let mut writer = WireWriter::new(&mut out);
        writer.write_i32(7);
        writer.rollback();
        assert_eq!(out, [0xaa]);
    }
}
