//! i64 coercion
//!
//! An `i64` is always 8 big-endian bytes on the wire, but callers hold 64-bit
//! integers in several shapes. Encoding tries them in a fixed order and takes
//! the first that matches:
//!
//! | # | Input                                  | Notes                          |
//! |---|----------------------------------------|--------------------------------|
//! | 1 | `Value::Binary` of 8 bytes             | copied verbatim                |
//! | 2 | `Value::String` of 16 hex characters   |                                |
//! | 3 | `Value::Struct` with `high`/`hi` and `low`/`lo` | two 32-bit words      |
//! | 4 | `Value::Long`                          | two 32-bit words               |
//! | 5 | `Value::Int`, integral `Value::Double` |                                |
//! | 6 | `Value::List` of 8 integers in 0..=255 |                                |
//!
//! Anything else is rejected. Timestamp-typed fields also accept
//! `Value::Timestamp` and date strings.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{DecodeError, DecodeResult, EncodeError, EncodeResult, WordHalf};
use crate::protocol::{TypeId, WireReader, WireWriter};
use crate::registry::I64Repr;
use crate::value::{Long, Record, Value};

use super::{CodecTable, WireCodec};

const HEX_LENGTH: &str = "expected a string of 16 hex characters, or other i64 representation";
const HEX_DIGITS: &str = "expected a string of hex characters, or other i64 representation";
const HIGH_BITS: &str = "expected {hi[gh], lo[w]} with high bits, or other i64 representation";
const LOW_BITS: &str = "expected {hi[gh], lo[w]} with low bits, or other i64 representation";
const BYTE_ARRAY: &str = "expected an array of 8 bytes, or other i64 representation";
const ANY_I64: &str = "expected i64 representation";
const DATE_STRING: &str = "expected an ISO-8601 date string, or other timestamp representation";

/// Coerce a value to the 8 wire bytes of an i64
pub fn coerce_i64(value: &Value) -> EncodeResult<[u8; 8]> {
    match value {
        Value::Binary(bytes) if bytes.len() == 8 => {
            let mut out = [0u8; 8];
            out.copy_from_slice(bytes);
            Ok(out)
        }
        Value::String(hex) => coerce_hex(hex),
        Value::Struct(record) => coerce_words(record),
        Value::Long(long) => Ok(long.to_be_bytes()),
        Value::Int(n) => Ok(n.to_be_bytes()),
        Value::Double(n) => integral(*n)
            .map(i64::to_be_bytes)
            .ok_or_else(|| EncodeError::invalid(ANY_I64)),
        Value::List(items) => coerce_byte_list(items),
        _ => Err(EncodeError::invalid(ANY_I64)),
    }
}

/// Coerce a value to the 8 wire bytes of a millisecond timestamp
///
/// Strings are parsed as dates; every other shape goes through
/// [`coerce_i64`].
pub fn coerce_timestamp(value: &Value) -> EncodeResult<[u8; 8]> {
    match value {
        Value::Timestamp(at) => Ok(at.timestamp_millis().to_be_bytes()),
        Value::String(text) => parse_date(text)
            .map(|at| at.timestamp_millis().to_be_bytes())
            .ok_or_else(|| EncodeError::invalid(DATE_STRING)),
        other => coerce_i64(other),
    }
}

fn integral(n: f64) -> Option<i64> {
    // 2^63 is exactly representable, i64::MAX is not
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (n.fract() == 0.0 && n >= -LIMIT && n < LIMIT).then(|| n as i64)
}

fn coerce_hex(hex: &str) -> EncodeResult<[u8; 8]> {
    if hex.chars().count() != 16 {
        return Err(EncodeError::invalid(HEX_LENGTH));
    }
    // split on a char boundary, the string may hold multi-byte characters
    let mid = hex.char_indices().nth(8).map_or(hex.len(), |(at, _)| at);
    let (high, low) = hex.split_at(mid);
    let high = hex_word(high)
        .ok_or_else(|| EncodeError::invalid_half(HEX_DIGITS, WordHalf::High))?;
    let low = hex_word(low)
        .ok_or_else(|| EncodeError::invalid_half(HEX_DIGITS, WordHalf::Low))?;
    Ok(words(high, low))
}

fn hex_word(digits: &str) -> Option<u32> {
    // from_str_radix alone would accept a leading '+'
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

fn coerce_words(record: &Record) -> EncodeResult<[u8; 8]> {
    let high = word(record, "high", "hi").ok_or_else(|| EncodeError::invalid(HIGH_BITS))?;
    let low = word(record, "low", "lo").ok_or_else(|| EncodeError::invalid(LOW_BITS))?;
    Ok(words(high, low))
}

/// A 32-bit word, signed or unsigned
fn word(record: &Record, long: &str, short: &str) -> Option<u32> {
    let value = record
        .get(long)
        .filter(|v| !v.is_null())
        .or_else(|| record.get(short))?;
    let n = match value {
        Value::Int(n) => *n,
        Value::Double(n) => integral(*n)?,
        _ => return None,
    };
    if (i64::from(i32::MIN)..=i64::from(u32::MAX)).contains(&n) {
        Some(n as u32)
    } else {
        None
    }
}

fn words(high: u32, low: u32) -> [u8; 8] {
    ((u64::from(high) << 32) | u64::from(low)).to_be_bytes()
}

fn coerce_byte_list(items: &[Value]) -> EncodeResult<[u8; 8]> {
    if items.len() != 8 {
        return Err(EncodeError::invalid(BYTE_ARRAY));
    }
    let mut out = [0u8; 8];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item
            .as_int()
            .and_then(|n| u8::try_from(n).ok())
            .ok_or_else(|| EncodeError::invalid(BYTE_ARRAY))?;
    }
    Ok(out)
}

/// RFC 3339 first, then a few zoneless forms read as UTC
fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Utc));
    }
    const NAIVE: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
    for format in NAIVE {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// i64 in one of its in-memory shapes
#[derive(Debug)]
pub(crate) struct I64Codec {
    repr: I64Repr,
}

impl I64Codec {
    pub(crate) fn new(repr: I64Repr) -> Self {
        Self { repr }
    }
}

impl WireCodec for I64Codec {
    fn type_id(&self) -> TypeId {
        TypeId::I64
    }

    fn encode(&self, _cx: &CodecTable, value: &Value, writer: &mut WireWriter<'_>) -> EncodeResult<()> {
        let bytes = match self.repr {
            I64Repr::Timestamp => coerce_timestamp(value)?,
            I64Repr::Bytes | I64Repr::Long => coerce_i64(value)?,
        };
        writer.write_raw(&bytes);
        Ok(())
    }

    fn decode(&self, _cx: &CodecTable, reader: &mut WireReader<'_>) -> DecodeResult<Value> {
        let bytes = reader.read_i64_bytes()?;
        Ok(match self.repr {
            I64Repr::Bytes => Value::Binary(bytes.to_vec()),
            I64Repr::Long => Value::Long(Long::from_be_bytes(bytes)),
            I64Repr::Timestamp => {
                let millis = i64::from_be_bytes(bytes);
                let at = DateTime::from_timestamp_millis(millis)
                    .ok_or(DecodeError::TimestampOutOfRange { millis })?;
                Value::Timestamp(at)
            }
        })
    }
}
