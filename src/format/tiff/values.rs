//! TIFF tag value decoding.
//!
//! Values are stored either inline in the IFD entry (4 bytes or less) or at
//! an offset in the file. Both paths go through the same decoder, which
//! turns raw bytes into a typed sequence according to the field type and
//! the file's byte order.

use std::fmt;

use serde::Serialize;

use crate::error::TiffError;

use super::parser::{checked_slice, ByteOrder, EntryValue, IfdEntry};
use super::tags::FieldType;

// =============================================================================
// TagValue
// =============================================================================

/// A decoded tag value: a typed sequence of `count` elements.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum TagValue {
    Byte(Vec<u8>),
    /// Text with the trailing NUL removed
    Ascii(String),
    Short(Vec<u16>),
    Long(Vec<u32>),
    /// (numerator, denominator) pairs
    Rational(Vec<(u32, u32)>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    /// (numerator, denominator) pairs
    SRational(Vec<(i32, i32)>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    /// Bytes of a field with an unknown type
    Raw(Vec<u8>),
}

impl TagValue {
    /// Number of elements (characters for text).
    pub fn len(&self) -> usize {
        match self {
            TagValue::Byte(v) | TagValue::Undefined(v) | TagValue::Raw(v) => v.len(),
            TagValue::Ascii(s) => s.chars().count(),
            TagValue::Short(v) => v.len(),
            TagValue::Long(v) => v.len(),
            TagValue::Rational(v) => v.len(),
            TagValue::SByte(v) => v.len(),
            TagValue::SShort(v) => v.len(),
            TagValue::SLong(v) => v.len(),
            TagValue::SRational(v) => v.len(),
            TagValue::Float(v) => v.len(),
            TagValue::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unsigned integer elements widened to u64.
    ///
    /// Returns `None` for signed, floating point, rational and text values.
    pub fn as_u64_vec(&self) -> Option<Vec<u64>> {
        match self {
            TagValue::Byte(v) => Some(v.iter().map(|&x| u64::from(x)).collect()),
            TagValue::Short(v) => Some(v.iter().map(|&x| u64::from(x)).collect()),
            TagValue::Long(v) => Some(v.iter().map(|&x| u64::from(x)).collect()),
            _ => None,
        }
    }

    /// First unsigned integer element.
    pub fn first_u64(&self) -> Option<u64> {
        match self {
            TagValue::Byte(v) => v.first().map(|&x| u64::from(x)),
            TagValue::Short(v) => v.first().map(|&x| u64::from(x)),
            TagValue::Long(v) => v.first().map(|&x| u64::from(x)),
            _ => None,
        }
    }

    /// SHORT elements, as stored by GeoKeyDirectoryTag.
    pub fn as_shorts(&self) -> Option<&[u16]> {
        match self {
            TagValue::Short(v) => Some(v),
            _ => None,
        }
    }

    /// Text content, if this is an ASCII value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::Ascii(s) => Some(s),
            _ => None,
        }
    }

    /// Raw bytes of BYTE, UNDEFINED or unknown-type values.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            TagValue::Byte(v) | TagValue::Undefined(v) | TagValue::Raw(v) => Some(v),
            _ => None,
        }
    }

    /// `count` elements starting at element `start`, as a value of the same type.
    ///
    /// Text is sliced by character. Returns `None` if the range does not fit.
    pub fn slice(&self, start: usize, count: usize) -> Option<TagValue> {
        let end = start.checked_add(count)?;
        if end > self.len() {
            return None;
        }

        let sliced = match self {
            TagValue::Byte(v) => TagValue::Byte(v[start..end].to_vec()),
            TagValue::Ascii(s) => TagValue::Ascii(s.chars().skip(start).take(count).collect()),
            TagValue::Short(v) => TagValue::Short(v[start..end].to_vec()),
            TagValue::Long(v) => TagValue::Long(v[start..end].to_vec()),
            TagValue::Rational(v) => TagValue::Rational(v[start..end].to_vec()),
            TagValue::SByte(v) => TagValue::SByte(v[start..end].to_vec()),
            TagValue::Undefined(v) => TagValue::Undefined(v[start..end].to_vec()),
            TagValue::SShort(v) => TagValue::SShort(v[start..end].to_vec()),
            TagValue::SLong(v) => TagValue::SLong(v[start..end].to_vec()),
            TagValue::SRational(v) => TagValue::SRational(v[start..end].to_vec()),
            TagValue::Float(v) => TagValue::Float(v[start..end].to_vec()),
            TagValue::Double(v) => TagValue::Double(v[start..end].to_vec()),
            TagValue::Raw(v) => TagValue::Raw(v[start..end].to_vec()),
        };
        Some(sliced)
    }

    /// Encode the value back to bytes in the given byte order.
    ///
    /// Text gets its NUL terminator back. For an inline entry, padding the
    /// result to 4 bytes reproduces the entry's value field.
    pub fn encode(&self, byte_order: ByteOrder) -> Vec<u8> {
        fn put<const N: usize>(out: &mut Vec<u8>, le: [u8; N], be: [u8; N], order: ByteOrder) {
            match order {
                ByteOrder::LittleEndian => out.extend_from_slice(&le),
                ByteOrder::BigEndian => out.extend_from_slice(&be),
            }
        }

        let mut out = Vec::new();
        match self {
            TagValue::Byte(v) | TagValue::Undefined(v) | TagValue::Raw(v) => {
                out.extend_from_slice(v)
            }
            TagValue::Ascii(s) => {
                out.extend(s.chars().map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?')));
                out.push(0);
            }
            TagValue::SByte(v) => out.extend(v.iter().map(|&x| x as u8)),
            TagValue::Short(v) => {
                for x in v {
                    put(&mut out, x.to_le_bytes(), x.to_be_bytes(), byte_order);
                }
            }
            TagValue::SShort(v) => {
                for x in v {
                    put(&mut out, x.to_le_bytes(), x.to_be_bytes(), byte_order);
                }
            }
            TagValue::Long(v) => {
                for x in v {
                    put(&mut out, x.to_le_bytes(), x.to_be_bytes(), byte_order);
                }
            }
            TagValue::SLong(v) => {
                for x in v {
                    put(&mut out, x.to_le_bytes(), x.to_be_bytes(), byte_order);
                }
            }
            TagValue::Float(v) => {
                for x in v {
                    put(&mut out, x.to_le_bytes(), x.to_be_bytes(), byte_order);
                }
            }
            TagValue::Double(v) => {
                for x in v {
                    put(&mut out, x.to_le_bytes(), x.to_be_bytes(), byte_order);
                }
            }
            TagValue::Rational(v) => {
                for (n, d) in v {
                    put(&mut out, n.to_le_bytes(), n.to_be_bytes(), byte_order);
                    put(&mut out, d.to_le_bytes(), d.to_be_bytes(), byte_order);
                }
            }
            TagValue::SRational(v) => {
                for (n, d) in v {
                    put(&mut out, n.to_le_bytes(), n.to_be_bytes(), byte_order);
                    put(&mut out, d.to_le_bytes(), d.to_be_bytes(), byte_order);
                }
            }
        }
        out
    }
}

/// Elements shown before a displayed value is elided.
const DISPLAY_LIMIT: usize = 8;

fn write_list<T>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    item: impl Fn(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    if items.len() == 1 {
        return item(f, &items[0]);
    }
    write!(f, "[")?;
    for (i, value) in items.iter().take(DISPLAY_LIMIT).enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        item(f, value)?;
    }
    if items.len() > DISPLAY_LIMIT {
        write!(f, ", ... ({} values)", items.len())?;
    }
    write!(f, "]")
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Ascii(s) => write!(f, "{:?}", s),
            TagValue::Byte(v) | TagValue::Undefined(v) | TagValue::Raw(v) => {
                write_list(f, v, |f, x| write!(f, "{}", x))
            }
            TagValue::Short(v) => write_list(f, v, |f, x| write!(f, "{}", x)),
            TagValue::Long(v) => write_list(f, v, |f, x| write!(f, "{}", x)),
            TagValue::SByte(v) => write_list(f, v, |f, x| write!(f, "{}", x)),
            TagValue::SShort(v) => write_list(f, v, |f, x| write!(f, "{}", x)),
            TagValue::SLong(v) => write_list(f, v, |f, x| write!(f, "{}", x)),
            TagValue::Float(v) => write_list(f, v, |f, x| write!(f, "{}", x)),
            TagValue::Double(v) => write_list(f, v, |f, x| write!(f, "{}", x)),
            TagValue::Rational(v) => write_list(f, v, |f, (n, d)| write!(f, "{}/{}", n, d)),
            TagValue::SRational(v) => write_list(f, v, |f, (n, d)| write!(f, "{}/{}", n, d)),
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode `count` elements of `field_type` from `bytes`.
///
/// `bytes` must hold at least `field_type.data_length(count)` bytes.
pub fn decode_values(
    bytes: &[u8],
    field_type: FieldType,
    count: usize,
    byte_order: ByteOrder,
) -> TagValue {
    let chunks = |width: usize| bytes.chunks_exact(width).take(count);

    match field_type {
        FieldType::Byte => TagValue::Byte(bytes[..count].to_vec()),
        FieldType::Undefined => TagValue::Undefined(bytes[..count].to_vec()),
        FieldType::Unknown(_) => TagValue::Raw(bytes[..count].to_vec()),
        FieldType::SByte => TagValue::SByte(bytes[..count].iter().map(|&b| b as i8).collect()),
        FieldType::Ascii => TagValue::Ascii(decode_text(&bytes[..count])),
        FieldType::Short => TagValue::Short(chunks(2).map(|c| byte_order.read_u16(c)).collect()),
        FieldType::SShort => {
            TagValue::SShort(chunks(2).map(|c| byte_order.read_u16(c) as i16).collect())
        }
        FieldType::Long => TagValue::Long(chunks(4).map(|c| byte_order.read_u32(c)).collect()),
        FieldType::SLong => {
            TagValue::SLong(chunks(4).map(|c| byte_order.read_u32(c) as i32).collect())
        }
        FieldType::Float => TagValue::Float(
            chunks(4)
                .map(|c| f32::from_bits(byte_order.read_u32(c)))
                .collect(),
        ),
        FieldType::Double => TagValue::Double(
            chunks(8)
                .map(|c| f64::from_bits(byte_order.read_u64(c)))
                .collect(),
        ),
        FieldType::Rational => TagValue::Rational(
            chunks(8)
                .map(|c| (byte_order.read_u32(&c[0..4]), byte_order.read_u32(&c[4..8])))
                .collect(),
        ),
        FieldType::SRational => TagValue::SRational(
            chunks(8)
                .map(|c| {
                    (
                        byte_order.read_u32(&c[0..4]) as i32,
                        byte_order.read_u32(&c[4..8]) as i32,
                    )
                })
                .collect(),
        ),
    }
}

/// Drop the final terminator byte and decode the rest as characters.
fn decode_text(bytes: &[u8]) -> String {
    let text = match bytes.split_last() {
        Some((_, rest)) => rest,
        None => bytes,
    };
    text.iter().map(|&b| char::from(b)).collect()
}

/// Read `count` elements of `field_type` at `offset` in the file buffer.
///
/// Fails with `Truncated` if the data extends past the end of the buffer.
pub fn fetch_values(
    buffer: &[u8],
    offset: u64,
    field_type: FieldType,
    count: u32,
    byte_order: ByteOrder,
) -> Result<TagValue, TiffError> {
    let length = field_type.data_length(count);
    let bytes = checked_slice(buffer, offset, length, "tag value")?;
    Ok(decode_values(bytes, field_type, count as usize, byte_order))
}

/// Decode an entry's value, inline or from the buffer.
pub fn read_entry_value(
    buffer: &[u8],
    entry: &IfdEntry,
    byte_order: ByteOrder,
) -> Result<TagValue, TiffError> {
    match entry.value {
        EntryValue::Inline(bytes) => Ok(decode_values(
            &bytes,
            entry.field_type,
            entry.count as usize,
            byte_order,
        )),
        EntryValue::Offset(offset) => fetch_values(
            buffer,
            u64::from(offset),
            entry.field_type,
            entry.count,
            byte_order,
        ),
    }
}

// =============================================================================
// Tests
// =============================================================================
