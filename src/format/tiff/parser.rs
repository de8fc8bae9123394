//! TIFF header and directory entry parsing.
//!
//! This module handles the fixed-layout structures of a classic TIFF file:
//! the 8-byte header and the 12-byte directory entries.
//!
//! # TIFF Header Structure
//!
//! ```text
//! Bytes 0-1: Byte order (0x4949 = little-endian "II", 0x4D4D = big-endian "MM")
//! Bytes 2-3: Version (42 = 0x002A)
//! Bytes 4-7: Offset to first IFD (4 bytes)
//! ```
//!
//! BigTIFF (version 43) is recognized and rejected.
//!
//! # Entry Structure
//!
//! ```text
//! Bytes 0-1:  Tag id
//! Bytes 2-3:  Field type
//! Bytes 4-7:  Value count
//! Bytes 8-11: Value (if it fits in 4 bytes, left-justified) or offset to it
//! ```

use serde::Serialize;
use tracing::trace;

use crate::error::TiffError;
use crate::io::{read_u16_be, read_u16_le, read_u32_be, read_u32_le, read_u64_be, read_u64_le};

use super::tags::{FieldType, TiffTag};

// =============================================================================
// Constants
// =============================================================================

/// Magic bytes indicating little-endian byte order ("II" for Intel)
const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// Magic bytes indicating big-endian byte order ("MM" for Motorola)
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

/// Version number for classic TIFF
const VERSION_TIFF: u16 = 42;

/// Version number for BigTIFF
const VERSION_BIGTIFF: u16 = 43;

/// Size of classic TIFF header in bytes
pub const TIFF_HEADER_SIZE: usize = 8;

/// Size of one directory entry in bytes
pub const IFD_ENTRY_SIZE: usize = 12;

/// Size of the entry count at the start of a directory
pub const IFD_COUNT_SIZE: usize = 2;

/// Size of the next-directory pointer after the entry table
pub const IFD_NEXT_OFFSET_SIZE: usize = 4;

// =============================================================================
// Bounds-checked access
// =============================================================================

/// Borrow `len` bytes at `offset`, or fail with the offset that overran.
pub(crate) fn checked_slice<'a>(
    buffer: &'a [u8],
    offset: u64,
    len: u64,
    context: &'static str,
) -> Result<&'a [u8], TiffError> {
    let available = (buffer.len() as u64).saturating_sub(offset);
    if offset > buffer.len() as u64 || len > available {
        return Err(TiffError::Truncated {
            context,
            offset,
            needed: len,
            available,
        });
    }
    // Both bounds are within `buffer.len()` here, so they fit in usize.
    let start = offset as usize;
    let end = start + len as usize;
    Ok(&buffer[start..end])
}

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of a TIFF file.
///
/// TIFF files declare their byte order in the first two bytes of the header.
/// All multi-byte values in the file must be read respecting this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

impl ByteOrder {
    /// Read a u16 from a byte slice using this byte order.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => read_u16_le(bytes),
            ByteOrder::BigEndian => read_u16_be(bytes),
        }
    }

    /// Read a u32 from a byte slice using this byte order.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => read_u32_le(bytes),
            ByteOrder::BigEndian => read_u32_be(bytes),
        }
    }

    /// Read a u64 from a byte slice using this byte order.
    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        match self {
            ByteOrder::LittleEndian => read_u64_le(bytes),
            ByteOrder::BigEndian => read_u64_be(bytes),
        }
    }
}

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed TIFF file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TiffHeader {
    /// Byte order for all multi-byte values in the file
    pub byte_order: ByteOrder,

    /// Offset to the first IFD in the file
    pub first_ifd_offset: u32,
}

impl TiffHeader {
    /// Parse a TIFF header from the start of a file buffer.
    ///
    /// # Errors
    /// - `FileTooSmall` if there aren't enough bytes for the header
    /// - `InvalidMagic` if byte order bytes are not II or MM
    /// - `BigTiffUnsupported` for version 43
    /// - `InvalidVersion` for any other version than 42
    pub fn parse(bytes: &[u8]) -> Result<Self, TiffError> {
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        // Checking for specific byte patterns, so the order is fixed here
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = match magic {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => return Err(TiffError::InvalidMagic(magic)),
        };

        let version = byte_order.read_u16(&bytes[2..4]);
        match version {
            VERSION_TIFF => {}
            VERSION_BIGTIFF => return Err(TiffError::BigTiffUnsupported),
            other => return Err(TiffError::InvalidVersion(other)),
        }

        let first_ifd_offset = byte_order.read_u32(&bytes[4..8]);

        Ok(TiffHeader {
            byte_order,
            first_ifd_offset,
        })
    }
}

// =============================================================================
// IfdEntry
// =============================================================================

/// Where an entry's value lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryValue {
    /// Value stored in the entry itself, left-justified, in file byte order
    Inline([u8; 4]),
    /// Offset of the value elsewhere in the file
    Offset(u32),
}

/// A single directory entry, before its value is decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    /// Tag identifying the field
    pub tag: TiffTag,

    /// Field type used to decode the value
    ///
    /// For XMP this is always ASCII, whatever the file declares.
    pub field_type: FieldType,

    /// Field type id as written in the file
    pub declared_type: u16,

    /// Number of values
    pub count: u32,

    /// Inline value or pointer
    pub value: EntryValue,

    /// Byte offset of this entry in the file
    pub entry_offset: u64,
}

impl IfdEntry {
    /// Total size of the value data in bytes.
    #[inline]
    pub fn data_length(&self) -> u64 {
        self.field_type.data_length(self.count)
    }

    /// Whether the value is stored inline.
    #[inline]
    pub fn is_inline(&self) -> bool {
        matches!(self.value, EntryValue::Inline(_))
    }

    /// Offset of the value data, if stored out of line.
    #[inline]
    pub fn value_offset(&self) -> Option<u32> {
        match self.value {
            EntryValue::Offset(offset) => Some(offset),
            EntryValue::Inline(_) => None,
        }
    }
}

/// Decode one 12-byte directory entry.
///
/// `table_offset` is the offset of the first entry (just past the entry
/// count). The entry lives at `table_offset + index * 12`.
pub fn read_entry(
    buffer: &[u8],
    table_offset: u64,
    index: u16,
    byte_order: ByteOrder,
) -> Result<IfdEntry, TiffError> {
    let entry_offset = table_offset + u64::from(index) * IFD_ENTRY_SIZE as u64;
    let bytes = checked_slice(buffer, entry_offset, IFD_ENTRY_SIZE as u64, "IFD entry")?;

    let tag = TiffTag::from_u16(byte_order.read_u16(&bytes[0..2]));
    let declared_type = byte_order.read_u16(&bytes[2..4]);
    let count = byte_order.read_u32(&bytes[4..8]);

    // XMP packets are text regardless of the declared type
    let field_type = if tag == TiffTag::Xmp {
        FieldType::Ascii
    } else {
        FieldType::from_u16(declared_type)
    };

    let value = if field_type.fits_inline(count) {
        EntryValue::Inline([bytes[8], bytes[9], bytes[10], bytes[11]])
    } else {
        EntryValue::Offset(byte_order.read_u32(&bytes[8..12]))
    };

    trace!(
        tag = tag.as_u16(),
        field_type = declared_type,
        count,
        inline = matches!(value, EntryValue::Inline(_)),
        "read IFD entry"
    );

    Ok(IfdEntry {
        tag,
        field_type,
        declared_type,
        count,
        value,
        entry_offset,
    })
}

// =============================================================================
// Tests
// =============================================================================
