use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// I/O errors that can occur when acquiring file bytes
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error from S3 or S3-compatible storage
    #[error("S3 error: {0}")]
    S3(String),

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// Storage answered a range request with a different number of bytes
    #[error("Short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u64,
        expected: u64,
        actual: u64,
    },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Object or file not found
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Local filesystem error
    #[error("File error: {0}")]
    File(String),
}

/// Fatal errors that stop a TIFF parse or a tile request.
///
/// Every variant raised by the directory walker carries the byte offset
/// where parsing stopped.
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while acquiring bytes
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// File is too small to contain a valid TIFF header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Invalid byte-order marker (not II or MM)
    #[error("Invalid TIFF magic bytes at offset 0: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Format marker is neither classic TIFF nor BigTIFF
    #[error("Invalid TIFF version at offset 2: expected 42, got {0}")]
    InvalidVersion(u16),

    /// 64-bit (BigTIFF) variant, recognized but not supported
    #[error("Unsupported format at offset 2: BigTIFF (version 43) is not supported")]
    BigTiffUnsupported,

    /// A structure extends past the end of the buffer
    #[error("Truncated {context} at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        context: &'static str,
        offset: u64,
        needed: u64,
        available: u64,
    },

    /// The next-directory chain points back at a directory already read
    #[error("Corrupt directory chain: directory {directory_index} points back to offset {offset}")]
    CorruptDirectoryChain { offset: u32, directory_index: usize },

    /// Required tag is missing from a directory
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// No decoder registered for a compression scheme
    #[error("Unsupported compression: {0}")]
    UnsupportedCompression(String),

    /// Tile coordinate or directory index outside the grid
    #[error("Tile out of bounds: directory {directory}, tile ({x}, {y})")]
    TileOutOfBounds { directory: usize, x: u32, y: u32 },

    /// A tile codec failed to decode its input
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Non-fatal conditions collected while parsing.
///
/// These are returned alongside a successful result so callers can report
/// them; the parser never prints them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Entry declares a field type outside the 12 classic types
    UnknownFieldType {
        directory: usize,
        tag: u16,
        field_type: u16,
    },

    /// Entry tag id is not in the tag table
    UnknownTag { directory: usize, tag: u16 },

    /// Tag appears more than once in the same directory
    DuplicateTag { directory: usize, tag: u16 },

    /// GeoKey id outside every known range
    UnknownGeoKey { directory: usize, key_id: u16 },

    /// GeoKeyDirectory header outside `{1, 1, 0|1}`
    GeoKeyHeaderMismatch {
        directory: usize,
        version: u16,
        revision: u16,
        minor_revision: u16,
    },

    /// GeoKey references a tag that is absent or too short
    GeoKeyLookupMiss {
        directory: usize,
        key_id: u16,
        tag_location: u16,
        count: u16,
        value_offset: u16,
    },

    /// GeoKeyDirectory declares more keys than it holds
    GeoKeyTruncated {
        directory: usize,
        declared: u16,
        available: usize,
    },

    /// Entry value pointer runs past the end of the buffer
    ValueOutOfBounds {
        directory: usize,
        tag: u16,
        offset: u32,
        length: u64,
    },

    /// Tiled directory lacks what is needed to lay out its tiles
    IncompleteTileLayout {
        directory: usize,
        reason: &'static str,
    },

    /// TileOffsets/TileByteCounts do not cover the tile grid
    TileTableMismatch {
        directory: usize,
        expected: usize,
        offsets: usize,
        byte_counts: usize,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownFieldType {
                directory,
                tag,
                field_type,
            } => write!(
                f,
                "IFD {directory}: tag {tag} has unknown field type {field_type}, decoded as raw bytes"
            ),
            Diagnostic::UnknownTag { directory, tag } => {
                write!(f, "IFD {directory}: unknown tag {tag}")
            }
            Diagnostic::DuplicateTag { directory, tag } => {
                write!(f, "IFD {directory}: tag {tag} appears more than once")
            }
            Diagnostic::UnknownGeoKey { directory, key_id } => {
                write!(f, "IFD {directory}: unknown GeoKey {key_id}")
            }
            Diagnostic::GeoKeyHeaderMismatch {
                directory,
                version,
                revision,
                minor_revision,
            } => write!(
                f,
                "IFD {directory}: GeoKey directory header is {version}.{revision}.{minor_revision}, expected 1.1.0 or 1.1.1"
            ),
            Diagnostic::GeoKeyLookupMiss {
                directory,
                key_id,
                tag_location,
                count,
                value_offset,
            } => write!(
                f,
                "IFD {directory}: GeoKey {key_id} references {count} values at index {value_offset} of tag {tag_location}, which is absent or too short"
            ),
            Diagnostic::GeoKeyTruncated {
                directory,
                declared,
                available,
            } => write!(
                f,
                "IFD {directory}: GeoKey directory declares {declared} keys but holds {available}"
            ),
            Diagnostic::ValueOutOfBounds {
                directory,
                tag,
                offset,
                length,
            } => write!(
                f,
                "IFD {directory}: value of tag {tag} ({length} bytes at offset {offset}) runs past the end of the file"
            ),
            Diagnostic::IncompleteTileLayout { directory, reason } => {
                write!(f, "IFD {directory}: no tile grid, {reason}")
            }
            Diagnostic::TileTableMismatch {
                directory,
                expected,
                offsets,
                byte_counts,
            } => write!(
                f,
                "IFD {directory}: grid has {expected} tiles but TileOffsets has {offsets} and TileByteCounts has {byte_counts}"
            ),
        }
    }
}
