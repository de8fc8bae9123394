//! IFD chain walking.
//!
//! A TIFF file is a header followed by a linked list of Image File
//! Directories. Each directory is:
//!
//! ```text
//! [entry_count: u16][entry_count x 12-byte entries][next_offset: u32]
//! ```
//!
//! The walker reads directories until `next_offset` is zero. Offsets that
//! were already visited are rejected, so a corrupt chain fails instead of
//! looping forever.
//!
//! Per directory, entries are decoded in two passes: first every entry's
//! value, then the GeoKey directory (which references sibling tags). Tile
//! grids are computed once the whole chain has been read.

use std::collections::{HashMap, HashSet};

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::debug;

use crate::error::{Diagnostic, TiffError};
use crate::io::{read_all, RangeReader};

use super::geokeys::{resolve_geo_keys, GeoKeyDirectory};
use super::parser::{
    checked_slice, read_entry, ByteOrder, IfdEntry, TiffHeader, IFD_COUNT_SIZE, IFD_ENTRY_SIZE,
    IFD_NEXT_OFFSET_SIZE,
};
use super::tags::{interpret, FieldType, Interpretation, TiffTag};
use super::tiles::TileGrid;
use super::values::{read_entry_value, TagValue};

// =============================================================================
// Field
// =============================================================================

/// A decoded directory entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Raw entry as read from the directory table
    pub entry: IfdEntry,

    /// Decoded value
    ///
    /// Empty `Raw` if the value pointer ran past the end of the file.
    pub value: TagValue,

    /// Readable meaning of the value, for tags with named values
    pub interpretation: Option<Interpretation>,
}

impl Field {
    pub fn tag(&self) -> TiffTag {
        self.entry.tag
    }

    /// Field name used as this field's key in reports.
    pub fn key(&self) -> String {
        self.entry.tag.field_key()
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Field", 7)?;
        state.serialize_field("tag", &self.entry.tag)?;
        state.serialize_field("type", self.entry.field_type.name())?;
        state.serialize_field("declared_type", &self.entry.declared_type)?;
        state.serialize_field("count", &self.entry.count)?;
        state.serialize_field("inline", &self.entry.is_inline())?;
        state.serialize_field("value", &self.value)?;
        state.serialize_field("interpretation", &self.interpretation)?;
        state.end()
    }
}

// =============================================================================
// Directory
// =============================================================================

/// One Image File Directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Directory {
    /// Position in the chain, starting at 0
    pub index: usize,

    /// Byte offset of the directory in the file
    pub offset: u32,

    /// Offset of the next directory (0 for the last one)
    pub next_offset: u32,

    /// Fields in declaration order
    #[serde(serialize_with = "serialize_fields")]
    pub fields: Vec<Field>,

    /// Resolved GeoKeys, if the directory carries a GeoKeyDirectoryTag
    pub geo_keys: Option<GeoKeyDirectory>,

    /// Tile byte ranges, for tiled directories
    pub tile_grid: Option<TileGrid>,
}

/// Fields keyed by name. Repeats of a tag get a ` (n)` suffix so every
/// entry keeps its own key.
#[allow(clippy::ptr_arg)]
fn serialize_fields<S: Serializer>(fields: &Vec<Field>, serializer: S) -> Result<S::Ok, S::Error> {
    let mut seen: HashMap<TiffTag, usize> = HashMap::new();
    let mut map = serializer.serialize_map(Some(fields.len()))?;
    for field in fields {
        let occurrence = seen.entry(field.tag()).or_insert(0);
        *occurrence += 1;
        let key = match *occurrence {
            1 => field.key(),
            n => format!("{} ({})", field.key(), n),
        };
        map.serialize_entry(&key, field)?;
    }
    map.end()
}

impl Directory {
    /// Get a field by tag.
    pub fn field(&self, tag: TiffTag) -> Option<&Field> {
        self.fields.iter().find(|f| f.entry.tag == tag)
    }

    /// Get a field's decoded value by tag.
    pub fn value(&self, tag: TiffTag) -> Option<&TagValue> {
        self.field(tag).map(|f| &f.value)
    }

    /// First unsigned integer value of a tag.
    pub fn get_u64(&self, tag: TiffTag) -> Option<u64> {
        self.value(tag)?.first_u64()
    }

    /// First unsigned integer value of a tag, if it fits in a u32.
    pub fn get_u32(&self, tag: TiffTag) -> Option<u32> {
        u32::try_from(self.get_u64(tag)?).ok()
    }

    /// All unsigned integer values of a tag.
    pub fn get_u64_array(&self, tag: TiffTag) -> Option<Vec<u64>> {
        self.value(tag)?.as_u64_vec()
    }

    pub fn image_width(&self) -> Option<u32> {
        self.get_u32(TiffTag::ImageWidth)
    }

    pub fn image_height(&self) -> Option<u32> {
        self.get_u32(TiffTag::ImageHeight)
    }

    pub fn tile_width(&self) -> Option<u32> {
        self.get_u32(TiffTag::TileWidth)
    }

    pub fn tile_length(&self) -> Option<u32> {
        self.get_u32(TiffTag::TileLength)
    }

    /// Compression scheme id (1 = none when the tag is absent).
    pub fn compression(&self) -> u16 {
        self.get_u32(TiffTag::Compression)
            .and_then(|c| u16::try_from(c).ok())
            .unwrap_or(1)
    }

    /// Whether the directory declares a tile layout.
    pub fn is_tiled(&self) -> bool {
        self.field(TiffTag::TileWidth).is_some() && self.field(TiffTag::TileLength).is_some()
    }

    /// JPEGTables bytes, shared by the abbreviated JPEG tiles of this directory.
    pub fn jpeg_tables(&self) -> Option<&[u8]> {
        self.value(TiffTag::JpegTables)?.as_bytes()
    }

    /// Second pass: resolve the GeoKeyDirectoryTag against sibling fields.
    fn resolve_geo_keys(&self, diagnostics: &mut Vec<Diagnostic>) -> Option<GeoKeyDirectory> {
        let raw = self.value(TiffTag::GeoKeyDirectory)?;
        let shorts: Vec<u16> = match raw.as_shorts() {
            Some(shorts) => shorts.to_vec(),
            None => raw
                .as_u64_vec()
                .unwrap_or_default()
                .into_iter()
                .map(|v| u16::try_from(v).unwrap_or(u16::MAX))
                .collect(),
        };

        Some(resolve_geo_keys(
            &shorts,
            self.index,
            |tag| self.value(TiffTag::from_u16(tag)),
            diagnostics,
        ))
    }
}

// =============================================================================
// Parse results
// =============================================================================

/// A fully parsed TIFF file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TiffFile {
    pub header: TiffHeader,

    /// Directories in chain order
    pub directories: Vec<Directory>,

    /// Non-fatal conditions found while parsing
    pub diagnostics: Vec<Diagnostic>,
}

/// A parse that stopped on a fatal error.
///
/// Carries everything that was read before the error.
#[derive(Debug, Clone, Error)]
#[error("{error}")]
pub struct ParseFailure {
    #[source]
    pub error: TiffError,
    pub directories: Vec<Directory>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseFailure {
    fn new(error: TiffError) -> Self {
        Self {
            error,
            directories: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}

impl TiffFile {
    /// Parse a complete TIFF file held in memory.
    pub fn parse(buffer: &[u8]) -> Result<Self, ParseFailure> {
        let header = TiffHeader::parse(buffer).map_err(ParseFailure::new)?;
        debug!(
            byte_order = ?header.byte_order,
            first_ifd_offset = header.first_ifd_offset,
            "parsed TIFF header"
        );

        let mut directories: Vec<Directory> = Vec::new();
        let mut diagnostics = Vec::new();
        let mut visited = HashSet::new();
        let mut offset = header.first_ifd_offset;

        while offset != 0 {
            let index = directories.len();

            let result = if visited.insert(offset) {
                read_directory(buffer, offset, index, header.byte_order, &mut diagnostics)
            } else {
                Err(TiffError::CorruptDirectoryChain {
                    offset,
                    directory_index: index.saturating_sub(1),
                })
            };

            match result {
                Ok(directory) => {
                    offset = directory.next_offset;
                    directories.push(directory);
                }
                Err(error) => {
                    debug!(directory = index, offset, %error, "directory walk stopped");
                    attach_tile_grids(&mut directories, &mut diagnostics);
                    return Err(ParseFailure {
                        error,
                        directories,
                        diagnostics,
                    });
                }
            }
        }

        attach_tile_grids(&mut directories, &mut diagnostics);

        debug!(
            directories = directories.len(),
            diagnostics = diagnostics.len(),
            "parsed TIFF file"
        );

        Ok(TiffFile {
            header,
            directories,
            diagnostics,
        })
    }

    /// Read a whole resource through a [`RangeReader`] and parse it.
    pub async fn read<R: RangeReader + ?Sized>(reader: &R) -> Result<Self, ParseFailure> {
        let buffer = read_all(reader)
            .await
            .map_err(|e| ParseFailure::new(e.into()))?;
        debug!(source = reader.identifier(), size = buffer.len(), "read TIFF bytes");
        Self::parse(&buffer)
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.header.byte_order
    }

    /// Get a directory by chain index.
    pub fn directory(&self, index: usize) -> Option<&Directory> {
        self.directories.get(index)
    }

    /// First directory carrying GeoKeys.
    pub fn geo_directory(&self) -> Option<&Directory> {
        self.directories.iter().find(|d| d.geo_keys.is_some())
    }
}

fn attach_tile_grids(directories: &mut [Directory], diagnostics: &mut Vec<Diagnostic>) {
    for directory in directories.iter_mut() {
        directory.tile_grid = TileGrid::from_directory(directory, diagnostics);
    }
}

/// Read one directory at `offset` and decode all of its entries.
fn read_directory(
    buffer: &[u8],
    offset: u32,
    index: usize,
    byte_order: ByteOrder,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Directory, TiffError> {
    let start = u64::from(offset);
    let count_bytes = checked_slice(buffer, start, IFD_COUNT_SIZE as u64, "IFD entry count")?;
    let entry_count = byte_order.read_u16(count_bytes);

    let table_offset = start + IFD_COUNT_SIZE as u64;
    let table_size = u64::from(entry_count) * IFD_ENTRY_SIZE as u64;
    let table = checked_slice(
        buffer,
        table_offset,
        table_size + IFD_NEXT_OFFSET_SIZE as u64,
        "IFD entry table",
    )?;
    let next_offset = byte_order.read_u32(&table[table_size as usize..]);

    debug!(
        directory = index,
        offset,
        entries = entry_count,
        next_offset,
        "reading IFD"
    );

    let mut fields = Vec::with_capacity(usize::from(entry_count));
    let mut tags = HashSet::new();
    for i in 0..entry_count {
        let entry = read_entry(buffer, table_offset, i, byte_order)?;
        let tag_id = entry.tag.as_u16();

        if !tags.insert(tag_id) {
            diagnostics.push(Diagnostic::DuplicateTag {
                directory: index,
                tag: tag_id,
            });
        }

        if let FieldType::Unknown(field_type) = entry.field_type {
            diagnostics.push(Diagnostic::UnknownFieldType {
                directory: index,
                tag: tag_id,
                field_type,
            });
        }
        if entry.tag.is_unknown() {
            diagnostics.push(Diagnostic::UnknownTag {
                directory: index,
                tag: tag_id,
            });
        }

        let value = match read_entry_value(buffer, &entry, byte_order) {
            Ok(value) => value,
            Err(TiffError::Truncated { .. }) => {
                diagnostics.push(Diagnostic::ValueOutOfBounds {
                    directory: index,
                    tag: tag_id,
                    offset: entry.value_offset().unwrap_or(0),
                    length: entry.data_length(),
                });
                TagValue::Raw(Vec::new())
            }
            Err(e) => return Err(e),
        };

        let interpretation = value.first_u64().and_then(|raw| interpret(entry.tag, raw));
        fields.push(Field {
            entry,
            value,
            interpretation,
        });
    }

    let mut directory = Directory {
        index,
        offset,
        next_offset,
        fields,
        geo_keys: None,
        tile_grid: None,
    };
    directory.geo_keys = directory.resolve_geo_keys(diagnostics);

    Ok(directory)
}

// =============================================================================
// Tests
// =============================================================================
