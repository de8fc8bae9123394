//! JPEG tile decoding.
//!
//! JPEG-compressed TIFF tiles are often "abbreviated" streams: every tile
//! carries only its scan data, while the quantization (DQT) and Huffman
//! (DHT) tables are stored once in the directory's `JPEGTables` tag. Such a
//! tile has to be spliced together with the tables before a standard
//! decoder can read it:
//!
//! ```text
//! tables: SOI DQT DHT ... EOI
//! tile:   SOI SOF SOS <scan> EOI
//! merged: SOI DQT DHT ... SOF SOS <scan> EOI
//! ```

use std::io::Cursor;

use bytes::{Bytes, BytesMut};
use image::{ImageFormat, ImageReader};

use crate::error::TiffError;

use super::{DecodeContext, DecodedTile, TileDecoder};

/// Start Of Image marker
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// End Of Image marker
pub const EOI: [u8; 2] = [0xFF, 0xD9];

const DHT: u8 = 0xC4;
const DQT: u8 = 0xDB;
const SOS: u8 = 0xDA;

/// Marker codes of the segments before the first scan.
///
/// Stops at SOS, since entropy-coded data follows it.
fn header_markers(data: &[u8]) -> impl Iterator<Item = u8> + '_ {
    let mut pos = SOI.len();
    let mut done = data.len() < SOI.len() || data[..2] != SOI;

    std::iter::from_fn(move || {
        while !done && pos + 1 < data.len() {
            if data[pos] != 0xFF {
                pos += 1;
                continue;
            }
            let marker = data[pos + 1];
            match marker {
                // Fill bytes
                0xFF => pos += 1,
                // Standalone markers carry no length
                0x00 | 0x01 | 0xD0..=0xD9 => pos += 2,
                _ => {
                    if marker == SOS {
                        done = true;
                    } else if pos + 3 < data.len() {
                        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]);
                        pos += 2 + usize::from(length);
                    } else {
                        done = true;
                    }
                    return Some(marker);
                }
            }
        }
        None
    })
}

/// Whether the stream carries its own quantization or Huffman tables.
pub fn has_tables(data: &[u8]) -> bool {
    header_markers(data).any(|m| m == DQT || m == DHT)
}

/// Whether the stream reaches its scan without defining any tables.
pub fn is_abbreviated_stream(data: &[u8]) -> bool {
    let mut saw_tables = false;
    for marker in header_markers(data) {
        match marker {
            DQT | DHT => saw_tables = true,
            SOS => return !saw_tables,
            _ => {}
        }
    }
    false
}

/// Splice `JPEGTables` into an abbreviated tile stream.
///
/// Drops the tables' trailing EOI and the tile's leading SOI.
pub fn merge_jpeg_tables(tables: &[u8], tile: &[u8]) -> Bytes {
    if tables.is_empty() {
        return Bytes::copy_from_slice(tile);
    }
    if tile.is_empty() {
        return Bytes::new();
    }

    let tables = tables.strip_suffix(&EOI[..]).unwrap_or(tables);
    let tile = tile.strip_prefix(&SOI[..]).unwrap_or(tile);

    let mut merged = BytesMut::with_capacity(tables.len() + tile.len());
    merged.extend_from_slice(tables);
    merged.extend_from_slice(tile);
    merged.freeze()
}

/// Produce a self-contained JPEG stream for a tile.
///
/// Tiles that already carry tables, or with no tables to merge, are
/// returned unchanged.
pub fn prepare_tile_jpeg(tables: Option<&[u8]>, tile: &[u8]) -> Bytes {
    match tables {
        Some(tables) if !has_tables(tile) && is_abbreviated_stream(tile) => {
            merge_jpeg_tables(tables, tile)
        }
        _ => Bytes::copy_from_slice(tile),
    }
}

/// Decoder for compression schemes 7 (JPEG) and 34892 (lossy JPEG).
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegDecoder;

impl TileDecoder for JpegDecoder {
    fn name(&self) -> &'static str {
        "jpeg"
    }

    fn decode(&self, data: &[u8], context: &DecodeContext<'_>) -> Result<DecodedTile, TiffError> {
        let stream = prepare_tile_jpeg(context.jpeg_tables, data);

        let reader = ImageReader::with_format(Cursor::new(&stream[..]), ImageFormat::Jpeg);
        let image = reader
            .decode()
            .map_err(|e| TiffError::Decode(e.to_string()))?;

        Ok(DecodedTile {
            width: image.width(),
            height: image.height(),
            valid_width: context.valid_width.min(image.width()),
            valid_height: context.valid_height.min(image.height()),
            color: format!("{:?}", image.color()),
            pixels: Bytes::from(image.into_bytes()),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
