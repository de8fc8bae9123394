//! Tile addressing.
//!
//! A tiled directory stores its image as a grid of `TileWidth x TileLength`
//! blocks, in row-major order. The byte range of tile `(x, y)` is found at
//! index `y * tiles_x + x` of the parallel TileOffsets and TileByteCounts
//! arrays.
//!
//! This is pure layout: nothing here reads the file or checks ranges
//! against its size.

use serde::Serialize;

use crate::error::Diagnostic;

use super::directory::Directory;
use super::tags::TiffTag;

/// Byte range of one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileRange {
    /// Linear index `y * tiles_x + x`
    pub index: usize,
    pub x: u32,
    pub y: u32,

    /// Offset of the first byte
    pub start: u64,

    /// Offset one past the last byte
    pub end: u64,

    pub length: u64,
}

/// Tile layout of a directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileGrid {
    pub image_width: u32,
    pub image_height: u32,
    pub tile_width: u32,
    pub tile_length: u32,

    /// Number of tile columns, `ceil(image_width / tile_width)`
    pub tiles_x: u32,

    /// Number of tile rows, `ceil(image_height / tile_length)`
    pub tiles_y: u32,

    /// Byte ranges in linear index order
    ///
    /// Shorter than `tile_count()` when the offset tables are.
    pub tiles: Vec<TileRange>,
}

impl TileGrid {
    /// Build a grid from dimensions and the offset/byte-count tables.
    ///
    /// Returns `None` if a tile dimension is zero.
    pub fn new(
        image_width: u32,
        image_height: u32,
        tile_width: u32,
        tile_length: u32,
        offsets: &[u64],
        byte_counts: &[u64],
    ) -> Option<Self> {
        if tile_width == 0 || tile_length == 0 {
            return None;
        }

        let tiles_x = image_width.div_ceil(tile_width);
        let tiles_y = image_height.div_ceil(tile_length);

        let mut grid = TileGrid {
            image_width,
            image_height,
            tile_width,
            tile_length,
            tiles_x,
            tiles_y,
            tiles: Vec::new(),
        };

        let available = grid.tile_count().min(offsets.len()).min(byte_counts.len());
        grid.tiles = (0..available)
            .map(|index| {
                let start = offsets[index];
                let length = byte_counts[index];
                TileRange {
                    index,
                    x: (index % tiles_x as usize) as u32,
                    y: (index / tiles_x as usize) as u32,
                    start,
                    end: start.saturating_add(length),
                    length,
                }
            })
            .collect();

        Some(grid)
    }

    /// Build the grid for a tiled directory.
    ///
    /// Returns `None` for strip-organized directories. Missing dimensions
    /// or offset tables, and tables that do not match the grid, are
    /// reported through `diagnostics`.
    pub fn from_directory(directory: &Directory, diagnostics: &mut Vec<Diagnostic>) -> Option<Self> {
        if !directory.is_tiled() {
            return None;
        }

        let incomplete = |reason| Diagnostic::IncompleteTileLayout {
            directory: directory.index,
            reason,
        };

        let (Some(tile_width), Some(tile_length)) = (directory.tile_width(), directory.tile_length())
        else {
            diagnostics.push(incomplete("TileWidth and TileLength must be unsigned integers"));
            return None;
        };
        let (Some(image_width), Some(image_height)) =
            (directory.image_width(), directory.image_height())
        else {
            diagnostics.push(incomplete("missing ImageWidth or ImageHeight"));
            return None;
        };

        // A single-tile image may store these as scalars; they still decode
        // as one-element arrays.
        let offsets = directory
            .get_u64_array(TiffTag::TileOffsets)
            .unwrap_or_default();
        let byte_counts = directory
            .get_u64_array(TiffTag::TileByteCounts)
            .unwrap_or_default();

        let Some(grid) = TileGrid::new(
            image_width,
            image_height,
            tile_width,
            tile_length,
            &offsets,
            &byte_counts,
        ) else {
            diagnostics.push(incomplete("zero tile dimension"));
            return None;
        };

        let expected = grid.tile_count();
        if offsets.len() != expected || byte_counts.len() != expected {
            diagnostics.push(Diagnostic::TileTableMismatch {
                directory: directory.index,
                expected,
                offsets: offsets.len(),
                byte_counts: byte_counts.len(),
            });
        }

        Some(grid)
    }

    /// Total number of tiles in the grid.
    pub fn tile_count(&self) -> usize {
        let count = u64::from(self.tiles_x) * u64::from(self.tiles_y);
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    /// Whether every tile in the grid has a byte range.
    pub fn is_complete(&self) -> bool {
        self.tiles.len() == self.tile_count()
    }

    /// Linear index of tile `(x, y)`.
    ///
    /// Returns None if the coordinates are out of bounds.
    pub fn tile_index(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.tiles_x || y >= self.tiles_y {
            return None;
        }
        Some(y as usize * self.tiles_x as usize + x as usize)
    }

    /// Byte range of tile `(x, y)`.
    pub fn tile(&self, x: u32, y: u32) -> Option<&TileRange> {
        self.tiles.get(self.tile_index(x, y)?)
    }

    /// Pixel dimensions of tile `(x, y)`.
    ///
    /// Tiles in the last column and row only cover the part of the image
    /// that remains.
    pub fn tile_dimensions(&self, x: u32, y: u32) -> Option<(u32, u32)> {
        self.tile_index(x, y)?;

        let edge = |position: u32, count: u32, size: u32, extent: u32| {
            let remainder = extent % size;
            if position == count - 1 && remainder != 0 {
                remainder
            } else {
                size
            }
        };

        Some((
            edge(x, self.tiles_x, self.tile_width, self.image_width),
            edge(y, self.tiles_y, self.tile_length, self.image_height),
        ))
    }
}

// =============================================================================
// Tests
// =============================================================================
