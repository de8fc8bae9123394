//! Deflate tile decoding (compression 8 and 32946).
//!
//! Both scheme ids store a zlib stream per tile. The inflated bytes are the
//! tile's samples as stored; horizontal predictors are not undone.

use bytes::Bytes;

use crate::error::TiffError;

use super::{DecodeContext, DecodedTile, TileDecoder};

/// Default upper bound on the inflated size of one tile: 256MB
pub const DEFAULT_INFLATE_LIMIT: usize = 256 * 1024 * 1024;

/// Decoder for zlib-wrapped Deflate tiles.
#[derive(Debug, Clone, Copy)]
pub struct DeflateDecoder {
    inflate_limit: usize,
}

impl DeflateDecoder {
    /// Decoder refusing tiles that inflate past `inflate_limit` bytes.
    pub fn new(inflate_limit: usize) -> Self {
        Self { inflate_limit }
    }

    pub fn inflate_limit(&self) -> usize {
        self.inflate_limit
    }
}

impl Default for DeflateDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_INFLATE_LIMIT)
    }
}

impl TileDecoder for DeflateDecoder {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn decode(&self, data: &[u8], context: &DecodeContext<'_>) -> Result<DecodedTile, TiffError> {
        let pixels = miniz_oxide::inflate::decompress_to_vec_zlib_with_limit(data, self.inflate_limit)
            .map_err(|e| TiffError::Decode(format!("Zlib decompression error: {}", e)))?;

        Ok(DecodedTile {
            width: context.width,
            height: context.height,
            valid_width: context.valid_width,
            valid_height: context.valid_height,
            color: "Raw".to_string(),
            pixels: Bytes::from(pixels),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
