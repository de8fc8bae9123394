//! Tile codecs.
//!
//! Decoders are looked up by TIFF compression scheme id, so new codecs
//! can be registered without touching directory or tag parsing.

mod deflate;
mod jpeg;

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::TiffError;
use crate::format::tiff::Compression;

pub use deflate::{DeflateDecoder, DEFAULT_INFLATE_LIMIT};
pub use jpeg::{
    has_tables, is_abbreviated_stream, merge_jpeg_tables, prepare_tile_jpeg, JpegDecoder, EOI,
    SOI,
};

/// What a decoder knows about the tile it is decoding.
///
/// Tiles are stored padded to the full TileWidth x TileLength, so `width`
/// and `height` describe the stored buffer even for edge tiles. The part
/// of the tile that lies inside the image is `valid_width x valid_height`.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    /// Stored pixel width of the tile (TileWidth)
    pub width: u32,

    /// Stored pixel height of the tile (TileLength)
    pub height: u32,

    /// Columns inside the image (smaller for the last tile column)
    pub valid_width: u32,

    /// Rows inside the image (smaller for the last tile row)
    pub valid_height: u32,

    /// Shared JPEGTables of the directory, if any
    pub jpeg_tables: Option<&'a [u8]>,
}

/// Output of a tile decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTile {
    /// Width of the pixel buffer
    pub width: u32,

    /// Height of the pixel buffer
    pub height: u32,

    /// Columns of the buffer that hold image data
    pub valid_width: u32,

    /// Rows of the buffer that hold image data
    pub valid_height: u32,

    /// Pixel layout, e.g. `Rgb8`
    pub color: String,

    /// Interleaved sample bytes
    pub pixels: Bytes,
}

/// A decoder for one compression scheme.
pub trait TileDecoder: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Decode the compressed bytes of one tile.
    fn decode(&self, data: &[u8], context: &DecodeContext<'_>) -> Result<DecodedTile, TiffError>;
}

/// Passthrough for uncompressed tiles (scheme 1).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneDecoder;

impl TileDecoder for NoneDecoder {
    fn name(&self) -> &'static str {
        "none"
    }

    fn decode(&self, data: &[u8], context: &DecodeContext<'_>) -> Result<DecodedTile, TiffError> {
        Ok(DecodedTile {
            width: context.width,
            height: context.height,
            valid_width: context.valid_width,
            valid_height: context.valid_height,
            color: "Raw".to_string(),
            pixels: Bytes::copy_from_slice(data),
        })
    }
}

/// Decoders keyed by compression scheme id.
#[derive(Clone)]
pub struct CodecRegistry {
    decoders: BTreeMap<u16, Arc<dyn TileDecoder>>,
}

impl CodecRegistry {
    /// A registry with no decoders.
    pub fn empty() -> Self {
        Self {
            decoders: BTreeMap::new(),
        }
    }

    /// A registry with the built-in decoders: none, Deflate and JPEG.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        let deflate: Arc<dyn TileDecoder> = Arc::new(DeflateDecoder::default());
        registry.register(Compression::None.as_u16(), Arc::new(NoneDecoder));
        registry.register(Compression::AdobeDeflate.as_u16(), deflate.clone());
        registry.register(Compression::Deflate.as_u16(), deflate);
        registry.register(Compression::Jpeg.as_u16(), Arc::new(JpegDecoder));
        registry.register(Compression::LossyJpeg.as_u16(), Arc::new(JpegDecoder));
        registry
    }

    /// Register a decoder, replacing any previous one for the scheme.
    pub fn register(&mut self, compression: u16, decoder: Arc<dyn TileDecoder>) {
        self.decoders.insert(compression, decoder);
    }

    pub fn supports(&self, compression: u16) -> bool {
        self.decoders.contains_key(&compression)
    }

    /// Registered scheme ids, ascending.
    pub fn schemes(&self) -> impl Iterator<Item = u16> + '_ {
        self.decoders.keys().copied()
    }

    /// Find the decoder for a scheme.
    pub fn get(&self, compression: u16) -> Result<&dyn TileDecoder, TiffError> {
        self.decoders
            .get(&compression)
            .map(|d| d.as_ref())
            .ok_or_else(|| {
                TiffError::UnsupportedCompression(format!(
                    "{} ({})",
                    Compression::from_u16(compression).name(),
                    compression
                ))
            })
    }

    /// Decode a tile with the decoder registered for `compression`.
    pub fn decode(
        &self,
        compression: u16,
        data: &[u8],
        context: &DecodeContext<'_>,
    ) -> Result<DecodedTile, TiffError> {
        let decoder = self.get(compression)?;
        tracing::debug!(
            codec = decoder.name(),
            compression,
            bytes = data.len(),
            "decoding tile"
        );
        decoder.decode(data, context)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.decoders.iter().map(|(id, d)| (id, d.name())))
            .finish()
    }
}
