//! Tile fetching.
//!
//! The fetcher turns a `(directory, x, y)` tile coordinate into a byte
//! range using the directory's tile grid, reads just that range from the
//! source and optionally decodes it:
//!
//! ```text
//! (directory, x, y) ──► TileGrid ──► TileCache? ──► RangeReader ──► CodecRegistry
//! ```

use std::num::NonZeroUsize;
use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::codec::{CodecRegistry, DecodeContext, DecodedTile};
use crate::error::{IoError, TiffError};
use crate::format::tiff::{ParseFailure, TiffFile, TileRange};
use crate::io::RangeReader;

use super::cache::{TileCache, TileCacheKey, DEFAULT_TILE_CACHE_BYTES};

/// Raw bytes of one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedTile {
    pub directory: usize,
    pub range: TileRange,
    pub data: Bytes,

    /// Whether the bytes came from the cache
    pub cache_hit: bool,
}

/// Fetches tiles of a parsed TIFF from its source.
pub struct TileFetcher<R> {
    reader: Arc<R>,
    file: Arc<TiffFile>,
    cache: TileCache,
    codecs: CodecRegistry,
}

impl<R: RangeReader> TileFetcher<R> {
    /// Create a fetcher over an already parsed file.
    pub fn new(reader: R, file: TiffFile, cache_tiles: NonZeroUsize) -> Self {
        Self {
            reader: Arc::new(reader),
            file: Arc::new(file),
            cache: TileCache::new(cache_tiles, DEFAULT_TILE_CACHE_BYTES),
            codecs: CodecRegistry::with_defaults(),
        }
    }

    /// Read and parse the whole source, then create a fetcher over it.
    pub async fn open(reader: R, cache_tiles: NonZeroUsize) -> Result<Self, ParseFailure> {
        let file = TiffFile::read(&reader).await?;
        Ok(Self::new(reader, file, cache_tiles))
    }

    /// Replace the codec registry.
    pub fn with_codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn file(&self) -> &TiffFile {
        &self.file
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    /// Byte range of a tile.
    pub fn locate(&self, directory: usize, x: u32, y: u32) -> Result<TileRange, TiffError> {
        let out_of_bounds = TiffError::TileOutOfBounds { directory, x, y };

        let dir = self.file.directory(directory).ok_or(out_of_bounds.clone())?;
        let grid = dir
            .tile_grid
            .as_ref()
            .ok_or(TiffError::MissingTag("TileOffsets"))?;

        grid.tile(x, y).copied().ok_or(out_of_bounds)
    }

    /// Fetch the compressed bytes of a tile.
    pub async fn fetch(&self, directory: usize, x: u32, y: u32) -> Result<FetchedTile, TiffError> {
        let range = self.locate(directory, x, y)?;
        let key = TileCacheKey::new(self.reader.identifier(), directory, x, y);

        if let Some(data) = self.cache.get(&key).await {
            debug!(directory, x, y, "tile cache hit");
            return Ok(FetchedTile {
                directory,
                range,
                data,
                cache_hit: true,
            });
        }

        let length = usize::try_from(range.length).map_err(|_| IoError::RangeOutOfBounds {
            offset: range.start,
            requested: range.length,
            size: self.reader.size(),
        })?;

        debug!(
            source = self.reader.identifier(),
            directory,
            x,
            y,
            start = range.start,
            length,
            "fetching tile"
        );
        let data = self.reader.read_exact_at(range.start, length).await?;
        self.cache.put(key, data.clone()).await;

        Ok(FetchedTile {
            directory,
            range,
            data,
            cache_hit: false,
        })
    }

    /// Fetch a tile and decode it with the codec for its compression scheme.
    pub async fn fetch_decoded(
        &self,
        directory: usize,
        x: u32,
        y: u32,
    ) -> Result<DecodedTile, TiffError> {
        let dir = self
            .file
            .directory(directory)
            .ok_or(TiffError::TileOutOfBounds { directory, x, y })?;
        let compression = dir.compression();

        // Fail before any I/O when no codec can handle the tile
        self.codecs.get(compression)?;

        // Stored tiles are padded; the valid area shrinks at the image edge
        let grid = dir
            .tile_grid
            .as_ref()
            .ok_or(TiffError::MissingTag("TileOffsets"))?;
        let (valid_width, valid_height) = grid
            .tile_dimensions(x, y)
            .ok_or(TiffError::TileOutOfBounds { directory, x, y })?;

        let tile = self.fetch(directory, x, y).await?;
        let context = DecodeContext {
            width: grid.tile_width,
            height: grid.tile_length,
            valid_width,
            valid_height,
            jpeg_tables: dir.jpeg_tables(),
        };
        self.codecs.decode(compression, &tile.data, &context)
    }
}
