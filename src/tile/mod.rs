//! Tile access layer.
//!
//! Sits between a parsed [`TiffFile`](crate::format::tiff::TiffFile) and the
//! byte source:
//!
//! - [`TileFetcher`]: locates a tile in the grid, reads its byte range and
//!   optionally decodes it
//! - [`TileCache`]: LRU cache for raw tile bytes, bounded by count and size
//! - [`TileCacheKey`]: source, directory and tile coordinate

mod cache;
mod fetcher;

pub use cache::{TileCache, TileCacheKey, DEFAULT_TILE_CACHE_BYTES, DEFAULT_TILE_CACHE_ENTRIES};
pub use fetcher::{FetchedTile, TileFetcher};
