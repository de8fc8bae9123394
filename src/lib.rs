//! # geotiff-inspect
//!
//! A metadata parser for GeoTIFF and Cloud-Optimized GeoTIFF files.
//!
//! The parser walks the chain of Image File Directories of a classic TIFF
//! file, decodes every tag into a typed value, resolves the GeoKey
//! directory against its sibling tags and computes the byte range of every
//! tile. Nothing is printed by the library: non-fatal problems are returned
//! as [`Diagnostic`]s next to the result.
//!
//! ## Features
//!
//! - **Both byte orders**: little- (II) and big-endian (MM) files
//! - **GeoKeys**: literal and tag-referenced values, with key names for the
//!   GeoTIFF 1.1 key table
//! - **Tile addressing**: per-tile `(start, end, length)` byte ranges
//! - **Range-based fetching**: tiles are read with range requests from local
//!   files or S3-compatible storage, and decoded by a pluggable codec registry
//!
//! ## Architecture
//!
//! - [`io`] - Byte sources: memory, local files and S3 range readers
//! - [`mod@format`] - TIFF header, entries, values, GeoKeys, directories, tiles
//! - [`codec`] - Tile decoders keyed by compression scheme
//! - [`tile`] - Tile fetching and caching
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use geotiff_inspect::{FileRangeReader, TiffFile};
//!
//! #[tokio::main]
//! async fn main() {
//!     let reader = FileRangeReader::open("cog.tif").await.unwrap();
//!     let file = TiffFile::read(&reader).await.unwrap();
//!
//!     for directory in &file.directories {
//!         if let Some(grid) = &directory.tile_grid {
//!             println!("IFD {}: {} tiles", directory.index, grid.tile_count());
//!         }
//!     }
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod tile;

// Re-export commonly used types
pub use codec::{
    CodecRegistry, DecodeContext, DecodedTile, DeflateDecoder, JpegDecoder, NoneDecoder,
    TileDecoder,
};
pub use config::{Cli, Command, OutputFormat, Source};
pub use error::{Diagnostic, IoError, TiffError};
pub use format::tiff::{
    byte_width, field_name, interpret, ByteOrder, Compression, Directory, EntryValue, Field,
    FieldType, GeoKey, GeoKeyDirectory, GeoKeyId, GeoKeyValue, IfdEntry, Interpretation,
    ParseFailure, TagValue, TiffFile, TiffHeader, TiffTag, TileGrid, TileRange,
};
pub use io::{
    create_s3_client, FileRangeReader, MemoryRangeReader, RangeReader, S3Object, S3RangeReader,
};
pub use tile::{FetchedTile, TileCache, TileCacheKey, TileFetcher};
