//! Classic TIFF and GeoTIFF parsing.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian, MM = big-endian)
//!   in the header. All multi-byte values must be read respecting this order.
//!
//! - **Classic TIFF only**: offsets are 32 bits wide. BigTIFF files (version 43) are
//!   recognized and rejected.
//!
//! - **IFD (Image File Directory)**: a table of 12-byte entries plus a pointer to the next
//!   directory. Cloud-Optimized GeoTIFFs keep one IFD per overview level.
//!
//! - **Inline vs offset values**: values of 4 bytes or less are stored inline in the entry,
//!   larger values are stored at an offset pointed to by the entry.
//!
//! - **GeoKeys**: the GeoKeyDirectoryTag packs a second key/value directory whose values
//!   may live in sibling tags. They are resolved once the whole IFD is decoded.

mod directory;
mod geokeys;
mod parser;
mod tags;
mod tiles;
mod values;

pub use directory::{Directory, Field, ParseFailure, TiffFile};
pub use geokeys::{
    resolve_geo_keys, GeoKey, GeoKeyDirectory, GeoKeyId, GeoKeyValue, USER_DEFINED_KEY,
};
pub use parser::{
    read_entry, ByteOrder, EntryValue, IfdEntry, TiffHeader, IFD_ENTRY_SIZE, TIFF_HEADER_SIZE,
};
pub use tags::{
    byte_width, field_name, interpret, Compression, FieldType, Interpretation,
    PhotometricInterpretation, PlanarConfiguration, Predictor, ResolutionUnit, SampleFormat,
    TiffTag, UNKNOWN_FIELD_NAME,
};
pub use tiles::{TileGrid, TileRange};
pub use values::{decode_values, fetch_values, read_entry_value, TagValue};
