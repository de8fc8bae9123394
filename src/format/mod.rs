//! File format parsers.
//!
//! Only classic TIFF (and its GeoTIFF extension) is supported. Header
//! validation happens in [`tiff::TiffHeader::parse`].

pub mod tiff;
