//! Test utilities for integration tests.
//!
//! This module provides a tracking range reader and builders that
//! synthesize classic TIFF / GeoTIFF files in either byte order.

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, Luma};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use geotiff_inspect::error::IoError;
use geotiff_inspect::io::RangeReader;
use geotiff_inspect::ByteOrder;

// =============================================================================
// Tracking Range Reader
// =============================================================================

/// A range reader over memory that records every read request.
#[derive(Clone)]
pub struct TrackingReader {
    data: Bytes,
    identifier: String,
    requests: Arc<Mutex<Vec<(u64, usize)>>>,
    request_count: Arc<AtomicUsize>,
}

impl TrackingReader {
    pub fn new(data: Vec<u8>, identifier: impl Into<String>) -> Self {
        Self {
            data: Bytes::from(data),
            identifier: identifier.into(),
            requests: Arc::new(Mutex::new(Vec::new())),
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(u64, usize)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RangeReader for TrackingReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push((offset, len));

        let start = offset as usize;
        let end = start + len;
        if end > self.data.len() {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.data.len() as u64,
            });
        }
        Ok(self.data.slice(start..end))
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

// =============================================================================
// Test JPEG Creation
// =============================================================================

/// Create a grayscale JPEG with a simple gradient pattern.
pub fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = GrayImage::from_fn(width, height, |x, y| Luma([((x + y) % 256) as u8]));

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, 90);
    encoder.encode_image(&img).unwrap();
    buf
}

// =============================================================================
// TIFF File Builders
// =============================================================================

/// Tag value in a test directory.
#[derive(Debug, Clone)]
pub enum Value {
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    Double(Vec<f64>),
    /// Text, written with a trailing NUL
    Ascii(String),
    /// Bytes written as-is with an explicit type and count
    Raw {
        field_type: u16,
        count: u32,
        bytes: Vec<u8>,
    },
    /// Entry whose value field is a fixed pointer, with no data behind it
    Pointer {
        field_type: u16,
        count: u32,
        offset: u32,
    },
}

fn put_u16(out: &mut Vec<u8>, order: ByteOrder, value: u16) {
    match order {
        ByteOrder::LittleEndian => out.extend_from_slice(&value.to_le_bytes()),
        ByteOrder::BigEndian => out.extend_from_slice(&value.to_be_bytes()),
    }
}

fn put_u32(out: &mut Vec<u8>, order: ByteOrder, value: u32) {
    match order {
        ByteOrder::LittleEndian => out.extend_from_slice(&value.to_le_bytes()),
        ByteOrder::BigEndian => out.extend_from_slice(&value.to_be_bytes()),
    }
}

fn put_u64(out: &mut Vec<u8>, order: ByteOrder, value: u64) {
    match order {
        ByteOrder::LittleEndian => out.extend_from_slice(&value.to_le_bytes()),
        ByteOrder::BigEndian => out.extend_from_slice(&value.to_be_bytes()),
    }
}

fn patch_u32(out: &mut [u8], at: usize, order: ByteOrder, value: u32) {
    let bytes = match order {
        ByteOrder::LittleEndian => value.to_le_bytes(),
        ByteOrder::BigEndian => value.to_be_bytes(),
    };
    out[at..at + 4].copy_from_slice(&bytes);
}

impl Value {
    /// (field type, count, encoded bytes)
    fn encode(&self, order: ByteOrder) -> (u16, u32, Vec<u8>) {
        let mut out = Vec::new();
        match self {
            Value::Short(v) => {
                v.iter().for_each(|&x| put_u16(&mut out, order, x));
                (3, v.len() as u32, out)
            }
            Value::Long(v) => {
                v.iter().for_each(|&x| put_u32(&mut out, order, x));
                (4, v.len() as u32, out)
            }
            Value::Rational(v) => {
                for &(n, d) in v {
                    put_u32(&mut out, order, n);
                    put_u32(&mut out, order, d);
                }
                (5, v.len() as u32, out)
            }
            Value::Double(v) => {
                v.iter().for_each(|&x| put_u64(&mut out, order, x.to_bits()));
                (12, v.len() as u32, out)
            }
            Value::Ascii(s) => {
                out.extend_from_slice(s.as_bytes());
                out.push(0);
                (2, out.len() as u32, out)
            }
            Value::Raw {
                field_type,
                count,
                bytes,
            } => (*field_type, *count, bytes.clone()),
            Value::Pointer { .. } => unreachable!("pointer entries carry no data"),
        }
    }
}

/// Builder for one test IFD.
#[derive(Debug, Clone, Default)]
pub struct IfdBuilder {
    entries: Vec<(u16, Value)>,
}

impl IfdBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, tag: u16, value: Value) -> Self {
        self.entries.push((tag, value));
        self
    }

    pub fn short(self, tag: u16, values: &[u16]) -> Self {
        self.entry(tag, Value::Short(values.to_vec()))
    }

    pub fn long(self, tag: u16, values: &[u32]) -> Self {
        self.entry(tag, Value::Long(values.to_vec()))
    }

    pub fn double(self, tag: u16, values: &[f64]) -> Self {
        self.entry(tag, Value::Double(values.to_vec()))
    }

    pub fn ascii(self, tag: u16, text: &str) -> Self {
        self.entry(tag, Value::Ascii(text.to_string()))
    }

    pub fn raw(self, tag: u16, field_type: u16, count: u32, bytes: Vec<u8>) -> Self {
        self.entry(
            tag,
            Value::Raw {
                field_type,
                count,
                bytes,
            },
        )
    }

    pub fn pointer(self, tag: u16, field_type: u16, count: u32, offset: u32) -> Self {
        self.entry(
            tag,
            Value::Pointer {
                field_type,
                count,
                offset,
            },
        )
    }

    /// Basic tiled image layout.
    pub fn tiled(self, width: u32, height: u32, tile_width: u16, tile_length: u16) -> Self {
        self.long(256, &[width])
            .long(257, &[height])
            .short(258, &[8])
            .short(259, &[1])
            .short(262, &[1])
            .short(277, &[1])
            .short(322, &[tile_width])
            .short(323, &[tile_length])
    }

    /// Tile offset and byte count tables.
    pub fn tile_table(self, offsets: &[u32], byte_counts: &[u32]) -> Self {
        self.long(324, offsets).long(325, byte_counts)
    }

    /// Set or replace a tag.
    pub fn set(mut self, tag: u16, value: Value) -> Self {
        self.entries.retain(|(t, _)| *t != tag);
        self.entry(tag, value)
    }
}

/// Builder for a complete classic TIFF file.
///
/// Layout: header, blobs, then each IFD followed by its out-of-line values.
pub struct TiffBuilder {
    order: ByteOrder,
    version: u16,
    blobs: Vec<u8>,
    ifds: Vec<IfdBuilder>,
    links: Vec<(usize, usize)>,
    sort_entries: bool,
}

impl TiffBuilder {
    pub fn new(order: ByteOrder) -> Self {
        Self {
            order,
            version: 42,
            blobs: Vec::new(),
            ifds: Vec::new(),
            links: Vec::new(),
            sort_entries: true,
        }
    }

    pub fn little_endian() -> Self {
        Self::new(ByteOrder::LittleEndian)
    }

    pub fn big_endian() -> Self {
        Self::new(ByteOrder::BigEndian)
    }

    /// Override the version field (42 for classic TIFF).
    pub fn version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    /// Keep entries in insertion order instead of sorting by tag.
    pub fn unsorted(mut self) -> Self {
        self.sort_entries = false;
        self
    }

    /// Append raw bytes (e.g. tile data) after the header and return their offset.
    pub fn blob(&mut self, data: &[u8]) -> u32 {
        let offset = 8 + self.blobs.len() as u32;
        self.blobs.extend_from_slice(data);
        if self.blobs.len() % 2 == 1 {
            self.blobs.push(0);
        }
        offset
    }

    pub fn ifd(mut self, ifd: IfdBuilder) -> Self {
        self.ifds.push(ifd);
        self
    }

    /// Point the next-IFD pointer of `from` at IFD `to` instead of the following one.
    pub fn link(mut self, from: usize, to: usize) -> Self {
        self.links.push((from, to));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let order = self.order;
        let mut out = Vec::new();

        match order {
            ByteOrder::LittleEndian => out.extend_from_slice(b"II"),
            ByteOrder::BigEndian => out.extend_from_slice(b"MM"),
        }
        put_u16(&mut out, order, self.version);
        put_u32(&mut out, order, 0);
        out.extend_from_slice(&self.blobs);

        let mut ifd_offsets = Vec::new();
        let mut next_slots = Vec::new();

        for ifd in &self.ifds {
            if out.len() % 2 == 1 {
                out.push(0);
            }
            let start = out.len();
            ifd_offsets.push(start as u32);

            let mut entries = ifd.entries.clone();
            if self.sort_entries {
                entries.sort_by_key(|(tag, _)| *tag);
            }

            let table_end = start + 2 + 12 * entries.len() + 4;
            let mut external = Vec::new();

            put_u16(&mut out, order, entries.len() as u16);
            for (tag, value) in &entries {
                put_u16(&mut out, order, *tag);

                if let Value::Pointer {
                    field_type,
                    count,
                    offset,
                } = value
                {
                    put_u16(&mut out, order, *field_type);
                    put_u32(&mut out, order, *count);
                    put_u32(&mut out, order, *offset);
                    continue;
                }

                let (field_type, count, bytes) = value.encode(order);
                put_u16(&mut out, order, field_type);
                put_u32(&mut out, order, count);

                if bytes.len() <= 4 {
                    let mut inline = bytes.clone();
                    inline.resize(4, 0);
                    out.extend_from_slice(&inline);
                } else {
                    put_u32(&mut out, order, (table_end + external.len()) as u32);
                    external.extend_from_slice(&bytes);
                    if external.len() % 2 == 1 {
                        external.push(0);
                    }
                }
            }

            next_slots.push(out.len());
            put_u32(&mut out, order, 0);
            out.extend_from_slice(&external);
        }

        if let Some(&first) = ifd_offsets.first() {
            patch_u32(&mut out, 4, order, first);
        }
        for (i, &slot) in next_slots.iter().enumerate() {
            let next = ifd_offsets.get(i + 1).copied().unwrap_or(0);
            patch_u32(&mut out, slot, order, next);
        }
        for &(from, to) in &self.links {
            patch_u32(&mut out, next_slots[from], order, ifd_offsets[to]);
        }

        out
    }
}

// =============================================================================
// Canned GeoTIFFs
// =============================================================================

/// Tile payloads of the canned GeoTIFF, in linear index order.
pub fn tile_payloads() -> Vec<Vec<u8>> {
    (0..4u8).map(|i| vec![i + 1; 10 + i as usize]).collect()
}

/// GeoTIFF key directory used by the canned file.
///
/// Keys: GTModelType=2 (literal), GTRasterType=1 (literal),
/// GeographicType=4326 (literal), GeogCitation="WGS 84|" (ASCII params),
/// GeogSemiMajorAxis / GeogInvFlattening (DOUBLE params).
pub fn geo_key_directory() -> Vec<u16> {
    vec![
        1, 1, 0, 6, //
        1024, 0, 1, 2, //
        1025, 0, 1, 1, //
        2048, 0, 1, 4326, //
        2049, 34737, 7, 0, //
        2057, 34736, 1, 0, //
        2059, 34736, 1, 1, //
    ]
}

/// A 512x300 tiled GeoTIFF (2x2 tiles of 256) plus a single-tile overview.
///
/// The overview stores TileOffsets/TileByteCounts as lone scalars.
pub fn canned_geotiff(order: ByteOrder) -> Vec<u8> {
    let mut builder = TiffBuilder::new(order);

    let payloads = tile_payloads();
    let offsets: Vec<u32> = payloads.iter().map(|p| builder.blob(p)).collect();
    let counts: Vec<u32> = payloads.iter().map(|p| p.len() as u32).collect();
    let overview_offset = builder.blob(&[0xAB; 6]);

    let full = IfdBuilder::new()
        .tiled(512, 300, 256, 256)
        .tile_table(&offsets, &counts)
        .double(33550, &[0.5, 0.5, 0.0])
        .double(33922, &[0.0, 0.0, 0.0, -180.0, 90.0, 0.0])
        .short(34735, &geo_key_directory())
        .double(34736, &[6378137.0, 298.257223563])
        .ascii(34737, "WGS 84|");

    let overview = IfdBuilder::new()
        .tiled(256, 150, 256, 256)
        .short(254, &[1])
        .tile_table(&[overview_offset], &[6]);

    builder.ifd(full).ifd(overview).build()
}
