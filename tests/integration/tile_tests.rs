//! Tile addressing, fetching and decoding tests.

use std::num::NonZeroUsize;
use std::sync::Arc;

use geotiff_inspect::error::{Diagnostic, TiffError};
use geotiff_inspect::{
    ByteOrder, CodecRegistry, FileRangeReader, NoneDecoder, TiffFile, TileFetcher,
};
use miniz_oxide::deflate::compress_to_vec_zlib;

use super::test_utils::{
    canned_geotiff, create_test_jpeg, tile_payloads, IfdBuilder, TiffBuilder, TrackingReader,
    Value,
};

fn cache_tiles() -> NonZeroUsize {
    NonZeroUsize::new(16).unwrap()
}

/// A single 16x16 tile with the given compression and payload.
fn single_tile_file(compression: u16, payload: &[u8]) -> Vec<u8> {
    let mut builder = TiffBuilder::little_endian();
    let offset = builder.blob(payload);
    builder
        .ifd(
            IfdBuilder::new()
                .tiled(16, 16, 16, 16)
                .set(259, Value::Short(vec![compression]))
                .tile_table(&[offset], &[payload.len() as u32]),
        )
        .build()
}

/// A 20x20 image in 16x16 tiles, every tile pointing at the same payload.
fn edge_tile_file(compression: u16, payload: &[u8]) -> Vec<u8> {
    let mut builder = TiffBuilder::big_endian();
    let offset = builder.blob(payload);
    let length = payload.len() as u32;
    builder
        .ifd(
            IfdBuilder::new()
                .tiled(20, 20, 16, 16)
                .set(259, Value::Short(vec![compression]))
                .tile_table(&[offset; 4], &[length; 4]),
        )
        .build()
}

// =============================================================================
// Tile grids
// =============================================================================

#[test]
fn test_grid_ranges_match_tile_data() {
    for order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
        let data = canned_geotiff(order);
        let file = TiffFile::parse(&data).unwrap();
        let grid = file.directories[0].tile_grid.as_ref().unwrap();

        assert_eq!((grid.tiles_x, grid.tiles_y), (2, 2));
        assert!(grid.is_complete());

        // Linear index order: row-major
        let tile = grid.tiles[2];
        assert_eq!((tile.index, tile.x, tile.y), (2, 0, 1));
        assert_eq!(grid.tile(0, 1), Some(&tile));

        for (tile, payload) in grid.tiles.iter().zip(tile_payloads()) {
            assert_eq!(tile.length, payload.len() as u64);
            assert_eq!(tile.end - tile.start, tile.length);
            assert_eq!(&data[tile.start as usize..tile.end as usize], &payload[..]);
        }
    }
}

#[test]
fn test_edge_tile_dimensions() {
    let file = TiffFile::parse(&canned_geotiff(ByteOrder::LittleEndian)).unwrap();
    let grid = file.directories[0].tile_grid.as_ref().unwrap();

    assert_eq!(grid.tile_dimensions(1, 0), Some((256, 256)));
    assert_eq!(grid.tile_dimensions(0, 1), Some((256, 44)));
    assert_eq!(grid.tile_dimensions(2, 0), None);
}

#[test]
fn test_scalar_tile_table_gives_one_tile() {
    let data = canned_geotiff(ByteOrder::BigEndian);
    let file = TiffFile::parse(&data).unwrap();
    let grid = file.directories[1].tile_grid.as_ref().unwrap();

    assert_eq!(grid.tile_count(), 1);
    assert_eq!(grid.tiles.len(), 1);
    let tile = grid.tiles[0];
    assert_eq!(tile.length, 6);
    assert!(data[tile.start as usize..tile.end as usize]
        .iter()
        .all(|&b| b == 0xAB));
}

#[test]
fn test_short_tile_table_is_a_prefix() {
    let data = TiffBuilder::little_endian()
        .ifd(
            IfdBuilder::new()
                .tiled(512, 512, 256, 256)
                .tile_table(&[100, 200, 300], &[10, 20, 30]),
        )
        .build();

    let file = TiffFile::parse(&data).unwrap();
    let grid = file.directories[0].tile_grid.as_ref().unwrap();

    assert_eq!(grid.tile_count(), 4);
    assert_eq!(grid.tiles.len(), 3);
    assert!(!grid.is_complete());
    assert!(grid.tile(1, 1).is_none());
    assert_eq!(grid.tile(0, 1).unwrap().start, 300);
    assert_eq!(
        file.diagnostics,
        vec![Diagnostic::TileTableMismatch {
            directory: 0,
            expected: 4,
            offsets: 3,
            byte_counts: 3,
        }]
    );
}

#[test]
fn test_strip_directory_has_no_grid() {
    let data = TiffBuilder::big_endian()
        .ifd(
            IfdBuilder::new()
                .long(256, &[64])
                .long(257, &[64])
                .long(273, &[8])
                .long(279, &[64 * 64]),
        )
        .build();

    let file = TiffFile::parse(&data).unwrap();
    assert!(file.directories[0].tile_grid.is_none());
    assert!(file.diagnostics.is_empty());
}

#[test]
fn test_tiled_directory_without_offsets() {
    let data = TiffBuilder::little_endian()
        .ifd(IfdBuilder::new().tiled(256, 256, 256, 256))
        .build();

    let file = TiffFile::parse(&data).unwrap();
    let grid = file.directories[0].tile_grid.as_ref().unwrap();
    assert!(grid.tiles.is_empty());
    assert!(matches!(
        file.diagnostics[..],
        [Diagnostic::TileTableMismatch {
            expected: 1,
            offsets: 0,
            ..
        }]
    ));
}

// =============================================================================
// Fetching
// =============================================================================

#[tokio::test]
async fn test_fetch_reads_exactly_the_tile_range() {
    let reader = TrackingReader::new(canned_geotiff(ByteOrder::LittleEndian), "mem://cog");
    let fetcher = TileFetcher::open(reader.clone(), cache_tiles()).await.unwrap();
    let before = reader.request_count();

    let tile = fetcher.fetch(0, 1, 1).await.unwrap();
    assert!(!tile.cache_hit);
    assert_eq!(tile.range.index, 3);
    assert_eq!(&tile.data[..], &tile_payloads()[3][..]);

    assert_eq!(reader.request_count(), before + 1);
    assert_eq!(
        reader.requests().last().copied(),
        Some((tile.range.start, tile.range.length as usize))
    );

    let again = fetcher.fetch(0, 1, 1).await.unwrap();
    assert!(again.cache_hit);
    assert_eq!(again.data, tile.data);
    assert_eq!(reader.request_count(), before + 1);
    assert_eq!(fetcher.cache().len().await, 1);
}

#[tokio::test]
async fn test_fetch_out_of_bounds() {
    let reader = TrackingReader::new(canned_geotiff(ByteOrder::BigEndian), "mem://cog");
    let fetcher = TileFetcher::open(reader.clone(), cache_tiles()).await.unwrap();
    let before = reader.request_count();

    let err = fetcher.fetch(0, 2, 0).await.unwrap_err();
    assert!(matches!(
        err,
        TiffError::TileOutOfBounds {
            directory: 0,
            x: 2,
            y: 0
        }
    ));
    assert!(matches!(
        fetcher.fetch(5, 0, 0).await.unwrap_err(),
        TiffError::TileOutOfBounds { directory: 5, .. }
    ));
    assert_eq!(reader.request_count(), before);
}

#[tokio::test]
async fn test_decode_uncompressed_tile() {
    let reader = TrackingReader::new(canned_geotiff(ByteOrder::LittleEndian), "mem://cog");
    let fetcher = TileFetcher::open(reader, cache_tiles()).await.unwrap();

    // Bottom row of a 512x300 image: stored full size, 44 rows inside the image
    let tile = fetcher.fetch_decoded(0, 0, 1).await.unwrap();
    assert_eq!((tile.width, tile.height), (256, 256));
    assert_eq!((tile.valid_width, tile.valid_height), (256, 44));
    assert_eq!(tile.color, "Raw");
    assert_eq!(&tile.pixels[..], &tile_payloads()[2][..]);
}

#[tokio::test]
async fn test_decode_jpeg_tile() {
    let jpeg = create_test_jpeg(16, 16);
    let reader = TrackingReader::new(single_tile_file(7, &jpeg), "mem://jpeg");
    let fetcher = TileFetcher::open(reader, cache_tiles()).await.unwrap();

    let tile = fetcher.fetch_decoded(0, 0, 0).await.unwrap();
    assert_eq!((tile.width, tile.height), (16, 16));
    assert_eq!(tile.color, "L8");
    assert_eq!(tile.pixels.len(), 16 * 16);
}

#[tokio::test]
async fn test_edge_tile_dimensions_agree_across_codecs() {
    let raw = TrackingReader::new(edge_tile_file(1, &[0x80; 256]), "mem://raw");
    let jpeg = TrackingReader::new(edge_tile_file(7, &create_test_jpeg(16, 16)), "mem://jpeg");

    let raw = TileFetcher::open(raw, cache_tiles()).await.unwrap();
    let jpeg = TileFetcher::open(jpeg, cache_tiles()).await.unwrap();

    let raw_tile = raw.fetch_decoded(0, 1, 1).await.unwrap();
    let jpeg_tile = jpeg.fetch_decoded(0, 1, 1).await.unwrap();

    for tile in [&raw_tile, &jpeg_tile] {
        assert_eq!((tile.width, tile.height), (16, 16));
        assert_eq!((tile.valid_width, tile.valid_height), (4, 4));
        assert_eq!(tile.pixels.len(), 16 * 16);
    }
}

#[tokio::test]
async fn test_decode_deflate_tile() {
    let samples: Vec<u8> = (0..=255).collect();
    let compressed = compress_to_vec_zlib(&samples, 6);

    for compression in [8, 32946] {
        let reader = TrackingReader::new(single_tile_file(compression, &compressed), "mem://zip");
        let fetcher = TileFetcher::open(reader, cache_tiles()).await.unwrap();

        let tile = fetcher.fetch_decoded(0, 0, 0).await.unwrap();
        assert_eq!(tile.color, "Raw");
        assert_eq!((tile.width, tile.height), (16, 16));
        assert_eq!(&tile.pixels[..], &samples[..]);
    }
}

#[tokio::test]
async fn test_corrupt_jpeg_tile_is_decode_error() {
    let reader = TrackingReader::new(single_tile_file(7, &[0xFF, 0xD8, 0x00, 0x01]), "mem://bad");
    let fetcher = TileFetcher::open(reader, cache_tiles()).await.unwrap();

    let err = fetcher.fetch_decoded(0, 0, 0).await.unwrap_err();
    assert!(matches!(err, TiffError::Decode(_)));
}

#[tokio::test]
async fn test_unsupported_compression_fails_before_io() {
    let reader = TrackingReader::new(single_tile_file(5, &[0u8; 32]), "mem://lzw");
    let fetcher = TileFetcher::open(reader.clone(), cache_tiles()).await.unwrap();
    let before = reader.request_count();

    let err = fetcher.fetch_decoded(0, 0, 0).await.unwrap_err();
    match err {
        TiffError::UnsupportedCompression(scheme) => assert_eq!(scheme, "LZW (5)"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(reader.request_count(), before);

    // The compressed bytes are still available
    let raw = fetcher.fetch(0, 0, 0).await.unwrap();
    assert_eq!(raw.data.len(), 32);
}

#[tokio::test]
async fn test_custom_codec_registry() {
    let mut codecs = CodecRegistry::empty();
    codecs.register(5, Arc::new(NoneDecoder));

    let reader = TrackingReader::new(single_tile_file(5, &[7u8; 12]), "mem://lzw");
    let fetcher = TileFetcher::open(reader, cache_tiles())
        .await
        .unwrap()
        .with_codecs(codecs);

    let tile = fetcher.fetch_decoded(0, 0, 0).await.unwrap();
    assert_eq!(&tile.pixels[..], &[7u8; 12][..]);
    assert!(!fetcher.codecs().supports(1));
}

#[tokio::test]
async fn test_fetch_from_local_file() {
    let path = std::env::temp_dir().join(format!(
        "geotiff-inspect-tiles-{}.tif",
        std::process::id()
    ));
    tokio::fs::write(&path, canned_geotiff(ByteOrder::BigEndian))
        .await
        .unwrap();

    let reader = FileRangeReader::open(&path).await.unwrap();
    let fetcher = TileFetcher::open(reader, cache_tiles()).await.unwrap();

    let overview = fetcher.fetch(1, 0, 0).await.unwrap();
    assert_eq!(&overview.data[..], &[0xAB; 6][..]);

    let tile = fetcher.fetch(0, 1, 0).await.unwrap();
    assert_eq!(&tile.data[..], &tile_payloads()[1][..]);

    tokio::fs::remove_file(&path).await.unwrap();
}
