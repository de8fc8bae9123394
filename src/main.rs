//! geotiff-inspect - Inspect GeoTIFF and Cloud-Optimized GeoTIFF files.
//!
//! This binary wires the CLI to the parser, the tile fetcher and the report
//! printers.

use std::num::NonZeroUsize;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde_json::json;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use geotiff_inspect::{
    config::{Cli, Command, FetchConfig, InspectConfig, OutputFormat, Source, TilesConfig},
    create_s3_client,
    error::{Diagnostic, IoError},
    format::tiff::{Directory, GeoKeyValue, ParseFailure, TiffFile},
    io::{FileRangeReader, RangeReader, S3RangeReader},
    tile::TileFetcher,
};

type SharedReader = Arc<dyn RangeReader>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = cli.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let reader = match open_source(&cli).await {
        Ok(reader) => reader,
        Err(e) => {
            error!("Failed to open source: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Inspect(ref config) => run_inspect(config, reader).await,
        Command::Tiles(ref config) => run_tiles(config, reader).await,
        Command::Fetch(ref config) => run_fetch(config, reader, cli.cache_tiles).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "geotiff_inspect=debug"
    } else {
        "geotiff_inspect=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn open_source(cli: &Cli) -> Result<SharedReader, IoError> {
    let source = cli.source().map_err(IoError::NotFound)?;

    match source {
        Source::Local(path) => Ok(Arc::new(FileRangeReader::open(path).await?)),
        Source::S3(object) => {
            let client = create_s3_client(cli.s3_endpoint.as_deref(), &cli.s3_region).await;
            let reader = S3RangeReader::open(client, object).await?;
            info!("Opened {} ({} bytes)", reader.object(), reader.size());
            Ok(Arc::new(reader))
        }
    }
}

/// Report a fatal parse error with whatever was read before it.
fn report_failure(failure: &ParseFailure, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let report = json!({
                "error": failure.error.to_string(),
                "directories": failure.directories,
                "diagnostics": failure.diagnostics,
            });
            println!("{}", report);
        }
        OutputFormat::Text => {
            for directory in &failure.directories {
                print_directory(directory);
            }
            print_diagnostics(&failure.diagnostics);
        }
    }
    error!("Parse failed: {}", failure.error);
}

// =============================================================================
// Inspect Command
// =============================================================================

async fn run_inspect(config: &InspectConfig, reader: SharedReader) -> ExitCode {
    let file = match TiffFile::read(&reader).await {
        Ok(file) => file,
        Err(failure) => {
            report_failure(&failure, config.format);
            return ExitCode::FAILURE;
        }
    };

    match config.format {
        OutputFormat::Json => match serde_json::to_string_pretty(&file) {
            Ok(report) => println!("{}", report),
            Err(e) => {
                error!("Failed to serialize report: {}", e);
                return ExitCode::FAILURE;
            }
        },
        OutputFormat::Text => {
            println!(
                "{}: {:?}, {} director{}",
                reader.identifier(),
                file.byte_order(),
                file.directories.len(),
                if file.directories.len() == 1 { "y" } else { "ies" }
            );
            for directory in &file.directories {
                println!();
                print_directory(directory);
            }
            print_diagnostics(&file.diagnostics);
        }
    }

    ExitCode::SUCCESS
}

fn print_directory(directory: &Directory) {
    println!(
        "IFD {} at offset {} (next: {})",
        directory.index, directory.offset, directory.next_offset
    );

    for field in &directory.fields {
        let entry = &field.entry;
        print!(
            "  {} ({}) {}[{}] = {}",
            field.key(),
            entry.tag.as_u16(),
            entry.field_type.name(),
            entry.count,
            field.value
        );
        match &field.interpretation {
            Some(interpretation) => println!(" ({})", interpretation.value),
            None => println!(),
        }
    }

    if let Some(geo_keys) = &directory.geo_keys {
        println!(
            "  GeoKeys (version {}.{}.{}):",
            geo_keys.version, geo_keys.revision, geo_keys.minor_revision
        );
        for (id, key) in &geo_keys.keys {
            let name = key.id.name().unwrap_or("Unnamed");
            let value = match &key.value {
                GeoKeyValue::Literal { value } => value.to_string(),
                GeoKeyValue::Referenced { value, .. } => match key.value.as_text() {
                    Some(text) => format!("{:?}", text),
                    None => value.to_string(),
                },
                GeoKeyValue::Missing { tag_location, .. } => {
                    format!("<missing from tag {}>", tag_location)
                }
            };
            match key.interpretation() {
                Some(meaning) => println!("    {} ({}) = {} ({})", name, id, value, meaning),
                None => println!("    {} ({}) = {}", name, id, value),
            }
        }
        if let Some(epsg) = geo_keys.epsg_code() {
            println!("    EPSG:{}", epsg);
        }
    }

    if let Some(grid) = &directory.tile_grid {
        println!(
            "  Tiles: {} x {} of {}x{} ({} with byte ranges)",
            grid.tiles_x,
            grid.tiles_y,
            grid.tile_width,
            grid.tile_length,
            grid.tiles.len()
        );
    }
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    println!();
    println!("Diagnostics:");
    for diagnostic in diagnostics {
        println!("  - {}", diagnostic);
    }
}

// =============================================================================
// Tiles Command
// =============================================================================

async fn run_tiles(config: &TilesConfig, reader: SharedReader) -> ExitCode {
    let file = match TiffFile::read(&reader).await {
        Ok(file) => file,
        Err(failure) => {
            report_failure(&failure, config.format);
            return ExitCode::FAILURE;
        }
    };

    let selected: Vec<&Directory> = match config.directory {
        Some(index) => match file.directory(index) {
            Some(directory) => vec![directory],
            None => {
                error!(
                    "Directory {} does not exist ({} directories)",
                    index,
                    file.directories.len()
                );
                return ExitCode::FAILURE;
            }
        },
        None => file.directories.iter().collect(),
    };

    match config.format {
        OutputFormat::Json => {
            let grids: Vec<_> = selected
                .iter()
                .map(|d| json!({ "directory": d.index, "tile_grid": d.tile_grid }))
                .collect();
            println!("{}", json!({ "directories": grids, "diagnostics": file.diagnostics }));
        }
        OutputFormat::Text => {
            for directory in selected {
                let Some(grid) = &directory.tile_grid else {
                    println!("IFD {}: not tiled", directory.index);
                    continue;
                };
                println!(
                    "IFD {}: {}x{} image, {} x {} tiles of {}x{}",
                    directory.index,
                    grid.image_width,
                    grid.image_height,
                    grid.tiles_x,
                    grid.tiles_y,
                    grid.tile_width,
                    grid.tile_length
                );
                for tile in &grid.tiles {
                    println!(
                        "  [{}] ({}, {}) bytes {}..{} ({})",
                        tile.index, tile.x, tile.y, tile.start, tile.end, tile.length
                    );
                }
            }
            print_diagnostics(&file.diagnostics);
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Fetch Command
// =============================================================================

async fn run_fetch(config: &FetchConfig, reader: SharedReader, cache_tiles: usize) -> ExitCode {
    let Some(cache_tiles) = NonZeroUsize::new(cache_tiles) else {
        error!("cache_tiles must be greater than 0");
        return ExitCode::FAILURE;
    };

    let fetcher = match TileFetcher::open(reader, cache_tiles).await {
        Ok(fetcher) => fetcher,
        Err(failure) => {
            report_failure(&failure, OutputFormat::Text);
            return ExitCode::FAILURE;
        }
    };

    let (directory, x, y) = (config.directory, config.x, config.y);

    let bytes = if config.decode {
        match fetcher.fetch_decoded(directory, x, y).await {
            Ok(tile) => {
                println!(
                    "Decoded tile ({}, {}) of IFD {}: {}x{} ({}x{} inside the image) {}, {} bytes",
                    x,
                    y,
                    directory,
                    tile.width,
                    tile.height,
                    tile.valid_width,
                    tile.valid_height,
                    tile.color,
                    tile.pixels.len()
                );
                tile.pixels
            }
            Err(e) => {
                error!("Failed to decode tile: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        match fetcher.fetch(directory, x, y).await {
            Ok(tile) => {
                println!(
                    "Tile ({}, {}) of IFD {}: bytes {}..{} ({})",
                    x, y, directory, tile.range.start, tile.range.end, tile.range.length
                );
                tile.data
            }
            Err(e) => {
                error!("Failed to fetch tile: {}", e);
                return ExitCode::FAILURE;
            }
        }
    };

    if let Some(path) = &config.output {
        if let Err(e) = tokio::fs::write(path, &bytes).await {
            error!("Failed to write {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
        info!("Wrote {} bytes to {}", bytes.len(), path.display());
    }

    ExitCode::SUCCESS
}
