//! Command-line configuration for geotiff-inspect.
//!
//! Options come from command-line arguments via clap, with `GEOTIFF_`
//! environment variables as fallback for the storage and cache settings.
//!
//! # Environment Variables
//!
//! - `GEOTIFF_S3_ENDPOINT` - Custom S3 endpoint for S3-compatible services
//! - `GEOTIFF_S3_REGION` - AWS region (default: us-east-1)
//! - `GEOTIFF_CACHE_TILES` - Max tiles to cache when fetching (default: 256)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::io::S3Object;
use crate::tile::DEFAULT_TILE_CACHE_ENTRIES;

/// Default AWS region.
pub const DEFAULT_REGION: &str = "us-east-1";

// =============================================================================
// CLI Arguments
// =============================================================================

/// geotiff-inspect - Inspect GeoTIFF and Cloud-Optimized GeoTIFF files.
///
/// Walks the IFD chain, resolves GeoKeys and computes tile byte ranges.
/// Sources can be local paths or `s3://bucket/key` URLs.
#[derive(Parser, Debug, Clone)]
#[command(name = "geotiff-inspect")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Custom S3 endpoint URL for S3-compatible services (MinIO, etc.).
    #[arg(long, global = true, env = "GEOTIFF_S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// AWS region for S3.
    #[arg(long, global = true, default_value = DEFAULT_REGION, env = "GEOTIFF_S3_REGION")]
    pub s3_region: String,

    /// Maximum number of tiles to keep in cache.
    #[arg(long, global = true, default_value_t = DEFAULT_TILE_CACHE_ENTRIES, env = "GEOTIFF_CACHE_TILES")]
    pub cache_tiles: usize,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print directories, fields, GeoKeys and diagnostics.
    Inspect(InspectConfig),

    /// Print tile byte ranges.
    Tiles(TilesConfig),

    /// Fetch the bytes of one tile.
    Fetch(FetchConfig),
}

/// Report format.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct InspectConfig {
    /// Local path or s3://bucket/key
    pub source: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct TilesConfig {
    /// Local path or s3://bucket/key
    pub source: String,

    /// Only this IFD (default: every tiled IFD)
    #[arg(long)]
    pub directory: Option<usize>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct FetchConfig {
    /// Local path or s3://bucket/key
    pub source: String,

    /// Tile column
    #[arg(long)]
    pub x: u32,

    /// Tile row
    #[arg(long)]
    pub y: u32,

    /// IFD index
    #[arg(long, default_value_t = 0)]
    pub directory: usize,

    /// Decode the tile with the codec for its compression scheme
    #[arg(long, default_value_t = false)]
    pub decode: bool,

    /// Write the tile (or decoded pixels) to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl Command {
    /// The source argument of the command.
    pub fn source(&self) -> &str {
        match self {
            Command::Inspect(config) => &config.source,
            Command::Tiles(config) => &config.source,
            Command::Fetch(config) => &config.source,
        }
    }
}

// =============================================================================
// Sources
// =============================================================================

/// Where the file bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Local(PathBuf),
    S3(S3Object),
}

impl Source {
    /// Parse a source argument.
    pub fn parse(source: &str) -> Result<Self, String> {
        if source.is_empty() {
            return Err("source must not be empty".to_string());
        }

        if source.starts_with("s3://") {
            return S3Object::parse(source)
                .map(Source::S3)
                .ok_or_else(|| format!("invalid S3 URL '{}': expected s3://bucket/key", source));
        }

        Ok(Source::Local(PathBuf::from(source)))
    }
}

impl Cli {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_tiles == 0 {
            return Err("cache_tiles must be greater than 0".to_string());
        }

        Source::parse(self.command.source())?;

        Ok(())
    }

    /// Parsed source of the command (call validate() first).
    pub fn source(&self) -> Result<Source, String> {
        Source::parse(self.command.source())
    }
}

// =============================================================================
// Tests
// =============================================================================
