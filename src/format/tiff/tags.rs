//! TIFF tag and field type definitions.
//!
//! This module defines the vocabulary for TIFF parsing:
//! - Field types and their byte widths (the type catalog)
//! - Tag IDs and their field names
//! - Human-readable interpretations for a subset of tag values
//!
//! Every numeric-to-name mapping is a closed enum with an `Unknown`
//! variant, so lookups never fail.

use serde::Serialize;

// =============================================================================
// TIFF Field Types
// =============================================================================

/// TIFF field types that determine how values are encoded.
///
/// The byte width of a type decides whether a value fits inline in an
/// entry and how arrays of values are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldType {
    /// Unsigned 8-bit integer
    Byte,
    /// 8-bit character, NUL terminated
    Ascii,
    /// Unsigned 16-bit integer
    Short,
    /// Unsigned 32-bit integer
    Long,
    /// Two LONGs: numerator, denominator
    Rational,
    /// Signed 8-bit integer
    SByte,
    /// Opaque byte
    Undefined,
    /// Signed 16-bit integer
    SShort,
    /// Signed 32-bit integer
    SLong,
    /// Two SLONGs: numerator, denominator
    SRational,
    /// IEEE single precision
    Float,
    /// IEEE double precision
    Double,
    /// Type id outside the classic table
    Unknown(u16),
}

impl FieldType {
    /// Create a FieldType from its numeric value.
    pub const fn from_u16(value: u16) -> Self {
        match value {
            1 => FieldType::Byte,
            2 => FieldType::Ascii,
            3 => FieldType::Short,
            4 => FieldType::Long,
            5 => FieldType::Rational,
            6 => FieldType::SByte,
            7 => FieldType::Undefined,
            8 => FieldType::SShort,
            9 => FieldType::SLong,
            10 => FieldType::SRational,
            11 => FieldType::Float,
            12 => FieldType::Double,
            other => FieldType::Unknown(other),
        }
    }

    /// Get the numeric type id.
    pub const fn as_u16(self) -> u16 {
        match self {
            FieldType::Byte => 1,
            FieldType::Ascii => 2,
            FieldType::Short => 3,
            FieldType::Long => 4,
            FieldType::Rational => 5,
            FieldType::SByte => 6,
            FieldType::Undefined => 7,
            FieldType::SShort => 8,
            FieldType::SLong => 9,
            FieldType::SRational => 10,
            FieldType::Float => 11,
            FieldType::Double => 12,
            FieldType::Unknown(other) => other,
        }
    }

    /// Size of a single value of this type in bytes.
    ///
    /// Returns `None` for unknown types.
    #[inline]
    pub const fn size_in_bytes(self) -> Option<usize> {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => {
                Some(1)
            }
            FieldType::Short | FieldType::SShort => Some(2),
            FieldType::Long | FieldType::SLong | FieldType::Float => Some(4),
            FieldType::Rational | FieldType::SRational | FieldType::Double => Some(8),
            FieldType::Unknown(_) => None,
        }
    }

    /// Element width used for layout decisions.
    ///
    /// Unknown types are read as raw bytes, one byte per element.
    #[inline]
    pub const fn element_width(self) -> usize {
        match self.size_in_bytes() {
            Some(size) => size,
            None => 1,
        }
    }

    /// Maximum bytes that can be stored inline in a classic TIFF entry.
    pub const INLINE_THRESHOLD: u64 = 4;

    /// Total byte length of `count` values of this type.
    #[inline]
    pub const fn data_length(self, count: u32) -> u64 {
        self.element_width() as u64 * count as u64
    }

    /// Check if `count` values of this type fit inline in an entry.
    #[inline]
    pub const fn fits_inline(self, count: u32) -> bool {
        self.data_length(count) <= Self::INLINE_THRESHOLD
    }

    /// Name of the type as written in the TIFF 6.0 specification.
    pub const fn name(self) -> &'static str {
        match self {
            FieldType::Byte => "BYTE",
            FieldType::Ascii => "ASCII",
            FieldType::Short => "SHORT",
            FieldType::Long => "LONG",
            FieldType::Rational => "RATIONAL",
            FieldType::SByte => "SBYTE",
            FieldType::Undefined => "UNDEFINED",
            FieldType::SShort => "SSHORT",
            FieldType::SLong => "SLONG",
            FieldType::SRational => "SRATIONAL",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
            FieldType::Unknown(_) => "UNKNOWN",
        }
    }
}

/// Byte width of a numeric field type id.
///
/// Returns `None` for type ids outside the classic table.
pub const fn byte_width(type_id: u16) -> Option<usize> {
    FieldType::from_u16(type_id).size_in_bytes()
}

// =============================================================================
// TIFF Tags
// =============================================================================

/// Field name returned for tag ids missing from the table.
pub const UNKNOWN_FIELD_NAME: &str = "Unknown";

macro_rules! tiff_tags {
    ($($variant:ident = $id:literal => $name:literal,)*) => {
        /// TIFF tag IDs known to the parser.
        ///
        /// Covers baseline TIFF, tiling, the GeoTIFF tags and the GDAL
        /// extension tags found in Cloud-Optimized GeoTIFFs.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum TiffTag {
            $($variant,)*
            /// Tag id missing from the table
            Unknown(u16),
        }

        impl TiffTag {
            /// Create a TiffTag from its numeric value.
            pub const fn from_u16(value: u16) -> Self {
                match value {
                    $($id => TiffTag::$variant,)*
                    other => TiffTag::Unknown(other),
                }
            }

            /// Get the numeric tag ID.
            pub const fn as_u16(self) -> u16 {
                match self {
                    $(TiffTag::$variant => $id,)*
                    TiffTag::Unknown(other) => other,
                }
            }

            /// Field name for this tag, or [`UNKNOWN_FIELD_NAME`].
            pub const fn name(self) -> &'static str {
                match self {
                    $(TiffTag::$variant => $name,)*
                    TiffTag::Unknown(_) => UNKNOWN_FIELD_NAME,
                }
            }
        }
    };
}

tiff_tags! {
    NewSubfileType = 254 => "NewSubfileType",
    SubfileType = 255 => "SubfileType",
    ImageWidth = 256 => "ImageWidth",
    ImageHeight = 257 => "ImageHeight",
    BitsPerSample = 258 => "BitsPerSample",
    Compression = 259 => "Compression",
    PhotometricInterpretation = 262 => "PhotometricInterpretation",
    Thresholding = 263 => "Thresholding",
    CellWidth = 264 => "CellWidth",
    CellLength = 265 => "CellLength",
    FillOrder = 266 => "FillOrder",
    DocumentName = 269 => "DocumentName",
    ImageDescription = 270 => "ImageDescription",
    Make = 271 => "Make",
    Model = 272 => "Model",
    StripOffsets = 273 => "StripOffsets",
    Orientation = 274 => "Orientation",
    SamplesPerPixel = 277 => "SamplesPerPixel",
    RowsPerStrip = 278 => "RowsPerStrip",
    StripByteCounts = 279 => "StripByteCounts",
    MinSampleValue = 280 => "MinSampleValue",
    MaxSampleValue = 281 => "MaxSampleValue",
    XResolution = 282 => "XResolution",
    YResolution = 283 => "YResolution",
    PlanarConfiguration = 284 => "PlanarConfiguration",
    ResolutionUnit = 296 => "ResolutionUnit",
    Software = 305 => "Software",
    DateTime = 306 => "DateTime",
    Artist = 315 => "Artist",
    HostComputer = 316 => "HostComputer",
    Predictor = 317 => "Predictor",
    ColorMap = 320 => "ColorMap",
    TileWidth = 322 => "TileWidth",
    TileLength = 323 => "TileLength",
    TileOffsets = 324 => "TileOffsets",
    TileByteCounts = 325 => "TileByteCounts",
    SubIfds = 330 => "SubIFDs",
    ExtraSamples = 338 => "ExtraSamples",
    SampleFormat = 339 => "SampleFormat",
    JpegTables = 347 => "JPEGTables",
    YCbCrSubSampling = 530 => "YCbCrSubSampling",
    Xmp = 700 => "XMP",
    Copyright = 33432 => "Copyright",
    ModelPixelScale = 33550 => "ModelPixelScaleTag",
    ModelTiepoint = 33922 => "ModelTiepointTag",
    ModelTransformation = 34264 => "ModelTransformationTag",
    Photoshop = 34377 => "Photoshop",
    ExifIfd = 34665 => "EXIF_IFD",
    GeoKeyDirectory = 34735 => "GeoKeyDirectoryTag",
    GeoDoubleParams = 34736 => "GeoDoubleParamsTag",
    GeoAsciiParams = 34737 => "GeoAsciiParamsTag",
    GpsIfd = 34853 => "GPS_IFD",
    ImageSourceData = 37724 => "ImageSourceData",
    GdalMetadata = 42112 => "GDAL_METADATA",
    GdalNodata = 42113 => "GDAL_NODATA",
}

impl TiffTag {
    /// Whether the tag is missing from the table.
    #[inline]
    pub const fn is_unknown(self) -> bool {
        matches!(self, TiffTag::Unknown(_))
    }

    /// Key used for this tag in a field-name mapping.
    ///
    /// Unknown tags get their id appended so that distinct unknown tags
    /// do not collide.
    pub fn field_key(self) -> String {
        match self {
            TiffTag::Unknown(id) => format!("{}({})", UNKNOWN_FIELD_NAME, id),
            known => known.name().to_string(),
        }
    }
}

impl Serialize for TiffTag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.as_u16())
    }
}

/// Field name for a numeric tag id. Never fails.
pub const fn field_name(tag_id: u16) -> &'static str {
    TiffTag::from_u16(tag_id).name()
}

// =============================================================================
// Value Interpretations
// =============================================================================

macro_rules! value_names {
    ($(#[$doc:meta])* $enum_name:ident { $($variant:ident = $id:literal => $name:literal,)* }) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $enum_name {
            $($variant,)*
            /// Value missing from the table
            Unknown(u16),
        }

        impl $enum_name {
            /// Create from the raw tag value.
            pub const fn from_u16(value: u16) -> Self {
                match value {
                    $($id => $enum_name::$variant,)*
                    other => $enum_name::Unknown(other),
                }
            }

            /// Get the raw tag value.
            pub const fn as_u16(self) -> u16 {
                match self {
                    $($enum_name::$variant => $id,)*
                    $enum_name::Unknown(other) => other,
                }
            }

            /// Human-readable name.
            pub const fn name(self) -> &'static str {
                match self {
                    $($enum_name::$variant => $name,)*
                    $enum_name::Unknown(_) => "Unknown",
                }
            }
        }
    };
}

value_names! {
    /// TIFF compression scheme identifiers.
    Compression {
        None = 1 => "No compression",
        CcittRle = 2 => "CCITT modified Huffman RLE",
        CcittFax3 = 3 => "CCITT Group 3 fax",
        CcittFax4 = 4 => "CCITT Group 4 fax",
        Lzw = 5 => "LZW",
        OldJpeg = 6 => "Old JPEG",
        Jpeg = 7 => "JPEG",
        AdobeDeflate = 8 => "Deflate",
        PackBits = 32773 => "PackBits",
        Deflate = 32946 => "Deflate (PKZIP)",
        Dcs = 32947 => "DCS",
        Jbig = 34661 => "JBIG",
        Jpeg2000 = 34712 => "JPEG 2000",
        LossyJpeg = 34892 => "Lossy JPEG",
        Lerc = 34887 => "LERC",
        Zstd = 50000 => "ZSTD",
        WebP = 50001 => "WebP",
    }
}

value_names! {
    /// Photometric interpretation of pixel samples.
    PhotometricInterpretation {
        WhiteIsZero = 0 => "WhiteIsZero",
        BlackIsZero = 1 => "BlackIsZero",
        Rgb = 2 => "RGB",
        Palette = 3 => "Palette color",
        TransparencyMask = 4 => "Transparency Mask",
        Separated = 5 => "Separated",
        YCbCr = 6 => "YCbCr",
        CieLab = 8 => "CIE L*a*b*",
        IccLab = 9 => "ICC L*a*b*",
        ItuLab = 10 => "ITU L*a*b*",
        LogL = 32844 => "LogL",
        LogLuv = 32845 => "LogLuv",
        Cfa = 32803 => "CFA",
        LinearRaw = 34892 => "LinearRaw",
    }
}

value_names! {
    /// How samples of a pixel are stored.
    PlanarConfiguration {
        Chunky = 1 => "Chunky",
        Planar = 2 => "Planar",
    }
}

value_names! {
    /// Unit of XResolution / YResolution.
    ResolutionUnit {
        None = 1 => "None",
        Inch = 2 => "Inch",
        Centimeter = 3 => "Centimeter",
    }
}

value_names! {
    /// Interpretation of each data sample.
    SampleFormat {
        Uint = 1 => "Unsigned integer",
        Int = 2 => "Signed integer",
        IeeeFp = 3 => "IEEE floating point",
        Void = 4 => "Undefined",
        ComplexInt = 5 => "Complex integer",
        ComplexIeeeFp = 6 => "Complex IEEE floating point",
    }
}

value_names! {
    /// Prediction scheme applied before compression.
    Predictor {
        None = 1 => "None",
        Horizontal = 2 => "Horizontal differencing",
        FloatingPoint = 3 => "Floating point",
    }
}

/// Human-readable interpretation of a tag value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interpretation {
    /// Name of the field being interpreted
    pub label: &'static str,
    /// Readable form of the value
    pub value: &'static str,
}

/// Interpret a raw tag value for the tags that have named values.
///
/// Returns `None` when the tag has no interpretation; callers fall back
/// to the raw typed value.
pub fn interpret(tag: TiffTag, raw: u64) -> Option<Interpretation> {
    let raw = u16::try_from(raw).ok()?;
    let value = match tag {
        TiffTag::Compression => Compression::from_u16(raw).name(),
        TiffTag::PhotometricInterpretation => PhotometricInterpretation::from_u16(raw).name(),
        TiffTag::PlanarConfiguration => PlanarConfiguration::from_u16(raw).name(),
        TiffTag::ResolutionUnit => ResolutionUnit::from_u16(raw).name(),
        TiffTag::SampleFormat => SampleFormat::from_u16(raw).name(),
        TiffTag::Predictor => Predictor::from_u16(raw).name(),
        _ => return None,
    };

    Some(Interpretation {
        label: tag.name(),
        value,
    })
}

// =============================================================================
// Tests
// =============================================================================
