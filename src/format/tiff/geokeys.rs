//! GeoKey directory resolution.
//!
//! GeoTIFF stores its coordinate reference system parameters as a small
//! key/value directory packed into the SHORT array of `GeoKeyDirectoryTag`:
//!
//! ```text
//! [version, revision, minor_revision, key_count,
//!  key_id, tag_location, count, value_or_offset,   // key 0
//!  key_id, tag_location, count, value_or_offset,   // key 1
//!  ...]
//! ```
//!
//! A key with `tag_location == 0` and `count == 1` holds its value
//! directly. Any other key points into the array of another tag in the
//! same directory (usually `GeoDoubleParamsTag` or `GeoAsciiParamsTag`):
//! `count` elements starting at element `value_or_offset`.
//!
//! Resolution runs after the whole directory is decoded, so referenced
//! tags are available whatever their position in the entry table.

use std::collections::BTreeMap;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::Diagnostic;

use super::tags::TiffTag;
use super::values::TagValue;

/// Expected GeoKeyDirectory version
const KEY_DIRECTORY_VERSION: u16 = 1;

/// Expected GeoKey revision
const KEY_REVISION: u16 = 1;

/// Number of SHORTs in the header and in each key entry
const KEY_ENTRY_SHORTS: usize = 4;

// =============================================================================
// GeoKeyId
// =============================================================================

macro_rules! geo_keys {
    ($($variant:ident = $id:literal => $name:literal,)*) => {
        /// GeoKey identifiers from the GeoTIFF 1.1 key table.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum GeoKeyId {
            $($variant,)*
            /// Private user-defined key (32767), recognized but unnamed
            UserDefined,
            /// Key id outside every known range
            Unknown(u16),
        }

        impl GeoKeyId {
            /// Create a GeoKeyId from its numeric value.
            pub const fn from_u16(value: u16) -> Self {
                match value {
                    $($id => GeoKeyId::$variant,)*
                    USER_DEFINED_KEY => GeoKeyId::UserDefined,
                    other => GeoKeyId::Unknown(other),
                }
            }

            /// Get the numeric key id.
            pub const fn as_u16(self) -> u16 {
                match self {
                    $(GeoKeyId::$variant => $id,)*
                    GeoKeyId::UserDefined => USER_DEFINED_KEY,
                    GeoKeyId::Unknown(other) => other,
                }
            }

            /// Canonical key name; `None` for user-defined and unknown keys.
            pub const fn name(self) -> Option<&'static str> {
                match self {
                    $(GeoKeyId::$variant => Some($name),)*
                    GeoKeyId::UserDefined | GeoKeyId::Unknown(_) => None,
                }
            }
        }
    };
}

/// Key id reserved for private, user-defined values.
pub const USER_DEFINED_KEY: u16 = 32767;

geo_keys! {
    // Configuration keys
    GtModelType = 1024 => "GTModelTypeGeoKey",
    GtRasterType = 1025 => "GTRasterTypeGeoKey",
    GtCitation = 1026 => "GTCitationGeoKey",

    // Geodetic CRS parameter keys
    GeographicType = 2048 => "GeographicTypeGeoKey",
    GeogCitation = 2049 => "GeogCitationGeoKey",
    GeogGeodeticDatum = 2050 => "GeogGeodeticDatumGeoKey",
    GeogPrimeMeridian = 2051 => "GeogPrimeMeridianGeoKey",
    GeogLinearUnits = 2052 => "GeogLinearUnitsGeoKey",
    GeogLinearUnitSize = 2053 => "GeogLinearUnitSizeGeoKey",
    GeogAngularUnits = 2054 => "GeogAngularUnitsGeoKey",
    GeogAngularUnitSize = 2055 => "GeogAngularUnitSizeGeoKey",
    GeogEllipsoid = 2056 => "GeogEllipsoidGeoKey",
    GeogSemiMajorAxis = 2057 => "GeogSemiMajorAxisGeoKey",
    GeogSemiMinorAxis = 2058 => "GeogSemiMinorAxisGeoKey",
    GeogInvFlattening = 2059 => "GeogInvFlatteningGeoKey",
    GeogAzimuthUnits = 2060 => "GeogAzimuthUnitsGeoKey",
    GeogPrimeMeridianLong = 2061 => "GeogPrimeMeridianLongGeoKey",

    // Projected CRS parameter keys
    ProjectedCsType = 3072 => "ProjectedCSTypeGeoKey",
    PcsCitation = 3073 => "PCSCitationGeoKey",
    Projection = 3074 => "ProjectionGeoKey",
    ProjCoordTrans = 3075 => "ProjCoordTransGeoKey",
    ProjLinearUnits = 3076 => "ProjLinearUnitsGeoKey",
    ProjLinearUnitSize = 3077 => "ProjLinearUnitSizeGeoKey",
    ProjStdParallel1 = 3078 => "ProjStdParallel1GeoKey",
    ProjStdParallel2 = 3079 => "ProjStdParallel2GeoKey",
    ProjNatOriginLong = 3080 => "ProjNatOriginLongGeoKey",
    ProjNatOriginLat = 3081 => "ProjNatOriginLatGeoKey",
    ProjFalseEasting = 3082 => "ProjFalseEastingGeoKey",
    ProjFalseNorthing = 3083 => "ProjFalseNorthingGeoKey",
    ProjFalseOriginLong = 3084 => "ProjFalseOriginLongGeoKey",
    ProjFalseOriginLat = 3085 => "ProjFalseOriginLatGeoKey",
    ProjFalseOriginEasting = 3086 => "ProjFalseOriginEastingGeoKey",
    ProjFalseOriginNorthing = 3087 => "ProjFalseOriginNorthingGeoKey",
    ProjCenterLong = 3088 => "ProjCenterLongGeoKey",
    ProjCenterLat = 3089 => "ProjCenterLatGeoKey",
    ProjCenterEasting = 3090 => "ProjCenterEastingGeoKey",
    ProjCenterNorthing = 3091 => "ProjCenterNorthingGeoKey",
    ProjScaleAtNatOrigin = 3092 => "ProjScaleAtNatOriginGeoKey",
    ProjScaleAtCenter = 3093 => "ProjScaleAtCenterGeoKey",
    ProjAzimuthAngle = 3094 => "ProjAzimuthAngleGeoKey",
    ProjStraightVertPoleLong = 3095 => "ProjStraightVertPoleLongGeoKey",

    // Vertical CRS parameter keys
    VerticalCsType = 4096 => "VerticalCSTypeGeoKey",
    VerticalCitation = 4097 => "VerticalCitationGeoKey",
    VerticalDatum = 4098 => "VerticalDatumGeoKey",
    VerticalUnits = 4099 => "VerticalUnitsGeoKey",
}

impl Serialize for GeoKeyId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.as_u16())
    }
}

// =============================================================================
// GeoKey values
// =============================================================================

/// Resolved value of a single GeoKey.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeoKeyValue {
    /// SHORT stored directly in the key entry
    Literal { value: u16 },

    /// `count` elements sliced out of another tag's value
    Referenced { tag: TiffTag, value: TagValue },

    /// Reference that could not be resolved (tag absent or too short)
    Missing {
        tag_location: u16,
        count: u16,
        value_offset: u16,
    },
}

impl GeoKeyValue {
    /// The literal SHORT, or a single-element SHORT reference.
    pub fn as_short(&self) -> Option<u16> {
        match self {
            GeoKeyValue::Literal { value } => Some(*value),
            GeoKeyValue::Referenced {
                value: TagValue::Short(v),
                ..
            } if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    /// Text of an ASCII reference, without the trailing `|` separator.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            GeoKeyValue::Referenced { value, .. } => {
                let text = value.as_str()?;
                Some(text.strip_suffix('|').unwrap_or(text))
            }
            _ => None,
        }
    }

    /// DOUBLE values of a GeoDoubleParams reference.
    pub fn as_doubles(&self) -> Option<&[f64]> {
        match self {
            GeoKeyValue::Referenced {
                value: TagValue::Double(v),
                ..
            } => Some(v),
            _ => None,
        }
    }
}

/// A single resolved GeoKey.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoKey {
    pub id: GeoKeyId,
    pub value: GeoKeyValue,
}

impl GeoKey {
    /// Readable meaning of coded values for the configuration keys.
    pub fn interpretation(&self) -> Option<&'static str> {
        let code = self.value.as_short()?;
        match (self.id, code) {
            (GeoKeyId::GtModelType, 1) => Some("Projected"),
            (GeoKeyId::GtModelType, 2) => Some("Geographic"),
            (GeoKeyId::GtModelType, 3) => Some("Geocentric"),
            (GeoKeyId::GtRasterType, 1) => Some("PixelIsArea"),
            (GeoKeyId::GtRasterType, 2) => Some("PixelIsPoint"),
            (_, USER_DEFINED_KEY) => Some("User-defined"),
            _ => None,
        }
    }
}

impl Serialize for GeoKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("GeoKey", 4)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("name", &self.id.name())?;
        state.serialize_field("value", &self.value)?;
        state.serialize_field("interpretation", &self.interpretation())?;
        state.end()
    }
}

// =============================================================================
// GeoKeyDirectory
// =============================================================================

/// Decoded GeoKeyDirectoryTag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoKeyDirectory {
    pub version: u16,
    pub revision: u16,
    pub minor_revision: u16,

    /// Resolved keys, by numeric key id
    pub keys: BTreeMap<u16, GeoKey>,
}

impl GeoKeyDirectory {
    /// Look up a key.
    pub fn get(&self, id: GeoKeyId) -> Option<&GeoKey> {
        self.keys.get(&id.as_u16())
    }

    /// Whether the header matches `{1, 1, 0|1}`.
    pub fn header_is_valid(&self) -> bool {
        self.version == KEY_DIRECTORY_VERSION
            && self.revision == KEY_REVISION
            && matches!(self.minor_revision, 0 | 1)
    }

    /// EPSG code of the CRS: projected if present, otherwise geographic.
    ///
    /// User-defined codes (32767) are not EPSG codes and yield `None`.
    pub fn epsg_code(&self) -> Option<u16> {
        [GeoKeyId::ProjectedCsType, GeoKeyId::GeographicType]
            .into_iter()
            .filter_map(|id| self.get(id)?.value.as_short())
            .find(|&code| code != USER_DEFINED_KEY && code != 0)
    }
}

/// Resolve the SHORT array of a GeoKeyDirectoryTag.
///
/// `lookup` returns the already-decoded value of a sibling tag by id.
/// Non-fatal problems are pushed to `diagnostics`; resolution itself
/// never fails.
pub fn resolve_geo_keys<'a, F>(
    raw: &[u16],
    directory: usize,
    lookup: F,
    diagnostics: &mut Vec<Diagnostic>,
) -> GeoKeyDirectory
where
    F: Fn(u16) -> Option<&'a TagValue>,
{
    let header = |i: usize| raw.get(i).copied().unwrap_or(0);
    let mut result = GeoKeyDirectory {
        version: header(0),
        revision: header(1),
        minor_revision: header(2),
        keys: BTreeMap::new(),
    };

    if raw.len() < KEY_ENTRY_SHORTS || !result.header_is_valid() {
        diagnostics.push(Diagnostic::GeoKeyHeaderMismatch {
            directory,
            version: result.version,
            revision: result.revision,
            minor_revision: result.minor_revision,
        });
    }

    let declared = header(3);
    let available = raw.len().saturating_sub(KEY_ENTRY_SHORTS) / KEY_ENTRY_SHORTS;
    if usize::from(declared) > available {
        diagnostics.push(Diagnostic::GeoKeyTruncated {
            directory,
            declared,
            available,
        });
    }

    let entries = raw
        .get(KEY_ENTRY_SHORTS..)
        .unwrap_or(&[])
        .chunks_exact(KEY_ENTRY_SHORTS)
        .take(usize::from(declared));

    for entry in entries {
        let (key_id, tag_location, count, value_offset) = (entry[0], entry[1], entry[2], entry[3]);
        let id = GeoKeyId::from_u16(key_id);
        if matches!(id, GeoKeyId::Unknown(_)) {
            diagnostics.push(Diagnostic::UnknownGeoKey { directory, key_id });
        }

        let value = if tag_location == 0 && count == 1 {
            GeoKeyValue::Literal {
                value: value_offset,
            }
        } else {
            let sliced = lookup(tag_location)
                .and_then(|v| v.slice(usize::from(value_offset), usize::from(count)));
            match sliced {
                Some(value) => GeoKeyValue::Referenced {
                    tag: TiffTag::from_u16(tag_location),
                    value,
                },
                None => {
                    diagnostics.push(Diagnostic::GeoKeyLookupMiss {
                        directory,
                        key_id,
                        tag_location,
                        count,
                        value_offset,
                    });
                    GeoKeyValue::Missing {
                        tag_location,
                        count,
                        value_offset,
                    }
                }
            }
        };

        result.keys.insert(key_id, GeoKey { id, value });
    }

    debug!(
        directory,
        keys = result.keys.len(),
        "resolved GeoKey directory"
    );

    result
}

// =============================================================================
// Tests
// =============================================================================
