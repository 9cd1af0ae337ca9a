//! Static catalog of TIFF tags and GeoTIFF keys.
//!
//! The catalog maps canonical names to numeric codes (and back) and each
//! code to the wire type used when writing it. It is built once on first
//! use and never mutated afterwards, so lookups need no synchronisation.

use std::collections::HashMap;
use std::sync::OnceLock;

use super::tags::FieldType;
use super::tags::FieldType::{Ascii, Double, Long, Rational, Short, Undefined};

/// Numeric codes for the tags the writer and reader touch directly.
pub mod tag {
    pub const NEW_SUBFILE_TYPE: u16 = 254;
    pub const IMAGE_WIDTH: u16 = 256;
    pub const IMAGE_LENGTH: u16 = 257;
    pub const BITS_PER_SAMPLE: u16 = 258;
    pub const COMPRESSION: u16 = 259;
    pub const PHOTOMETRIC_INTERPRETATION: u16 = 262;
    pub const IMAGE_DESCRIPTION: u16 = 270;
    pub const STRIP_OFFSETS: u16 = 273;
    pub const SAMPLES_PER_PIXEL: u16 = 277;
    pub const ROWS_PER_STRIP: u16 = 278;
    pub const STRIP_BYTE_COUNTS: u16 = 279;
    pub const X_RESOLUTION: u16 = 282;
    pub const Y_RESOLUTION: u16 = 283;
    pub const PLANAR_CONFIGURATION: u16 = 284;
    pub const SOFTWARE: u16 = 305;
    pub const PREDICTOR: u16 = 317;
    pub const TILE_WIDTH: u16 = 322;
    pub const TILE_LENGTH: u16 = 323;
    pub const TILE_OFFSETS: u16 = 324;
    pub const TILE_BYTE_COUNTS: u16 = 325;
    pub const SAMPLE_FORMAT: u16 = 339;
    pub const JPEG_TABLES: u16 = 347;
    pub const MODEL_PIXEL_SCALE: u16 = 33550;
    pub const MODEL_TIEPOINT: u16 = 33922;
    pub const GEO_KEY_DIRECTORY: u16 = 34735;
    pub const GEO_DOUBLE_PARAMS: u16 = 34736;
    pub const GEO_ASCII_PARAMS: u16 = 34737;
}

/// Numeric codes for the GeoKeys the normalizer sets by default.
pub mod geo_key {
    pub const GT_MODEL_TYPE: u16 = 1024;
    pub const GEOGRAPHIC_TYPE: u16 = 2048;
    pub const GEOG_CITATION: u16 = 2049;
    pub const PROJECTED_CS_TYPE: u16 = 3072;
}

/// One catalog row: a tag or GeoKey with its wire type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagInfo {
    pub code: u16,
    pub name: &'static str,
    pub field_type: FieldType,
}

const fn info(code: u16, name: &'static str, field_type: FieldType) -> TagInfo {
    TagInfo {
        code,
        name,
        field_type,
    }
}

const TAGS: &[TagInfo] = &[
    // Baseline
    info(254, "NewSubfileType", Long),
    info(255, "SubfileType", Short),
    info(256, "ImageWidth", Long),
    info(257, "ImageLength", Long),
    info(258, "BitsPerSample", Short),
    info(259, "Compression", Short),
    info(262, "PhotometricInterpretation", Short),
    info(263, "Threshholding", Short),
    info(264, "CellWidth", Short),
    info(265, "CellLength", Short),
    info(266, "FillOrder", Short),
    info(269, "DocumentName", Ascii),
    info(270, "ImageDescription", Ascii),
    info(271, "Make", Ascii),
    info(272, "Model", Ascii),
    info(273, "StripOffsets", Long),
    info(274, "Orientation", Short),
    info(277, "SamplesPerPixel", Short),
    info(278, "RowsPerStrip", Long),
    info(279, "StripByteCounts", Long),
    info(280, "MinSampleValue", Short),
    info(281, "MaxSampleValue", Short),
    info(282, "XResolution", Rational),
    info(283, "YResolution", Rational),
    info(284, "PlanarConfiguration", Short),
    info(285, "PageName", Ascii),
    info(286, "XPosition", Rational),
    info(287, "YPosition", Rational),
    info(290, "GrayResponseUnit", Short),
    info(291, "GrayResponseCurve", Short),
    info(296, "ResolutionUnit", Short),
    info(297, "PageNumber", Short),
    info(305, "Software", Ascii),
    info(306, "DateTime", Ascii),
    info(315, "Artist", Ascii),
    info(316, "HostComputer", Ascii),
    info(317, "Predictor", Short),
    info(320, "ColorMap", Short),
    info(322, "TileWidth", Short),
    info(323, "TileLength", Short),
    info(324, "TileOffsets", Long),
    info(325, "TileByteCounts", Long),
    info(338, "ExtraSamples", Short),
    info(339, "SampleFormat", Short),
    info(340, "SMinSampleValue", Double),
    info(341, "SMaxSampleValue", Double),
    info(347, "JPEGTables", Undefined),
    info(529, "YCbCrCoefficients", Rational),
    info(530, "YCbCrSubSampling", Short),
    info(531, "YCbCrPositioning", Short),
    info(532, "ReferenceBlackWhite", Rational),
    info(33432, "Copyright", Ascii),
    // GeoTIFF
    info(33550, "ModelPixelScale", Double),
    info(33922, "ModelTiepoint", Double),
    info(34264, "ModelTransformation", Double),
    info(34735, "GeoKeyDirectory", Short),
    info(34736, "GeoDoubleParams", Double),
    info(34737, "GeoAsciiParams", Ascii),
    // GDAL
    info(42112, "GDAL_METADATA", Ascii),
    info(42113, "GDAL_NODATA", Ascii),
    // LERC
    info(50674, "LercParameters", Long),
];

const GEO_KEYS: &[TagInfo] = &[
    // Configuration keys
    info(1024, "GTModelTypeGeoKey", Short),
    info(1025, "GTRasterTypeGeoKey", Short),
    info(1026, "GTCitationGeoKey", Ascii),
    // Geographic CS parameter keys
    info(2048, "GeographicTypeGeoKey", Short),
    info(2049, "GeogCitationGeoKey", Ascii),
    info(2050, "GeogGeodeticDatumGeoKey", Short),
    info(2051, "GeogPrimeMeridianGeoKey", Short),
    info(2052, "GeogLinearUnitsGeoKey", Short),
    info(2053, "GeogLinearUnitSizeGeoKey", Double),
    info(2054, "GeogAngularUnitsGeoKey", Short),
    info(2055, "GeogAngularUnitSizeGeoKey", Double),
    info(2056, "GeogEllipsoidGeoKey", Short),
    info(2057, "GeogSemiMajorAxisGeoKey", Double),
    info(2058, "GeogSemiMinorAxisGeoKey", Double),
    info(2059, "GeogInvFlatteningGeoKey", Double),
    info(2060, "GeogAzimuthUnitsGeoKey", Short),
    info(2061, "GeogPrimeMeridianLongGeoKey", Double),
    info(2062, "GeogTOWGS84GeoKey", Double),
    // Projected CS parameter keys
    info(3072, "ProjectedCSTypeGeoKey", Short),
    info(3073, "PCSCitationGeoKey", Ascii),
    info(3074, "ProjectionGeoKey", Short),
    info(3075, "ProjCoordTransGeoKey", Short),
    info(3076, "ProjLinearUnitsGeoKey", Short),
    info(3077, "ProjLinearUnitSizeGeoKey", Double),
    info(3078, "ProjStdParallel1GeoKey", Double),
    info(3079, "ProjStdParallel2GeoKey", Double),
    info(3080, "ProjNatOriginLongGeoKey", Double),
    info(3081, "ProjNatOriginLatGeoKey", Double),
    info(3082, "ProjFalseEastingGeoKey", Double),
    info(3083, "ProjFalseNorthingGeoKey", Double),
    info(3084, "ProjFalseOriginLongGeoKey", Double),
    info(3085, "ProjFalseOriginLatGeoKey", Double),
    info(3086, "ProjFalseOriginEastingGeoKey", Double),
    info(3087, "ProjFalseOriginNorthingGeoKey", Double),
    info(3088, "ProjCenterLongGeoKey", Double),
    info(3089, "ProjCenterLatGeoKey", Double),
    info(3090, "ProjCenterEastingGeoKey", Double),
    info(3091, "ProjCenterNorthingGeoKey", Double),
    info(3092, "ProjScaleAtNatOriginGeoKey", Double),
    info(3093, "ProjScaleAtCenterGeoKey", Double),
    info(3094, "ProjAzimuthAngleGeoKey", Double),
    info(3095, "ProjStraightVertPoleLongGeoKey", Double),
    info(3096, "ProjRectifiedGridAngleGeoKey", Double),
    // Vertical CS keys
    info(4096, "VerticalCSTypeGeoKey", Short),
    info(4097, "VerticalCitationGeoKey", Ascii),
    info(4098, "VerticalDatumGeoKey", Short),
    info(4099, "VerticalUnitsGeoKey", Short),
];

/// Suffix that marks a metadata name as a GeoKey.
pub const GEO_KEY_SUFFIX: &str = "GeoKey";

/// Bidirectional name/code lookup for tags and GeoKeys.
#[derive(Debug)]
pub struct TagCatalog {
    tags_by_name: HashMap<&'static str, TagInfo>,
    tags_by_code: HashMap<u16, TagInfo>,
    keys_by_name: HashMap<&'static str, TagInfo>,
    keys_by_code: HashMap<u16, TagInfo>,
}

impl TagCatalog {
    fn build() -> Self {
        Self {
            tags_by_name: TAGS.iter().map(|t| (t.name, *t)).collect(),
            tags_by_code: TAGS.iter().map(|t| (t.code, *t)).collect(),
            keys_by_name: GEO_KEYS.iter().map(|k| (k.name, *k)).collect(),
            keys_by_code: GEO_KEYS.iter().map(|k| (k.code, *k)).collect(),
        }
    }

    /// The process-wide catalog.
    pub fn global() -> &'static TagCatalog {
        static CATALOG: OnceLock<TagCatalog> = OnceLock::new();
        CATALOG.get_or_init(Self::build)
    }

    pub fn tag_by_name(&self, name: &str) -> Option<&TagInfo> {
        self.tags_by_name.get(name)
    }

    pub fn tag_by_code(&self, code: u16) -> Option<&TagInfo> {
        self.tags_by_code.get(&code)
    }

    pub fn geo_key_by_name(&self, name: &str) -> Option<&TagInfo> {
        self.keys_by_name.get(name)
    }

    pub fn geo_key_by_code(&self, code: u16) -> Option<&TagInfo> {
        self.keys_by_code.get(&code)
    }

    /// Resolve a metadata name to its code, trying tags first and GeoKeys second.
    pub fn code_for_name(&self, name: &str) -> Option<u16> {
        self.tag_by_name(name)
            .or_else(|| self.geo_key_by_name(name))
            .map(|info| info.code)
    }

    /// Wire type for a tag code.
    ///
    /// GeoKey codes never collide with tag codes, so both catalogs are
    /// searched.
    pub fn field_type(&self, code: u16) -> Option<FieldType> {
        self.tag_by_code(code)
            .or_else(|| self.geo_key_by_code(code))
            .map(|info| info.field_type)
    }

    /// Whether a metadata name designates a GeoKey.
    pub fn is_geo_key_name(name: &str) -> bool {
        name.ends_with(GEO_KEY_SUFFIX)
    }
}
