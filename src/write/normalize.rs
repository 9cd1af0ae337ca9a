//! Metadata normalization.
//!
//! Turns the caller's name-keyed metadata into a numeric-code directory
//! ready for encoding: required tags the caller left out are filled from the
//! pixel data, a WGS 84 geographic reference is assumed when no CRS is
//! given, GeoKeys are folded into the GeoKey directory and its parameter
//! tags, and every remaining name is resolved through the catalog.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::debug;

use crate::error::{EncodeError, ValidationError, WriteError};
use crate::format::tiff::{tag, Directory, TagCatalog, TagValue};

use super::geokeys::build_geo_key_block;
use super::pixels::PixelData;

/// Shorthand names accepted for the raster dimensions.
const WIDTH_ALIAS: &str = "width";
const HEIGHT_ALIAS: &str = "height";

/// EPSG code of WGS 84.
const WGS84_EPSG: u16 = 4326;

/// GTModelTypeGeoKey value for geographic (lat/long) models.
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;

/// Caller-supplied metadata keyed by tag or GeoKey name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct MetadataMap {
    entries: BTreeMap<String, TagValue>,
}

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object whose values are numbers, number arrays or strings.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<TagValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<TagValue>) -> Option<TagValue> {
        self.entries.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&TagValue> {
        self.entries.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<TagValue> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    fn set_default(&mut self, name: &str, value: impl Into<TagValue>) {
        if !self.entries.contains_key(name) {
            self.entries.insert(name.to_string(), value.into());
        }
    }

    fn dimension(&self, name: &str, alias: &str) -> Option<usize> {
        self.get(name)
            .or_else(|| self.get(alias))
            .and_then(TagValue::to_u64_vec)
            .and_then(|values| values.first().copied())
            .map(|value| value as usize)
    }
}

impl<K: Into<String>, V: Into<TagValue>> FromIterator<(K, V)> for MetadataMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = MetadataMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

/// Fills defaults and resolves names for one image.
#[derive(Debug, Clone)]
pub struct MetadataNormalizer {
    catalog: &'static TagCatalog,
    software: String,
}

impl Default for MetadataNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataNormalizer {
    pub fn new() -> Self {
        Self {
            catalog: TagCatalog::global(),
            software: env!("CARGO_PKG_NAME").to_string(),
        }
    }

    /// Override the Software tag written when the caller sets none.
    pub fn with_software(mut self, software: impl Into<String>) -> Self {
        self.software = software.into();
        self
    }

    /// Normalize `metadata` for `pixels` into a directory keyed by tag code.
    ///
    /// # Errors
    /// - `ValidationError` when width or height cannot be established or the
    ///   sample count does not match the raster shape
    /// - `EncodeError` when a name is not in the catalog or a GeoKey value
    ///   does not fit its type
    pub fn normalize(
        &self,
        pixels: &PixelData,
        mut metadata: MetadataMap,
    ) -> Result<Directory, WriteError> {
        let width = metadata
            .dimension("ImageWidth", WIDTH_ALIAS)
            .or(pixels.width())
            .ok_or(ValidationError::MissingDimension("width"))?;
        let height = metadata
            .dimension("ImageLength", HEIGHT_ALIAS)
            .or(pixels.height())
            .ok_or(ValidationError::MissingDimension("height"))?;

        let samples = pixels.samples();
        if samples.is_empty() || width == 0 || height == 0 {
            return Err(ValidationError::Empty.into());
        }

        let shape_error = || ValidationError::SampleCount {
            samples: samples.len(),
            width,
            height,
        };
        let pixel_count = width.checked_mul(height).ok_or_else(shape_error)?;
        let bands = match pixels.bands() {
            Some(bands) => bands,
            None => metadata
                .get("SamplesPerPixel")
                .and_then(TagValue::first_number)
                .map(|n| n as usize)
                .unwrap_or(samples.len() / pixel_count),
        };
        let sample_total = pixel_count.checked_mul(bands);
        if bands == 0 || bands > usize::from(u16::MAX) || sample_total != Some(samples.len()) {
            return Err(shape_error().into());
        }
        let (width_field, height_field) = match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) => (w, h),
            _ => return Err(shape_error().into()),
        };

        metadata.remove(WIDTH_ALIAS);
        metadata.remove(HEIGHT_ALIAS);
        // Recomputed by the image encoder
        metadata.remove("StripOffsets");

        metadata.set_default("ImageWidth", width_field);
        metadata.set_default("ImageLength", height_field);
        metadata.set_default("BitsPerSample", vec![samples.bits_per_sample(); bands]);
        metadata.set_default("Compression", 1u16);
        metadata.set_default("PlanarConfiguration", 1u16);
        metadata.set_default("SamplesPerPixel", bands as u16);
        metadata.set_default(
            "PhotometricInterpretation",
            if bands == 3 { 2u16 } else { 1u16 },
        );
        metadata.set_default("RowsPerStrip", height_field);
        metadata.set_default("SampleFormat", vec![samples.sample_format(); bands]);
        metadata.set_default(
            "ModelPixelScale",
            vec![360.0 / width as f64, 180.0 / height as f64, 0.0],
        );
        metadata.set_default("Software", self.software.as_str());

        let element_width = metadata
            .get("BitsPerSample")
            .and_then(TagValue::first_number)
            .map(|bits| ((bits as usize) / 8).max(1))
            .unwrap_or(1);
        let strip_bytes = (samples.len() as u64).saturating_mul(element_width as u64);
        let strip_bytes =
            u32::try_from(strip_bytes).map_err(|_| EncodeError::TooLarge(strip_bytes))?;
        metadata.set_default("StripByteCounts", strip_bytes);

        let has_crs = metadata.contains("GeographicTypeGeoKey")
            || metadata.contains("ProjectedCSTypeGeoKey");
        if !has_crs {
            metadata.set_default("GeographicTypeGeoKey", WGS84_EPSG);
            metadata.set_default("GTModelTypeGeoKey", MODEL_TYPE_GEOGRAPHIC);
            metadata.set_default("GeogCitationGeoKey", "WGS 84");
            metadata.set_default("ModelTiepoint", vec![0.0, 0.0, 0.0, -180.0, 90.0, 0.0]);
        }

        let directory = self.resolve(metadata)?;
        debug!(
            width,
            height,
            bands,
            tags = directory.len(),
            "Normalized metadata"
        );
        Ok(directory)
    }

    /// Split GeoKeys from tags, build the GeoKey block and resolve names.
    fn resolve(&self, metadata: MetadataMap) -> Result<Directory, EncodeError> {
        let mut keys = BTreeMap::new();
        let mut directory = Directory::default();

        for (name, value) in metadata.entries {
            if TagCatalog::is_geo_key_name(&name) {
                let info = self
                    .catalog
                    .geo_key_by_name(&name)
                    .ok_or_else(|| EncodeError::UnknownTagName(name.clone()))?;
                keys.insert(info.code, value);
            } else {
                let info = self
                    .catalog
                    .tag_by_name(&name)
                    .ok_or_else(|| EncodeError::UnknownTagName(name.clone()))?;
                directory.insert(info.code, value);
            }
        }

        if !keys.is_empty() {
            let block = build_geo_key_block(&keys)?;
            // Caller-supplied parameter tags win
            if !directory.contains(tag::GEO_KEY_DIRECTORY) {
                directory.insert(tag::GEO_KEY_DIRECTORY, block.directory);
            }
            if let Some(ascii) = block.ascii_params {
                if !directory.contains(tag::GEO_ASCII_PARAMS) {
                    directory.insert(tag::GEO_ASCII_PARAMS, ascii);
                }
            }
            if let Some(doubles) = block.double_params {
                if !directory.contains(tag::GEO_DOUBLE_PARAMS) {
                    directory.insert(tag::GEO_DOUBLE_PARAMS, doubles);
                }
            }
        }

        Ok(directory)
    }
}
