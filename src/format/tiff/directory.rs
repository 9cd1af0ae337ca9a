//! Read-side image file directory.
//!
//! A [`Directory`] is what decode capabilities receive: every tag of one
//! IFD keyed by numeric code, plus the byte order of the container so
//! codecs that reinterpret multi-byte samples (predictors) can do so.

use std::collections::BTreeMap;

use bytes::Bytes;

use super::catalog::tag;
use super::parser::ByteOrder;
use super::value::TagValue;

/// One `(KeyID, TagLocation, Count, ValueOffset)` quadruple of a GeoKey directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeyEntry {
    pub key_id: u16,
    pub location: u16,
    pub count: u16,
    pub value_offset: u16,
}

/// Parsed tags of one image file directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Directory {
    byte_order: ByteOrder,
    entries: BTreeMap<u16, TagValue>,
}

impl Default for Directory {
    fn default() -> Self {
        Self::new(ByteOrder::BigEndian)
    }
}

impl Directory {
    pub fn new(byte_order: ByteOrder) -> Self {
        Self {
            byte_order,
            entries: BTreeMap::new(),
        }
    }

    /// Builder-style insert, handy when assembling directories by hand.
    pub fn with(mut self, code: u16, value: impl Into<TagValue>) -> Self {
        self.entries.insert(code, value.into());
        self
    }

    pub fn insert(&mut self, code: u16, value: impl Into<TagValue>) -> Option<TagValue> {
        self.entries.insert(code, value.into())
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn get(&self, code: u16) -> Option<&TagValue> {
        self.entries.get(&code)
    }

    pub fn contains(&self, code: u16) -> bool {
        self.entries.contains_key(&code)
    }

    /// Tag codes in ascending order.
    pub fn codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries.keys().copied()
    }

    /// Entries in ascending tag order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &TagValue)> + '_ {
        self.entries.iter().map(|(code, value)| (*code, value))
    }

    pub fn remove(&mut self, code: u16) -> Option<TagValue> {
        self.entries.remove(&code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First element of a numeric tag as an unsigned integer.
    pub fn get_u64(&self, code: u16) -> Option<u64> {
        self.get_u64_array(code)?.first().copied()
    }

    pub fn get_u64_array(&self, code: u16) -> Option<Vec<u64>> {
        self.get(code)?.to_u64_vec()
    }

    fn get_u16(&self, code: u16) -> Option<u16> {
        self.get_u64(code).and_then(|v| u16::try_from(v).ok())
    }

    // -------------------------------------------------------------------------
    // Image structure
    // -------------------------------------------------------------------------

    pub fn width(&self) -> Option<u64> {
        self.get_u64(tag::IMAGE_WIDTH)
    }

    pub fn height(&self) -> Option<u64> {
        self.get_u64(tag::IMAGE_LENGTH)
    }

    /// Compression code, `None` when the tag is absent.
    pub fn compression(&self) -> Option<u16> {
        self.get_u16(tag::COMPRESSION)
    }

    pub fn samples_per_pixel(&self) -> u16 {
        self.get_u16(tag::SAMPLES_PER_PIXEL).unwrap_or(1)
    }

    /// Bits per sample, one entry per band (TIFF default: 1).
    pub fn bits_per_sample(&self) -> Vec<u16> {
        self.get_u64_array(tag::BITS_PER_SAMPLE)
            .map(|bits| bits.into_iter().map(|b| b as u16).collect())
            .unwrap_or_else(|| vec![1])
    }

    pub fn sample_format(&self) -> Vec<u16> {
        self.get_u64_array(tag::SAMPLE_FORMAT)
            .map(|formats| formats.into_iter().map(|f| f as u16).collect())
            .unwrap_or_else(|| vec![1])
    }

    pub fn planar_configuration(&self) -> u16 {
        self.get_u16(tag::PLANAR_CONFIGURATION).unwrap_or(1)
    }

    pub fn predictor(&self) -> u16 {
        self.get_u16(tag::PREDICTOR).unwrap_or(1)
    }

    pub fn is_tiled(&self) -> bool {
        !self.contains(tag::STRIP_OFFSETS) && self.contains(tag::TILE_OFFSETS)
    }

    /// Width and height of one strip or tile in pixels.
    pub fn chunk_dimensions(&self) -> Option<(u64, u64)> {
        if self.is_tiled() {
            Some((
                self.get_u64(tag::TILE_WIDTH)?,
                self.get_u64(tag::TILE_LENGTH)?,
            ))
        } else {
            let width = self.width()?;
            let height = self.height()?;
            let rows = self.get_u64(tag::ROWS_PER_STRIP).unwrap_or(height);
            Some((width, rows.min(height)))
        }
    }

    /// Offsets of every strip or tile.
    pub fn chunk_offsets(&self) -> Option<Vec<u64>> {
        if self.is_tiled() {
            self.get_u64_array(tag::TILE_OFFSETS)
        } else {
            self.get_u64_array(tag::STRIP_OFFSETS)
        }
    }

    /// Byte counts of every strip or tile.
    pub fn chunk_byte_counts(&self) -> Option<Vec<u64>> {
        if self.is_tiled() {
            self.get_u64_array(tag::TILE_BYTE_COUNTS)
        } else {
            self.get_u64_array(tag::STRIP_BYTE_COUNTS)
        }
    }

    pub fn jpeg_tables(&self) -> Option<&Bytes> {
        self.get(tag::JPEG_TABLES)?.as_bytes()
    }

    // -------------------------------------------------------------------------
    // GeoKeys
    // -------------------------------------------------------------------------

    /// Entries of the GeoKey directory, without the `[1,1,0,N]` header.
    pub fn geo_key_entries(&self) -> Option<Vec<GeoKeyEntry>> {
        let raw = self.get_u64_array(tag::GEO_KEY_DIRECTORY)?;
        if raw.len() < 4 {
            return None;
        }
        let declared = raw[3] as usize;
        let entries = raw[4..]
            .chunks_exact(4)
            .take(declared)
            .map(|quad| GeoKeyEntry {
                key_id: quad[0] as u16,
                location: quad[1] as u16,
                count: quad[2] as u16,
                value_offset: quad[3] as u16,
            })
            .collect();
        Some(entries)
    }

    /// Resolve one GeoKey to its value, following references into the
    /// ASCII and double parameter tags.
    pub fn geo_key(&self, key_id: u16) -> Option<TagValue> {
        let entry = self
            .geo_key_entries()?
            .into_iter()
            .find(|e| e.key_id == key_id)?;

        match entry.location {
            0 => Some(TagValue::Number(f64::from(entry.value_offset))),
            tag::GEO_ASCII_PARAMS => {
                let text = self.get(tag::GEO_ASCII_PARAMS)?.as_text()?;
                let start = entry.value_offset as usize;
                // Count includes the terminator
                let end = start + (entry.count as usize).saturating_sub(1);
                text.get(start..end).map(|s| TagValue::Text(s.to_string()))
            }
            tag::GEO_DOUBLE_PARAMS => {
                let doubles = self.get(tag::GEO_DOUBLE_PARAMS)?.to_numbers()?;
                let start = entry.value_offset as usize;
                let values = doubles.get(start..start + entry.count as usize)?.to_vec();
                match values.as_slice() {
                    [single] => Some(TagValue::Number(*single)),
                    _ => Some(TagValue::Numbers(values)),
                }
            }
            other => {
                let values = self.get(other)?.to_numbers()?;
                let start = entry.value_offset as usize;
                values
                    .get(start..start + entry.count as usize)
                    .map(|v| TagValue::Numbers(v.to_vec()))
            }
        }
    }
}
