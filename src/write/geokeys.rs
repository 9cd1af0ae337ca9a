//! GeoKey directory assembly.
//!
//! ```text
//! [1, 1, 0, N, KeyID, TagLocation, Count, ValueOffset, ...]
//! ```
//!
//! SHORT keys are stored inline (location 0). ASCII keys are appended to the
//! GeoAsciiParams blob as NUL-terminated segments; their count includes the
//! terminator and the offset is the segment start. DOUBLE keys are appended
//! to GeoDoubleParams.

use std::collections::BTreeMap;

use crate::error::EncodeError;
use crate::format::tiff::{tag, FieldType, TagCatalog, TagValue};

/// KeyDirectoryVersion, KeyRevision, MinorRevision.
const DIRECTORY_HEADER: [u16; 3] = [1, 1, 0];

/// Packed GeoKey directory plus the parameter tags it references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoKeyBlock {
    /// Contents of the GeoKeyDirectory tag.
    pub directory: Vec<u16>,

    /// Contents of GeoAsciiParams, when any ASCII key is present.
    pub ascii_params: Option<String>,

    /// Contents of GeoDoubleParams, when any DOUBLE key is present.
    pub double_params: Option<Vec<f64>>,
}

impl GeoKeyBlock {
    /// Number of keys in the directory.
    pub fn key_count(&self) -> usize {
        self.directory.get(3).copied().unwrap_or(0) as usize
    }
}

/// Build the GeoKey block from keys indexed by numeric KeyID.
///
/// Keys come out in ascending KeyID order because the map is ordered.
pub fn build_geo_key_block(keys: &BTreeMap<u16, TagValue>) -> Result<GeoKeyBlock, EncodeError> {
    let catalog = TagCatalog::global();

    let count = u16::try_from(keys.len()).map_err(|_| EncodeError::OutOfRange {
        tag: tag::GEO_KEY_DIRECTORY,
        field_type: FieldType::Short.name(),
        value: keys.len() as f64,
    })?;

    let mut directory = Vec::with_capacity(4 + keys.len() * 4);
    directory.extend_from_slice(&DIRECTORY_HEADER);
    directory.push(count);

    let mut ascii = String::new();
    let mut doubles: Vec<f64> = Vec::new();

    for (&key_id, value) in keys {
        let field_type = catalog
            .geo_key_by_code(key_id)
            .map(|info| info.field_type)
            .ok_or(EncodeError::UnknownTagType(key_id))?;

        let mismatch = || EncodeError::TypeMismatch {
            tag: key_id,
            expected: field_type.name(),
        };

        let (location, count, offset) = match field_type {
            FieldType::Short => {
                let number = match value.to_numbers().as_deref() {
                    Some([single]) => *single,
                    Some([]) => return Err(EncodeError::MissingValue(key_id)),
                    _ => return Err(mismatch()),
                };
                (0, 1, short(key_id, number)?)
            }
            FieldType::Ascii => {
                let text = value.as_text().ok_or_else(mismatch)?;
                let offset = short(tag::GEO_ASCII_PARAMS, ascii.len() as f64)?;
                let count = short(tag::GEO_ASCII_PARAMS, (text.len() + 1) as f64)?;
                ascii.push_str(text);
                ascii.push('\0');
                (tag::GEO_ASCII_PARAMS, count, offset)
            }
            FieldType::Double => {
                let values = value.to_numbers().ok_or_else(mismatch)?;
                if values.is_empty() {
                    return Err(EncodeError::MissingValue(key_id));
                }
                let offset = short(tag::GEO_DOUBLE_PARAMS, doubles.len() as f64)?;
                let count = short(tag::GEO_DOUBLE_PARAMS, values.len() as f64)?;
                doubles.extend(values);
                (tag::GEO_DOUBLE_PARAMS, count, offset)
            }
            _ => return Err(mismatch()),
        };
        directory.extend_from_slice(&[key_id, location, count, offset]);
    }

    Ok(GeoKeyBlock {
        directory,
        ascii_params: (!ascii.is_empty()).then_some(ascii),
        double_params: (!doubles.is_empty()).then_some(doubles),
    })
}

fn short(tag: u16, value: f64) -> Result<u16, EncodeError> {
    if value.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(&value) {
        Ok(value as u16)
    } else {
        Err(EncodeError::OutOfRange {
            tag,
            field_type: FieldType::Short.name(),
            value,
        })
    }
}
