//! Directory serialization.
//!
//! Produces a big-endian classic TIFF: an 8-byte header followed by one
//! block per directory. Each block is the entry count, the 12-byte entry
//! records in ascending tag order, the next-directory offset, and then the
//! external region holding every value longer than four bytes. External
//! values are padded to even length, so every block (and therefore every
//! directory offset) stays word aligned.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::EncodeError;
use crate::format::tiff::{Directory, FieldType, TagCatalog, TagValue, TiffHeader, TIFF_HEADER_SIZE};

/// Size of one classic IFD entry record.
pub const ENTRY_SIZE: usize = 12;

/// Largest value stored inside an entry record.
pub const INLINE_LIMIT: usize = 4;

/// Scale used when writing RATIONAL values.
const RATIONAL_DENOMINATOR: u32 = 10_000;

/// Serializes logical directories into container bytes.
#[derive(Debug, Clone, Copy)]
pub struct IfdEncoder {
    catalog: &'static TagCatalog,
}

impl Default for IfdEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// One entry after its value has been converted to wire bytes.
struct EncodedEntry {
    tag: u16,
    field_type: FieldType,
    count: u32,
    payload: Vec<u8>,
}

impl IfdEncoder {
    pub fn new() -> Self {
        Self {
            catalog: TagCatalog::global(),
        }
    }

    /// Encode `directories` as a chain, first directory at offset 8.
    ///
    /// Fails without producing output when any tag has no registered wire
    /// type, carries no value, or holds a value its type cannot represent.
    pub fn encode(&self, directories: &[Directory]) -> Result<Bytes, EncodeError> {
        let mut encoded = Vec::with_capacity(directories.len());
        for directory in directories {
            let entries = directory
                .iter()
                .map(|(tag, value)| self.encode_entry(tag, value))
                .collect::<Result<Vec<_>, _>>()?;
            let count = entry_count(entries.len())?;
            encoded.push((count, entries));
        }

        let total = TIFF_HEADER_SIZE as u64
            + encoded.iter().map(|(_, e)| block_len(e) as u64).sum::<u64>();
        if total > u64::from(u32::MAX) {
            return Err(EncodeError::TooLarge(total));
        }

        let header = TiffHeader::classic_big_endian();
        let mut out = BytesMut::with_capacity(total as usize);
        if let Some(bytes) = header.to_classic_bytes() {
            out.put_slice(&bytes);
        }

        let count = encoded.len();
        for (index, (table_count, entries)) in encoded.iter().enumerate() {
            let start = out.len();
            let next = if index + 1 < count {
                (start + block_len(entries)) as u32
            } else {
                0
            };
            write_block(&mut out, *table_count, entries, next);
        }

        trace!(
            directories = count,
            bytes = out.len(),
            "Encoded directory chain"
        );

        Ok(out.freeze())
    }

    fn encode_entry(&self, tag: u16, value: &TagValue) -> Result<EncodedEntry, EncodeError> {
        let field_type = self
            .catalog
            .field_type(tag)
            .ok_or(EncodeError::UnknownTagType(tag))?;

        if value.is_empty() {
            return Err(EncodeError::MissingValue(tag));
        }

        let (count, payload) = encode_value(tag, field_type, value)?;
        Ok(EncodedEntry {
            tag,
            field_type,
            count,
            payload,
        })
    }
}

/// Bytes one directory block occupies: table plus padded external values.
fn block_len(entries: &[EncodedEntry]) -> usize {
    table_len(entries.len())
        + entries
            .iter()
            .filter(|e| e.payload.len() > INLINE_LIMIT)
            .map(|e| padded(e.payload.len()))
            .sum::<usize>()
}

/// Entry count as written in the 16-bit table header.
fn entry_count(len: usize) -> Result<u16, EncodeError> {
    u16::try_from(len).map_err(|_| EncodeError::TooManyEntries(len))
}

fn table_len(entries: usize) -> usize {
    2 + entries * ENTRY_SIZE + 4
}

#[inline]
fn padded(len: usize) -> usize {
    len + (len & 1)
}

fn write_block(out: &mut BytesMut, count: u16, entries: &[EncodedEntry], next: u32) {
    let start = out.len();
    let mut external_cursor = start + table_len(entries.len());
    let mut external = BytesMut::new();

    out.put_u16(count);
    for entry in entries {
        out.put_u16(entry.tag);
        out.put_u16(entry.field_type.as_u16());
        out.put_u32(entry.count);

        if entry.payload.len() <= INLINE_LIMIT {
            let mut field = [0u8; INLINE_LIMIT];
            field[..entry.payload.len()].copy_from_slice(&entry.payload);
            out.put_slice(&field);
        } else {
            out.put_u32(external_cursor as u32);
            external.put_slice(&entry.payload);
            if entry.payload.len() % 2 == 1 {
                external.put_u8(0);
            }
            external_cursor += padded(entry.payload.len());
        }
    }
    out.put_u32(next);
    out.put_slice(&external);
}

// =============================================================================
// Value encoding
// =============================================================================

/// Convert a value to its wire count and big-endian bytes.
pub(crate) fn encode_value(
    tag: u16,
    field_type: FieldType,
    value: &TagValue,
) -> Result<(u32, Vec<u8>), EncodeError> {
    let mismatch = || EncodeError::TypeMismatch {
        tag,
        expected: field_type.name(),
    };

    let payload = match field_type {
        FieldType::Ascii => {
            let text = match value {
                TagValue::Text(text) if text.is_ascii() => text,
                _ => return Err(mismatch()),
            };
            let mut bytes = text.as_bytes().to_vec();
            if bytes.last() != Some(&0) {
                bytes.push(0);
            }
            let count = bytes.len() as u32;
            return Ok((count, bytes));
        }
        FieldType::Byte | FieldType::Undefined => match value {
            TagValue::Bytes(bytes) => bytes.to_vec(),
            TagValue::Text(_) => return Err(mismatch()),
            _ => value
                .to_numbers()
                .ok_or_else(mismatch)?
                .into_iter()
                .map(|v| integer::<u8>(tag, field_type, v))
                .collect::<Result<Vec<_>, _>>()?,
        },
        _ => {
            let values = value.to_numbers().ok_or_else(mismatch)?;
            let mut out = Vec::with_capacity(values.len() * field_type.size_in_bytes());
            for v in values {
                put_number(&mut out, tag, field_type, v)?;
            }
            out
        }
    };

    let count = (payload.len() / field_type.size_in_bytes()) as u32;
    Ok((count, payload))
}

fn put_number(out: &mut Vec<u8>, tag: u16, field_type: FieldType, v: f64) -> Result<(), EncodeError> {
    match field_type {
        FieldType::SByte => out.put_i8(integer::<i8>(tag, field_type, v)?),
        FieldType::Short => out.put_u16(integer::<u16>(tag, field_type, v)?),
        FieldType::SShort => out.put_i16(integer::<i16>(tag, field_type, v)?),
        FieldType::Long => out.put_u32(integer::<u32>(tag, field_type, v)?),
        FieldType::SLong => out.put_i32(integer::<i32>(tag, field_type, v)?),
        FieldType::Long8 => out.put_u64(integer::<u64>(tag, field_type, v)?),
        FieldType::Rational => {
            let numerator = integer::<u32>(tag, field_type, (v * f64::from(RATIONAL_DENOMINATOR)).round())?;
            out.put_u32(numerator);
            out.put_u32(RATIONAL_DENOMINATOR);
        }
        FieldType::SRational => {
            let numerator = integer::<i32>(tag, field_type, (v * f64::from(RATIONAL_DENOMINATOR)).round())?;
            out.put_i32(numerator);
            out.put_i32(RATIONAL_DENOMINATOR as i32);
        }
        FieldType::Float => out.put_f32(v as f32),
        FieldType::Double => out.put_f64(v),
        FieldType::Byte | FieldType::Undefined => out.put_u8(integer::<u8>(tag, field_type, v)?),
        FieldType::Ascii => {
            return Err(EncodeError::TypeMismatch {
                tag,
                expected: field_type.name(),
            })
        }
    }
    Ok(())
}

/// Checked conversion of a whole number into an integer wire type.
fn integer<T>(tag: u16, field_type: FieldType, v: f64) -> Result<T, EncodeError>
where
    T: TryFrom<i128>,
{
    let out_of_range = || EncodeError::OutOfRange {
        tag,
        field_type: field_type.name(),
        value: v,
    };
    if !v.is_finite() || v.fract() != 0.0 {
        return Err(out_of_range());
    }
    T::try_from(v as i128).map_err(|_| out_of_range())
}
