//! Directory chain reading.
//!
//! Values can be stored either inline in the IFD entry (for small values)
//! or at an offset in the container (for larger values like arrays). Each
//! IFD is fetched with two range requests (entry count, then the entry table
//! plus the next-IFD offset) and each external value with one more.

use std::collections::HashSet;

use bytes::Bytes;
use tracing::debug;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::directory::Directory;
use super::parser::{ByteOrder, TiffHeader, BIGTIFF_HEADER_SIZE};
use super::tags::FieldType;
use super::value::TagValue;

/// Upper bound on directories followed in one chain.
const MAX_DIRECTORIES: usize = 4096;

// =============================================================================
// ContainerReader
// =============================================================================

/// Parsed header and directory chain of a container.
///
/// The reader does not keep the byte source; pass it again to
/// [`ContainerReader::read_chunk`] to fetch strip or tile payloads.
#[derive(Debug, Clone)]
pub struct ContainerReader {
    header: TiffHeader,
    directories: Vec<Directory>,
}

impl ContainerReader {
    /// Parse the header and every directory in the chain.
    pub async fn open<R: RangeReader>(reader: &R) -> Result<Self, TiffError> {
        let size = reader.size();
        let header_len = (BIGTIFF_HEADER_SIZE as u64).min(size) as usize;
        let header_bytes = reader.read_exact_at(0, header_len).await?;
        let header = TiffHeader::parse(&header_bytes, size)?;

        let mut directories = Vec::new();
        let mut visited = HashSet::new();
        let mut offset = header.first_ifd_offset;

        while offset != 0 {
            if !visited.insert(offset) || directories.len() >= MAX_DIRECTORIES {
                return Err(TiffError::InvalidIfdOffset(offset));
            }
            let (directory, next) = read_directory(reader, &header, offset).await?;
            directories.push(directory);
            offset = next;
        }

        debug!(
            source = reader.identifier(),
            directories = directories.len(),
            bigtiff = header.is_bigtiff,
            "Parsed container"
        );

        Ok(Self {
            header,
            directories,
        })
    }

    pub fn header(&self) -> &TiffHeader {
        &self.header
    }

    pub fn directories(&self) -> &[Directory] {
        &self.directories
    }

    pub fn directory(&self, index: usize) -> Option<&Directory> {
        self.directories.get(index)
    }

    /// Fetch the raw (still compressed) bytes of one strip or tile.
    pub async fn read_chunk<R: RangeReader>(
        &self,
        reader: &R,
        directory: usize,
        chunk: usize,
    ) -> Result<Bytes, TiffError> {
        let dir = self
            .directories
            .get(directory)
            .ok_or_else(|| TiffError::InvalidTagValue {
                tag: "directory",
                message: format!(
                    "index {} out of range ({} directories)",
                    directory,
                    self.directories.len()
                ),
            })?;

        let offsets = dir
            .chunk_offsets()
            .ok_or(TiffError::MissingTag("StripOffsets/TileOffsets"))?;
        let counts = dir
            .chunk_byte_counts()
            .ok_or(TiffError::MissingTag("StripByteCounts/TileByteCounts"))?;

        match (offsets.get(chunk), counts.get(chunk)) {
            (Some(&offset), Some(&count)) => Ok(reader.read_exact_at(offset, count as usize).await?),
            _ => Err(TiffError::InvalidTagValue {
                tag: "StripOffsets/TileOffsets",
                message: format!("chunk {} out of range ({} chunks)", chunk, offsets.len()),
            }),
        }
    }
}

/// Read one IFD at `offset`, returning it with the offset of the next one.
async fn read_directory<R: RangeReader>(
    reader: &R,
    header: &TiffHeader,
    offset: u64,
) -> Result<(Directory, u64), TiffError> {
    let byte_order = header.byte_order;
    let count_size = header.ifd_count_size();
    let entry_size = header.ifd_entry_size();
    let value_size = header.value_offset_size();

    let count_bytes = reader.read_exact_at(offset, count_size).await?;
    let entry_count = header.read_offset_or_count(&count_bytes);

    let entries_len = usize::try_from(entry_count)
        .ok()
        .and_then(|n| n.checked_mul(entry_size))
        .filter(|&len| (len as u64) <= reader.size().saturating_sub(offset))
        .ok_or_else(|| TiffError::InvalidTagValue {
            tag: "entry count",
            message: format!("{} entries at offset {} exceed the container", entry_count, offset),
        })?;
    let table_len = entries_len + header.ifd_next_offset_size();
    let table = reader
        .read_exact_at(offset + count_size as u64, table_len)
        .await?;

    let mut directory = Directory::new(byte_order);

    for raw in table[..entries_len].chunks_exact(entry_size) {
        let tag = byte_order.read_u16(&raw[0..2]);
        let type_code = byte_order.read_u16(&raw[2..4]);
        let count = header.read_offset(&raw[4..4 + value_size]);
        let value_field = &raw[4 + value_size..4 + 2 * value_size];

        let Some(field_type) = FieldType::from_u16(type_code) else {
            debug!(tag, type_code, "Skipping entry with unknown field type");
            continue;
        };

        let byte_len = count
            .checked_mul(field_type.size_in_bytes() as u64)
            .ok_or(TiffError::InvalidTagValue {
                tag: "entry",
                message: format!("tag {} count {} overflows", tag, count),
            })?;

        let bytes = if field_type.fits_inline(count, header.is_bigtiff) {
            Bytes::copy_from_slice(&value_field[..byte_len as usize])
        } else {
            let value_offset = header.read_offset(value_field);
            reader.read_exact_at(value_offset, byte_len as usize).await?
        };

        directory.insert(tag, decode_value(field_type, &bytes, byte_order));
    }

    let next_field = &table[entries_len..];
    let next = header.read_offset(next_field);

    Ok((directory, next))
}

/// Decode raw entry bytes into a [`TagValue`].
pub(crate) fn decode_value(field_type: FieldType, bytes: &Bytes, byte_order: ByteOrder) -> TagValue {
    let width = field_type.size_in_bytes();
    let elements = bytes.chunks_exact(width);

    match field_type {
        FieldType::Ascii => TagValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        FieldType::Byte | FieldType::Undefined => TagValue::Bytes(bytes.clone()),
        FieldType::SByte => TagValue::Numbers(elements.map(|b| f64::from(b[0] as i8)).collect()),
        FieldType::Short => {
            TagValue::Numbers(elements.map(|b| f64::from(byte_order.read_u16(b))).collect())
        }
        FieldType::SShort => TagValue::Numbers(
            elements
                .map(|b| f64::from(byte_order.read_u16(b) as i16))
                .collect(),
        ),
        FieldType::Long => {
            TagValue::Numbers(elements.map(|b| f64::from(byte_order.read_u32(b))).collect())
        }
        FieldType::SLong => TagValue::Numbers(
            elements
                .map(|b| f64::from(byte_order.read_u32(b) as i32))
                .collect(),
        ),
        FieldType::Rational => TagValue::Numbers(
            elements
                .map(|b| {
                    f64::from(byte_order.read_u32(&b[0..4]))
                        / f64::from(byte_order.read_u32(&b[4..8]))
                })
                .collect(),
        ),
        FieldType::SRational => TagValue::Numbers(
            elements
                .map(|b| {
                    f64::from(byte_order.read_u32(&b[0..4]) as i32)
                        / f64::from(byte_order.read_u32(&b[4..8]) as i32)
                })
                .collect(),
        ),
        FieldType::Float => {
            TagValue::Numbers(elements.map(|b| f64::from(byte_order.read_f32(b))).collect())
        }
        FieldType::Double => TagValue::Numbers(elements.map(|b| byte_order.read_f64(b)).collect()),
        FieldType::Long8 => {
            TagValue::Numbers(elements.map(|b| byte_order.read_u64(b) as f64).collect())
        }
    }
}

impl TiffHeader {
    /// Read the IFD entry count field (2 bytes classic, 8 bytes BigTIFF).
    #[inline]
    fn read_offset_or_count(&self, bytes: &[u8]) -> u64 {
        if self.is_bigtiff {
            self.byte_order.read_u64(bytes)
        } else {
            self.byte_order.read_u16(bytes) as u64
        }
    }
}
