//! JPEG chunks (compression 7).
//!
//! Tiled and stripped JPEG containers often use abbreviated streams: each
//! chunk lacks the quantization (DQT) and Huffman (DHT) tables, which are
//! stored once in the JPEGTables tag. Before decoding, the tables are
//! spliced in: strip EOI from the tables, strip SOI from the chunk and
//! concatenate.

use bytes::{Bytes, BytesMut};

use crate::decode::registry::Decoder;
use crate::error::CodecError;
use crate::format::tiff::Directory;

/// Start Of Image marker
const SOI: [u8; 2] = [0xFF, 0xD8];

/// End Of Image marker
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Define Huffman Table marker
const DHT: [u8; 2] = [0xFF, 0xC4];

/// Define Quantization Table marker
const DQT: [u8; 2] = [0xFF, 0xDB];

/// Start Of Scan marker
const SOS: [u8; 2] = [0xFF, 0xDA];

/// Decodes JPEG chunks to 8-bit samples, merging JPEGTables when needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegDecoder;

impl Decoder for JpegDecoder {
    fn decode(&self, directory: &Directory, buffer: Bytes) -> Result<Bytes, CodecError> {
        let stream = match directory.jpeg_tables() {
            Some(tables) if is_abbreviated_stream(&buffer) => merge_jpeg_tables(tables, &buffer),
            _ => buffer,
        };

        let img = image::load_from_memory_with_format(&stream, image::ImageFormat::Jpeg)
            .map_err(|e| CodecError::Corrupt {
                codec: "JPEG",
                message: e.to_string(),
            })?;
        Ok(Bytes::from(img.into_bytes()))
    }
}

/// Check if JPEG data is an abbreviated stream (missing tables).
///
/// An abbreviated stream starts with SOI but reaches SOS without any DQT or
/// DHT marker in between.
pub fn is_abbreviated_stream(data: &[u8]) -> bool {
    if data.len() < 4 || data[0..2] != SOI {
        return false;
    }

    let mut pos = 2;
    while pos + 1 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }

        let marker = [data[pos], data[pos + 1]];
        if marker == DQT || marker == DHT {
            return false;
        }
        if marker == SOS {
            return true;
        }

        // Skip marker segment (marker + 2-byte length + payload)
        if pos + 3 < data.len() && marker[1] != 0x00 && marker[1] != 0xD8 && marker[1] != 0xD9 {
            let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
            pos += 2 + length;
        } else {
            pos += 2;
        }
    }

    false
}

/// Splice JPEGTables into an abbreviated chunk.
///
/// The result is SOI + tables + scan data + EOI.
pub fn merge_jpeg_tables(tables: &[u8], chunk: &[u8]) -> Bytes {
    if tables.is_empty() {
        return Bytes::copy_from_slice(chunk);
    }
    if chunk.is_empty() {
        return Bytes::new();
    }

    let tables_end = if tables.len() >= 2 && tables[tables.len() - 2..] == EOI {
        tables.len() - 2
    } else {
        tables.len()
    };
    let chunk_start = if chunk.len() >= 2 && chunk[0..2] == SOI { 2 } else { 0 };

    let mut result = BytesMut::with_capacity(tables_end + chunk.len() - chunk_start);
    result.extend_from_slice(&tables[..tables_end]);
    result.extend_from_slice(&chunk[chunk_start..]);
    result.freeze()
}
