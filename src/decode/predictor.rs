//! Predictor reversal, applied to every codec's output.
//!
//! - 1: none
//! - 2: horizontal differencing on 8, 16 or 32-bit samples, in the
//!   container's byte order
//! - 3: floating point; byte planes are de-differenced and reassembled,
//!   producing little-endian samples

use bytes::Bytes;

use crate::error::CodecError;
use crate::format::tiff::{ByteOrder, Directory};

const CODEC: &str = "predictor";

pub fn apply_predictor(directory: &Directory, data: Bytes) -> Result<Bytes, CodecError> {
    let predictor = directory.predictor();
    if predictor == 1 {
        return Ok(data);
    }

    let (width, _) = directory.chunk_dimensions().ok_or_else(|| CodecError::Unsupported {
        codec: CODEC,
        message: "chunk width is unknown".to_string(),
    })?;
    let samples = if directory.planar_configuration() == 2 {
        1
    } else {
        usize::from(directory.samples_per_pixel()).max(1)
    };
    let bits = directory.bits_per_sample().first().copied().unwrap_or(8);
    let bytes_per_sample = usize::from(bits / 8).max(1);
    let row_len = width as usize * samples * bytes_per_sample;
    if row_len == 0 {
        return Ok(data);
    }

    let mut buffer = data.to_vec();
    match predictor {
        2 => {
            for row in buffer.chunks_mut(row_len) {
                undo_horizontal(row, samples, bits, directory.byte_order())?;
            }
        }
        3 => {
            for row in buffer.chunks_exact_mut(row_len) {
                undo_floating_point(row, samples, bytes_per_sample);
            }
        }
        other => {
            return Err(CodecError::Unsupported {
                codec: CODEC,
                message: format!("unknown predictor {other}"),
            })
        }
    }
    Ok(Bytes::from(buffer))
}

fn undo_horizontal(
    row: &mut [u8],
    samples: usize,
    bits: u16,
    byte_order: ByteOrder,
) -> Result<(), CodecError> {
    match bits {
        8 => {
            for i in samples..row.len() {
                row[i] = row[i].wrapping_add(row[i - samples]);
            }
        }
        16 => {
            let stride = samples * 2;
            for i in (stride..row.len().saturating_sub(1)).step_by(2) {
                let prev = byte_order.read_u16(&row[i - stride..]);
                let cur = byte_order.read_u16(&row[i..]);
                let sum = cur.wrapping_add(prev);
                let bytes = match byte_order {
                    ByteOrder::BigEndian => sum.to_be_bytes(),
                    ByteOrder::LittleEndian => sum.to_le_bytes(),
                };
                row[i..i + 2].copy_from_slice(&bytes);
            }
        }
        32 => {
            let stride = samples * 4;
            for i in (stride..row.len().saturating_sub(3)).step_by(4) {
                let prev = byte_order.read_u32(&row[i - stride..]);
                let cur = byte_order.read_u32(&row[i..]);
                let sum = cur.wrapping_add(prev);
                let bytes = match byte_order {
                    ByteOrder::BigEndian => sum.to_be_bytes(),
                    ByteOrder::LittleEndian => sum.to_le_bytes(),
                };
                row[i..i + 4].copy_from_slice(&bytes);
            }
        }
        other => {
            return Err(CodecError::Unsupported {
                codec: CODEC,
                message: format!("horizontal predictor on {other}-bit samples"),
            })
        }
    }
    Ok(())
}

fn undo_floating_point(row: &mut [u8], samples: usize, bytes_per_sample: usize) {
    for i in samples..row.len() {
        row[i] = row[i].wrapping_add(row[i - samples]);
    }

    // Planes are stored most significant byte first
    let count = row.len() / bytes_per_sample;
    let planes = row.to_vec();
    for i in 0..count {
        for b in 0..bytes_per_sample {
            row[i * bytes_per_sample + (bytes_per_sample - 1 - b)] = planes[b * count + i];
        }
    }
}
