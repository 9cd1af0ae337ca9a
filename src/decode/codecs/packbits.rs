//! PackBits run-length chunks (compression 32773).

use bytes::Bytes;

use crate::decode::registry::Decoder;
use crate::error::CodecError;
use crate::format::tiff::Directory;

#[derive(Debug, Clone, Copy, Default)]
pub struct PackBitsDecoder;

impl Decoder for PackBitsDecoder {
    fn decode(&self, _directory: &Directory, buffer: Bytes) -> Result<Bytes, CodecError> {
        unpack_bits(&buffer).map(Bytes::from)
    }
}

/// Expand a PackBits stream.
///
/// Header `n` in 0..=127 copies the next `n + 1` bytes, -127..=-1 repeats
/// the next byte `1 - n` times, and -128 is a no-op.
pub fn unpack_bits(input: &[u8]) -> Result<Vec<u8>, CodecError> {
    let truncated = |at: usize| CodecError::Corrupt {
        codec: "PackBits",
        message: format!("stream truncated at byte {at}"),
    };

    let mut out = Vec::with_capacity(input.len() * 2);
    let mut pos = 0;

    while pos < input.len() {
        let header = input[pos] as i8;
        pos += 1;

        match header {
            -128 => {}
            0..=127 => {
                let len = header as usize + 1;
                let literal = input.get(pos..pos + len).ok_or_else(|| truncated(pos))?;
                out.extend_from_slice(literal);
                pos += len;
            }
            _ => {
                let value = *input.get(pos).ok_or_else(|| truncated(pos))?;
                let run = (1 - header as isize) as usize;
                out.resize(out.len() + run, value);
                pos += 1;
            }
        }
    }

    Ok(out)
}
