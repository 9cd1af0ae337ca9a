//! Single-strip image encoding.

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::error::EncodeError;
use crate::format::tiff::{tag, Directory};

use super::ifd::IfdEncoder;
use super::pixels::{sample_format, Samples};

/// Writes a normalized directory followed by one uncompressed strip.
#[derive(Debug, Clone, Default)]
pub struct ImageEncoder {
    ifd: IfdEncoder,
}

impl ImageEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `directory` and the pixel-interleaved `samples` as one container.
    ///
    /// StripOffsets is set to the length of the encoded directory region; it
    /// is a single LONG stored inline, so that length does not depend on it.
    pub fn encode(&self, mut directory: Directory, samples: &Samples) -> Result<Bytes, EncodeError> {
        let bands = usize::from(directory.samples_per_pixel()).max(1);
        let planar = directory.planar_configuration();
        let format = directory
            .sample_format()
            .first()
            .copied()
            .unwrap_or(sample_format::UNSIGNED);
        let width = directory
            .bits_per_sample()
            .first()
            .map(|&bits| usize::from(bits / 8).max(1))
            .unwrap_or(1);

        let band_mismatch = || EncodeError::BandMismatch {
            samples: samples.len(),
            bands,
        };
        if samples.len() % bands != 0 {
            return Err(band_mismatch());
        }

        directory.insert(tag::STRIP_OFFSETS, vec![0u32]);
        let directory_len = self.ifd.encode(std::slice::from_ref(&directory))?.len();
        directory.insert(tag::STRIP_OFFSETS, vec![directory_len as u32]);
        let header = self.ifd.encode(std::slice::from_ref(&directory))?;

        let pixel_count = samples.len() / bands;
        let mut out = BytesMut::with_capacity(header.len() + samples.len() * width);
        out.put_slice(&header);

        let native = samples.element_width() == width && samples.sample_format() == format;
        let order: Box<dyn Iterator<Item = usize>> = if planar == 2 {
            Box::new((0..bands).flat_map(move |band| (0..pixel_count).map(move |p| p * bands + band)))
        } else {
            Box::new(0..samples.len())
        };

        for index in order {
            let written = if native {
                samples.put_native_be(index, &mut out)
            } else {
                samples
                    .value(index)
                    .map(|value| put_converted(&mut out, value, format, width))
                    .is_some()
            };
            if !written {
                return Err(band_mismatch());
            }
        }

        debug!(
            header_len = header.len(),
            total_len = out.len(),
            bands,
            planar,
            "Encoded image"
        );

        Ok(out.freeze())
    }
}

/// Write `value` as a big-endian sample of the given format and width.
fn put_converted(out: &mut BytesMut, value: f64, format: u16, width: usize) {
    match (format, width) {
        (sample_format::FLOAT, 8) => out.put_f64(value),
        (sample_format::FLOAT, _) => out.put_f32(value as f32),
        (sample_format::SIGNED, 1) => out.put_i8(value as i8),
        (sample_format::SIGNED, 2) => out.put_i16(value as i16),
        (sample_format::SIGNED, 8) => out.put_i64(value as i64),
        (sample_format::SIGNED, _) => out.put_i32(value as i32),
        (_, 1) => out.put_u8(value as u8),
        (_, 2) => out.put_u16(value as u16),
        (_, 8) => out.put_u64(value as u64),
        _ => out.put_u32(value as u32),
    }
}
