//! Built-in decode capabilities.
//!
//! | Code     | Codec                      | Worker  |
//! |----------|----------------------------|---------|
//! | 1        | none                       | no      |
//! | 5        | LZW                        | yes     |
//! | 6        | old-style JPEG             | refused |
//! | 7        | JPEG                       | yes     |
//! | 8, 32946 | Deflate                    | yes     |
//! | 32773    | PackBits                   | yes     |
//! | 50001    | web image (PNG/WebP/JPEG)  | no      |

mod jpeg;
mod packbits;

use std::io::Read;

use bytes::Bytes;

use crate::error::{CodecError, DecodeError};
use crate::format::tiff::{Compression, Directory};

use super::registry::{Decoder, DecoderRegistry};

pub use jpeg::{is_abbreviated_stream, merge_jpeg_tables, JpegDecoder};
pub use packbits::{unpack_bits, PackBitsDecoder};

/// Uncompressed chunks pass through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl Decoder for RawDecoder {
    fn decode(&self, _directory: &Directory, buffer: Bytes) -> Result<Bytes, CodecError> {
        Ok(buffer)
    }
}

/// TIFF-flavoured LZW (MSB first, early code-size switch).
#[derive(Debug, Clone, Copy, Default)]
pub struct LzwDecoder;

impl Decoder for LzwDecoder {
    fn decode(&self, _directory: &Directory, buffer: Bytes) -> Result<Bytes, CodecError> {
        let mut decoder = weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8);
        decoder
            .decode(&buffer)
            .map(Bytes::from)
            .map_err(|e| CodecError::Corrupt {
                codec: "LZW",
                message: e.to_string(),
            })
    }
}

/// zlib-wrapped Deflate (codes 8 and 32946).
#[derive(Debug, Clone, Copy, Default)]
pub struct DeflateDecoder;

impl Decoder for DeflateDecoder {
    fn decode(&self, _directory: &Directory, buffer: Bytes) -> Result<Bytes, CodecError> {
        let mut out = Vec::with_capacity(buffer.len() * 4);
        flate2::read::ZlibDecoder::new(&buffer[..])
            .read_to_end(&mut out)
            .map_err(|e| CodecError::Corrupt {
                codec: "Deflate",
                message: e.to_string(),
            })?;
        Ok(Bytes::from(out))
    }
}

/// Self-describing image payloads (code 50001), decoded to 8-bit samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebImageDecoder;

impl Decoder for WebImageDecoder {
    fn decode(&self, _directory: &Directory, buffer: Bytes) -> Result<Bytes, CodecError> {
        let img = image::load_from_memory(&buffer).map_err(|e| CodecError::Corrupt {
            codec: "web image",
            message: e.to_string(),
        })?;
        let raw = if img.color().has_alpha() {
            img.to_rgba8().into_raw()
        } else {
            img.to_rgb8().into_raw()
        };
        Ok(Bytes::from(raw))
    }
}

fn boxed<D: Decoder + Default + 'static>(_: &Directory) -> Result<Box<dyn Decoder>, DecodeError> {
    Ok(Box::new(D::default()))
}

/// Register every built-in codec in `registry`.
pub(crate) fn register_defaults(registry: &DecoderRegistry) {
    registry.register([Compression::None.as_u16()], boxed::<RawDecoder>, false);
    registry.register([Compression::Lzw.as_u16()], boxed::<LzwDecoder>, true);
    registry.register(
        [Compression::OldJpeg.as_u16()],
        |_: &Directory| -> Result<Box<dyn Decoder>, DecodeError> {
            Err(DecodeError::UnsupportedCompression {
                code: Some(Compression::OldJpeg.as_u16()),
                reason: "old-style JPEG is not supported".to_string(),
            })
        },
        true,
    );
    registry.register([Compression::Jpeg.as_u16()], boxed::<JpegDecoder>, true);
    registry.register(
        [Compression::AdobeDeflate.as_u16(), Compression::Deflate.as_u16()],
        boxed::<DeflateDecoder>,
        true,
    );
    registry.register([Compression::PackBits.as_u16()], boxed::<PackBitsDecoder>, true);
    registry.register([Compression::WebImage.as_u16()], boxed::<WebImageDecoder>, false);
}
