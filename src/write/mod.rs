//! GeoTIFF writer.
//!
//! The pipeline is normalize, then encode:
//!
//! 1. [`MetadataNormalizer`] fills omitted tags from the pixel data, folds
//!    GeoKeys into the GeoKey directory and resolves names to codes.
//! 2. [`ImageEncoder`] serializes the directory with [`IfdEncoder`] and
//!    appends the samples as a single uncompressed big-endian strip.
//!
//! [`encode_container`] runs both steps.

mod geokeys;
mod ifd;
mod normalize;
mod pixels;
mod raster;

pub use geokeys::{build_geo_key_block, GeoKeyBlock};
pub use ifd::{IfdEncoder, ENTRY_SIZE, INLINE_LIMIT};
pub use normalize::{MetadataMap, MetadataNormalizer};
pub use pixels::{sample_format, PixelData, Sample, Samples};
pub use raster::ImageEncoder;

use bytes::Bytes;

use crate::error::WriteError;

/// Normalize `metadata` for `pixels` and encode both into container bytes.
///
/// # Example
///
/// ```
/// use geotiff_codec::write::{encode_container, MetadataMap, PixelData};
///
/// let pixels = PixelData::flat(vec![0u8, 64, 128, 255]);
/// let metadata = MetadataMap::new().with("width", 2u16).with("height", 2u16);
/// let bytes = encode_container(&pixels, metadata).unwrap();
/// assert_eq!(&bytes[0..2], b"MM");
/// ```
pub fn encode_container(pixels: &PixelData, metadata: MetadataMap) -> Result<Bytes, WriteError> {
    let directory = MetadataNormalizer::new().normalize(pixels, metadata)?;
    Ok(ImageEncoder::new().encode(directory, pixels.samples())?)
}
