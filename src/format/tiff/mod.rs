//! TIFF container structures.
//!
//! # Key Concepts
//!
//! - **Byte order**: containers declare their endianness (II = little-endian,
//!   MM = big-endian) in the header. The writer always emits big-endian.
//!
//! - **Classic TIFF vs BigTIFF**: classic TIFF uses 32-bit offsets, BigTIFF
//!   64-bit ones. The reader handles both; the writer produces classic TIFF.
//!
//! - **IFD (Image File Directory)**: a list of 12-byte entries describing one
//!   image. Values of at most four bytes are stored inline in the entry,
//!   larger ones in an external region addressed by offset.
//!
//! - **GeoKeys**: georeferencing parameters packed into the GeoKeyDirectory
//!   tag, with text and double values referenced from companion tags.

pub mod catalog;
mod directory;
mod parser;
mod reader;
mod tags;
mod value;

pub use catalog::{geo_key, tag, TagCatalog, TagInfo, GEO_KEY_SUFFIX};
pub use directory::{Directory, GeoKeyEntry};
pub use parser::{
    ByteOrder, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE, VERSION_BIGTIFF, VERSION_TIFF,
};
pub use reader::ContainerReader;
pub use tags::{Compression, FieldType};
pub use value::TagValue;
