//! # geotiff-codec
//!
//! Writes GeoTIFF containers and decodes their compressed chunks on a pool
//! of workers.
//!
//! ## Features
//!
//! - **Container writer**: turns pixel samples and name-keyed metadata into a
//!   big-endian classic TIFF with a GeoKey directory, filling every required
//!   tag the caller leaves out
//! - **Container reader**: parses classic TIFF and BigTIFF directories in
//!   either byte order from any range-readable source
//! - **Pluggable decoders**: compression codes map to decoder factories in a
//!   runtime registry with built-in raw, LZW, Deflate, PackBits and JPEG
//! - **Worker pool**: decode jobs are multiplexed over a bounded set of
//!   worker threads, or run inline when the pool is empty
//!
//! ## Architecture
//!
//! - [`io`] - Byte sources for the reader
//! - [`mod@format`] - TIFF structures, tag catalog and container reader
//! - [`write`] - Metadata normalization and container encoding
//! - [`decode`] - Decoder registry, built-in codecs and the worker pool
//! - [`config`] - Pool and logging configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use geotiff_codec::{encode_container, ContainerReader, MemoryReader, MetadataMap, PixelData, Pool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pixels = PixelData::flat(vec![0u8, 64, 128, 255]);
//!     let metadata = MetadataMap::new().with("width", 2u16).with("height", 2u16);
//!     let bytes = encode_container(&pixels, metadata)?;
//!
//!     let source = MemoryReader::new(bytes, "memory");
//!     let container = ContainerReader::open(&source).await?;
//!     let strip = container.read_chunk(&source, 0, 0).await?;
//!
//!     let pool = Pool::default();
//!     let samples = pool.decode(container.directories()[0].clone(), strip).await?;
//!     assert_eq!(&samples[..], &[0, 64, 128, 255]);
//!     pool.destroy();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod format;
pub mod io;
pub mod write;

// Re-export commonly used types
pub use config::{init_logging, Config};
pub use decode::{
    register_decoder, resolve_decoder, Decoder, DecoderFactory, DecoderRegistry, Pool,
    ThreadWorkerFactory, WorkerContext, WorkerEndpoint, WorkerFactory,
};
pub use error::{CodecError, DecodeError, EncodeError, IoError, TiffError, ValidationError, WriteError};
pub use format::tiff::{
    ByteOrder, Compression, ContainerReader, Directory, FieldType, TagCatalog, TagValue,
    TiffHeader,
};
pub use io::{MemoryReader, RangeReader};
pub use write::{encode_container, MetadataMap, PixelData, Samples};
