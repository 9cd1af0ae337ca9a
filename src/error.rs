use thiserror::Error;

use crate::format::tiff::Compression;

/// I/O errors that can occur when reading from a byte source
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// Backend-specific failure reported by a byte source
    #[error("Source error: {0}")]
    Source(String),
}

/// Errors that can occur when parsing TIFF containers
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the container
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("Invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// Container is too small to hold a header
    #[error("File too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// Directory offset points outside the container or back into the chain
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// Required tag is missing from a directory
    #[error("Missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// Unknown field type in IFD entry
    #[error("Unknown field type: {0}")]
    UnknownFieldType(u16),
}

/// Errors raised while turning metadata into directory bytes
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    /// Metadata name has no entry in the tag or GeoKey catalog
    #[error("Unknown tag name: {0}")]
    UnknownTagName(String),

    /// No wire type is registered for this tag code
    #[error("Unknown type of tag: {0}")]
    UnknownTagType(u16),

    /// Tag is present but carries no values
    #[error("Failed to get value for tag {0}")]
    MissingValue(u16),

    /// Value kind does not fit the tag's wire type
    #[error("Value for tag {tag} does not match field type {expected}")]
    TypeMismatch { tag: u16, expected: &'static str },

    /// Numeric value is outside the range of the tag's wire type
    #[error("Value {value} out of range for tag {tag} ({field_type})")]
    OutOfRange {
        tag: u16,
        field_type: &'static str,
        value: f64,
    },

    /// Sample count is not a whole number of pixels
    #[error("{samples} samples do not split into pixels of {bands} bands")]
    BandMismatch { samples: usize, bands: usize },

    /// Directory holds more entries than a 16-bit count can describe
    #[error("Directory has {0} entries, more than 65535")]
    TooManyEntries(usize),

    /// Encoded container would exceed 32-bit offsets
    #[error("Encoded size {0} exceeds the 4 GiB classic TIFF limit")]
    TooLarge(u64),
}

/// Errors raised when the raster shape cannot be established
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Width or height missing from both the metadata and the pixel data
    #[error("Cannot infer raster {0}: pass it in metadata or as nested bands")]
    MissingDimension(&'static str),

    /// Raster has no samples
    #[error("Raster is empty")]
    Empty,

    /// Nested band rows are not all the same length
    #[error("Band {band} row {row} has {actual} samples, expected {expected}")]
    Ragged {
        band: usize,
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Flat sample count is not a whole number of bands
    #[error("{samples} samples do not divide into {width}x{height} pixels")]
    SampleCount {
        samples: usize,
        width: usize,
        height: usize,
    },
}

/// Errors returned by the write pipeline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WriteError {
    /// Metadata could not be encoded
    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    /// Raster shape could not be established
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Failures reported by a decode capability
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// The compressed payload is corrupt or truncated
    #[error("{codec} decode failed: {message}")]
    Corrupt { codec: &'static str, message: String },

    /// Directory lacks something the codec needs
    #[error("{codec} cannot decode this directory: {message}")]
    Unsupported { codec: &'static str, message: String },
}

/// Errors returned by decoder resolution and pool dispatch
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// No capability is registered for the compression code, or the
    /// registration deliberately refuses it
    #[error("Unsupported compression {}: {reason}", describe_compression(.code))]
    UnsupportedCompression { code: Option<u16>, reason: String },

    /// The pool was destroyed
    #[error("Worker pool is closed")]
    PoolClosed,

    /// The capability running on a worker reported a failure
    #[error("Worker decode error: {0}")]
    Worker(#[from] CodecError),

    /// The worker dropped the job without answering
    #[error("Worker {slot} stopped before answering job {job}")]
    WorkerLost { slot: usize, job: u64 },

    /// A worker execution context could not be started
    #[error("Failed to start worker {slot}: {message}")]
    WorkerSpawn { slot: usize, message: String },
}

fn describe_compression(code: &Option<u16>) -> String {
    match code.map(|c| (c, Compression::from_u16(c))) {
        Some((code, Some(known))) => format!("{} ({})", code, known.name()),
        Some((code, None)) => code.to_string(),
        None => "none".to_string(),
    }
}
