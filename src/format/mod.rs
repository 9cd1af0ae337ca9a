//! Container format structures.
//!
//! Only TIFF-family containers are supported: classic TIFF and BigTIFF on the
//! read side, classic big-endian TIFF on the write side. GeoTIFF adds its
//! georeferencing on top through dedicated tags, see [`tiff::catalog`].

pub mod tiff;
