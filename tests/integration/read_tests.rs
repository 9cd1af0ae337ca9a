//! Read and decode integration tests.
//!
//! Tests verify:
//! - Written strips decode back to the original samples through the pool
//! - Compressed strips in hand-built containers decode with their predictor
//! - BigTIFF little-endian containers are parsed
//! - The reader only fetches the ranges it needs

use std::io::Write;
use std::sync::Arc;

use bytes::Bytes;

use geotiff_codec::format::tiff::tag;
use geotiff_codec::write::{encode_container, IfdEncoder, MetadataMap, PixelData};
use geotiff_codec::{
    ByteOrder, ContainerReader, DecoderRegistry, Directory, MemoryReader, Pool, TiffError,
    ThreadWorkerFactory,
};

use super::test_utils::{gray_2x2, TrackingMockReader};

fn thread_pool(size: usize) -> Pool {
    Pool::new(
        size,
        Arc::new(ThreadWorkerFactory::new("read-test")),
        Arc::new(DecoderRegistry::with_defaults()),
    )
}

// =============================================================================
// Written Containers
// =============================================================================

#[tokio::test]
async fn test_written_strip_decodes_through_pool() {
    let source = MemoryReader::new(gray_2x2(), "mem://gray.tif");
    let container = ContainerReader::open(&source).await.unwrap();
    let strip = container.read_chunk(&source, 0, 0).await.unwrap();

    for size in [0, 1, 2] {
        let pool = thread_pool(size);
        let decoded = pool
            .decode(container.directories()[0].clone(), strip.clone())
            .await
            .unwrap();
        assert_eq!(&decoded[..], &[0, 64, 128, 255], "pool size {size}");
        pool.destroy();
    }
}

#[tokio::test]
async fn test_written_u16_bands_decode() {
    let pixels = PixelData::from_bands(vec![
        vec![vec![1u16, 2, 3]],
        vec![vec![100u16, 200, 300]],
    ])
    .unwrap();
    let bytes = encode_container(&pixels, MetadataMap::new()).unwrap();

    let source = MemoryReader::new(bytes, "mem://bands.tif");
    let container = ContainerReader::open(&source).await.unwrap();
    let dir = container.directories()[0].clone();
    assert_eq!(dir.width(), Some(3));
    assert_eq!(dir.height(), Some(1));
    assert_eq!(dir.samples_per_pixel(), 2);
    // Two bands: not RGB
    assert_eq!(dir.get_u64(tag::PHOTOMETRIC_INTERPRETATION), Some(1));

    let strip = container.read_chunk(&source, 0, 0).await.unwrap();
    let pool = thread_pool(1);
    let decoded = pool.decode(dir, strip).await.unwrap();
    let samples: Vec<u16> = decoded
        .chunks_exact(2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .collect();
    assert_eq!(samples, vec![1, 100, 2, 200, 3, 300]);
    pool.destroy();
}

#[tokio::test]
async fn test_chunk_out_of_range() {
    let source = MemoryReader::new(gray_2x2(), "mem://gray.tif");
    let container = ContainerReader::open(&source).await.unwrap();

    assert!(matches!(
        container.read_chunk(&source, 0, 1).await,
        Err(TiffError::InvalidTagValue { .. })
    ));
    assert!(matches!(
        container.read_chunk(&source, 1, 0).await,
        Err(TiffError::InvalidTagValue { .. })
    ));
}

// =============================================================================
// Compressed Containers
// =============================================================================

/// A one-strip container whose payload is appended after the directory.
fn compressed_container(mut dir: Directory, payload: &[u8]) -> Bytes {
    dir.insert(tag::STRIP_OFFSETS, 0u32);
    dir.insert(tag::STRIP_BYTE_COUNTS, payload.len() as u32);
    let encoder = IfdEncoder::new();
    let header_len = encoder.encode(&[dir.clone()]).unwrap().len();

    dir.insert(tag::STRIP_OFFSETS, header_len as u32);
    let mut out = encoder.encode(&[dir]).unwrap().to_vec();
    out.extend_from_slice(payload);
    Bytes::from(out)
}

#[tokio::test]
async fn test_deflate_with_horizontal_predictor() {
    // One row of four 8-bit samples, differenced
    let original = [10u8, 12, 15, 15];
    let differenced = [10u8, 2, 3, 0];
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&differenced).unwrap();
    let payload = encoder.finish().unwrap();

    let dir = Directory::default()
        .with(tag::IMAGE_WIDTH, 4u32)
        .with(tag::IMAGE_LENGTH, 1u32)
        .with(tag::BITS_PER_SAMPLE, 8u16)
        .with(tag::COMPRESSION, 8u16)
        .with(tag::PREDICTOR, 2u16);
    let source = MemoryReader::new(compressed_container(dir, &payload), "mem://deflate.tif");

    let container = ContainerReader::open(&source).await.unwrap();
    let strip = container.read_chunk(&source, 0, 0).await.unwrap();
    assert_eq!(strip.len(), payload.len());

    let pool = thread_pool(1);
    let decoded = pool
        .decode(container.directories()[0].clone(), strip)
        .await
        .unwrap();
    assert_eq!(&decoded[..], &original);
    pool.destroy();
}

#[tokio::test]
async fn test_packbits_strip() {
    let dir = Directory::default()
        .with(tag::IMAGE_WIDTH, 5u32)
        .with(tag::IMAGE_LENGTH, 1u32)
        .with(tag::COMPRESSION, 32773u16);
    let source = MemoryReader::new(
        compressed_container(dir, &[0xFD, 0x09, 0x00, 0x01]),
        "mem://packbits.tif",
    );

    let container = ContainerReader::open(&source).await.unwrap();
    let strip = container.read_chunk(&source, 0, 0).await.unwrap();

    let pool = thread_pool(0);
    let decoded = pool
        .decode_preferred(container.directories()[0].clone(), strip)
        .await
        .unwrap();
    assert_eq!(&decoded[..], &[9, 9, 9, 9, 1]);
}

// =============================================================================
// BigTIFF
// =============================================================================

/// Little-endian BigTIFF with one IFD: width=7 (LONG) and LZW compression.
fn bigtiff_fixture() -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"II");
    data.extend_from_slice(&43u16.to_le_bytes());
    data.extend_from_slice(&8u16.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(&16u64.to_le_bytes());

    // IFD at 16
    data.extend_from_slice(&2u64.to_le_bytes());

    data.extend_from_slice(&256u16.to_le_bytes());
    data.extend_from_slice(&4u16.to_le_bytes());
    data.extend_from_slice(&1u64.to_le_bytes());
    data.extend_from_slice(&7u64.to_le_bytes());

    data.extend_from_slice(&259u16.to_le_bytes());
    data.extend_from_slice(&3u16.to_le_bytes());
    data.extend_from_slice(&1u64.to_le_bytes());
    data.extend_from_slice(&5u64.to_le_bytes());

    data.extend_from_slice(&0u64.to_le_bytes());
    data
}

#[tokio::test]
async fn test_bigtiff_little_endian() {
    let source = MemoryReader::new(bigtiff_fixture(), "mem://big.tif");
    let container = ContainerReader::open(&source).await.unwrap();

    assert!(container.header().is_bigtiff);
    let dir = &container.directories()[0];
    assert_eq!(dir.byte_order(), ByteOrder::LittleEndian);
    assert_eq!(dir.width(), Some(7));
    assert_eq!(dir.compression(), Some(5));
}

// =============================================================================
// Range Requests
// =============================================================================

#[tokio::test]
async fn test_reader_requests_only_needed_ranges() {
    let bytes = gray_2x2();
    let total = bytes.len();
    let reader = TrackingMockReader::new(bytes, "mock://gray.tif");

    let container = ContainerReader::open(&reader).await.unwrap();
    let after_open = reader.request_count();
    // Header, entry count, entry table, then one read per external value
    assert!(after_open >= 3);

    container.read_chunk(&reader, 0, 0).await.unwrap();
    assert_eq!(reader.request_count(), after_open + 1);

    let requests = reader.requests();
    assert_eq!(requests[0], (0, 16));
    assert_eq!(requests.last(), Some(&((total - 4) as u64, 4)));
    assert!(requests.iter().all(|(_, len)| *len < total));
}
