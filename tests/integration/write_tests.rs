//! Writer integration tests.
//!
//! Tests verify:
//! - Written containers read back with the expected structure
//! - Inline vs external value placement in directory entries
//! - External regions are even-length and disjoint
//! - GeoKey directory contents match the supplied keys

use bytes::Bytes;

use geotiff_codec::format::tiff::{geo_key, tag};
use geotiff_codec::write::{encode_container, IfdEncoder, MetadataMap, PixelData};
use geotiff_codec::{ContainerReader, Directory, MemoryReader, TagValue, ValidationError, WriteError};

use super::test_utils::{gray_2x2, raw_directories};

async fn read_back(bytes: Bytes) -> ContainerReader {
    let source = MemoryReader::new(bytes, "mem://written.tif");
    ContainerReader::open(&source).await.unwrap()
}

// =============================================================================
// Round Trips
// =============================================================================

#[tokio::test]
async fn test_gray_2x2_round_trip() {
    let container = read_back(gray_2x2()).await;

    assert_eq!(container.directories().len(), 1);
    let dir = &container.directories()[0];
    assert_eq!(dir.width(), Some(2));
    assert_eq!(dir.height(), Some(2));
    assert_eq!(dir.samples_per_pixel(), 1);
    assert_eq!(dir.bits_per_sample(), vec![8]);
    assert_eq!(dir.compression(), Some(1));
    assert_eq!(dir.get_u64(tag::PHOTOMETRIC_INTERPRETATION), Some(1));
}

#[tokio::test]
async fn test_strip_holds_samples() {
    let bytes = gray_2x2();
    let source = MemoryReader::new(bytes.clone(), "mem://gray.tif");
    let container = ContainerReader::open(&source).await.unwrap();

    let strip = container.read_chunk(&source, 0, 0).await.unwrap();
    assert_eq!(&strip[..], &[0, 64, 128, 255]);

    // The strip is the tail of the container
    let offset = container.directories()[0].get_u64(tag::STRIP_OFFSETS).unwrap();
    assert_eq!(offset as usize + 4, bytes.len());
}

#[tokio::test]
async fn test_default_crs_is_wgs84() {
    let container = read_back(gray_2x2()).await;
    let dir = &container.directories()[0];

    assert_eq!(dir.geo_key(geo_key::GEOGRAPHIC_TYPE), Some(TagValue::Number(4326.0)));
    assert_eq!(dir.geo_key(geo_key::GT_MODEL_TYPE), Some(TagValue::Number(2.0)));
    assert_eq!(
        dir.geo_key(geo_key::GEOG_CITATION),
        Some(TagValue::Text("WGS 84".to_string()))
    );
    assert_eq!(
        dir.get(tag::MODEL_TIEPOINT).and_then(TagValue::to_numbers),
        Some(vec![0.0, 0.0, 0.0, -180.0, 90.0, 0.0])
    );
    assert_eq!(
        dir.get(tag::MODEL_PIXEL_SCALE).and_then(TagValue::to_numbers),
        Some(vec![180.0, 90.0, 0.0])
    );
}

#[tokio::test]
async fn test_rgb_float_bands() {
    let band = |base: f32| vec![vec![base, base + 1.0], vec![base + 2.0, base + 3.0]];
    let pixels = PixelData::from_bands(vec![band(0.0), band(10.0), band(20.0)]).unwrap();

    let bytes = encode_container(&pixels, MetadataMap::new()).unwrap();
    let source = MemoryReader::new(bytes, "mem://rgb.tif");
    let container = ContainerReader::open(&source).await.unwrap();
    let dir = &container.directories()[0];

    assert_eq!(dir.samples_per_pixel(), 3);
    assert_eq!(dir.bits_per_sample(), vec![32, 32, 32]);
    assert_eq!(dir.sample_format(), vec![3, 3, 3]);
    assert_eq!(dir.get_u64(tag::PHOTOMETRIC_INTERPRETATION), Some(2));

    let strip = container.read_chunk(&source, 0, 0).await.unwrap();
    let samples: Vec<f32> = strip
        .chunks_exact(4)
        .map(|b| f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    // Pixel-interleaved: first pixel of each band, then the second, ...
    assert_eq!(&samples[..6], &[0.0, 10.0, 20.0, 1.0, 11.0, 21.0]);
    assert_eq!(samples.len(), 12);
}

#[tokio::test]
async fn test_json_metadata() {
    let metadata = MetadataMap::from_json(
        r#"{"width": 2, "height": 1, "ImageDescription": "from json", "XResolution": 72.5}"#,
    )
    .unwrap();
    let bytes = encode_container(&PixelData::flat(vec![1u16, 2]), metadata).unwrap();

    let container = read_back(bytes).await;
    let dir = &container.directories()[0];
    assert_eq!(dir.bits_per_sample(), vec![16]);
    assert_eq!(
        dir.get(tag::IMAGE_DESCRIPTION).and_then(TagValue::as_text),
        Some("from json")
    );
    assert_eq!(
        dir.get(tag::X_RESOLUTION).and_then(TagValue::first_number),
        Some(72.5)
    );
}

// =============================================================================
// Entry Layout
// =============================================================================

#[test]
fn test_entries_sorted_by_tag() {
    let bytes = gray_2x2();
    let dirs = raw_directories(&bytes);
    assert_eq!(dirs.len(), 1);

    let tags: Vec<u16> = dirs[0].entries.iter().map(|e| e.tag).collect();
    let mut sorted = tags.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(tags, sorted);
}

#[test]
fn test_inline_and_external_placement() {
    let metadata = MetadataMap::new()
        .with("width", 2u16)
        .with("height", 2u16)
        .with("Artist", "abc")
        .with("ImageDescription", "long enough to spill");
    let bytes = encode_container(&PixelData::flat(vec![1u8, 2, 3, 4]), metadata).unwrap();
    let dir = &raw_directories(&bytes)[0];

    let mut inline = 0;
    let mut external = 0;
    for entry in &dir.entries {
        let len = entry.payload_len();
        if len <= 4 {
            inline += 1;
            // Left-justified and zero padded
            assert!(entry.value[len..].iter().all(|&b| b == 0), "tag {}", entry.tag);
        } else {
            external += 1;
            assert!(entry.offset() as usize >= dir.table_end, "tag {}", entry.tag);
        }
    }
    assert!(inline > 0 && external > 0);

    // "abc" plus NUL fits inline
    let artist = dir.entries.iter().find(|e| e.tag == 315).unwrap(); // Artist
    assert_eq!(artist.count, 4);
    assert_eq!(&artist.value, b"abc\0");
}

#[test]
fn test_external_regions_disjoint_and_even() {
    let metadata = MetadataMap::new()
        .with("width", 3u16)
        .with("height", 1u16)
        .with("ImageDescription", "odd")
        .with("Copyright", "seven!")
        .with("PCSCitationGeoKey", "UTM 33N")
        .with("ProjectedCSTypeGeoKey", 32633u16);
    let bytes = encode_container(&PixelData::flat(vec![1u8, 2, 3]), metadata).unwrap();
    let dir = &raw_directories(&bytes)[0];

    let mut regions: Vec<(usize, usize)> = dir
        .entries
        .iter()
        .filter(|e| e.payload_len() > 4)
        .map(|e| (e.offset() as usize, e.payload_len()))
        .collect();
    regions.sort_unstable();

    for (offset, _) in &regions {
        assert_eq!(offset % 2, 0, "region at {offset} is not even-aligned");
    }
    for pair in regions.windows(2) {
        let (start, len) = pair[0];
        let padded = len + len % 2;
        assert!(start + padded <= pair[1].0, "regions {:?} overlap", pair);
    }
}

#[test]
fn test_directory_chain() {
    let first = Directory::default()
        .with(tag::IMAGE_WIDTH, 10u32)
        .with(tag::IMAGE_DESCRIPTION, "first directory");
    let second = Directory::default()
        .with(tag::IMAGE_WIDTH, 5u32)
        .with(tag::MODEL_PIXEL_SCALE, vec![1.0, 1.0, 0.0]);

    let bytes = IfdEncoder::new().encode(&[first, second]).unwrap();
    let dirs = raw_directories(&bytes);

    assert_eq!(dirs.len(), 2);
    assert_eq!(dirs[0].offset, 8);
    assert_eq!(dirs[0].next as usize, dirs[1].offset);
    assert!(dirs[1].offset >= dirs[0].table_end);
    assert_eq!(dirs[1].next, 0);
}

// =============================================================================
// GeoKeys
// =============================================================================

#[tokio::test]
async fn test_geo_key_count_matches_metadata() {
    let metadata = MetadataMap::new()
        .with("width", 2u16)
        .with("height", 2u16)
        .with("GTModelTypeGeoKey", 1u16)
        .with("ProjectedCSTypeGeoKey", 32633u16)
        .with("PCSCitationGeoKey", "WGS 84 / UTM zone 33N")
        .with("ProjLinearUnitSizeGeoKey", 1.0);
    let bytes = encode_container(&PixelData::flat(vec![0u8; 4]), metadata).unwrap();

    let container = read_back(bytes).await;
    let dir = &container.directories()[0];

    let header = dir.get_u64_array(tag::GEO_KEY_DIRECTORY).unwrap();
    assert_eq!(&header[..4], &[1, 1, 0, 4]);

    let entries = dir.geo_key_entries().unwrap();
    let ids: Vec<u16> = entries.iter().map(|e| e.key_id).collect();
    assert_eq!(ids, vec![1024, 3072, 3073, 3077]);

    assert_eq!(
        dir.geo_key(3073),
        Some(TagValue::Text("WGS 84 / UTM zone 33N".to_string()))
    );
    assert_eq!(dir.geo_key(3077), Some(TagValue::Number(1.0)));
    // Explicit CRS suppresses the WGS 84 default
    assert_eq!(dir.geo_key(geo_key::GEOGRAPHIC_TYPE), None);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_unknown_tag_name() {
    let metadata = MetadataMap::new()
        .with("width", 1u16)
        .with("height", 1u16)
        .with("NotATag", 3u16);
    let result = encode_container(&PixelData::flat(vec![0u8]), metadata);
    assert!(matches!(result, Err(WriteError::Encode(_))));
}

#[test]
fn test_missing_dimensions() {
    let metadata = MetadataMap::new().with("width", 2u16);
    let result = encode_container(&PixelData::flat(vec![0u8; 4]), metadata);
    assert_eq!(
        result,
        Err(WriteError::Validation(ValidationError::MissingDimension("height")))
    );
}
