//! Test utilities for integration tests.
//!
//! This module provides a request-tracking byte source, a raw big-endian
//! directory walker for byte-level layout checks, and worker factories with
//! scripted behavior for exercising the pool.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use geotiff_codec::decode::{
    serve_requests, ThreadWorkerFactory, WorkerContext, WorkerEndpoint, WorkerFactory,
    WorkerResponse,
};
use geotiff_codec::error::{DecodeError, IoError};
use geotiff_codec::io::RangeReader;
use geotiff_codec::write::{encode_container, MetadataMap, PixelData};
use geotiff_codec::FieldType;

// =============================================================================
// Mock Range Reader with Request Tracking
// =============================================================================

/// A mock range reader that records every read request.
pub struct TrackingMockReader {
    data: Bytes,
    identifier: String,
    requests: Arc<Mutex<Vec<(u64, usize)>>>,
}

impl TrackingMockReader {
    pub fn new(data: impl Into<Bytes>, identifier: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            identifier: identifier.into(),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<(u64, usize)> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl RangeReader for TrackingMockReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        self.requests.lock().push((offset, len));

        let start = offset as usize;
        let end = start + len;
        if end > self.data.len() {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.data.len() as u64,
            });
        }
        Ok(self.data.slice(start..end))
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

// =============================================================================
// Raw Directory Walking
// =============================================================================

/// One 12-byte entry exactly as written.
#[derive(Debug, Clone, Copy)]
pub struct RawEntry {
    pub tag: u16,
    pub field_type: u16,
    pub count: u32,
    pub value: [u8; 4],
}

impl RawEntry {
    /// Encoded payload length in bytes.
    pub fn payload_len(&self) -> usize {
        let width = FieldType::from_u16(self.field_type)
            .map(FieldType::size_in_bytes)
            .unwrap_or(1);
        width * self.count as usize
    }

    pub fn offset(&self) -> u32 {
        u32::from_be_bytes(self.value)
    }
}

/// One directory as laid out in a big-endian classic container.
#[derive(Debug, Clone)]
pub struct RawDirectory {
    pub offset: usize,
    pub entries: Vec<RawEntry>,
    /// First byte after the entry table and next-directory offset.
    pub table_end: usize,
    pub next: u32,
}

fn be_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

fn be_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Walk every directory of a big-endian classic container.
pub fn raw_directories(bytes: &[u8]) -> Vec<RawDirectory> {
    assert_eq!(&bytes[0..2], b"MM");
    assert_eq!(be_u16(bytes, 2), 42);

    let mut directories = Vec::new();
    let mut offset = be_u32(bytes, 4) as usize;
    while offset != 0 {
        let count = be_u16(bytes, offset) as usize;
        let entries = (0..count)
            .map(|i| {
                let at = offset + 2 + i * 12;
                RawEntry {
                    tag: be_u16(bytes, at),
                    field_type: be_u16(bytes, at + 2),
                    count: be_u32(bytes, at + 4),
                    value: [bytes[at + 8], bytes[at + 9], bytes[at + 10], bytes[at + 11]],
                }
            })
            .collect();
        let next_at = offset + 2 + count * 12;
        let next = be_u32(bytes, next_at);
        directories.push(RawDirectory {
            offset,
            entries,
            table_end: next_at + 4,
            next,
        });
        offset = next as usize;
    }
    directories
}

// =============================================================================
// Test Containers
// =============================================================================

/// A single-band 2x2 8-bit raster with no metadata beyond its size.
pub fn gray_2x2() -> Bytes {
    let pixels = PixelData::flat(vec![0u8, 64, 128, 255]);
    let metadata = MetadataMap::new().with("width", 2u16).with("height", 2u16);
    encode_container(&pixels, metadata).unwrap()
}

// =============================================================================
// Worker Factories
// =============================================================================

/// Counts created contexts, delegating to thread workers.
#[derive(Default)]
pub struct CountingFactory {
    inner: ThreadWorkerFactory,
    calls: AtomicUsize,
}

impl CountingFactory {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl WorkerFactory for CountingFactory {
    fn create(
        &self,
        slot: usize,
        endpoint: WorkerEndpoint,
    ) -> Result<Box<dyn WorkerContext>, DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create(slot, endpoint)
    }
}

struct DetachedThread;

impl WorkerContext for DetachedThread {
    fn terminate(&mut self) {}
}

/// Workers that wait for two requests and answer them last-first, then
/// serve normally. Response ids are recorded in send order.
#[derive(Default)]
pub struct ReversingFactory {
    answered: Arc<Mutex<Vec<u64>>>,
}

impl ReversingFactory {
    pub fn answered(&self) -> Vec<u64> {
        self.answered.lock().clone()
    }
}

impl WorkerFactory for ReversingFactory {
    fn create(
        &self,
        _slot: usize,
        endpoint: WorkerEndpoint,
    ) -> Result<Box<dyn WorkerContext>, DecodeError> {
        let answered = self.answered.clone();
        std::thread::spawn(move || {
            let WorkerEndpoint {
                mut requests,
                responses,
                registry,
            } = endpoint;

            let mut batch = Vec::new();
            while batch.len() < 2 {
                match requests.blocking_recv() {
                    Some(request) => batch.push(request),
                    None => return,
                }
            }
            for request in batch.into_iter().rev() {
                let result = registry.decode(&request.directory, request.buffer);
                answered.lock().push(request.id);
                let _ = responses.send(WorkerResponse {
                    id: request.id,
                    result,
                });
            }

            serve_requests(WorkerEndpoint {
                requests,
                responses,
                registry,
            });
        });
        Ok(Box::new(DetachedThread))
    }
}

/// Workers that accept requests and never answer.
#[derive(Default)]
pub struct SilentFactory;

struct SilentWorker {
    endpoint: Option<WorkerEndpoint>,
}

impl WorkerContext for SilentWorker {
    fn terminate(&mut self) {
        self.endpoint = None;
    }
}

impl WorkerFactory for SilentFactory {
    fn create(
        &self,
        _slot: usize,
        endpoint: WorkerEndpoint,
    ) -> Result<Box<dyn WorkerContext>, DecodeError> {
        Ok(Box::new(SilentWorker {
            endpoint: Some(endpoint),
        }))
    }
}

/// Workers that exit on their first request without answering.
#[derive(Default)]
pub struct CrashingFactory;

impl WorkerFactory for CrashingFactory {
    fn create(
        &self,
        _slot: usize,
        endpoint: WorkerEndpoint,
    ) -> Result<Box<dyn WorkerContext>, DecodeError> {
        std::thread::spawn(move || {
            let WorkerEndpoint { mut requests, .. } = endpoint;
            let _ = requests.blocking_recv();
        });
        Ok(Box::new(DetachedThread))
    }
}
