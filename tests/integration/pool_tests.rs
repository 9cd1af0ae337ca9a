//! Worker pool integration tests.
//!
//! Tests verify:
//! - A size-0 pool decodes inline and never creates workers
//! - Concurrent jobs on one worker are matched to their callers by id
//! - Destroy rejects pending and later jobs
//! - A worker that stops without answering is reported

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use geotiff_codec::format::tiff::tag;
use geotiff_codec::{DecodeError, DecoderRegistry, Directory, Pool, ThreadWorkerFactory};

use super::test_utils::{CountingFactory, CrashingFactory, ReversingFactory, SilentFactory};

fn registry() -> Arc<DecoderRegistry> {
    Arc::new(DecoderRegistry::with_defaults())
}

fn with_compression(code: u16) -> Directory {
    Directory::default().with(tag::COMPRESSION, code)
}

fn deflate(data: &[u8]) -> Bytes {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).unwrap();
    Bytes::from(encoder.finish().unwrap())
}

/// Wait until the pool has `count` jobs in flight.
async fn wait_for_pending(pool: &Pool, count: usize) {
    for _ in 0..200 {
        if pool.pending_jobs() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("pool never reached {count} pending jobs");
}

// =============================================================================
// Synchronous Mode
// =============================================================================

#[tokio::test]
async fn test_size_zero_never_creates_workers() {
    let factory = Arc::new(CountingFactory::default());
    let pool = Pool::new(0, factory.clone(), registry());

    let raw = pool
        .decode(Directory::default(), Bytes::from_static(b"raw"))
        .await
        .unwrap();
    assert_eq!(raw, "raw");

    let inflated = pool
        .decode(with_compression(8), deflate(b"inflated"))
        .await
        .unwrap();
    assert_eq!(inflated, "inflated");

    assert_eq!(factory.calls(), 0);
}

#[tokio::test]
async fn test_size_zero_reports_capability_errors() {
    let pool = Pool::synchronous(registry());
    let result = pool
        .decode(with_compression(6), Bytes::from_static(b"old"))
        .await;
    assert!(matches!(
        result,
        Err(DecodeError::UnsupportedCompression { code: Some(6), .. })
    ));
}

#[tokio::test]
async fn test_size_zero_after_destroy() {
    let pool = Pool::synchronous(registry());
    pool.destroy();
    assert_eq!(
        pool.decode(Directory::default(), Bytes::new()).await,
        Err(DecodeError::PoolClosed)
    );
}

// =============================================================================
// Worker Dispatch
// =============================================================================

#[tokio::test]
async fn test_slots_created_lazily() {
    let factory = Arc::new(CountingFactory::default());
    let pool = Pool::new(3, factory.clone(), registry());
    assert_eq!(factory.calls(), 0);

    pool.decode(Directory::default(), Bytes::from_static(b"x"))
        .await
        .unwrap();
    assert_eq!(factory.calls(), 3);

    pool.decode(Directory::default(), Bytes::from_static(b"y"))
        .await
        .unwrap();
    assert_eq!(factory.calls(), 3);
    pool.destroy();
}

#[tokio::test]
async fn test_concurrent_jobs_matched_out_of_order() {
    let factory = Arc::new(ReversingFactory::default());
    let pool = Pool::new(1, factory.clone(), registry());

    let (first, second) = tokio::join!(
        pool.decode(with_compression(8), deflate(b"first job")),
        pool.decode(with_compression(32773), Bytes::from_static(&[0xFD, 0x2A])),
    );

    assert_eq!(first.unwrap(), "first job");
    assert_eq!(second.unwrap(), Bytes::from_static(&[0x2A; 4]));
    // The worker answered the second job before the first
    assert_eq!(factory.answered(), vec![1, 0]);
    pool.destroy();
}

#[tokio::test]
async fn test_failure_reaches_only_its_caller() {
    let factory = Arc::new(ReversingFactory::default());
    let pool = Pool::new(1, factory, registry());

    let (good, bad) = tokio::join!(
        pool.decode(Directory::default(), Bytes::from_static(b"fine")),
        pool.decode(with_compression(8), Bytes::from_static(b"not zlib")),
    );

    assert_eq!(good.unwrap(), "fine");
    assert!(matches!(bad, Err(DecodeError::Worker(_))));
    pool.destroy();
}

#[tokio::test]
async fn test_many_jobs_on_thread_workers() {
    let pool = Arc::new(Pool::new(
        2,
        Arc::new(ThreadWorkerFactory::new("pool-test")),
        registry(),
    ));

    let mut handles = Vec::new();
    for i in 0..16u8 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            let payload = vec![i; usize::from(i) + 1];
            let decoded = pool
                .decode(with_compression(8), deflate(&payload))
                .await
                .unwrap();
            assert_eq!(decoded, payload);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(pool.pending_jobs(), 0);
    pool.destroy();
}

// =============================================================================
// Destroy and Failures
// =============================================================================

#[tokio::test]
async fn test_decode_after_destroy() {
    let pool = Pool::new(2, Arc::new(ThreadWorkerFactory::default()), registry());
    pool.decode(Directory::default(), Bytes::from_static(b"warm"))
        .await
        .unwrap();

    pool.destroy();
    assert!(pool.is_closed());
    assert_eq!(
        pool.decode(Directory::default(), Bytes::new()).await,
        Err(DecodeError::PoolClosed)
    );

    // Destroying twice is harmless
    pool.destroy();
}

#[tokio::test]
async fn test_pending_jobs_rejected_on_destroy() {
    let pool = Arc::new(Pool::new(1, Arc::new(SilentFactory), registry()));

    let job = {
        let pool = pool.clone();
        tokio::spawn(async move {
            pool.decode(Directory::default(), Bytes::from_static(b"never"))
                .await
        })
    };

    wait_for_pending(&pool, 1).await;
    pool.destroy();

    assert_eq!(job.await.unwrap(), Err(DecodeError::PoolClosed));
    assert_eq!(pool.pending_jobs(), 0);
}

#[tokio::test]
async fn test_worker_lost() {
    let pool = Pool::new(1, Arc::new(CrashingFactory), registry());

    let result = pool
        .decode(Directory::default(), Bytes::from_static(b"lost"))
        .await;
    assert_eq!(result, Err(DecodeError::WorkerLost { slot: 0, job: 0 }));
    pool.destroy();
}

#[tokio::test]
async fn test_decode_preferred_skips_workers_for_raw() {
    let factory = Arc::new(CountingFactory::default());
    let pool = Pool::new(2, factory.clone(), registry());

    let raw = pool
        .decode_preferred(Directory::default(), Bytes::from_static(b"inline"))
        .await
        .unwrap();
    assert_eq!(raw, "inline");
    assert_eq!(factory.calls(), 0);

    let inflated = pool
        .decode_preferred(with_compression(8), deflate(b"worker"))
        .await
        .unwrap();
    assert_eq!(inflated, "worker");
    assert_eq!(factory.calls(), 2);
    pool.destroy();
}
