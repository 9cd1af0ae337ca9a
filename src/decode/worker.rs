//! Worker execution contexts.
//!
//! A worker owns one end of a request channel and one end of a response
//! channel. Every request carries a job id that the response echoes back,
//! which lets any number of jobs be in flight on one worker at once.
//! The pool never assumes responses arrive in request order.

use std::sync::Arc;
use std::thread::JoinHandle;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::DecodeError;
use crate::format::tiff::Directory;

use super::registry::DecoderRegistry;

/// A decode job sent to a worker.
#[derive(Debug)]
pub struct WorkerRequest {
    pub id: u64,
    pub directory: Arc<Directory>,
    pub buffer: Bytes,
}

/// The outcome of one job, tagged with its id.
#[derive(Debug)]
pub struct WorkerResponse {
    pub id: u64,
    pub result: Result<Bytes, DecodeError>,
}

/// The worker's side of a slot's channels.
#[derive(Debug)]
pub struct WorkerEndpoint {
    pub requests: mpsc::UnboundedReceiver<WorkerRequest>,
    pub responses: mpsc::UnboundedSender<WorkerResponse>,
    pub registry: Arc<DecoderRegistry>,
}

/// A running worker. The pool closes the request channel before calling
/// [`WorkerContext::terminate`].
pub trait WorkerContext: Send {
    fn terminate(&mut self);
}

/// Creates worker execution contexts for pool slots.
pub trait WorkerFactory: Send + Sync {
    fn create(&self, slot: usize, endpoint: WorkerEndpoint)
        -> Result<Box<dyn WorkerContext>, DecodeError>;
}

/// Serve decode requests until the request channel closes.
///
/// Blocks the calling thread; run it on a dedicated thread.
pub fn serve_requests(endpoint: WorkerEndpoint) {
    let WorkerEndpoint {
        mut requests,
        responses,
        registry,
    } = endpoint;

    while let Some(request) = requests.blocking_recv() {
        trace!(job = request.id, bytes = request.buffer.len(), "Decoding job");
        let result = registry.decode(&request.directory, request.buffer);
        if responses
            .send(WorkerResponse {
                id: request.id,
                result,
            })
            .is_err()
        {
            break;
        }
    }
}

// =============================================================================
// Thread workers
// =============================================================================

/// Runs each worker on a named OS thread.
#[derive(Debug, Clone)]
pub struct ThreadWorkerFactory {
    name_prefix: String,
}

impl Default for ThreadWorkerFactory {
    fn default() -> Self {
        Self::new("geotiff-decode")
    }
}

impl ThreadWorkerFactory {
    pub fn new(name_prefix: impl Into<String>) -> Self {
        Self {
            name_prefix: name_prefix.into(),
        }
    }
}

impl WorkerFactory for ThreadWorkerFactory {
    fn create(
        &self,
        slot: usize,
        endpoint: WorkerEndpoint,
    ) -> Result<Box<dyn WorkerContext>, DecodeError> {
        let name = format!("{}-{}", self.name_prefix, slot);
        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || serve_requests(endpoint))
            .map_err(|e| DecodeError::WorkerSpawn {
                slot,
                message: e.to_string(),
            })?;

        debug!(thread = %name, "Worker thread started");
        Ok(Box::new(ThreadWorker {
            name,
            handle: Some(handle),
        }))
    }
}

struct ThreadWorker {
    name: String,
    handle: Option<JoinHandle<()>>,
}

impl WorkerContext for ThreadWorker {
    fn terminate(&mut self) {
        // The thread exits once its request channel is closed; an in-flight
        // decode is left to finish and its answer is discarded.
        if self.handle.take().is_some() {
            debug!(thread = %self.name, "Worker thread detached");
        }
    }
}
