//! Worker pool for chunk decoding.
//!
//! # Dispatch
//!
//! Each slot owns one worker, a request channel to it and a table of pending
//! jobs keyed by a per-slot job id. A dispatcher task reads the slot's
//! response channel and completes the matching pending job, so responses may
//! arrive in any order and never disturb other jobs.
//!
//! A pool of size zero has no slots: decoding runs inline on the caller's
//! task and the worker factory is never used.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::DecodeError;
use crate::format::tiff::Directory;

use super::registry::DecoderRegistry;
use super::worker::{
    ThreadWorkerFactory, WorkerContext, WorkerEndpoint, WorkerFactory, WorkerRequest,
    WorkerResponse,
};

type PendingJobs = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Bytes, DecodeError>>>>>;

/// Number of workers used when no size is given.
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

struct WorkerSlot {
    index: usize,
    requests: mpsc::UnboundedSender<WorkerRequest>,
    jobs: PendingJobs,
    next_job_id: u64,
    context: Box<dyn WorkerContext>,
    dispatcher: JoinHandle<()>,
}

impl WorkerSlot {
    fn spawn(
        index: usize,
        factory: &dyn WorkerFactory,
        registry: Arc<DecoderRegistry>,
    ) -> Result<Self, DecodeError> {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::unbounded_channel();

        let context = factory.create(
            index,
            WorkerEndpoint {
                requests: request_rx,
                responses: response_tx,
                registry,
            },
        )?;

        let jobs: PendingJobs = Arc::new(Mutex::new(HashMap::new()));
        let dispatcher = tokio::spawn(dispatch_responses(index, response_rx, jobs.clone()));

        debug!(slot = index, "Worker slot created");
        Ok(Self {
            index,
            requests: request_tx,
            jobs,
            next_job_id: 0,
            context,
            dispatcher,
        })
    }

    fn pending(&self) -> usize {
        self.jobs.lock().len()
    }

    fn shutdown(mut self) {
        let abandoned: Vec<_> = self.jobs.lock().drain().collect();
        let count = abandoned.len();
        for (job, waiter) in abandoned {
            trace!(slot = self.index, job, "Rejecting pending job");
            let _ = waiter.send(Err(DecodeError::PoolClosed));
        }

        drop(self.requests);
        self.context.terminate();
        self.dispatcher.abort();
        debug!(slot = self.index, rejected = count, "Worker slot shut down");
    }
}

/// Complete pending jobs as their responses arrive.
///
/// When the worker drops its response channel, any job still pending is
/// dropped too, which its caller observes as a lost worker.
async fn dispatch_responses(
    slot: usize,
    mut responses: mpsc::UnboundedReceiver<WorkerResponse>,
    jobs: PendingJobs,
) {
    while let Some(response) = responses.recv().await {
        let waiter = jobs.lock().remove(&response.id);
        match waiter {
            Some(waiter) => {
                trace!(slot, job = response.id, ok = response.result.is_ok(), "Job completed");
                let _ = waiter.send(response.result);
            }
            None => warn!(slot, job = response.id, "Response for unknown job"),
        }
    }
    jobs.lock().clear();
    debug!(slot, "Worker response channel closed");
}

struct PoolState {
    slots: Vec<WorkerSlot>,
    closed: bool,
}

/// Bounded set of decode workers.
pub struct Pool {
    size: usize,
    factory: Arc<dyn WorkerFactory>,
    registry: Arc<DecoderRegistry>,
    state: Mutex<PoolState>,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Pool")
            .field("size", &self.size)
            .field("slots", &state.slots.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl Default for Pool {
    /// Thread workers, one per available core, using the global registry.
    fn default() -> Self {
        Self::new(
            default_pool_size(),
            Arc::new(ThreadWorkerFactory::default()),
            DecoderRegistry::global(),
        )
    }
}

impl Pool {
    /// Create a pool of `size` workers. Slots are started on first use.
    pub fn new(size: usize, factory: Arc<dyn WorkerFactory>, registry: Arc<DecoderRegistry>) -> Self {
        Self {
            size,
            factory,
            registry,
            state: Mutex::new(PoolState {
                slots: Vec::new(),
                closed: false,
            }),
        }
    }

    /// A pool that decodes on the caller's task.
    pub fn synchronous(registry: Arc<DecoderRegistry>) -> Self {
        Self::new(0, Arc::new(ThreadWorkerFactory::default()), registry)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn registry(&self) -> &Arc<DecoderRegistry> {
        &self.registry
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Jobs currently awaiting a response, across all slots.
    pub fn pending_jobs(&self) -> usize {
        self.state.lock().slots.iter().map(WorkerSlot::pending).sum()
    }

    /// Decode one chunk on the least-loaded worker.
    ///
    /// # Errors
    /// - `PoolClosed` after [`Pool::destroy`], including for jobs still
    ///   pending when it was called
    /// - `UnsupportedCompression` or `Worker` as reported for this job
    /// - `WorkerLost` when the worker stops without answering
    pub async fn decode(
        &self,
        directory: impl Into<Arc<Directory>>,
        buffer: Bytes,
    ) -> Result<Bytes, DecodeError> {
        let directory = directory.into();

        if self.size == 0 {
            if self.is_closed() {
                return Err(DecodeError::PoolClosed);
            }
            return self.registry.decode(&directory, buffer);
        }

        let (slot, id, receiver) = self.submit(directory, buffer)?;

        match receiver.await {
            Ok(result) => result,
            Err(_) if self.is_closed() => Err(DecodeError::PoolClosed),
            Err(_) => Err(DecodeError::WorkerLost { slot, job: id }),
        }
    }

    /// Decode inline when the codec does not benefit from a worker,
    /// otherwise dispatch like [`Pool::decode`].
    pub async fn decode_preferred(
        &self,
        directory: impl Into<Arc<Directory>>,
        buffer: Bytes,
    ) -> Result<Bytes, DecodeError> {
        let directory = directory.into();
        if self.registry.prefer_worker(&directory) == Some(false) {
            if self.is_closed() {
                return Err(DecodeError::PoolClosed);
            }
            return self.registry.decode(&directory, buffer);
        }
        self.decode(directory, buffer).await
    }

    /// Register a job on the least-loaded slot and send it.
    fn submit(
        &self,
        directory: Arc<Directory>,
        buffer: Bytes,
    ) -> Result<(usize, u64, oneshot::Receiver<Result<Bytes, DecodeError>>), DecodeError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(DecodeError::PoolClosed);
        }
        self.ensure_slots(&mut state)?;

        let slot = state
            .slots
            .iter_mut()
            .min_by_key(|slot| slot.pending())
            .ok_or(DecodeError::PoolClosed)?;

        let id = slot.next_job_id;
        slot.next_job_id += 1;

        let (sender, receiver) = oneshot::channel();
        slot.jobs.lock().insert(id, sender);

        let request = WorkerRequest {
            id,
            directory,
            buffer,
        };
        if slot.requests.send(request).is_err() {
            slot.jobs.lock().remove(&id);
            return Err(DecodeError::WorkerLost {
                slot: slot.index,
                job: id,
            });
        }

        trace!(slot = slot.index, job = id, "Job dispatched");
        Ok((slot.index, id, receiver))
    }

    fn ensure_slots(&self, state: &mut PoolState) -> Result<(), DecodeError> {
        while state.slots.len() < self.size {
            let index = state.slots.len();
            let slot = WorkerSlot::spawn(index, self.factory.as_ref(), self.registry.clone())?;
            state.slots.push(slot);
        }
        Ok(())
    }

    /// Terminate every worker and close the pool.
    ///
    /// Jobs still pending are rejected with `PoolClosed`, as is every later
    /// call to [`Pool::decode`].
    pub fn destroy(&self) {
        let slots = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            std::mem::take(&mut state.slots)
        };

        let count = slots.len();
        for slot in slots {
            slot.shutdown();
        }
        debug!(slots = count, "Pool destroyed");
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.destroy();
    }
}
