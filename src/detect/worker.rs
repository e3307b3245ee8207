//! Single-worker inference queue.
//!
//! The backend is moved onto a dedicated thread and never leaves it. Callers
//! submit one image at a time over a bounded channel and block on a private
//! reply channel until their own request has been processed, so the backend
//! is never invoked while a previous invocation is in flight.

use std::sync::mpsc::{self, Receiver, Sender, SyncSender};
use std::thread::{self, JoinHandle};

use crate::detect::backend::{InferenceBackend, Observation};
use crate::error::{Error, Result};
use crate::frame::ImageFrame;

/// Requests that may wait behind the one being processed.
const QUEUE_DEPTH: usize = 1;

struct Job {
    frame: ImageFrame,
    reply: Sender<anyhow::Result<Vec<Observation>>>,
}

/// Cloneable submission handle for an [`InferenceWorker`].
#[derive(Clone)]
pub struct WorkerHandle {
    jobs: SyncSender<Job>,
}

impl WorkerHandle {
    /// Run inference on `frame`, blocking until the result is available.
    pub fn infer(&self, frame: ImageFrame) -> Result<Vec<Observation>> {
        let (reply, response) = mpsc::channel();
        self.jobs
            .send(Job { frame, reply })
            .map_err(|_| Error::WorkerUnavailable)?;
        response
            .recv()
            .map_err(|_| Error::WorkerUnavailable)?
            .map_err(Error::Inference)
    }
}

/// Owns the worker thread. Dropping it closes the queue and joins the thread
/// once outstanding requests have drained.
pub struct InferenceWorker {
    handle: Option<WorkerHandle>,
    join: Option<JoinHandle<()>>,
    backend_name: &'static str,
}

impl InferenceWorker {
    pub fn spawn<B: InferenceBackend + 'static>(mut backend: B, label: &str) -> Result<Self> {
        let backend_name = backend.name();
        let (jobs, queue) = mpsc::sync_channel(QUEUE_DEPTH);
        let (ready_tx, ready_rx) = mpsc::channel();
        let join = thread::Builder::new()
            .name(format!("spoof-infer-{}", backend_name))
            .spawn(move || {
                let warmed = backend.warm_up();
                let failed = warmed.is_err();
                let _ = ready_tx.send(warmed);
                if failed {
                    return;
                }
                run_queue(&mut backend, queue);
            })
            .map_err(|e| Error::Model(anyhow::Error::new(e).context("failed to spawn worker")))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let _ = join.join();
                return Err(Error::Model(err.context("backend warm-up failed")));
            }
            Err(_) => {
                let _ = join.join();
                return Err(Error::WorkerUnavailable);
            }
        }
        log::debug!("inference worker started for {} ({})", label, backend_name);

        Ok(Self {
            handle: Some(WorkerHandle { jobs }),
            join: Some(join),
            backend_name,
        })
    }

    pub(crate) fn handle(&self) -> Result<WorkerHandle> {
        self.handle.clone().ok_or(Error::WorkerUnavailable)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    pub fn infer(&self, frame: ImageFrame) -> Result<Vec<Observation>> {
        self.handle()?.infer(frame)
    }
}

impl Drop for InferenceWorker {
    fn drop(&mut self) {
        self.handle.take();
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                log::warn!("inference worker ({}) panicked", self.backend_name);
            }
        }
    }
}

fn run_queue<B: InferenceBackend>(backend: &mut B, queue: Receiver<Job>) {
    while let Ok(job) = queue.recv() {
        let result = backend.infer(&job.frame);
        // The caller may have gone away; nothing to report to.
        let _ = job.reply.send(result);
    }
}
