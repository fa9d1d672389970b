use crate::common::{FaceMatchError, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct Job {
    /// Set once the caller stops waiting; workers drop such jobs unrun.
    abandoned: Arc<AtomicBool>,
    task: Box<dyn FnOnce() + Send + 'static>,
}

/// Fixed set of threads that run model inference off the caller's thread.
///
/// Every call waits at most `timeout` for its result, queueing included. A
/// job that times out while still queued is skipped; one that is already
/// running keeps its worker until the model returns.
pub struct InferencePool {
    sender: Option<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    timeout: Duration,
}

impl InferencePool {
    pub fn new(threads: usize, timeout: Duration) -> Result<Self> {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..threads.max(1))
            .map(|id| {
                let receiver = Arc::clone(&receiver);
                thread::Builder::new()
                    .name(format!("inference-{}", id))
                    .spawn(move || worker_loop(id, receiver))
            })
            .collect::<std::io::Result<Vec<_>>>()?;

        tracing::debug!("Started {} inference workers (timeout {:?})", workers.len(), timeout);

        Ok(Self { sender: Some(sender), workers, timeout })
    }

    /// Runs `job` on a worker and waits for its result.
    pub fn run<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (reply_tx, reply_rx) = mpsc::channel();
        let abandoned = Arc::new(AtomicBool::new(false));
        let task = Job {
            abandoned: Arc::clone(&abandoned),
            task: Box::new(move || {
                // The caller may have timed out and dropped the receiver
                let _ = reply_tx.send(job());
            }),
        };

        self.sender
            .as_ref()
            .ok_or_else(|| FaceMatchError::Model("Inference pool is shut down".into()))?
            .send(task)
            .map_err(|_| FaceMatchError::Model("Inference pool is shut down".into()))?;

        match reply_rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                abandoned.store(true, Ordering::SeqCst);
                Err(FaceMatchError::InferenceTimeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(FaceMatchError::Model(
                "Inference worker panicked".into(),
            )),
        }
    }
}

fn worker_loop(id: usize, receiver: Arc<Mutex<mpsc::Receiver<Job>>>) {
    loop {
        let job = match receiver.lock() {
            Ok(rx) => rx.recv(),
            Err(_) => break,
        };

        match job {
            Ok(job) if job.abandoned.load(Ordering::SeqCst) => {
                tracing::debug!("Inference worker {} skipped a job its caller gave up on", id);
            }
            Ok(job) => {
                if panic::catch_unwind(AssertUnwindSafe(job.task)).is_err() {
                    tracing::error!("Inference worker {} recovered from a panicking job", id);
                }
            }
            // Pool dropped
            Err(_) => break,
        }
    }
}

impl Drop for InferencePool {
    fn drop(&mut self) {
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}
