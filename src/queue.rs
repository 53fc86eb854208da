//! The serialized mutation queue.
//!
//! All mutating operations flow through a FIFO queue driven by a single
//! worker task, which is what guarantees at most one in-flight mutation
//! against the repository's index (the underlying git index operations are
//! not safe under concurrent modification) and gives `close` its drain /
//! timeout / force semantics.
//!
//! Queue states: *idle* (empty, worker parked), *running* (worker busy),
//! *draining* (no new tasks accepted, worker finishing), *closed* (worker
//! stopped, leftovers rejected). The state is not reified as an enum — it is
//! the product of the `accepting` flag, the pending counter, and the stop
//! signal — but the transitions match that model.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Notify, mpsc, oneshot, watch};

use gitddb_git::GitError;

use crate::error::Error;
use crate::types::{DeleteResult, PutResult, TaskMetadata};

/// Outcome of a queued mutation.
#[derive(Debug)]
pub(crate) enum TaskOutput {
    Put(PutResult),
    Delete(DeleteResult),
}

/// The unit of work a task executes on the blocking pool.
pub(crate) type TaskWork = Box<dyn FnOnce() -> Result<TaskOutput, Error> + Send + 'static>;

/// Receiver side of a submitted task.
pub(crate) type TaskReceiver = oneshot::Receiver<Result<TaskOutput, Error>>;

struct QueuedTask {
    metadata: TaskMetadata,
    work: TaskWork,
    reply: oneshot::Sender<Result<TaskOutput, Error>>,
}

struct Shared {
    /// Tasks accepted but not yet finished (queued + in flight).
    pending: AtomicUsize,
    /// Cleared when the queue starts draining or closes.
    accepting: AtomicBool,
    /// Signalled whenever `pending` drops to zero.
    drained: Notify,
}

impl Shared {
    fn finish_one(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }
}

/// FIFO, single-worker mutation queue.
///
/// Lives exactly as long as the repository handle: created by `open`,
/// consumed by `close`.
pub(crate) struct TaskQueue {
    tx: mpsc::UnboundedSender<QueuedTask>,
    stop: watch::Sender<bool>,
    shared: Arc<Shared>,
    worker: std::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl TaskQueue {
    /// Create the queue and spawn its worker. Must be called inside a tokio
    /// runtime.
    pub(crate) fn start() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (stop, stop_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            pending: AtomicUsize::new(0),
            accepting: AtomicBool::new(true),
            drained: Notify::new(),
        });

        let worker = tokio::spawn(run_worker(rx, stop_rx, shared.clone()));

        Self {
            tx,
            stop,
            shared,
            worker: std::sync::Mutex::new(Some(worker)),
        }
    }

    /// Number of tasks accepted but not yet finished.
    pub(crate) fn len(&self) -> usize {
        self.shared.pending.load(Ordering::SeqCst)
    }

    /// Submit a task. Returns the receiver its outcome will arrive on.
    ///
    /// # Errors
    /// [`Error::DatabaseClosing`] when the queue is draining or closed.
    pub(crate) fn enqueue(
        &self,
        metadata: TaskMetadata,
        work: TaskWork,
    ) -> Result<TaskReceiver, Error> {
        if !self.shared.accepting.load(Ordering::SeqCst) {
            return Err(Error::DatabaseClosing);
        }

        let (reply, receiver) = oneshot::channel();
        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        let task = QueuedTask {
            metadata,
            work,
            reply,
        };
        if self.tx.send(task).is_err() {
            self.shared.finish_one();
            return Err(Error::DatabaseClosing);
        }
        Ok(receiver)
    }

    /// Stop the queue.
    ///
    /// Graceful (`force == false`): stop accepting, wait up to `timeout` for
    /// the queue to drain, then shut the worker down. On timeout the queue
    /// still ends up closed (remaining tasks rejected with
    /// [`Error::DatabaseClosing`]) and [`Error::DatabaseCloseTimeout`] is
    /// returned.
    ///
    /// Force: stop accepting and reject all pending tasks immediately. A
    /// task that already reached the filesystem keeps running to completion;
    /// any commit it produces is a legitimate commit of the repository.
    pub(crate) async fn close(&self, force: bool, timeout: Duration) -> Result<(), Error> {
        self.shared.accepting.store(false, Ordering::SeqCst);

        let result = if force {
            let _ = self.stop.send(true);
            Ok(())
        } else {
            match tokio::time::timeout(timeout, self.wait_drained()).await {
                Ok(()) => {
                    let _ = self.stop.send(true);
                    Ok(())
                }
                Err(_) => {
                    tracing::warn!(
                        pending = self.len(),
                        "close timed out before the task queue drained"
                    );
                    let _ = self.stop.send(true);
                    Err(Error::DatabaseCloseTimeout {
                        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                    })
                }
            }
        };

        // Reap the worker so every leftover task has been rejected before
        // close resolves.
        let handle = self
            .worker
            .lock()
            .expect("lock poisoned")
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        result
    }

    async fn wait_drained(&self) {
        loop {
            if self.shared.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            let notified = self.shared.drained.notified();
            if self.shared.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        // Stops an orphaned worker if the queue is dropped without close.
        let _ = self.stop.send(true);
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<QueuedTask>,
    mut stop_rx: watch::Receiver<bool>,
    shared: Arc<Shared>,
) {
    loop {
        tokio::select! {
            biased;
            changed = stop_rx.changed() => {
                match changed {
                    Ok(()) if *stop_rx.borrow() => break,
                    Ok(()) => {}
                    Err(_) => break,
                }
            }
            next = rx.recv() => {
                match next {
                    Some(task) => {
                        execute(task).await;
                        shared.finish_one();
                    }
                    None => break,
                }
            }
        }
    }

    // Closed: reject whatever is still queued.
    rx.close();
    while let Ok(task) = rx.try_recv() {
        let _ = task.reply.send(Err(Error::DatabaseClosing));
        shared.finish_one();
    }
}

/// Run one task to completion on the blocking pool.
///
/// A panic inside the work closure is contained here; it fails that task's
/// future but never takes the worker down with it.
async fn execute(task: QueuedTask) {
    let QueuedTask {
        metadata,
        work,
        reply,
    } = task;

    let outcome = match tokio::task::spawn_blocking(work).await {
        Ok(result) => result,
        Err(join_error) => Err(Error::Git(GitError::Backend {
            message: format!("queued task '{}' panicked: {join_error}", metadata.task_id),
        })),
    };

    // The caller may have dropped its future; that is not an error.
    let _ = reply.send(outcome);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
