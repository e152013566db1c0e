//! Worker thread primitive.
//!
//! The host is the only place that creates OS threads. Each worker carries
//! a completion guard that fires when its closure returns or unwinds, which
//! lets the owner wait for it with a deadline instead of an unbounded join.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Spawns named worker threads and counts the live ones.
#[derive(Debug, Clone, Default)]
pub struct WorkerThreads {
    live: Arc<AtomicUsize>,
}

/// Dropped on the worker thread when its closure finishes.
struct CompletionGuard {
    live: Arc<AtomicUsize>,
    _done: Sender<()>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl WorkerThreads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of workers whose closure has not finished yet.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn spawn<F>(&self, name: impl Into<String>, f: F) -> io::Result<WorkerHandle>
    where
        F: FnOnce() + Send + 'static,
    {
        let name = name.into();
        let (done_tx, done_rx) = bounded::<()>(0);
        let live = Arc::clone(&self.live);

        live.fetch_add(1, Ordering::SeqCst);
        let guard = CompletionGuard {
            live: Arc::clone(&live),
            _done: done_tx,
        };

        let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
            let _guard = guard;
            f();
        });

        match spawned {
            Ok(join) => {
                tracing::debug!("Spawned worker thread '{}'", name);
                Ok(WorkerHandle {
                    name,
                    join: Some(join),
                    done: done_rx,
                })
            }
            // The closure (and its guard) was dropped by the failed spawn.
            Err(e) => Err(e),
        }
    }
}

/// Owner's side of one worker thread.
#[derive(Debug)]
pub struct WorkerHandle {
    name: String,
    join: Option<JoinHandle<()>>,
    done: Receiver<()>,
}

impl WorkerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |j| j.is_finished())
    }

    /// Wait up to `timeout` for the worker to finish, then join it.
    ///
    /// Returns `false` if the worker is still running at the deadline; the
    /// handle stays valid and may be waited on again or detached.
    pub fn join_timeout(&mut self, timeout: Duration) -> bool {
        match self.done.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => false,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Some(join) = self.join.take() {
                    if join.join().is_err() {
                        tracing::warn!("Worker thread '{}' panicked", self.name);
                    }
                }
                true
            }
        }
    }

    /// Give up on the worker; it keeps running until its closure returns.
    pub fn detach(mut self) {
        if self.join.take().is_some() {
            tracing::warn!("Detached worker thread '{}'", self.name);
        }
    }
}
