//! Single-threaded cooperative main loop.
//!
//! Control operations (init, deinit, deferred starts) run on the thread that
//! drives the loop. Other threads only talk to it through the task queue and
//! the signal channel.

use crate::host::signals::{signal_channel, HostSignal};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Handle for deferring work onto the loop thread.
#[derive(Clone)]
pub struct Scheduler {
    tx: Sender<Task>,
}

impl Scheduler {
    /// Run `task` once, on the loop thread, at the next `run_pending`.
    pub fn defer<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tx.send(Box::new(task)).is_err() {
            tracing::warn!("Main loop is gone, deferred task dropped");
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending", &self.tx.len())
            .finish()
    }
}

pub struct MainLoop {
    scheduler: Scheduler,
    tasks: Receiver<Task>,
    signal_tx: Sender<HostSignal>,
    signal_rx: Receiver<HostSignal>,
}

impl MainLoop {
    pub fn new() -> Self {
        let (tx, tasks) = unbounded();
        let (signal_tx, signal_rx) = signal_channel();
        Self {
            scheduler: Scheduler { tx },
            tasks,
            signal_tx,
            signal_rx,
        }
    }

    pub fn scheduler(&self) -> Scheduler {
        self.scheduler.clone()
    }

    pub fn signal_sender(&self) -> Sender<HostSignal> {
        self.signal_tx.clone()
    }

    /// Run every deferred task queued so far. Returns how many ran.
    ///
    /// Tasks queued by a running task are picked up in the same call.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.tasks.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Drain all pending signals.
    pub fn drain_signals(&self) -> Vec<HostSignal> {
        self.signal_rx.try_iter().collect()
    }

    /// Wait up to `timeout` for the next signal.
    pub fn wait_signal(&self, timeout: Duration) -> Option<HostSignal> {
        match self.signal_rx.recv_timeout(timeout) {
            Ok(signal) => Some(signal),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Run pending tasks and collect signals until `deadline` passes or
    /// `until` accepts a signal.
    pub fn run_until<F>(&self, deadline: Instant, mut until: F) -> Vec<HostSignal>
    where
        F: FnMut(&HostSignal) -> bool,
    {
        let mut seen = Vec::new();
        loop {
            self.run_pending();
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let slice = (deadline - now).min(Duration::from_millis(50));
            if let Some(signal) = self.wait_signal(slice) {
                let stop = until(&signal);
                seen.push(signal);
                if stop {
                    break;
                }
            }
        }
        seen
    }
}

impl Default for MainLoop {
    fn default() -> Self {
        Self::new()
    }
}
