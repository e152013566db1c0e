//! Diagnostics flowing from nodes and worker threads to the loop thread.

use crate::error::RuntimeScriptError;
use crate::host::id::NodeId;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Channel capacity for host signals (workers → loop thread).
pub const SIGNAL_CHANNEL_CAPACITY: usize = 256;

/// Default capacity of the outbound message queue.
/// 10,000 messages ≈ 10s of a busy source at 1kHz.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// How a script source's worker thread ended.
#[derive(Debug, Clone)]
pub enum ExitReason {
    /// The entry function returned.
    Returned,
    /// The worker observed cancellation and unwound.
    Cancelled,
    /// The script raised an error; the source stops producing.
    Failed(RuntimeScriptError),
}

impl ExitReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, ExitReason::Failed(_))
    }
}

/// Messages sent to the loop thread.
#[derive(Debug, Clone)]
pub enum HostSignal {
    /// A script source's worker thread is running.
    SourceStarted { node: NodeId },

    /// A script source's worker thread has finished.
    SourceStopped { node: NodeId, reason: ExitReason },

    /// A node could not be started or stopped cleanly.
    LifecycleFault { node: NodeId, message: String },
}

impl HostSignal {
    pub fn node(&self) -> NodeId {
        match self {
            HostSignal::SourceStarted { node }
            | HostSignal::SourceStopped { node, .. }
            | HostSignal::LifecycleFault { node, .. } => *node,
        }
    }
}

/// Create the signal channel pair.
pub fn signal_channel() -> (Sender<HostSignal>, Receiver<HostSignal>) {
    bounded(SIGNAL_CHANNEL_CAPACITY)
}

/// Send a signal without ever blocking the sender.
///
/// A full or closed channel drops the signal with a warning.
pub fn emit(tx: &Sender<HostSignal>, signal: HostSignal) {
    match tx.try_send(signal) {
        Ok(()) => {}
        Err(TrySendError::Full(signal)) => {
            tracing::warn!("Signal channel full, dropping {:?}", signal);
        }
        Err(TrySendError::Disconnected(signal)) => {
            tracing::debug!("Signal channel closed, dropping {:?}", signal);
        }
    }
}
