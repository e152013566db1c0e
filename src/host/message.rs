//! Log messages and the outbound path they travel on.

use crate::host::id::NodeId;
use chrono::{DateTime, Utc};
use crossbeam_channel::{SendTimeoutError, Sender};
use serde::Serialize;
use std::cell::Cell;
use std::time::Duration;

/// One event handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogMessage {
    pub payload: String,
    /// Node that produced the message; `None` for host-internal messages.
    pub producer: Option<NodeId>,
    pub timestamp: DateTime<Utc>,
}

impl LogMessage {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            producer: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_producer(mut self, producer: NodeId) -> Self {
        self.producer = Some(producer);
        self
    }
}

thread_local! {
    static CURRENT_PRODUCER: Cell<Option<NodeId>> = const { Cell::new(None) };
}

/// Marks the current thread as producing on behalf of a node.
///
/// Messages queued while the mark is held and that carry no producer tag
/// are attributed to the marked node. Marks nest; dropping one restores the
/// previous producer.
#[must_use = "the mark is released when dropped"]
pub struct ProducerMark {
    previous: Option<NodeId>,
}

impl ProducerMark {
    pub fn start(node: NodeId) -> Self {
        let previous = CURRENT_PRODUCER.with(|c| c.replace(Some(node)));
        Self { previous }
    }

    /// Producer marked on this thread, if any.
    pub fn current() -> Option<NodeId> {
        CURRENT_PRODUCER.with(|c| c.get())
    }
}

impl Drop for ProducerMark {
    fn drop(&mut self) {
        CURRENT_PRODUCER.with(|c| c.set(self.previous));
    }
}

/// Why a message was not accepted by the outbound path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The queue stayed full for the whole wait.
    Full,
    /// The pipeline side has gone away.
    Closed,
}

/// A message the outbound path handed back.
#[derive(Debug)]
pub struct Rejected {
    pub reason: QueueError,
    pub message: LogMessage,
}

/// Where a node hands off the messages it produces.
///
/// Hand-off is a synchronous push onto a FIFO channel, so messages queued
/// from one thread keep their order.
#[derive(Debug, Clone)]
pub struct OutboundPath {
    tx: Sender<LogMessage>,
}

impl OutboundPath {
    pub fn new(tx: Sender<LogMessage>) -> Self {
        Self { tx }
    }

    fn attribute(mut message: LogMessage) -> LogMessage {
        if message.producer.is_none() {
            message.producer = ProducerMark::current();
        }
        message
    }

    /// Queue a message, blocking while the queue is full.
    pub fn queue(&self, message: LogMessage) -> Result<(), QueueError> {
        self.tx
            .send(Self::attribute(message))
            .map_err(|_| QueueError::Closed)
    }

    /// Queue a message, waiting at most `timeout` for room.
    pub fn queue_timeout(&self, message: LogMessage, timeout: Duration) -> Result<(), Rejected> {
        self.tx
            .send_timeout(Self::attribute(message), timeout)
            .map_err(|e| match e {
                SendTimeoutError::Timeout(message) => Rejected {
                    reason: QueueError::Full,
                    message,
                },
                SendTimeoutError::Disconnected(message) => Rejected {
                    reason: QueueError::Closed,
                    message,
                },
            })
    }
}
