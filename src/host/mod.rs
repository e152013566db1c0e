//! Integration shim standing in for the host pipeline engine.
//!
//! The host owns the constructed nodes, hands each one an outbound path and
//! a [`PipeContext`], and drives their lifecycle from a single loop thread:
//!
//! - [`PipelineHost::init_all`] initializes nodes in registration order
//! - [`MainLoop::run_pending`] runs deferred starts
//! - [`PipelineHost::deinit_all`] tears nodes down in reverse order
//!
//! Queues, delivery and real I/O are out of scope; delivered messages are
//! simply readable from [`PipelineHost::messages`].

pub mod id;
pub mod main_loop;
pub mod message;
pub mod pipe;
pub mod signals;
pub mod threads;

pub use id::NodeId;
pub use main_loop::{MainLoop, Scheduler};
pub use message::{LogMessage, OutboundPath, ProducerMark, QueueError, Rejected};
pub use pipe::{LogPipe, PipeContext};
pub use signals::{emit, ExitReason, HostSignal, DEFAULT_QUEUE_CAPACITY};
pub use threads::{WorkerHandle, WorkerThreads};

use crate::drivers::Driver;
use crate::error::LifecycleError;
use crossbeam_channel::{bounded, Receiver, Sender};

struct HostedNode {
    driver: Driver,
    initialized: bool,
}

pub struct PipelineHost {
    nodes: Vec<HostedNode>,
    main_loop: MainLoop,
    threads: WorkerThreads,
    outbound_tx: Sender<LogMessage>,
    outbound_rx: Receiver<LogMessage>,
}

impl PipelineHost {
    pub fn new(queue_capacity: usize) -> Self {
        let (outbound_tx, outbound_rx) = bounded(queue_capacity.max(1));
        Self {
            nodes: Vec::new(),
            main_loop: MainLoop::new(),
            threads: WorkerThreads::new(),
            outbound_tx,
            outbound_rx,
        }
    }

    /// Take ownership of a node. Ids follow registration order.
    pub fn register(&mut self, driver: Driver) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        tracing::debug!("Registered {} as {}", driver.kind(), id);
        self.nodes.push(HostedNode {
            driver,
            initialized: false,
        });
        id
    }

    pub fn register_all(&mut self, drivers: impl IntoIterator<Item = Driver>) -> Vec<NodeId> {
        drivers.into_iter().map(|d| self.register(d)).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Driver> {
        self.nodes.get(id.index()).map(|n| &n.driver)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Driver> {
        self.nodes.get_mut(id.index()).map(|n| &mut n.driver)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Driver)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), &n.driver))
    }

    pub fn main_loop(&self) -> &MainLoop {
        &self.main_loop
    }

    pub fn threads(&self) -> &WorkerThreads {
        &self.threads
    }

    /// Messages delivered by every node, in hand-off order per producer.
    pub fn messages(&self) -> &Receiver<LogMessage> {
        &self.outbound_rx
    }

    pub fn drain_messages(&self) -> Vec<LogMessage> {
        self.outbound_rx.try_iter().collect()
    }

    fn context(&self, node: NodeId) -> PipeContext {
        PipeContext {
            node,
            outbound: OutboundPath::new(self.outbound_tx.clone()),
            scheduler: self.main_loop.scheduler(),
            threads: self.threads.clone(),
            signals: self.main_loop.signal_sender(),
        }
    }

    /// Initialize every node in registration order.
    ///
    /// An optional node that fails is skipped with a warning. Any other
    /// failure tears down the nodes initialized so far.
    pub fn init_all(&mut self) -> Result<(), LifecycleError> {
        for index in 0..self.nodes.len() {
            let id = NodeId(index as u32);
            let ctx = self.context(id);
            let node = &mut self.nodes[index];
            if node.initialized {
                continue;
            }
            if node.driver.init(&ctx) {
                node.initialized = true;
                continue;
            }

            let kind = node.driver.kind();
            if node.driver.is_optional() {
                tracing::warn!("Optional {} {} failed to initialize, skipping", kind, id);
                continue;
            }
            self.deinit_all();
            return Err(LifecycleError::InitFailed {
                node: id,
                driver: kind.constructor_name(),
            });
        }
        tracing::info!("Initialized {} nodes", self.nodes.len());
        Ok(())
    }

    /// Deinitialize initialized nodes in reverse order.
    ///
    /// Returns `false` if any node reported a failure; teardown continues
    /// past failures.
    pub fn deinit_all(&mut self) -> bool {
        let mut ok = true;
        for (index, node) in self.nodes.iter_mut().enumerate().rev() {
            if !node.initialized {
                continue;
            }
            node.initialized = false;
            if !node.driver.deinit() {
                tracing::warn!("{} {} failed to deinitialize", node.driver.kind(), NodeId(index as u32));
                ok = false;
            }
        }
        ok
    }
}

impl Default for PipelineHost {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl Drop for PipelineHost {
    fn drop(&mut self) {
        if self.nodes.iter().any(|n| n.initialized) {
            self.deinit_all();
        }
    }
}
