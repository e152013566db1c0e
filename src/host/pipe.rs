//! Lifecycle contract between the host and its nodes.

use crate::host::id::NodeId;
use crate::host::main_loop::Scheduler;
use crate::host::message::OutboundPath;
use crate::host::signals::HostSignal;
use crate::host::threads::WorkerThreads;
use crossbeam_channel::Sender;

/// Everything a node may hold on to once it is initialized.
#[derive(Debug, Clone)]
pub struct PipeContext {
    pub node: NodeId,
    pub outbound: OutboundPath,
    pub scheduler: Scheduler,
    pub threads: WorkerThreads,
    pub signals: Sender<HostSignal>,
}

/// A pipeline node as the host drives it.
///
/// `init` and `deinit` run on the loop thread and must not block on script
/// code. Both report success as a boolean; details go to the log and the
/// signal channel.
pub trait LogPipe {
    fn init(&mut self, ctx: &PipeContext) -> bool;

    fn deinit(&mut self) -> bool;

    /// Release the node. Only valid after `deinit`.
    fn free(self)
    where
        Self: Sized,
    {
    }
}
