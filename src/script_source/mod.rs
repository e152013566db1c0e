//! Script source: user script code as a long-lived event producer.
//!
//! Lifecycle: `Constructed → Initialized → Running → Deinitialized`.
//!
//! - Construction compiles the script and checks for `fn thread_func(source)`.
//! - `init` binds the outbound path and defers the start onto the main loop;
//!   it never runs script code.
//! - The deferred start spawns the worker thread, which holds the
//!   interpreter lock for as long as the entry function runs.
//! - `deinit` fires the cancel token, joins the worker with a deadline and
//!   releases the interpreter. A worker that misses the deadline is
//!   detached and reported as a lifecycle fault; it keeps its own reference
//!   to the interpreter until it exits.

pub mod cancel;
pub mod runtime;

pub use cancel::CancelToken;
pub use runtime::{Interpreter, SourceHandle, ENTRY_POINT};

use crate::drivers::capability::SourceCapable;
use crate::drivers::common::SourceOptions;
use crate::error::{ConstructionError, LifecycleError};
use crate::host::{emit, ExitReason, HostSignal, LogPipe, NodeId, PipeContext, WorkerHandle};
use crate::options::compose::source_options;
use crate::options::OptionSchema;
use crossbeam_channel::Sender;
use runtime::BridgeState;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

/// Default bound on how long `deinit` waits for the worker.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Constructed,
    Initialized,
    Running,
    Deinitialized,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Constructed => "constructed",
            Phase::Initialized => "initialized",
            Phase::Running => "running",
            Phase::Deinitialized => "deinitialized",
        }
    }
}

struct Control {
    phase: Phase,
    /// Released at deinit; the running worker holds its own clone.
    interpreter: Option<Arc<Mutex<Interpreter>>>,
    worker: Option<WorkerHandle>,
    signals: Option<Sender<HostSignal>>,
}

struct Inner {
    state: Arc<BridgeState>,
    control: Mutex<Control>,
}

impl Inner {
    fn control(&self) -> MutexGuard<'_, Control> {
        match self.control.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

pub struct ScriptSource {
    pub source: SourceOptions,
    stop_timeout: Duration,
    inner: Arc<Inner>,
}

impl ScriptSource {
    /// Compile `code` into a new, not yet initialized source.
    pub fn new(code: &str) -> Result<Self, ConstructionError> {
        let state = Arc::new(BridgeState::new());
        let interpreter = Interpreter::compile(code, &state)?;
        Ok(Self {
            source: SourceOptions::default(),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            inner: Arc::new(Inner {
                state,
                control: Mutex::new(Control {
                    phase: Phase::Constructed,
                    interpreter: Some(Arc::new(Mutex::new(interpreter))),
                    worker: None,
                    signals: None,
                }),
            }),
        })
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn schema() -> OptionSchema<Self> {
        source_options::<Self>()
    }

    pub fn phase(&self) -> Phase {
        self.inner.control().phase
    }

    pub fn node(&self) -> NodeId {
        self.inner.state.node()
    }

    /// Events handed to the outbound path so far.
    pub fn emitted(&self) -> u64 {
        self.inner.state.emitted()
    }

    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    /// Cancel the worker and wait for it, at most `stop_timeout`.
    pub fn stop(&mut self) -> Result<(), LifecycleError> {
        let node = self.node();
        let mut control = self.inner.control();
        let previous = control.phase;
        match previous {
            Phase::Constructed | Phase::Deinitialized => {
                return Err(LifecycleError::InvalidState {
                    node,
                    operation: "deinit",
                    state: previous.as_str(),
                });
            }
            Phase::Initialized | Phase::Running => {}
        }

        control.phase = Phase::Deinitialized;
        self.inner.state.cancel.cancel();
        let worker = control.worker.take();
        let interpreter = control.interpreter.take();
        drop(control);

        // Initialized: the deferred start has not run and will now skip.
        let Some(mut worker) = worker else {
            drop(interpreter);
            tracing::info!("ScriptSource {}: stopped before start", node);
            return Ok(());
        };

        let joined = worker.join_timeout(self.stop_timeout);
        drop(interpreter);
        if joined {
            tracing::info!("ScriptSource {}: worker joined, interpreter released", node);
            Ok(())
        } else {
            worker.detach();
            Err(LifecycleError::StopTimeout {
                node,
                timeout: self.stop_timeout,
            })
        }
    }

    fn start(weak: &Weak<Inner>, ctx: &PipeContext) {
        let Some(inner) = weak.upgrade() else {
            tracing::debug!("ScriptSource {}: freed before deferred start", ctx.node);
            return;
        };
        let mut control = inner.control();
        if control.phase != Phase::Initialized {
            tracing::debug!(
                "ScriptSource {}: skipping deferred start while {}",
                ctx.node,
                control.phase.as_str()
            );
            return;
        }

        let node = ctx.node;
        let Some(interpreter) = control.interpreter.clone() else {
            tracing::warn!("ScriptSource {}: no interpreter to start", node);
            return;
        };
        let state = Arc::clone(&inner.state);
        let signals = ctx.signals.clone();
        let spawned = ctx.threads.spawn(format!("script-source-{}", node.0), move || {
            run_worker(node, interpreter, state, signals)
        });

        match spawned {
            Ok(handle) => {
                control.worker = Some(handle);
                control.phase = Phase::Running;
                tracing::info!("ScriptSource {}: worker started", node);
                emit(&ctx.signals, HostSignal::SourceStarted { node });
            }
            Err(source) => {
                let err = LifecycleError::SpawnFailed { node, source };
                tracing::error!("{}", err);
                emit(
                    &ctx.signals,
                    HostSignal::LifecycleFault {
                        node,
                        message: err.to_string(),
                    },
                );
            }
        }
    }
}

fn run_worker(
    node: NodeId,
    interpreter: Arc<Mutex<Interpreter>>,
    state: Arc<BridgeState>,
    signals: Sender<HostSignal>,
) {
    let reason = {
        let guard = match interpreter.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.run(SourceHandle::new(state))
    };

    match &reason {
        ExitReason::Returned => tracing::info!("ScriptSource {}: {} returned", node, ENTRY_POINT),
        ExitReason::Cancelled => tracing::info!("ScriptSource {}: cancelled", node),
        ExitReason::Failed(err) => tracing::error!("{}", err),
    }
    emit(&signals, HostSignal::SourceStopped { node, reason });
}

impl LogPipe for ScriptSource {
    fn init(&mut self, ctx: &PipeContext) -> bool {
        let mut control = self.inner.control();
        if control.phase != Phase::Constructed {
            tracing::warn!(
                "ScriptSource {}: init while {}",
                ctx.node,
                control.phase.as_str()
            );
            return false;
        }
        if !self.inner.state.bind(ctx.node, ctx.outbound.clone()) {
            tracing::warn!("ScriptSource {}: already bound", ctx.node);
            return false;
        }

        control.phase = Phase::Initialized;
        control.signals = Some(ctx.signals.clone());
        drop(control);

        let weak = Arc::downgrade(&self.inner);
        let deferred = ctx.clone();
        ctx.scheduler.defer(move || ScriptSource::start(&weak, &deferred));
        tracing::debug!("ScriptSource {}: start deferred", ctx.node);
        true
    }

    fn deinit(&mut self) -> bool {
        match self.stop() {
            Ok(()) => true,
            Err(err) => {
                tracing::error!("{}", err);
                if let LifecycleError::StopTimeout { node, .. } = &err {
                    if let Some(signals) = &self.inner.control().signals {
                        emit(
                            signals,
                            HostSignal::LifecycleFault {
                                node: *node,
                                message: err.to_string(),
                            },
                        );
                    }
                }
                false
            }
        }
    }
}

impl Drop for ScriptSource {
    fn drop(&mut self) {
        // A running worker must not outlive its node unasked.
        if self.phase() == Phase::Running {
            self.inner.state.cancel.cancel();
        }
    }
}

impl SourceCapable for ScriptSource {
    fn source_options(&mut self) -> &mut SourceOptions {
        &mut self.source
    }
}

impl std::fmt::Debug for ScriptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptSource")
            .field("node", &self.node())
            .field("phase", &self.phase())
            .field("emitted", &self.emitted())
            .finish()
    }
}
