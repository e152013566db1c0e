//! Interpreter owned by one script source, and the natives it exposes.
//!
//! Natives available to the script:
//! - `post(source, payload)` - emit one event; the payload is rendered to a string
//! - `sleep(ms)` - sleep, waking early when the source is stopped
//! - `is_cancelled()` - whether the source has been asked to stop
//!
//! The `source` argument is a `ScriptSource` value with `name` and `id`
//! getters.

use crate::error::{ConstructionError, RuntimeScriptError};
use crate::host::{ExitReason, LogMessage, NodeId, OutboundPath, ProducerMark, QueueError, Rejected};
use crate::script_source::cancel::CancelToken;
use rhai::{Dynamic, Engine, EvalAltResult, Position, Scope, AST};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Name of the function the worker thread calls.
pub const ENTRY_POINT: &str = "thread_func";

/// How long `post` waits on a full queue before rechecking cancellation.
const POST_RETRY: Duration = Duration::from_millis(50);

struct Binding {
    node: NodeId,
    outbound: OutboundPath,
}

/// State shared between the node, its worker and the script natives.
pub(crate) struct BridgeState {
    pub(crate) cancel: CancelToken,
    binding: OnceLock<Binding>,
    emitted: AtomicU64,
}

impl BridgeState {
    pub(crate) fn new() -> Self {
        Self {
            cancel: CancelToken::new(),
            binding: OnceLock::new(),
            emitted: AtomicU64::new(0),
        }
    }

    /// Attach the node identity and outbound path. Only the first call wins.
    pub(crate) fn bind(&self, node: NodeId, outbound: OutboundPath) -> bool {
        self.binding.set(Binding { node, outbound }).is_ok()
    }

    pub(crate) fn node(&self) -> NodeId {
        self.binding.get().map_or(NodeId::INVALID, |b| b.node)
    }

    pub(crate) fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    fn post(&self, payload: String) -> Result<(), Box<EvalAltResult>> {
        let binding = self
            .binding
            .get()
            .ok_or_else(|| Box::<EvalAltResult>::from("post() on a source that is not initialized"))?;

        let mut message = LogMessage::new(payload).with_producer(binding.node);
        let _mark = ProducerMark::start(binding.node);
        loop {
            if self.cancel.is_cancelled() {
                return Err(terminated());
            }
            match binding.outbound.queue_timeout(message, POST_RETRY) {
                Ok(()) => {
                    self.emitted.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }
                Err(Rejected {
                    reason: QueueError::Full,
                    message: returned,
                }) => message = returned,
                Err(Rejected {
                    reason: QueueError::Closed,
                    ..
                }) => return Err("outbound path is closed".into()),
            }
        }
    }
}

fn terminated() -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorTerminated(
        Dynamic::from("cancelled"),
        Position::NONE,
    ))
}

fn is_termination(err: &EvalAltResult) -> bool {
    match err {
        EvalAltResult::ErrorTerminated(..) => true,
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => is_termination(inner),
        _ => false,
    }
}

/// The script's view of its own source node.
#[derive(Clone)]
pub struct SourceHandle {
    state: Arc<BridgeState>,
}

impl SourceHandle {
    pub(crate) fn new(state: Arc<BridgeState>) -> Self {
        Self { state }
    }

    pub fn node(&self) -> NodeId {
        self.state.node()
    }

    pub fn name(&self) -> String {
        format!("ScriptSource#{}", self.node().0)
    }
}

/// Rhai engine plus the compiled script of one script source.
pub struct Interpreter {
    engine: Engine,
    ast: AST,
}

impl Interpreter {
    /// Compile `code` and check that it defines the entry point.
    pub(crate) fn compile(code: &str, state: &Arc<BridgeState>) -> Result<Self, ConstructionError> {
        let mut engine = Engine::new();
        configure_engine(&mut engine, state);

        let ast = engine
            .compile(code)
            .map_err(|e| ConstructionError::ScriptCompile(e.to_string()))?;

        let has_entry = ast
            .iter_functions()
            .any(|f| f.name == ENTRY_POINT && f.params.len() == 1);
        if !has_entry {
            return Err(ConstructionError::MissingEntryPoint { name: ENTRY_POINT });
        }

        Ok(Self { engine, ast })
    }

    /// Call the entry point with `handle` and classify how it ended.
    pub fn run(&self, handle: SourceHandle) -> ExitReason {
        let node = handle.node();
        let cancel = handle.state.cancel.clone();
        if cancel.is_cancelled() {
            return ExitReason::Cancelled;
        }
        let mut scope = Scope::new();
        match self
            .engine
            .call_fn::<Dynamic>(&mut scope, &self.ast, ENTRY_POINT, (handle,))
        {
            Ok(_) => ExitReason::Returned,
            Err(err) if is_termination(&err) || cancel.is_cancelled() => ExitReason::Cancelled,
            Err(err) => ExitReason::Failed(RuntimeScriptError {
                node,
                message: err.to_string(),
            }),
        }
    }
}

fn configure_engine(engine: &mut Engine, state: &Arc<BridgeState>) {
    engine.set_max_expr_depths(64, 64);
    engine.set_max_call_levels(64);
    engine.set_max_string_size(1 << 20);

    engine
        .register_type_with_name::<SourceHandle>("ScriptSource")
        .register_get("name", |h: &mut SourceHandle| h.name())
        .register_get("id", |h: &mut SourceHandle| h.node().0 as i64)
        .register_fn("to_string", |h: &mut SourceHandle| h.name());

    engine.register_fn(
        "post",
        |h: &mut SourceHandle, payload: Dynamic| -> Result<(), Box<EvalAltResult>> {
            h.state.post(payload.to_string())
        },
    );

    {
        let cancel = state.cancel.clone();
        engine.register_fn("sleep", move |ms: i64| -> Result<(), Box<EvalAltResult>> {
            let ms = u64::try_from(ms).unwrap_or(0);
            if cancel.sleep(Duration::from_millis(ms)) {
                Ok(())
            } else {
                Err(terminated())
            }
        });
    }
    {
        let cancel = state.cancel.clone();
        engine.register_fn("is_cancelled", move || cancel.is_cancelled());
    }

    // Interrupts scripts that loop without ever calling a native.
    let cancel = state.cancel.clone();
    engine.on_progress(move |_ops| {
        if cancel.is_cancelled() {
            Some(Dynamic::from("cancelled"))
        } else {
            None
        }
    });
}
