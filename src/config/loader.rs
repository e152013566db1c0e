//! Loading configuration scripts.
//!
//! A configuration script is plain Rhai. Every constructor registered in
//! the [`DriverRegistry`] is callable by name with up to three arguments;
//! each call builds a driver, keeps it, and returns a `Driver` handle to the
//! script:
//!
//! ```rhai
//! let src = ScriptSource(`fn thread_func(s) { post(s, "hello"); }`);
//! let dst = TcpDestination("loghost", #{ port: "514", keep_alive: true });
//! print(dst);   // TcpDestination#1
//! ```

use crate::config::settings::Settings;
use crate::drivers::{Driver, DriverHandle, ScriptArgs};
use crate::error::{ConfigError, ConstructionError, LogScriptError, Result, ResultExt};
use crate::host::NodeId;
use crate::options::Projector;
use crate::registry::{BuildContext, DriverRegistry};
use crate::script_source::DEFAULT_STOP_TIMEOUT;
use rhai::{Dynamic, Engine, EvalAltResult};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Constructors accept at most this many positional arguments.
const MAX_CONSTRUCTOR_ARITY: usize = 3;

/// Nodes built by one configuration script, in construction order.
#[derive(Debug, Default)]
pub struct LoadedConfig {
    pub nodes: Vec<Driver>,
    /// Option values that could not be applied (collect policy only).
    pub config_errors: Vec<ConfigError>,
    /// `(driver, key)` pairs no descriptor matched, in warn mode.
    pub unknown_keys: Vec<(String, String)>,
}

struct LoadState {
    ctx: BuildContext,
    nodes: Vec<Driver>,
    /// First construction failure; survives the script error it causes.
    failure: Option<ConstructionError>,
}

type SharedLoadState = Arc<Mutex<LoadState>>;

fn lock(state: &SharedLoadState) -> MutexGuard<'_, LoadState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoader {
    registry: Arc<DriverRegistry>,
    projector: Projector,
    stop_timeout: Duration,
}

impl ConfigLoader {
    pub fn new(registry: Arc<DriverRegistry>) -> Self {
        Self {
            registry,
            projector: Projector::default(),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    pub fn from_settings(registry: Arc<DriverRegistry>, settings: &Settings) -> Self {
        Self::new(registry)
            .with_projector(settings.projection)
            .with_stop_timeout(settings.script_source.stop_timeout())
    }

    pub fn with_projector(mut self, projector: Projector) -> Self {
        self.projector = projector;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<DriverRegistry> {
        &self.registry
    }

    /// Run a configuration script and collect the nodes it built.
    ///
    /// Any construction failure fails the whole load, even if the script
    /// caught the error and carried on.
    pub fn load_str(&self, script: &str) -> Result<LoadedConfig> {
        let state: SharedLoadState = Arc::new(Mutex::new(LoadState {
            ctx: BuildContext::new(self.projector, self.stop_timeout),
            nodes: Vec::new(),
            failure: None,
        }));

        let mut engine = Engine::new();
        register_handle_type(&mut engine);
        self.install_constructors(&mut engine, &state);

        let result = engine.run(script);
        drop(engine);

        let mut guard = lock(&state);
        if let Some(failure) = guard.failure.take() {
            return Err(LogScriptError::Construction(failure));
        }
        result
            .map_err(LogScriptError::from_rhai_error)
            .context("Configuration script failed")?;

        let loaded = LoadedConfig {
            nodes: std::mem::take(&mut guard.nodes),
            config_errors: std::mem::take(&mut guard.ctx.config_errors),
            unknown_keys: std::mem::take(&mut guard.ctx.unknown_keys),
        };
        tracing::info!(
            "Loaded {} nodes ({} option errors)",
            loaded.nodes.len(),
            loaded.config_errors.len()
        );
        Ok(loaded)
    }

    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<LoadedConfig> {
        let path = path.as_ref();
        let script = std::fs::read_to_string(path)
            .map_err(LogScriptError::from)
            .with_context(|| format!("Failed to read configuration {:?}", path))?;
        self.load_str(&script)
            .context(format!("Failed to load configuration {:?}", path))
    }

    /// Make every registered constructor callable with 0..=3 arguments.
    fn install_constructors(&self, engine: &mut Engine, state: &SharedLoadState) {
        for name in self.registry.names() {
            for arity in 0..=MAX_CONSTRUCTOR_ARITY {
                let call = Constructor {
                    name: name.to_string(),
                    registry: Arc::clone(&self.registry),
                    state: Arc::clone(state),
                };
                match arity {
                    0 => engine.register_fn(name, move || call.invoke(Vec::new())),
                    1 => engine.register_fn(name, move |a: Dynamic| call.invoke(vec![a])),
                    2 => engine.register_fn(name, move |a: Dynamic, b: Dynamic| {
                        call.invoke(vec![a, b])
                    }),
                    _ => engine.register_fn(name, move |a: Dynamic, b: Dynamic, c: Dynamic| {
                        call.invoke(vec![a, b, c])
                    }),
                };
            }
        }
    }
}

/// One script-visible constructor; looks its factory up at call time.
struct Constructor {
    name: String,
    registry: Arc<DriverRegistry>,
    state: SharedLoadState,
}

impl Constructor {
    fn invoke(&self, values: Vec<Dynamic>) -> std::result::Result<DriverHandle, Box<EvalAltResult>> {
        let args = ScriptArgs::new(self.name.clone(), values);
        let mut guard = lock(&self.state);
        let state = &mut *guard;

        match self.registry.construct(&self.name, &args, &mut state.ctx) {
            Ok(driver) => {
                let handle = DriverHandle {
                    id: NodeId(state.nodes.len() as u32),
                    kind: driver.kind(),
                };
                state.nodes.push(driver);
                Ok(handle)
            }
            Err(err) => {
                tracing::error!("{}", err);
                let message = err.to_string();
                state.failure.get_or_insert(err);
                Err(message.into())
            }
        }
    }
}

fn register_handle_type(engine: &mut Engine) {
    engine
        .register_type_with_name::<DriverHandle>("Driver")
        .register_get("id", |h: &mut DriverHandle| h.id.0 as i64)
        .register_get("kind", |h: &mut DriverHandle| {
            h.kind.constructor_name().to_string()
        })
        .register_fn("to_string", |h: &mut DriverHandle| h.to_string());

    engine.on_print(|text| tracing::info!(target: "logscript::script", "{}", text));
    engine.on_debug(|text, source, pos| {
        tracing::debug!(target: "logscript::script", "{} @ {:?} {}", text, source, pos)
    });
}
