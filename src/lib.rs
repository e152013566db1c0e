//! # logscript: script-configured log pipeline drivers
//!
//! An embedding layer that lets a log pipeline be configured and extended
//! from Rhai scripts. Configuration scripts call constructors such as
//! `TcpDestination("loghost", #{ port: "514" })` to build pipeline nodes; a
//! `ScriptSource` runs user script code on a worker thread as an event
//! producer.
//!
//! ## Architecture
//!
//! - **Options**: typed descriptors, schema composition and the projection
//!   of script maps onto native driver configuration
//! - **Drivers**: socket, file and script drivers, built through the
//!   factory registry
//! - **Script source**: the worker-thread bridge between script code and
//!   the host pipeline
//! - **Host**: the lifecycle shim (main loop, outbound path, worker threads)
//! - **Communication**: Crossbeam channels for messages and diagnostics
//!
//! ## Example
//!
//! ```no_run
//! use logscript::{registry, ConfigLoader, PipelineHost};
//!
//! # fn main() -> logscript::Result<()> {
//! let loader = ConfigLoader::new(registry::global());
//! let loaded = loader.load_str(r#"
//!     ScriptSource(`fn thread_func(s) { post(s, "hello"); }`);
//! "#)?;
//!
//! let mut host = PipelineHost::default();
//! host.register_all(loaded.nodes);
//! host.init_all()?;
//! host.main_loop().run_pending();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod drivers;
pub mod error;
pub mod host;
pub mod logging;
pub mod options;
pub mod registry;
pub mod script_source;

// Re-export commonly used types
pub use config::{ConfigLoader, LoadedConfig, Settings};
pub use drivers::{Driver, DriverHandle, DriverKind};
pub use error::{LogScriptError, Result};
pub use host::{ExitReason, HostSignal, LogMessage, NodeId, PipelineHost};
pub use options::{OptionSchema, Projector};
pub use registry::DriverRegistry;
pub use script_source::ScriptSource;
