//! Error handling for logscript
//!
//! This module defines the error taxonomy shared by the configuration
//! loader, the driver factories and the script source bridge, together with
//! a Result alias for use throughout the crate.
//!
//! - [`ConstructionError`] - a driver could not be built at all
//! - [`ConfigError`] - one option value could not be applied
//! - [`RuntimeScriptError`] - a running script failed
//! - [`LifecycleError`] - a node could not be started or stopped cleanly

use crate::host::NodeId;
use std::time::Duration;
use thiserror::Error;

pub use crate::options::{ConfigError, ValueError};

/// A driver could not be constructed; the node is never created.
#[derive(Error, Debug)]
pub enum ConstructionError {
    #[error("{driver}: missing required argument #{position} ({what})")]
    MissingArgument {
        driver: String,
        position: usize,
        what: &'static str,
    },

    #[error("{driver}: argument #{position} must be {expected}, got {found}")]
    InvalidArgument {
        driver: String,
        position: usize,
        expected: &'static str,
        found: String,
    },

    #[error("{driver}: expected at most {max} arguments, got {found}")]
    TooManyArguments {
        driver: String,
        max: usize,
        found: usize,
    },

    #[error("Unknown driver constructor '{0}'")]
    UnknownDriver(String),

    #[error("Script compile error: {0}")]
    ScriptCompile(String),

    #[error("Script does not define entry point `fn {name}(source)`")]
    MissingEntryPoint { name: &'static str },

    /// Option projection aborted construction (fail-fast policy)
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A script failed while running inside a script source.
#[derive(Error, Debug, Clone)]
#[error("Script source {node}: {message}")]
pub struct RuntimeScriptError {
    pub node: NodeId,
    pub message: String,
}

/// A node could not be started or stopped within its lifecycle rules.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Worker thread of {node} did not stop within {timeout:?}")]
    StopTimeout { node: NodeId, timeout: Duration },

    #[error("Failed to spawn worker thread for {node}: {source}")]
    SpawnFailed {
        node: NodeId,
        #[source]
        source: std::io::Error,
    },

    #[error("{driver} {node} failed to initialize")]
    InitFailed { node: NodeId, driver: &'static str },

    #[error("{node}: cannot {operation} while {state}")]
    InvalidState {
        node: NodeId,
        operation: &'static str,
        state: &'static str,
    },
}

/// Main error type for logscript operations
#[derive(Error, Debug)]
pub enum LogScriptError {
    #[error("Construction error: {0}")]
    Construction(#[from] ConstructionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Runtime script error: {0}")]
    RuntimeScript(#[from] RuntimeScriptError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Errors raised by the configuration script itself
    #[error("Script error: {0}")]
    Script(String),

    /// Errors related to settings files
    #[error("Settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<LogScriptError>,
    },
}

impl LogScriptError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        LogScriptError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a script error from a Rhai error
    pub fn from_rhai_error(err: Box<rhai::EvalAltResult>) -> Self {
        LogScriptError::Script(err.to_string())
    }
}

/// Result type alias for logscript operations
pub type Result<T> = std::result::Result<T, LogScriptError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
