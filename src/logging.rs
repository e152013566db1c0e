//! Tracing subscriber setup.
//!
//! Console output in the configured format, plus an optional non-blocking
//! log file. `RUST_LOG` overrides the configured filter.

use crate::config::{LogFormat, LoggingSettings};
use crate::error::{LogScriptError, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Install the global subscriber.
///
/// Must be called once, before any tracing macros fire. Keep the returned
/// guard alive for as long as file logging should keep flushing.
pub fn init_tracing(settings: &LoggingSettings) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| {
            LogScriptError::Settings(format!("Invalid log level '{}': {}", settings.level, e))
        })?;

    let console = match settings.format {
        LogFormat::Full => fmt::layer().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    };

    let (file_layer, guard) = match &settings.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path.file_name().ok_or_else(|| {
                LogScriptError::Settings(format!("Log file {:?} has no file name", path))
            })?;
            let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = fmt::layer().with_writer(writer).with_ansi(false).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| {
            LogScriptError::Settings(format!("Failed to initialize tracing subscriber: {}", e))
        })?;

    Ok(guard)
}
