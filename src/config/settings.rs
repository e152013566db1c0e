//! Runtime settings for the logscript binary and library
//!
//! Settings control how configuration scripts are loaded and how nodes are
//! run; they are separate from the configuration script itself.
//!
//! # Main Types
//!
//! - [`Settings`] - Root of the settings file
//! - [`ScriptSourceSettings`] - Script source worker behaviour
//! - [`HostSettings`] - Queue sizing of the host shim
//! - [`LoggingSettings`] - Log filter, format and optional log file
//!
//! # File format
//!
//! TOML or JSON, chosen by file extension:
//!
//! ```toml
//! [projection]
//! policy = "collect"        # or "fail_fast"
//! unknown_keys = "warn"     # or "ignore"
//!
//! [script_source]
//! stop_timeout_ms = 2000
//!
//! [logging]
//! level = "info,logscript=debug"
//! format = "compact"
//! ```

use crate::error::{LogScriptError, Result};
use crate::host::DEFAULT_QUEUE_CAPACITY;
use crate::options::Projector;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name under the platform config directory
pub const APP_DIR: &str = "logscript";

/// Default settings file name
pub const SETTINGS_FILE: &str = "settings.toml";

/// Root settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Error and unknown-key policy for option projection
    pub projection: Projector,
    pub script_source: ScriptSourceSettings,
    pub host: HostSettings,
    pub logging: LoggingSettings,
}

/// Script source worker behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptSourceSettings {
    /// How long deinit waits for a worker thread before giving up on it
    pub stop_timeout_ms: u64,
}

impl ScriptSourceSettings {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

impl Default for ScriptSourceSettings {
    fn default() -> Self {
        Self {
            stop_timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// Capacity of the outbound message queue
    pub queue_capacity: usize,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Output format of the log subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence when set
    pub level: String,
    pub format: LogFormat,
    /// Also write logs to this file
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info,logscript=debug".to_string(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

/// Platform config directory for logscript, e.g. `~/.config/logscript`
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_DIR))
}

/// Default settings file location
pub fn default_settings_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(SETTINGS_FILE))
}

impl Settings {
    /// Load settings from a TOML or JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LogScriptError::Settings(format!("Failed to read settings file {:?}: {}", path, e))
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(content).map_err(|e| {
                LogScriptError::Settings(format!("Failed to parse settings {:?}: {}", path, e))
            })
        } else {
            toml::from_str(content).map_err(|e| {
                LogScriptError::Settings(format!("Failed to parse settings {:?}: {}", path, e))
            })
        }
    }

    /// Load from `path`, or the default location when `None`.
    ///
    /// A missing default file yields defaults; a missing explicit file is an
    /// error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match default_settings_path() {
                Some(path) if path.exists() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Save settings as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                LogScriptError::Settings(format!("Failed to create settings directory: {}", e))
            })?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| LogScriptError::Settings(format!("Failed to serialize settings: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            LogScriptError::Settings(format!("Failed to write settings file {:?}: {}", path, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ProjectionPolicy, UnknownKeys};

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.projection.policy, ProjectionPolicy::Collect);
        assert_eq!(settings.projection.unknown_keys, UnknownKeys::Ignore);
        assert_eq!(settings.script_source.stop_timeout(), Duration::from_secs(2));
        assert_eq!(settings.host.queue_capacity, 10_000);
    }

    #[test]
    fn test_partial_toml() {
        let settings: Settings = toml::from_str(
            r#"
            [projection]
            policy = "fail_fast"

            [logging]
            format = "pretty"
            "#,
        )
        .unwrap();
        assert_eq!(settings.projection.policy, ProjectionPolicy::FailFast);
        assert_eq!(settings.projection.unknown_keys, UnknownKeys::Ignore);
        assert_eq!(settings.logging.format, LogFormat::Pretty);
        assert_eq!(settings.logging.level, "info,logscript=debug");
    }

    #[test]
    fn test_json_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "projection": { "unknown_keys": "warn" }, "host": { "queue_capacity": 16 } }"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.projection.unknown_keys, UnknownKeys::Warn);
        assert_eq!(settings.host.queue_capacity, 16);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");
        let mut settings = Settings::default();
        settings.script_source.stop_timeout_ms = 250;
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Settings::load_or_default(Some(&missing)).is_err());
    }
}
