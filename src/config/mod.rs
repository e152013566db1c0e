//! Configuration for logscript
//!
//! Two kinds of configuration live here:
//! - **Configuration scripts** ([`loader`]) - Rhai programs that construct
//!   pipeline nodes through the driver registry
//! - **Settings** ([`settings`]) - TOML/JSON file controlling projection
//!   policy, script source shutdown, queue sizing and logging
//!
//! # Settings Location
//!
//! Unless a path is given explicitly, settings are read from the platform
//! config directory:
//! - **Linux**: `~/.config/logscript/settings.toml`
//! - **macOS**: `~/Library/Application Support/logscript/settings.toml`
//! - **Windows**: `%APPDATA%\logscript\settings.toml`

pub mod loader;
pub mod settings;

pub use loader::{ConfigLoader, LoadedConfig};
pub use settings::{
    default_settings_path, HostSettings, LogFormat, LoggingSettings, ScriptSourceSettings,
    Settings,
};
