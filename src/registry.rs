//! Driver factory registry.
//!
//! Maps constructor names to factories. A registry is an ordinary value:
//! build one, register factories during setup, then share it read-only
//! behind an `Arc`. [`global`] is the process-wide default with the
//! built-in drivers, meant for the binary's composition root.

use crate::drivers::{self, Driver, DriverKind, ScriptArgs};
use crate::error::{ConfigError, ConstructionError};
use crate::options::{OptionSchema, Projector};
use crate::script_source::DEFAULT_STOP_TIMEOUT;
use rhai::Map;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Builds one driver from a constructor call.
pub type Factory =
    Arc<dyn Fn(&ScriptArgs, &mut BuildContext) -> Result<Driver, ConstructionError> + Send + Sync>;

/// Per-load state handed to every factory call.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub projector: Projector,
    /// Bound on script source shutdown, applied to every script source built.
    pub stop_timeout: Duration,
    /// Option errors collected under the collect policy.
    pub config_errors: Vec<ConfigError>,
    /// `(driver, key)` pairs no descriptor matched, in warn mode.
    pub unknown_keys: Vec<(String, String)>,
}

impl BuildContext {
    pub fn new(projector: Projector, stop_timeout: Duration) -> Self {
        Self {
            projector,
            stop_timeout,
            config_errors: Vec::new(),
            unknown_keys: Vec::new(),
        }
    }

    /// Project an optional option table onto a freshly built driver.
    pub fn project<T>(
        &mut self,
        driver: &str,
        schema: &OptionSchema<T>,
        table: Option<Map>,
        target: &mut T,
    ) -> Result<(), ConstructionError> {
        let Some(table) = table else {
            return Ok(());
        };
        let report = self.projector.project(driver, schema, &table, target)?;
        self.config_errors.extend(report.errors);
        self.unknown_keys.extend(
            report
                .unknown_keys
                .into_iter()
                .map(|key| (driver.to_string(), key)),
        );
        Ok(())
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new(Projector::default(), DEFAULT_STOP_TIMEOUT)
    }
}

#[derive(Clone, Default)]
pub struct DriverRegistry {
    factories: HashMap<String, Factory>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in driver.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        for &kind in DriverKind::all() {
            registry.register(kind.constructor_name(), move |args, ctx| {
                drivers::construct(kind, args, ctx)
            });
        }
        registry
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&ScriptArgs, &mut BuildContext) -> Result<Driver, ConstructionError>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Arc::new(factory)).is_some() {
            tracing::debug!("Replaced driver factory '{}'", name);
        } else {
            tracing::debug!("Registered driver factory '{}'", name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered constructor names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Invoke the factory registered under `name`.
    pub fn construct(
        &self,
        name: &str,
        args: &ScriptArgs,
        ctx: &mut BuildContext,
    ) -> Result<Driver, ConstructionError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ConstructionError::UnknownDriver(name.to_string()))?;
        let driver = factory(args, ctx)?;
        tracing::debug!("Constructed {}", driver.describe());
        Ok(driver)
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("factories", &self.names())
            .finish()
    }
}

static GLOBAL: OnceLock<Arc<DriverRegistry>> = OnceLock::new();

/// Process-wide registry with the built-in drivers.
pub fn global() -> Arc<DriverRegistry> {
    Arc::clone(GLOBAL.get_or_init(|| Arc::new(DriverRegistry::with_builtin_drivers())))
}
