//! Positional arguments of a constructor call.

use crate::error::ConstructionError;
use rhai::{Dynamic, Map};

/// Arguments a configuration script passed to one constructor.
///
/// Positions in errors are 1-based, matching what the script author wrote.
#[derive(Debug, Clone)]
pub struct ScriptArgs {
    driver: String,
    values: Vec<Dynamic>,
}

impl ScriptArgs {
    pub fn new(driver: impl Into<String>, values: Vec<Dynamic>) -> Self {
        Self {
            driver: driver.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Dynamic> {
        position.checked_sub(1).and_then(|i| self.values.get(i))
    }

    /// A required, non-empty string at `position`.
    pub fn required_string(
        &self,
        position: usize,
        what: &'static str,
    ) -> Result<String, ConstructionError> {
        let value = self
            .get(position)
            .filter(|v| !v.is_unit())
            .ok_or_else(|| ConstructionError::MissingArgument {
                driver: self.driver.clone(),
                position,
                what,
            })?;

        if !value.is_string() {
            return Err(self.invalid(position, "a string", value));
        }
        let s = value.clone().into_string().unwrap_or_default();
        if s.is_empty() {
            return Err(ConstructionError::MissingArgument {
                driver: self.driver.clone(),
                position,
                what,
            });
        }
        Ok(s)
    }

    /// An optional option table at `position`; `()` counts as absent.
    pub fn options(&self, position: usize) -> Result<Option<Map>, ConstructionError> {
        match self.get(position) {
            None => Ok(None),
            Some(value) if value.is_unit() => Ok(None),
            Some(value) if value.is_map() => Ok(value.clone().try_cast::<Map>()),
            Some(value) => Err(self.invalid(position, "an option map", value)),
        }
    }

    pub fn expect_at_most(&self, max: usize) -> Result<(), ConstructionError> {
        if self.values.len() > max {
            return Err(ConstructionError::TooManyArguments {
                driver: self.driver.clone(),
                max,
                found: self.values.len(),
            });
        }
        Ok(())
    }

    fn invalid(&self, position: usize, expected: &'static str, value: &Dynamic) -> ConstructionError {
        ConstructionError::InvalidArgument {
            driver: self.driver.clone(),
            position,
            expected,
            found: value.type_name().to_string(),
        }
    }
}
