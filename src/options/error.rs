//! Option conversion errors.

use thiserror::Error;

/// Why a single script value could not be turned into its native form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("expected {expected}, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("value {value} does not fit into {target}")]
    OutOfRange { value: i64, target: &'static str },

    #[error("{0}")]
    Invalid(String),
}

impl ValueError {
    pub fn mismatch(expected: &'static str, value: &rhai::Dynamic) -> Self {
        ValueError::TypeMismatch {
            expected,
            found: value.type_name().to_string(),
        }
    }
}

/// A configuration table value could not be applied to its descriptor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{driver}: option '{key}': {source}")]
pub struct ConfigError {
    pub driver: String,
    pub key: String,
    #[source]
    pub source: ValueError,
}
