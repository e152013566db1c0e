//! Option descriptors, schemas and projection.
//!
//! A schema is an ordered list of descriptors (name plus typed write
//! target) for one native type. The [`Projector`] walks a schema over a
//! script table and writes every present key into the target object.

pub mod compose;
pub mod descriptor;
pub mod error;
pub mod projection;

pub use descriptor::{
    to_bool, to_int, to_string, Accessor, OptionDescriptor, OptionKind, OptionSchema, OptionTarget,
    Setter,
};
pub use error::{ConfigError, ValueError};
pub use projection::{ProjectionPolicy, ProjectionReport, Projector, UnknownKeys};
