//! Option descriptors and schemas.
//!
//! A descriptor binds one configuration key to a typed target on a native
//! object `T`. Targets are a tagged enum so a descriptor can never point at
//! a field of the wrong type: the accessor signatures are checked when the
//! schema is written, not when a table is projected.

use crate::options::error::ValueError;
use rhai::Dynamic;
use std::collections::HashSet;
use std::sync::Arc;

/// Typed accessor from the native object to one of its fields.
pub type Accessor<T, V> = Arc<dyn Fn(&mut T) -> &mut V + Send + Sync>;

/// Custom setter: receives the raw script value and the native object.
pub type Setter<T> = Arc<dyn Fn(&mut T, &Dynamic) -> Result<(), ValueError> + Send + Sync>;

/// Integer writer with the target-width check folded in.
type IntWriter<T> = Arc<dyn Fn(&mut T, i64) -> Result<(), ValueError> + Send + Sync>;

/// Value kind of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    Int,
    Bool,
    String,
    Setter,
}

impl OptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKind::Int => "int",
            OptionKind::Bool => "bool",
            OptionKind::String => "string",
            OptionKind::Setter => "setter",
        }
    }
}

/// Where a projected value ends up.
pub enum OptionTarget<T> {
    Int(IntWriter<T>),
    Bool(Accessor<T, bool>),
    String(Accessor<T, String>),
    Setter(Setter<T>),
}

impl<T> Clone for OptionTarget<T> {
    fn clone(&self) -> Self {
        match self {
            OptionTarget::Int(f) => OptionTarget::Int(Arc::clone(f)),
            OptionTarget::Bool(f) => OptionTarget::Bool(Arc::clone(f)),
            OptionTarget::String(f) => OptionTarget::String(Arc::clone(f)),
            OptionTarget::Setter(f) => OptionTarget::Setter(Arc::clone(f)),
        }
    }
}

/// One configurable field: a key name and its typed target.
pub struct OptionDescriptor<T> {
    name: &'static str,
    target: OptionTarget<T>,
}

impl<T> Clone for OptionDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            target: self.target.clone(),
        }
    }
}

impl<T: 'static> OptionDescriptor<T> {
    /// Integer option written straight into a field of any integer width.
    pub fn int<V, F>(name: &'static str, accessor: F) -> Self
    where
        V: TryFrom<i64> + 'static,
        F: Fn(&mut T) -> &mut V + Send + Sync + 'static,
    {
        let target_type = std::any::type_name::<V>();
        let writer = move |obj: &mut T, value: i64| -> Result<(), ValueError> {
            *accessor(obj) = V::try_from(value).map_err(|_| ValueError::OutOfRange {
                value,
                target: target_type,
            })?;
            Ok(())
        };
        Self {
            name,
            target: OptionTarget::Int(Arc::new(writer)),
        }
    }

    /// Boolean option written straight into a field.
    pub fn boolean<F>(name: &'static str, accessor: F) -> Self
    where
        F: Fn(&mut T) -> &mut bool + Send + Sync + 'static,
    {
        Self {
            name,
            target: OptionTarget::Bool(Arc::new(accessor)),
        }
    }

    /// String option written straight into a field.
    pub fn string<F>(name: &'static str, accessor: F) -> Self
    where
        F: Fn(&mut T) -> &mut String + Send + Sync + 'static,
    {
        Self {
            name,
            target: OptionTarget::String(Arc::new(accessor)),
        }
    }

    /// Option handled by a custom setter.
    pub fn setter<F>(name: &'static str, setter: F) -> Self
    where
        F: Fn(&mut T, &Dynamic) -> Result<(), ValueError> + Send + Sync + 'static,
    {
        Self {
            name,
            target: OptionTarget::Setter(Arc::new(setter)),
        }
    }
}

impl<T> OptionDescriptor<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> OptionKind {
        match self.target {
            OptionTarget::Int(_) => OptionKind::Int,
            OptionTarget::Bool(_) => OptionKind::Bool,
            OptionTarget::String(_) => OptionKind::String,
            OptionTarget::Setter(_) => OptionKind::Setter,
        }
    }

    pub fn target(&self) -> &OptionTarget<T> {
        &self.target
    }

    /// Same target under another key (e.g. `ip` for `localip`).
    pub fn alias(&self, name: &'static str) -> Self {
        Self {
            name,
            target: self.target.clone(),
        }
    }

    /// Convert `value` and apply it to `obj`.
    ///
    /// Conversion happens before anything is written, so a failing value
    /// leaves the target untouched.
    pub fn apply(&self, obj: &mut T, value: &Dynamic) -> Result<(), ValueError> {
        match &self.target {
            OptionTarget::Int(write) => write(obj, to_int(value)?),
            OptionTarget::Bool(field) => {
                *field(obj) = to_bool(value)?;
                Ok(())
            }
            OptionTarget::String(field) => {
                *field(obj) = to_string(value)?;
                Ok(())
            }
            OptionTarget::Setter(set) => set(obj, value),
        }
    }
}

impl<T> std::fmt::Debug for OptionDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish()
    }
}

/// Integers pass through; strings holding a decimal integer are parsed.
pub fn to_int(value: &Dynamic) -> Result<i64, ValueError> {
    if let Ok(i) = value.as_int() {
        return Ok(i);
    }
    if value.is_string() {
        let s = value
            .clone()
            .into_string()
            .map_err(|_| ValueError::mismatch("integer", value))?;
        return s
            .trim()
            .parse::<i64>()
            .map_err(|_| ValueError::Invalid(format!("'{}' is not an integer", s)));
    }
    Err(ValueError::mismatch("integer", value))
}

/// Only real booleans are accepted.
pub fn to_bool(value: &Dynamic) -> Result<bool, ValueError> {
    value
        .as_bool()
        .map_err(|_| ValueError::mismatch("bool", value))
}

/// Strings pass through; numbers are rendered.
pub fn to_string(value: &Dynamic) -> Result<String, ValueError> {
    if value.is_string() {
        return value
            .clone()
            .into_string()
            .map_err(|_| ValueError::mismatch("string", value));
    }
    if let Ok(i) = value.as_int() {
        return Ok(i.to_string());
    }
    if let Ok(f) = value.as_float() {
        return Ok(f.to_string());
    }
    Err(ValueError::mismatch("string", value))
}

/// Ordered collection of descriptors for one driver kind.
///
/// Names may repeat when sub-schemas are concatenated; the descriptor
/// registered last for a name is the one projection uses.
pub struct OptionSchema<T> {
    descriptors: Vec<OptionDescriptor<T>>,
}

impl<T> OptionSchema<T> {
    pub fn new() -> Self {
        Self {
            descriptors: Vec::new(),
        }
    }

    /// Append a descriptor (builder style).
    pub fn with(mut self, descriptor: OptionDescriptor<T>) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    pub fn push(&mut self, descriptor: OptionDescriptor<T>) {
        self.descriptors.push(descriptor);
    }

    /// Concatenate another schema after this one.
    pub fn concat(mut self, other: OptionSchema<T>) -> Self {
        self.descriptors.extend(other.descriptors);
        self
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptionDescriptor<T>> {
        self.descriptors.iter()
    }

    /// Descriptor names in registration order, duplicates included.
    pub fn names(&self) -> Vec<&'static str> {
        self.descriptors.iter().map(|d| d.name).collect()
    }

    /// `(name, kind)` pairs in registration order.
    pub fn signature(&self) -> Vec<(&'static str, OptionKind)> {
        self.descriptors.iter().map(|d| (d.name, d.kind())).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.iter().any(|d| d.name == name)
    }

    /// The descriptor that wins for `name`.
    pub fn lookup(&self, name: &str) -> Option<&OptionDescriptor<T>> {
        self.descriptors.iter().rev().find(|d| d.name == name)
    }

    /// Winning descriptors, in the order they were registered.
    pub fn effective(&self) -> Vec<&OptionDescriptor<T>> {
        let mut seen = HashSet::new();
        let mut winners: Vec<&OptionDescriptor<T>> = self
            .descriptors
            .iter()
            .rev()
            .filter(|d| seen.insert(d.name))
            .collect();
        winners.reverse();
        winners
    }
}

impl<T> Default for OptionSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for OptionSchema<T> {
    fn clone(&self) -> Self {
        Self {
            descriptors: self.descriptors.clone(),
        }
    }
}

impl<T> std::fmt::Debug for OptionSchema<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.descriptors.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Sample {
        size: i32,
        port: u16,
        enabled: bool,
        label: String,
        calls: Vec<&'static str>,
    }

    #[test]
    fn test_kind_follows_target() {
        let d = OptionDescriptor::<Sample>::int("size", |s: &mut Sample| &mut s.size);
        assert_eq!(d.kind(), OptionKind::Int);
        let d = OptionDescriptor::<Sample>::boolean("enabled", |s: &mut Sample| &mut s.enabled);
        assert_eq!(d.kind(), OptionKind::Bool);
        let d = OptionDescriptor::<Sample>::string("label", |s: &mut Sample| &mut s.label);
        assert_eq!(d.kind(), OptionKind::String);
        let d = OptionDescriptor::<Sample>::setter("x", |_s: &mut Sample, _v: &Dynamic| Ok(()));
        assert_eq!(d.kind(), OptionKind::Setter);
    }

    #[test]
    fn test_int_accepts_numeric_strings() {
        let d = OptionDescriptor::<Sample>::int("size", |s: &mut Sample| &mut s.size);
        let mut sample = Sample::default();
        d.apply(&mut sample, &Dynamic::from("4096")).unwrap();
        assert_eq!(sample.size, 4096);
        d.apply(&mut sample, &Dynamic::from(12_i64)).unwrap();
        assert_eq!(sample.size, 12);
    }

    #[test]
    fn test_int_out_of_range_leaves_field() {
        let d = OptionDescriptor::<Sample>::int("port", |s: &mut Sample| &mut s.port);
        let mut sample = Sample {
            port: 514,
            ..Default::default()
        };
        let err = d.apply(&mut sample, &Dynamic::from(70_000_i64)).unwrap_err();
        assert!(matches!(err, ValueError::OutOfRange { value: 70_000, .. }));
        assert_eq!(sample.port, 514);
    }

    #[test]
    fn test_bool_rejects_strings() {
        let d = OptionDescriptor::<Sample>::boolean("enabled", |s: &mut Sample| &mut s.enabled);
        let mut sample = Sample::default();
        let err = d.apply(&mut sample, &Dynamic::from("yes")).unwrap_err();
        assert!(matches!(err, ValueError::TypeMismatch { expected: "bool", .. }));
        assert!(!sample.enabled);
    }

    #[test]
    fn test_string_renders_numbers() {
        let d = OptionDescriptor::<Sample>::string("label", |s: &mut Sample| &mut s.label);
        let mut sample = Sample::default();
        d.apply(&mut sample, &Dynamic::from(601_i64)).unwrap();
        assert_eq!(sample.label, "601");
    }

    #[test]
    fn test_lookup_last_registered_wins() {
        let schema = OptionSchema::new()
            .with(OptionDescriptor::setter(
                "keep_alive",
                |s: &mut Sample, _v: &Dynamic| {
                    s.calls.push("first");
                    Ok(())
                },
            ))
            .with(OptionDescriptor::setter(
                "keep_alive",
                |s: &mut Sample, _v: &Dynamic| {
                    s.calls.push("second");
                    Ok(())
                },
            ));

        let mut sample = Sample::default();
        schema
            .lookup("keep_alive")
            .unwrap()
            .apply(&mut sample, &Dynamic::TRUE)
            .unwrap();
        assert_eq!(sample.calls, vec!["second"]);
        assert_eq!(schema.effective().len(), 1);
    }

    #[test]
    fn test_effective_keeps_registration_order() {
        let schema = OptionSchema::new()
            .with(OptionDescriptor::<Sample>::int("a", |s: &mut Sample| &mut s.size))
            .with(OptionDescriptor::<Sample>::int("b", |s: &mut Sample| &mut s.port))
            .with(OptionDescriptor::<Sample>::boolean("a", |s: &mut Sample| {
                &mut s.enabled
            }));
        let names: Vec<_> = schema.effective().iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(schema.lookup("a").unwrap().kind(), OptionKind::Bool);
    }

    #[test]
    fn test_alias_shares_target() {
        let d = OptionDescriptor::<Sample>::string("localip", |s: &mut Sample| &mut s.label);
        let alias = d.alias("ip");
        let mut sample = Sample::default();
        alias.apply(&mut sample, &Dynamic::from("10.0.0.1")).unwrap();
        assert_eq!(alias.name(), "ip");
        assert_eq!(sample.label, "10.0.0.1");
    }
}
