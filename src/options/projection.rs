//! Projection of a script table onto a native object.
//!
//! The walk is driven by the schema, not the table: every effective
//! descriptor looks up its own key, absent keys leave the target at its
//! default, and table keys that match nothing are ignored (or reported in
//! [`UnknownKeys::Warn`] mode). A table may legitimately carry keys for
//! several independently composed schemas.

use crate::options::descriptor::OptionSchema;
use crate::options::error::ConfigError;
use rhai::Map;
use serde::{Deserialize, Serialize};

/// What happens when one key fails to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionPolicy {
    /// Record the error, keep applying the remaining keys.
    #[default]
    Collect,
    /// Stop at the first error and return it.
    FailFast,
}

/// What happens with table keys no descriptor claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownKeys {
    #[default]
    Ignore,
    /// Log each unmatched key; useful for catching misspelled options.
    Warn,
}

/// Outcome of a projection that did not fail fast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionReport {
    /// Keys that were converted and written, in schema order.
    pub applied: Vec<String>,
    /// Keys that failed to convert (only under [`ProjectionPolicy::Collect`]).
    pub errors: Vec<ConfigError>,
    /// Table keys no descriptor matched (only under [`UnknownKeys::Warn`]).
    pub unknown_keys: Vec<String>,
}

impl ProjectionReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.unknown_keys.is_empty()
    }
}

/// Applies schemas to tables under one error policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Projector {
    pub policy: ProjectionPolicy,
    pub unknown_keys: UnknownKeys,
}

impl Projector {
    pub fn new(policy: ProjectionPolicy, unknown_keys: UnknownKeys) -> Self {
        Self {
            policy,
            unknown_keys,
        }
    }

    pub fn fail_fast() -> Self {
        Self::new(ProjectionPolicy::FailFast, UnknownKeys::Ignore)
    }

    /// Project `table` onto `target` through `schema`.
    ///
    /// `driver` only labels errors and log lines.
    pub fn project<T>(
        &self,
        driver: &str,
        schema: &OptionSchema<T>,
        table: &Map,
        target: &mut T,
    ) -> Result<ProjectionReport, ConfigError> {
        let mut report = ProjectionReport::default();

        for descriptor in schema.effective() {
            let Some(value) = table.get(descriptor.name()) else {
                continue;
            };

            match descriptor.apply(target, value) {
                Ok(()) => {
                    tracing::trace!("{}: applied option '{}'", driver, descriptor.name());
                    report.applied.push(descriptor.name().to_string());
                }
                Err(source) => {
                    let err = ConfigError {
                        driver: driver.to_string(),
                        key: descriptor.name().to_string(),
                        source,
                    };
                    match self.policy {
                        ProjectionPolicy::FailFast => return Err(err),
                        ProjectionPolicy::Collect => {
                            tracing::warn!("{}; keeping default", err);
                            report.errors.push(err);
                        }
                    }
                }
            }
        }

        if self.unknown_keys == UnknownKeys::Warn {
            for key in table.keys() {
                if !schema.contains(key.as_str()) {
                    tracing::warn!("{}: unknown option '{}' ignored", driver, key);
                    report.unknown_keys.push(key.to_string());
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::descriptor::OptionDescriptor;
    use crate::options::error::ValueError;
    use proptest::prelude::*;
    use rhai::Dynamic;

    #[derive(Debug, Clone, PartialEq)]
    struct Target {
        sndbuf: i32,
        rcvbuf: i32,
        broadcast: bool,
        name: String,
        transport: String,
    }

    impl Default for Target {
        fn default() -> Self {
            Self {
                sndbuf: 11,
                rcvbuf: 22,
                broadcast: false,
                name: "default".to_string(),
                transport: "tcp".to_string(),
            }
        }
    }

    fn schema() -> OptionSchema<Target> {
        OptionSchema::new()
            .with(OptionDescriptor::int("so_sndbuf", |t: &mut Target| &mut t.sndbuf))
            .with(OptionDescriptor::int("so_rcvbuf", |t: &mut Target| &mut t.rcvbuf))
            .with(OptionDescriptor::boolean("so_broadcast", |t: &mut Target| {
                &mut t.broadcast
            }))
            .with(OptionDescriptor::string("name", |t: &mut Target| &mut t.name))
            .with(OptionDescriptor::setter(
                "transport",
                |t: &mut Target, v: &Dynamic| {
                    let s = crate::options::descriptor::to_string(v)?;
                    match s.as_str() {
                        "tcp" | "udp" => {
                            t.transport = s;
                            Ok(())
                        }
                        other => Err(ValueError::Invalid(format!("unknown transport '{}'", other))),
                    }
                },
            ))
    }

    fn table(entries: &[(&str, Dynamic)]) -> Map {
        entries
            .iter()
            .map(|(k, v)| ((*k).into(), v.clone()))
            .collect()
    }

    #[test]
    fn test_absent_keys_keep_defaults() {
        let mut target = Target::default();
        let report = Projector::default()
            .project("test", &schema(), &table(&[("so_sndbuf", Dynamic::from(65536_i64))]), &mut target)
            .unwrap();

        assert_eq!(report.applied, vec!["so_sndbuf"]);
        assert_eq!(target.sndbuf, 65536);
        assert_eq!(target.rcvbuf, 22);
        assert_eq!(target.name, "default");
    }

    #[test]
    fn test_unknown_keys_are_ignored_by_default() {
        let mut target = Target::default();
        let report = Projector::default()
            .project("test", &schema(), &table(&[("so_sndbuff", Dynamic::from(1_i64))]), &mut target)
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(target, Target::default());
    }

    #[test]
    fn test_unknown_keys_reported_in_warn_mode() {
        let projector = Projector::new(ProjectionPolicy::Collect, UnknownKeys::Warn);
        let mut target = Target::default();
        let report = projector
            .project(
                "test",
                &schema(),
                &table(&[
                    ("so_sndbuff", Dynamic::from(1_i64)),
                    ("so_rcvbuf", Dynamic::from(5_i64)),
                ]),
                &mut target,
            )
            .unwrap();
        assert_eq!(report.unknown_keys, vec!["so_sndbuff"]);
        assert_eq!(target.rcvbuf, 5);
    }

    #[test]
    fn test_collect_policy_applies_other_keys() {
        let mut target = Target::default();
        let report = Projector::default()
            .project(
                "test",
                &schema(),
                &table(&[
                    ("so_sndbuf", Dynamic::from("lots")),
                    ("so_broadcast", Dynamic::TRUE),
                    ("transport", Dynamic::from("carrier-pigeon")),
                ]),
                &mut target,
            )
            .unwrap();

        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].key, "so_sndbuf");
        assert_eq!(report.errors[1].key, "transport");
        assert_eq!(target.sndbuf, 11);
        assert!(target.broadcast);
        assert_eq!(target.transport, "tcp");
    }

    #[test]
    fn test_fail_fast_returns_first_error() {
        let mut target = Target::default();
        let err = Projector::fail_fast()
            .project(
                "TcpDestination",
                &schema(),
                &table(&[("so_rcvbuf", Dynamic::from(true))]),
                &mut target,
            )
            .unwrap_err();
        assert_eq!(err.key, "so_rcvbuf");
        assert_eq!(err.driver, "TcpDestination");
        assert!(matches!(err.source, ValueError::TypeMismatch { .. }));
    }

    #[test]
    fn test_duplicate_name_only_last_setter_runs() {
        let schema = schema().with(OptionDescriptor::setter(
            "transport",
            |t: &mut Target, _v: &Dynamic| {
                t.transport = "override".to_string();
                Ok(())
            },
        ));
        let mut target = Target::default();
        let report = Projector::default()
            .project("test", &schema, &table(&[("transport", Dynamic::from("udp"))]), &mut target)
            .unwrap();
        assert_eq!(target.transport, "override");
        assert_eq!(report.applied, vec!["transport"]);
    }

    proptest! {
        #[test]
        fn prop_only_present_keys_are_written(
            sndbuf in proptest::option::of(0i64..1_000_000),
            rcvbuf in proptest::option::of(0i64..1_000_000),
            broadcast in proptest::option::of(any::<bool>()),
            name in proptest::option::of("[a-z]{1,12}"),
        ) {
            let mut entries = Vec::new();
            if let Some(v) = sndbuf { entries.push(("so_sndbuf", Dynamic::from(v))); }
            if let Some(v) = rcvbuf { entries.push(("so_rcvbuf", Dynamic::from(v))); }
            if let Some(v) = broadcast { entries.push(("so_broadcast", Dynamic::from(v))); }
            if let Some(v) = name.clone() { entries.push(("name", Dynamic::from(v))); }

            let before = Target::default();
            let mut target = before.clone();
            Projector::default()
                .project("prop", &schema(), &table(&entries), &mut target)
                .unwrap();

            prop_assert_eq!(target.sndbuf, sndbuf.map(|v| v as i32).unwrap_or(before.sndbuf));
            prop_assert_eq!(target.rcvbuf, rcvbuf.map(|v| v as i32).unwrap_or(before.rcvbuf));
            prop_assert_eq!(target.broadcast, broadcast.unwrap_or(before.broadcast));
            prop_assert_eq!(target.name, name.unwrap_or(before.name));
            prop_assert_eq!(target.transport, before.transport);
        }
    }
}
