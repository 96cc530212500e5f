//! Command-line overrides.
//!
//! The command line is represented as a map from [`Flag`] to the value the
//! caller supplied, together with whether that value was typed explicitly or
//! came from the flag's declared default. Most flags win whenever they are
//! present; `cpus` only wins when it was given explicitly.

use super::Config;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Value type accepted by a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    /// Free text.
    Text,
    /// Boolean switch.
    Bool,
    /// Non-negative integer.
    Int,
}

/// A flag value supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    /// Text value.
    Text(String),
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(u32),
}

impl FlagValue {
    fn kind(&self) -> FlagKind {
        match self {
            Self::Text(_) => FlagKind::Text,
            Self::Bool(_) => FlagKind::Bool,
            Self::Int(_) => FlagKind::Int,
        }
    }
}

impl From<String> for FlagValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FlagValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<u32> for FlagValue {
    fn from(value: u32) -> Self {
        Self::Int(value)
    }
}

/// Error returned when a flag is given a value of the wrong type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("flag --{flag} expects a {expected:?} value, got {actual:?}")]
pub struct OverrideError {
    /// The flag.
    pub flag: Flag,
    /// Type the flag accepts.
    pub expected: FlagKind,
    /// Type that was supplied.
    pub actual: FlagKind,
}

/// Command-line flags that feed the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs)]
pub enum Flag {
    Debug,
    Server,
    User,
    Port,
    Db,
    Pass,
    Tz,
    Metric,
    StatsHost,
    From,
    To,
    Limit,
    Filter,
    NoDisks,
    Cpus,
    Build,
    SkipMetrics,
    LogDatabase,
    LogRetention,
    File,
    Force,
    Host,
    GrafanaUser,
    GrafanaPassword,
    GrafanaAccess,
    GrafanaUrl,
    Datasource,
    Hmc,
    HmcUser,
    HmcPass,
    ManagedSystem,
    ManagedSystemOnly,
    Samples,
}

impl Flag {
    /// Every flag, global flags first.
    pub const ALL: [Flag; 33] = [
        Flag::Debug,
        Flag::Server,
        Flag::User,
        Flag::Port,
        Flag::Db,
        Flag::Pass,
        Flag::Tz,
        Flag::Metric,
        Flag::StatsHost,
        Flag::From,
        Flag::To,
        Flag::Limit,
        Flag::Filter,
        Flag::NoDisks,
        Flag::Cpus,
        Flag::Build,
        Flag::SkipMetrics,
        Flag::LogDatabase,
        Flag::LogRetention,
        Flag::File,
        Flag::Force,
        Flag::Host,
        Flag::GrafanaUser,
        Flag::GrafanaPassword,
        Flag::GrafanaAccess,
        Flag::GrafanaUrl,
        Flag::Datasource,
        Flag::Hmc,
        Flag::HmcUser,
        Flag::HmcPass,
        Flag::ManagedSystem,
        Flag::ManagedSystemOnly,
        Flag::Samples,
    ];

    /// Long name of the flag on the command line.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Flag::Debug => "debug",
            Flag::Server => "server",
            Flag::User => "user",
            Flag::Port => "port",
            Flag::Db => "db",
            Flag::Pass => "pass",
            Flag::Tz => "tz",
            Flag::Metric => "metric",
            Flag::StatsHost => "statshost",
            Flag::From => "from",
            Flag::To => "to",
            Flag::Limit => "limit",
            Flag::Filter => "filter",
            Flag::NoDisks => "nodisks",
            Flag::Cpus => "cpus",
            Flag::Build => "build",
            Flag::SkipMetrics => "skip_metrics",
            Flag::LogDatabase => "log_database",
            Flag::LogRetention => "log_retention",
            Flag::File => "file",
            Flag::Force => "force",
            Flag::Host => "host",
            Flag::GrafanaUser => "guser",
            Flag::GrafanaPassword => "gpassword",
            Flag::GrafanaAccess => "gaccess",
            Flag::GrafanaUrl => "gurl",
            Flag::Datasource => "datasource",
            Flag::Hmc => "hmc",
            Flag::HmcUser => "hmcuser",
            Flag::HmcPass => "hmcpass",
            Flag::ManagedSystem => "managed_system",
            Flag::ManagedSystemOnly => "managed_system-only",
            Flag::Samples => "samples",
        }
    }

    /// Value type of the flag.
    #[must_use]
    pub fn kind(self) -> FlagKind {
        match self {
            Flag::Debug
            | Flag::NoDisks
            | Flag::Cpus
            | Flag::Build
            | Flag::File
            | Flag::Force
            | Flag::ManagedSystemOnly => FlagKind::Bool,
            Flag::Limit | Flag::Samples => FlagKind::Int,
            _ => FlagKind::Text,
        }
    }

    /// Whether the flag only applies when given explicitly.
    #[must_use]
    pub fn requires_explicit(self) -> bool {
        matches!(self, Flag::Cpus)
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Provided {
    value: FlagValue,
    explicit: bool,
}

/// Flag values supplied by the caller.
///
/// A flag absent from the map was not provided at all and leaves the
/// configuration untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    values: BTreeMap<Flag, Provided>,
}

impl CliOverrides {
    /// Creates an empty set of overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a flag value.
    ///
    /// `explicit` tells whether the caller typed the flag or the value is the
    /// flag's declared default.
    ///
    /// # Errors
    ///
    /// Returns an error if the value type does not match [`Flag::kind`].
    pub fn insert(
        &mut self,
        flag: Flag,
        value: impl Into<FlagValue>,
        explicit: bool,
    ) -> Result<(), OverrideError> {
        let value = value.into();
        if value.kind() != flag.kind() {
            return Err(OverrideError {
                flag,
                expected: flag.kind(),
                actual: value.kind(),
            });
        }
        self.values.insert(flag, Provided { value, explicit });
        Ok(())
    }

    /// Builder form of [`CliOverrides::insert`] for an explicitly typed flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the value type does not match [`Flag::kind`].
    pub fn with(mut self, flag: Flag, value: impl Into<FlagValue>) -> Result<Self, OverrideError> {
        self.insert(flag, value, true)?;
        Ok(self)
    }

    /// Returns true if no flag was provided.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value that applies for `flag`, if any.
    #[must_use]
    pub fn get(&self, flag: Flag) -> Option<&FlagValue> {
        self.values
            .get(&flag)
            .filter(|provided| provided.explicit || !flag.requires_explicit())
            .map(|provided| &provided.value)
    }

    fn text(&self, flag: Flag) -> Option<String> {
        match self.get(flag) {
            Some(FlagValue::Text(value)) => Some(value.clone()),
            _ => None,
        }
    }

    fn boolean(&self, flag: Flag) -> Option<bool> {
        match self.get(flag) {
            Some(FlagValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    fn int(&self, flag: Flag) -> Option<u32> {
        match self.get(flag) {
            Some(FlagValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    /// Produces a new configuration from `base` with the provided flags
    /// applied. Provided values win even when empty or zero.
    #[must_use]
    pub fn apply(&self, base: Config) -> Config {
        let mut config = base;
        let set_text = |slot: &mut String, flag| {
            if let Some(value) = self.text(flag) {
                *slot = value;
            }
        };
        let set_bool = |slot: &mut bool, flag| {
            if let Some(value) = self.boolean(flag) {
                *slot = value;
            }
        };
        let set_int = |slot: &mut u32, flag| {
            if let Some(value) = self.int(flag) {
                *slot = value;
            }
        };

        set_text(&mut config.report.metric, Flag::Metric);
        set_text(&mut config.report.stats_host, Flag::StatsHost);
        set_text(&mut config.report.stats_from, Flag::From);
        set_text(&mut config.report.stats_to, Flag::To);
        set_int(&mut config.report.stats_limit, Flag::Limit);
        set_text(&mut config.report.stats_filter, Flag::Filter);
        set_bool(&mut config.import.skip_disks, Flag::NoDisks);
        set_bool(&mut config.import.all_cpus, Flag::Cpus);
        set_bool(&mut config.import.build_dashboard, Flag::Build);
        set_text(&mut config.import.skip_metrics, Flag::SkipMetrics);
        set_text(&mut config.import.log_database, Flag::LogDatabase);
        set_text(&mut config.import.log_retention, Flag::LogRetention);
        set_bool(&mut config.import.dashboard_write_file, Flag::File);
        set_text(&mut config.report.list_filter, Flag::Filter);
        set_bool(&mut config.import.force, Flag::Force);
        set_text(&mut config.report.list_host, Flag::Host);
        set_text(&mut config.dashboard.user, Flag::GrafanaUser);
        set_text(&mut config.dashboard.password, Flag::GrafanaPassword);
        set_text(&mut config.dashboard.access, Flag::GrafanaAccess);
        set_text(&mut config.dashboard.url, Flag::GrafanaUrl);
        set_text(&mut config.dashboard.datasource, Flag::Datasource);
        set_bool(&mut config.debug, Flag::Debug);
        set_text(&mut config.hmc.server, Flag::Hmc);
        set_text(&mut config.hmc.user, Flag::HmcUser);
        set_text(&mut config.hmc.password, Flag::HmcPass);
        set_text(&mut config.hmc.managed_system, Flag::ManagedSystem);
        set_bool(&mut config.hmc.managed_system_only, Flag::ManagedSystemOnly);
        set_int(&mut config.hmc.samples, Flag::Samples);
        set_text(&mut config.connection.server, Flag::Server);
        set_text(&mut config.connection.user, Flag::User);
        set_text(&mut config.connection.port, Flag::Port);
        set_text(&mut config.connection.database, Flag::Db);
        set_text(&mut config.connection.password, Flag::Pass);
        set_text(&mut config.timezone, Flag::Tz);

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;

    fn defaults() -> Config {
        Config::defaults(&Environment::new("nmon", "/home/nmon"))
    }

    #[test]
    fn test_empty_overrides_keep_base() {
        let overrides = CliOverrides::new();
        assert!(overrides.is_empty());
        assert_eq!(overrides.apply(defaults()), defaults());
    }

    #[test]
    fn test_provided_values_win() {
        let overrides = CliOverrides::new()
            .with(Flag::Server, "influx01")
            .and_then(|o| o.with(Flag::Limit, 5_u32))
            .and_then(|o| o.with(Flag::NoDisks, true))
            .unwrap();

        let config = overrides.apply(defaults());
        assert_eq!(config.connection.server, "influx01");
        assert_eq!(config.report.stats_limit, 5);
        assert!(config.import.skip_disks);
    }

    #[test]
    fn test_defaulted_empty_value_still_wins() {
        let mut overrides = CliOverrides::new();
        overrides.insert(Flag::SkipMetrics, "", false).unwrap();
        overrides.insert(Flag::Limit, 0_u32, false).unwrap();

        let config = overrides.apply(defaults());
        assert_eq!(config.import.skip_metrics, "");
        assert_eq!(config.report.stats_limit, 0);
    }

    #[test]
    fn test_filter_sets_stats_and_list_filter() {
        let overrides = CliOverrides::new().with(Flag::Filter, "lpar.*").unwrap();
        let config = overrides.apply(defaults());
        assert_eq!(config.report.stats_filter, "lpar.*");
        assert_eq!(config.report.list_filter, "lpar.*");
    }

    #[test]
    fn test_cpus_requires_explicit_flag() {
        let mut base = defaults();
        base.import.all_cpus = true;

        let mut overrides = CliOverrides::new();
        overrides.insert(Flag::Cpus, false, false).unwrap();
        assert_eq!(overrides.get(Flag::Cpus), None);
        assert!(overrides.apply(base.clone()).import.all_cpus);

        overrides.insert(Flag::Cpus, false, true).unwrap();
        assert_eq!(overrides.get(Flag::Cpus), Some(&FlagValue::Bool(false)));
        assert!(!overrides.apply(base).import.all_cpus);
    }

    #[test]
    fn test_insert_rejects_wrong_type() {
        let mut overrides = CliOverrides::new();
        let err = overrides.insert(Flag::Limit, "twenty", true).unwrap_err();
        assert_eq!(err.flag, Flag::Limit);
        assert_eq!(err.expected, FlagKind::Int);
        assert_eq!(err.actual, FlagKind::Text);
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_flag_names_are_unique() {
        let mut names: Vec<_> = Flag::ALL.iter().map(|flag| flag.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Flag::ALL.len());
    }

    #[test]
    fn test_only_cpus_requires_explicit() {
        let explicit: Vec<_> = Flag::ALL
            .into_iter()
            .filter(|flag| flag.requires_explicit())
            .collect();
        assert_eq!(explicit, vec![Flag::Cpus]);
    }
}
