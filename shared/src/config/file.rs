//! The persisted configuration file.
//!
//! [`ConfigFile`] is the textual representation of a [`Config`]: every key of
//! the TOML file maps to exactly one field and is optional, so loading a file
//! only overwrites the keys it actually contains.

use super::{Config, Input, Tag};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name used for the configuration directory and files.
pub const APP_NAME: &str = "nmon2influxdb";

/// Errors that can occur while reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be written.
    #[error("failed to write configuration file {path}")]
    Write {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}")]
    Read {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid.
    #[error("syntax error in configuration file {path}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// The configuration could not be serialized.
    #[error("failed to serialize configuration")]
    Serialize(#[from] toml::ser::Error),

    /// The runtime environment lacks something the defaults depend on.
    #[error("cannot determine the {0} of the current user")]
    Environment(&'static str),
}

/// Locates the configuration file.
///
/// The system-wide file wins when it exists, otherwise the per-user dot file
/// is used (and created on first run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocator {
    system_path: PathBuf,
    user_path: PathBuf,
}

impl ConfigLocator {
    /// Creates a locator from explicit candidate paths.
    #[must_use]
    pub fn new(system_path: impl Into<PathBuf>, user_path: impl Into<PathBuf>) -> Self {
        Self {
            system_path: system_path.into(),
            user_path: user_path.into(),
        }
    }

    /// Standard locations: `/etc/nmon2influxdb/nmon2influxdb.cfg`, then
    /// `<home>/.nmon2influxdb.cfg`.
    #[must_use]
    pub fn standard(home_dir: &Path) -> Self {
        Self::new(
            Path::new("/etc")
                .join(APP_NAME)
                .join(format!("{APP_NAME}.cfg")),
            home_dir.join(format!(".{APP_NAME}.cfg")),
        )
    }

    /// Returns the configuration file path in effect.
    #[must_use]
    pub fn locate(&self) -> &Path {
        if is_file(&self.system_path) {
            &self.system_path
        } else {
            &self.user_path
        }
    }
}

/// Returns true if `path` is an existing regular file.
#[must_use]
pub fn is_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|meta| meta.is_file())
}

/// One `[[input.tag]]` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TagEntry {
    /// Tag key.
    pub name: String,
    /// Tag value.
    pub value: String,
}

/// One `[[input]]` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputEntry {
    /// Measurement the rule applies to.
    pub measurement: String,
    /// Rule name.
    pub name: String,
    /// Match expression.
    #[serde(rename = "match")]
    pub match_expr: String,
    /// Tags attached to matching points.
    #[serde(rename = "tag", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<TagEntry>,
}

/// Textual representation of a [`Config`].
///
/// `None` means the key is absent from the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[allow(missing_docs)]
pub struct ConfigFile {
    pub debug: Option<bool>,
    pub timezone: Option<String>,
    pub influxdb_user: Option<String>,
    pub influxdb_password: Option<String>,
    pub influxdb_server: Option<String>,
    pub influxdb_port: Option<String>,
    pub influxdb_database: Option<String>,
    pub grafana_user: Option<String>,
    pub grafana_password: Option<String>,
    #[serde(rename = "grafana_URL")]
    pub grafana_url: Option<String>,
    pub grafana_access: Option<String>,
    pub grafana_datasource: Option<String>,
    pub hmc_server: Option<String>,
    pub hmc_user: Option<String>,
    pub hmc_password: Option<String>,
    pub hmc_database: Option<String>,
    pub hmc_data_retention: Option<String>,
    pub hmc_managed_system: Option<String>,
    pub hmc_managed_system_only: Option<bool>,
    pub hmc_samples: Option<u32>,
    pub import_skip_disks: Option<bool>,
    pub import_all_cpus: Option<bool>,
    pub import_build_dashboard: Option<bool>,
    pub import_force: Option<bool>,
    pub import_skip_metrics: Option<String>,
    pub import_log_database: Option<String>,
    pub import_log_retention: Option<String>,
    pub import_data_retention: Option<String>,
    pub import_ssh_user: Option<String>,
    pub import_ssh_key: Option<String>,
    pub dashboard_write_file: Option<bool>,
    pub stats_limit: Option<u32>,
    pub stats_sort: Option<String>,
    pub stats_filter: Option<String>,
    pub stats_from: Option<String>,
    pub stats_to: Option<String>,
    pub stats_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Vec<InputEntry>>,
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

impl From<&Config> for ConfigFile {
    fn from(config: &Config) -> Self {
        let inputs: Vec<InputEntry> = config
            .inputs
            .iter()
            .map(|input| InputEntry {
                measurement: input.measurement.clone(),
                name: input.name.clone(),
                match_expr: input.match_expr.clone(),
                tags: input
                    .tags
                    .iter()
                    .map(|tag| TagEntry {
                        name: tag.name.clone(),
                        value: tag.value.clone(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            debug: Some(config.debug),
            timezone: Some(config.timezone.clone()),
            influxdb_user: Some(config.connection.user.clone()),
            influxdb_password: Some(config.connection.password.clone()),
            influxdb_server: Some(config.connection.server.clone()),
            influxdb_port: Some(config.connection.port.clone()),
            influxdb_database: Some(config.connection.database.clone()),
            grafana_user: Some(config.dashboard.user.clone()),
            grafana_password: Some(config.dashboard.password.clone()),
            grafana_url: Some(config.dashboard.url.clone()),
            grafana_access: Some(config.dashboard.access.clone()),
            grafana_datasource: Some(config.dashboard.datasource.clone()),
            hmc_server: Some(config.hmc.server.clone()),
            hmc_user: Some(config.hmc.user.clone()),
            hmc_password: Some(config.hmc.password.clone()),
            hmc_database: Some(config.hmc.database.clone()),
            hmc_data_retention: Some(config.hmc.data_retention.clone()),
            hmc_managed_system: Some(config.hmc.managed_system.clone()),
            hmc_managed_system_only: Some(config.hmc.managed_system_only),
            hmc_samples: Some(config.hmc.samples),
            import_skip_disks: Some(config.import.skip_disks),
            import_all_cpus: Some(config.import.all_cpus),
            import_build_dashboard: Some(config.import.build_dashboard),
            import_force: Some(config.import.force),
            import_skip_metrics: Some(config.import.skip_metrics.clone()),
            import_log_database: Some(config.import.log_database.clone()),
            import_log_retention: Some(config.import.log_retention.clone()),
            import_data_retention: Some(config.import.data_retention.clone()),
            import_ssh_user: Some(config.import.ssh_user.clone()),
            import_ssh_key: Some(config.import.ssh_key.clone()),
            dashboard_write_file: Some(config.import.dashboard_write_file),
            stats_limit: Some(config.report.stats_limit),
            stats_sort: Some(config.report.stats_sort.clone()),
            stats_filter: Some(config.report.stats_filter.clone()),
            stats_from: Some(config.report.stats_from.clone()),
            stats_to: Some(config.report.stats_to.clone()),
            stats_host: Some(config.report.stats_host.clone()),
            metric: non_empty(&config.report.metric),
            list_filter: non_empty(&config.report.list_filter),
            list_host: non_empty(&config.report.list_host),
            input: (!inputs.is_empty()).then_some(inputs),
        }
    }
}

impl ConfigFile {
    /// Parses the TOML text of a configuration file.
    ///
    /// # Errors
    ///
    /// Returns the TOML error if the text is malformed, has a value of the
    /// wrong type, or contains an unknown key.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Renders the file as TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the file to `path`, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Write`] or [`ConfigError::Serialize`].
    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let text = self.to_toml()?;
        fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns a copy with every password replaced, for display.
    #[must_use]
    pub fn masked(mut self) -> Self {
        const MASK: &str = "********";
        for password in [
            &mut self.influxdb_password,
            &mut self.grafana_password,
            &mut self.hmc_password,
        ]
        .into_iter()
        .flatten()
        {
            if !password.is_empty() {
                *password = MASK.to_string();
            }
        }
        self
    }

    /// Produces a new configuration from `base` with every key present in
    /// this file applied.
    #[must_use]
    pub fn apply(self, base: Config) -> Config {
        let mut config = base;

        set(&mut config.debug, self.debug);
        set(&mut config.timezone, self.timezone);

        set(&mut config.connection.user, self.influxdb_user);
        set(&mut config.connection.password, self.influxdb_password);
        set(&mut config.connection.server, self.influxdb_server);
        set(&mut config.connection.port, self.influxdb_port);
        set(&mut config.connection.database, self.influxdb_database);

        set(&mut config.dashboard.user, self.grafana_user);
        set(&mut config.dashboard.password, self.grafana_password);
        set(&mut config.dashboard.url, self.grafana_url);
        set(&mut config.dashboard.access, self.grafana_access);
        set(&mut config.dashboard.datasource, self.grafana_datasource);

        set(&mut config.hmc.server, self.hmc_server);
        set(&mut config.hmc.user, self.hmc_user);
        set(&mut config.hmc.password, self.hmc_password);
        set(&mut config.hmc.database, self.hmc_database);
        set(&mut config.hmc.data_retention, self.hmc_data_retention);
        set(&mut config.hmc.managed_system, self.hmc_managed_system);
        set(&mut config.hmc.managed_system_only, self.hmc_managed_system_only);
        set(&mut config.hmc.samples, self.hmc_samples);

        set(&mut config.import.skip_disks, self.import_skip_disks);
        set(&mut config.import.all_cpus, self.import_all_cpus);
        set(&mut config.import.build_dashboard, self.import_build_dashboard);
        set(&mut config.import.force, self.import_force);
        set(&mut config.import.skip_metrics, self.import_skip_metrics);
        set(&mut config.import.log_database, self.import_log_database);
        set(&mut config.import.log_retention, self.import_log_retention);
        set(&mut config.import.data_retention, self.import_data_retention);
        set(&mut config.import.ssh_user, self.import_ssh_user);
        set(&mut config.import.ssh_key, self.import_ssh_key);
        set(&mut config.import.dashboard_write_file, self.dashboard_write_file);

        set(&mut config.report.stats_limit, self.stats_limit);
        set(&mut config.report.stats_sort, self.stats_sort);
        set(&mut config.report.stats_filter, self.stats_filter);
        set(&mut config.report.stats_from, self.stats_from);
        set(&mut config.report.stats_to, self.stats_to);
        set(&mut config.report.stats_host, self.stats_host);
        set(&mut config.report.metric, self.metric);
        set(&mut config.report.list_filter, self.list_filter);
        set(&mut config.report.list_host, self.list_host);

        if let Some(inputs) = self.input {
            config.inputs = inputs
                .into_iter()
                .map(|entry| Input {
                    measurement: entry.measurement,
                    name: entry.name,
                    match_expr: entry.match_expr,
                    tags: entry
                        .tags
                        .into_iter()
                        .map(|tag| Tag {
                            name: tag.name,
                            value: tag.value,
                        })
                        .collect(),
                })
                .collect();
        }

        config
    }
}
