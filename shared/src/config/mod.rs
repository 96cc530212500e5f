//! Configuration module for nmon2influxdb.
//!
//! A run's [`Config`] is resolved from three layers: built-in defaults, the
//! persisted configuration file and the values supplied on the command line.
//! See [`Resolver`] for the precedence rules.

pub mod file;
pub mod overrides;
pub mod resolve;
pub mod retention;

pub use file::{ConfigError, ConfigFile, ConfigLocator};
pub use overrides::{CliOverrides, Flag, FlagKind, FlagValue, OverrideError};
pub use resolve::{Environment, Resolver};
pub use retention::{InvalidRetention, RetentionDuration};

use std::path::PathBuf;

/// Connection settings for the `InfluxDB` server holding the main database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Server host name.
    pub server: String,
    /// Server port, kept as text like the other connection settings.
    pub port: String,
    /// User name for authentication.
    pub user: String,
    /// Password for authentication.
    pub password: String,
    /// Name of the main database receiving nmon data.
    pub database: String,
}

/// Settings of the nmon import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    /// Skip disk metrics.
    pub skip_disks: bool,
    /// Import every CPU instead of the aggregated values.
    pub all_cpus: bool,
    /// Build the Grafana dashboard after the import.
    pub build_dashboard: bool,
    /// Re-import files already imported.
    pub force: bool,
    /// Regular expression of the metrics to skip.
    pub skip_metrics: String,
    /// Database receiving the import log.
    pub log_database: String,
    /// Retention literal of the log database.
    pub log_retention: String,
    /// Retention literal of the main database. Empty leaves it untouched.
    pub data_retention: String,
    /// SSH user for remote collection.
    pub ssh_user: String,
    /// SSH private key for remote collection.
    pub ssh_key: String,
    /// Write the generated dashboard to a file instead of uploading it.
    pub dashboard_write_file: bool,
}

/// Grafana connection parameters.
///
/// These can never be supplied on the command line when a dashboard is
/// built, see [`Resolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Grafana base URL.
    pub url: String,
    /// Datasource access mode (`direct` or `proxy`).
    pub access: String,
    /// Datasource name.
    pub datasource: String,
    /// Grafana user.
    pub user: String,
    /// Grafana password.
    pub password: String,
}

/// Settings of the HMC (Hardware Management Console) collection, stored in a
/// secondary database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HmcConfig {
    /// HMC server. Empty when no HMC is used.
    pub server: String,
    /// HMC user.
    pub user: String,
    /// HMC password.
    pub password: String,
    /// Database receiving HMC data.
    pub database: String,
    /// Retention literal of the HMC database. Empty leaves it untouched.
    pub data_retention: String,
    /// Only collect this managed system.
    pub managed_system: String,
    /// Only collect managed system metrics, skipping partitions.
    pub managed_system_only: bool,
    /// Number of samples to collect.
    pub samples: u32,
}

/// Query and report filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    /// Metric to report on.
    pub metric: String,
    /// Maximum number of rows in statistics.
    pub stats_limit: u32,
    /// Sort key of statistics.
    pub stats_sort: String,
    /// Filter expression of statistics.
    pub stats_filter: String,
    /// Start of the statistics time range.
    pub stats_from: String,
    /// End of the statistics time range.
    pub stats_to: String,
    /// Host filter of statistics.
    pub stats_host: String,
    /// Filter expression of listings.
    pub list_filter: String,
    /// Host filter of listings.
    pub list_host: String,
}

/// A tag attached to data matched by an [`Input`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Tag key.
    pub name: String,
    /// Tag value.
    pub value: String,
}

/// A filtering rule applied during import.
///
/// Inputs only ever come from the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Input {
    /// Measurement the rule applies to.
    pub measurement: String,
    /// Rule name.
    pub name: String,
    /// Match expression.
    pub match_expr: String,
    /// Tags added to matching points, in declaration order.
    pub tags: Vec<Tag>,
}

/// Resolved configuration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Verbose diagnostics.
    pub debug: bool,
    /// Timezone of the nmon timestamps.
    pub timezone: String,
    /// `InfluxDB` connection.
    pub connection: ConnectionConfig,
    /// Import behaviour.
    pub import: ImportConfig,
    /// Grafana parameters.
    pub dashboard: DashboardConfig,
    /// HMC collection.
    pub hmc: HmcConfig,
    /// Query and report filters.
    pub report: ReportConfig,
    /// Import filtering rules.
    pub inputs: Vec<Input>,
}

impl Config {
    /// Builds the baseline configuration.
    ///
    /// The SSH user and key path are derived from `env`, everything else is
    /// a fixed default.
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::config::{Config, Environment};
    ///
    /// let env = Environment::new("nmon", "/home/nmon");
    /// let config = Config::defaults(&env);
    /// assert_eq!(config.connection.database, "nmon_reports");
    /// assert_eq!(config.import.ssh_user, "nmon");
    /// ```
    #[must_use]
    pub fn defaults(env: &Environment) -> Self {
        Self {
            debug: false,
            timezone: "Europe/Paris".to_string(),
            connection: ConnectionConfig {
                server: "localhost".to_string(),
                port: "8086".to_string(),
                user: "root".to_string(),
                password: "root".to_string(),
                database: "nmon_reports".to_string(),
            },
            import: ImportConfig {
                skip_disks: false,
                all_cpus: false,
                build_dashboard: false,
                force: false,
                skip_metrics: "JFSINODE|TOP|PCPU".to_string(),
                log_database: "nmon2influxdb_log".to_string(),
                log_retention: "2d".to_string(),
                data_retention: String::new(),
                ssh_user: env.user_name.clone(),
                ssh_key: default_ssh_key(&env.home_dir).to_string_lossy().into_owned(),
                dashboard_write_file: false,
            },
            dashboard: DashboardConfig {
                url: "http://localhost:3000".to_string(),
                access: "direct".to_string(),
                datasource: "nmon2influxdb".to_string(),
                user: "admin".to_string(),
                password: "admin".to_string(),
            },
            hmc: HmcConfig {
                server: String::new(),
                user: "hscroot".to_string(),
                password: "abc123".to_string(),
                database: "nmon2influxdbHMC".to_string(),
                data_retention: String::new(),
                managed_system: String::new(),
                managed_system_only: false,
                samples: 0,
            },
            report: ReportConfig {
                metric: String::new(),
                stats_limit: 20,
                stats_sort: "mean".to_string(),
                stats_filter: String::new(),
                stats_from: String::new(),
                stats_to: String::new(),
                stats_host: String::new(),
                list_filter: String::new(),
                list_host: String::new(),
            },
            inputs: Vec::new(),
        }
    }
}

fn default_ssh_key(home: &std::path::Path) -> PathBuf {
    home.join(".ssh").join("id_rsa")
}
