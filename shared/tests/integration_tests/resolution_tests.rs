//! Integration tests for configuration resolution.
//!
//! Tests cover:
//! - Bootstrap of a missing configuration file
//! - Precedence of defaults, file and command line
//! - The explicit-only `cpus` flag
//! - Grafana parameters when a dashboard is built

use shared::config::{CliOverrides, ConfigError, Flag};

use super::common::test_home;

const FILE_WITH_DASHBOARD: &str = r#"
grafana_user = "file-user"
grafana_password = "file-password"
grafana_URL = "http://grafana.file:3000"
grafana_access = "proxy"
grafana_datasource = "file-datasource"
"#;

fn dashboard_overrides() -> CliOverrides {
    CliOverrides::new()
        .with(Flag::GrafanaUser, "cli-user")
        .and_then(|o| o.with(Flag::GrafanaPassword, "cli-password"))
        .and_then(|o| o.with(Flag::GrafanaUrl, "http://grafana.cli:3000"))
        .and_then(|o| o.with(Flag::GrafanaAccess, "direct"))
        .and_then(|o| o.with(Flag::Datasource, "cli-datasource"))
        .unwrap()
}

#[test]
fn test_fresh_resolution_equals_defaults() {
    let home = test_home();

    let config = home.resolver.resolve(&CliOverrides::new()).unwrap();
    assert!(home.user_file().is_file());
    assert_eq!(config, home.resolver.defaults());
}

#[test]
fn test_fresh_resolution_concrete_values() {
    let home = test_home();

    let config = home.resolver.resolve(&CliOverrides::new()).unwrap();
    assert_eq!(config.connection.database, "nmon_reports");
    assert_eq!(config.hmc.database, "nmon2influxdbHMC");
    assert_eq!(config.import.log_database, "nmon2influxdb_log");
    assert_eq!(config.import.log_retention, "2d");
    assert_eq!(config.report.stats_limit, 20);
    assert_eq!(config.report.stats_sort, "mean");
    assert_eq!(config.import.ssh_user, "nmon");
    assert_eq!(
        config.import.ssh_key,
        home.dir.path().join(".ssh").join("id_rsa").to_string_lossy()
    );
}

#[test]
fn test_bootstrap_round_trip() {
    let home = test_home();

    let first = home.resolver.resolve(&CliOverrides::new()).unwrap();
    let written = std::fs::read_to_string(home.user_file()).unwrap();
    let second = home.resolver.resolve(&CliOverrides::new()).unwrap();
    assert_eq!(first, second);
    assert_eq!(std::fs::read_to_string(home.user_file()).unwrap(), written);

    std::fs::remove_file(home.user_file()).unwrap();
    let third = home.resolver.resolve(&CliOverrides::new()).unwrap();
    assert_eq!(first, third);
}

#[test]
fn test_file_values_override_defaults() {
    let home = test_home();
    home.write_user_file(
        r#"
influxdb_server = "influx.file"
import_data_retention = "30d"
hmc_samples = 12

[[input]]
measurement = "TOP"
name = "java"
match = "java"
"#,
    );

    let config = home.resolver.resolve(&CliOverrides::new()).unwrap();
    assert_eq!(config.connection.server, "influx.file");
    assert_eq!(config.import.data_retention, "30d");
    assert_eq!(config.hmc.samples, 12);
    assert_eq!(config.inputs.len(), 1);
    assert_eq!(config.inputs[0].name, "java");
    // absent keys keep their defaults
    assert_eq!(config.connection.port, "8086");
}

#[test]
fn test_command_line_wins_over_file() {
    let home = test_home();
    home.write_user_file(
        r#"
influxdb_server = "influx.file"
influxdb_port = "9086"
influxdb_user = "file"
influxdb_password = "file"
influxdb_database = "file_db"
timezone = "UTC"
debug = true
import_skip_disks = true
import_force = true
import_skip_metrics = "TOP"
import_log_database = "file_log"
import_log_retention = "30d"
dashboard_write_file = true
hmc_server = "hmc.file"
hmc_user = "file"
hmc_password = "file"
hmc_managed_system = "file-ms"
hmc_managed_system_only = true
hmc_samples = 3
stats_limit = 50
stats_filter = "file"
stats_from = "file"
stats_to = "file"
stats_host = "file"
metric = "file"
list_filter = "file"
list_host = "file"
"#,
    );

    let overrides = CliOverrides::new()
        .with(Flag::Server, "influx.cli")
        .and_then(|o| o.with(Flag::Port, "8086"))
        .and_then(|o| o.with(Flag::User, "cli"))
        .and_then(|o| o.with(Flag::Pass, "cli"))
        .and_then(|o| o.with(Flag::Db, "cli_db"))
        .and_then(|o| o.with(Flag::Tz, "Europe/Paris"))
        .and_then(|o| o.with(Flag::Debug, false))
        .and_then(|o| o.with(Flag::NoDisks, false))
        .and_then(|o| o.with(Flag::Force, false))
        .and_then(|o| o.with(Flag::SkipMetrics, "PCPU"))
        .and_then(|o| o.with(Flag::LogDatabase, "cli_log"))
        .and_then(|o| o.with(Flag::LogRetention, "7d"))
        .and_then(|o| o.with(Flag::File, false))
        .and_then(|o| o.with(Flag::Hmc, "hmc.cli"))
        .and_then(|o| o.with(Flag::HmcUser, "cli"))
        .and_then(|o| o.with(Flag::HmcPass, "cli"))
        .and_then(|o| o.with(Flag::ManagedSystem, "cli-ms"))
        .and_then(|o| o.with(Flag::ManagedSystemOnly, false))
        .and_then(|o| o.with(Flag::Samples, 7_u32))
        .and_then(|o| o.with(Flag::Limit, 5_u32))
        .and_then(|o| o.with(Flag::Filter, "cli"))
        .and_then(|o| o.with(Flag::From, "cli"))
        .and_then(|o| o.with(Flag::To, "cli"))
        .and_then(|o| o.with(Flag::StatsHost, "cli"))
        .and_then(|o| o.with(Flag::Metric, "cli"))
        .and_then(|o| o.with(Flag::Host, "cli"))
        .unwrap();

    let config = home.resolver.resolve(&overrides).unwrap();
    assert_eq!(config.connection.server, "influx.cli");
    assert_eq!(config.connection.port, "8086");
    assert_eq!(config.connection.user, "cli");
    assert_eq!(config.connection.password, "cli");
    assert_eq!(config.connection.database, "cli_db");
    assert_eq!(config.timezone, "Europe/Paris");
    assert!(!config.debug);
    assert!(!config.import.skip_disks);
    assert!(!config.import.force);
    assert_eq!(config.import.skip_metrics, "PCPU");
    assert_eq!(config.import.log_database, "cli_log");
    assert_eq!(config.import.log_retention, "7d");
    assert!(!config.import.dashboard_write_file);
    assert_eq!(config.hmc.server, "hmc.cli");
    assert_eq!(config.hmc.user, "cli");
    assert_eq!(config.hmc.password, "cli");
    assert_eq!(config.hmc.managed_system, "cli-ms");
    assert!(!config.hmc.managed_system_only);
    assert_eq!(config.hmc.samples, 7);
    assert_eq!(config.report.stats_limit, 5);
    assert_eq!(config.report.stats_filter, "cli");
    assert_eq!(config.report.list_filter, "cli");
    assert_eq!(config.report.stats_from, "cli");
    assert_eq!(config.report.stats_to, "cli");
    assert_eq!(config.report.stats_host, "cli");
    assert_eq!(config.report.metric, "cli");
    assert_eq!(config.report.list_host, "cli");
}

#[test]
fn test_defaulted_empty_flag_clears_file_value() {
    let home = test_home();
    home.write_user_file("import_log_retention = \"30d\"\n");

    let mut overrides = CliOverrides::new();
    overrides.insert(Flag::LogRetention, "", false).unwrap();

    let config = home.resolver.resolve(&overrides).unwrap();
    assert_eq!(config.import.log_retention, "");
}

#[test]
fn test_cpus_not_given_keeps_file_value() {
    let home = test_home();
    home.write_user_file("import_all_cpus = true\n");

    let mut overrides = CliOverrides::new();
    overrides.insert(Flag::Cpus, false, false).unwrap();

    let config = home.resolver.resolve(&overrides).unwrap();
    assert!(config.import.all_cpus);
}

#[test]
fn test_cpus_given_overrides_file_value() {
    let home = test_home();
    home.write_user_file("import_all_cpus = true\n");

    let overrides = CliOverrides::new().with(Flag::Cpus, false).unwrap();

    let config = home.resolver.resolve(&overrides).unwrap();
    assert!(!config.import.all_cpus);
}

#[test]
fn test_dashboard_build_ignores_command_line_grafana_values() {
    let home = test_home();
    home.write_user_file(FILE_WITH_DASHBOARD);

    let overrides = dashboard_overrides().with(Flag::Build, true).unwrap();

    let config = home.resolver.resolve(&overrides).unwrap();
    assert!(config.import.build_dashboard);
    assert_eq!(config.dashboard.user, "file-user");
    assert_eq!(config.dashboard.password, "file-password");
    assert_eq!(config.dashboard.url, "http://grafana.file:3000");
    assert_eq!(config.dashboard.access, "proxy");
    assert_eq!(config.dashboard.datasource, "file-datasource");
}

#[test]
fn test_dashboard_build_falls_back_to_defaults() {
    let home = test_home();
    home.write_user_file("influxdb_server = \"influx.file\"\n");

    let overrides = dashboard_overrides().with(Flag::Build, true).unwrap();

    let config = home.resolver.resolve(&overrides).unwrap();
    assert_eq!(config.dashboard, home.resolver.defaults().dashboard);
    assert_eq!(config.connection.server, "influx.file");
}

#[test]
fn test_dashboard_build_from_file_also_ignores_command_line() {
    let home = test_home();
    home.write_user_file(&format!("import_build_dashboard = true\n{FILE_WITH_DASHBOARD}"));

    let config = home.resolver.resolve(&dashboard_overrides()).unwrap();
    assert_eq!(config.dashboard.user, "file-user");
    assert_eq!(config.dashboard.url, "http://grafana.file:3000");
}

#[test]
fn test_grafana_flags_apply_without_build() {
    let home = test_home();
    home.write_user_file(FILE_WITH_DASHBOARD);

    let config = home.resolver.resolve(&dashboard_overrides()).unwrap();
    assert_eq!(config.dashboard.user, "cli-user");
    assert_eq!(config.dashboard.datasource, "cli-datasource");
}

#[test]
fn test_malformed_file_is_fatal() {
    let home = test_home();
    home.write_user_file("influxdb_server = \"unterminated\n");

    let err = home.resolver.resolve(&CliOverrides::new()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().starts_with("syntax error in configuration file"));
}

#[test]
fn test_system_file_takes_precedence() {
    let home = test_home();
    home.write_user_file("influxdb_server = \"influx.user\"\n");
    std::fs::create_dir_all(home.system_file().parent().unwrap()).unwrap();
    std::fs::write(home.system_file(), "influxdb_server = \"influx.system\"\n").unwrap();

    let config = home.resolver.resolve(&CliOverrides::new()).unwrap();
    assert_eq!(home.resolver.config_path(), home.system_file());
    assert_eq!(config.connection.server, "influx.system");
}
