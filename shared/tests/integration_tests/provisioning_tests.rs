//! Integration tests for provisioning a resolved configuration.
//!
//! Each test resolves a configuration from a temporary home, then provisions
//! it against an in-memory store.

use shared::config::{CliOverrides, Flag};
use shared::provision::{ProvisionError, Provisioner, Role, LOG_RETENTION_POLICY};
use shared::storage::memory::AUTOGEN_POLICY;
use shared::storage::{Connection, InMemoryStore, StoreCall};

use super::common::test_home;

#[tokio::test]
async fn test_provision_all_roles_from_fresh_configuration() {
    let home = test_home();
    let config = home.resolver.resolve(&CliOverrides::new()).unwrap();
    let store = InMemoryStore::new();
    let provisioner = Provisioner::new(store.clone());

    for role in Role::ALL {
        provisioner.ensure_database(role, &config).await.unwrap();
    }

    assert!(store.has_database("nmon_reports").unwrap());
    assert!(store.has_database("nmon2influxdbHMC").unwrap());
    assert!(store.has_database("nmon2influxdb_log").unwrap());
    assert_eq!(
        store.policy("nmon2influxdb_log", LOG_RETENTION_POLICY).unwrap(),
        Some(("2d".to_string(), true))
    );
    assert_eq!(
        store.policy("nmon_reports", AUTOGEN_POLICY).unwrap(),
        Some(("0s".to_string(), true))
    );
}

#[tokio::test]
async fn test_main_retention_from_file_is_idempotent() {
    let home = test_home();
    home.write_user_file("import_data_retention = \"30d\"\n");
    let config = home.resolver.resolve(&CliOverrides::new()).unwrap();
    let store = InMemoryStore::new();
    let provisioner = Provisioner::new(store.clone());

    provisioner.ensure_database(Role::Main, &config).await.unwrap();
    let after_first = store.policy("nmon_reports", AUTOGEN_POLICY).unwrap();
    assert_eq!(after_first, Some(("30d".to_string(), true)));

    store.clear_calls().unwrap();
    provisioner.ensure_database(Role::Main, &config).await.unwrap();
    assert_eq!(store.policy("nmon_reports", AUTOGEN_POLICY).unwrap(), after_first);
    assert!(!store
        .calls()
        .unwrap()
        .iter()
        .any(|call| matches!(call, StoreCall::CreateDb(_))));
}

#[tokio::test]
async fn test_log_retention_follows_command_line() {
    let home = test_home();
    let store = InMemoryStore::new();
    let provisioner = Provisioner::new(store.clone());

    let config = home.resolver.resolve(&CliOverrides::new()).unwrap();
    provisioner.ensure_database(Role::Log, &config).await.unwrap();

    let overrides = CliOverrides::new().with(Flag::LogRetention, "7d").unwrap();
    let config = home.resolver.resolve(&overrides).unwrap();
    store.clear_calls().unwrap();
    provisioner.ensure_database(Role::Log, &config).await.unwrap();

    assert_eq!(
        store.policy("nmon2influxdb_log", LOG_RETENTION_POLICY).unwrap(),
        Some(("7d".to_string(), true))
    );
    assert_eq!(
        store.calls().unwrap(),
        vec![
            StoreCall::ExistDb("nmon2influxdb_log".to_string()),
            StoreCall::UpdateRetentionPolicy {
                database: "nmon2influxdb_log".to_string(),
                name: LOG_RETENTION_POLICY.to_string(),
                duration: "7d".to_string(),
                default: true,
            },
        ]
    );
}

#[tokio::test]
async fn test_log_database_created_outside_fails_update() {
    let home = test_home();
    let config = home.resolver.resolve(&CliOverrides::new()).unwrap();
    let store = InMemoryStore::new();
    store.seed_database("nmon2influxdb_log").unwrap();

    let err = Provisioner::new(store.clone())
        .ensure_database(Role::Log, &config)
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::UpdatePolicy { .. }));
}

#[tokio::test]
async fn test_hmc_database_from_command_line() {
    let home = test_home();
    home.write_user_file("hmc_database = \"hmc_perf\"\nhmc_data_retention = \"90d\"\n");
    let overrides = CliOverrides::new().with(Flag::Hmc, "hmc01").unwrap();
    let config = home.resolver.resolve(&overrides).unwrap();
    let store = InMemoryStore::new();

    let connection = Provisioner::new(store.clone())
        .ensure_database(Role::Secondary, &config)
        .await
        .unwrap();

    assert_eq!(connection.database(), "hmc_perf");
    assert_eq!(
        store.policy("hmc_perf", AUTOGEN_POLICY).unwrap(),
        Some(("90d".to_string(), true))
    );
    assert!(!store.has_database("nmon_reports").unwrap());
}
