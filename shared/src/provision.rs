//! Database provisioning.
//!
//! Makes the backing store match a resolved [`Config`]: every database exists
//! and carries the configured retention. Each step is idempotent, so a failed
//! run is recovered by running again.

use crate::config::Config;
use crate::storage::{Connection, ConnectionFactory, ConnectionSettings, StoreError};
use std::fmt;
use thiserror::Error;

/// Name of the retention policy owned by the log database.
pub const LOG_RETENTION_POLICY: &str = "log_retention";

/// Which database of the configuration a provisioning call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Main database receiving nmon data.
    Main,
    /// HMC database.
    Secondary,
    /// Import log database.
    Log,
}

impl Role {
    /// Every role, in provisioning order.
    pub const ALL: [Role; 3] = [Role::Main, Role::Secondary, Role::Log];

    /// Database name and retention literal this role targets in `config`.
    ///
    /// # Examples
    ///
    /// ```
    /// use shared::config::{Config, Environment};
    /// use shared::provision::Role;
    ///
    /// let config = Config::defaults(&Environment::new("nmon", "/home/nmon"));
    /// assert_eq!(Role::Log.target(&config), ("nmon2influxdb_log", "2d"));
    /// assert_eq!(Role::Main.target(&config), ("nmon_reports", ""));
    /// ```
    #[must_use]
    pub fn target(self, config: &Config) -> (&str, &str) {
        match self {
            Role::Main => (&config.connection.database, &config.import.data_retention),
            Role::Secondary => (&config.hmc.database, &config.hmc.data_retention),
            Role::Log => (&config.import.log_database, &config.import.log_retention),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Main => "main",
            Role::Secondary => "secondary",
            Role::Log => "log",
        })
    }
}

/// Errors that abort provisioning. Each names the step that failed.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// No handle could be opened.
    #[error("failed to connect to database {database}")]
    Connect {
        /// Target database.
        database: String,
        /// Store error.
        #[source]
        source: StoreError,
    },

    /// The existence check failed.
    #[error("failed to check whether database {database} exists")]
    Exists {
        /// Target database.
        database: String,
        /// Store error.
        #[source]
        source: StoreError,
    },

    /// The database could not be created.
    #[error("failed to create database {database}")]
    Create {
        /// Target database.
        database: String,
        /// Store error.
        #[source]
        source: StoreError,
    },

    /// The default retention policy could not be looked up.
    #[error("failed to look up the default retention policy of {database}")]
    DefaultPolicy {
        /// Target database.
        database: String,
        /// Store error.
        #[source]
        source: StoreError,
    },

    /// A retention policy could not be created.
    #[error("failed to create retention policy {policy} on {database}")]
    SetPolicy {
        /// Target database.
        database: String,
        /// Policy name.
        policy: String,
        /// Store error.
        #[source]
        source: StoreError,
    },

    /// A retention policy could not be changed.
    #[error("failed to update retention policy {policy} on {database}")]
    UpdatePolicy {
        /// Target database.
        database: String,
        /// Policy name.
        policy: String,
        /// Store error.
        #[source]
        source: StoreError,
    },
}

/// Provisions databases through a [`ConnectionFactory`].
#[derive(Debug, Clone)]
pub struct Provisioner<F> {
    factory: F,
}

impl<F: ConnectionFactory> Provisioner<F> {
    /// Creates a provisioner opening handles through `factory`.
    #[must_use]
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    /// Ensures the database of `role` exists with the configured retention
    /// and returns a handle on it.
    ///
    /// Main and secondary databases are created if absent; when a retention
    /// literal is configured their current default policy, whatever its
    /// name, is updated to it. The log database owns the fixed
    /// [`LOG_RETENTION_POLICY`], created along with the database and updated
    /// on every later run.
    ///
    /// # Errors
    ///
    /// Returns the first failing step. Nothing is rolled back.
    pub async fn ensure_database(
        &self,
        role: Role,
        config: &Config,
    ) -> Result<F::Connection, ProvisionError> {
        let (database, retention) = role.target(config);
        let settings = ConnectionSettings::for_database(config, database);
        let connection = self
            .factory
            .connect(&settings)
            .map_err(|source| ProvisionError::Connect {
                database: database.to_string(),
                source,
            })?;

        let exists = connection
            .exist_db(database)
            .await
            .map_err(|source| ProvisionError::Exists {
                database: database.to_string(),
                source,
            })?;

        match role {
            Role::Main | Role::Secondary => {
                converge_standard(&connection, exists, retention).await?;
            }
            Role::Log => {
                converge_log(&connection, exists, retention).await?;
            }
        }

        Ok(connection)
    }
}

async fn create<C: Connection>(connection: &C) -> Result<(), ProvisionError> {
    let database = connection.database();
    tracing::info!(%database, "Creating InfluxDB database");
    connection
        .create_db(database)
        .await
        .map_err(|source| ProvisionError::Create {
            database: database.to_string(),
            source,
        })
}

async fn converge_standard<C: Connection>(
    connection: &C,
    exists: bool,
    retention: &str,
) -> Result<(), ProvisionError> {
    let database = connection.database();
    if !exists {
        create(connection).await?;
    }

    if retention.is_empty() {
        return Ok(());
    }

    let policy = connection
        .default_retention_policy()
        .await
        .map_err(|source| ProvisionError::DefaultPolicy {
            database: database.to_string(),
            source,
        })?;

    tracing::info!(
        %database,
        %policy,
        %retention,
        "Updating retention policy, timestamp based"
    );
    connection
        .update_retention_policy(&policy, retention, true)
        .await
        .map_err(|source| ProvisionError::UpdatePolicy {
            database: database.to_string(),
            policy: policy.clone(),
            source,
        })
}

async fn converge_log<C: Connection>(
    connection: &C,
    exists: bool,
    retention: &str,
) -> Result<(), ProvisionError> {
    let database = connection.database();

    if exists {
        tracing::debug!(
            %database,
            policy = LOG_RETENTION_POLICY,
            %retention,
            "Updating retention policy"
        );
        return connection
            .update_retention_policy(LOG_RETENTION_POLICY, retention, true)
            .await
            .map_err(|source| ProvisionError::UpdatePolicy {
                database: database.to_string(),
                policy: LOG_RETENTION_POLICY.to_string(),
                source,
            });
    }

    create(connection).await?;
    tracing::info!(
        %database,
        policy = LOG_RETENTION_POLICY,
        %retention,
        "Creating retention policy"
    );
    connection
        .set_retention_policy(LOG_RETENTION_POLICY, retention, true)
        .await
        .map_err(|source| ProvisionError::SetPolicy {
            database: database.to_string(),
            policy: LOG_RETENTION_POLICY.to_string(),
            source,
        })
}
