//! Storage traits and implementations.
//!
//! This module abstracts the administrative operations nmon2influxdb needs
//! from the backing time-series store. The [`Connection`] trait is implemented
//! by [`InfluxConnection`] for production use and by [`InMemoryStore`] for
//! development and testing.

pub mod influx;
pub mod memory;

pub use influx::{InfluxConnection, InfluxConnectionFactory};
pub use memory::{InMemoryConnection, InMemoryStore, StoreCall};

use crate::config::{Config, InvalidRetention};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while talking to the backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request could not be sent or its response could not be read.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with an unexpected HTTP status.
    #[error("unexpected HTTP status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The store rejected the statement.
    #[error("query failed: {0}")]
    Query(String),

    /// The response did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The database has no default retention policy.
    #[error("database {0} has no default retention policy")]
    NoDefaultPolicy(String),

    /// The retention literal is malformed.
    #[error(transparent)]
    InvalidRetention(#[from] InvalidRetention),

    /// Failed to acquire lock on the store.
    #[error("Failed to acquire lock on store")]
    LockError,
}

/// Where and as whom to connect, and which database a handle is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    /// Server host name.
    pub host: String,
    /// Server port.
    pub port: String,
    /// Database the handle is scoped to.
    pub database: String,
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
    /// Log every statement and response.
    pub debug: bool,
}

impl ConnectionSettings {
    /// Connection settings of `config` scoped to `database`.
    #[must_use]
    pub fn for_database(config: &Config, database: &str) -> Self {
        Self {
            host: config.connection.server.clone(),
            port: config.connection.port.clone(),
            database: database.to_string(),
            user: config.connection.user.clone(),
            password: config.connection.password.clone(),
            debug: config.debug,
        }
    }
}

/// A handle on the backing store scoped to one database.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Connection: Send + Sync {
    /// Database this handle is scoped to.
    fn database(&self) -> &str;

    /// Returns whether database `name` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    async fn exist_db(&self, name: &str) -> Result<bool, StoreError>;

    /// Creates database `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the creation.
    async fn create_db(&self, name: &str) -> Result<(), StoreError>;

    /// Returns the name of the default retention policy of the scoped
    /// database.
    ///
    /// # Errors
    ///
    /// Returns an error if the policies cannot be listed or none is default.
    async fn default_retention_policy(&self) -> Result<String, StoreError>;

    /// Creates retention policy `name` on the scoped database.
    ///
    /// # Errors
    ///
    /// Returns an error if the duration is malformed or the store rejects the
    /// creation.
    async fn set_retention_policy(
        &self,
        name: &str,
        duration: &str,
        default: bool,
    ) -> Result<(), StoreError>;

    /// Alters the existing retention policy `name` of the scoped database.
    ///
    /// # Errors
    ///
    /// Returns an error if the duration is malformed or the store rejects the
    /// change.
    async fn update_retention_policy(
        &self,
        name: &str,
        duration: &str,
        default: bool,
    ) -> Result<(), StoreError>;
}

/// Opens [`Connection`] handles.
pub trait ConnectionFactory: Send + Sync {
    /// Handle type produced by this factory.
    type Connection: Connection;

    /// Opens a handle scoped to `settings.database`.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle cannot be set up.
    fn connect(&self, settings: &ConnectionSettings) -> Result<Self::Connection, StoreError>;
}
