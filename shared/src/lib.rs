//! nmon2influxdb Shared Library
//!
//! This crate resolves the configuration of a run and provisions the
//! `InfluxDB` databases nmon data is imported into.
//!
//! # Modules
//!
//! - [`config`] - Defaults, configuration file and command-line overrides
//! - [`storage`] - Backing store connection trait and implementations
//! - [`provision`] - Database and retention policy provisioning
//!
//! # Example
//!
//! ```
//! use shared::config::{Config, Environment};
//! use shared::provision::{Provisioner, Role};
//! use shared::storage::InMemoryStore;
//!
//! # tokio_test::block_on(async {
//! let config = Config::defaults(&Environment::new("nmon", "/home/nmon"));
//! let store = InMemoryStore::new();
//!
//! Provisioner::new(store.clone())
//!     .ensure_database(Role::Log, &config)
//!     .await
//!     .unwrap();
//!
//! assert!(store.has_database("nmon2influxdb_log").unwrap());
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod provision;
pub mod storage;
