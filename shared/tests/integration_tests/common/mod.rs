//! Common test utilities and helpers for integration tests.

use shared::config::{ConfigLocator, Environment, Resolver};
use std::path::PathBuf;
use tempfile::TempDir;

/// A resolver confined to a temporary home directory.
pub struct TestHome {
    /// Keeps the directory alive for the duration of the test.
    pub dir: TempDir,
    /// Resolver using the directory as home and as system config directory.
    pub resolver: Resolver,
}

impl TestHome {
    /// Path of the per-user configuration file.
    pub fn user_file(&self) -> PathBuf {
        self.dir.path().join(".nmon2influxdb.cfg")
    }

    /// Path of the system-wide configuration file.
    pub fn system_file(&self) -> PathBuf {
        self.dir.path().join("etc").join("nmon2influxdb.cfg")
    }

    /// Writes the per-user configuration file.
    pub fn write_user_file(&self, text: &str) {
        std::fs::write(self.user_file(), text).unwrap();
    }
}

/// Creates a fresh temporary home with no configuration file.
pub fn test_home() -> TestHome {
    let dir = tempfile::tempdir().unwrap();
    let resolver = Resolver::new(
        Environment::new("nmon", dir.path()),
        ConfigLocator::new(
            dir.path().join("etc").join("nmon2influxdb.cfg"),
            dir.path().join(".nmon2influxdb.cfg"),
        ),
    );
    TestHome { dir, resolver }
}
