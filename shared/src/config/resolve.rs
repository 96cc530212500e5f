//! Configuration resolution.

use super::file::{is_file, ConfigError, ConfigFile, ConfigLocator};
use super::{CliOverrides, Config};
use std::path::{Path, PathBuf};

/// The parts of the runtime environment the defaults depend on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Login name of the current user.
    pub user_name: String,
    /// Home directory of the current user.
    pub home_dir: PathBuf,
}

impl Environment {
    /// Creates an environment from explicit values.
    #[must_use]
    pub fn new(user_name: impl Into<String>, home_dir: impl Into<PathBuf>) -> Self {
        Self {
            user_name: user_name.into(),
            home_dir: home_dir.into(),
        }
    }

    /// Reads the environment of the running process.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Environment`] if the login name or the home
    /// directory cannot be determined.
    pub fn current() -> Result<Self, ConfigError> {
        let user_name = users::get_current_username()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or(ConfigError::Environment("login name"))?;
        let home_dir = dirs::home_dir().ok_or(ConfigError::Environment("home directory"))?;
        Ok(Self::new(user_name, home_dir))
    }
}

/// Resolves the configuration of a run.
///
/// Precedence, lowest first: built-in defaults, the configuration file, the
/// command line. The configuration file is created from the defaults the
/// first time it is needed.
///
/// # Example
///
/// ```
/// use shared::config::{CliOverrides, ConfigLocator, Environment, Flag, Resolver};
///
/// let dir = tempfile::tempdir().unwrap();
/// let resolver = Resolver::new(
///     Environment::new("nmon", dir.path()),
///     ConfigLocator::new(dir.path().join("absent"), dir.path().join("nmon.cfg")),
/// );
///
/// let overrides = CliOverrides::new().with(Flag::Db, "perf").unwrap();
/// let config = resolver.resolve(&overrides).unwrap();
/// assert_eq!(config.connection.database, "perf");
/// assert!(dir.path().join("nmon.cfg").is_file());
/// ```
#[derive(Debug, Clone)]
pub struct Resolver {
    env: Environment,
    locator: ConfigLocator,
}

impl Resolver {
    /// Creates a resolver for the given environment and file locations.
    #[must_use]
    pub fn new(env: Environment, locator: ConfigLocator) -> Self {
        Self { env, locator }
    }

    /// Creates a resolver for the running process using the standard file
    /// locations.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment cannot be read.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env = Environment::current()?;
        let locator = ConfigLocator::standard(&env.home_dir);
        Ok(Self::new(env, locator))
    }

    /// Returns the built-in defaults.
    #[must_use]
    pub fn defaults(&self) -> Config {
        Config::defaults(&self.env)
    }

    /// Returns the configuration file path in effect.
    #[must_use]
    pub fn config_path(&self) -> &Path {
        self.locator.locate()
    }

    /// Resolves defaults and the configuration file, ignoring the command
    /// line.
    ///
    /// Writes the defaults to the configuration file first if it does not
    /// exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written, read or parsed.
    pub fn load(&self) -> Result<Config, ConfigError> {
        let defaults = self.defaults();
        let path = self.config_path();

        if !is_file(path) {
            ConfigFile::from(&defaults).write(path)?;
            tracing::info!(path = %path.display(), "Generating default configuration file");
        }

        let file = ConfigFile::read(path)?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(file.apply(defaults))
    }

    /// Resolves the full configuration of a run.
    ///
    /// When the resolved configuration builds a dashboard, the Grafana
    /// parameters are taken from a fresh [`Resolver::load`] instead: they can
    /// only come from the configuration file or the defaults, never from the
    /// command line.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written, read or parsed.
    pub fn resolve(&self, overrides: &CliOverrides) -> Result<Config, ConfigError> {
        let config = overrides.apply(self.load()?);

        if !config.import.build_dashboard {
            return Ok(config);
        }

        let fresh = self.load()?;
        Ok(Config {
            dashboard: fresh.dashboard,
            ..config
        })
    }
}
