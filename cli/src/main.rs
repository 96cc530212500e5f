//! nmon2influxdb CLI
//!
//! Resolves the configuration of a run and provisions the `InfluxDB`
//! databases nmon data is imported into.
//!
//! # Usage
//!
//! ```bash
//! nmon2influxdb --help
//! nmon2influxdb config
//! nmon2influxdb --server influx01 provision --role log --log_retention 7d
//! nmon2influxdb provision --debug --role main
//! ```

#![deny(unsafe_code)]

mod args;

use anyhow::{Context, Result};
use args::{Cli, Commands, Target};
use clap::{CommandFactory, FromArgMatches};
use shared::config::{Config, ConfigFile, Resolver};
use shared::provision::{Provisioner, Role};
use shared::storage::InfluxConnectionFactory;

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

/// Roles a `provision` run targets for `config`.
fn roles(target: Target, config: &Config) -> Vec<Role> {
    match target {
        Target::Main => vec![Role::Main],
        Target::Hmc => vec![Role::Secondary],
        Target::Log => vec![Role::Log],
        Target::All => {
            let mut roles = vec![Role::Main];
            if config.hmc.server.is_empty() {
                tracing::info!("No HMC server configured, skipping HMC database");
            } else {
                roles.push(Role::Secondary);
            }
            roles.push(Role::Log);
            roles
        }
    }
}

async fn provision(target: Target, config: &Config) -> Result<()> {
    let factory = InfluxConnectionFactory::new().context("Failed to set up InfluxDB client")?;
    let provisioner = Provisioner::new(factory);

    for role in roles(target, config) {
        let (database, _) = role.target(config);
        provisioner
            .ensure_database(role, config)
            .await
            .with_context(|| format!("Failed to provision {role} database"))?;
        tracing::info!(%role, %database, "Database ready");
    }

    Ok(())
}

fn show(resolver: &Resolver, config: &Config) -> Result<()> {
    let text = ConfigFile::from(config)
        .masked()
        .to_toml()
        .context("Failed to render configuration")?;
    println!("# {}", resolver.config_path().display());
    print!("{text}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    init_tracing(cli.debug);

    let Some(command) = &cli.command else {
        println!("nmon2influxdb v{}", env!("CARGO_PKG_VERSION"));
        println!("Use --help for usage information");
        return Ok(());
    };

    let overrides = args::overrides(&cli, &matches)?;
    let resolver = Resolver::from_env().context("Failed to inspect the environment")?;
    let config = resolver
        .resolve(&overrides)
        .context("Failed to resolve configuration")?;

    match command {
        Commands::Config(_) => show(&resolver, &config),
        Commands::Provision(args) => provision(args.role, &config).await,
    }
}
