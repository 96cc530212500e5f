//! Command-line declarations and their translation into [`CliOverrides`].
//!
//! Every argument id equals the [`Flag::name`] it feeds, so the value source
//! of a flag can be looked up directly in the parsed matches.

use clap::parser::ValueSource;
use clap::{ArgMatches, Args, Parser, Subcommand, ValueEnum};
use shared::config::{CliOverrides, Flag, FlagValue, OverrideError};

/// nmon2influxdb - resolve configuration and provision `InfluxDB` databases
#[derive(Debug, Parser)]
#[command(name = "nmon2influxdb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log diagnostics at debug level
    #[arg(long, global = true)]
    pub debug: bool,

    /// InfluxDB server
    #[arg(short, long, global = true)]
    pub server: Option<String>,

    /// InfluxDB user
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// InfluxDB port
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    /// InfluxDB database
    #[arg(short, long, global = true)]
    pub db: Option<String>,

    /// InfluxDB password
    #[arg(long, global = true)]
    pub pass: Option<String>,

    /// Timezone of the nmon timestamps
    #[arg(long, global = true)]
    pub tz: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the resolved configuration
    Config(RunArgs),
    /// Create databases and converge their retention policies
    Provision(ProvisionArgs),
}

impl Commands {
    fn run_args(&self) -> &RunArgs {
        match self {
            Commands::Config(args) => args,
            Commands::Provision(args) => &args.run,
        }
    }
}

/// Databases a `provision` run targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
    /// Main database
    Main,
    /// HMC database
    Hmc,
    /// Import log database
    Log,
    /// Main and log databases, plus HMC when an HMC server is configured
    All,
}

#[derive(Debug, Args)]
pub struct ProvisionArgs {
    /// Databases to provision
    #[arg(long, value_enum, default_value_t = Target::All)]
    pub role: Target,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Flags feeding the configuration, shared by every subcommand.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Metric to report on
    #[arg(long)]
    pub metric: Option<String>,

    /// Host filter of statistics
    #[arg(long)]
    pub statshost: Option<String>,

    /// Start of the statistics time range
    #[arg(long)]
    pub from: Option<String>,

    /// End of the statistics time range
    #[arg(long)]
    pub to: Option<String>,

    /// Maximum number of rows in statistics
    #[arg(long)]
    pub limit: Option<u32>,

    /// Filter expression of statistics and listings
    #[arg(long)]
    pub filter: Option<String>,

    /// Skip disk metrics
    #[arg(long)]
    pub nodisks: bool,

    /// Import every CPU
    #[arg(long)]
    pub cpus: bool,

    /// Build the Grafana dashboard
    #[arg(long)]
    pub build: bool,

    /// Regular expression of the metrics to skip
    #[arg(long = "skip_metrics")]
    pub skip_metrics: Option<String>,

    /// Import log database
    #[arg(long = "log_database")]
    pub log_database: Option<String>,

    /// Retention of the import log database
    #[arg(long = "log_retention")]
    pub log_retention: Option<String>,

    /// Write the dashboard to a file
    #[arg(long)]
    pub file: bool,

    /// Re-import files already imported
    #[arg(long)]
    pub force: bool,

    /// Host filter of listings
    #[arg(long)]
    pub host: Option<String>,

    /// Grafana user
    #[arg(long)]
    pub guser: Option<String>,

    /// Grafana password
    #[arg(long)]
    pub gpassword: Option<String>,

    /// Grafana datasource access mode
    #[arg(long)]
    pub gaccess: Option<String>,

    /// Grafana URL
    #[arg(long)]
    pub gurl: Option<String>,

    /// Grafana datasource name
    #[arg(long)]
    pub datasource: Option<String>,

    /// HMC server
    #[arg(long)]
    pub hmc: Option<String>,

    /// HMC user
    #[arg(long)]
    pub hmcuser: Option<String>,

    /// HMC password
    #[arg(long)]
    pub hmcpass: Option<String>,

    /// Only collect this managed system
    #[arg(long = "managed_system")]
    pub managed_system: Option<String>,

    /// Only collect managed system metrics
    #[arg(id = "managed_system-only", long = "managed_system-only")]
    pub managed_system_only: bool,

    /// Number of HMC samples
    #[arg(long)]
    pub samples: Option<u32>,
}

fn record<T: Into<FlagValue>>(
    overrides: &mut CliOverrides,
    matches: &ArgMatches,
    flag: Flag,
    value: Option<T>,
) -> Result<(), OverrideError> {
    match value {
        Some(value) => {
            let explicit = matches.value_source(flag.name()) == Some(ValueSource::CommandLine);
            overrides.insert(flag, value, explicit)
        }
        None => Ok(()),
    }
}

/// Collects the flags of a parsed command line.
///
/// Text and integer flags that were not given are left out. Switches are
/// always recorded, marked explicit only when typed.
///
/// # Errors
///
/// Returns an error if a declared argument does not match its flag type.
pub fn overrides(cli: &Cli, matches: &ArgMatches) -> Result<CliOverrides, OverrideError> {
    let mut overrides = CliOverrides::new();

    record(&mut overrides, matches, Flag::Debug, Some(cli.debug))?;
    record(&mut overrides, matches, Flag::Server, cli.server.clone())?;
    record(&mut overrides, matches, Flag::User, cli.user.clone())?;
    record(&mut overrides, matches, Flag::Port, cli.port.clone())?;
    record(&mut overrides, matches, Flag::Db, cli.db.clone())?;
    record(&mut overrides, matches, Flag::Pass, cli.pass.clone())?;
    record(&mut overrides, matches, Flag::Tz, cli.tz.clone())?;

    let (Some(command), Some((_, sub))) = (&cli.command, matches.subcommand()) else {
        return Ok(overrides);
    };
    let args = command.run_args();

    record(&mut overrides, sub, Flag::Metric, args.metric.clone())?;
    record(&mut overrides, sub, Flag::StatsHost, args.statshost.clone())?;
    record(&mut overrides, sub, Flag::From, args.from.clone())?;
    record(&mut overrides, sub, Flag::To, args.to.clone())?;
    record(&mut overrides, sub, Flag::Limit, args.limit)?;
    record(&mut overrides, sub, Flag::Filter, args.filter.clone())?;
    record(&mut overrides, sub, Flag::NoDisks, Some(args.nodisks))?;
    record(&mut overrides, sub, Flag::Cpus, Some(args.cpus))?;
    record(&mut overrides, sub, Flag::Build, Some(args.build))?;
    record(&mut overrides, sub, Flag::SkipMetrics, args.skip_metrics.clone())?;
    record(&mut overrides, sub, Flag::LogDatabase, args.log_database.clone())?;
    record(&mut overrides, sub, Flag::LogRetention, args.log_retention.clone())?;
    record(&mut overrides, sub, Flag::File, Some(args.file))?;
    record(&mut overrides, sub, Flag::Force, Some(args.force))?;
    record(&mut overrides, sub, Flag::Host, args.host.clone())?;
    record(&mut overrides, sub, Flag::GrafanaUser, args.guser.clone())?;
    record(&mut overrides, sub, Flag::GrafanaPassword, args.gpassword.clone())?;
    record(&mut overrides, sub, Flag::GrafanaAccess, args.gaccess.clone())?;
    record(&mut overrides, sub, Flag::GrafanaUrl, args.gurl.clone())?;
    record(&mut overrides, sub, Flag::Datasource, args.datasource.clone())?;
    record(&mut overrides, sub, Flag::Hmc, args.hmc.clone())?;
    record(&mut overrides, sub, Flag::HmcUser, args.hmcuser.clone())?;
    record(&mut overrides, sub, Flag::HmcPass, args.hmcpass.clone())?;
    record(&mut overrides, sub, Flag::ManagedSystem, args.managed_system.clone())?;
    record(
        &mut overrides,
        sub,
        Flag::ManagedSystemOnly,
        Some(args.managed_system_only),
    )?;
    record(&mut overrides, sub, Flag::Samples, args.samples)?;

    Ok(overrides)
}
