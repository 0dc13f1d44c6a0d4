//! fleetaudit CLI
//!
//! Queries domain machines for licensing and update-compliance status and
//! prints a per-machine report. Machines are processed sequentially; a
//! machine that cannot be queried degrades to sentinel values instead of
//! aborting the run. Only a failed target resolution is fatal.

mod config;
mod report;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::Result;
use eyre::WrapErr;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fleetaudit_exec::{CommandRunner, PowerShellRunner};
use fleetaudit_inventory::cim::CimClient;
use fleetaudit_inventory::collector::FactCollector;
use fleetaudit_inventory::directory::{DirectoryClient, TargetSelection};
use fleetaudit_inventory::types::{LicenseRecord, UpdateRecord};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "fleetaudit")]
#[command(about = "Licensing and update-compliance reports for domain machines", long_about = None)]
struct Cli {
    /// Config file path (otherwise probed from default locations)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report per-machine licensing state
    License(ReportArgs),
    /// Report per-machine pending update counts
    Updates(ReportArgs),
}

#[derive(Args)]
struct ReportArgs {
    /// Explicit machine names; skips the directory query entirely
    #[arg(
        long = "systems",
        value_name = "NAME",
        num_args = 1..,
        conflicts_with_all = ["search_base", "filter", "ldap_filter", "machine_age"]
    )]
    systems: Option<Vec<String>>,

    /// Directory search base DN
    #[arg(long, value_name = "DN")]
    search_base: Option<String>,

    /// Directory filter expression (defaults to *)
    #[arg(long, value_name = "EXPR")]
    filter: Option<String>,

    /// Raw LDAP filter
    #[arg(long, value_name = "FILTER")]
    ldap_filter: Option<String>,

    /// Only include machines seen within this many days (absolute value applied)
    #[arg(long, value_name = "DAYS")]
    machine_age: Option<i64>,

    /// Emit CSV instead of a table
    #[arg(long)]
    csv: bool,
}

impl ReportArgs {
    fn selection(&self, config: &Config) -> TargetSelection {
        match &self.systems {
            Some(names) => TargetSelection::Explicit(names.clone()),
            None => TargetSelection::Directory {
                search_base: self.search_base.clone(),
                filter: self.filter.clone(),
                ldap_filter: self.ldap_filter.clone(),
                machine_age_days: self.machine_age.unwrap_or(config.machine_age_days),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path).wrap_err("failed to load config")?,
        None => Config::load_default()?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with_writer(std::io::stderr)
        .init();

    let timeout = Duration::from_secs(config.query_timeout_secs);
    let runner: Arc<dyn CommandRunner> = Arc::new(PowerShellRunner::with_binary(&config.shell));

    match cli.command {
        Commands::License(args) => {
            let targets = resolve_targets(runner.clone(), &args, &config, timeout).await?;
            let collector = FactCollector::new(CimClient::new(runner).with_timeout(timeout));

            let mut rows = Vec::with_capacity(targets.len());
            for machine in &targets {
                info!(machine = %machine, "collecting licensing state");
                rows.push(collector.license_record(machine).await.fields());
            }

            emit(&LicenseRecord::HEADERS, &rows, args.csv)?;
        }
        Commands::Updates(args) => {
            let targets = resolve_targets(runner.clone(), &args, &config, timeout).await?;
            let collector = FactCollector::new(CimClient::new(runner).with_timeout(timeout));

            let mut rows = Vec::with_capacity(targets.len());
            for machine in &targets {
                info!(machine = %machine, "collecting update status");
                rows.push(collector.update_record(machine).await.fields());
            }

            emit(&UpdateRecord::HEADERS, &rows, args.csv)?;
        }
    }

    Ok(())
}

/// Resolve the target list; failure here aborts the run with no partial report.
async fn resolve_targets(
    runner: Arc<dyn CommandRunner>,
    args: &ReportArgs,
    config: &Config,
    timeout: Duration,
) -> Result<Vec<String>> {
    let directory = DirectoryClient::new(runner).with_timeout(timeout);
    let targets = directory
        .resolve(&args.selection(config))
        .await
        .wrap_err("target resolution failed")?;

    info!(count = targets.len(), "targets resolved");
    Ok(targets)
}

fn emit(headers: &[&str], rows: &[Vec<String>], as_csv: bool) -> Result<()> {
    if as_csv {
        report::write_csv(std::io::stdout().lock(), headers, rows)?;
    } else {
        println!("{}", report::render_table(headers, rows));
    }
    Ok(())
}
