//! # Odoo Backup CLI (`odoo-backup`)
//!
//! Thin driver around the backup engine. `run` performs a single pass over
//! the configured systems, `watch` repeats that pass on a fixed interval
//! forever, and `check` validates the configuration without touching the
//! network. All scheduling state (the pass counter, the interval sleep)
//! lives here; the engine itself is stateless between passes.

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::time::Duration;

use odoo_backup_agent::config::{self, Config};
use odoo_backup_agent::download::Downloader;
use odoo_backup_agent::engine::{Engine, RunReport};
use odoo_backup_agent::fetch::HttpFetcher;

#[derive(Parser)]
#[command(
    name = "odoo-backup",
    about = "Periodic Odoo database backups with source failover and age-based retention",
    version
)]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, global = true, default_value = "./config.json")]
    config: PathBuf,

    /// Timeout for each HTTP backup attempt, in seconds.
    #[arg(long, global = true, default_value_t = 180)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backup pass over all configured systems.
    Run,

    /// Run backup passes forever on a fixed interval.
    ///
    /// The configuration file is re-read before every pass, so edits take
    /// effect without a restart.
    Watch {
        /// Minutes to sleep between passes.
        #[arg(long, default_value_t = 60)]
        interval_minutes: u64,
    },

    /// Validate the configuration and list the configured systems.
    Check,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout_secs);

    match cli.command {
        Commands::Run => {
            let config = config::load_config(&cli.config)?;
            let report = run_pass(&config, timeout)?;
            if report.succeeded() == 0 {
                anyhow::bail!("all {} system(s) failed to back up", report.failed());
            }
            Ok(())
        }
        Commands::Watch { interval_minutes } => {
            let mut passes = 0u64;
            loop {
                match config::load_config(&cli.config) {
                    Ok(config) => {
                        if let Err(err) = run_pass(&config, timeout) {
                            log::error!("backup pass failed: {err}");
                        }
                    }
                    Err(err) => log::error!("skipping pass, config unusable: {err}"),
                }
                passes += 1;
                info!("completed {passes} pass(es), sleeping {interval_minutes} minute(s)");
                std::thread::sleep(Duration::from_secs(interval_minutes * 60));
            }
        }
        Commands::Check => {
            let config = config::load_config(&cli.config)?;
            print_inventory(&config);
            Ok(())
        }
    }
}

fn run_pass(config: &Config, timeout: Duration) -> Result<RunReport> {
    let fetcher = HttpFetcher::new(timeout)?;
    let engine = Engine::new(Downloader::new(&fetcher));
    let report = engine.run(&config.systems);
    print_report(&report);
    Ok(report)
}

fn print_report(report: &RunReport) {
    for outcome in &report.outcomes {
        println!("--------------------------------------------------------------------");
        match (&outcome.artifact, &outcome.failure) {
            (Some(path), _) => {
                println!("{}: SUCCESS -> {}", outcome.database, path.display());
            }
            (None, Some(failure)) => {
                println!("{}: FAILED ({failure})", outcome.database);
                for source_failure in &failure.failures {
                    println!("  {source_failure}");
                }
            }
            (None, None) => {
                println!("{}: FAILED (no sources attempted)", outcome.database);
            }
        }
        if outcome.sweep.deleted > 0 || outcome.sweep.kept > 0 {
            println!(
                "  retention: {} deleted, {} kept",
                outcome.sweep.deleted, outcome.sweep.kept
            );
        }
    }
    println!("--------------------------------------------------------------------");
    println!(
        "{} succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
}

fn print_inventory(config: &Config) {
    println!("{:<20} {:<10} {:<12} STORAGE", "DATABASE", "SOURCES", "RETENTION");
    for system in &config.systems {
        let retention = match &system.retention {
            Some(rule) => format!("{} {:?}(s)", rule.amount, rule.unit),
            None => "never".to_string(),
        };
        println!(
            "{:<20} {:<10} {:<12} {}",
            system.database,
            system.sources.len(),
            retention,
            system.storage_dir.display()
        );
    }
}
