//! # Snapvault CLI
//!
//! Command-line front end for incremental, deduplicated archive backups.
//!
//! ## Usage
//! ```bash
//! # Back up using ./snapvault.toml
//! snapvault
//!
//! # Incremental run with rotation keeping the 5 newest backups
//! snapvault --incremental --rotate 5
//!
//! # Override the source list from a plain-text file
//! snapvault --list backup_list.txt --name workstation
//! ```

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use snapvault::{
    CsvEventLog, FileConfig, Overrides, RunConfig, Session, SessionReport, SevenZipArchiver,
    StdCopier,
};
use std::path::PathBuf;

/// Incremental, deduplicated, password-protected archive backups
#[derive(Parser)]
#[command(name = "snapvault")]
#[command(version)]
#[command(about = "Back up select files into encrypted archives, incrementally")]
#[command(long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "snapvault.toml")]
    config: PathBuf,

    /// Backup target name (overrides the config file)
    #[arg(short, long)]
    name: Option<String>,

    /// File listing source directories, one per line (overrides the config file)
    #[arg(short, long)]
    list: Option<PathBuf>,

    /// Turn on incremental backups
    #[arg(short, long)]
    incremental: bool,

    /// Enable rotation and retain this many backups
    #[arg(short, long, value_name = "N")]
    rotate: Option<u32>,

    /// Number of worker threads for hashing and copying
    #[arg(short = 't', long, value_name = "N")]
    threads: Option<usize>,

    /// Event log CSV path
    #[arg(long, default_value = "snapvault_log.csv")]
    log_file: PathBuf,

    /// Print the session report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "snapvault=debug".into()),
            )
            .init();
    }

    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let sink = CsvEventLog::new(&cli.log_file).with_echo(!cli.json);

    let file = FileConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;
    let overrides = Overrides {
        target: cli.name,
        list_file: cli.list,
        incremental: cli.incremental,
        rotate_retain: cli.rotate,
        workers: cli.threads,
    };
    let config = RunConfig::resolve(file, overrides).context("invalid configuration")?;

    if !cli.json {
        print_banner(&config);
    }

    let archiver = SevenZipArchiver::new();
    let mut session = Session::new(&config, &StdCopier, &archiver, &sink);
    let report = session.run().context("backup run failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_banner(config: &RunConfig) {
    println!();
    println!("{}", "snapvault".bold());
    println!(
        "  target:      {} ({} source paths)",
        config.target.cyan(),
        config.sources.len()
    );
    println!(
        "  mode:        {}",
        if config.incremental {
            "incremental"
        } else {
            "full"
        }
    );
    if config.rotate {
        println!("  rotation:    keep {} backups", config.retain);
    }
    println!("  workers:     {}", config.workers);
    println!();
}

fn print_summary(report: &SessionReport) {
    println!();
    println!("{}", "Backup complete".green().bold());
    println!("  generation:  {}", report.generation);
    println!(
        "  files:       {} scanned, {} hashed, {} backed up",
        report.files_scanned, report.files_tracked, report.files_copied
    );
    println!("  archive:     {}", report.archive_path.display());
    if report.archives_pruned > 0 {
        println!("  rotated out: {} old archives", report.archives_pruned);
    }
    if let Some(generation) = &report.generation_pruned {
        println!("  rotated out: ledger generation {}", generation);
    }
    if report.warnings > 0 {
        println!(
            "  {}",
            format!("{} warnings (see event log)", report.warnings).yellow()
        );
    }
    println!("  elapsed:     {} ms", report.elapsed_ms);
    println!();
}
