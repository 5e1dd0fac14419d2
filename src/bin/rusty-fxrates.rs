//! rusty-fxrates CLI - maintain the ECB rate history and domestic cross rates
//!
//! ## Example Usage
//!
//! ```bash
//! # Append today's snapshot (existing dates are never rewritten), render dashboard
//! rusty-fxrates daily
//!
//! # Merge the rolling 90-day window, correcting overlapping dates
//! rusty-fxrates backfill
//!
//! # Work offline from a saved ECB document
//! rusty-fxrates backfill --input eurofxref-hist-90d.xml
//!
//! # Recompute the cross-rate file and dashboard from stored history
//! rusty-fxrates derive --render
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use rusty_fxrates::config::Config;
use rusty_fxrates::currency::{parse_codes, CurrencyCode};
use rusty_fxrates::data::feed::{EcbFeed, RateFeed, StaticFeed};
use rusty_fxrates::engine::{RatePipeline, RunSummary};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

/// rusty-fxrates: ECB reference-rate history with domestic cross rates
#[derive(Parser)]
#[command(name = "rusty-fxrates")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "ECB reference-rate history with domestic cross rates", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override the domestic currency (e.g. PLN)
    #[arg(long, global = true)]
    domestic: Option<String>,

    /// Override the target currencies (comma separated)
    #[arg(long, global = true)]
    targets: Option<String>,

    /// Print the run summary as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the daily snapshot and add it if its date is new
    Daily {
        /// Read an ECB XML document from disk instead of the network
        #[arg(short = 'i', long)]
        input: Option<PathBuf>,
    },

    /// Fetch the rolling window and merge it, updating overlapping dates
    Backfill {
        /// Read an ECB XML document from disk instead of the network
        #[arg(short = 'i', long)]
        input: Option<PathBuf>,

        /// Also render the dashboard
        #[arg(short = 'r', long)]
        render: bool,
    },

    /// Recompute the cross-rate file from stored history
    Derive {
        /// Also render the dashboard
        #[arg(short = 'r', long)]
        render: bool,
    },

    /// Re-render the dashboard from stored history
    Render,

    /// Show configuration and history statistics
    Info,
}

fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".rusty-fxrates").join("config.toml"))
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(path) => match Config::from_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("{} {} ({})", "Warning:".yellow(), e, path.display());
                    Config::default()
                }
            },
            None => Config::default(),
        },
    };

    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(domestic) = &cli.domestic {
        config.domestic_currency = CurrencyCode::from_code(domestic)?;
    }
    if let Some(targets) = &cli.targets {
        config.targets = parse_codes(targets)?;
    }
    config.validate()?;
    Ok(config)
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;

    if cli.verbose {
        println!(
            "{} v{}",
            "rusty-fxrates".cyan().bold(),
            env!("CARGO_PKG_VERSION")
        );
        println!(
            "History: {}",
            config.history_path().display().to_string().dimmed()
        );
    }

    let pipeline = RatePipeline::new(config)?;

    match &cli.command {
        Commands::Daily { input } => {
            let feed = build_feed(pipeline.config(), input.as_deref())?;
            let summary = with_spinner("Fetching daily snapshot...", || {
                pipeline.run_daily(feed.as_ref())
            })?;
            report(&summary, cli.json)
        }

        Commands::Backfill { input, render } => {
            let feed = build_feed(pipeline.config(), input.as_deref())?;
            let summary = with_spinner("Fetching rolling window...", || {
                pipeline.run_backfill(feed.as_ref(), *render)
            })?;
            report(&summary, cli.json)
        }

        Commands::Derive { render } => report(&pipeline.rederive(*render)?, cli.json),

        Commands::Render => report(&pipeline.rederive(true)?, cli.json),

        Commands::Info => show_info(&pipeline),
    }
}

fn build_feed(config: &Config, input: Option<&Path>) -> Result<Box<dyn RateFeed>> {
    match input {
        Some(path) => {
            let xml = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(Box::new(StaticFeed::from_xml(&xml)?))
        }
        None => Ok(Box::new(EcbFeed::new(
            config.daily_url.clone(),
            config.window_url.clone(),
            config.timeout_secs,
        )?)),
    }
}

fn with_spinner<T, F>(message: &str, work: F) -> Result<T>
where
    F: FnOnce() -> rusty_fxrates::error::Result<T>,
{
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")?
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());

    let result = work();
    pb.finish_and_clear();
    Ok(result?)
}

fn report(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!(
        "{}",
        format!("{} run summary", summary.flow).green().bold()
    );
    println!("{}", "==================".green());
    if summary.fetched > 0 {
        println!("  {} {}", "Fetched:".bold(), summary.fetched);
    }
    if summary.dropped > 0 || summary.coerced > 0 {
        println!(
            "  {} {} dropped, {} value(s) recorded as missing",
            "Feed issues:".bold(),
            summary.dropped.to_string().yellow(),
            summary.coerced.to_string().yellow()
        );
    }
    println!(
        "  {} {} -> {} (inserted {}, updated {}, kept {})",
        "History rows:".bold(),
        summary.rows_before,
        summary.rows_after,
        summary.merge.inserted.len().to_string().bright_green(),
        summary.merge.updated.len(),
        summary.merge.skipped.len()
    );
    if !summary.merge.new_columns.is_empty() {
        let names: Vec<String> = summary.merge.new_columns.iter().map(|c| c.to_string()).collect();
        println!("  {} {}", "New currencies:".bold(), names.join(", ").cyan());
    }
    println!("  {} {}", "Derived rows:".bold(), summary.derived_rows);
    match summary.last_date {
        Some(date) => println!("  {} {}", "Last date:".bold(), date),
        None => println!("  {} {}", "Last date:".bold(), "none".dimmed()),
    }
    if let Some(path) = &summary.dashboard {
        println!("  {} {}", "Dashboard:".bold(), path.display());
    }
    println!();
    println!("{} Done", "✓".green().bold());
    Ok(())
}

fn show_info(pipeline: &RatePipeline) -> Result<()> {
    let config = pipeline.config();
    println!(
        "{} {}",
        "rusty-fxrates".cyan().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("{}", env!("CARGO_PKG_DESCRIPTION"));
    println!();

    println!("{}", "Configuration".bold());
    println!("{}", "=============".dimmed());
    println!("  {} {}", "History file:".bold(), config.history_path().display());
    println!("  {} {}", "Cross-rate file:".bold(), config.series_path().display());
    println!("  {} {}", "Dashboard:".bold(), config.dashboard_file.display());
    println!(
        "  {} 1 {} = X units",
        "Feed quoting:".bold(),
        config.reference_currency
    );
    println!("  {} {}", "Domestic:".bold(), config.domestic_currency);
    let targets: Vec<String> = config.targets.iter().map(|c| c.to_string()).collect();
    println!("  {} {}", "Targets:".bold(), targets.join(", "));
    match config.chart_window() {
        Some(days) => println!("  {} last {} days", "Chart window:".bold(), days),
        None => println!("  {} all", "Chart window:".bold()),
    }
    println!();

    println!("{}", "History".bold());
    println!("{}", "=======".dimmed());
    let history = pipeline.store().load()?;
    if history.is_empty() {
        println!(
            "{}",
            "  No history yet. Run 'rusty-fxrates backfill' to seed it.".dimmed()
        );
    } else {
        println!("  {} {}", "Rows:".bold(), history.len());
        if let (Some(first), Some(last)) = (history.first_date(), history.last_date()) {
            println!("  {} {} to {}", "Date range:".bold(), first, last);
        }
        println!("  {} {}", "Currencies:".bold(), history.columns().len());
        for (code, present) in history.coverage() {
            println!("    {} {}", code.to_string().bright_green(), present.to_string().dimmed());
        }
    }
    println!();
    Ok(())
}
