//! fx-history CLI - fetch, store and summarize NBP reference rates
//!
//! ## Example Usage
//!
//! ```bash
//! # One update cycle
//! fx-history run
//!
//! # Update, write the EUR/USD and CHF/USD selection and print statistics
//! fx-history run --columns EUR/USD,CHF/USD
//!
//! # Update, then ask which pairs to analyze
//! fx-history manual
//!
//! # Update every day at 12:00 local time
//! fx-history auto --at 12:00
//!
//! # Statistics over the stored history, no network access
//! fx-history report --columns EUR/PLN,USD/PLN
//! ```

use anyhow::{bail, Context};
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::Colorize;
use fx_history::pipeline::{parse_column_list, report_history};
use fx_history::prelude::*;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

/// fx-history: incremental NBP exchange rate history
#[derive(Parser)]
#[command(name = "fx-history")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Fetch NBP reference rates, keep their history and summarize currency pairs", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one update cycle
    Run {
        /// Comma separated columns to select and summarize (e.g. EUR/USD,CHF/USD)
        #[arg(long, value_name = "PAIRS")]
        columns: Option<String>,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Ask for currency pairs, run one cycle and summarize them
    Manual,

    /// Run a cycle every day at a fixed local time
    Auto {
        /// Time of day (HH:MM), overrides schedule_at
        #[arg(long, value_name = "HH:MM")]
        at: Option<String>,

        /// Stop after this many cycles
        #[arg(long)]
        max_runs: Option<usize>,
    },

    /// Summarize the stored history without fetching
    Report {
        /// Comma separated columns to summarize
        #[arg(long, value_name = "PAIRS")]
        columns: String,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = FxConfig::load(cli.config.as_deref()).context("loading configuration")?;

    if cli.verbose {
        println!("{} v{}", "fx-history".cyan().bold(), env!("CARGO_PKG_VERSION"));
        println!("History: {}", config.history_path.display().to_string().dimmed());
    }

    match cli.command {
        Commands::Run { columns, json } => {
            let source = NbpRateSource::from_config(&config)?;
            let today = Local::now().date_naive();

            match columns {
                Some(columns) => {
                    let columns = parse_column_list(&columns)?;
                    let (outcome, view) =
                        run_cycle_with_selection(&config, &source, today, &columns).await?;
                    print_outcome(&outcome);
                    print_summaries(&summarize(&view, &columns)?, json)?;
                }
                None => {
                    let outcome = run_cycle(&config, &source, today).await?;
                    print_outcome(&outcome);
                }
            }
        }

        Commands::Manual => {
            let columns = prompt_columns(&config)?;
            let source = NbpRateSource::from_config(&config)?;
            let today = Local::now().date_naive();

            let (outcome, view) = run_cycle_with_selection(&config, &source, today, &columns).await?;
            print_outcome(&outcome);
            println!("Selection saved to {}", config.selection_path.display());
            print_summaries(&summarize(&view, &columns)?, false)?;
        }

        Commands::Auto { at, max_runs } => {
            if let Some(at) = at {
                config.schedule_at = at;
                config.validate()?;
            }
            run_scheduled(&config, max_runs).await?;
        }

        Commands::Report { columns, json } => {
            let columns = parse_column_list(&columns)?;
            print_summaries(&report_history(&config, &columns)?, json)?;
        }
    }

    Ok(())
}

async fn run_scheduled(config: &FxConfig, max_runs: Option<usize>) -> anyhow::Result<()> {
    let rule = DailyAt::from_config(config)?;
    let source = NbpRateSource::from_config(config)?;
    log::info!("Scheduler started, {}", rule);

    let mut runs = 0;
    while max_runs.map_or(true, |max| runs < max) {
        let now = Local::now().naive_local();
        log::info!("Next cycle at {}", rule.next_after(now));

        tokio::select! {
            _ = tokio::time::sleep(rule.wait_from(now)) => {}
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, stopping scheduler");
                break;
            }
        }

        match run_cycle(config, &source, Local::now().date_naive()).await {
            Ok(outcome) => log::info!(
                "Cycle {}..{} done: {} appended",
                outcome.start,
                outcome.end,
                outcome.merge.appended
            ),
            Err(e) => log::error!("Scheduled cycle failed: {}", e),
        }
        runs += 1;
    }

    log::info!("Scheduler completed {} cycles", runs);
    Ok(())
}

fn prompt_columns(config: &FxConfig) -> anyhow::Result<Vec<String>> {
    print!(
        "Enter the currency pairs you want to analyze (comma-separated, available: {}): ",
        config.columns().join(",")
    );
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("no currency pairs provided");
    }
    Ok(parse_column_list(&line)?)
}

fn print_outcome(outcome: &CycleOutcome) {
    let merge = &outcome.merge;
    let action = if merge.created { "Created" } else { "Updated" };
    println!(
        "{} history for {}..{}: {} rows appended, {} already recorded, {} total",
        action.green().bold(),
        outcome.start,
        outcome.end,
        merge.appended,
        merge.dropped,
        merge.history.len()
    );
}

fn print_summaries(summaries: &[ColumnSummary], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summaries)?);
        return Ok(());
    }

    println!(
        "{}",
        format!(
            "{:<14} {:>12} {:>12} {:>12} {:>12}",
            "Currency Pair", "Average", "Median", "Minimum", "Maximum"
        )
        .bold()
    );
    for s in summaries {
        println!(
            "{:<14} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
            s.column, s.mean, s.median, s.min, s.max
        );
    }
    Ok(())
}
