//! Listing Crawler CLI
//!
//! Local execution entry point.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use listing_crawler::{
    error::{AppError, Result},
    models::{City, Config, TierPages},
    pipeline::{self, RunOutcome, RunSettings},
    services::SerperClient,
    storage::{ListingStore, LocalStore},
    utils::report,
};

/// Exit status after an operator interrupt (128 + SIGINT).
const INTERRUPTED_EXIT: u8 = 130;

/// Listing Crawler - budgeted business listing collection by city
#[derive(Parser, Debug)]
#[command(
    name = "listing-crawler",
    version,
    about = "Collect local business listings city by city under a credit budget"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "crawler.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl listings for a search query
    Run {
        /// Search query, e.g. "Zahnarzt"
        #[arg(short, long)]
        query: String,

        /// API key for the search endpoint
        #[arg(long, env = "SERPER_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Continue from the stored checkpoint
        #[arg(long)]
        resume: bool,

        /// Maximum cumulative credits (prompted for when not set)
        #[arg(long)]
        max_credits: Option<u64>,

        #[command(flatten)]
        pages: PageArgs,

        #[command(flatten)]
        paths: PathArgs,
    },

    /// Print the credits needed to visit every city once
    Estimate {
        #[command(flatten)]
        pages: PageArgs,

        #[command(flatten)]
        paths: PathArgs,
    },

    /// Show the output table and checkpoint for a query
    Info {
        /// Search query the output belongs to
        #[arg(short, long)]
        query: String,

        #[command(flatten)]
        paths: PathArgs,
    },

    /// Validate the configuration and the cities file
    Validate {
        #[command(flatten)]
        paths: PathArgs,
    },
}

/// Per-tier page budget overrides.
#[derive(Args, Debug)]
struct PageArgs {
    /// Pages per city with population >= 100000
    #[arg(long)]
    high_pages: Option<u32>,

    /// Pages per city with population >= 10000
    #[arg(long)]
    mid_pages: Option<u32>,

    /// Pages per smaller city
    #[arg(long)]
    low_pages: Option<u32>,
}

/// Input and output location overrides.
#[derive(Args, Debug)]
struct PathArgs {
    /// Tab-separated gazetteer file
    #[arg(long)]
    cities: Option<PathBuf>,

    /// Country code to filter cities by
    #[arg(long)]
    country: Option<String>,

    /// Output directory
    #[arg(long)]
    output: Option<PathBuf>,
}

impl PageArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(pages) = self.high_pages {
            config.budget.high_pages = pages;
        }
        if let Some(pages) = self.mid_pages {
            config.budget.mid_pages = pages;
        }
        if let Some(pages) = self.low_pages {
            config.budget.low_pages = pages;
        }
    }
}

impl PathArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.cities {
            config.paths.cities_file = path.clone();
        }
        if let Some(country) = &self.country {
            config.paths.country_code = country.clone();
        }
        if let Some(path) = &self.output {
            config.paths.output_dir = path.clone();
        }
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Log the per-tier estimate and return the total.
fn print_estimate(cities: &[City], pages: &TierPages) -> u64 {
    let estimate = pipeline::estimate_total_credits(cities, pages);
    let mut items: Vec<(&str, String)> = estimate
        .by_tier
        .iter()
        .rev()
        .map(|(tier, (count, credits))| {
            (
                tier.label(),
                format!(
                    "{} cities x {} pages = {} credits",
                    count,
                    pages.for_tier(*tier),
                    credits
                ),
            )
        })
        .collect();
    items.push(("total", format!("{} credits", estimate.total)));
    report::summary("Estimated credits for all cities", &items);
    estimate.total
}

/// Ask for the credit ceiling on stdin.
fn prompt_max_credits() -> Result<u64> {
    print!("Enter the maximum number of credits to use: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let answer = line.trim();
    answer
        .parse()
        .map_err(|_| AppError::config(format!("invalid credit limit: {:?}", answer)))
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn execute(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load_or_default(&cli.config);

    match cli.command {
        Command::Run {
            query,
            api_key,
            resume,
            max_credits,
            pages,
            paths,
        } => {
            pages.apply(&mut config);
            paths.apply(&mut config);
            config.validate()?;

            let query = query.trim().to_string();
            if query.is_empty() {
                return Err(AppError::config("search query is empty"));
            }
            let api_key = api_key.ok_or_else(|| {
                AppError::config("missing API key: pass --api-key or set SERPER_API_KEY")
            })?;
            let client = SerperClient::new(&config.search, api_key)?;

            let max_credits = match max_credits.or(config.budget.max_credits) {
                Some(limit) => limit,
                None => {
                    let cities = pipeline::load_cities(&config)?;
                    print_estimate(&cities, &config.budget.pages());
                    prompt_max_credits()?
                }
            };

            let settings = RunSettings {
                query,
                pages: config.budget.pages(),
                max_credits,
                resume,
            };

            match pipeline::run_crawler(&config, &settings, &client, interrupted()).await? {
                RunOutcome::Finished(_) => Ok(ExitCode::SUCCESS),
                RunOutcome::Interrupted => {
                    log::info!("Run again with --resume to continue");
                    Ok(ExitCode::from(INTERRUPTED_EXIT))
                }
            }
        }

        Command::Estimate { pages, paths } => {
            pages.apply(&mut config);
            paths.apply(&mut config);
            config.validate()?;

            let cities = pipeline::load_cities(&config)?;
            print_estimate(&cities, &config.budget.pages());
            Ok(ExitCode::SUCCESS)
        }

        Command::Info { query, paths } => {
            paths.apply(&mut config);
            let store = LocalStore::for_query(&config.paths.output_dir, &query);

            log::info!("Output table: {}", store.table_path().display());
            if store.table_exists() {
                log::info!("Rows: {}", store.row_count()?);
            } else {
                log::info!("No output table yet.");
            }

            match store.read_checkpoint() {
                Ok(Some(checkpoint)) => {
                    log::info!("Last processed city index: {}", checkpoint.last_index);
                    log::info!("Credits used: {}", checkpoint.credits_used);
                    match checkpoint.updated_at {
                        Some(updated) => log::info!("Last updated: {}", updated.to_rfc3339()),
                        None => log::info!("Legacy checkpoint, spend is estimated"),
                    }
                }
                Ok(None) => log::info!("No checkpoint found."),
                Err(e) => log::warn!("Checkpoint unreadable: {}", e),
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Validate { paths } => {
            paths.apply(&mut config);
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            if !config.paths.cities_file.is_file() {
                return Err(AppError::config(format!(
                    "cities file not found: {}",
                    config.paths.cities_file.display()
                )));
            }
            log::info!("✓ Cities file {}", config.paths.cities_file.display());

            log::info!("All validations passed!");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
