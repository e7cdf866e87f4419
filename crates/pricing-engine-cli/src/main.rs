mod commands;
mod config;
mod input;
mod output;
mod rulebook;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::pricing::{ClassifyArgs, CostArgs, CreditsArgs, PriceArgs, RatesArgs, SolveArgs};
use commands::report::ExportArgs;
use commands::rules::{RegisterClassificationArgs, RulesArgs};
use commands::Context;

/// Reverse-margin sale pricing with automatic tax-rule lookup
#[derive(Parser)]
#[command(
    name = "pricer",
    version,
    about = "Reverse-margin sale pricing with automatic tax-rule lookup",
    long_about = "Computes the gross sale price that leaves a target contribution margin \
                  after sale taxes (PIS, COFINS, ICMS, DIFAL, FCP) and marketplace fees, \
                  using decimal arithmetic throughout. Tax rates are looked up from a \
                  rule book of classification codes, routes and sales channels."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// JSON rule book (defaults to the bundled tables)
    #[arg(long, global = true, env = "PRICER_RULES")]
    rules: Option<PathBuf>,

    /// TOML pricing configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Price a product end to end (cost, rates, channel, margin)
    Price(PriceArgs),
    /// Resolve sale tax rates for a classification code and route
    Rates(RatesArgs),
    /// Solve the gross price for a known cost and deduction stack
    Solve(SolveArgs),
    /// Aggregate the effective unit cost
    Cost(CostArgs),
    /// Suggest recoverable purchase credits for a classification
    Credits(CreditsArgs),
    /// Classify a margin percentage into a band
    Classify(ClassifyArgs),
    /// Price a product and write the text record to a file
    Export(ExportArgs),
    /// List rule book tables
    Rules(RulesArgs),
    /// Register a new classification code in the rule book file
    RegisterClassification(RegisterClassificationArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let rules = cli.rules;
    let config = cli.config;
    let context = || Context::load(rules.clone(), config.clone());

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Price(args) => context().and_then(|ctx| commands::pricing::run_price(&ctx, args)),
        Commands::Rates(args) => context().and_then(|ctx| commands::pricing::run_rates(&ctx, args)),
        Commands::Solve(args) => commands::pricing::run_solve(args),
        Commands::Cost(args) => commands::pricing::run_cost(args),
        Commands::Credits(args) => {
            context().and_then(|ctx| commands::pricing::run_credits(&ctx, args))
        }
        Commands::Classify(args) => {
            context().and_then(|ctx| commands::pricing::run_classify(&ctx, args))
        }
        Commands::Export(args) => context().and_then(|ctx| commands::report::run_export(&ctx, args)),
        Commands::Rules(args) => context().and_then(|ctx| commands::rules::run_rules(&ctx, args)),
        Commands::RegisterClassification(args) => context()
            .and_then(|mut ctx| commands::rules::run_register_classification(&mut ctx, args)),
        Commands::Version => {
            println!("pricer {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
