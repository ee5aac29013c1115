mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::chain::ChainGreeksArgs;
use commands::pricing::{GreeksArgs, ProbabilityArgs};
use commands::scan::{
    CalendarSpreadsArgs, CreditSpreadsArgs, IronButterfliesArgs, IronCondorsArgs, StraddlesArgs,
    StranglesArgs,
};
use commands::settle::SettleArgs;

/// Options-chain strategy scanner and paper-trade settlement
#[derive(Parser)]
#[command(
    name = "oscan",
    version,
    about = "Options-chain strategy scanning with decimal precision",
    long_about = "Scans a normalized options chain for credit spreads, iron condors, \
                  iron butterflies, straddles, strangles and calendar spreads, annotates \
                  candidates with Black-Scholes risk/reward metrics, and settles paper \
                  positions deterministically at expiration."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Black-Scholes delta/gamma/theta/vega for one contract
    Greeks(GreeksArgs),
    /// OTM/ITM/interval probabilities for one contract
    Probability(ProbabilityArgs),
    /// Normalize a raw chain and annotate every contract with Greeks
    ChainGreeks(ChainGreeksArgs),
    /// Scan for bull put and bear call credit spreads
    CreditSpreads(CreditSpreadsArgs),
    /// Scan for iron condors
    IronCondors(IronCondorsArgs),
    /// Scan for iron butterflies
    IronButterflies(IronButterfliesArgs),
    /// Scan for straddles
    Straddles(StraddlesArgs),
    /// Scan for strangles
    Strangles(StranglesArgs),
    /// Scan a near/far expiration pair for calendar spreads
    CalendarSpreads(CalendarSpreadsArgs),
    /// Settle supplied positions against supplied closing prices
    Settle(SettleArgs),
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

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Greeks(args) => commands::pricing::run_greeks(args),
        Commands::Probability(args) => commands::pricing::run_probability(args),
        Commands::ChainGreeks(args) => commands::chain::run_chain_greeks(args),
        Commands::CreditSpreads(args) => commands::scan::run_credit_spreads(args),
        Commands::IronCondors(args) => commands::scan::run_iron_condors(args),
        Commands::IronButterflies(args) => commands::scan::run_iron_butterflies(args),
        Commands::Straddles(args) => commands::scan::run_straddles(args),
        Commands::Strangles(args) => commands::scan::run_strangles(args),
        Commands::CalendarSpreads(args) => commands::scan::run_calendar_spreads(args),
        Commands::Settle(args) => commands::settle::run_settle(args),
        Commands::Version => {
            println!("oscan {}", env!("CARGO_PKG_VERSION"));
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
