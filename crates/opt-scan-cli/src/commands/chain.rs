use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use opt_scan_core::chain::{self, OptionsChain, RawChain};

use crate::input;

#[derive(Deserialize)]
struct ChainGreeksInput {
    chain: RawChain,
    /// Expiration the caller intends to scan; rejected when the chain
    /// covers a different one.
    #[serde(default)]
    expiration: Option<NaiveDate>,
    spot: Decimal,
    time_to_expiry: Decimal,
    risk_free_rate: Decimal,
}

/// Arguments for chain normalization + Greeks annotation
#[derive(Args)]
pub struct ChainGreeksArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_chain_greeks(args: ChainGreeksArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let c: ChainGreeksInput = input::read(&args.input, "chain greeks")?;

    let chain = OptionsChain::normalize(&c.chain)?;
    if let Some(requested) = c.expiration {
        chain.ensure_expiration(requested)?;
    }

    let report = chain::annotate_greeks(&chain, c.spot, c.time_to_expiry, c.risk_free_rate)?;
    Ok(serde_json::to_value(report)?)
}
