use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use opt_scan_core::portfolio::{ClosingPriceSource, PositionLedger, PositionSpec};
use opt_scan_core::{OptionScanError, OptionScanResult};

use crate::input;

#[derive(Deserialize)]
struct SettleInput {
    today: NaiveDate,
    /// Closing price per underlying symbol.
    closing_prices: HashMap<String, Decimal>,
    positions: Vec<PositionSpec>,
}

/// Closing prices supplied inline with the settle request.
struct SuppliedPrices(HashMap<String, Decimal>);

impl ClosingPriceSource for SuppliedPrices {
    fn closing_price(&self, symbol: &str, _on_or_after: NaiveDate) -> OptionScanResult<Decimal> {
        self.0.get(symbol).copied().ok_or_else(|| {
            OptionScanError::UpstreamUnavailable(format!("no closing price supplied for {symbol}"))
        })
    }
}

/// Arguments for deterministic settlement of supplied positions
#[derive(Args)]
pub struct SettleArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_settle(args: SettleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let s: SettleInput = input::read(&args.input, "settle")?;

    let ledger = PositionLedger::new();
    for spec in s.positions {
        ledger.create(spec)?;
    }

    let sweep = ledger.expire_due(s.today, &SuppliedPrices(s.closing_prices));
    let summary = ledger.summary();

    Ok(serde_json::json!({
        "sweep": sweep,
        "portfolio": summary,
    }))
}
