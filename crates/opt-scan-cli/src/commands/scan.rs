use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use serde_json::Value;

use opt_scan_core::chain::{OptionsChain, RawChain};
use opt_scan_core::strategies;

use crate::input;

fn default_spread_width() -> Decimal {
    dec!(5)
}

fn default_wing_width() -> Decimal {
    dec!(25)
}

fn default_strangle_width() -> Decimal {
    dec!(50)
}

/// Normalize a raw chain and, when the caller named an expiration, verify
/// the chain actually covers it.
fn prepare_chain(
    raw: &RawChain,
    requested: Option<NaiveDate>,
) -> Result<OptionsChain, Box<dyn std::error::Error>> {
    let chain = OptionsChain::normalize(raw)?;
    if let Some(expiration) = requested {
        chain.ensure_expiration(expiration)?;
    }
    Ok(chain)
}

// ---------------------------------------------------------------------------
// Credit spreads
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CreditSpreadScanInput {
    chain: RawChain,
    #[serde(default)]
    expiration: Option<NaiveDate>,
    spot: Decimal,
    time_to_expiry: Decimal,
    risk_free_rate: Decimal,
    #[serde(default = "default_spread_width")]
    spread_width: Decimal,
}

/// Arguments for the credit-spread scan
#[derive(Args)]
pub struct CreditSpreadsArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_credit_spreads(args: CreditSpreadsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let s: CreditSpreadScanInput = input::read(&args.input, "credit spreads")?;
    let chain = prepare_chain(&s.chain, s.expiration)?;
    let report = strategies::scan_credit_spreads(
        &chain,
        s.spot,
        s.time_to_expiry,
        s.risk_free_rate,
        s.spread_width,
    )?;
    Ok(serde_json::to_value(report)?)
}

// ---------------------------------------------------------------------------
// Iron condors
// ---------------------------------------------------------------------------

/// Arguments for the iron-condor scan
#[derive(Args)]
pub struct IronCondorsArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_iron_condors(args: IronCondorsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let s: CreditSpreadScanInput = input::read(&args.input, "iron condors")?;
    let chain = prepare_chain(&s.chain, s.expiration)?;
    let report = strategies::scan_iron_condors(
        &chain,
        s.spot,
        s.time_to_expiry,
        s.risk_free_rate,
        s.spread_width,
    )?;
    Ok(serde_json::to_value(report)?)
}

// ---------------------------------------------------------------------------
// Iron butterflies
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct IronButterflyScanInput {
    chain: RawChain,
    #[serde(default)]
    expiration: Option<NaiveDate>,
    spot: Decimal,
    time_to_expiry: Decimal,
    risk_free_rate: Decimal,
    #[serde(default = "default_wing_width")]
    wing_width: Decimal,
}

/// Arguments for the iron-butterfly scan
#[derive(Args)]
pub struct IronButterfliesArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_iron_butterflies(
    args: IronButterfliesArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let s: IronButterflyScanInput = input::read(&args.input, "iron butterflies")?;
    let chain = prepare_chain(&s.chain, s.expiration)?;
    let report = strategies::scan_iron_butterflies(
        &chain,
        s.spot,
        s.time_to_expiry,
        s.risk_free_rate,
        s.wing_width,
    )?;
    Ok(serde_json::to_value(report)?)
}

// ---------------------------------------------------------------------------
// Straddles
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct StraddleScanInput {
    chain: RawChain,
    #[serde(default)]
    expiration: Option<NaiveDate>,
    spot: Decimal,
}

/// Arguments for the straddle scan
#[derive(Args)]
pub struct StraddlesArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_straddles(args: StraddlesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let s: StraddleScanInput = input::read(&args.input, "straddles")?;
    let chain = prepare_chain(&s.chain, s.expiration)?;
    let report = strategies::scan_straddles(&chain, s.spot)?;
    Ok(serde_json::to_value(report)?)
}

// ---------------------------------------------------------------------------
// Strangles
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct StrangleScanInput {
    chain: RawChain,
    #[serde(default)]
    expiration: Option<NaiveDate>,
    spot: Decimal,
    #[serde(default = "default_strangle_width")]
    width: Decimal,
}

/// Arguments for the strangle scan
#[derive(Args)]
pub struct StranglesArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_strangles(args: StranglesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let s: StrangleScanInput = input::read(&args.input, "strangles")?;
    let chain = prepare_chain(&s.chain, s.expiration)?;
    let report = strategies::scan_strangles(&chain, s.spot, s.width)?;
    Ok(serde_json::to_value(report)?)
}

// ---------------------------------------------------------------------------
// Calendar spreads
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CalendarScanInput {
    near_chain: RawChain,
    far_chain: RawChain,
    spot: Decimal,
    near_time_to_expiry: Decimal,
    far_time_to_expiry: Decimal,
    risk_free_rate: Decimal,
}

/// Arguments for the calendar-spread scan
#[derive(Args)]
pub struct CalendarSpreadsArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_calendar_spreads(
    args: CalendarSpreadsArgs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let s: CalendarScanInput = input::read(&args.input, "calendar spreads")?;
    let near = OptionsChain::normalize(&s.near_chain)?;
    let far = OptionsChain::normalize(&s.far_chain)?;
    let report = strategies::scan_calendar_spreads(
        &near,
        &far,
        s.spot,
        s.near_time_to_expiry,
        s.far_time_to_expiry,
        s.risk_free_rate,
    )?;
    Ok(serde_json::to_value(report)?)
}
