use chrono::NaiveDate;
use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;

use opt_scan_core::chain::{self, OptionsChain, RawChain};
use opt_scan_core::portfolio::{ClosingPriceSource, PositionLedger, PositionSpec};
use opt_scan_core::types::OptionClass;
use opt_scan_core::{pricing, strategies, OptionScanError, OptionScanResult};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Pricing
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ContractPricingInput {
    spot: Decimal,
    strike: Decimal,
    time_to_expiry: Decimal,
    risk_free_rate: Decimal,
    volatility: Decimal,
    option_type: OptionClass,
}

#[napi]
pub fn calculate_greeks(input_json: String) -> NapiResult<String> {
    let input: ContractPricingInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let greeks = pricing::greeks(
        input.spot,
        input.strike,
        input.time_to_expiry,
        input.risk_free_rate,
        input.volatility,
        input.option_type,
    )
    .map(|g| g.rounded());
    serde_json::to_string(&greeks).map_err(to_napi_error)
}

#[napi]
pub fn probability_otm(input_json: String) -> NapiResult<String> {
    let input: ContractPricingInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let p = pricing::probability_otm(
        input.spot,
        input.strike,
        input.time_to_expiry,
        input.risk_free_rate,
        input.volatility,
        input.option_type,
    )
    .map(|v| v.round_dp(4));
    serde_json::to_string(&p).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct IntervalProbabilityInput {
    spot: Decimal,
    lower: Decimal,
    upper: Decimal,
    time_to_expiry: Decimal,
    risk_free_rate: Decimal,
    volatility: Decimal,
}

#[napi]
pub fn probability_between(input_json: String) -> NapiResult<String> {
    let input: IntervalProbabilityInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let p = pricing::probability_between(
        input.spot,
        input.lower,
        input.upper,
        input.time_to_expiry,
        input.risk_free_rate,
        input.volatility,
    )
    .map(|v| v.round_dp(4));
    serde_json::to_string(&p).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ChainGreeksInput {
    chain: RawChain,
    spot: Decimal,
    time_to_expiry: Decimal,
    risk_free_rate: Decimal,
}

#[napi]
pub fn annotate_chain_greeks(input_json: String) -> NapiResult<String> {
    let input: ChainGreeksInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let normalized = OptionsChain::normalize(&input.chain).map_err(to_napi_error)?;
    let report = chain::annotate_greeks(
        &normalized,
        input.spot,
        input.time_to_expiry,
        input.risk_free_rate,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&report).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Strategy scans
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct WidthScanInput {
    chain: RawChain,
    spot: Decimal,
    time_to_expiry: Decimal,
    risk_free_rate: Decimal,
    width: Decimal,
}

#[napi]
pub fn scan_credit_spreads(input_json: String) -> NapiResult<String> {
    let input: WidthScanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let normalized = OptionsChain::normalize(&input.chain).map_err(to_napi_error)?;
    let report = strategies::scan_credit_spreads(
        &normalized,
        input.spot,
        input.time_to_expiry,
        input.risk_free_rate,
        input.width,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&report).map_err(to_napi_error)
}

#[napi]
pub fn scan_iron_condors(input_json: String) -> NapiResult<String> {
    let input: WidthScanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let normalized = OptionsChain::normalize(&input.chain).map_err(to_napi_error)?;
    let report = strategies::scan_iron_condors(
        &normalized,
        input.spot,
        input.time_to_expiry,
        input.risk_free_rate,
        input.width,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&report).map_err(to_napi_error)
}

#[napi]
pub fn scan_iron_butterflies(input_json: String) -> NapiResult<String> {
    let input: WidthScanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let normalized = OptionsChain::normalize(&input.chain).map_err(to_napi_error)?;
    let report = strategies::scan_iron_butterflies(
        &normalized,
        input.spot,
        input.time_to_expiry,
        input.risk_free_rate,
        input.width,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&report).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct StraddleScanInput {
    chain: RawChain,
    spot: Decimal,
}

#[napi]
pub fn scan_straddles(input_json: String) -> NapiResult<String> {
    let input: StraddleScanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let normalized = OptionsChain::normalize(&input.chain).map_err(to_napi_error)?;
    let report =
        strategies::scan_straddles(&normalized, input.spot).map_err(to_napi_error)?;
    serde_json::to_string(&report).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct StrangleScanInput {
    chain: RawChain,
    spot: Decimal,
    width: Decimal,
}

#[napi]
pub fn scan_strangles(input_json: String) -> NapiResult<String> {
    let input: StrangleScanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let normalized = OptionsChain::normalize(&input.chain).map_err(to_napi_error)?;
    let report = strategies::scan_strangles(&normalized, input.spot, input.width)
        .map_err(to_napi_error)?;
    serde_json::to_string(&report).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct CalendarScanInput {
    near_chain: RawChain,
    far_chain: RawChain,
    spot: Decimal,
    near_time_to_expiry: Decimal,
    far_time_to_expiry: Decimal,
    risk_free_rate: Decimal,
}

#[napi]
pub fn scan_calendar_spreads(input_json: String) -> NapiResult<String> {
    let input: CalendarScanInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let near = OptionsChain::normalize(&input.near_chain).map_err(to_napi_error)?;
    let far = OptionsChain::normalize(&input.far_chain).map_err(to_napi_error)?;
    let report = strategies::scan_calendar_spreads(
        &near,
        &far,
        input.spot,
        input.near_time_to_expiry,
        input.far_time_to_expiry,
        input.risk_free_rate,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&report).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SettleInput {
    today: NaiveDate,
    closing_prices: HashMap<String, Decimal>,
    positions: Vec<PositionSpec>,
}

struct SuppliedPrices(HashMap<String, Decimal>);

impl ClosingPriceSource for SuppliedPrices {
    fn closing_price(&self, symbol: &str, _on_or_after: NaiveDate) -> OptionScanResult<Decimal> {
        self.0.get(symbol).copied().ok_or_else(|| {
            OptionScanError::UpstreamUnavailable(format!("no closing price supplied for {symbol}"))
        })
    }
}

#[napi]
pub fn settle_positions(input_json: String) -> NapiResult<String> {
    let input: SettleInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;

    let ledger = PositionLedger::new();
    for spec in input.positions {
        ledger.create(spec).map_err(to_napi_error)?;
    }

    let sweep = ledger.expire_due(input.today, &SuppliedPrices(input.closing_prices));
    let summary = ledger.summary();

    serde_json::to_string(&serde_json::json!({
        "sweep": sweep,
        "portfolio": summary,
    }))
    .map_err(to_napi_error)
}
