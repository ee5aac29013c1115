use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::{
    distance_from_spot, iv_pct, pct, priced, require_positive, run_family, MarketView,
    StrategyFamily,
};
use crate::chain::OptionsChain;
use crate::types::*;
use crate::OptionScanResult;

const RESULT_CAP: usize = 15;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Long call + long put at the same strike, both bought at the ask.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Straddle {
    pub strike: Money,
    pub call_price: Money,
    pub put_price: Money,
    pub total_cost: Money,
    pub lower_breakeven: Money,
    pub upper_breakeven: Money,
    /// Move required to break even, as a percentage of the strike.
    pub breakeven_move_pct: Decimal,
    pub distance_from_spot: Decimal,
    pub call_iv: Decimal,
    pub put_iv: Decimal,
    pub avg_iv: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StraddlesReport {
    pub symbol: String,
    pub expiration: NaiveDate,
    pub current_price: Money,
    pub straddles: Vec<Straddle>,
}

// ---------------------------------------------------------------------------
// Family implementation
// ---------------------------------------------------------------------------

pub(crate) struct Straddles;

impl StrategyFamily for Straddles {
    type Candidate = Straddle;

    fn family_name(&self) -> &'static str {
        "Straddles"
    }

    fn result_cap(&self) -> usize {
        RESULT_CAP
    }

    fn generate(&self, market: &MarketView<'_>) -> OptionScanResult<Vec<Straddle>> {
        let mut ranked: Vec<(Decimal, Straddle)> = Vec::new();

        for call in &market.chain.calls {
            let Some(put) = market.chain.put_at(call.strike) else { continue };
            let Some(call_price) = priced(call.ask) else { continue };
            let Some(put_price) = priced(put.ask) else { continue };

            let total_cost = call_price + put_price;
            let distance = distance_from_spot(call.strike, market.spot);

            let call_iv = iv_pct(call.implied_volatility);
            let put_iv = iv_pct(put.implied_volatility);

            ranked.push((
                distance.abs(),
                Straddle {
                    strike: call.strike,
                    call_price: call_price.round_dp(2),
                    put_price: put_price.round_dp(2),
                    total_cost: total_cost.round_dp(2),
                    lower_breakeven: (call.strike - total_cost).round_dp(2),
                    upper_breakeven: (call.strike + total_cost).round_dp(2),
                    breakeven_move_pct: pct(total_cost, call.strike).round_dp(2),
                    distance_from_spot: distance.round_dp(2),
                    call_iv: call_iv.round_dp(1),
                    put_iv: put_iv.round_dp(1),
                    avg_iv: ((call_iv + put_iv) / dec!(2)).round_dp(1),
                },
            ));
        }

        ranked.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(ranked.into_iter().map(|(_, s)| s).collect())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Scan one expiration for straddles: long call + long put at every strike
/// listed on both sides, ranked closest-to-spot first.
pub fn scan_straddles(
    chain: &OptionsChain,
    spot: Money,
) -> OptionScanResult<ComputationOutput<StraddlesReport>> {
    let start = Instant::now();
    require_positive(spot, "spot")?;

    let market = MarketView::single(chain, spot, Decimal::ZERO, Decimal::ZERO);
    let mut warnings = Vec::new();
    let straddles = run_family(&Straddles, &market, &mut warnings)?;

    let report = StraddlesReport {
        symbol: chain.symbol.clone(),
        expiration: chain.expiration,
        current_price: spot.round_dp(2),
        straddles,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "legs": "call and put bought at the ask, identical strike",
        "ranking": "absolute distance from spot, ascending",
    });

    Ok(with_metadata(
        "Straddle Scan — Same-Strike Combinations",
        &assumptions,
        warnings,
        elapsed,
        report,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
