use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::{
    distance_from_spot, priced, require_positive, risk_reward, run_family, MarketView,
    StrategyFamily, CONTRACT_MULTIPLIER,
};
use crate::chain::OptionsChain;
use crate::types::*;
use crate::OptionScanResult;

const RESULT_CAP: usize = 15;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Four legs sharing a center strike: short straddle at the center, long
/// wings one wing-width out on each side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IronButterfly {
    pub center_strike: Money,
    pub call_premium: Money,
    pub put_premium: Money,
    pub upper_strike: Money,
    pub lower_strike: Money,
    pub upper_cost: Money,
    pub lower_cost: Money,
    pub net_credit: Money,
    pub max_profit: Money,
    pub max_loss: Money,
    pub lower_breakeven: Money,
    pub upper_breakeven: Money,
    pub risk_reward_ratio: Decimal,
    /// Bounded linear heuristic on breakeven range vs spot, clamped to
    /// [20, 90]. Not a calibrated probability.
    pub probability_profit: Decimal,
    pub distance_from_spot: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IronButterfliesReport {
    pub symbol: String,
    pub expiration: NaiveDate,
    pub current_price: Money,
    pub wing_width: Money,
    pub iron_butterflies: Vec<IronButterfly>,
}

// ---------------------------------------------------------------------------
// Family implementation
// ---------------------------------------------------------------------------

pub(crate) struct IronButterflies {
    pub wing: Money,
}

impl StrategyFamily for IronButterflies {
    type Candidate = IronButterfly;

    fn family_name(&self) -> &'static str {
        "Iron Butterflies"
    }

    fn result_cap(&self) -> usize {
        RESULT_CAP
    }

    fn generate(&self, market: &MarketView<'_>) -> OptionScanResult<Vec<IronButterfly>> {
        let mut ranked: Vec<(Decimal, IronButterfly)> = Vec::new();

        for center_call in &market.chain.calls {
            let center = center_call.strike;
            let Some(center_put) = market.chain.put_at(center) else { continue };
            let Some(upper_call) = market.chain.call_at(center + self.wing) else { continue };
            let Some(lower_put) = market.chain.put_at(center - self.wing) else { continue };

            let Some(call_premium) = priced(center_call.bid) else { continue };
            let Some(put_premium) = priced(center_put.bid) else { continue };
            let Some(upper_cost) = priced(upper_call.ask) else { continue };
            let Some(lower_cost) = priced(lower_put.ask) else { continue };

            let net_credit = call_premium + put_premium - upper_cost - lower_cost;
            if net_credit <= Decimal::ZERO {
                continue;
            }

            let max_profit = net_credit * CONTRACT_MULTIPLIER;
            let max_loss = (self.wing - net_credit) * CONTRACT_MULTIPLIER;
            let lower_breakeven = center - net_credit;
            let upper_breakeven = center + net_credit;

            let distance = distance_from_spot(center, market.spot);

            let breakeven_range = upper_breakeven - lower_breakeven;
            let probability_profit = (breakeven_range / market.spot * dec!(1000))
                .clamp(dec!(20), dec!(90));

            ranked.push((
                distance.abs(),
                IronButterfly {
                    center_strike: center,
                    call_premium: call_premium.round_dp(2),
                    put_premium: put_premium.round_dp(2),
                    upper_strike: center + self.wing,
                    lower_strike: center - self.wing,
                    upper_cost: upper_cost.round_dp(2),
                    lower_cost: lower_cost.round_dp(2),
                    net_credit: net_credit.round_dp(2),
                    max_profit: max_profit.round_dp(2),
                    max_loss: max_loss.round_dp(2),
                    lower_breakeven: lower_breakeven.round_dp(2),
                    upper_breakeven: upper_breakeven.round_dp(2),
                    risk_reward_ratio: risk_reward(max_loss, max_profit).round_dp(2),
                    probability_profit: probability_profit.round_dp(1),
                    distance_from_spot: distance.round_dp(2),
                },
            ));
        }

        // Closest-to-ATM centers first
        ranked.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(ranked.into_iter().map(|(_, fly)| fly).collect())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Scan one expiration for iron butterflies at the given wing width. The
/// market context rides along for parity with the other scans; butterfly
/// metrics are quote-driven and need no model values.
pub fn scan_iron_butterflies(
    chain: &OptionsChain,
    spot: Money,
    time_to_expiry: Years,
    rate: Rate,
    wing: Money,
) -> OptionScanResult<ComputationOutput<IronButterfliesReport>> {
    let start = Instant::now();
    require_positive(spot, "spot")?;
    require_positive(wing, "wing")?;

    let market = MarketView::single(chain, spot, rate, time_to_expiry);
    let mut warnings = Vec::new();
    let iron_butterflies = run_family(&IronButterflies { wing }, &market, &mut warnings)?;

    let report = IronButterfliesReport {
        symbol: chain.symbol.clone(),
        expiration: chain.expiration,
        current_price: spot.round_dp(2),
        wing_width: wing,
        iron_butterflies,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "wing_width": wing.to_string(),
        "risk_free_rate": rate.to_string(),
        "time_to_expiry_years": time_to_expiry.to_string(),
        "probability_profit": "linear heuristic on breakeven range, clamped to [20, 90]",
    });

    Ok(with_metadata(
        "Iron Butterfly Scan — Shared-Center Combinations",
        &assumptions,
        warnings,
        elapsed,
        report,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
