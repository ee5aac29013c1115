use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::credit_spread::short_verticals;
use super::{
    pct, require_positive, risk_reward, run_family, MarketView, StrategyFamily,
    CONTRACT_MULTIPLIER,
};
use crate::chain::OptionsChain;
use crate::types::*;
use crate::OptionScanResult;

const RESULT_CAP: usize = 200;

/// OTM probability assumed for a leg the model cannot price.
const FALLBACK_LEG_PROBABILITY: Decimal = dec!(0.5);

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Four-leg neutral structure: bull put spread below spot, bear call spread
/// above. Monetary metrics are per 100-multiplier contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IronCondor {
    pub put_sell_strike: Money,
    pub put_buy_strike: Money,
    pub put_credit: Money,
    pub call_sell_strike: Money,
    pub call_buy_strike: Money,
    pub call_credit: Money,
    pub net_credit: Money,
    pub max_profit: Money,
    pub max_loss: Money,
    pub lower_breakeven: Money,
    pub upper_breakeven: Money,
    pub profit_zone_width: Money,
    pub profit_zone_pct: Decimal,
    pub risk_reward_ratio: Decimal,
    /// P(put OTM) * P(call OTM) * 100. The product assumes the two sides are
    /// independent, which is an approximation, not a joint distribution.
    pub probability_profit: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IronCondorsReport {
    pub symbol: String,
    pub expiration: NaiveDate,
    pub current_price: Money,
    pub spread_width: Money,
    pub iron_condors: Vec<IronCondor>,
}

// ---------------------------------------------------------------------------
// Family implementation
// ---------------------------------------------------------------------------

pub(crate) struct IronCondors {
    pub width: Money,
}

impl StrategyFamily for IronCondors {
    type Candidate = IronCondor;

    fn family_name(&self) -> &'static str {
        "Iron Condors"
    }

    fn result_cap(&self) -> usize {
        RESULT_CAP
    }

    fn generate(&self, market: &MarketView<'_>) -> OptionScanResult<Vec<IronCondor>> {
        let bull_puts = short_verticals(market, OptionClass::Put, self.width);
        let bear_calls = short_verticals(market, OptionClass::Call, self.width);

        let mut ranked: Vec<(Decimal, IronCondor)> = Vec::new();
        for bp in &bull_puts {
            for bc in &bear_calls {
                // The wings must not overlap: the short call has to sit above
                // the short put or the structure is invalid
                if bc.sell_strike <= bp.sell_strike {
                    continue;
                }

                let net_credit = bp.credit + bc.credit;
                let max_profit = net_credit * CONTRACT_MULTIPLIER;
                let max_loss = (self.width - net_credit) * CONTRACT_MULTIPLIER;

                let lower_breakeven = bp.sell_strike - net_credit;
                let upper_breakeven = bc.sell_strike + net_credit;
                let profit_zone_width = upper_breakeven - lower_breakeven;

                let leg_otm = |delta: Option<Decimal>| {
                    delta
                        .map(|d| Decimal::ONE - d.abs())
                        .unwrap_or(FALLBACK_LEG_PROBABILITY)
                };
                let probability_profit =
                    leg_otm(bp.sell_delta) * leg_otm(bc.sell_delta) * dec!(100);

                ranked.push((
                    net_credit,
                    IronCondor {
                        put_sell_strike: bp.sell_strike,
                        put_buy_strike: bp.buy_strike,
                        put_credit: bp.credit.round_dp(2),
                        call_sell_strike: bc.sell_strike,
                        call_buy_strike: bc.buy_strike,
                        call_credit: bc.credit.round_dp(2),
                        net_credit: net_credit.round_dp(2),
                        max_profit: max_profit.round_dp(2),
                        max_loss: max_loss.round_dp(2),
                        lower_breakeven: lower_breakeven.round_dp(2),
                        upper_breakeven: upper_breakeven.round_dp(2),
                        profit_zone_width: profit_zone_width.round_dp(2),
                        profit_zone_pct: pct(profit_zone_width, market.spot).round_dp(2),
                        risk_reward_ratio: risk_reward(max_loss, max_profit).round_dp(2),
                        probability_profit: probability_profit.round_dp(1),
                    },
                ));
            }
        }

        // Richest structures first
        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(ranked.into_iter().map(|(_, condor)| condor).collect())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Scan one expiration for iron condors: every valid bull-put spread crossed
/// with every valid bear-call spread at the same width.
pub fn scan_iron_condors(
    chain: &OptionsChain,
    spot: Money,
    time_to_expiry: Years,
    rate: Rate,
    width: Money,
) -> OptionScanResult<ComputationOutput<IronCondorsReport>> {
    let start = Instant::now();
    require_positive(spot, "spot")?;
    require_positive(width, "width")?;

    let market = MarketView::single(chain, spot, rate, time_to_expiry);
    let mut warnings = Vec::new();
    let iron_condors = run_family(&IronCondors { width }, &market, &mut warnings)?;

    let report = IronCondorsReport {
        symbol: chain.symbol.clone(),
        expiration: chain.expiration,
        current_price: spot.round_dp(2),
        spread_width: width,
        iron_condors,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "spread_width": width.to_string(),
        "risk_free_rate": rate.to_string(),
        "time_to_expiry_years": time_to_expiry.to_string(),
        "probability_profit": "independent product of per-side OTM probabilities",
    });

    Ok(with_metadata(
        "Iron Condor Scan — Bull Put × Bear Call Combinations",
        &assumptions,
        warnings,
        elapsed,
        report,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::OptionContract;
    use pretty_assertions::assert_eq;

    fn contract(strike: Decimal, bid: Decimal, ask: Decimal) -> OptionContract {
        OptionContract {
            strike,
            bid,
            ask,
            last_price: (bid + ask) / dec!(2),
            implied_volatility: dec!(0.20),
            volume: Some(100),
            open_interest: Some(500),
            in_the_money: false,
        }
    }

    fn condor_chain() -> OptionsChain {
        OptionsChain {
            symbol: "^SPX".into(),
            expiration: NaiveDate::from_ymd_opt(2025, 9, 19).unwrap(),
            calls: vec![
                contract(dec!(6450), dec!(2.80), dec!(2.90)),
                contract(dec!(6455), dec!(1.10), dec!(1.20)),
                contract(dec!(6460), dec!(0.80), dec!(0.90)),
                contract(dec!(6465), dec!(0.40), dec!(0.50)),
            ],
            puts: vec![
                contract(dec!(6390), dec!(1.20), dec!(1.30)),
                contract(dec!(6395), dec!(1.40), dec!(1.50)),
                contract(dec!(6400), dec!(3.00), dec!(3.10)),
                contract(dec!(6405), dec!(3.60), dec!(3.70)),
            ],
        }
    }

    #[test]
    fn test_condor_combines_both_sides() {
        let report = scan_iron_condors(
            &condor_chain(),
            dec!(6420),
            dec!(0.05),
            dec!(0.045),
            dec!(5),
        )
        .unwrap()
        .result;

        assert!(!report.iron_condors.is_empty());
        for c in &report.iron_condors {
            assert!(c.call_sell_strike > c.put_sell_strike);
            assert!(c.net_credit > Decimal::ZERO);
            assert_eq!(c.net_credit, (c.put_credit + c.call_credit).round_dp(2));
        }
    }

    #[test]
    fn test_condor_metrics() {
        let report = scan_iron_condors(
            &condor_chain(),
            dec!(6420),
            dec!(0.05),
            dec!(0.045),
            dec!(5),
        )
        .unwrap()
        .result;

        // Top candidate is the richest: put 6400/6395 (credit 1.50) with
        // call 6450/6455 (credit 1.60) => net 3.10
        let top = &report.iron_condors[0];
        assert_eq!(top.put_sell_strike, dec!(6400));
        assert_eq!(top.call_sell_strike, dec!(6450));
        assert_eq!(top.net_credit, dec!(3.10));
        assert_eq!(top.max_profit, dec!(310.00));
        assert_eq!(top.max_loss, dec!(190.00));
        assert_eq!(top.lower_breakeven, dec!(6396.90));
        assert_eq!(top.upper_breakeven, dec!(6453.10));
        assert_eq!(top.profit_zone_width, dec!(56.20));
    }

    #[test]
    fn test_condor_ranked_by_net_credit_descending() {
        let report = scan_iron_condors(
            &condor_chain(),
            dec!(6420),
            dec!(0.05),
            dec!(0.045),
            dec!(5),
        )
        .unwrap()
        .result;

        let credits: Vec<Money> = report.iron_condors.iter().map(|c| c.net_credit).collect();
        let mut sorted = credits.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(credits, sorted);
    }

    #[test]
    fn test_overlapping_wings_rejected() {
        // Calls entirely below the puts: every pairing violates the
        // short-call-above-short-put constraint
        let chain = OptionsChain {
            symbol: "^SPX".into(),
            expiration: NaiveDate::from_ymd_opt(2025, 9, 19).unwrap(),
            calls: vec![
                contract(dec!(6300), dec!(2.80), dec!(2.90)),
                contract(dec!(6305), dec!(1.10), dec!(1.20)),
            ],
            puts: vec![
                contract(dec!(6395), dec!(1.40), dec!(1.50)),
                contract(dec!(6400), dec!(3.00), dec!(3.10)),
            ],
        };
        let report = scan_iron_condors(&chain, dec!(6420), dec!(0.05), dec!(0.045), dec!(5))
            .unwrap()
            .result;
        assert!(report.iron_condors.is_empty());
    }

    #[test]
    fn test_probability_uses_fallback_when_undefined() {
        // T = 0 makes every delta undefined; both legs fall back to 0.5,
        // so the product is 25%
        let report = scan_iron_condors(&condor_chain(), dec!(6420), dec!(0), dec!(0.045), dec!(5))
            .unwrap()
            .result;
        assert!(!report.iron_condors.is_empty());
        for c in &report.iron_condors {
            assert_eq!(c.probability_profit, dec!(25.0));
        }
    }

    #[test]
    fn test_empty_sides_give_empty_result() {
        let chain = OptionsChain {
            symbol: "^SPX".into(),
            expiration: NaiveDate::from_ymd_opt(2025, 9, 19).unwrap(),
            calls: vec![],
            puts: vec![
                contract(dec!(6395), dec!(1.40), dec!(1.50)),
                contract(dec!(6400), dec!(3.00), dec!(3.10)),
            ],
        };
        let report = scan_iron_condors(&chain, dec!(6420), dec!(0.05), dec!(0.045), dec!(5))
            .unwrap()
            .result;
        assert!(report.iron_condors.is_empty());
    }
}
