use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

use super::{iv_pct, pct, priced, require_positive, run_family, MarketView, StrategyFamily};
use crate::chain::{OptionContract, OptionsChain};
use crate::types::*;
use crate::OptionScanResult;

const RESULT_CAP: usize = 15;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Long OTM call + long OTM put at different strikes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strangle {
    pub call_strike: Money,
    pub put_strike: Money,
    pub call_price: Money,
    pub put_price: Money,
    pub total_cost: Money,
    pub lower_breakeven: Money,
    pub upper_breakeven: Money,
    /// Smaller of the two moves (up or down) needed to break even, as a
    /// percentage of spot.
    pub breakeven_move_pct: Decimal,
    /// Actual strike distance, which may differ from the requested width
    /// when the put leg came from the nearest-strike fallback.
    pub width: Money,
    pub call_iv: Decimal,
    pub put_iv: Decimal,
    pub avg_iv: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StranglesReport {
    pub symbol: String,
    pub expiration: NaiveDate,
    pub current_price: Money,
    pub strangles: Vec<Strangle>,
}

// ---------------------------------------------------------------------------
// Family implementation
// ---------------------------------------------------------------------------

pub(crate) struct Strangles {
    pub width: Money,
}

impl Strangles {
    /// Preferred put: exact strike `call_strike - width`. Fallback: the OTM
    /// put closest to the strike sitting symmetrically opposite the call.
    fn put_leg<'a>(
        &self,
        market: &MarketView<'a>,
        call_strike: Money,
    ) -> Option<&'a OptionContract> {
        if let Some(put) = market.chain.put_at(call_strike - self.width) {
            return Some(put);
        }

        let target = market.spot - (call_strike - market.spot);
        let mut best: Option<(&OptionContract, Decimal)> = None;
        for put in &market.chain.puts {
            if put.strike >= market.spot {
                break;
            }
            let gap = (put.strike - target).abs();
            if best.map(|(_, b)| gap < b).unwrap_or(true) {
                best = Some((put, gap));
            }
        }
        best.map(|(put, _)| put)
    }
}

impl StrategyFamily for Strangles {
    type Candidate = Strangle;

    fn family_name(&self) -> &'static str {
        "Strangles"
    }

    fn result_cap(&self) -> usize {
        RESULT_CAP
    }

    fn generate(&self, market: &MarketView<'_>) -> OptionScanResult<Vec<Strangle>> {
        let mut ranked: Vec<(Decimal, Strangle)> = Vec::new();

        for call in &market.chain.calls {
            if call.strike <= market.spot {
                continue;
            }
            let Some(put) = self.put_leg(market, call.strike) else { continue };

            // Both legs must be OTM relative to spot
            if put.strike >= market.spot || call.strike <= market.spot {
                continue;
            }

            let Some(call_price) = priced(call.ask) else { continue };
            let Some(put_price) = priced(put.ask) else { continue };

            let total_cost = call_price + put_price;
            let lower_breakeven = put.strike - total_cost;
            let upper_breakeven = call.strike + total_cost;

            let move_to_upper = pct(upper_breakeven - market.spot, market.spot);
            let move_to_lower = pct(market.spot - lower_breakeven, market.spot);

            let call_iv = iv_pct(call.implied_volatility);
            let put_iv = iv_pct(put.implied_volatility);

            ranked.push((
                total_cost,
                Strangle {
                    call_strike: call.strike,
                    put_strike: put.strike,
                    call_price: call_price.round_dp(2),
                    put_price: put_price.round_dp(2),
                    total_cost: total_cost.round_dp(2),
                    lower_breakeven: lower_breakeven.round_dp(2),
                    upper_breakeven: upper_breakeven.round_dp(2),
                    breakeven_move_pct: move_to_upper.min(move_to_lower).round_dp(2),
                    width: call.strike - put.strike,
                    call_iv: call_iv.round_dp(1),
                    put_iv: put_iv.round_dp(1),
                    avg_iv: ((call_iv + put_iv) / dec!(2)).round_dp(1),
                },
            ));
        }

        // Cheapest first, one candidate per strike pair
        ranked.sort_by(|a, b| a.0.cmp(&b.0));
        let mut seen = HashSet::new();
        Ok(ranked
            .into_iter()
            .map(|(_, s)| s)
            .filter(|s| seen.insert((s.call_strike, s.put_strike)))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Scan one expiration for strangles: each OTM call paired with the OTM put
/// `width` below it (nearest symmetric put when that strike is unlisted).
pub fn scan_strangles(
    chain: &OptionsChain,
    spot: Money,
    width: Money,
) -> OptionScanResult<ComputationOutput<StranglesReport>> {
    let start = Instant::now();
    require_positive(spot, "spot")?;
    require_positive(width, "width")?;

    let market = MarketView::single(chain, spot, Decimal::ZERO, Decimal::ZERO);
    let mut warnings = Vec::new();
    let strangles = run_family(&Strangles { width }, &market, &mut warnings)?;

    let report = StranglesReport {
        symbol: chain.symbol.clone(),
        expiration: chain.expiration,
        current_price: spot.round_dp(2),
        strangles,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "width": width.to_string(),
        "put_fallback": "nearest OTM put to the spot-symmetric strike",
        "ranking": "total cost, ascending",
    });

    Ok(with_metadata(
        "Strangle Scan — OTM Call/Put Combinations",
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

    fn strangle_chain() -> OptionsChain {
        OptionsChain {
            symbol: "^SPX".into(),
            expiration: NaiveDate::from_ymd_opt(2025, 9, 19).unwrap(),
            calls: vec![
                contract(dec!(6400), dec!(30), dec!(32)),
                contract(dec!(6450), dec!(10), dec!(12)),
                contract(dec!(6475), dec!(6), dec!(7)),
            ],
            puts: vec![
                contract(dec!(6350), dec!(8), dec!(9)),
                contract(dec!(6375), dec!(12), dec!(13)),
                contract(dec!(6400), dec!(18), dec!(20)),
            ],
        }
    }

    #[test]
    fn test_strangle_exact_width_pairing() {
        // Spot 6420: OTM calls are 6450 and 6475. Call 6450 - width 75 =>
        // put 6375 by exact match
        let report = scan_strangles(&strangle_chain(), dec!(6420), dec!(75))
            .unwrap()
            .result;
        let s = report
            .strangles
            .iter()
            .find(|s| s.call_strike == dec!(6450))
            .unwrap();
        assert_eq!(s.put_strike, dec!(6375));
        assert_eq!(s.total_cost, dec!(25.00));
        assert_eq!(s.lower_breakeven, dec!(6350.00));
        assert_eq!(s.upper_breakeven, dec!(6475.00));
        assert_eq!(s.width, dec!(75));
    }

    #[test]
    fn test_strangle_fallback_nearest_symmetric_put() {
        // Call 6475 - width 75 = 6400, but the 6400 put is not OTM at spot
        // 6420... it is (6400 < 6420). Use width 60: 6475-60 = 6415 unlisted,
        // symmetric target = 6420 - 55 = 6365, nearest OTM put is 6375
        let report = scan_strangles(&strangle_chain(), dec!(6420), dec!(60))
            .unwrap()
            .result;
        let s = report
            .strangles
            .iter()
            .find(|s| s.call_strike == dec!(6475))
            .unwrap();
        assert_eq!(s.put_strike, dec!(6375));
        assert_eq!(s.width, dec!(100));
    }

    #[test]
    fn test_strangle_both_legs_otm() {
        let report = scan_strangles(&strangle_chain(), dec!(6420), dec!(50))
            .unwrap()
            .result;
        for s in &report.strangles {
            assert!(s.call_strike > dec!(6420));
            assert!(s.put_strike < dec!(6420));
        }
    }

    #[test]
    fn test_strangle_no_duplicate_pairs() {
        let report = scan_strangles(&strangle_chain(), dec!(6420), dec!(50))
            .unwrap()
            .result;
        let mut seen = HashSet::new();
        for s in &report.strangles {
            assert!(seen.insert((s.call_strike, s.put_strike)));
        }
    }

    #[test]
    fn test_strangle_ranked_by_cost_ascending() {
        let report = scan_strangles(&strangle_chain(), dec!(6420), dec!(75))
            .unwrap()
            .result;
        let costs: Vec<Money> = report.strangles.iter().map(|s| s.total_cost).collect();
        let mut sorted = costs.clone();
        sorted.sort();
        assert_eq!(costs, sorted);
    }

    #[test]
    fn test_strangle_no_otm_puts_skips() {
        // All puts at or above spot: nothing can pair
        let chain = OptionsChain {
            symbol: "^SPX".into(),
            expiration: NaiveDate::from_ymd_opt(2025, 9, 19).unwrap(),
            calls: vec![contract(dec!(6450), dec!(10), dec!(12))],
            puts: vec![contract(dec!(6440), dec!(18), dec!(20))],
        };
        let report = scan_strangles(&chain, dec!(6420), dec!(50)).unwrap().result;
        assert!(report.strangles.is_empty());
    }

    #[test]
    fn test_strangle_breakeven_move_is_smaller_side() {
        let report = scan_strangles(&strangle_chain(), dec!(6420), dec!(75))
            .unwrap()
            .result;
        let s = report
            .strangles
            .iter()
            .find(|s| s.call_strike == dec!(6450))
            .unwrap();
        // upper move: (6475 - 6420)/6420 = 0.8567%; lower: (6420 - 6350)/6420 = 1.0903%
        assert_eq!(s.breakeven_move_pct, dec!(0.86));
    }
}
