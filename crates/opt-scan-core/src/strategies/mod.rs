//! Strategy-combination generators.
//!
//! Six families share one shape: consume a normalized chain plus market
//! context, pair contracts under strike/price/liquidity constraints, compute
//! per-candidate metrics, rank, and trim. The [`StrategyFamily`] trait keeps
//! the liquidity filter, ranking and truncation logic in one place instead of
//! duplicated per family.

mod calendar;
mod credit_spread;
mod iron_butterfly;
mod iron_condor;
mod straddle;
mod strangle;

pub use calendar::{scan_calendar_spreads, CalendarSpread, CalendarSpreadsReport};
pub use credit_spread::{scan_credit_spreads, CreditSpread, CreditSpreadsReport, SpreadKind};
pub use iron_butterfly::{scan_iron_butterflies, IronButterfliesReport, IronButterfly};
pub use iron_condor::{scan_iron_condors, IronCondor, IronCondorsReport};
pub use straddle::{scan_straddles, Straddle, StraddlesReport};
pub use strangle::{scan_strangles, Strangle, StranglesReport};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::chain::OptionsChain;
use crate::error::OptionScanError;
use crate::types::{Money, Rate, Years};
use crate::OptionScanResult;

/// Sentinel risk/reward when a candidate has no profit potential.
pub const RISK_REWARD_SENTINEL: Decimal = dec!(999);

/// Options contracts settle on a 100-share multiplier.
pub(crate) const CONTRACT_MULTIPLIER: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// Market context
// ---------------------------------------------------------------------------

/// Everything a generator may consume: the chain(s) under scan plus the
/// market context supplied by the caller. Only calendar spreads use the far
/// fields.
pub(crate) struct MarketView<'a> {
    pub chain: &'a OptionsChain,
    pub far_chain: Option<&'a OptionsChain>,
    pub spot: Money,
    pub rate: Rate,
    pub time_to_expiry: Years,
    pub far_time_to_expiry: Option<Years>,
}

impl<'a> MarketView<'a> {
    pub fn single(chain: &'a OptionsChain, spot: Money, rate: Rate, t: Years) -> Self {
        MarketView {
            chain,
            far_chain: None,
            spot,
            rate,
            time_to_expiry: t,
            far_time_to_expiry: None,
        }
    }
}

// ---------------------------------------------------------------------------
// The family interface
// ---------------------------------------------------------------------------

/// One strategy family: knows its name, its result cap, and how to turn a
/// market view into a ranked candidate list. Candidates come back already
/// ranked; truncation is applied centrally by [`run_family`].
pub(crate) trait StrategyFamily {
    type Candidate: Serialize;

    fn family_name(&self) -> &'static str;

    /// Maximum number of candidates surfaced to callers.
    fn result_cap(&self) -> usize;

    /// Produce the full ranked candidate list. "Nothing viable" is an empty
    /// vec, never an error.
    fn generate(&self, market: &MarketView<'_>) -> OptionScanResult<Vec<Self::Candidate>>;
}

/// Drive one family: generate, then trim to the cap, recording a warning
/// when candidates were dropped so callers never mistake a truncated list
/// for the full combination space.
pub(crate) fn run_family<F: StrategyFamily>(
    family: &F,
    market: &MarketView<'_>,
    warnings: &mut Vec<String>,
) -> OptionScanResult<Vec<F::Candidate>> {
    let mut candidates = family.generate(market)?;
    let cap = family.result_cap();
    if candidates.len() > cap {
        warnings.push(format!(
            "{}: {} combinations found, returning top {}",
            family.family_name(),
            candidates.len(),
            cap
        ));
        candidates.truncate(cap);
    }
    Ok(candidates)
}

// ---------------------------------------------------------------------------
// Shared filters and metrics
// ---------------------------------------------------------------------------

/// Liquidity filter: a quote usable for a leg must be strictly positive.
/// Zero bids/asks mean "untradeable", and the candidate is skipped silently.
pub(crate) fn priced(quote: Money) -> Option<Money> {
    (quote > Decimal::ZERO).then_some(quote)
}

/// max_loss / max_profit, with the sentinel for non-positive profit.
pub(crate) fn risk_reward(max_loss: Money, max_profit: Money) -> Decimal {
    if max_profit <= Decimal::ZERO {
        RISK_REWARD_SENTINEL
    } else {
        max_loss / max_profit
    }
}

/// Signed distance of a strike from spot, as a percentage of spot.
pub(crate) fn distance_from_spot(strike: Money, spot: Money) -> Decimal {
    (strike - spot) / spot * dec!(100)
}

/// Percentage form of part/whole.
pub(crate) fn pct(part: Decimal, whole: Decimal) -> Decimal {
    part / whole * dec!(100)
}

/// Implied volatility as a display percentage.
pub(crate) fn iv_pct(iv: Rate) -> Decimal {
    iv * dec!(100)
}

pub(crate) fn require_positive(value: Decimal, field: &str) -> OptionScanResult<()> {
    if value <= Decimal::ZERO {
        return Err(OptionScanError::InvalidInput {
            field: field.into(),
            reason: "must be positive".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_reward_sentinel() {
        assert_eq!(risk_reward(dec!(350), dec!(0)), RISK_REWARD_SENTINEL);
        assert_eq!(risk_reward(dec!(350), dec!(-10)), RISK_REWARD_SENTINEL);
        assert_eq!(risk_reward(dec!(350), dec!(150)), dec!(350) / dec!(150));
    }

    #[test]
    fn test_priced_filter() {
        assert_eq!(priced(dec!(0)), None);
        assert_eq!(priced(dec!(-0.05)), None);
        assert_eq!(priced(dec!(1.25)), Some(dec!(1.25)));
    }

    #[test]
    fn test_distance_from_spot_signed() {
        assert_eq!(distance_from_spot(dec!(105), dec!(100)), dec!(5));
        assert_eq!(distance_from_spot(dec!(95), dec!(100)), dec!(-5));
    }

    #[test]
    fn test_run_family_truncates_and_warns() {
        struct Fixed;
        impl StrategyFamily for Fixed {
            type Candidate = u32;
            fn family_name(&self) -> &'static str {
                "Fixed"
            }
            fn result_cap(&self) -> usize {
                3
            }
            fn generate(&self, _market: &MarketView<'_>) -> OptionScanResult<Vec<u32>> {
                Ok(vec![1, 2, 3, 4, 5])
            }
        }

        let chain = OptionsChain {
            symbol: "^SPX".into(),
            expiration: chrono::NaiveDate::from_ymd_opt(2025, 9, 19).unwrap(),
            calls: vec![],
            puts: vec![],
        };
        let market = MarketView::single(&chain, dec!(100), dec!(0.045), dec!(0.1));
        let mut warnings = Vec::new();
        let out = run_family(&Fixed, &market, &mut warnings).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("top 3"));
    }
}
