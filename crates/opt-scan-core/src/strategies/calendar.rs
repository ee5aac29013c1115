use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::{
    distance_from_spot, iv_pct, priced, require_positive, run_family, MarketView, StrategyFamily,
};
use crate::chain::{OptionContract, OptionsChain};
use crate::error::OptionScanError;
use crate::pricing;
use crate::types::*;
use crate::OptionScanResult;

const RESULT_CAP: usize = 20;

/// Strikes further than this fraction from spot are ignored; calendar edge
/// concentrates near the money.
const SPOT_BAND: Decimal = dec!(0.05);

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Sell the near-dated contract, buy the far-dated one at the same strike.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSpread {
    pub strike: Money,
    pub option_type: OptionClass,
    pub near_expiration: NaiveDate,
    pub far_expiration: NaiveDate,
    pub near_price: Money,
    pub far_price: Money,
    pub net_debit: Money,
    pub near_iv: Decimal,
    pub far_iv: Decimal,
    pub iv_difference: Decimal,
    /// Per-day theta of each leg; absent when the model cannot price it.
    pub near_theta: Option<Decimal>,
    pub far_theta: Option<Decimal>,
    /// |near theta| - |far theta|: the daily decay harvested while the far
    /// leg is held. Absent unless both thetas are defined.
    pub theta_edge: Option<Decimal>,
    pub distance_from_spot: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarSpreadsReport {
    pub symbol: String,
    pub near_expiration: NaiveDate,
    pub far_expiration: NaiveDate,
    pub current_price: Money,
    pub calendar_spreads: Vec<CalendarSpread>,
}

// ---------------------------------------------------------------------------
// Family implementation
// ---------------------------------------------------------------------------

pub(crate) struct CalendarSpreads;

impl CalendarSpreads {
    #[allow(clippy::too_many_arguments)]
    fn pair(
        &self,
        market: &MarketView<'_>,
        far_chain: &OptionsChain,
        far_t: Years,
        near: &OptionContract,
        far: &OptionContract,
        class: OptionClass,
    ) -> Option<(Decimal, CalendarSpread)> {
        let near_price = priced(near.bid)?;
        let far_price = priced(far.ask)?;

        let net_debit = far_price - near_price;
        if net_debit <= Decimal::ZERO {
            return None;
        }

        let theta_of = |t: Years, iv: Rate| {
            pricing::greeks(market.spot, near.strike, t, market.rate, iv, class)
                .map(|g| g.theta.round_dp(4))
        };
        let near_theta = theta_of(market.time_to_expiry, near.implied_volatility);
        let far_theta = theta_of(far_t, far.implied_volatility);
        let theta_edge = match (near_theta, far_theta) {
            (Some(n), Some(f)) => Some((n.abs() - f.abs()).round_dp(4)),
            _ => None,
        };

        let near_iv = iv_pct(near.implied_volatility);
        let far_iv = iv_pct(far.implied_volatility);
        let distance = distance_from_spot(near.strike, market.spot);

        Some((
            distance.abs(),
            CalendarSpread {
                strike: near.strike,
                option_type: class,
                near_expiration: market.chain.expiration,
                far_expiration: far_chain.expiration,
                near_price: near_price.round_dp(2),
                far_price: far_price.round_dp(2),
                net_debit: net_debit.round_dp(2),
                near_iv: near_iv.round_dp(1),
                far_iv: far_iv.round_dp(1),
                iv_difference: (near_iv - far_iv).round_dp(1),
                near_theta,
                far_theta,
                theta_edge,
                distance_from_spot: distance.round_dp(2),
            },
        ))
    }
}

impl StrategyFamily for CalendarSpreads {
    type Candidate = CalendarSpread;

    fn family_name(&self) -> &'static str {
        "Calendar Spreads"
    }

    fn result_cap(&self) -> usize {
        RESULT_CAP
    }

    fn generate(&self, market: &MarketView<'_>) -> OptionScanResult<Vec<CalendarSpread>> {
        let far_chain = market.far_chain.ok_or_else(|| OptionScanError::InvalidInput {
            field: "far_chain".into(),
            reason: "calendar spreads need a far-dated chain".into(),
        })?;
        let far_t = market
            .far_time_to_expiry
            .ok_or_else(|| OptionScanError::InvalidInput {
                field: "far_time_to_expiry".into(),
                reason: "calendar spreads need the far time to expiry".into(),
            })?;

        let lower = market.spot * (Decimal::ONE - SPOT_BAND);
        let upper = market.spot * (Decimal::ONE + SPOT_BAND);

        let mut ranked: Vec<(Decimal, CalendarSpread)> = Vec::new();
        for class in [OptionClass::Call, OptionClass::Put] {
            let near_side = match class {
                OptionClass::Call => &market.chain.calls,
                OptionClass::Put => &market.chain.puts,
            };

            for near in near_side {
                if near.strike < lower || near.strike > upper {
                    continue;
                }
                let far = match class {
                    OptionClass::Call => far_chain.call_at(near.strike),
                    OptionClass::Put => far_chain.put_at(near.strike),
                };
                let Some(far) = far else { continue };
                if let Some(entry) = self.pair(market, far_chain, far_t, near, far, class) {
                    ranked.push(entry);
                }
            }
        }

        ranked.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(ranked.into_iter().map(|(_, c)| c).collect())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Scan a near/far expiration pair for calendar spreads within ±5% of spot.
pub fn scan_calendar_spreads(
    near_chain: &OptionsChain,
    far_chain: &OptionsChain,
    spot: Money,
    near_time_to_expiry: Years,
    far_time_to_expiry: Years,
    rate: Rate,
) -> OptionScanResult<ComputationOutput<CalendarSpreadsReport>> {
    let start = Instant::now();
    require_positive(spot, "spot")?;

    if near_chain.symbol != far_chain.symbol {
        return Err(OptionScanError::InvalidInput {
            field: "far_chain.symbol".into(),
            reason: format!(
                "must match near chain symbol {}, got {}",
                near_chain.symbol, far_chain.symbol
            ),
        });
    }
    if near_chain.expiration == far_chain.expiration {
        return Err(OptionScanError::InvalidExpiration {
            expiration: far_chain.expiration.to_string(),
            reason: "near and far expirations must differ".into(),
        });
    }
    if near_chain.expiration > far_chain.expiration {
        return Err(OptionScanError::InvalidExpiration {
            expiration: near_chain.expiration.to_string(),
            reason: "near expiration must precede the far expiration".into(),
        });
    }

    let market = MarketView {
        chain: near_chain,
        far_chain: Some(far_chain),
        spot,
        rate,
        time_to_expiry: near_time_to_expiry,
        far_time_to_expiry: Some(far_time_to_expiry),
    };

    let mut warnings = Vec::new();
    let calendar_spreads = run_family(&CalendarSpreads, &market, &mut warnings)?;

    let report = CalendarSpreadsReport {
        symbol: near_chain.symbol.clone(),
        near_expiration: near_chain.expiration,
        far_expiration: far_chain.expiration,
        current_price: spot.round_dp(2),
        calendar_spreads,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "strike_band": "within 5% of spot",
        "risk_free_rate": rate.to_string(),
        "near_time_to_expiry_years": near_time_to_expiry.to_string(),
        "far_time_to_expiry_years": far_time_to_expiry.to_string(),
        "theta_edge": "|near theta| - |far theta|, per calendar day",
    });

    Ok(with_metadata(
        "Calendar Spread Scan — Cross-Expiration Combinations",
        &assumptions,
        warnings,
        elapsed,
        report,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
