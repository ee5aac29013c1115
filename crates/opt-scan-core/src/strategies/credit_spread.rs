use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::{
    priced, require_positive, risk_reward, run_family, MarketView, StrategyFamily,
    CONTRACT_MULTIPLIER,
};
use crate::chain::OptionsChain;
use crate::pricing;
use crate::types::*;
use crate::OptionScanResult;

const RESULT_CAP_PER_SIDE: usize = 30;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpreadKind {
    #[serde(rename = "Bull Put")]
    BullPut,
    #[serde(rename = "Bear Call")]
    BearCall,
}

/// A two-leg short vertical: short the sell leg, long the protective buy leg.
/// Monetary metrics are per 100-multiplier contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditSpread {
    pub spread_type: SpreadKind,
    pub sell_strike: Money,
    pub buy_strike: Money,
    pub sell_premium: Money,
    pub buy_premium: Money,
    pub net_credit: Money,
    pub max_profit: Money,
    pub max_loss: Money,
    pub breakeven: Money,
    pub risk_reward_ratio: Decimal,
    /// (1 - |short delta|) * 100; absent when the model cannot price the leg.
    pub probability_otm: Option<Decimal>,
    pub sell_delta: Option<Decimal>,
    pub buy_delta: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditSpreadsReport {
    pub symbol: String,
    pub expiration: NaiveDate,
    pub current_price: Money,
    pub spread_width: Money,
    pub bull_put_spreads: Vec<CreditSpread>,
    pub bear_call_spreads: Vec<CreditSpread>,
}

// ---------------------------------------------------------------------------
// Shared short-vertical primitive (also feeds the iron-condor generator)
// ---------------------------------------------------------------------------

/// Unrounded short-vertical pairing. Kept separate from the presentation
/// record so composite strategies can reuse the raw credit and delta.
#[derive(Debug, Clone)]
pub(crate) struct ShortVertical {
    pub sell_strike: Money,
    pub buy_strike: Money,
    pub sell_premium: Money,
    pub buy_premium: Money,
    pub credit: Money,
    pub sell_delta: Option<Decimal>,
    pub buy_delta: Option<Decimal>,
}

/// Pair every contract on one side with the protective leg `width` away by
/// exact strike match. Unmatched strikes, untradeable quotes and non-positive
/// credits are all filtered silently.
pub(crate) fn short_verticals(
    market: &MarketView<'_>,
    class: OptionClass,
    width: Money,
) -> Vec<ShortVertical> {
    let side = match class {
        OptionClass::Call => &market.chain.calls,
        OptionClass::Put => &market.chain.puts,
    };

    let mut spreads = Vec::new();
    for sell in side {
        let buy_strike = match class {
            // Bull put: protection below the short strike
            OptionClass::Put => sell.strike - width,
            // Bear call: protection above the short strike
            OptionClass::Call => sell.strike + width,
        };
        let buy = match class {
            OptionClass::Put => market.chain.put_at(buy_strike),
            OptionClass::Call => market.chain.call_at(buy_strike),
        };
        let Some(buy) = buy else { continue };

        let Some(sell_premium) = priced(sell.bid) else { continue };
        let Some(buy_premium) = priced(buy.ask) else { continue };

        let credit = sell_premium - buy_premium;
        if credit <= Decimal::ZERO {
            continue;
        }

        let delta_of = |strike: Money, iv: Rate| {
            pricing::greeks(market.spot, strike, market.time_to_expiry, market.rate, iv, class)
                .map(|g| g.delta)
        };

        spreads.push(ShortVertical {
            sell_strike: sell.strike,
            buy_strike,
            sell_premium,
            buy_premium,
            credit,
            sell_delta: delta_of(sell.strike, sell.implied_volatility),
            buy_delta: delta_of(buy_strike, buy.implied_volatility),
        });
    }
    spreads
}

fn to_record(vertical: &ShortVertical, kind: SpreadKind, width: Money) -> CreditSpread {
    let max_profit = vertical.credit * CONTRACT_MULTIPLIER;
    let max_loss = (width - vertical.credit) * CONTRACT_MULTIPLIER;
    let breakeven = match kind {
        SpreadKind::BullPut => vertical.sell_strike - vertical.credit,
        SpreadKind::BearCall => vertical.sell_strike + vertical.credit,
    };
    let probability_otm = vertical
        .sell_delta
        .map(|d| ((Decimal::ONE - d.abs()) * dec!(100)).round_dp(1));

    CreditSpread {
        spread_type: kind,
        sell_strike: vertical.sell_strike,
        buy_strike: vertical.buy_strike,
        sell_premium: vertical.sell_premium.round_dp(2),
        buy_premium: vertical.buy_premium.round_dp(2),
        net_credit: vertical.credit.round_dp(2),
        max_profit: max_profit.round_dp(2),
        max_loss: max_loss.round_dp(2),
        breakeven: breakeven.round_dp(2),
        risk_reward_ratio: risk_reward(max_loss, max_profit).round_dp(2),
        probability_otm,
        sell_delta: vertical.sell_delta.map(|d| d.round_dp(4)),
        buy_delta: vertical.buy_delta.map(|d| d.round_dp(4)),
    }
}

// ---------------------------------------------------------------------------
// Family implementations
// ---------------------------------------------------------------------------

pub(crate) struct BullPutSpreads {
    pub width: Money,
}

impl StrategyFamily for BullPutSpreads {
    type Candidate = CreditSpread;

    fn family_name(&self) -> &'static str {
        "Bull Put Spreads"
    }

    fn result_cap(&self) -> usize {
        RESULT_CAP_PER_SIDE
    }

    fn generate(&self, market: &MarketView<'_>) -> OptionScanResult<Vec<CreditSpread>> {
        let mut verticals = short_verticals(market, OptionClass::Put, self.width);
        // Closest-to-the-money short puts first
        verticals.sort_by(|a, b| b.sell_strike.cmp(&a.sell_strike));
        Ok(verticals
            .iter()
            .map(|v| to_record(v, SpreadKind::BullPut, self.width))
            .collect())
    }
}

pub(crate) struct BearCallSpreads {
    pub width: Money,
}

impl StrategyFamily for BearCallSpreads {
    type Candidate = CreditSpread;

    fn family_name(&self) -> &'static str {
        "Bear Call Spreads"
    }

    fn result_cap(&self) -> usize {
        RESULT_CAP_PER_SIDE
    }

    fn generate(&self, market: &MarketView<'_>) -> OptionScanResult<Vec<CreditSpread>> {
        let mut verticals = short_verticals(market, OptionClass::Call, self.width);
        verticals.sort_by(|a, b| a.sell_strike.cmp(&b.sell_strike));
        Ok(verticals
            .iter()
            .map(|v| to_record(v, SpreadKind::BearCall, self.width))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Scan one expiration for bull-put and bear-call credit spreads at the
/// given spread width.
pub fn scan_credit_spreads(
    chain: &OptionsChain,
    spot: Money,
    time_to_expiry: Years,
    rate: Rate,
    width: Money,
) -> OptionScanResult<ComputationOutput<CreditSpreadsReport>> {
    let start = Instant::now();
    require_positive(spot, "spot")?;
    require_positive(width, "width")?;

    let market = MarketView::single(chain, spot, rate, time_to_expiry);
    let mut warnings = Vec::new();

    let bull_put_spreads = run_family(&BullPutSpreads { width }, &market, &mut warnings)?;
    let bear_call_spreads = run_family(&BearCallSpreads { width }, &market, &mut warnings)?;

    let report = CreditSpreadsReport {
        symbol: chain.symbol.clone(),
        expiration: chain.expiration,
        current_price: spot.round_dp(2),
        spread_width: width,
        bull_put_spreads,
        bear_call_spreads,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "spread_width": width.to_string(),
        "risk_free_rate": rate.to_string(),
        "time_to_expiry_years": time_to_expiry.to_string(),
        "probability_otm": "(1 - |short delta|) * 100, Black-Scholes delta",
    });

    Ok(with_metadata(
        "Credit Spread Scan — Short Vertical Combinations",
        &assumptions,
        warnings,
        elapsed,
        report,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
