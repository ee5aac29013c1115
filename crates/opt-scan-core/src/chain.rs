use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::OptionScanError;
use crate::pricing::{self, Greeks};
use crate::types::*;
use crate::OptionScanResult;

/// Implied volatility assumed for contracts the provider reports without one.
pub const DEFAULT_IMPLIED_VOL: Decimal = dec!(0.30);

// ---------------------------------------------------------------------------
// Raw provider shape
// ---------------------------------------------------------------------------

/// A single contract row as delivered by the market-data provider: every
/// numeric field may be absent or NaN, prices may be junk. Normalization is
/// the only place these are inspected; downstream code sees
/// [`OptionContract`] with defined-or-absent semantics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContractRow {
    pub strike: Option<f64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last_price: Option<f64>,
    pub implied_volatility: Option<f64>,
    pub volume: Option<f64>,
    pub open_interest: Option<f64>,
    #[serde(default)]
    pub in_the_money: bool,
}

/// An options chain as delivered by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChain {
    pub symbol: String,
    pub expiration_date: String,
    pub calls: Vec<RawContractRow>,
    pub puts: Vec<RawContractRow>,
}

// ---------------------------------------------------------------------------
// Normalized types
// ---------------------------------------------------------------------------

/// Immutable snapshot of one listed contract, created once per chain fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionContract {
    pub strike: Money,
    pub bid: Money,
    pub ask: Money,
    pub last_price: Money,
    /// Decimal form (0.20 = 20%), never a percentage.
    pub implied_volatility: Rate,
    pub volume: Option<u64>,
    pub open_interest: Option<u64>,
    pub in_the_money: bool,
}

/// Normalized chain for one expiration: both sides sorted ascending by
/// strike, strikes unique within each side. Lookups are exact-strike only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsChain {
    pub symbol: String,
    pub expiration: NaiveDate,
    pub calls: Vec<OptionContract>,
    pub puts: Vec<OptionContract>,
}

impl OptionsChain {
    /// Validate and clean a raw provider chain into a typed one.
    pub fn normalize(raw: &RawChain) -> OptionScanResult<OptionsChain> {
        if raw.symbol.trim().is_empty() {
            return Err(OptionScanError::InvalidInput {
                field: "symbol".into(),
                reason: "must not be empty".into(),
            });
        }

        let expiration = NaiveDate::parse_from_str(&raw.expiration_date, "%Y-%m-%d").map_err(
            |_| OptionScanError::InvalidExpiration {
                expiration: raw.expiration_date.clone(),
                reason: "not a valid YYYY-MM-DD date".into(),
            },
        )?;

        let calls = normalize_side(&raw.calls, "calls")?;
        let puts = normalize_side(&raw.puts, "puts")?;

        Ok(OptionsChain {
            symbol: raw.symbol.clone(),
            expiration,
            calls,
            puts,
        })
    }

    /// Guard that this chain covers the expiration the caller asked to
    /// scan. Scans over a mismatched chain are refused, not silently run.
    pub fn ensure_expiration(&self, requested: NaiveDate) -> OptionScanResult<()> {
        if self.expiration != requested {
            return Err(OptionScanError::InvalidExpiration {
                expiration: requested.to_string(),
                reason: format!("chain covers {}", self.expiration),
            });
        }
        Ok(())
    }

    /// Exact-strike lookup on the call side.
    pub fn call_at(&self, strike: Money) -> Option<&OptionContract> {
        contract_at(&self.calls, strike)
    }

    /// Exact-strike lookup on the put side.
    pub fn put_at(&self, strike: Money) -> Option<&OptionContract> {
        contract_at(&self.puts, strike)
    }
}

fn contract_at(side: &[OptionContract], strike: Money) -> Option<&OptionContract> {
    side.binary_search_by(|c| c.strike.cmp(&strike))
        .ok()
        .map(|i| &side[i])
}

fn normalize_side(
    rows: &[RawContractRow],
    field: &str,
) -> OptionScanResult<Vec<OptionContract>> {
    let mut side = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let strike = finite_decimal(row.strike).unwrap_or(Decimal::ZERO);
        if strike <= Decimal::ZERO {
            return Err(OptionScanError::InvalidInput {
                field: format!("{field}[{i}].strike"),
                reason: "must be positive".into(),
            });
        }

        let implied_volatility = match finite_decimal(row.implied_volatility) {
            Some(iv) if iv > Decimal::ZERO => iv,
            _ => DEFAULT_IMPLIED_VOL,
        };

        side.push(OptionContract {
            strike,
            bid: clean_price(row.bid),
            ask: clean_price(row.ask),
            last_price: clean_price(row.last_price),
            implied_volatility,
            volume: clean_count(row.volume),
            open_interest: clean_count(row.open_interest),
            in_the_money: row.in_the_money,
        });
    }

    side.sort_by(|a, b| a.strike.cmp(&b.strike));
    for pair in side.windows(2) {
        if pair[0].strike == pair[1].strike {
            return Err(OptionScanError::InvalidInput {
                field: field.into(),
                reason: format!("duplicate strike {}", pair[0].strike),
            });
        }
    }
    Ok(side)
}

fn finite_decimal(value: Option<f64>) -> Option<Decimal> {
    value.filter(|v| v.is_finite()).and_then(Decimal::from_f64)
}

/// Prices coerced to non-negative Money; absent or NaN means zero.
fn clean_price(value: Option<f64>) -> Money {
    finite_decimal(value)
        .map(|p| p.max(Decimal::ZERO))
        .unwrap_or(Decimal::ZERO)
}

fn clean_count(value: Option<f64>) -> Option<u64> {
    value
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v as u64)
}

// ---------------------------------------------------------------------------
// Greeks-annotated chain report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedContract {
    #[serde(flatten)]
    pub contract: OptionContract,
    /// Absent when the model could not price the contract.
    pub greeks: Option<Greeks>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainReport {
    pub symbol: String,
    pub expiration: NaiveDate,
    pub current_price: Money,
    pub calls: Vec<AnnotatedContract>,
    pub puts: Vec<AnnotatedContract>,
}

/// Annotate every contract in a normalized chain with its Black-Scholes
/// Greeks under the supplied market context.
pub fn annotate_greeks(
    chain: &OptionsChain,
    spot: Money,
    time_to_expiry: Years,
    rate: Rate,
) -> OptionScanResult<ComputationOutput<ChainReport>> {
    let start = Instant::now();
    if spot <= Decimal::ZERO {
        return Err(OptionScanError::InvalidInput {
            field: "spot".into(),
            reason: "must be positive".into(),
        });
    }

    let annotate = |side: &[OptionContract], class: OptionClass| -> Vec<AnnotatedContract> {
        side.iter()
            .map(|c| AnnotatedContract {
                contract: c.clone(),
                greeks: pricing::greeks(
                    spot,
                    c.strike,
                    time_to_expiry,
                    rate,
                    c.implied_volatility,
                    class,
                )
                .map(|g| g.rounded()),
            })
            .collect()
    };

    let report = ChainReport {
        symbol: chain.symbol.clone(),
        expiration: chain.expiration,
        current_price: spot.round_dp(2),
        calls: annotate(&chain.calls, OptionClass::Call),
        puts: annotate(&chain.puts, OptionClass::Put),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "model": "Black-Scholes (closed-form)",
        "risk_free_rate": rate.to_string(),
        "time_to_expiry_years": time_to_expiry.to_string(),
        "default_implied_vol": DEFAULT_IMPLIED_VOL.to_string(),
    });

    Ok(with_metadata(
        "Options Chain Greeks Annotation",
        &assumptions,
        vec![],
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

    fn raw_row(strike: f64, bid: f64, ask: f64) -> RawContractRow {
        RawContractRow {
            strike: Some(strike),
            bid: Some(bid),
            ask: Some(ask),
            last_price: Some((bid + ask) / 2.0),
            implied_volatility: Some(0.22),
            volume: Some(150.0),
            open_interest: Some(1200.0),
            in_the_money: false,
        }
    }

    fn raw_chain(calls: Vec<RawContractRow>, puts: Vec<RawContractRow>) -> RawChain {
        RawChain {
            symbol: "^SPX".into(),
            expiration_date: "2025-09-19".into(),
            calls,
            puts,
        }
    }

    // -----------------------------------------------------------------------
    // Normalization
    // -----------------------------------------------------------------------

    #[test]
    fn test_normalize_sorts_by_strike() {
        let raw = raw_chain(
            vec![raw_row(110.0, 1.0, 1.2), raw_row(100.0, 3.0, 3.2), raw_row(105.0, 2.0, 2.2)],
            vec![],
        );
        let chain = OptionsChain::normalize(&raw).unwrap();
        let strikes: Vec<Money> = chain.calls.iter().map(|c| c.strike).collect();
        assert_eq!(strikes, vec![dec!(100), dec!(105), dec!(110)]);
    }

    #[test]
    fn test_normalize_defaults_missing_iv() {
        let mut row = raw_row(100.0, 3.0, 3.2);
        row.implied_volatility = None;
        let mut nan_row = raw_row(105.0, 2.0, 2.2);
        nan_row.implied_volatility = Some(f64::NAN);
        let mut zero_row = raw_row(110.0, 1.0, 1.2);
        zero_row.implied_volatility = Some(0.0);

        let chain = OptionsChain::normalize(&raw_chain(vec![row, nan_row, zero_row], vec![]))
            .unwrap();
        for c in &chain.calls {
            assert_eq!(c.implied_volatility, DEFAULT_IMPLIED_VOL);
        }
    }

    #[test]
    fn test_normalize_coerces_prices_non_negative() {
        let mut row = raw_row(100.0, 3.0, 3.2);
        row.bid = Some(-1.5);
        row.ask = Some(f64::NAN);
        row.last_price = None;
        let chain = OptionsChain::normalize(&raw_chain(vec![row], vec![])).unwrap();
        assert_eq!(chain.calls[0].bid, Decimal::ZERO);
        assert_eq!(chain.calls[0].ask, Decimal::ZERO);
        assert_eq!(chain.calls[0].last_price, Decimal::ZERO);
    }

    #[test]
    fn test_normalize_rejects_duplicate_strikes() {
        let raw = raw_chain(
            vec![],
            vec![raw_row(100.0, 3.0, 3.2), raw_row(100.0, 3.1, 3.3)],
        );
        let err = OptionsChain::normalize(&raw).unwrap_err();
        match err {
            OptionScanError::InvalidInput { field, .. } => assert_eq!(field, "puts"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_rejects_non_positive_strike() {
        let mut row = raw_row(0.0, 3.0, 3.2);
        row.strike = Some(0.0);
        let err = OptionsChain::normalize(&raw_chain(vec![row], vec![])).unwrap_err();
        assert!(matches!(err, OptionScanError::InvalidInput { .. }));
    }

    #[test]
    fn test_normalize_rejects_bad_expiration() {
        let mut raw = raw_chain(vec![], vec![]);
        raw.expiration_date = "19-09-2025".into();
        let err = OptionsChain::normalize(&raw).unwrap_err();
        assert!(matches!(err, OptionScanError::InvalidExpiration { .. }));
    }

    #[test]
    fn test_ensure_expiration() {
        let chain = OptionsChain::normalize(&raw_chain(vec![], vec![])).unwrap();
        assert!(chain
            .ensure_expiration(NaiveDate::from_ymd_opt(2025, 9, 19).unwrap())
            .is_ok());
        let err = chain
            .ensure_expiration(NaiveDate::from_ymd_opt(2025, 10, 17).unwrap())
            .unwrap_err();
        assert!(matches!(err, OptionScanError::InvalidExpiration { .. }));
    }

    #[test]
    fn test_exact_strike_lookup() {
        let raw = raw_chain(
            vec![raw_row(100.0, 3.0, 3.2), raw_row(105.0, 2.0, 2.2)],
            vec![raw_row(95.0, 1.0, 1.2)],
        );
        let chain = OptionsChain::normalize(&raw).unwrap();
        assert!(chain.call_at(dec!(105)).is_some());
        assert!(chain.call_at(dec!(102.5)).is_none());
        assert!(chain.put_at(dec!(95)).is_some());
        assert!(chain.put_at(dec!(100)).is_none());
    }

    #[test]
    fn test_volume_open_interest_absent_semantics() {
        let mut row = raw_row(100.0, 3.0, 3.2);
        row.volume = Some(f64::NAN);
        row.open_interest = None;
        let chain = OptionsChain::normalize(&raw_chain(vec![row], vec![])).unwrap();
        assert_eq!(chain.calls[0].volume, None);
        assert_eq!(chain.calls[0].open_interest, None);
    }

    // -----------------------------------------------------------------------
    // Greeks annotation
    // -----------------------------------------------------------------------

    #[test]
    fn test_annotate_greeks_populates_both_sides() {
        let raw = raw_chain(
            vec![raw_row(100.0, 3.0, 3.2)],
            vec![raw_row(100.0, 2.8, 3.0)],
        );
        let chain = OptionsChain::normalize(&raw).unwrap();
        let report = annotate_greeks(&chain, dec!(100), dec!(0.1), dec!(0.045))
            .unwrap()
            .result;

        let call = report.calls[0].greeks.unwrap();
        let put = report.puts[0].greeks.unwrap();
        assert!(call.delta > Decimal::ZERO);
        assert!(put.delta < Decimal::ZERO);
        assert_eq!(call.gamma, put.gamma);
    }

    #[test]
    fn test_annotate_greeks_expired_chain_undefined() {
        let raw = raw_chain(vec![raw_row(100.0, 3.0, 3.2)], vec![]);
        let chain = OptionsChain::normalize(&raw).unwrap();
        let report = annotate_greeks(&chain, dec!(100), dec!(0), dec!(0.045))
            .unwrap()
            .result;
        assert!(report.calls[0].greeks.is_none());
    }

    #[test]
    fn test_annotate_greeks_invalid_spot() {
        let chain = OptionsChain::normalize(&raw_chain(vec![], vec![])).unwrap();
        let err = annotate_greeks(&chain, dec!(0), dec!(0.1), dec!(0.045)).unwrap_err();
        assert!(matches!(err, OptionScanError::InvalidInput { .. }));
    }
}
