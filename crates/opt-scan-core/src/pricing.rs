use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::math::{exp_decimal, ln_decimal, norm_cdf, norm_pdf, sqrt_decimal};
use crate::types::{Money, OptionClass, Rate, Years};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Black-Scholes sensitivities for a single contract.
///
/// Values are unrounded; [`Greeks::rounded`] produces the presentation form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: Decimal,
    /// Same formula for calls and puts.
    pub gamma: Decimal,
    /// Per calendar day (annual theta / 365).
    pub theta: Decimal,
    /// Per one percentage-point change in implied volatility.
    pub vega: Decimal,
}

impl Greeks {
    /// Presentation rounding: delta/theta/vega to 4 decimals, gamma to 6.
    pub fn rounded(&self) -> Greeks {
        Greeks {
            delta: self.delta.round_dp(4),
            gamma: self.gamma.round_dp(6),
            theta: self.theta.round_dp(4),
            vega: self.vega.round_dp(4),
        }
    }
}

// ---------------------------------------------------------------------------
// Black-Scholes internals
// ---------------------------------------------------------------------------

struct BsTerms {
    d1: Decimal,
    d2: Decimal,
    sqrt_t: Decimal,
    sigma_sqrt_t: Decimal,
}

/// Compute d1/d2. Returns None when the inputs put the model outside its
/// domain: non-positive time, volatility, spot, or strike all mean "not
/// computable", never an error.
fn bs_terms(spot: Money, strike: Money, t: Years, rate: Rate, sigma: Rate) -> Option<BsTerms> {
    if t <= Decimal::ZERO || sigma <= Decimal::ZERO {
        return None;
    }
    if spot <= Decimal::ZERO || strike <= Decimal::ZERO {
        return None;
    }

    let sqrt_t = sqrt_decimal(t);
    let sigma_sqrt_t = sigma * sqrt_t;
    if sigma_sqrt_t == Decimal::ZERO {
        return None;
    }

    let d1 = (ln_decimal(spot / strike) + (rate + sigma * sigma / dec!(2)) * t) / sigma_sqrt_t;
    let d2 = d1 - sigma_sqrt_t;
    Some(BsTerms {
        d1,
        d2,
        sqrt_t,
        sigma_sqrt_t,
    })
}

// ---------------------------------------------------------------------------
// Public API: greeks
// ---------------------------------------------------------------------------

/// Black-Scholes delta, gamma, theta, vega for a European option.
///
/// Returns None whenever the model cannot price the inputs (expired
/// contract, zero volatility, degenerate spot/strike).
pub fn greeks(
    spot: Money,
    strike: Money,
    t: Years,
    rate: Rate,
    sigma: Rate,
    class: OptionClass,
) -> Option<Greeks> {
    let terms = bs_terms(spot, strike, t, rate, sigma)?;
    let nd1 = norm_pdf(terms.d1);

    let delta = match class {
        OptionClass::Call => norm_cdf(terms.d1),
        OptionClass::Put => norm_cdf(terms.d1) - Decimal::ONE,
    };

    let gamma = nd1 / (spot * terms.sigma_sqrt_t);

    let exp_neg_rt = exp_decimal(-rate * t);
    let decay = -(spot * nd1 * sigma) / (dec!(2) * terms.sqrt_t);
    let theta_annual = match class {
        OptionClass::Call => decay - rate * strike * exp_neg_rt * norm_cdf(terms.d2),
        OptionClass::Put => decay + rate * strike * exp_neg_rt * norm_cdf(-terms.d2),
    };
    let theta = theta_annual / dec!(365);

    let vega = spot * nd1 * terms.sqrt_t / dec!(100);

    Some(Greeks {
        delta,
        gamma,
        theta,
        vega,
    })
}

// ---------------------------------------------------------------------------
// Public API: probabilities
// ---------------------------------------------------------------------------

/// Risk-neutral probability the option finishes out of the money.
pub fn probability_otm(
    spot: Money,
    strike: Money,
    t: Years,
    rate: Rate,
    sigma: Rate,
    class: OptionClass,
) -> Option<Decimal> {
    let terms = bs_terms(spot, strike, t, rate, sigma)?;
    Some(match class {
        OptionClass::Call => norm_cdf(-terms.d2),
        OptionClass::Put => norm_cdf(terms.d2),
    })
}

/// Complement of [`probability_otm`] for the same parameters.
pub fn probability_itm(
    spot: Money,
    strike: Money,
    t: Years,
    rate: Rate,
    sigma: Rate,
    class: OptionClass,
) -> Option<Decimal> {
    probability_otm(spot, strike, t, rate, sigma, class).map(|p| Decimal::ONE - p)
}

/// Risk-neutral probability the underlying finishes inside (lower, upper),
/// using the drift (r - sigma^2/2)T. Result clamped to [0, 1].
pub fn probability_between(
    spot: Money,
    lower: Money,
    upper: Money,
    t: Years,
    rate: Rate,
    sigma: Rate,
) -> Option<Decimal> {
    if lower <= Decimal::ZERO || upper <= Decimal::ZERO || lower >= upper {
        return None;
    }
    if t <= Decimal::ZERO || sigma <= Decimal::ZERO || spot <= Decimal::ZERO {
        return None;
    }

    let sigma_sqrt_t = sigma * sqrt_decimal(t);
    if sigma_sqrt_t == Decimal::ZERO {
        return None;
    }
    let drift = (rate - sigma * sigma / dec!(2)) * t;

    // d2 for a price level L: P(S_T < L) = N(-d2(L))
    let d2_at = |level: Money| (ln_decimal(spot / level) + drift) / sigma_sqrt_t;
    let prob = norm_cdf(-d2_at(upper)) - norm_cdf(-d2_at(lower));

    Some(prob.clamp(Decimal::ZERO, Decimal::ONE))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: Decimal, b: Decimal, tol: Decimal) -> bool {
        (a - b).abs() < tol
    }

    fn atm_inputs() -> (Money, Money, Years, Rate, Rate) {
        (dec!(100), dec!(100), dec!(1), dec!(0.05), dec!(0.20))
    }

    // -----------------------------------------------------------------------
    // Undefined guards
    // -----------------------------------------------------------------------

    #[test]
    fn test_zero_time_undefined() {
        assert!(greeks(dec!(100), dec!(100), dec!(0), dec!(0.05), dec!(0.2), OptionClass::Call)
            .is_none());
        assert!(probability_otm(
            dec!(100),
            dec!(100),
            dec!(-0.5),
            dec!(0.05),
            dec!(0.2),
            OptionClass::Put
        )
        .is_none());
    }

    #[test]
    fn test_zero_vol_undefined() {
        assert!(
            greeks(dec!(100), dec!(100), dec!(1), dec!(0.05), dec!(0), OptionClass::Call).is_none()
        );
        assert!(greeks(
            dec!(100),
            dec!(100),
            dec!(1),
            dec!(0.05),
            dec!(-0.1),
            OptionClass::Put
        )
        .is_none());
    }

    #[test]
    fn test_degenerate_spot_strike_undefined() {
        assert!(
            greeks(dec!(0), dec!(100), dec!(1), dec!(0.05), dec!(0.2), OptionClass::Call).is_none()
        );
        assert!(
            greeks(dec!(100), dec!(0), dec!(1), dec!(0.05), dec!(0.2), OptionClass::Put).is_none()
        );
    }

    // -----------------------------------------------------------------------
    // Greeks values and signs
    // -----------------------------------------------------------------------

    #[test]
    fn test_atm_call_delta() {
        // S=K=100, T=1, r=5%, vol=20%: d1 = 0.35, N(0.35) ~ 0.6368
        let (s, k, t, r, sigma) = atm_inputs();
        let g = greeks(s, k, t, r, sigma, OptionClass::Call).unwrap();
        assert!(
            approx_eq(g.delta, dec!(0.6368), dec!(0.002)),
            "ATM call delta {} not near 0.6368",
            g.delta
        );
    }

    #[test]
    fn test_atm_put_delta() {
        // Put delta = call delta - 1
        let (s, k, t, r, sigma) = atm_inputs();
        let call = greeks(s, k, t, r, sigma, OptionClass::Call).unwrap();
        let put = greeks(s, k, t, r, sigma, OptionClass::Put).unwrap();
        assert!(approx_eq(
            put.delta,
            call.delta - Decimal::ONE,
            dec!(0.0001)
        ));
    }

    #[test]
    fn test_delta_ranges() {
        let (s, k, t, r, sigma) = atm_inputs();
        let call = greeks(s, k, t, r, sigma, OptionClass::Call).unwrap();
        let put = greeks(s, k, t, r, sigma, OptionClass::Put).unwrap();
        assert!(call.delta > Decimal::ZERO && call.delta < Decimal::ONE);
        assert!(put.delta < Decimal::ZERO && put.delta > -Decimal::ONE);
    }

    #[test]
    fn test_gamma_matches_both_classes() {
        let (s, k, t, r, sigma) = atm_inputs();
        let call = greeks(s, k, t, r, sigma, OptionClass::Call).unwrap();
        let put = greeks(s, k, t, r, sigma, OptionClass::Put).unwrap();
        assert!(call.gamma > Decimal::ZERO);
        assert_eq!(call.gamma, put.gamma);
    }

    #[test]
    fn test_theta_negative_for_standard_inputs() {
        let (s, k, t, r, sigma) = atm_inputs();
        let call = greeks(s, k, t, r, sigma, OptionClass::Call).unwrap();
        let put = greeks(s, k, t, r, sigma, OptionClass::Put).unwrap();
        assert!(call.theta < Decimal::ZERO, "call theta {}", call.theta);
        assert!(put.theta < Decimal::ZERO, "put theta {}", put.theta);
        // Per-day theta should be a small fraction of spot
        assert!(call.theta.abs() < dec!(1));
    }

    #[test]
    fn test_vega_positive_and_symmetric() {
        let (s, k, t, r, sigma) = atm_inputs();
        let call = greeks(s, k, t, r, sigma, OptionClass::Call).unwrap();
        let put = greeks(s, k, t, r, sigma, OptionClass::Put).unwrap();
        assert!(call.vega > Decimal::ZERO);
        assert_eq!(call.vega, put.vega);
    }

    #[test]
    fn test_deep_itm_call_delta_near_one() {
        let g = greeks(dec!(200), dec!(100), dec!(1), dec!(0.05), dec!(0.20), OptionClass::Call)
            .unwrap();
        assert!(g.delta > dec!(0.99), "deep ITM call delta {}", g.delta);
    }

    #[test]
    fn test_rounded_precision() {
        let (s, k, t, r, sigma) = atm_inputs();
        let g = greeks(s, k, t, r, sigma, OptionClass::Call).unwrap().rounded();
        assert!(g.delta.scale() <= 4);
        assert!(g.gamma.scale() <= 6);
        assert!(g.theta.scale() <= 4);
        assert!(g.vega.scale() <= 4);
    }

    // -----------------------------------------------------------------------
    // Probabilities
    // -----------------------------------------------------------------------

    #[test]
    fn test_otm_plus_itm_sums_to_one() {
        let (s, k, t, r, sigma) = atm_inputs();
        for class in [OptionClass::Call, OptionClass::Put] {
            let otm = probability_otm(s, k, t, r, sigma, class).unwrap();
            let itm = probability_itm(s, k, t, r, sigma, class).unwrap();
            assert!(approx_eq(otm + itm, Decimal::ONE, dec!(0.000001)));
        }
    }

    #[test]
    fn test_atm_call_otm_probability() {
        // d2 = 0.15, P(OTM) = N(-0.15) ~ 0.4404
        let (s, k, t, r, sigma) = atm_inputs();
        let p = probability_otm(s, k, t, r, sigma, OptionClass::Call).unwrap();
        assert!(approx_eq(p, dec!(0.4404), dec!(0.002)), "got {}", p);
    }

    #[test]
    fn test_far_otm_call_probability_near_one() {
        let p = probability_otm(
            dec!(100),
            dec!(200),
            dec!(0.1),
            dec!(0.05),
            dec!(0.20),
            OptionClass::Call,
        )
        .unwrap();
        assert!(p > dec!(0.999));
    }

    #[test]
    fn test_probability_between_guards() {
        let (s, _, t, r, sigma) = atm_inputs();
        assert!(probability_between(s, dec!(0), dec!(110), t, r, sigma).is_none());
        assert!(probability_between(s, dec!(90), dec!(-1), t, r, sigma).is_none());
        assert!(probability_between(s, dec!(110), dec!(90), t, r, sigma).is_none());
        assert!(probability_between(s, dec!(90), dec!(90), t, r, sigma).is_none());
        assert!(probability_between(s, dec!(90), dec!(110), dec!(0), r, sigma).is_none());
    }

    #[test]
    fn test_probability_between_symmetric_band() {
        // A wide band around spot should capture most of the distribution
        let (s, _, t, r, sigma) = atm_inputs();
        let p = probability_between(s, dec!(50), dec!(200), t, r, sigma).unwrap();
        assert!(p > dec!(0.95), "wide band probability {}", p);
        assert!(p <= Decimal::ONE);

        // A narrow band holds less probability than a wider one
        let narrow = probability_between(s, dec!(98), dec!(102), t, r, sigma).unwrap();
        let wide = probability_between(s, dec!(90), dec!(110), t, r, sigma).unwrap();
        assert!(narrow < wide);
    }
}
