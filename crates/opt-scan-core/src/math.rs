//! Decimal math primitives for the Black-Scholes engine.
//!
//! rust_decimal ships no transcendental functions we trust for pricing, so
//! exp/ln/sqrt are implemented here via series expansion and Newton
//! iteration, and the standard normal CDF via the Abramowitz & Stegun
//! polynomial approximation.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Inputs beyond this magnitude saturate the normal CDF/PDF; clamping keeps
/// Decimal squaring from overflowing on extreme d1/d2 values.
const NORMAL_TAIL_CUTOFF: Decimal = dec!(40);

/// Taylor series exp(x) with range reduction for |x| > 2.
/// exp(x) = exp(x/2)^2 when |x| > 2, then Taylor with 25 terms.
pub fn exp_decimal(x: Decimal) -> Decimal {
    let two = dec!(2);

    // Range reduction: for large |x|, split recursively
    if x > two || x < -two {
        let half = exp_decimal(x / two);
        return half * half;
    }

    // Taylor series: exp(x) = sum_{n=0}^{24} x^n / n!
    let mut sum = Decimal::ONE;
    let mut term = Decimal::ONE;
    for n in 1u32..=25 {
        term = term * x / Decimal::from(n);
        sum += term;
    }
    sum
}

/// Newton's method sqrt: y_{n+1} = (y_n + x/y_n) / 2, 25 iterations.
pub fn sqrt_decimal(x: Decimal) -> Decimal {
    if x <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    if x == Decimal::ONE {
        return Decimal::ONE;
    }
    let two = dec!(2);
    let mut guess = x / two;
    // Better initial guess for very large or very small x
    if x > dec!(100) {
        guess = dec!(10);
    } else if x < dec!(0.01) {
        guess = dec!(0.1);
    }
    for _ in 0..25 {
        guess = (guess + x / guess) / two;
    }
    guess
}

/// Natural log via Newton's method: find y such that exp(y) = x. 30 iterations.
pub fn ln_decimal(x: Decimal) -> Decimal {
    if x <= Decimal::ZERO {
        // ln of non-positive is undefined; return a large negative as sentinel
        return dec!(-999);
    }
    if x == Decimal::ONE {
        return Decimal::ZERO;
    }

    // Initial guess: for x near 1, use (x-1); otherwise count powers of e
    let mut y = if x > dec!(0.5) && x < dec!(2) {
        x - Decimal::ONE
    } else {
        let mut approx = Decimal::ZERO;
        let mut v = x;
        let e_approx = dec!(2.718281828459045);
        if x > Decimal::ONE {
            while v > e_approx {
                v /= e_approx;
                approx += Decimal::ONE;
            }
            approx + (v - Decimal::ONE)
        } else {
            while v < Decimal::ONE / e_approx {
                v *= e_approx;
                approx -= Decimal::ONE;
            }
            approx + (v - Decimal::ONE)
        }
    };

    // Newton's method: y_{n+1} = y_n - 1 + x / exp(y_n)
    for _ in 0..30 {
        let ey = exp_decimal(y);
        if ey == Decimal::ZERO {
            break;
        }
        y = y - Decimal::ONE + x / ey;
    }
    y
}

/// Standard normal PDF: phi(x) = exp(-x^2/2) / sqrt(2*pi)
pub fn norm_pdf(x: Decimal) -> Decimal {
    let x = clamp_tail(x);
    let two_pi = dec!(6.283185307179586);
    let exponent = -(x * x) / dec!(2);
    exp_decimal(exponent) / sqrt_decimal(two_pi)
}

/// Standard normal CDF using Abramowitz & Stegun approximation.
/// Phi(x) = 1 - phi(x) * (b1*t + b2*t^2 + b3*t^3 + b4*t^4 + b5*t^5)
/// where t = 1 / (1 + 0.2316419 * |x|)
/// For x < 0: Phi(x) = 1 - Phi(-x)
pub fn norm_cdf(x: Decimal) -> Decimal {
    let x = clamp_tail(x);
    let b1 = dec!(0.319381530);
    let b2 = dec!(-0.356563782);
    let b3 = dec!(1.781477937);
    let b4 = dec!(-1.821255978);
    let b5 = dec!(1.330274429);
    let p = dec!(0.2316419);

    let abs_x = if x < Decimal::ZERO { -x } else { x };
    let t = Decimal::ONE / (Decimal::ONE + p * abs_x);

    // Horner form: poly = t * (b1 + t * (b2 + t * (b3 + t * (b4 + t * b5))))
    let poly = t * (b1 + t * (b2 + t * (b3 + t * (b4 + t * b5))));

    let cdf_pos = Decimal::ONE - norm_pdf(abs_x) * poly;

    if x < Decimal::ZERO {
        Decimal::ONE - cdf_pos
    } else {
        cdf_pos
    }
}

fn clamp_tail(x: Decimal) -> Decimal {
    if x > NORMAL_TAIL_CUTOFF {
        NORMAL_TAIL_CUTOFF
    } else if x < -NORMAL_TAIL_CUTOFF {
        -NORMAL_TAIL_CUTOFF
    } else {
        x
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
