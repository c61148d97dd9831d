//! Generalized Black-Scholes formulas with cost of carry `b = r - q`.

use optval_core::OptionType;
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

/// Standard normal CDF.
#[inline]
pub fn norm_cdf(x: f64) -> f64 {
    Normal::standard().cdf(x)
}

/// Standard normal PDF.
#[inline]
pub fn norm_pdf(x: f64) -> f64 {
    Normal::standard().pdf(x)
}

/// d1 term.
///
/// # Arguments
/// * `s` - Spot (or candidate critical price)
/// * `k` - Strike
/// * `t` - Time to expiry in years, > 0
/// * `b` - Cost of carry
/// * `sigma` - Volatility, > 0
#[inline]
pub fn d1(s: f64, k: f64, t: f64, b: f64, sigma: f64) -> f64 {
    ((s / k).ln() + (b + 0.5 * sigma * sigma) * t) / (sigma * t.sqrt())
}

/// European price for either exercise right.
///
/// Callers handle `t <= 0` and `sigma <= 0` before reaching this function.
pub fn european_price(
    option_type: OptionType,
    s: f64,
    k: f64,
    t: f64,
    r: f64,
    b: f64,
    sigma: f64,
) -> f64 {
    let d1 = d1(s, k, t, b, sigma);
    let d2 = d1 - sigma * t.sqrt();
    let carry = ((b - r) * t).exp();
    let discount = (-r * t).exp();

    match option_type {
        OptionType::Call => s * carry * norm_cdf(d1) - k * discount * norm_cdf(d2),
        OptionType::Put => k * discount * norm_cdf(-d2) - s * carry * norm_cdf(-d1),
    }
}
