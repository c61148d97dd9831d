//! Barone-Adesi-Whaley American option pricer.
//!
//! The American price is the European price plus an early-exercise premium
//! `A * (S / S*)^q`, where `q` is the root of the BAW characteristic
//! quadratic and `S*` the critical price beyond which immediate exercise is
//! optimal. `S*` is seeded from the perpetual boundary and refined by
//! bracketed Newton iteration on the boundary equation.
//!
//! Calls and puts share one code path through the sign `phi` (+1 for calls,
//! -1 for puts).

use crate::black_scholes::{d1, european_price, norm_cdf, norm_pdf};
use optval_core::{config::PricingConfig, Error, OptionType, PricingInputs, Result};
use tracing::{debug, warn};

/// Breakdown of an American valuation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BawValuation {
    /// American price, floored at intrinsic value.
    pub price: f64,
    /// European price of the same contract.
    pub european: f64,
    /// Critical price S*, when an early-exercise boundary exists.
    pub critical_price: Option<f64>,
    /// Whether the spot lies in the immediate-exercise region.
    pub early_exercise: bool,
    /// `price - european`.
    pub premium: f64,
}

/// American option pricer using the quadratic approximation.
#[derive(Debug, Clone, Default)]
pub struct AmericanOptionPricer {
    config: PricingConfig,
}

impl AmericanOptionPricer {
    /// Create a pricer.
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    /// Pricing configuration.
    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// American price.
    pub fn price(&self, inputs: &PricingInputs) -> Result<f64> {
        Ok(self.valuation(inputs)?.price)
    }

    /// American price together with its European part and exercise boundary.
    pub fn valuation(&self, inputs: &PricingInputs) -> Result<BawValuation> {
        inputs.validate()?;
        let intrinsic = inputs.intrinsic();

        if inputs.is_degenerate() {
            return Ok(BawValuation {
                price: intrinsic,
                european: intrinsic,
                critical_price: None,
                early_exercise: false,
                premium: 0.0,
            });
        }

        let PricingInputs {
            spot: s,
            strike: k,
            time_to_expiry: t,
            rate: r,
            volatility: sigma,
            dividend_yield: q,
            option_type,
        } = *inputs;
        let b = r - q;

        let european = european_price(option_type, s, k, t, r, b, sigma);
        ensure_finite(european, "european price", inputs)?;

        let never_early = match option_type {
            OptionType::Call => q <= 0.0,
            OptionType::Put => r <= 0.0,
        };
        if never_early {
            return Ok(european_only(european, intrinsic));
        }

        let phi = match option_type {
            OptionType::Call => 1.0,
            OptionType::Put => -1.0,
        };

        let sigma2 = sigma * sigma;
        let n = 2.0 * b / sigma2;
        let m = 2.0 * r / sigma2;
        // M / h, with h = 1 - exp(-rT); the r -> 0 limit is 2 / (sigma^2 T).
        let m_over_h = if r.abs() < 1e-12 {
            2.0 / (sigma2 * t)
        } else {
            m / -(-r * t).exp_m1()
        };

        let root = self.guard(characteristic_root(n, m_over_h, phi));
        let root_inf = self.guard(characteristic_root(n, m, phi));
        ensure_finite(root, "characteristic root", inputs)?;
        ensure_finite(root_inf, "perpetual characteristic root", inputs)?;

        let denom = self.guard(1.0 - 1.0 / root_inf);
        let seed = k / denom;
        if !(seed > 0.0) || !seed.is_finite() {
            debug!(%inputs, seed, "perpetual boundary unreachable, using european price");
            return Ok(european_only(european, intrinsic));
        }

        let critical = self.critical_price(inputs, b, root, seed, phi)?;

        if phi * (s - critical) >= 0.0 {
            return Ok(BawValuation {
                price: intrinsic,
                european,
                critical_price: Some(critical),
                early_exercise: true,
                premium: intrinsic - european,
            });
        }

        let carry = ((b - r) * t).exp();
        let d1_star = d1(critical, k, t, b, sigma);
        let a = phi * (critical / root) * (1.0 - carry * norm_cdf(phi * d1_star));
        let american = european + a * (s / critical).powf(root);
        ensure_finite(american, "american price", inputs)?;

        let price = american.max(intrinsic);
        Ok(BawValuation {
            price,
            european,
            critical_price: Some(critical),
            early_exercise: false,
            premium: price - european,
        })
    }

    /// Safeguarded Newton iteration for the critical price S*.
    ///
    /// `phi * g(S)` is negative below the root and positive above it, where
    /// `g` is the boundary equation. The search keeps a bracket around the
    /// root and bisects whenever a Newton step leaves it, so low-volatility
    /// overshoots cannot escape to non-positive or infinite iterates.
    fn critical_price(
        &self,
        inputs: &PricingInputs,
        b: f64,
        root: f64,
        perpetual: f64,
        phi: f64,
    ) -> Result<f64> {
        let boundary = Boundary::new(inputs, b, root, phi);
        let k = inputs.strike;

        let (mut lo, mut hi) = if phi < 0.0 {
            (0.0, k)
        } else {
            boundary.call_bracket(perpetual.max(k))?
        };

        // Interpolate from the perpetual boundary towards the strike.
        let h = -(b * inputs.time_to_expiry + phi * 2.0 * boundary.sigma_sqrt_t) * k
            / (perpetual - k);
        let mut si = k + (perpetual - k) * (1.0 - h.exp());
        if !(si.is_finite() && si > lo && si < hi) {
            si = if perpetual > lo && perpetual < hi {
                perpetual
            } else {
                0.5 * (lo + hi)
            };
        }

        let mut converged = false;
        for _ in 0..self.config.newton_max_iterations {
            let step = boundary.eval(si)?;
            if (step.residual / k).abs() < self.config.newton_tolerance {
                converged = true;
                break;
            }

            if phi * step.residual < 0.0 {
                lo = si;
            } else {
                hi = si;
            }
            if hi - lo <= f64::EPSILON * k {
                converged = true;
                break;
            }

            let newton = (k + phi * (step.rhs - step.slope * si)) / (1.0 - phi * step.slope);
            si = if newton.is_finite() && newton > lo && newton < hi {
                newton
            } else {
                0.5 * (lo + hi)
            };
        }

        if !converged {
            warn!(
                %inputs,
                critical = si,
                iterations = self.config.newton_max_iterations,
                "critical price did not converge, using last iterate"
            );
        }
        Ok(si)
    }

    /// Values within epsilon of zero are clamped to -epsilon.
    #[inline]
    fn guard(&self, x: f64) -> f64 {
        if x.abs() < self.config.root_epsilon {
            -self.config.root_epsilon
        } else {
            x
        }
    }
}

/// Root of `q^2 + (N - 1) q - M / h = 0`; the positive one for calls.
#[inline]
fn characteristic_root(n: f64, m_over_h: f64, phi: f64) -> f64 {
    let nm1 = n - 1.0;
    (-nm1 + phi * (nm1 * nm1 + 4.0 * m_over_h).sqrt()) / 2.0
}

/// Boundary equation `phi (S - K) = c(S) + phi (1 - carry N(phi d1)) S / q`
/// and the derivative of its right-hand side.
struct Boundary<'a> {
    inputs: &'a PricingInputs,
    b: f64,
    root: f64,
    phi: f64,
    carry: f64,
    sigma_sqrt_t: f64,
}

struct BoundaryStep {
    residual: f64,
    rhs: f64,
    slope: f64,
}

impl<'a> Boundary<'a> {
    fn new(inputs: &'a PricingInputs, b: f64, root: f64, phi: f64) -> Self {
        let t = inputs.time_to_expiry;
        Self {
            inputs,
            b,
            root,
            phi,
            carry: ((b - inputs.rate) * t).exp(),
            sigma_sqrt_t: inputs.volatility * t.sqrt(),
        }
    }

    fn eval(&self, si: f64) -> Result<BoundaryStep> {
        let PricingInputs {
            strike: k,
            time_to_expiry: t,
            rate: r,
            volatility: sigma,
            option_type,
            ..
        } = *self.inputs;
        let (phi, carry, root) = (self.phi, self.carry, self.root);

        let d1 = d1(si, k, t, self.b, sigma);
        let exercise_cdf = norm_cdf(phi * d1);
        let rhs = european_price(option_type, si, k, t, r, self.b, sigma)
            + phi * (1.0 - carry * exercise_cdf) * si / root;
        let slope = phi * carry * exercise_cdf * (1.0 - 1.0 / root)
            + phi * (1.0 - phi * carry * norm_pdf(d1) / self.sigma_sqrt_t) / root;
        let residual = phi * (si - k) - rhs;

        if !(residual.is_finite() && slope.is_finite()) {
            return Err(Error::degenerate(format!(
                "boundary equation undefined at {si} for {}",
                self.inputs
            )));
        }
        Ok(BoundaryStep {
            residual,
            rhs,
            slope,
        })
    }

    /// Call boundary lies above the strike; double from `start` until the
    /// equation changes sign.
    fn call_bracket(&self, start: f64) -> Result<(f64, f64)> {
        let (mut lo, mut hi) = (self.inputs.strike, start);
        for _ in 0..64 {
            if self.eval(hi)?.residual > 0.0 {
                return Ok((lo, hi));
            }
            lo = hi;
            hi *= 2.0;
        }
        Err(Error::degenerate(format!(
            "no call exercise boundary below {hi} for {}",
            self.inputs
        )))
    }
}

fn european_only(european: f64, intrinsic: f64) -> BawValuation {
    let price = european.max(intrinsic);
    BawValuation {
        price,
        european,
        critical_price: None,
        early_exercise: false,
        premium: price - european,
    }
}

fn ensure_finite(value: f64, what: &str, inputs: &PricingInputs) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::degenerate(format!("{what} is {value} for {inputs}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn pricer() -> AmericanOptionPricer {
        AmericanOptionPricer::new(PricingConfig::default())
    }

    fn put(s: f64, k: f64, t: f64, r: f64, sigma: f64) -> PricingInputs {
        PricingInputs::new(s, k, t, r, sigma, OptionType::Put)
    }

    fn call(s: f64, k: f64, t: f64, r: f64, sigma: f64) -> PricingInputs {
        PricingInputs::new(s, k, t, r, sigma, OptionType::Call)
    }

    #[test]
    fn test_atm_put_exceeds_european() {
        let v = pricer().valuation(&put(100.0, 100.0, 0.25, 0.03, 0.2)).unwrap();
        assert!(v.price > v.european);
        assert!(v.premium > 0.0);
        assert!(!v.early_exercise);
        let critical = v.critical_price.unwrap();
        assert!(critical > 60.0 && critical < 100.0);
        // Early-exercise premium is small for a short-dated ATM put.
        assert!(v.premium < 0.2);
    }

    #[test]
    fn test_deep_otm_short_call_is_worthless() {
        let price = pricer().price(&call(50.0, 100.0, 0.01, 0.03, 0.2)).unwrap();
        assert_abs_diff_eq!(price, 0.0, epsilon = 1e-8);
    }

    #[test]
    fn test_call_without_dividend_is_european() {
        let v = pricer().valuation(&call(100.0, 100.0, 0.5, 0.05, 0.25)).unwrap();
        assert_eq!(v.price, v.european);
        assert!(v.critical_price.is_none());
    }

    #[test]
    fn test_call_with_dividend_has_boundary() {
        let inputs = call(100.0, 100.0, 0.5, 0.05, 0.25).with_dividend_yield(0.04);
        let v = pricer().valuation(&inputs).unwrap();
        assert!(v.price >= v.european);
        assert!(v.critical_price.unwrap() > 100.0);
    }

    #[test]
    fn test_deep_itm_put_is_exercised() {
        let v = pricer().valuation(&put(50.0, 100.0, 0.5, 0.05, 0.2)).unwrap();
        assert!(v.early_exercise);
        assert_eq!(v.price, 50.0);
        assert!(v.price > v.european);
    }

    #[test]
    fn test_expiry_limit_approaches_intrinsic() {
        let p = pricer();
        let put_price = p.price(&put(90.0, 100.0, 1e-6, 0.03, 0.2)).unwrap();
        assert_abs_diff_eq!(put_price, 10.0, epsilon = 1e-3);
        let call_price = p.price(&call(110.0, 100.0, 1e-6, 0.03, 0.2)).unwrap();
        assert_abs_diff_eq!(call_price, 10.0, epsilon = 1e-3);
        let otm_put = p.price(&put(110.0, 100.0, 1e-6, 0.03, 0.2)).unwrap();
        assert_abs_diff_eq!(otm_put, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_price_at_least_intrinsic() {
        let p = pricer();
        for &s in &[60.0, 80.0, 95.0, 100.0, 105.0, 120.0, 150.0] {
            for &t in &[0.05, 0.25, 1.0] {
                for &q in &[0.0, 0.03] {
                    for option_type in [OptionType::Call, OptionType::Put] {
                        let inputs = PricingInputs::new(s, 100.0, t, 0.04, 0.3, option_type)
                            .with_dividend_yield(q);
                        let price = p.price(&inputs).unwrap();
                        assert!(price >= inputs.intrinsic(), "{inputs}: {price}");
                        assert!(price >= 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_low_volatility_grid_prices() {
        let p = pricer();
        let greeks = crate::GreeksEngine::default();
        for &r in &[0.03, 0.05] {
            for &s in &[90.0, 100.0, 110.0] {
                for days in [1, 5, 16, 30, 91, 182, 365] {
                    let t = days as f64 / 365.0;
                    for &sigma in &[0.001, 0.002, 0.005, 0.01, 0.02, 0.04] {
                        for (option_type, q) in [
                            (OptionType::Put, 0.0),
                            (OptionType::Put, 0.02),
                            (OptionType::Call, 0.06),
                        ] {
                            let inputs = PricingInputs::new(s, 100.0, t, r, sigma, option_type)
                                .with_dividend_yield(q);
                            let price = p.price(&inputs).unwrap();
                            assert!(price >= inputs.intrinsic(), "{inputs}: {price}");
                            let g = greeks.compute(&inputs).unwrap();
                            assert!(g.delta.is_finite() && g.theta.is_finite(), "{inputs}");
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_low_volatility_put_boundary_inside_strike() {
        let inputs = put(90.0, 100.0, 0.0438, 0.03, 0.001);
        let v = pricer().valuation(&inputs).unwrap();
        let critical = v.critical_price.unwrap();
        assert!(critical > 0.0 && critical < 100.0);
        assert!(v.price >= 10.0);
    }

    #[test]
    fn test_put_nonpositive_rate_is_european() {
        let v = pricer().valuation(&put(95.0, 100.0, 0.5, 0.0, 0.2)).unwrap();
        assert!(v.critical_price.is_none());
        assert_eq!(v.price, v.european.max(5.0));
    }

    #[test]
    fn test_degenerate_inputs_give_intrinsic() {
        let p = pricer();
        assert_eq!(p.price(&put(90.0, 100.0, 0.0, 0.03, 0.2)).unwrap(), 10.0);
        assert_eq!(p.price(&call(90.0, 100.0, 0.5, 0.03, 0.0)).unwrap(), 0.0);
        assert_eq!(p.price(&call(120.0, 100.0, 0.0, 0.03, 0.2)).unwrap(), 20.0);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let err = pricer().price(&put(-1.0, 100.0, 0.5, 0.03, 0.2)).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = pricer().price(&put(100.0, 100.0, f64::NAN, 0.03, 0.2)).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_deterministic() {
        let inputs = put(97.0, 100.0, 0.4, 0.05, 0.35);
        let a = pricer().valuation(&inputs).unwrap();
        let b = pricer().valuation(&inputs).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_put_price_decreases_with_spot() {
        let p = pricer();
        let mut last = f64::INFINITY;
        for s in (70..=130).step_by(5) {
            let price = p.price(&put(s as f64, 100.0, 0.5, 0.05, 0.25)).unwrap();
            assert!(price <= last);
            last = price;
        }
    }
}
