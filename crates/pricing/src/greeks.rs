//! Finite-difference Greeks over the American pricer.
//!
//! Every sensitivity is a central difference of
//! [`AmericanOptionPricer::price`] with one shared step. Vega and rho are
//! reported per percentage point, theta per calendar day as `dP/dT / 365`
//! (positive when the option gains value with more time).

use crate::baw::AmericanOptionPricer;
use optval_core::{config::PricingConfig, Greeks, PricingInputs, Result};
use tracing::debug;

/// Computes Greeks by bumping pricing inputs.
#[derive(Debug, Clone, Default)]
pub struct GreeksEngine {
    pricer: AmericanOptionPricer,
}

impl GreeksEngine {
    /// Create an engine with its own pricer.
    pub fn new(config: PricingConfig) -> Self {
        Self {
            pricer: AmericanOptionPricer::new(config),
        }
    }

    /// Underlying pricer.
    pub fn pricer(&self) -> &AmericanOptionPricer {
        &self.pricer
    }

    /// Delta, gamma, vega, theta and rho for `inputs`.
    ///
    /// Any failed evaluation fails the whole call.
    pub fn compute(&self, inputs: &PricingInputs) -> Result<Greeks> {
        inputs.validate()?;

        if inputs.is_degenerate() {
            let delta = if inputs.intrinsic() > 0.0 {
                inputs.option_type.exercised_delta()
            } else {
                0.0
            };
            return Ok(Greeks {
                delta,
                ..Greeks::default()
            });
        }

        let config = self.pricer.config();
        let h = config.fd_step;
        let price = |bumped: PricingInputs| self.pricer.price(&bumped);

        let base = price(*inputs)?;

        let spot_up = price(PricingInputs { spot: inputs.spot + h, ..*inputs })?;
        let spot_down = price(PricingInputs { spot: inputs.spot - h, ..*inputs })?;

        // Lower sigma and T bumps stop at zero; divide by the span actually taken.
        let (vol_hi, vol_lo) = (inputs.volatility + h, (inputs.volatility - h).max(0.0));
        let vol_up = price(PricingInputs { volatility: vol_hi, ..*inputs })?;
        let vol_down = price(PricingInputs { volatility: vol_lo, ..*inputs })?;

        let (time_hi, time_lo) = (
            inputs.time_to_expiry + h,
            (inputs.time_to_expiry - h).max(0.0),
        );
        let time_up = price(PricingInputs { time_to_expiry: time_hi, ..*inputs })?;
        let time_down = price(PricingInputs { time_to_expiry: time_lo, ..*inputs })?;

        let rate_up = price(PricingInputs { rate: inputs.rate + h, ..*inputs })?;
        let rate_down = price(PricingInputs { rate: inputs.rate - h, ..*inputs })?;

        let greeks = Greeks {
            delta: (spot_up - spot_down) / (2.0 * h),
            gamma: (spot_up - 2.0 * base + spot_down) / (h * h),
            vega: (vol_up - vol_down) / (vol_hi - vol_lo) / config.percent_scale,
            theta: (time_up - time_down) / (time_hi - time_lo) / config.days_per_year,
            rho: (rate_up - rate_down) / (2.0 * h) / config.percent_scale,
        };

        debug!(%inputs, ?greeks, "computed greeks");
        Ok(greeks)
    }
}
