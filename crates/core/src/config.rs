//! Configuration structures for the optval engine.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rolling indicator configuration.
    pub indicators: IndicatorConfig,
    /// Pricing and finite-difference configuration.
    pub pricing: PricingConfig,
    /// Defaults applied to contracts that omit optional fields.
    pub contract: ContractDefaults,
    /// Feature assembly configuration.
    pub features: FeatureConfig,
}

impl Config {
    /// Parse a configuration from a JSON string and validate it.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Check all sections for out-of-range values.
    pub fn validate(&self) -> Result<()> {
        self.indicators.validate()?;
        self.pricing.validate()?;
        self.contract.validate()?;
        Ok(())
    }
}

/// Rolling indicator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Window for rolling return volatility (observations).
    pub volatility_window: usize,
    /// Window for rolling skewness and kurtosis.
    pub moments_window: usize,
    /// Annualization factor applied as sqrt(factor) to volatility.
    pub annualization_factor: f64,
    /// RSI averaging window.
    pub rsi_window: usize,
    /// MACD fast EMA span.
    pub macd_fast: usize,
    /// MACD slow EMA span.
    pub macd_slow: usize,
    /// MACD signal EMA span.
    pub macd_signal: usize,
    /// Short volume average window (also the relative-volume base).
    pub volume_short_window: usize,
    /// Medium volume average window.
    pub volume_mid_window: usize,
    /// Long volume average window.
    pub volume_long_window: usize,
    /// Lag for the short volume change.
    pub volume_change_short_lag: usize,
    /// Lag for the long volume change.
    pub volume_change_long_lag: usize,
    /// Require full windows instead of min-periods-1 partial statistics.
    pub strict_windows: bool,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            volatility_window: 30,
            moments_window: 30,
            annualization_factor: 252.0,
            rsi_window: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            volume_short_window: 20,
            volume_mid_window: 30,
            volume_long_window: 60,
            volume_change_short_lag: 1,
            volume_change_long_lag: 5,
            strict_windows: false,
        }
    }
}

impl IndicatorConfig {
    /// Minimum samples a window of `window` rows needs under this config.
    pub fn min_periods(&self, window: usize) -> usize {
        if self.strict_windows {
            window
        } else {
            1
        }
    }

    fn validate(&self) -> Result<()> {
        let windows = [
            ("volatility_window", self.volatility_window),
            ("moments_window", self.moments_window),
            ("rsi_window", self.rsi_window),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
            ("volume_short_window", self.volume_short_window),
            ("volume_mid_window", self.volume_mid_window),
            ("volume_long_window", self.volume_long_window),
            ("volume_change_short_lag", self.volume_change_short_lag),
            ("volume_change_long_lag", self.volume_change_long_lag),
        ];
        for (name, value) in windows {
            if value == 0 {
                return Err(Error::config(format!("indicators.{name} must be > 0")));
            }
        }
        if self.macd_fast >= self.macd_slow {
            return Err(Error::config(format!(
                "indicators.macd_fast ({}) must be below macd_slow ({})",
                self.macd_fast, self.macd_slow
            )));
        }
        if !(self.annualization_factor > 0.0) {
            return Err(Error::config("indicators.annualization_factor must be > 0"));
        }
        Ok(())
    }
}

/// Pricing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Finite-difference step shared by every Greek.
    pub fd_step: f64,
    /// Guard below which the characteristic root and boundary denominator are clamped.
    pub root_epsilon: f64,
    /// Relative tolerance of the critical-price Newton iteration.
    pub newton_tolerance: f64,
    /// Iteration cap for the critical-price Newton iteration.
    pub newton_max_iterations: u32,
    /// Days per year used to scale theta and convert expiry dates.
    pub days_per_year: f64,
    /// Percentage scale applied to vega and rho.
    pub percent_scale: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            fd_step: 1e-4,
            root_epsilon: 1e-5,
            newton_tolerance: 1e-8,
            newton_max_iterations: 100,
            days_per_year: 365.0,
            percent_scale: 100.0,
        }
    }
}

impl PricingConfig {
    fn validate(&self) -> Result<()> {
        let positives = [
            ("fd_step", self.fd_step),
            ("root_epsilon", self.root_epsilon),
            ("newton_tolerance", self.newton_tolerance),
            ("days_per_year", self.days_per_year),
            ("percent_scale", self.percent_scale),
        ];
        for (name, value) in positives {
            if !(value > 0.0 && value.is_finite()) {
                return Err(Error::config(format!("pricing.{name} must be positive, got {value}")));
            }
        }
        if self.newton_max_iterations == 0 {
            return Err(Error::config("pricing.newton_max_iterations must be > 0"));
        }
        Ok(())
    }
}

/// Defaults for contract fields the caller may omit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractDefaults {
    /// Risk-free rate when neither the contract nor the data layer supplies one.
    pub rate: f64,
    /// Volatility when no override is given and the rolling estimate is undefined.
    pub volatility: f64,
    /// Time to expiry in days when the contract has neither expiry date nor T.
    pub time_to_expiry_days: u32,
    /// Dividend yield.
    pub dividend_yield: f64,
}

impl Default for ContractDefaults {
    fn default() -> Self {
        Self {
            rate: 0.03,
            volatility: 0.20,
            time_to_expiry_days: 30,
            dividend_yield: 0.0,
        }
    }
}

impl ContractDefaults {
    fn validate(&self) -> Result<()> {
        if !self.rate.is_finite() {
            return Err(Error::config("contract.rate must be finite"));
        }
        if !(self.volatility >= 0.0 && self.volatility.is_finite()) {
            return Err(Error::config("contract.volatility must be finite and >= 0"));
        }
        if !self.dividend_yield.is_finite() {
            return Err(Error::config("contract.dividend_yield must be finite"));
        }
        Ok(())
    }
}

/// Feature assembly configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Additive epsilon inside ln(moneyness + eps).
    pub log_moneyness_epsilon: f64,
    /// Sector vocabulary; a sector's code is its index.
    pub sectors: Vec<String>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        let sectors = [
            "Basic Materials",
            "Communication Services",
            "Consumer Cyclical",
            "Consumer Defensive",
            "Energy",
            "Financial Services",
            "Healthcare",
            "Industrials",
            "Real Estate",
            "Technology",
            "Utilities",
        ];
        Self {
            log_moneyness_epsilon: 1e-6,
            sectors: sectors.iter().map(|s| s.to_string()).collect(),
        }
    }
}
