//! Return-based rolling statistics.
//!
//! Computes simple returns of the close, their annualized rolling standard
//! deviation, and rolling skewness/kurtosis.

use crate::rolling::RollingWindow;

/// Rolling volatility calculator using simple returns.
#[derive(Debug, Clone)]
pub struct RollingVolatility {
    /// Recent returns (one slot per row).
    returns: RollingWindow,
    /// Previous price (for computing next return).
    prev_price: Option<f64>,
    /// Multiplier turning per-period stdev into annual volatility.
    annualization: f64,
}

impl RollingVolatility {
    /// Create a new calculator.
    ///
    /// # Arguments
    /// * `window` - Window size in rows
    /// * `min_periods` - Defined returns required before a value is produced
    /// * `periods_per_year` - Annualization factor (252 for daily bars)
    pub fn new(window: usize, min_periods: usize, periods_per_year: f64) -> Self {
        Self {
            returns: RollingWindow::new(window, min_periods),
            prev_price: None,
            annualization: periods_per_year.sqrt(),
        }
    }

    /// Add a price observation.
    ///
    /// Returns the simple return vs. the previous price; the first
    /// observation has none.
    pub fn add_price(&mut self, price: f64) -> Option<f64> {
        let ret = match self.prev_price {
            Some(prev) if prev > 0.0 => Some(price / prev - 1.0),
            _ => None,
        };
        self.returns.push(ret);
        self.prev_price = Some(price);
        ret
    }

    /// Annualized standard deviation of returns in the window.
    pub fn volatility(&self) -> Option<f64> {
        self.returns.std().map(|s| s * self.annualization)
    }

    /// Check if the window is full.
    pub fn is_ready(&self) -> bool {
        self.returns.is_full()
    }

    /// Get the number of defined returns in the window.
    pub fn count(&self) -> usize {
        self.returns.count()
    }

    /// Clear all data.
    pub fn clear(&mut self) {
        self.returns.clear();
        self.prev_price = None;
    }
}

/// Rolling skewness and excess kurtosis of returns.
#[derive(Debug, Clone)]
pub struct RollingMoments {
    returns: RollingWindow,
}

impl RollingMoments {
    /// Create a new moments tracker.
    pub fn new(window: usize, min_periods: usize) -> Self {
        Self {
            returns: RollingWindow::new(window, min_periods),
        }
    }

    /// Add the return of the next row (None for undefined).
    pub fn add_return(&mut self, ret: Option<f64>) {
        self.returns.push(ret);
    }

    pub fn skewness(&self) -> Option<f64> {
        self.returns.skewness()
    }

    pub fn kurtosis(&self) -> Option<f64> {
        self.returns.kurtosis()
    }

    /// Clear all data.
    pub fn clear(&mut self) {
        self.returns.clear();
    }
}
