//! Momentum indicators: EMA, MACD and RSI.

use crate::rolling::RollingWindow;

/// Recursive exponential moving average without bias adjustment.
///
/// Weight `alpha = 2 / (span + 1)`; the first observation seeds the average.
#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f64,
    value: Option<f64>,
}

impl Ema {
    /// Create an EMA with the given span.
    pub fn new(span: usize) -> Self {
        Self {
            alpha: 2.0 / (span as f64 + 1.0),
            value: None,
        }
    }

    /// Feed the next observation and return the updated average.
    pub fn update(&mut self, x: f64) -> f64 {
        let next = match self.value {
            Some(prev) => self.alpha * x + (1.0 - self.alpha) * prev,
            None => x,
        };
        self.value = Some(next);
        next
    }

    /// Current value.
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Clear all data.
    pub fn clear(&mut self) {
        self.value = None;
    }
}

/// MACD line and its signal line.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
}

impl Macd {
    /// Create a MACD with fast/slow/signal spans (12/26/9 by convention).
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Self {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
        }
    }

    /// Feed the next close; returns `(macd, signal)`.
    pub fn update(&mut self, close: f64) -> (f64, f64) {
        let macd = self.fast.update(close) - self.slow.update(close);
        let signal = self.signal.update(macd);
        (macd, signal)
    }

    /// Clear all data.
    pub fn clear(&mut self) {
        self.fast.clear();
        self.slow.clear();
        self.signal.clear();
    }
}

/// Relative strength index with simple-moving-average smoothing.
#[derive(Debug, Clone)]
pub struct Rsi {
    gains: RollingWindow,
    losses: RollingWindow,
    prev_close: Option<f64>,
}

impl Rsi {
    /// Create an RSI over `window` rows.
    pub fn new(window: usize, min_periods: usize) -> Self {
        Self {
            gains: RollingWindow::new(window, min_periods),
            losses: RollingWindow::new(window, min_periods),
            prev_close: None,
        }
    }

    /// Feed the next close and return the RSI, if defined.
    pub fn update(&mut self, close: f64) -> Option<f64> {
        let delta = self.prev_close.map(|prev| close - prev);
        self.prev_close = Some(close);

        self.gains.push(delta.map(|d| d.max(0.0)));
        self.losses.push(delta.map(|d| (-d).max(0.0)));

        let avg_gain = self.gains.mean()?;
        let avg_loss = self.losses.mean()?;
        Some(rsi_from_averages(avg_gain, avg_loss))
    }

    /// Clear all data.
    pub fn clear(&mut self) {
        self.gains.clear();
        self.losses.clear();
        self.prev_close = None;
    }
}

/// RSI = 100 - 100 / (1 + gain/loss); a zero average loss saturates at 100.
#[inline]
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}
