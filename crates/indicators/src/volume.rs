//! Volume features: trailing averages, relative volume and lagged changes.

use crate::rolling::RollingWindow;
use std::collections::VecDeque;

/// Volume statistics for one row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeSnapshot {
    pub avg_short: Option<f64>,
    pub avg_mid: Option<f64>,
    pub avg_long: Option<f64>,
    /// Volume over the short average.
    pub relative: Option<f64>,
    pub change_short: Option<f64>,
    pub change_long: Option<f64>,
}

/// Tracks volume history for one instrument.
#[derive(Debug, Clone)]
pub struct VolumeTracker {
    short: RollingWindow,
    mid: RollingWindow,
    long: RollingWindow,
    /// Recent volumes, newest last, long enough for the largest lag.
    history: VecDeque<f64>,
    short_lag: usize,
    long_lag: usize,
}

impl VolumeTracker {
    /// Create a tracker.
    ///
    /// # Arguments
    /// * `windows` - Short/mid/long averaging windows (20/30/60 by default)
    /// * `lags` - Short/long lags for percentage changes (1/5 by default)
    /// * `strict` - Require full windows before producing averages
    pub fn new(windows: (usize, usize, usize), lags: (usize, usize), strict: bool) -> Self {
        let min = |w: usize| if strict { w } else { 1 };
        let (short_lag, long_lag) = lags;
        let capacity = short_lag.max(long_lag) + 1;
        Self {
            short: RollingWindow::new(windows.0, min(windows.0)),
            mid: RollingWindow::new(windows.1, min(windows.1)),
            long: RollingWindow::new(windows.2, min(windows.2)),
            history: VecDeque::with_capacity(capacity),
            short_lag,
            long_lag,
        }
    }

    /// Feed the next volume and return the row's statistics.
    pub fn update(&mut self, volume: f64) -> VolumeSnapshot {
        self.short.push(Some(volume));
        self.mid.push(Some(volume));
        self.long.push(Some(volume));

        let capacity = self.short_lag.max(self.long_lag) + 1;
        if self.history.len() >= capacity {
            self.history.pop_front();
        }
        self.history.push_back(volume);

        let avg_short = self.short.mean();
        let relative = avg_short.filter(|avg| *avg > 0.0).map(|avg| volume / avg);

        VolumeSnapshot {
            avg_short,
            avg_mid: self.mid.mean(),
            avg_long: self.long.mean(),
            relative,
            change_short: self.change(self.short_lag),
            change_long: self.change(self.long_lag),
        }
    }

    /// Percentage change of the latest volume vs. `lag` rows earlier.
    fn change(&self, lag: usize) -> Option<f64> {
        let n = self.history.len();
        if n <= lag {
            return None;
        }
        let current = self.history[n - 1];
        let base = self.history[n - 1 - lag];
        (base > 0.0).then(|| current / base - 1.0)
    }

    /// Clear all data.
    pub fn clear(&mut self) {
        self.short.clear();
        self.mid.clear();
        self.long.clear();
        self.history.clear();
    }
}
