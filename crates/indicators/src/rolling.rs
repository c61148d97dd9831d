//! Fixed-size trailing window over per-row observations.
//!
//! A window holds the last `window` rows. Rows without a defined value
//! (e.g., the first return of a series) occupy a slot but are skipped by the
//! statistics, and a statistic is only produced once at least `min_periods`
//! defined values are present.

use std::collections::VecDeque;

/// Variance below which higher moments are treated as undefined.
const MOMENT_VARIANCE_FLOOR: f64 = 1e-14;

/// Trailing window of optional observations.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    /// Window size in rows.
    window: usize,
    /// Minimum defined observations for a statistic.
    min_periods: usize,
    /// Most recent rows, oldest first.
    values: VecDeque<Option<f64>>,
}

impl RollingWindow {
    /// Create a window of `window` rows requiring `min_periods` defined values.
    pub fn new(window: usize, min_periods: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            min_periods: min_periods.clamp(1, window),
            values: VecDeque::with_capacity(window),
        }
    }

    /// Push the observation of the next row, evicting the oldest row when full.
    pub fn push(&mut self, value: Option<f64>) {
        if self.values.len() >= self.window {
            self.values.pop_front();
        }
        self.values.push_back(value.filter(|v| v.is_finite()));
    }

    /// Defined observations currently in the window.
    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().filter_map(|v| *v)
    }

    /// Number of defined observations.
    pub fn count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Check if the window is full.
    pub fn is_full(&self) -> bool {
        self.values.len() >= self.window
    }

    /// Whether at least `needed` observations (and `min_periods`) are present.
    fn has(&self, needed: usize) -> Option<usize> {
        let n = self.count();
        (n >= needed.max(self.min_periods)).then_some(n)
    }

    /// Arithmetic mean.
    pub fn mean(&self) -> Option<f64> {
        let n = self.has(1)?;
        Some(self.samples().sum::<f64>() / n as f64)
    }

    /// Central moments m2, m3, m4 (divided by n) around the mean.
    fn central_moments(&self, n: usize) -> (f64, f64, f64) {
        let n_f = n as f64;
        let mean = self.samples().sum::<f64>() / n_f;
        let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
        for x in self.samples() {
            let d = x - mean;
            let d2 = d * d;
            m2 += d2;
            m3 += d2 * d;
            m4 += d2 * d2;
        }
        (m2 / n_f, m3 / n_f, m4 / n_f)
    }

    /// Sample standard deviation (ddof = 1). Needs two observations.
    pub fn std(&self) -> Option<f64> {
        let n = self.has(2)?;
        let (m2, _, _) = self.central_moments(n);
        let variance = m2 * n as f64 / (n as f64 - 1.0);
        Some(variance.max(0.0).sqrt())
    }

    /// Bias-corrected sample skewness. Needs three observations and non-zero variance.
    pub fn skewness(&self) -> Option<f64> {
        let n = self.has(3)?;
        let (m2, m3, _) = self.central_moments(n);
        if m2 <= MOMENT_VARIANCE_FLOOR {
            return None;
        }
        let n_f = n as f64;
        let g1 = m3 / m2.powf(1.5);
        Some((n_f * (n_f - 1.0)).sqrt() / (n_f - 2.0) * g1)
    }

    /// Bias-corrected sample excess kurtosis. Needs four observations and non-zero variance.
    pub fn kurtosis(&self) -> Option<f64> {
        let n = self.has(4)?;
        let (m2, _, m4) = self.central_moments(n);
        if m2 <= MOMENT_VARIANCE_FLOOR {
            return None;
        }
        let n_f = n as f64;
        let ratio = m4 / (m2 * m2);
        Some((n_f - 1.0) / ((n_f - 2.0) * (n_f - 3.0)) * ((n_f + 1.0) * ratio - 3.0 * (n_f - 1.0)))
    }

    /// Clear all data.
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn filled(window: usize, min_periods: usize, values: &[f64]) -> RollingWindow {
        let mut w = RollingWindow::new(window, min_periods);
        for &v in values {
            w.push(Some(v));
        }
        w
    }

    #[test]
    fn test_empty_window() {
        let w = RollingWindow::new(5, 1);
        assert!(w.mean().is_none());
        assert!(w.std().is_none());
        assert_eq!(w.count(), 0);
    }

    #[test]
    fn test_eviction() {
        let w = filled(3, 1, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(w.count(), 3);
        assert!(w.is_full());
        assert_relative_eq!(w.mean().unwrap(), 4.0);
    }

    #[test]
    fn test_undefined_rows_occupy_slots() {
        let mut w = RollingWindow::new(3, 1);
        w.push(None);
        w.push(Some(2.0));
        w.push(Some(4.0));
        assert_eq!(w.count(), 2);
        assert_relative_eq!(w.mean().unwrap(), 3.0);

        // None drops out of the window; the count grows to three.
        w.push(Some(6.0));
        assert_eq!(w.count(), 3);
        assert_relative_eq!(w.mean().unwrap(), 4.0);
    }

    #[test]
    fn test_non_finite_treated_as_missing() {
        let mut w = RollingWindow::new(3, 1);
        w.push(Some(f64::NAN));
        w.push(Some(1.0));
        assert_eq!(w.count(), 1);
    }

    #[test]
    fn test_sample_std() {
        // Sample variance of 2, 4, 4, 4, 5, 5, 7, 9 is 32/7.
        let w = filled(8, 1, &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_relative_eq!(w.std().unwrap(), (32.0_f64 / 7.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_std_needs_two_samples() {
        let w = filled(5, 1, &[3.0]);
        assert!(w.std().is_none());
        assert!(w.mean().is_some());
    }

    #[test]
    fn test_min_periods_strict() {
        let w = filled(4, 4, &[1.0, 2.0, 3.0]);
        assert!(w.mean().is_none());
        let w = filled(4, 4, &[1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(w.mean().unwrap(), 2.5);
    }

    #[test]
    fn test_skewness() {
        // Symmetric sample has zero skew.
        let w = filled(5, 1, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_relative_eq!(w.skewness().unwrap(), 0.0, epsilon = 1e-12);

        // Adjusted Fisher-Pearson skewness of 1, 2, 10.
        // mean = 13/3, m2 = 146/9, m3 = 1190/27 -> g1 = m3 / m2^1.5, G1 = sqrt(6) * g1.
        let w = filled(3, 1, &[1.0, 2.0, 10.0]);
        let m2: f64 = 146.0 / 9.0;
        let m3: f64 = 1190.0 / 27.0;
        let expected = 6.0_f64.sqrt() * m3 / m2.powf(1.5);
        assert_relative_eq!(w.skewness().unwrap(), expected, epsilon = 1e-10);
    }

    #[test]
    fn test_kurtosis() {
        // Excess kurtosis of 1..=5: m2 = 2, m4 = 6.8, n = 5.
        // G2 = 4 / (3 * 2) * (6 * 1.7 - 12) = -1.2
        let w = filled(5, 1, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_relative_eq!(w.kurtosis().unwrap(), -1.2, epsilon = 1e-12);
        assert!(filled(5, 1, &[1.0, 2.0, 3.0]).kurtosis().is_none());
    }

    #[test]
    fn test_constant_sample_has_no_moments() {
        let w = filled(5, 1, &[0.01; 5]);
        assert!(w.skewness().is_none());
        assert!(w.kurtosis().is_none());
        assert!(w.std().unwrap() < 1e-15);
    }
}
