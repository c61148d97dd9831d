//! Indicator computation engine.
//!
//! Combines the rolling components into a per-instrument pipeline. Each
//! series is processed by a fresh pipeline, so state never leaks between
//! instruments.

use crate::{
    momentum::{Macd, Rsi},
    volatility::{RollingMoments, RollingVolatility},
    volume::VolumeTracker,
};
use optval_core::{
    config::IndicatorConfig, Bar, Error, IndicatorRow, InstrumentId, InstrumentSeries, Result,
};
use optval_ingestion::ShockCalendar;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::debug;

/// Computes indicator rows for instrument series.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    config: IndicatorConfig,
    shocks: ShockCalendar,
}

impl IndicatorEngine {
    /// Create an engine with the built-in shock calendar.
    pub fn new(config: IndicatorConfig) -> Self {
        Self {
            config,
            shocks: ShockCalendar::default(),
        }
    }

    /// Replace the shock calendar used to label rows.
    pub fn with_shock_calendar(mut self, shocks: ShockCalendar) -> Self {
        self.shocks = shocks;
        self
    }

    /// Indicator configuration.
    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    /// One row per bar, in date order.
    pub fn compute(&self, series: &InstrumentSeries) -> Vec<IndicatorRow> {
        let mut pipeline = Pipeline::new(&self.config);
        let rows: Vec<IndicatorRow> = series
            .bars()
            .iter()
            .map(|bar| {
                let mut row = pipeline.add_bar(bar);
                row.sector = series.sector().map(str::to_string);
                row.shock_event = self.shocks.label(bar.date).map(str::to_string);
                row
            })
            .collect();

        debug!(
            instrument = series.instrument_id(),
            rows = rows.len(),
            "computed indicators"
        );
        rows
    }

    /// Row for the most recent bar.
    pub fn latest(&self, series: &InstrumentSeries) -> Result<IndicatorRow> {
        self.compute(series).pop().ok_or_else(|| {
            Error::invalid_input(format!("{}: empty series", series.instrument_id()))
        })
    }

    /// Compute every series in parallel.
    pub fn compute_batch(
        &self,
        series: &BTreeMap<InstrumentId, InstrumentSeries>,
    ) -> BTreeMap<InstrumentId, Vec<IndicatorRow>> {
        series
            .par_iter()
            .map(|(id, s)| (id.clone(), self.compute(s)))
            .collect()
    }

    /// Latest row of every series, computed in parallel.
    pub fn latest_batch(
        &self,
        series: &BTreeMap<InstrumentId, InstrumentSeries>,
    ) -> Result<BTreeMap<InstrumentId, IndicatorRow>> {
        series
            .par_iter()
            .map(|(id, s)| self.latest(s).map(|row| (id.clone(), row)))
            .collect()
    }
}

/// Stateful indicator pipeline for a single instrument.
struct Pipeline {
    volatility: RollingVolatility,
    moments: RollingMoments,
    rsi: Rsi,
    macd: Macd,
    volume: VolumeTracker,
}

impl Pipeline {
    fn new(config: &IndicatorConfig) -> Self {
        Self {
            volatility: RollingVolatility::new(
                config.volatility_window,
                config.min_periods(config.volatility_window),
                config.annualization_factor,
            ),
            moments: RollingMoments::new(
                config.moments_window,
                config.min_periods(config.moments_window),
            ),
            rsi: Rsi::new(config.rsi_window, config.min_periods(config.rsi_window)),
            macd: Macd::new(config.macd_fast, config.macd_slow, config.macd_signal),
            volume: VolumeTracker::new(
                (
                    config.volume_short_window,
                    config.volume_mid_window,
                    config.volume_long_window,
                ),
                (config.volume_change_short_lag, config.volume_change_long_lag),
                config.strict_windows,
            ),
        }
    }

    fn add_bar(&mut self, bar: &Bar) -> IndicatorRow {
        let ret = self.volatility.add_price(bar.close);
        self.moments.add_return(ret);
        let rsi = self.rsi.update(bar.close);
        let (macd, macd_signal) = self.macd.update(bar.close);
        let volume = self.volume.update(bar.volume);

        IndicatorRow {
            instrument_id: bar.instrument_id.clone(),
            date: bar.date,
            close: bar.close,
            volume: bar.volume,
            ret,
            rolling_vol_30d: self.volatility.volatility(),
            skewness_30d: self.moments.skewness(),
            kurtosis_30d: self.moments.kurtosis(),
            rsi_14: rsi,
            macd,
            macd_signal,
            avg_volume_20d: volume.avg_short,
            avg_volume_30d: volume.avg_mid,
            avg_volume_60d: volume.avg_long,
            relative_volume_20d: volume.relative,
            volume_change_1d: volume.change_short,
            volume_change_5d: volume.change_long,
            sector: None,
            shock_event: None,
        }
    }
}
