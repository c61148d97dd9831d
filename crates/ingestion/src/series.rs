//! Per-instrument series building from raw bars.
//!
//! Groups an unordered batch of daily bars by instrument, sorts each group by
//! date and validates the result into [`InstrumentSeries`].

use optval_core::{Bar, InstrumentId, InstrumentSeries, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Builder grouping bars by instrument.
#[derive(Debug, Default)]
pub struct SeriesBuilder {
    /// Bars collected so far, keyed by instrument.
    bars: BTreeMap<InstrumentId, Vec<Bar>>,
    /// Sector metadata supplied by the data layer.
    sectors: BTreeMap<InstrumentId, String>,
}

impl SeriesBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single bar.
    pub fn add_bar(&mut self, bar: Bar) {
        self.bars.entry(bar.instrument_id.clone()).or_default().push(bar);
    }

    /// Add multiple bars.
    pub fn add_bars(&mut self, bars: impl IntoIterator<Item = Bar>) {
        for bar in bars {
            self.add_bar(bar);
        }
    }

    /// Record the sector of an instrument.
    pub fn set_sector(
        &mut self,
        instrument_id: impl Into<InstrumentId>,
        sector: impl Into<String>,
    ) {
        self.sectors.insert(instrument_id.into(), sector.into());
    }

    /// Number of instruments seen.
    pub fn instrument_count(&self) -> usize {
        self.bars.len()
    }

    /// Sort, validate and emit one series per instrument.
    ///
    /// Fails on the first instrument with duplicate dates or out-of-domain
    /// prices/volumes.
    pub fn build(self) -> Result<BTreeMap<InstrumentId, InstrumentSeries>> {
        let mut sectors = self.sectors;
        let mut out = BTreeMap::new();

        for (instrument_id, mut bars) in self.bars {
            bars.sort_by_key(|b| b.date);
            let mut series = InstrumentSeries::new(bars)?;
            if let Some(sector) = sectors.remove(&instrument_id) {
                series = series.with_sector(sector);
            }
            debug!(instrument = %instrument_id, bars = series.len(), "built series");
            out.insert(instrument_id, series);
        }

        Ok(out)
    }

    /// Clear all state.
    pub fn clear(&mut self) {
        self.bars.clear();
        self.sectors.clear();
    }
}
