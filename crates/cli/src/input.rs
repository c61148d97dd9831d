//! JSON input files.

use anyhow::{Context, Result};
use optval_core::{Bar, ContractSpec, InstrumentId, InstrumentSeries};
use optval_ingestion::{SeriesBuilder, ShockCalendar};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {what} from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {what} in {}", path.display()))
}

/// Bars file (array of bar records) plus an optional instrument -> sector map.
pub fn load_series(
    bars: &Path,
    sectors: Option<&Path>,
) -> Result<BTreeMap<InstrumentId, InstrumentSeries>> {
    let bars: Vec<Bar> = read_json(bars, "bars")?;
    let mut builder = SeriesBuilder::new();
    builder.add_bars(bars);

    if let Some(path) = sectors {
        let sectors: BTreeMap<InstrumentId, String> = read_json(path, "sectors")?;
        for (instrument_id, sector) in sectors {
            builder.set_sector(instrument_id, sector);
        }
    }

    Ok(builder.build()?)
}

/// Single-instrument series out of a bars file.
pub fn load_instrument(
    bars: &Path,
    sectors: Option<&Path>,
    instrument: &str,
) -> Result<InstrumentSeries> {
    let mut series = load_series(bars, sectors)?;
    series
        .remove(instrument)
        .with_context(|| format!("no bars for instrument {instrument}"))
}

pub fn load_contract(path: &Path) -> Result<ContractSpec> {
    read_json(path, "contract")
}

/// Shock calendar file, or the built-in calendar.
pub fn load_shocks(path: Option<&Path>) -> Result<ShockCalendar> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading shock events from {}", path.display()))?;
            Ok(ShockCalendar::from_json_str(&raw)?)
        }
        None => Ok(ShockCalendar::default()),
    }
}
