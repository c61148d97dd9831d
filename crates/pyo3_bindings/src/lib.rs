//! PyO3 bindings for the optval engine.
//!
//! Exposes the Rust engine to Python:
//! - Bars to indicator rows
//! - American option prices and Greeks
//! - Model feature vectors

use std::collections::HashMap;

use chrono::NaiveDate;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use optval_core::{
    Bar as RustBar,
    Config as RustConfig,
    ContractSpec,
    Error as RustError,
    Greeks as RustGreeks,
    IndicatorRow as RustIndicatorRow,
    OptionType,
    PricingInputs,
};
use optval_features::{FeatureAssembler, FeatureSchema};
use optval_indicators::IndicatorEngine;
use optval_ingestion::SeriesBuilder;
use optval_pricing::GreeksEngine;

/// Caller errors surface as ValueError, numerical failures as RuntimeError.
fn to_py_err(err: RustError) -> PyErr {
    if err.is_caller_error() {
        PyValueError::new_err(err.to_string())
    } else {
        PyRuntimeError::new_err(err.to_string())
    }
}

fn parse_date(s: &str) -> PyResult<NaiveDate> {
    s.parse()
        .map_err(|e| PyValueError::new_err(format!("invalid date '{s}': {e}")))
}

fn load_config(config_json: Option<&str>) -> PyResult<RustConfig> {
    match config_json {
        Some(raw) => RustConfig::from_json_str(raw).map_err(to_py_err),
        None => Ok(RustConfig::default()),
    }
}

// ============================================================================
// Python-exposed Types
// ============================================================================

/// One instrument-day OHLCV record.
#[pyclass]
#[derive(Clone)]
pub struct Bar {
    #[pyo3(get, set)]
    pub instrument_id: String,
    /// ISO date, e.g. "2024-03-01".
    #[pyo3(get, set)]
    pub date: String,
    #[pyo3(get, set)]
    pub open: f64,
    #[pyo3(get, set)]
    pub high: f64,
    #[pyo3(get, set)]
    pub low: f64,
    #[pyo3(get, set)]
    pub close: f64,
    #[pyo3(get, set)]
    pub volume: f64,
}

#[pymethods]
impl Bar {
    #[new]
    fn new(
        instrument_id: String,
        date: String,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Bar { instrument_id, date, open, high, low, close, volume }
    }

    fn __repr__(&self) -> String {
        format!(
            "Bar(instrument_id={}, date={}, close={}, volume={})",
            self.instrument_id, self.date, self.close, self.volume
        )
    }
}

impl TryFrom<Bar> for RustBar {
    type Error = PyErr;

    fn try_from(b: Bar) -> PyResult<Self> {
        Ok(RustBar {
            date: parse_date(&b.date)?,
            instrument_id: b.instrument_id,
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            volume: b.volume,
        })
    }
}

/// Indicator values for one bar (read-only).
#[pyclass]
#[derive(Clone)]
pub struct IndicatorRow {
    inner: RustIndicatorRow,
}

#[pymethods]
impl IndicatorRow {
    #[getter]
    fn instrument_id(&self) -> String {
        self.inner.instrument_id.clone()
    }

    #[getter]
    fn date(&self) -> String {
        self.inner.date.to_string()
    }

    #[getter]
    fn close(&self) -> f64 {
        self.inner.close
    }

    #[getter]
    fn volume(&self) -> f64 {
        self.inner.volume
    }

    #[getter(ret)]
    fn return_(&self) -> Option<f64> {
        self.inner.ret
    }

    #[getter]
    fn rolling_vol_30d(&self) -> Option<f64> {
        self.inner.rolling_vol_30d
    }

    #[getter]
    fn skewness_30d(&self) -> Option<f64> {
        self.inner.skewness_30d
    }

    #[getter]
    fn kurtosis_30d(&self) -> Option<f64> {
        self.inner.kurtosis_30d
    }

    #[getter]
    fn rsi_14(&self) -> Option<f64> {
        self.inner.rsi_14
    }

    #[getter]
    fn macd(&self) -> f64 {
        self.inner.macd
    }

    #[getter]
    fn macd_signal(&self) -> f64 {
        self.inner.macd_signal
    }

    #[getter]
    fn avg_volume_20d(&self) -> Option<f64> {
        self.inner.avg_volume_20d
    }

    #[getter]
    fn avg_volume_30d(&self) -> Option<f64> {
        self.inner.avg_volume_30d
    }

    #[getter]
    fn avg_volume_60d(&self) -> Option<f64> {
        self.inner.avg_volume_60d
    }

    #[getter]
    fn relative_volume_20d(&self) -> Option<f64> {
        self.inner.relative_volume_20d
    }

    #[getter]
    fn volume_change_1d(&self) -> Option<f64> {
        self.inner.volume_change_1d
    }

    #[getter]
    fn volume_change_5d(&self) -> Option<f64> {
        self.inner.volume_change_5d
    }

    #[getter]
    fn sector(&self) -> Option<String> {
        self.inner.sector.clone()
    }

    #[getter]
    fn shock_event(&self) -> Option<String> {
        self.inner.shock_event.clone()
    }

    fn __repr__(&self) -> String {
        format!(
            "IndicatorRow(instrument_id={}, date={}, close={}, rsi_14={:?}, rolling_vol_30d={:?})",
            self.inner.instrument_id,
            self.inner.date,
            self.inner.close,
            self.inner.rsi_14,
            self.inner.rolling_vol_30d
        )
    }
}

impl From<RustIndicatorRow> for IndicatorRow {
    fn from(inner: RustIndicatorRow) -> Self {
        IndicatorRow { inner }
    }
}

/// Option price sensitivities.
#[pyclass]
#[derive(Clone)]
pub struct Greeks {
    #[pyo3(get)]
    pub delta: f64,
    #[pyo3(get)]
    pub gamma: f64,
    #[pyo3(get)]
    pub vega: f64,
    #[pyo3(get)]
    pub theta: f64,
    #[pyo3(get)]
    pub rho: f64,
}

#[pymethods]
impl Greeks {
    fn __repr__(&self) -> String {
        format!(
            "Greeks(delta={:.6}, gamma={:.6}, vega={:.6}, theta={:.6}, rho={:.6})",
            self.delta, self.gamma, self.vega, self.theta, self.rho
        )
    }
}

impl From<RustGreeks> for Greeks {
    fn from(g: RustGreeks) -> Self {
        Greeks {
            delta: g.delta,
            gamma: g.gamma,
            vega: g.vega,
            theta: g.theta,
            rho: g.rho,
        }
    }
}

// ============================================================================
// Engine Classes
// ============================================================================

/// Rolling indicator engine.
#[pyclass]
pub struct PyIndicatorEngine {
    inner: IndicatorEngine,
}

impl PyIndicatorEngine {
    fn build_series(
        bars: Vec<Bar>,
        sectors: Option<HashMap<String, String>>,
    ) -> PyResult<SeriesBuilder> {
        let mut builder = SeriesBuilder::new();
        for bar in bars {
            builder.add_bar(bar.try_into()?);
        }
        for (instrument_id, sector) in sectors.unwrap_or_default() {
            builder.set_sector(instrument_id, sector);
        }
        Ok(builder)
    }
}

#[pymethods]
impl PyIndicatorEngine {
    #[new]
    #[pyo3(signature = (config_json=None))]
    fn new(config_json: Option<&str>) -> PyResult<Self> {
        let config = load_config(config_json)?;
        Ok(PyIndicatorEngine {
            inner: IndicatorEngine::new(config.indicators),
        })
    }

    /// All indicator rows per instrument.
    #[pyo3(signature = (bars, sectors=None))]
    fn compute(
        &self,
        py: Python<'_>,
        bars: Vec<Bar>,
        sectors: Option<HashMap<String, String>>,
    ) -> PyResult<HashMap<String, Vec<IndicatorRow>>> {
        let builder = Self::build_series(bars, sectors)?;
        let rows = py.allow_threads(|| {
            builder
                .build()
                .map(|series| self.inner.compute_batch(&series))
        });
        Ok(rows
            .map_err(to_py_err)?
            .into_iter()
            .map(|(id, rows)| (id, rows.into_iter().map(Into::into).collect()))
            .collect())
    }

    /// Latest indicator row per instrument.
    #[pyo3(signature = (bars, sectors=None))]
    fn latest(
        &self,
        py: Python<'_>,
        bars: Vec<Bar>,
        sectors: Option<HashMap<String, String>>,
    ) -> PyResult<HashMap<String, IndicatorRow>> {
        let builder = Self::build_series(bars, sectors)?;
        let rows = py.allow_threads(|| {
            builder
                .build()
                .and_then(|series| self.inner.latest_batch(&series))
        });
        Ok(rows
            .map_err(to_py_err)?
            .into_iter()
            .map(|(id, row)| (id, row.into()))
            .collect())
    }
}

/// American option pricer with finite-difference Greeks.
#[pyclass]
pub struct PyPricer {
    inner: GreeksEngine,
}

impl PyPricer {
    fn inputs(
        spot: f64,
        strike: f64,
        time_to_expiry: f64,
        rate: f64,
        sigma: f64,
        option_type: &str,
        dividend_yield: f64,
    ) -> PyResult<PricingInputs> {
        let option_type: OptionType = option_type.parse().map_err(to_py_err)?;
        Ok(
            PricingInputs::new(spot, strike, time_to_expiry, rate, sigma, option_type)
                .with_dividend_yield(dividend_yield),
        )
    }
}

#[pymethods]
impl PyPricer {
    #[new]
    #[pyo3(signature = (config_json=None))]
    fn new(config_json: Option<&str>) -> PyResult<Self> {
        let config = load_config(config_json)?;
        Ok(PyPricer {
            inner: GreeksEngine::new(config.pricing),
        })
    }

    /// Barone-Adesi-Whaley American price.
    #[pyo3(
        signature = (spot, strike, time_to_expiry, rate, sigma, option_type, dividend_yield=0.0)
    )]
    fn price(
        &self,
        spot: f64,
        strike: f64,
        time_to_expiry: f64,
        rate: f64,
        sigma: f64,
        option_type: &str,
        dividend_yield: f64,
    ) -> PyResult<f64> {
        let inputs = Self::inputs(
            spot,
            strike,
            time_to_expiry,
            rate,
            sigma,
            option_type,
            dividend_yield,
        )?;
        self.inner.pricer().price(&inputs).map_err(to_py_err)
    }

    /// Finite-difference Greeks.
    #[pyo3(
        signature = (spot, strike, time_to_expiry, rate, sigma, option_type, dividend_yield=0.0)
    )]
    fn greeks(
        &self,
        spot: f64,
        strike: f64,
        time_to_expiry: f64,
        rate: f64,
        sigma: f64,
        option_type: &str,
        dividend_yield: f64,
    ) -> PyResult<Greeks> {
        let inputs = Self::inputs(
            spot,
            strike,
            time_to_expiry,
            rate,
            sigma,
            option_type,
            dividend_yield,
        )?;
        self.inner.compute(&inputs).map(Into::into).map_err(to_py_err)
    }
}

/// Feature vector assembly.
#[pyclass]
pub struct PyFeatureAssembler {
    inner: FeatureAssembler,
}

#[pymethods]
impl PyFeatureAssembler {
    #[new]
    #[pyo3(signature = (config_json=None))]
    fn new(config_json: Option<&str>) -> PyResult<Self> {
        let config = load_config(config_json)?;
        Ok(PyFeatureAssembler {
            inner: FeatureAssembler::new(&config),
        })
    }

    /// Ordered feature values for one row and a JSON contract.
    #[pyo3(signature = (row, contract_json, valuation_date, schema="option_price"))]
    fn assemble(
        &self,
        row: &IndicatorRow,
        contract_json: &str,
        valuation_date: &str,
        schema: &str,
    ) -> PyResult<Vec<f64>> {
        let contract: ContractSpec = serde_json::from_str(contract_json)
            .map_err(|e| PyValueError::new_err(format!("invalid contract: {e}")))?;
        let schema: FeatureSchema = schema.parse().map_err(to_py_err)?;
        let valuation_date = parse_date(valuation_date)?;
        self.inner
            .assemble(&row.inner, &contract, valuation_date, schema)
            .map(|v| v.into_values())
            .map_err(to_py_err)
    }

    /// Column names of a schema, in model order.
    #[staticmethod]
    fn column_names(schema: &str) -> PyResult<Vec<&'static str>> {
        let schema: FeatureSchema = schema.parse().map_err(to_py_err)?;
        Ok(schema.column_names())
    }
}

// ============================================================================
// Module Definition
// ============================================================================

/// optval engine - indicators, American option pricing and model features.
#[pymodule]
fn optval_engine(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Types
    m.add_class::<Bar>()?;
    m.add_class::<IndicatorRow>()?;
    m.add_class::<Greeks>()?;

    // Engine classes
    m.add_class::<PyIndicatorEngine>()?;
    m.add_class::<PyPricer>()?;
    m.add_class::<PyFeatureAssembler>()?;

    Ok(())
}
