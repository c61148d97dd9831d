//! Core data types for the optval engine.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Instrument identifier (ticker).
pub type InstrumentId = String;

/// One instrument-day OHLCV record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Instrument this bar belongs to.
    pub instrument_id: InstrumentId,
    /// Trading date.
    pub date: NaiveDate,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
    /// Traded volume.
    pub volume: f64,
}

impl Bar {
    fn validate(&self) -> Result<()> {
        for (name, px) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !(px.is_finite() && px > 0.0) {
                return Err(Error::invalid_input(format!(
                    "{} {}: {} must be finite and positive, got {}",
                    self.instrument_id, self.date, name, px
                )));
            }
        }
        if !(self.volume.is_finite() && self.volume >= 0.0) {
            return Err(Error::invalid_input(format!(
                "{} {}: volume must be finite and non-negative, got {}",
                self.instrument_id, self.date, self.volume
            )));
        }
        Ok(())
    }
}

/// Ordered bars of a single instrument.
///
/// Invariants: non-empty, every bar carries the same instrument id, dates
/// strictly increasing.
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentSeries {
    instrument_id: InstrumentId,
    sector: Option<String>,
    bars: Vec<Bar>,
}

impl InstrumentSeries {
    /// Validate and wrap bars that are already sorted by date.
    pub fn new(bars: Vec<Bar>) -> Result<Self> {
        let first = bars
            .first()
            .ok_or_else(|| Error::invalid_input("instrument series must not be empty"))?;
        let instrument_id = first.instrument_id.clone();

        for bar in &bars {
            bar.validate()?;
            if bar.instrument_id != instrument_id {
                return Err(Error::invalid_input(format!(
                    "series for {} contains a bar for {}",
                    instrument_id, bar.instrument_id
                )));
            }
        }
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(Error::invalid_input(format!(
                    "{}: dates must be strictly increasing ({} then {})",
                    instrument_id, pair[0].date, pair[1].date
                )));
            }
        }

        Ok(Self {
            instrument_id,
            sector: None,
            bars,
        })
    }

    /// Attach the instrument's sector.
    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }

    /// Instrument identifier.
    pub fn instrument_id(&self) -> &str {
        &self.instrument_id
    }

    /// Sector, if known.
    pub fn sector(&self) -> Option<&str> {
        self.sector.as_deref()
    }

    /// Bars in ascending date order.
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Number of bars.
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false; kept for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Most recent bar.
    pub fn last(&self) -> &Bar {
        // Non-empty by construction.
        &self.bars[self.bars.len() - 1]
    }
}

/// Indicator values derived for one bar.
///
/// Statistics that are undefined for the bar (not enough history, zero
/// variance) are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub instrument_id: InstrumentId,
    pub date: NaiveDate,
    pub close: f64,
    pub volume: f64,
    /// Simple return vs. the previous close.
    pub ret: Option<f64>,
    /// Annualized rolling volatility of returns.
    pub rolling_vol_30d: Option<f64>,
    pub skewness_30d: Option<f64>,
    /// Excess kurtosis.
    pub kurtosis_30d: Option<f64>,
    pub rsi_14: Option<f64>,
    pub macd: f64,
    pub macd_signal: f64,
    pub avg_volume_20d: Option<f64>,
    pub avg_volume_30d: Option<f64>,
    pub avg_volume_60d: Option<f64>,
    pub relative_volume_20d: Option<f64>,
    pub volume_change_1d: Option<f64>,
    pub volume_change_5d: Option<f64>,
    #[serde(default)]
    pub sector: Option<String>,
    /// Label of the market shock event covering this date.
    #[serde(default)]
    pub shock_event: Option<String>,
}

impl IndicatorRow {
    /// Whether the row falls inside a labelled shock event.
    pub fn in_shock_event(&self) -> bool {
        match self.shock_event.as_deref() {
            Some(label) => label != "None" && !label.eq_ignore_ascii_case("nan"),
            None => false,
        }
    }
}

/// Option exercise right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Decode the model's numeric encoding: 1 = call, 0 = put.
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            1 => Ok(OptionType::Call),
            0 => Ok(OptionType::Put),
            other => Err(Error::invalid_input(format!(
                "option_type must be 0 (put) or 1 (call), got {other}"
            ))),
        }
    }

    /// Numeric encoding used as a model feature.
    pub fn code(self) -> u8 {
        match self {
            OptionType::Call => 1,
            OptionType::Put => 0,
        }
    }

    /// Payoff at spot `s` and strike `k`, floored at zero.
    #[inline]
    pub fn intrinsic(self, s: f64, k: f64) -> f64 {
        match self {
            OptionType::Call => (s - k).max(0.0),
            OptionType::Put => (k - s).max(0.0),
        }
    }

    /// Delta of an exercised in-the-money position: +1 call, -1 put.
    pub fn exercised_delta(self) -> f64 {
        match self {
            OptionType::Call => 1.0,
            OptionType::Put => -1.0,
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "call"),
            OptionType::Put => write!(f, "put"),
        }
    }
}

impl std::str::FromStr for OptionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" | "c" | "1" => Ok(OptionType::Call),
            "put" | "p" | "0" => Ok(OptionType::Put),
            other => Err(Error::invalid_input(format!("unknown option type '{other}'"))),
        }
    }
}

/// How the contract's maturity was specified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiry {
    /// Calendar expiry date; T is derived from the valuation date.
    Date(NaiveDate),
    /// Explicit time to expiry in years.
    Years(f64),
    /// Not given; the configured default applies.
    Unspecified,
}

/// A validated option contract.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawContract")]
pub struct ContractSpec {
    strike: f64,
    option_type: OptionType,
    expiry: Expiry,
    rate: Option<f64>,
    volatility: Option<f64>,
    dividend_yield: Option<f64>,
}

impl ContractSpec {
    /// Start building a contract.
    pub fn builder(strike: f64, option_type: OptionType) -> ContractSpecBuilder {
        ContractSpecBuilder {
            strike,
            option_type,
            expiry: Expiry::Unspecified,
            rate: None,
            volatility: None,
            dividend_yield: None,
        }
    }

    pub fn strike(&self) -> f64 {
        self.strike
    }

    pub fn option_type(&self) -> OptionType {
        self.option_type
    }

    pub fn expiry(&self) -> Expiry {
        self.expiry
    }

    /// Rate override, if any.
    pub fn rate(&self) -> Option<f64> {
        self.rate
    }

    /// Volatility override, if any.
    pub fn volatility(&self) -> Option<f64> {
        self.volatility
    }

    /// Dividend yield, if any.
    pub fn dividend_yield(&self) -> Option<f64> {
        self.dividend_yield
    }

    /// Time to expiry in years as seen from `valuation_date`, floored at zero.
    pub fn time_to_expiry(
        &self,
        valuation_date: NaiveDate,
        days_per_year: f64,
        default_days: u32,
    ) -> f64 {
        match self.expiry {
            Expiry::Date(expiry) => {
                let days = (expiry - valuation_date).num_days();
                (days as f64 / days_per_year).max(0.0)
            }
            Expiry::Years(t) => t,
            Expiry::Unspecified => default_days as f64 / days_per_year,
        }
    }
}

/// Builder resolving optional contract fields once, at construction.
#[derive(Debug, Clone)]
pub struct ContractSpecBuilder {
    strike: f64,
    option_type: OptionType,
    expiry: Expiry,
    rate: Option<f64>,
    volatility: Option<f64>,
    dividend_yield: Option<f64>,
}

impl ContractSpecBuilder {
    /// Calendar expiry date.
    pub fn expiry_date(mut self, date: NaiveDate) -> Self {
        self.expiry = Expiry::Date(date);
        self
    }

    /// Explicit time to expiry in years.
    pub fn time_to_expiry(mut self, years: f64) -> Self {
        self.expiry = Expiry::Years(years);
        self
    }

    /// Override the risk-free rate.
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Override the volatility used for pricing.
    pub fn volatility(mut self, sigma: f64) -> Self {
        self.volatility = Some(sigma);
        self
    }

    /// Continuous dividend yield.
    pub fn dividend_yield(mut self, q: f64) -> Self {
        self.dividend_yield = Some(q);
        self
    }

    /// Validate and produce the contract.
    pub fn build(self) -> Result<ContractSpec> {
        if !(self.strike.is_finite() && self.strike > 0.0) {
            return Err(Error::invalid_input(format!(
                "strike must be finite and positive, got {}",
                self.strike
            )));
        }
        if let Expiry::Years(t) = self.expiry {
            if !(t.is_finite() && t >= 0.0) {
                return Err(Error::invalid_input(format!(
                    "time to expiry must be finite and >= 0, got {t}"
                )));
            }
        }
        if let Some(r) = self.rate {
            if !r.is_finite() {
                return Err(Error::invalid_input(format!("rate must be finite, got {r}")));
            }
        }
        if let Some(sigma) = self.volatility {
            if !(sigma.is_finite() && sigma >= 0.0) {
                return Err(Error::invalid_input(format!(
                    "volatility must be finite and >= 0, got {sigma}"
                )));
            }
        }
        if let Some(q) = self.dividend_yield {
            if !q.is_finite() {
                return Err(Error::invalid_input(format!("dividend yield must be finite, got {q}")));
            }
        }

        Ok(ContractSpec {
            strike: self.strike,
            option_type: self.option_type,
            expiry: self.expiry,
            rate: self.rate,
            volatility: self.volatility,
            dividend_yield: self.dividend_yield,
        })
    }
}

/// Option type as it arrives on the wire: numeric code or name.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OptionTypeField {
    Code(i64),
    Name(String),
}

/// Unvalidated contract as deserialized from JSON.
#[derive(Debug, Clone, Deserialize)]
struct RawContract {
    #[serde(alias = "K")]
    strike: f64,
    option_type: OptionTypeField,
    #[serde(default)]
    expiry_date: Option<NaiveDate>,
    #[serde(default, alias = "T")]
    time_to_expiry: Option<f64>,
    #[serde(default, alias = "r")]
    rate: Option<f64>,
    #[serde(default, alias = "sigma")]
    volatility: Option<f64>,
    #[serde(default, alias = "q")]
    dividend_yield: Option<f64>,
}

impl TryFrom<RawContract> for ContractSpec {
    type Error = Error;

    fn try_from(raw: RawContract) -> Result<Self> {
        let option_type = match raw.option_type {
            OptionTypeField::Code(code) => OptionType::from_code(code)?,
            OptionTypeField::Name(name) => name.parse()?,
        };
        let mut builder = ContractSpec::builder(raw.strike, option_type);
        // An explicit T wins over a calendar date.
        if let Some(date) = raw.expiry_date {
            builder = builder.expiry_date(date);
        }
        if let Some(t) = raw.time_to_expiry {
            builder = builder.time_to_expiry(t);
        }
        builder.rate = raw.rate;
        builder.volatility = raw.volatility;
        builder.dividend_yield = raw.dividend_yield;
        builder.build()
    }
}

/// Inputs to the American option pricer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingInputs {
    /// Spot price S.
    pub spot: f64,
    /// Strike K.
    pub strike: f64,
    /// Time to expiry T in years.
    pub time_to_expiry: f64,
    /// Risk-free rate r.
    pub rate: f64,
    /// Volatility sigma.
    pub volatility: f64,
    /// Dividend yield q.
    pub dividend_yield: f64,
    pub option_type: OptionType,
}

impl PricingInputs {
    /// Inputs with a zero dividend yield.
    pub fn new(
        spot: f64,
        strike: f64,
        time_to_expiry: f64,
        rate: f64,
        volatility: f64,
        option_type: OptionType,
    ) -> Self {
        Self {
            spot,
            strike,
            time_to_expiry,
            rate,
            volatility,
            dividend_yield: 0.0,
            option_type,
        }
    }

    /// Set the dividend yield.
    pub fn with_dividend_yield(mut self, q: f64) -> Self {
        self.dividend_yield = q;
        self
    }

    /// Check the domain: S>0, K>0, T>=0, sigma>=0, everything finite.
    pub fn validate(&self) -> Result<()> {
        let all_finite = [
            self.spot,
            self.strike,
            self.time_to_expiry,
            self.rate,
            self.volatility,
            self.dividend_yield,
        ]
        .iter()
        .all(|v| v.is_finite());

        if !all_finite
            || self.spot <= 0.0
            || self.strike <= 0.0
            || self.time_to_expiry < 0.0
            || self.volatility < 0.0
        {
            return Err(Error::invalid_input(format!("pricing inputs out of domain: {self}")));
        }
        Ok(())
    }

    /// No time or no volatility left: the option is worth its payoff.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.time_to_expiry <= 0.0 || self.volatility <= 0.0
    }

    /// Immediate exercise value.
    #[inline]
    pub fn intrinsic(&self) -> f64 {
        self.option_type.intrinsic(self.spot, self.strike)
    }
}

impl fmt::Display for PricingInputs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "S={}, K={}, T={}, r={}, sigma={}, q={}, type={}",
            self.spot,
            self.strike,
            self.time_to_expiry,
            self.rate,
            self.volatility,
            self.dividend_yield,
            self.option_type
        )
    }
}

/// Finite-difference sensitivities of the option price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    /// dP/dS.
    pub delta: f64,
    /// d2P/dS2.
    pub gamma: f64,
    /// dP/dsigma per 1% of volatility.
    pub vega: f64,
    /// dP/dT per calendar day.
    pub theta: f64,
    /// dP/dr per 1% of rate.
    pub rho: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_bar(day: u32, close: f64) -> Bar {
        Bar {
            instrument_id: "AAPL".to_string(),
            date: date(2024, 1, day),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_series_rejects_empty() {
        assert!(InstrumentSeries::new(Vec::new()).is_err());
    }

    #[test]
    fn test_series_rejects_unsorted_dates() {
        let bars = vec![make_bar(3, 100.0), make_bar(2, 101.0)];
        let err = InstrumentSeries::new(bars).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_series_rejects_duplicate_dates() {
        let bars = vec![make_bar(2, 100.0), make_bar(2, 101.0)];
        assert!(InstrumentSeries::new(bars).is_err());
    }

    #[test]
    fn test_series_rejects_mixed_instruments() {
        let mut other = make_bar(3, 101.0);
        other.instrument_id = "MSFT".to_string();
        assert!(InstrumentSeries::new(vec![make_bar(2, 100.0), other]).is_err());
    }

    #[test]
    fn test_series_rejects_bad_close() {
        assert!(InstrumentSeries::new(vec![make_bar(2, 0.0)]).is_err());
        assert!(InstrumentSeries::new(vec![make_bar(2, f64::NAN)]).is_err());
    }

    #[test]
    fn test_series_accessors() {
        let series = InstrumentSeries::new(vec![make_bar(2, 100.0), make_bar(3, 101.0)])
            .unwrap()
            .with_sector("Technology");
        assert_eq!(series.instrument_id(), "AAPL");
        assert_eq!(series.sector(), Some("Technology"));
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().close, 101.0);
    }

    #[test]
    fn test_option_type_codes() {
        assert_eq!(OptionType::from_code(1).unwrap(), OptionType::Call);
        assert_eq!(OptionType::from_code(0).unwrap(), OptionType::Put);
        assert!(OptionType::from_code(2).is_err());
        assert_eq!(OptionType::Call.code(), 1);
        assert_eq!("PUT".parse::<OptionType>().unwrap(), OptionType::Put);
        assert!("straddle".parse::<OptionType>().is_err());
    }

    #[test]
    fn test_intrinsic() {
        assert_eq!(OptionType::Call.intrinsic(110.0, 100.0), 10.0);
        assert_eq!(OptionType::Call.intrinsic(90.0, 100.0), 0.0);
        assert_eq!(OptionType::Put.intrinsic(90.0, 100.0), 10.0);
        assert_eq!(OptionType::Put.intrinsic(110.0, 100.0), 0.0);
    }

    #[test]
    fn test_contract_builder_validation() {
        assert!(ContractSpec::builder(-1.0, OptionType::Call).build().is_err());
        assert!(ContractSpec::builder(100.0, OptionType::Call)
            .time_to_expiry(-0.1)
            .build()
            .is_err());
        assert!(ContractSpec::builder(100.0, OptionType::Put)
            .volatility(-0.2)
            .build()
            .is_err());
        assert!(ContractSpec::builder(100.0, OptionType::Put)
            .rate(f64::INFINITY)
            .build()
            .is_err());

        let spec = ContractSpec::builder(100.0, OptionType::Put)
            .time_to_expiry(0.25)
            .rate(0.03)
            .build()
            .unwrap();
        assert_eq!(spec.strike(), 100.0);
        assert_eq!(spec.rate(), Some(0.03));
        assert_eq!(spec.volatility(), None);
    }

    #[test]
    fn test_time_to_expiry_resolution() {
        let valuation = date(2024, 1, 1);

        let by_date = ContractSpec::builder(100.0, OptionType::Call)
            .expiry_date(date(2024, 3, 31))
            .build()
            .unwrap();
        let t = by_date.time_to_expiry(valuation, 365.0, 30);
        assert!((t - 90.0 / 365.0).abs() < 1e-12);

        let expired = ContractSpec::builder(100.0, OptionType::Call)
            .expiry_date(date(2023, 12, 1))
            .build()
            .unwrap();
        assert_eq!(expired.time_to_expiry(valuation, 365.0, 30), 0.0);

        let unspecified = ContractSpec::builder(100.0, OptionType::Call).build().unwrap();
        assert!((unspecified.time_to_expiry(valuation, 365.0, 30) - 30.0 / 365.0).abs() < 1e-12);
    }

    #[test]
    fn test_contract_from_json() {
        let spec: ContractSpec = serde_json::from_str(
            r#"{"K": 150.0, "option_type": 0, "expiry_date": "2024-06-21", "r": 0.04}"#,
        )
        .unwrap();
        assert_eq!(spec.option_type(), OptionType::Put);
        assert_eq!(spec.expiry(), Expiry::Date(date(2024, 6, 21)));
        assert_eq!(spec.rate(), Some(0.04));

        let spec: ContractSpec =
            serde_json::from_str(r#"{"strike": 150.0, "option_type": "call", "T": 0.5}"#).unwrap();
        assert_eq!(spec.option_type(), OptionType::Call);
        assert_eq!(spec.expiry(), Expiry::Years(0.5));

        let bad = serde_json::from_str::<ContractSpec>(r#"{"K": 150.0, "option_type": 7}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_pricing_inputs_validation() {
        let inputs = PricingInputs::new(100.0, 100.0, 0.25, 0.03, 0.2, OptionType::Put);
        assert!(inputs.validate().is_ok());
        assert!(!inputs.is_degenerate());

        let mut bad = inputs;
        bad.spot = 0.0;
        assert!(bad.validate().is_err());

        let mut bad = inputs;
        bad.volatility = f64::NAN;
        assert!(bad.validate().is_err());

        let mut expired = inputs;
        expired.time_to_expiry = 0.0;
        assert!(expired.validate().is_ok());
        assert!(expired.is_degenerate());
    }

    #[test]
    fn test_shock_flag() {
        let mut row = IndicatorRow {
            instrument_id: "AAPL".to_string(),
            date: date(2020, 3, 2),
            close: 100.0,
            volume: 1.0,
            ret: None,
            rolling_vol_30d: None,
            skewness_30d: None,
            kurtosis_30d: None,
            rsi_14: None,
            macd: 0.0,
            macd_signal: 0.0,
            avg_volume_20d: None,
            avg_volume_30d: None,
            avg_volume_60d: None,
            relative_volume_20d: None,
            volume_change_1d: None,
            volume_change_5d: None,
            sector: None,
            shock_event: None,
        };
        assert!(!row.in_shock_event());
        row.shock_event = Some("covid_crash".to_string());
        assert!(row.in_shock_event());
        row.shock_event = Some("NaN".to_string());
        assert!(!row.in_shock_event());
    }
}
