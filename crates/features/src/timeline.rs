//! Valuation timeline up to expiry.
//!
//! Holds the latest indicator row fixed and re-values the contract on a
//! sequence of dates between a start date and the contract's expiry.

use crate::assembler::FeatureAssembler;
use crate::schema::{FeatureSchema, FeatureVector};
use chrono::{Duration, NaiveDate};
use optval_core::{ContractSpec, Error, Expiry, Greeks, IndicatorRow, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// A pretrained model that scores feature vectors.
pub trait Predictor: Send + Sync {
    /// Fair value from an [`FeatureSchema::OptionPrice`] vector.
    fn predict_price(&self, features: &FeatureVector) -> Result<f64>;

    /// Early-exercise probability from an
    /// [`FeatureSchema::ExerciseProbability`] vector.
    fn predict_exercise_probability(&self, features: &FeatureVector) -> Result<f64>;
}

/// Which dates the timeline visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sampling {
    /// Every calendar day from start to expiry.
    Daily,
    /// `n` evenly spaced dates including both ends.
    Points(usize),
}

/// Valuation on one date.
#[derive(Debug, Clone, Serialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub time_to_expiry: f64,
    /// American price.
    pub price: f64,
    pub greeks: Greeks,
    pub features: Vec<FeatureVector>,
    pub predicted_price: Option<f64>,
    /// Clamped to [0, 1].
    pub exercise_probability: Option<f64>,
}

/// Re-values one contract across dates.
#[derive(Clone)]
pub struct TimelineSimulator {
    assembler: FeatureAssembler,
    schemas: Vec<FeatureSchema>,
    predictor: Option<Arc<dyn Predictor>>,
}

impl TimelineSimulator {
    /// Simulator producing vectors for both schemas.
    pub fn new(assembler: FeatureAssembler) -> Self {
        Self {
            assembler,
            schemas: vec![FeatureSchema::OptionPrice, FeatureSchema::ExerciseProbability],
            predictor: None,
        }
    }

    /// Restrict the schemas assembled on each date.
    pub fn with_schemas(mut self, schemas: Vec<FeatureSchema>) -> Self {
        self.schemas = schemas;
        self
    }

    /// Score every date with `predictor`.
    pub fn with_predictor(mut self, predictor: Arc<dyn Predictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    /// Value `contract` on each sampled date from `start` to its expiry.
    ///
    /// Dates whose evaluation fails are skipped with a warning.
    pub fn run(
        &self,
        row: &IndicatorRow,
        contract: &ContractSpec,
        start: NaiveDate,
        sampling: Sampling,
    ) -> Result<Vec<TimelinePoint>> {
        let expiry = match contract.expiry() {
            Expiry::Date(expiry) => expiry,
            _ => {
                return Err(Error::invalid_input(
                    "timeline simulation needs a contract with an expiry date",
                ))
            }
        };
        if expiry <= start {
            return Err(Error::invalid_input(format!(
                "expiry {expiry} must be after the start date {start}"
            )));
        }

        let dates = sample_dates(start, expiry, sampling)?;
        let points: Vec<TimelinePoint> = dates
            .par_iter()
            .filter_map(|&date| match self.evaluate(row, contract, date) {
                Ok(point) => Some(point),
                Err(e) => {
                    warn!(%date, error = %e, "timeline evaluation failed, skipping date");
                    None
                }
            })
            .collect();

        info!(
            instrument = %row.instrument_id,
            requested = dates.len(),
            evaluated = points.len(),
            "timeline complete"
        );
        Ok(points)
    }

    fn evaluate(
        &self,
        row: &IndicatorRow,
        contract: &ContractSpec,
        date: NaiveDate,
    ) -> Result<TimelinePoint> {
        let merged = self.assembler.merge(row, contract, date)?;
        let price = self.assembler.pricer().price(merged.inputs())?;
        let features = self
            .schemas
            .iter()
            .map(|schema| merged.vector(*schema))
            .collect::<Result<Vec<_>>>()?;

        let (predicted_price, exercise_probability) = match &self.predictor {
            Some(predictor) => {
                let price = predictor.predict_price(&merged.vector(FeatureSchema::OptionPrice)?)?;
                let exercise_vector = merged.vector(FeatureSchema::ExerciseProbability)?;
                let probability = predictor.predict_exercise_probability(&exercise_vector)?;
                (Some(price), Some(probability.clamp(0.0, 1.0)))
            }
            None => (None, None),
        };

        Ok(TimelinePoint {
            date,
            time_to_expiry: merged.inputs().time_to_expiry,
            price,
            greeks: *merged.greeks(),
            features,
            predicted_price,
            exercise_probability,
        })
    }
}

/// Dates from `start` to `end` inclusive.
fn sample_dates(start: NaiveDate, end: NaiveDate, sampling: Sampling) -> Result<Vec<NaiveDate>> {
    let span = (end - start).num_days();
    match sampling {
        Sampling::Daily => Ok((0..=span).map(|d| start + Duration::days(d)).collect()),
        Sampling::Points(0) => Err(Error::invalid_input("timeline needs at least one point")),
        Sampling::Points(1) => Ok(vec![start]),
        Sampling::Points(n) => {
            let step = span as f64 / (n - 1) as f64;
            let mut dates: Vec<NaiveDate> = (0..n)
                .map(|i| start + Duration::days((i as f64 * step).round() as i64))
                .collect();
            dates.dedup();
            Ok(dates)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optval_core::{Config, OptionType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_row() -> IndicatorRow {
        IndicatorRow {
            instrument_id: "MSFT".to_string(),
            date: date(2024, 5, 1),
            close: 95.0,
            volume: 2_000_000.0,
            ret: Some(-0.01),
            rolling_vol_30d: Some(0.3),
            skewness_30d: Some(0.1),
            kurtosis_30d: Some(0.5),
            rsi_14: Some(40.0),
            macd: -0.4,
            macd_signal: -0.2,
            avg_volume_20d: Some(1_800_000.0),
            avg_volume_30d: Some(1_900_000.0),
            avg_volume_60d: Some(2_100_000.0),
            relative_volume_20d: Some(1.11),
            volume_change_1d: Some(0.02),
            volume_change_5d: Some(-0.1),
            sector: None,
            shock_event: None,
        }
    }

    fn contract(expiry: NaiveDate) -> ContractSpec {
        ContractSpec::builder(100.0, OptionType::Put)
            .expiry_date(expiry)
            .build()
            .unwrap()
    }

    fn simulator() -> TimelineSimulator {
        TimelineSimulator::new(FeatureAssembler::new(&Config::default()))
    }

    struct FixedPredictor;

    impl Predictor for FixedPredictor {
        fn predict_price(&self, features: &FeatureVector) -> Result<f64> {
            Ok(features.values()[0] * 0.05)
        }

        fn predict_exercise_probability(&self, _features: &FeatureVector) -> Result<f64> {
            Ok(1.7)
        }
    }

    #[test]
    fn test_daily_timeline() {
        let start = date(2024, 5, 1);
        let points = simulator()
            .run(&make_row(), &contract(date(2024, 5, 11)), start, Sampling::Daily)
            .unwrap();

        assert_eq!(points.len(), 11);
        assert_eq!(points[0].date, start);
        assert_eq!(points[10].time_to_expiry, 0.0);
        // At expiry the put is worth its intrinsic value.
        assert_eq!(points[10].price, 5.0);
        for pair in points.windows(2) {
            assert!(pair[0].time_to_expiry > pair[1].time_to_expiry);
            assert!(pair[0].price >= pair[1].price);
        }
        assert_eq!(points[0].features.len(), 2);
        assert!(points[0].predicted_price.is_none());
    }

    #[test]
    fn test_evenly_spaced_points() {
        let start = date(2024, 5, 1);
        let points = simulator()
            .run(&make_row(), &contract(date(2024, 5, 31)), start, Sampling::Points(4))
            .unwrap();
        let dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 5, 1), date(2024, 5, 11), date(2024, 5, 21), date(2024, 5, 31)]
        );
    }

    #[test]
    fn test_predictor_output_is_clamped() {
        let points = simulator()
            .with_schemas(vec![FeatureSchema::ExerciseProbability])
            .with_predictor(Arc::new(FixedPredictor))
            .run(&make_row(), &contract(date(2024, 5, 3)), date(2024, 5, 1), Sampling::Daily)
            .unwrap();

        assert_eq!(points.len(), 3);
        for point in &points {
            assert_eq!(point.exercise_probability, Some(1.0));
            assert_eq!(point.predicted_price, Some(95.0 * 0.05));
            assert_eq!(point.features.len(), 1);
        }
    }

    #[test]
    fn test_expiry_before_start_rejected() {
        let err = simulator()
            .run(&make_row(), &contract(date(2024, 5, 1)), date(2024, 5, 1), Sampling::Daily)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_contract_without_expiry_date_rejected() {
        let contract = ContractSpec::builder(100.0, OptionType::Call)
            .time_to_expiry(0.5)
            .build()
            .unwrap();
        let err = simulator()
            .run(&make_row(), &contract, date(2024, 5, 1), Sampling::Points(3))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_zero_points_rejected() {
        let err = simulator()
            .run(&make_row(), &contract(date(2024, 6, 1)), date(2024, 5, 1), Sampling::Points(0))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
