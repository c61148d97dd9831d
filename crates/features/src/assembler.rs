//! Feature assembly.
//!
//! Joins the latest indicator row of an instrument with a contract: resolves
//! the pricing inputs, computes Greeks, and selects the columns a model
//! schema asks for.

use crate::schema::{FeatureName, FeatureSchema, FeatureVector};
use crate::sector::SectorEncoder;
use chrono::NaiveDate;
use optval_core::{
    config::{ContractDefaults, FeatureConfig, PricingConfig},
    Config, ContractSpec, Error, Greeks, IndicatorRow, PricingInputs, Result,
};
use optval_pricing::{AmericanOptionPricer, GreeksEngine};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Builds model feature vectors.
///
/// Holds only configuration; every call is independent.
#[derive(Debug, Clone)]
pub struct FeatureAssembler {
    greeks: GreeksEngine,
    pricing: PricingConfig,
    defaults: ContractDefaults,
    features: FeatureConfig,
    sectors: Option<SectorEncoder>,
}

/// One merged row: resolved inputs, Greeks and every produced column.
#[derive(Debug, Clone)]
pub struct MergedFeatures {
    inputs: PricingInputs,
    greeks: Greeks,
    values: BTreeMap<FeatureName, Option<f64>>,
}

impl MergedFeatures {
    /// Pricing inputs the Greeks were computed with.
    pub fn inputs(&self) -> &PricingInputs {
        &self.inputs
    }

    pub fn greeks(&self) -> &Greeks {
        &self.greeks
    }

    /// `None` if the column was not produced, `Some(None)` if it is undefined.
    pub fn get(&self, name: FeatureName) -> Option<Option<f64>> {
        self.values.get(&name).copied()
    }

    /// Dense vector for `schema`.
    pub fn vector(&self, schema: FeatureSchema) -> Result<FeatureVector> {
        FeatureVector::from_merge(schema, &self.values)
    }
}

impl FeatureAssembler {
    /// Create an assembler with the configured sector vocabulary.
    pub fn new(config: &Config) -> Self {
        let sectors = (!config.features.sectors.is_empty())
            .then(|| SectorEncoder::from_config(&config.features));
        Self {
            greeks: GreeksEngine::new(config.pricing.clone()),
            pricing: config.pricing.clone(),
            defaults: config.contract.clone(),
            features: config.features.clone(),
            sectors,
        }
    }

    /// Replace the sector encoder; `None` stops producing `sector_encoded`.
    pub fn with_sector_encoder(mut self, sectors: Option<SectorEncoder>) -> Self {
        self.sectors = sectors;
        self
    }

    /// Pricer shared with the Greeks engine.
    pub fn pricer(&self) -> &AmericanOptionPricer {
        self.greeks.pricer()
    }

    /// Resolve pricing inputs for `contract` on `valuation_date`.
    ///
    /// Spot is the row's close. Rate and dividend yield come from the
    /// contract or the configured defaults; volatility from the contract
    /// override, then the row's rolling estimate, then the default.
    pub fn pricing_inputs(
        &self,
        row: &IndicatorRow,
        contract: &ContractSpec,
        valuation_date: NaiveDate,
    ) -> Result<PricingInputs> {
        let t = contract.time_to_expiry(
            valuation_date,
            self.pricing.days_per_year,
            self.defaults.time_to_expiry_days,
        );
        let rate = contract.rate().unwrap_or(self.defaults.rate);
        let dividend_yield = contract.dividend_yield().unwrap_or(self.defaults.dividend_yield);

        let sigma = match (contract.volatility(), row.rolling_vol_30d) {
            (Some(sigma), _) => sigma,
            (None, Some(sigma)) => sigma,
            (None, None) => {
                warn!(
                    instrument = %row.instrument_id,
                    date = %row.date,
                    default = self.defaults.volatility,
                    "rolling volatility undefined, using default"
                );
                self.defaults.volatility
            }
        };

        let inputs = PricingInputs::new(
            row.close,
            contract.strike(),
            t,
            rate,
            sigma,
            contract.option_type(),
        )
        .with_dividend_yield(dividend_yield);
        inputs.validate()?;
        Ok(inputs)
    }

    /// Merge one row with a contract into every column the engine produces.
    pub fn merge(
        &self,
        row: &IndicatorRow,
        contract: &ContractSpec,
        valuation_date: NaiveDate,
    ) -> Result<MergedFeatures> {
        let inputs = self.pricing_inputs(row, contract, valuation_date)?;
        let greeks = self.greeks.compute(&inputs)?;

        let moneyness = inputs.spot / inputs.strike;
        let log_moneyness = (moneyness + self.features.log_moneyness_epsilon).ln();

        let mut values = BTreeMap::from([
            (FeatureName::S0, Some(inputs.spot)),
            (FeatureName::K, Some(inputs.strike)),
            (FeatureName::T, Some(inputs.time_to_expiry)),
            (FeatureName::Sigma, Some(inputs.volatility)),
            (FeatureName::R, Some(inputs.rate)),
            (FeatureName::Moneyness, Some(moneyness)),
            (FeatureName::LogMoneyness, Some(log_moneyness)),
            (FeatureName::Rsi, row.rsi_14),
            (FeatureName::Macd, Some(row.macd)),
            (FeatureName::Skewness, row.skewness_30d),
            (FeatureName::Kurtosis, row.kurtosis_30d),
            (FeatureName::RelativeVolume, row.relative_volume_20d),
            (FeatureName::VolumeChange1d, row.volume_change_1d),
            (FeatureName::VolumeChange5d, row.volume_change_5d),
            (FeatureName::Delta, Some(greeks.delta)),
            (FeatureName::Gamma, Some(greeks.gamma)),
            (FeatureName::Vega, Some(greeks.vega)),
            (FeatureName::Theta, Some(greeks.theta)),
            (FeatureName::Rho, Some(greeks.rho)),
            (FeatureName::OptionType, Some(f64::from(inputs.option_type.code()))),
            (
                FeatureName::ShockEventBinary,
                Some(if row.in_shock_event() { 1.0 } else { 0.0 }),
            ),
        ]);
        if let Some(encoder) = &self.sectors {
            values.insert(
                FeatureName::SectorEncoded,
                Some(encoder.encode(row.sector.as_deref())),
            );
        }

        debug!(
            instrument = %row.instrument_id,
            %valuation_date,
            %inputs,
            "merged features"
        );
        Ok(MergedFeatures {
            inputs,
            greeks,
            values,
        })
    }

    /// Feature vector of one row for one schema.
    pub fn assemble(
        &self,
        row: &IndicatorRow,
        contract: &ContractSpec,
        valuation_date: NaiveDate,
        schema: FeatureSchema,
    ) -> Result<FeatureVector> {
        self.merge(row, contract, valuation_date)?.vector(schema)
    }

    /// Like [`assemble`](Self::assemble), for a row slice that must hold exactly one row.
    pub fn assemble_rows(
        &self,
        rows: &[IndicatorRow],
        contract: &ContractSpec,
        valuation_date: NaiveDate,
        schema: FeatureSchema,
    ) -> Result<FeatureVector> {
        match rows {
            [row] => self.assemble(row, contract, valuation_date, schema),
            _ => Err(Error::invalid_input(format!(
                "feature assembly expects exactly one row, got {}",
                rows.len()
            ))),
        }
    }
}
