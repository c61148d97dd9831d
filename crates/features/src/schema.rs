//! Feature schemas consumed by the downstream models.

use optval_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A model feature column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeatureName {
    S0,
    K,
    T,
    Sigma,
    R,
    Moneyness,
    LogMoneyness,
    Rsi,
    Macd,
    Skewness,
    Kurtosis,
    RelativeVolume,
    VolumeChange1d,
    VolumeChange5d,
    Delta,
    Gamma,
    Vega,
    Theta,
    Rho,
    OptionType,
    SectorEncoded,
    ShockEventBinary,
}

impl FeatureName {
    /// Column name as the models were trained with it.
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureName::S0 => "S0",
            FeatureName::K => "K",
            FeatureName::T => "T",
            FeatureName::Sigma => "sigma",
            FeatureName::R => "r",
            FeatureName::Moneyness => "moneyness",
            FeatureName::LogMoneyness => "log_moneyness",
            FeatureName::Rsi => "RSI",
            FeatureName::Macd => "MACD",
            FeatureName::Skewness => "Skewness",
            FeatureName::Kurtosis => "Kurtosis",
            FeatureName::RelativeVolume => "Relative_Volume",
            FeatureName::VolumeChange1d => "Volume_Change_1d",
            FeatureName::VolumeChange5d => "Volume_Change_5d",
            FeatureName::Delta => "delta",
            FeatureName::Gamma => "gamma",
            FeatureName::Vega => "vega",
            FeatureName::Theta => "theta",
            FeatureName::Rho => "rho",
            FeatureName::OptionType => "option_type",
            FeatureName::SectorEncoded => "sector_encoded",
            FeatureName::ShockEventBinary => "shock_event_binary",
        }
    }
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const OPTION_PRICE_COLUMNS: [FeatureName; 22] = [
    FeatureName::S0,
    FeatureName::K,
    FeatureName::T,
    FeatureName::Sigma,
    FeatureName::R,
    FeatureName::Moneyness,
    FeatureName::LogMoneyness,
    FeatureName::Rsi,
    FeatureName::Macd,
    FeatureName::Skewness,
    FeatureName::Kurtosis,
    FeatureName::RelativeVolume,
    FeatureName::VolumeChange1d,
    FeatureName::VolumeChange5d,
    FeatureName::Delta,
    FeatureName::Gamma,
    FeatureName::Vega,
    FeatureName::Theta,
    FeatureName::Rho,
    FeatureName::OptionType,
    FeatureName::SectorEncoded,
    FeatureName::ShockEventBinary,
];

const EXERCISE_PROBABILITY_COLUMNS: [FeatureName; 21] = [
    FeatureName::S0,
    FeatureName::K,
    FeatureName::T,
    FeatureName::Sigma,
    FeatureName::R,
    FeatureName::Moneyness,
    FeatureName::LogMoneyness,
    FeatureName::Rsi,
    FeatureName::Macd,
    FeatureName::Skewness,
    FeatureName::Kurtosis,
    FeatureName::RelativeVolume,
    FeatureName::VolumeChange1d,
    FeatureName::VolumeChange5d,
    FeatureName::Delta,
    FeatureName::Gamma,
    FeatureName::Vega,
    FeatureName::Theta,
    FeatureName::Rho,
    FeatureName::OptionType,
    FeatureName::ShockEventBinary,
];

/// Which model a feature vector is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureSchema {
    /// Option fair-value regression.
    OptionPrice,
    /// Early-exercise classification.
    ExerciseProbability,
}

impl FeatureSchema {
    /// Columns in model order.
    pub fn columns(self) -> &'static [FeatureName] {
        match self {
            FeatureSchema::OptionPrice => &OPTION_PRICE_COLUMNS,
            FeatureSchema::ExerciseProbability => &EXERCISE_PROBABILITY_COLUMNS,
        }
    }

    /// Column names in model order.
    pub fn column_names(self) -> Vec<&'static str> {
        self.columns().iter().map(|c| c.as_str()).collect()
    }

    pub fn len(self) -> usize {
        self.columns().len()
    }
}

impl fmt::Display for FeatureSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureSchema::OptionPrice => write!(f, "option_price"),
            FeatureSchema::ExerciseProbability => write!(f, "exercise_probability"),
        }
    }
}

impl std::str::FromStr for FeatureSchema {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "option_price" | "price" => Ok(FeatureSchema::OptionPrice),
            "exercise_probability" | "exercise" => Ok(FeatureSchema::ExerciseProbability),
            other => Err(Error::invalid_input(format!("unknown feature schema '{other}'"))),
        }
    }
}

/// Dense, ordered feature values for one schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    schema: FeatureSchema,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Select the schema's columns from a merged name -> value map.
    ///
    /// A column missing from the map is a schema mismatch; a column present
    /// without a value is filled with 0.0.
    pub fn from_merge(
        schema: FeatureSchema,
        merged: &BTreeMap<FeatureName, Option<f64>>,
    ) -> Result<Self> {
        let values = schema
            .columns()
            .iter()
            .map(|column| match merged.get(column) {
                Some(value) => Ok(value.unwrap_or(0.0)),
                None => Err(Error::schema_mismatch(format!(
                    "column {column} required by {schema} was not produced"
                ))),
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(Self { schema, values })
    }

    pub fn schema(&self) -> FeatureSchema {
        self.schema
    }

    /// Values in column order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a named column, if the schema has it.
    pub fn get(&self, name: FeatureName) -> Option<f64> {
        self.schema
            .columns()
            .iter()
            .position(|c| *c == name)
            .map(|i| self.values[i])
    }

    /// (column, value) pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (FeatureName, f64)> + '_ {
        self.schema.columns().iter().copied().zip(self.values.iter().copied())
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_merge() -> BTreeMap<FeatureName, Option<f64>> {
        OPTION_PRICE_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, c)| (*c, Some(i as f64)))
            .collect()
    }

    #[test]
    fn test_schema_layouts() {
        assert_eq!(FeatureSchema::OptionPrice.len(), 22);
        assert_eq!(FeatureSchema::ExerciseProbability.len(), 21);
        let names = FeatureSchema::ExerciseProbability.column_names();
        assert_eq!(names[0], "S0");
        assert_eq!(names[7], "RSI");
        assert_eq!(names[20], "shock_event_binary");
        assert!(!names.contains(&"sector_encoded"));
    }

    #[test]
    fn test_from_merge_keeps_order() {
        let vector = FeatureVector::from_merge(FeatureSchema::OptionPrice, &full_merge()).unwrap();
        let expected: Vec<f64> = (0..22).map(|i| i as f64).collect();
        assert_eq!(vector.values(), expected.as_slice());
        assert_eq!(vector.get(FeatureName::Rho), Some(18.0));
    }

    #[test]
    fn test_undefined_values_filled_with_zero() {
        let mut merged = full_merge();
        merged.insert(FeatureName::Skewness, None);
        let vector =
            FeatureVector::from_merge(FeatureSchema::ExerciseProbability, &merged).unwrap();
        assert_eq!(vector.get(FeatureName::Skewness), Some(0.0));
        assert_eq!(vector.get(FeatureName::SectorEncoded), None);
    }

    #[test]
    fn test_missing_column_is_schema_mismatch() {
        let mut merged = full_merge();
        merged.remove(&FeatureName::SectorEncoded);
        let err = FeatureVector::from_merge(FeatureSchema::OptionPrice, &merged).unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch(_)));
        // The exercise schema does not need the column.
        assert!(FeatureVector::from_merge(FeatureSchema::ExerciseProbability, &merged).is_ok());
    }

    #[test]
    fn test_parse_schema() {
        assert_eq!("price".parse::<FeatureSchema>().unwrap(), FeatureSchema::OptionPrice);
        assert_eq!(
            "exercise_probability".parse::<FeatureSchema>().unwrap(),
            FeatureSchema::ExerciseProbability
        );
        assert!("greeks".parse::<FeatureSchema>().is_err());
    }
}
