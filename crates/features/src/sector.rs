//! Sector label encoding.

use optval_core::config::FeatureConfig;
use std::collections::HashMap;

/// Maps sector names to their index in a fixed vocabulary.
#[derive(Debug, Clone)]
pub struct SectorEncoder {
    codes: HashMap<String, usize>,
}

impl SectorEncoder {
    /// Build from a vocabulary; a sector's code is its position.
    pub fn new<I, S>(sectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut codes = HashMap::new();
        for sector in sectors {
            let next = codes.len();
            codes.entry(sector.into()).or_insert(next);
        }
        Self { codes }
    }

    /// Build from the configured vocabulary.
    pub fn from_config(config: &FeatureConfig) -> Self {
        Self::new(config.sectors.iter().cloned())
    }

    /// Code of a known sector.
    pub fn code(&self, sector: &str) -> Option<usize> {
        self.codes.get(sector.trim()).copied()
    }

    /// Feature value; unknown or missing sectors encode as 0.0.
    pub fn encode(&self, sector: Option<&str>) -> f64 {
        sector.and_then(|s| self.code(s)).map_or(0.0, |c| c as f64)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_vocabulary() {
        let encoder = SectorEncoder::from_config(&FeatureConfig::default());
        assert_eq!(encoder.len(), 11);
        assert_eq!(encoder.code("Basic Materials"), Some(0));
        assert_eq!(encoder.encode(Some("Technology")), 9.0);
        assert_eq!(encoder.encode(Some(" Utilities ")), 10.0);
    }

    #[test]
    fn test_unknown_and_missing() {
        let encoder = SectorEncoder::new(["Energy", "Technology"]);
        assert_eq!(encoder.encode(Some("Crypto")), 0.0);
        assert_eq!(encoder.encode(None), 0.0);
    }

    #[test]
    fn test_duplicates_keep_first_code() {
        let encoder = SectorEncoder::new(["Energy", "Technology", "Energy"]);
        assert_eq!(encoder.len(), 2);
        assert_eq!(encoder.code("Technology"), Some(1));
    }
}
