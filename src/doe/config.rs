/// DOE study configuration structures
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::correlation::{CorrelationEntry, CorrelationSpec};
use super::params::{ParameterRange, ParameterSet};
use crate::dedup::FilterOptions;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoeConfig {
    /// Name of the DOE study
    pub study_name: String,

    /// Analysis tag attached to every scenario (e.g. "Pushover")
    pub analysis: String,

    /// Number of scenarios to draw
    pub n_scenarios: usize,

    /// Seed for the stratified draw; fresh entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,

    /// Sampled parameters, `<Entity>_<Property>` with closed bounds
    #[serde(default)]
    pub parameters: Vec<ParameterRange>,

    /// Target pairwise correlations; unlisted pairs are uncorrelated
    #[serde(default)]
    pub correlations: Vec<CorrelationEntry>,

    /// Near-duplicate filter; skipped when absent
    #[serde(default)]
    pub filter: Option<FilterOptions>,
}

impl DoeConfig {
    /// Example study over a material and a pier
    pub fn template() -> Self {
        DoeConfig {
            study_name: "Pier Pushover Study".to_string(),
            analysis: "Pushover".to_string(),
            n_scenarios: 50,
            seed: Some(42),
            parameters: vec![
                ParameterRange::new("Mat_E", 1000.0, 5000.0),
                ParameterRange::new("Mat_w", 10.0, 20.0),
                ParameterRange::new("Pier_h", 3.0, 8.0),
            ],
            correlations: vec![CorrelationEntry {
                first: "Mat_E".to_string(),
                second: "Mat_w".to_string(),
                rho: 0.5,
            }],
            filter: Some(FilterOptions::default()),
        }
    }

    pub fn parameter_set(&self) -> Result<ParameterSet> {
        ParameterSet::from_ranges(self.parameters.iter().cloned())
    }

    pub fn correlation_spec(&self) -> CorrelationSpec {
        self.correlations.iter().cloned().collect()
    }

    /// Load DOE configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save DOE configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
