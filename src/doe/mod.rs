/// Design of Experiments (DOE) module for parametric scenario studies
///
/// This module provides functionality to:
/// - Define sampled parameters and their target pairwise correlations
/// - Draw correlated Latin Hypercube samples through a Gaussian copula
/// - Assemble scenario records grouped by entity
/// - Run a study end to end from a TOML configuration and export the results

pub mod config;
pub mod correlation;
pub mod export;
pub mod lhs;
pub mod params;
pub mod runner;
pub mod sampler;
pub mod scenario;

pub use config::DoeConfig;
pub use correlation::{CorrelationEntry, CorrelationMatrix, CorrelationSpec};
pub use export::{export_clusters_csv, export_doe_summary, export_table_csv};
pub use params::{join_param_name, split_param_name, ParameterRange, ParameterSet};
pub use runner::{DoeRunner, RealizedCorrelation, StudySummary};
pub use sampler::{sample, CorrelatedSampler, SamplingPlan};
pub use scenario::{EntityRecord, OutputColumns, Scenario};
