use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::correlation::{CorrelationMatrix, CorrelationSpec};
use super::lhs::latin_hypercube;
use super::params::{split_param_name, ParameterSet};
use super::scenario::Scenario;
use crate::config::PROBIT_CLAMP;
use crate::error::{DoeError, Result};
use crate::profile_scope;
use crate::stats::{normal_cdf, probit};

/// How a sampling request is carried out, decided once up front.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplingPlan {
    /// No parameters: every scenario carries only the analysis tag.
    AnalysisOnly,
    /// No off-diagonal correlation requested. The copula with an identity
    /// factor is the identity map, so the stratified draw is used as is.
    Independent,
    /// Gaussian copula through the Cholesky factor of the conditioned matrix.
    Correlated { factor: DMatrix<f64> },
}

/// Correlated Latin Hypercube sampler over a parameter set.
#[derive(Debug, Clone)]
pub struct CorrelatedSampler<'a> {
    params: &'a ParameterSet,
    correlations: Option<&'a CorrelationSpec>,
    seed: Option<u64>,
}

impl<'a> CorrelatedSampler<'a> {
    pub fn new(params: &'a ParameterSet) -> Self {
        Self { params, correlations: None, seed: None }
    }

    pub fn with_correlations(mut self, spec: &'a CorrelationSpec) -> Self {
        self.correlations = Some(spec);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn params(&self) -> &ParameterSet {
        self.params
    }

    /// The correlation matrix implied by the request, before jitter.
    pub fn correlation_matrix(&self) -> Result<CorrelationMatrix> {
        CorrelationMatrix::build(self.params, self.correlations)
    }

    /// Validate the correlation request and choose the plan.
    pub fn plan(&self) -> Result<SamplingPlan> {
        let matrix = self.correlation_matrix()?;
        if self.params.is_empty() {
            return Ok(SamplingPlan::AnalysisOnly);
        }
        for name in self.params.names() {
            if split_param_name(name).1.is_none() {
                tracing::warn!(parameter = name, "parameter has no property part; its values are not recorded in scenarios");
            }
        }
        if matrix.is_identity() {
            return Ok(SamplingPlan::Independent);
        }
        let factor = matrix.cholesky_factor()?;
        Ok(SamplingPlan::Correlated { factor })
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }

    /// Draw `n × d` values already rescaled to each parameter's range.
    pub fn sample_values(&self, n_scenarios: usize) -> Result<DMatrix<f64>> {
        if n_scenarios == 0 {
            return Err(DoeError::InvalidScenarioCount { count: n_scenarios });
        }
        let plan = self.plan()?;
        Ok(self.draw(&plan, n_scenarios))
    }

    fn draw(&self, plan: &SamplingPlan, n_scenarios: usize) -> DMatrix<f64> {
        let mut rng = self.rng();
        let uniform = latin_hypercube(n_scenarios, self.params.len(), &mut rng);
        let uniform = match plan {
            SamplingPlan::AnalysisOnly | SamplingPlan::Independent => uniform,
            SamplingPlan::Correlated { factor } => gaussian_copula(&uniform, factor),
        };
        rescale(&uniform, self.params)
    }

    /// Produce `n_scenarios` scenario records tagged with `analysis`.
    pub fn sample(&self, n_scenarios: usize, analysis: &str) -> Result<Vec<Scenario>> {
        if n_scenarios == 0 {
            return Err(DoeError::InvalidScenarioCount { count: n_scenarios });
        }
        if analysis.trim().is_empty() {
            return Err(DoeError::MissingAnalysisTag);
        }
        let plan = self.plan()?;
        tracing::debug!(
            parameters = self.params.len(),
            n_scenarios,
            correlated = matches!(plan, SamplingPlan::Correlated { .. }),
            "sampling scenarios"
        );
        if plan == SamplingPlan::AnalysisOnly {
            return Ok((0..n_scenarios).map(|_| Scenario::analysis_only(analysis)).collect());
        }

        let values = self.draw(&plan, n_scenarios);
        let names: Vec<&str> = self.params.names().collect();
        let scenarios = values
            .row_iter()
            .map(|row| Scenario::from_flat(names.iter().copied().zip(row.iter().copied()), analysis))
            .collect();
        Ok(scenarios)
    }
}

/// Sample `n_scenarios` scenarios from `params`, optionally correlated.
pub fn sample(
    params: &ParameterSet,
    n_scenarios: usize,
    analysis: &str,
    correlations: Option<&CorrelationSpec>,
    seed: Option<u64>,
) -> Result<Vec<Scenario>> {
    let mut sampler = CorrelatedSampler::new(params);
    if let Some(spec) = correlations {
        sampler = sampler.with_correlations(spec);
    }
    if let Some(seed) = seed {
        sampler = sampler.with_seed(seed);
    }
    sampler.sample(n_scenarios, analysis)
}

/// Uniform -> probit -> `z · Lᵗ` -> Φ. Margins stay uniform on [0, 1].
pub fn gaussian_copula(uniform: &DMatrix<f64>, factor: &DMatrix<f64>) -> DMatrix<f64> {
    profile_scope!("copula");
    let normals = uniform.map(|u| probit(u.clamp(PROBIT_CLAMP, 1.0 - PROBIT_CLAMP)));
    let correlated = normals * factor.transpose();
    correlated.map(normal_cdf)
}

/// Affinely map each unit-interval column onto its parameter's range.
pub fn rescale(uniform: &DMatrix<f64>, params: &ParameterSet) -> DMatrix<f64> {
    let mut scaled = uniform.clone();
    for (j, range) in params.iter().enumerate() {
        for u in scaled.column_mut(j).iter_mut() {
            *u = range.scale(*u);
        }
    }
    scaled
}
