use nalgebra::linalg::Cholesky;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::params::ParameterSet;
use crate::config::CORRELATION_JITTER;
use crate::error::{DoeError, Result};
use crate::profile_scope;

/// Target Pearson correlation between two named parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationEntry {
    pub first: String,
    pub second: String,
    pub rho: f64,
}

impl CorrelationEntry {
    fn same_pair(&self, a: &str, b: &str) -> bool {
        (self.first == a && self.second == b) || (self.first == b && self.second == a)
    }
}

/// Unordered pair -> target correlation. Setting a pair twice (in either
/// order) keeps the last value. Unspecified pairs are uncorrelated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationSpec {
    entries: Vec<CorrelationEntry>,
}

impl CorrelationSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, a: &str, b: &str, rho: f64) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.same_pair(a, b)) {
            entry.rho = rho;
            return;
        }
        self.entries.push(CorrelationEntry { first: a.to_string(), second: b.to_string(), rho });
    }

    pub fn with(mut self, a: &str, b: &str, rho: f64) -> Self {
        self.set(a, b, rho);
        self
    }

    pub fn entries(&self) -> &[CorrelationEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl FromIterator<CorrelationEntry> for CorrelationSpec {
    fn from_iter<T: IntoIterator<Item = CorrelationEntry>>(iter: T) -> Self {
        let mut spec = Self::new();
        for e in iter {
            spec.set(&e.first, &e.second, e.rho);
        }
        spec
    }
}

/// Dense symmetric unit-diagonal correlation matrix with a name -> index table.
/// The stored matrix carries no jitter; `conditioned` adds it for decomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    names: Vec<String>,
    index: HashMap<String, usize>,
    matrix: DMatrix<f64>,
}

impl CorrelationMatrix {
    /// Build the matrix for `params` from an optional spec. Every referenced
    /// name must belong to `params`; all unknown names are reported together.
    pub fn build(params: &ParameterSet, spec: Option<&CorrelationSpec>) -> Result<Self> {
        let n = params.len();
        let names: Vec<String> = params.names().map(str::to_string).collect();
        let index: HashMap<String, usize> =
            names.iter().enumerate().map(|(i, name)| (name.clone(), i)).collect();
        let mut matrix = DMatrix::<f64>::identity(n, n);

        let Some(spec) = spec else {
            return Ok(Self { names, index, matrix });
        };

        let mut unknown: Vec<String> = Vec::new();
        for entry in spec.entries() {
            for name in [&entry.first, &entry.second] {
                if !index.contains_key(name) && !unknown.contains(name) {
                    unknown.push(name.clone());
                }
            }
        }
        if !unknown.is_empty() {
            return Err(DoeError::UnknownParameters { names: unknown });
        }

        for entry in spec.entries() {
            if entry.first == entry.second {
                return Err(DoeError::SelfCorrelation { name: entry.first.clone() });
            }
            if !entry.rho.is_finite() || entry.rho.abs() > 1.0 {
                return Err(DoeError::CorrelationOutOfBounds {
                    first: entry.first.clone(),
                    second: entry.second.clone(),
                    rho: entry.rho,
                });
            }
            let (i, j) = (index[&entry.first], index[&entry.second]);
            matrix[(i, j)] = entry.rho;
            matrix[(j, i)] = entry.rho;
        }

        Ok(Self { names, index, matrix })
    }

    pub fn dim(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Correlation between two named parameters.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = *self.index.get(a)?;
        let j = *self.index.get(b)?;
        Some(self.matrix[(i, j)])
    }

    pub fn is_identity(&self) -> bool {
        self.matrix == DMatrix::identity(self.dim(), self.dim())
    }

    /// The matrix with the conditioning jitter on its diagonal.
    pub fn conditioned(&self) -> DMatrix<f64> {
        let n = self.dim();
        &self.matrix + DMatrix::<f64>::identity(n, n) * CORRELATION_JITTER
    }

    /// Lower-triangular `L` with `L * Lᵗ == conditioned()`.
    pub fn cholesky_factor(&self) -> Result<DMatrix<f64>> {
        profile_scope!("cholesky");
        let conditioned = self.conditioned();
        match Cholesky::new(conditioned.clone()) {
            Some(chol) => Ok(chol.l()),
            None => Err(self.conditioning_error(&conditioned)),
        }
    }

    /// Locate the first leading principal minor that cannot be decomposed;
    /// its last parameter is the one whose correlations must be relaxed.
    fn conditioning_error(&self, conditioned: &DMatrix<f64>) -> DoeError {
        let n = self.dim();
        let failing = (1..=n)
            .find(|&k| Cholesky::new(conditioned.view((0, 0), (k, k)).clone_owned()).is_none())
            .unwrap_or(n);
        let parameter = failing
            .checked_sub(1)
            .and_then(|i| self.names.get(i))
            .cloned()
            .unwrap_or_default();
        DoeError::NotPositiveDefinite { parameter, matrix: format!("{:.4}", self.matrix) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn three_params() -> ParameterSet {
        ParameterSet::new()
            .with("A_x", 0.0, 1.0)
            .and_then(|s| s.with("B_x", 0.0, 1.0))
            .and_then(|s| s.with("C_x", 0.0, 1.0))
            .unwrap()
    }

    #[test]
    fn no_spec_gives_identity() {
        let m = CorrelationMatrix::build(&three_params(), None).unwrap();
        assert!(m.is_identity());
        let empty = CorrelationSpec::new();
        assert!(CorrelationMatrix::build(&three_params(), Some(&empty)).unwrap().is_identity());
    }

    #[test]
    fn pairs_are_symmetric_and_last_write_wins() {
        let spec = CorrelationSpec::new().with("A_x", "C_x", 0.3).with("C_x", "A_x", 0.5);
        assert_eq!(spec.len(), 1);
        let m = CorrelationMatrix::build(&three_params(), Some(&spec)).unwrap();
        assert_eq!(m.get("A_x", "C_x"), Some(0.5));
        assert_eq!(m.get("C_x", "A_x"), Some(0.5));
        assert_eq!(m.get("B_x", "B_x"), Some(1.0));
        assert_eq!(m.get("A_x", "B_x"), Some(0.0));
    }

    #[test]
    fn unknown_names_are_all_reported() {
        let spec = CorrelationSpec::new().with("A_x", "Z_q", 0.2).with("Y_q", "B_x", 0.1);
        match CorrelationMatrix::build(&three_params(), Some(&spec)) {
            Err(DoeError::UnknownParameters { names }) => {
                assert_eq!(names, vec!["Z_q".to_string(), "Y_q".to_string()]);
            }
            other => panic!("expected UnknownParameters, got {:?}", other),
        }
    }

    #[test]
    fn self_pairs_and_out_of_range_rho_are_configuration_errors() {
        let spec = CorrelationSpec::new().with("A_x", "A_x", 1.0);
        let err = CorrelationMatrix::build(&three_params(), Some(&spec)).unwrap_err();
        assert!(matches!(err, DoeError::SelfCorrelation { .. }));

        let spec = CorrelationSpec::new().with("A_x", "B_x", 1.2);
        let err = CorrelationMatrix::build(&three_params(), Some(&spec)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn factor_reproduces_conditioned_matrix() {
        let spec = CorrelationSpec::new().with("A_x", "B_x", 0.8).with("B_x", "C_x", -0.3);
        let m = CorrelationMatrix::build(&three_params(), Some(&spec)).unwrap();
        let l = m.cholesky_factor().unwrap();
        let rebuilt = &l * l.transpose();
        assert!((rebuilt - m.conditioned()).abs().max() < 1e-12);
        // Lower triangular.
        assert_eq!(l[(0, 1)], 0.0);
        assert_eq!(l[(1, 2)], 0.0);
    }

    #[test]
    fn perfect_correlation_is_decomposable_thanks_to_jitter() {
        let spec = CorrelationSpec::new().with("A_x", "B_x", 1.0);
        let m = CorrelationMatrix::build(&three_params(), Some(&spec)).unwrap();
        assert!(m.cholesky_factor().is_ok());
    }

    #[test]
    fn inconsistent_correlations_name_the_failing_parameter() {
        let spec = CorrelationSpec::new()
            .with("A_x", "B_x", 0.9)
            .with("A_x", "C_x", 0.9)
            .with("B_x", "C_x", -0.9);
        let m = CorrelationMatrix::build(&three_params(), Some(&spec)).unwrap();
        match m.cholesky_factor() {
            Err(DoeError::NotPositiveDefinite { parameter, matrix }) => {
                assert_eq!(parameter, "C_x");
                assert!(!matrix.is_empty());
            }
            other => panic!("expected NotPositiveDefinite, got {:?}", other),
        }
    }
}
