use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::table::FeatureTable;
use crate::config::CONSTANT_COLUMN_EPS;
use crate::error::{DoeError, Result};
use crate::stats::ColumnStats;

/// Per-column scaling applied before distances are measured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    /// (x - mean) / std
    #[default]
    ZScore,
    /// (x - min) / (max - min)
    MinMax,
}

impl FromStr for ScaleMode {
    type Err = DoeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zscore" => Ok(ScaleMode::ZScore),
            "minmax" => Ok(ScaleMode::MinMax),
            other => Err(DoeError::UnsupportedScale { mode: other.to_string() }),
        }
    }
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleMode::ZScore => write!(f, "zscore"),
            ScaleMode::MinMax => write!(f, "minmax"),
        }
    }
}

/// Dense row-major point set in normalized feature space.
#[derive(Debug, Clone, PartialEq)]
pub struct Points {
    data: Vec<f64>,
    dim: usize,
    len: usize,
}

impl Points {
    pub fn new(data: Vec<f64>, dim: usize, len: usize) -> Self {
        debug_assert_eq!(data.len(), dim * len);
        Self { data, dim, len }
    }

    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let dim = rows.first().map_or(0, Vec::len);
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Self::new(data, dim, rows.len())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    /// Largest absolute coordinate, ignoring NaN.
    pub fn max_abs(&self) -> f64 {
        self.data.iter().filter(|v| !v.is_nan()).fold(0.0, |m, v| m.max(v.abs()))
    }
}

/// Center and scale of one column, plus whether it is treated as constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnScale {
    pub center: f64,
    pub scale: f64,
    pub constant: bool,
}

impl ColumnScale {
    pub fn fit(stats: &ColumnStats, mode: ScaleMode) -> Self {
        let (center, spread) = match mode {
            ScaleMode::ZScore => (stats.mean, stats.std),
            ScaleMode::MinMax => (stats.min, stats.max - stats.min),
        };
        // Constancy is judged on the standard deviation in both modes.
        let constant = stats.count == 0 || !(stats.std >= CONSTANT_COLUMN_EPS);
        let scale = if spread >= CONSTANT_COLUMN_EPS { spread } else { 1.0 };
        Self { center, scale, constant }
    }

    pub fn apply(&self, x: f64) -> f64 {
        if self.constant {
            0.0
        } else {
            (x - self.center) / self.scale
        }
    }
}

/// Normalize the selected columns of `table`. Near-constant columns become
/// all zeros; they carry no distance signal.
pub fn normalize(table: &FeatureTable, columns: &[usize], mode: ScaleMode) -> Points {
    let scales: Vec<ColumnScale> = columns
        .iter()
        .map(|&j| ColumnScale::fit(&ColumnStats::from_values(table.column_values(j)), mode))
        .collect();
    let dim = columns.len();
    let mut data = Vec::with_capacity(dim * table.n_rows());
    for row in table.rows() {
        for (&j, scale) in columns.iter().zip(&scales) {
            data.push(scale.apply(row[j]));
        }
    }
    Points::new(data, dim, table.n_rows())
}
