//! Near-duplicate removal over a feature table.
//!
//! Rows are normalized per column, every row's `eps`-neighborhood is found,
//! and a greedy cover keeps one representative per cluster.

use serde::{Deserialize, Serialize};

use super::cluster::{build_clusters, visitation_order, KeepPolicy};
use super::neighbors::{NeighborSearch, NeighborStrategy};
use super::normalize::{normalize, ScaleMode};
use super::table::{FeatureTable, ScenarioId};
use crate::config::DEFAULT_DEDUP_EPS;
use crate::error::{DoeError, Result};
use crate::profile_scope;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    /// Feature columns to compare on; all columns when absent.
    pub columns: Option<Vec<String>>,
    pub scale: ScaleMode,
    pub eps: f64,
    pub keep: KeepPolicy,
    /// Only used by `KeepPolicy::Random`.
    pub seed: Option<u64>,
    pub strategy: NeighborStrategy,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            columns: None,
            scale: ScaleMode::default(),
            eps: DEFAULT_DEDUP_EPS,
            keep: KeepPolicy::default(),
            seed: None,
            strategy: NeighborStrategy::default(),
        }
    }
}

impl FilterOptions {
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    pub fn with_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_scale(mut self, scale: ScaleMode) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_keep(mut self, keep: KeepPolicy, seed: Option<u64>) -> Self {
        self.keep = keep;
        self.seed = seed;
        self
    }

    pub fn with_strategy(mut self, strategy: NeighborStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    /// Kept rows in their original order, all columns.
    pub table: FeatureTable,
    pub kept: Vec<ScenarioId>,
    pub removed: Vec<ScenarioId>,
    /// Sorted row positions of the input table, one list per kept row.
    pub clusters: Vec<Vec<usize>>,
}

impl FilterOutcome {
    fn empty(table: &FeatureTable) -> Self {
        Self { table: table.select_rows(&[]), kept: Vec::new(), removed: Vec::new(), clusters: Vec::new() }
    }
}

fn check_radius(eps: f64) -> Result<()> {
    if eps >= 0.0 {
        Ok(())
    } else {
        Err(DoeError::InvalidRadius { eps })
    }
}

/// Remove near-duplicate rows of `table`.
pub fn filter(table: &FeatureTable, options: &FilterOptions) -> Result<FilterOutcome> {
    profile_scope!("dedup_filter");
    check_radius(options.eps)?;
    let columns = table.select_columns(options.columns.as_deref())?;
    if columns.is_empty() {
        tracing::debug!("no feature columns selected, nothing to filter");
        return Ok(FilterOutcome::empty(table));
    }

    let points = normalize(table, &columns, options.scale);
    let neighbors = options.strategy.find_neighbors(&points, options.eps);
    let order = visitation_order(table.n_rows(), options.keep, options.seed);
    let assignment = {
        profile_scope!("greedy_cover");
        build_clusters(&order, &neighbors)
    };

    let kept_positions = assignment.kept_positions();
    let removed_positions = assignment.removed_positions();
    tracing::debug!(
        rows = table.n_rows(),
        kept = kept_positions.len(),
        removed = removed_positions.len(),
        eps = options.eps,
        scale = %options.scale,
        "deduplication done"
    );

    Ok(FilterOutcome {
        table: table.select_rows(&kept_positions),
        kept: kept_positions.iter().map(|&i| table.id(i)).collect(),
        removed: removed_positions.iter().map(|&i| table.id(i)).collect(),
        clusters: assignment.clusters,
    })
}

/// Every unordered pair of rows within `eps` of each other in normalized
/// space, reported by scenario id. Pairs follow row order: the first
/// element's row precedes the second's, and pairs are sorted by row.
pub fn close_pairs(
    table: &FeatureTable,
    columns: Option<&[String]>,
    scale: ScaleMode,
    eps: f64,
) -> Result<Vec<(ScenarioId, ScenarioId)>> {
    close_pairs_with(table, columns, scale, eps, NeighborStrategy::Auto)
}

pub fn close_pairs_with(
    table: &FeatureTable,
    columns: Option<&[String]>,
    scale: ScaleMode,
    eps: f64,
    strategy: NeighborStrategy,
) -> Result<Vec<(ScenarioId, ScenarioId)>> {
    check_radius(eps)?;
    let columns = table.select_columns(columns)?;
    if columns.is_empty() {
        return Ok(Vec::new());
    }
    let points = normalize(table, &columns, scale);
    let neighbors = strategy.find_neighbors(&points, eps);
    Ok(neighbors
        .iter()
        .enumerate()
        .flat_map(|(i, nb)| nb.iter().filter(move |&&j| j > i).map(move |&j| (i, j)))
        .map(|(i, j)| (table.id(i), table.id(j)))
        .collect())
}
