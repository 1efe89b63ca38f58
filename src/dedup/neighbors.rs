//! Fixed-radius neighbor search in normalized feature space.
//!
//! Every strategy returns, for each point, the sorted indices of all points
//! whose squared Euclidean distance is `<= radius²` (the point itself
//! included unless it has a NaN coordinate). All strategies share the same
//! distance predicate, so their outputs are identical; the indexes only
//! prune work.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::ops::Range;

use super::normalize::Points;
use crate::config::{
    BRUTE_FORCE_MAX_ROWS, CELL_GRID_MAX_DIM, CELL_MIN_RELATIVE_RADIUS, CELL_PADDING,
    KD_LEAF_CAPACITY,
};
use crate::profile_scope;

pub type Neighborhood = SmallVec<[usize; 8]>;

/// Capability shared by all neighbor-search strategies.
pub trait NeighborSearch {
    fn find_neighbors(&self, points: &Points, radius: f64) -> Vec<Neighborhood>;
}

#[inline]
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[inline]
fn within(a: &[f64], b: &[f64], radius_sq: f64) -> bool {
    squared_distance(a, b) <= radius_sq
}

/// All-pairs scan. Reference implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForce;

impl NeighborSearch for BruteForce {
    fn find_neighbors(&self, points: &Points, radius: f64) -> Vec<Neighborhood> {
        let radius_sq = radius * radius;
        (0..points.len())
            .map(|i| {
                let q = points.row(i);
                (0..points.len()).filter(|&j| within(q, points.row(j), radius_sq)).collect()
            })
            .collect()
    }
}

// ====================
// k-d tree
// ====================

#[derive(Debug, Clone)]
struct KdNode {
    points: Range<usize>,
    axis: usize,
    split: f64,
    children: Option<(usize, usize)>,
}

/// Flat-array k-d tree over a borrowed point set. Interior nodes split at the
/// median of their widest axis; leaves hold up to `leaf_capacity` points
/// (more when all their points coincide).
pub struct KdIndex<'a> {
    points: &'a Points,
    order: Vec<usize>,
    nodes: Vec<KdNode>,
    leaf_capacity: usize,
}

impl<'a> KdIndex<'a> {
    pub const ROOT: usize = 0;

    pub fn build(points: &'a Points, leaf_capacity: usize) -> Self {
        profile_scope!("kd_build");
        let mut index = Self {
            points,
            order: (0..points.len()).collect(),
            nodes: Vec::with_capacity(2 * points.len() / leaf_capacity.max(1) + 1),
            leaf_capacity: leaf_capacity.max(1),
        };
        index.build_node(0..points.len());
        index
    }

    fn build_node(&mut self, range: Range<usize>) -> usize {
        let node = self.nodes.len();
        self.nodes.push(KdNode { points: range.clone(), axis: 0, split: 0.0, children: None });
        if range.len() <= self.leaf_capacity {
            return node;
        }
        let Some(axis) = self.widest_axis(range.clone()) else {
            return node;
        };

        let mid = range.start + range.len() / 2;
        let points = self.points;
        self.order[range.clone()].select_nth_unstable_by(mid - range.start, |&a, &b| {
            points.row(a)[axis].total_cmp(&points.row(b)[axis])
        });
        let split = points.row(self.order[mid])[axis];

        let left = self.build_node(range.start..mid);
        let right = self.build_node(mid..range.end);
        let n = &mut self.nodes[node];
        n.axis = axis;
        n.split = split;
        n.children = Some((left, right));
        node
    }

    /// Axis with the largest coordinate spread, or None when every axis is flat.
    fn widest_axis(&self, range: Range<usize>) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for axis in 0..self.points.dim() {
            let (lo, hi) = self.order[range.clone()].iter().fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), &i| {
                    let x = self.points.row(i)[axis];
                    (lo.min(x), hi.max(x))
                },
            );
            let spread = hi - lo;
            if spread > 0.0 && best.map_or(true, |(_, s)| spread > s) {
                best = Some((axis, spread));
            }
        }
        best.map(|(axis, _)| axis)
    }

    /// Indices of all points within `radius` of `query`, sorted.
    pub fn query(&self, query: &[f64], radius: f64) -> Neighborhood {
        let radius_sq = radius * radius;
        let mut out = Neighborhood::new();
        if self.nodes.is_empty() {
            return out;
        }
        let mut stack: SmallVec<[usize; 32]> = SmallVec::new();
        stack.push(Self::ROOT);
        while let Some(n) = stack.pop() {
            let node = &self.nodes[n];
            match node.children {
                None => {
                    for &i in &self.order[node.points.clone()] {
                        if within(query, self.points.row(i), radius_sq) {
                            out.push(i);
                        }
                    }
                }
                Some((left, right)) => {
                    // Left holds coordinates <= split, right >= split.
                    let diff = query[node.axis] - node.split;
                    let gap_sq = diff * diff;
                    if !(diff > 0.0 && gap_sq > radius_sq) {
                        stack.push(left);
                    }
                    if !(diff < 0.0 && gap_sq > radius_sq) {
                        stack.push(right);
                    }
                }
            }
        }
        out.sort_unstable();
        out
    }
}

/// k-d tree strategy: build once, query every point.
#[derive(Debug, Clone, Copy)]
pub struct KdTree {
    pub leaf_capacity: usize,
}

impl Default for KdTree {
    fn default() -> Self {
        Self { leaf_capacity: KD_LEAF_CAPACITY }
    }
}

impl NeighborSearch for KdTree {
    fn find_neighbors(&self, points: &Points, radius: f64) -> Vec<Neighborhood> {
        let index = KdIndex::build(points, self.leaf_capacity);
        (0..points.len()).map(|i| index.query(points.row(i), radius)).collect()
    }
}

// ====================
// Cell grid
// ====================

type CellKey = SmallVec<[i64; 4]>;

/// Uniform hashed grid with cells as wide as the radius; a query scans the
/// cells overlapping its (slightly padded) window, at most 3^d of them.
/// A zero radius buckets points by exact coordinates instead.
pub struct CellGridIndex<'a> {
    points: &'a Points,
    cell_size: f64,
    cells: HashMap<CellKey, Vec<usize>>,
}

impl<'a> CellGridIndex<'a> {
    pub fn build(points: &'a Points, radius: f64) -> Self {
        profile_scope!("cell_grid_build");
        let mut cells: HashMap<CellKey, Vec<usize>> = HashMap::new();
        for i in 0..points.len() {
            cells.entry(Self::key(points.row(i), radius)).or_default().push(i);
        }
        Self { points, cell_size: radius, cells }
    }

    fn coord(x: f64, cell_size: f64) -> i64 {
        // `as` saturates and maps NaN to 0; the distance check still decides.
        (x / cell_size).floor() as i64
    }

    fn key(row: &[f64], cell_size: f64) -> CellKey {
        if cell_size == 0.0 {
            // Adding 0.0 folds -0.0 into +0.0 so equal coordinates share a key.
            row.iter().map(|&x| (x + 0.0).to_bits() as i64).collect()
        } else {
            row.iter().map(|&x| Self::coord(x, cell_size)).collect()
        }
    }

    /// Whether cell coordinates can resolve `radius` at this data scale.
    pub fn resolvable(points: &Points, radius: f64) -> bool {
        radius == 0.0 || radius > points.max_abs() * CELL_MIN_RELATIVE_RADIUS
    }

    pub fn query(&self, query: &[f64], radius: f64) -> Neighborhood {
        let radius_sq = radius * radius;
        let mut out = Neighborhood::new();
        let visit = |bucket: &Vec<usize>, out: &mut Neighborhood| {
            for &i in bucket {
                if within(query, self.points.row(i), radius_sq) {
                    out.push(i);
                }
            }
        };

        if self.cell_size == 0.0 {
            if let Some(bucket) = self.cells.get(&Self::key(query, 0.0)) {
                visit(bucket, &mut out);
            }
            out.sort_unstable();
            return out;
        }

        let reach = radius * CELL_PADDING;
        let bounds: SmallVec<[(i64, i64); 4]> = query
            .iter()
            .map(|&x| (Self::coord(x - reach, self.cell_size), Self::coord(x + reach, self.cell_size)))
            .collect();
        let mut key: CellKey = bounds.iter().map(|&(lo, _)| lo).collect();
        // Odometer over the box of cells [lo, hi] per axis.
        loop {
            if let Some(bucket) = self.cells.get(&key) {
                visit(bucket, &mut out);
            }
            let mut axis = 0;
            loop {
                if axis == key.len() {
                    out.sort_unstable();
                    return out;
                }
                if key[axis] < bounds[axis].1 {
                    key[axis] += 1;
                    break;
                }
                key[axis] = bounds[axis].0;
                axis += 1;
            }
        }
    }
}

/// Cell-grid strategy. Falls back to the k-d tree when the radius is too
/// small relative to the coordinates for cell indices to be reliable.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellGrid;

impl NeighborSearch for CellGrid {
    fn find_neighbors(&self, points: &Points, radius: f64) -> Vec<Neighborhood> {
        if !CellGridIndex::resolvable(points, radius) {
            tracing::debug!(radius, "radius below cell resolution, using k-d tree");
            return KdTree::default().find_neighbors(points, radius);
        }
        let index = CellGridIndex::build(points, radius);
        (0..points.len()).map(|i| index.query(points.row(i), radius)).collect()
    }
}

// ====================
// Strategy selection
// ====================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeighborStrategy {
    /// Pick by input size, dimension and radius.
    #[default]
    Auto,
    BruteForce,
    KdTree,
    CellGrid,
}

impl NeighborStrategy {
    /// The concrete strategy `Auto` stands for on this input.
    pub fn resolve(self, points: &Points, radius: f64) -> NeighborStrategy {
        match self {
            NeighborStrategy::Auto => {
                if points.len() <= BRUTE_FORCE_MAX_ROWS {
                    NeighborStrategy::BruteForce
                } else if points.dim() <= CELL_GRID_MAX_DIM
                    && radius > 0.0
                    && CellGridIndex::resolvable(points, radius)
                {
                    NeighborStrategy::CellGrid
                } else {
                    NeighborStrategy::KdTree
                }
            }
            other => other,
        }
    }
}

impl NeighborSearch for NeighborStrategy {
    fn find_neighbors(&self, points: &Points, radius: f64) -> Vec<Neighborhood> {
        profile_scope!("neighbor_search");
        let strategy = self.resolve(points, radius);
        tracing::debug!(?strategy, rows = points.len(), dim = points.dim(), radius, "neighbor search");
        match strategy {
            NeighborStrategy::BruteForce | NeighborStrategy::Auto => {
                BruteForce.find_neighbors(points, radius)
            }
            NeighborStrategy::KdTree => KdTree::default().find_neighbors(points, radius),
            NeighborStrategy::CellGrid => CellGrid.find_neighbors(points, radius),
        }
    }
}
