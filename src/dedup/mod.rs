/// Near-duplicate filtering of sampled scenarios
///
/// Scenarios are flattened into a numeric feature table, normalized per
/// column, and reduced to one representative per `eps`-neighborhood.

pub mod cluster;
pub mod filter;
pub mod neighbors;
pub mod normalize;
pub mod table;

pub use cluster::{build_clusters, visitation_order, ClusterAssignment, KeepPolicy};
pub use filter::{close_pairs, close_pairs_with, filter, FilterOptions, FilterOutcome};
pub use neighbors::{BruteForce, CellGrid, KdTree, NeighborSearch, NeighborStrategy, Neighborhood};
pub use normalize::{normalize, Points, ScaleMode};
pub use table::{FeatureTable, ScenarioId};
