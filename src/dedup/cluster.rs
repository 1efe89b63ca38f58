use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::neighbors::Neighborhood;
use crate::error::{DoeError, Result};

/// Which row represents a cluster: the earliest in table order, or the first
/// reached in a shuffled visitation order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeepPolicy {
    #[default]
    First,
    Random,
}

impl FromStr for KeepPolicy {
    type Err = DoeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "first" => Ok(KeepPolicy::First),
            "random" => Ok(KeepPolicy::Random),
            other => Err(DoeError::UnsupportedKeepPolicy { policy: other.to_string() }),
        }
    }
}

impl fmt::Display for KeepPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeepPolicy::First => write!(f, "first"),
            KeepPolicy::Random => write!(f, "random"),
        }
    }
}

/// Order in which rows are considered as cluster representatives.
pub fn visitation_order(n: usize, policy: KeepPolicy, seed: Option<u64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    if policy == KeepPolicy::Random {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        order.shuffle(&mut rng);
    }
    order
}

/// Result of greedy cover clustering over `n` rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterAssignment {
    pub kept: Vec<bool>,
    pub removed: Vec<bool>,
    /// One entry per kept row, in visitation order; sorted row positions.
    pub clusters: Vec<Vec<usize>>,
}

impl ClusterAssignment {
    pub fn kept_positions(&self) -> Vec<usize> {
        positions(&self.kept)
    }

    pub fn removed_positions(&self) -> Vec<usize> {
        positions(&self.removed)
    }
}

fn positions(mask: &[bool]) -> Vec<usize> {
    mask.iter().enumerate().filter(|(_, &b)| b).map(|(i, _)| i).collect()
}

/// Greedy cover: each row not yet claimed becomes a representative and claims
/// itself plus every unclaimed neighbor. Clusters partition the rows.
pub fn build_clusters(order: &[usize], neighbors: &[Neighborhood]) -> ClusterAssignment {
    let n = neighbors.len();
    let mut seen = vec![false; n];
    let mut kept = vec![false; n];
    let mut removed = vec![false; n];
    let mut clusters = Vec::new();

    for &i in order {
        if seen[i] {
            continue;
        }
        seen[i] = true;
        kept[i] = true;
        let mut members = vec![i];
        for &j in &neighbors[i] {
            if !seen[j] {
                seen[j] = true;
                removed[j] = true;
                members.push(j);
            }
        }
        members.sort_unstable();
        clusters.push(members);
    }

    ClusterAssignment { kept, removed, clusters }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    // Three colinear rows A, B, C where A-B and B-C are close but A-C is not.
    fn chain() -> Vec<Neighborhood> {
        vec![smallvec![0, 1], smallvec![0, 1, 2], smallvec![1, 2]]
    }

    #[test]
    fn forward_order_keeps_first_of_each_cluster() {
        let a = build_clusters(&[0, 1, 2], &chain());
        assert_eq!(a.kept_positions(), vec![0, 2]);
        assert_eq!(a.removed_positions(), vec![1]);
        assert_eq!(a.clusters, vec![vec![0, 1], vec![2]]);
    }

    #[test]
    fn reverse_order_mirrors_the_result() {
        let a = build_clusters(&[2, 1, 0], &chain());
        assert_eq!(a.kept_positions(), vec![0, 2]);
        assert_eq!(a.clusters, vec![vec![1, 2], vec![0]]);
    }

    #[test]
    fn middle_first_claims_everything() {
        let a = build_clusters(&[1, 0, 2], &chain());
        assert_eq!(a.kept_positions(), vec![1]);
        assert_eq!(a.removed_positions(), vec![0, 2]);
        assert_eq!(a.clusters, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn kept_and_removed_partition_rows() {
        let neighbors: Vec<Neighborhood> = vec![smallvec![0, 3], smallvec![1], smallvec![2, 3], smallvec![0, 2, 3]];
        let a = build_clusters(&visitation_order(4, KeepPolicy::First, None), &neighbors);
        for i in 0..4 {
            assert!(a.kept[i] ^ a.removed[i]);
        }
        let mut members: Vec<usize> = a.clusters.iter().flatten().copied().collect();
        members.sort_unstable();
        assert_eq!(members, vec![0, 1, 2, 3]);
    }

    #[test]
    fn empty_neighborhoods_make_singletons() {
        let neighbors: Vec<Neighborhood> = vec![smallvec![], smallvec![1]];
        let a = build_clusters(&[0, 1], &neighbors);
        assert_eq!(a.kept_positions(), vec![0, 1]);
        assert_eq!(a.clusters, vec![vec![0], vec![1]]);
    }

    #[test]
    fn random_order_is_a_seeded_permutation() {
        let a = visitation_order(30, KeepPolicy::Random, Some(5));
        let b = visitation_order(30, KeepPolicy::Random, Some(5));
        assert_eq!(a, b);
        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..30).collect::<Vec<_>>());
        assert_eq!(visitation_order(4, KeepPolicy::First, Some(5)), vec![0, 1, 2, 3]);
    }

    #[test]
    fn parses_policies() {
        assert_eq!("random".parse::<KeepPolicy>().unwrap(), KeepPolicy::Random);
        assert!(matches!("last".parse::<KeepPolicy>(), Err(DoeError::UnsupportedKeepPolicy { .. })));
    }
}
