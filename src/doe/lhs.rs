use nalgebra::DMatrix;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::profile_scope;

/// Largest f64 strictly below 1.0.
const BELOW_ONE: f64 = 1.0 - f64::EPSILON / 2.0;

/// Draw an `n × d` Latin Hypercube sample in `[0, 1)^d`.
///
/// Each column is an independent random permutation of the `n` equal-width
/// strata with one uniformly jittered point per stratum, so every column has
/// exactly one value in each bin `[k/n, (k+1)/n)`.
pub fn latin_hypercube<R: Rng + ?Sized>(n: usize, d: usize, rng: &mut R) -> DMatrix<f64> {
    profile_scope!("lhs_draw");
    let mut sample = DMatrix::<f64>::zeros(n, d);
    let mut strata: Vec<usize> = (0..n).collect();
    let width = 1.0 / n as f64;
    for j in 0..d {
        strata.shuffle(rng);
        for (i, &k) in strata.iter().enumerate() {
            let u = (k as f64 + rng.random::<f64>()) * width;
            sample[(i, j)] = u.min(BELOW_ONE);
        }
    }
    sample
}

/// Stratum of a unit-interval value among `n` equal-width bins.
pub fn stratum(u: f64, n: usize) -> usize {
    ((u * n as f64).floor() as usize).min(n.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn every_column_hits_every_stratum_once() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 37;
        let sample = latin_hypercube(n, 4, &mut rng);
        assert_eq!(sample.shape(), (n, 4));
        for j in 0..4 {
            let mut hits = vec![0usize; n];
            for i in 0..n {
                let u = sample[(i, j)];
                assert!((0.0..1.0).contains(&u));
                hits[stratum(u, n)] += 1;
            }
            assert!(hits.iter().all(|&h| h == 1), "column {} hits {:?}", j, hits);
        }
    }

    #[test]
    fn same_seed_same_sample() {
        let a = latin_hypercube(20, 3, &mut StdRng::seed_from_u64(42));
        let b = latin_hypercube(20, 3, &mut StdRng::seed_from_u64(42));
        let c = latin_hypercube(20, 3, &mut StdRng::seed_from_u64(43));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn single_row_and_zero_columns() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(latin_hypercube(1, 2, &mut rng).shape(), (1, 2));
        assert_eq!(latin_hypercube(5, 0, &mut rng).shape(), (5, 0));
    }
}
