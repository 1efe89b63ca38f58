//! Shared numeric helpers: NaN-aware column statistics, Pearson correlation
//! and the standard-normal CDF / probit pair used by the Gaussian copula.

use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::SQRT_2;

/// Summary of one numeric column. NaN cells are ignored; `count` is the
/// number of finite-or-infinite (non-NaN) values seen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnStats {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation (divides by `count`).
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl ColumnStats {
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut kept = Vec::new();
        for v in values.into_iter().filter(|v| !v.is_nan()) {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
            kept.push(v);
        }
        if count == 0 {
            return Self { count, mean: f64::NAN, std: f64::NAN, min: f64::NAN, max: f64::NAN };
        }
        if min == max {
            // Flat column: zero spread exactly, whatever the summation rounding.
            return Self { count, mean: min, std: 0.0, min, max };
        }
        let mean = sum / count as f64;
        let var = kept.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count as f64;
        Self { count, mean, std: var.sqrt(), min, max }
    }
}

/// Sample Pearson correlation of two equally long series.
/// Returns NaN when either series has zero variance or fewer than two points.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return f64::NAN;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a[..n].iter().zip(&b[..n]) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    let denom = (var_a * var_b).sqrt();
    if denom == 0.0 {
        f64::NAN
    } else {
        cov / denom
    }
}

/// Standard normal CDF, Φ(z).
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / SQRT_2)
}

/// Inverse standard normal CDF (probit). `p` outside (0, 1) maps to ±∞.
pub fn probit(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }
    -SQRT_2 * erfc_inv(2.0 * p)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_stats_skip_nan() {
        let s = ColumnStats::from_values([1.0, f64::NAN, 3.0]);
        assert_eq!(s.count, 2);
        assert!((s.mean - 2.0).abs() < 1e-12);
        assert!((s.std - 1.0).abs() < 1e-12);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 3.0);
    }

    #[test]
    fn flat_and_empty_columns() {
        let flat = ColumnStats::from_values([0.1; 7]);
        assert_eq!(flat.std, 0.0);
        assert_eq!(flat.mean, 0.1);
        let empty = ColumnStats::from_values([f64::NAN, f64::NAN]);
        assert_eq!(empty.count, 0);
        assert!(empty.std.is_nan());
    }

    #[test]
    fn probit_inverts_cdf() {
        for &p in &[1e-9, 0.01, 0.25, 0.5, 0.8, 0.999] {
            let z = probit(p);
            assert!((normal_cdf(z) - p).abs() < 1e-9, "p={} z={}", p, z);
        }
        assert!(probit(0.5).abs() < 1e-12);
        assert!((normal_cdf(1.959963984540054) - 0.975).abs() < 1e-9);
    }

    #[test]
    fn pearson_of_linear_series() {
        let a: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let b: Vec<f64> = a.iter().map(|x| 3.0 - 2.0 * x).collect();
        assert!((pearson(&a, &a) - 1.0).abs() < 1e-12);
        assert!((pearson(&a, &b) + 1.0).abs() < 1e-12);
        assert!(pearson(&a, &[1.0; 10]).is_nan());
    }
}
