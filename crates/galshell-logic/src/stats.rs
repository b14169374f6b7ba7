//! Small statistics toolkit for Monte Carlo output.
//!
//! Quantiles use linear interpolation between order statistics (position
//! `(n − 1)·q`), which is what most numeric libraries default to.

use serde::{Deserialize, Serialize};

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n − 1 denominator).
pub fn std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Standard error of the mean.
pub fn std_error(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    std_dev(values) / (values.len() as f64).sqrt()
}

/// Quantile of already-sorted data.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Several quantiles at once (sorts a copy).
pub fn quantiles(values: &[f64], levels: &[f64]) -> Vec<f64> {
    let sorted = sorted_copy(values);
    levels.iter().map(|&q| quantile_sorted(&sorted, q)).collect()
}

pub fn median(values: &[f64]) -> f64 {
    quantile_sorted(&sorted_copy(values), 0.5)
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Quantiles plus mean and median of one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub quantiles: Vec<f64>,
    pub mean: f64,
    pub median: f64,
}

pub fn summarize(values: &[f64], levels: &[f64]) -> Summary {
    let sorted = sorted_copy(values);
    Summary {
        quantiles: levels.iter().map(|&q| quantile_sorted(&sorted, q)).collect(),
        mean: mean(values),
        median: quantile_sorted(&sorted, 0.5),
    }
}

// ============================================================================
// KOLMOGOROV–SMIRNOV
// ============================================================================

/// One-sample KS statistic of `values` against U(0, 1). Sorts in place.
pub fn ks_uniform_statistic(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    let n = values.len() as f64;
    values
        .iter()
        .enumerate()
        .map(|(i, &u)| {
            let cdf = u.clamp(0.0, 1.0);
            let above = (i as f64 + 1.0) / n - cdf;
            let below = cdf - i as f64 / n;
            above.max(below)
        })
        .fold(0.0, f64::max)
}

/// Asymptotic KS critical value at significance `alpha`.
pub fn ks_critical_value(n: usize, alpha: f64) -> f64 {
    let c = (-0.5 * (alpha / 2.0).ln()).sqrt();
    c / (n as f64).sqrt()
}
