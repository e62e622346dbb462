//! Simple array statistics used by the significance scorer

use crate::data::SortedArray;

/// Find the index of the maximum finite element of an array
///
/// Non-finite values are skipped, `None` is returned if there are no finite values. The first
/// index is returned for ties.
pub fn argmax_finite(arr: &[f64]) -> Option<usize> {
    arr.iter()
        .enumerate()
        .filter(|(_, x)| x.is_finite())
        .fold(None, |acc: Option<(usize, f64)>, (idx, &val)| match acc {
            Some((_, max_val)) if val <= max_val => acc,
            _ => Some((idx, val)),
        })
        .map(|(idx, _)| idx)
}

/// Median of a non-empty sample
pub fn median(sample: Vec<f64>) -> f64 {
    SortedArray::from(sample).median()
}

/// Unbiased standard deviation of a sample, NaN for fewer than two values
pub fn sample_std(sample: &[f64]) -> f64 {
    let n = sample.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean = sample.iter().sum::<f64>() / n as f64;
    let sum_sq: f64 = sample.iter().map(|x| (x - mean).powi(2)).sum();
    f64::sqrt(sum_sq / (n - 1) as f64)
}

/// Standard deviation after iterative sigma clipping
///
/// Values deviating from the mean by more than `n_sigma` standard deviations are dropped and the
/// statistics are recomputed, until nothing is dropped or `max_iterations` is reached.
pub fn clipped_std(mut sample: Vec<f64>, n_sigma: f64, max_iterations: usize) -> f64 {
    for _ in 0..max_iterations {
        let std = sample_std(&sample);
        if !std.is_finite() {
            return std;
        }
        let mean = sample.iter().sum::<f64>() / sample.len() as f64;
        let n_before = sample.len();
        sample.retain(|x| f64::abs(x - mean) <= n_sigma * std);
        if sample.len() == n_before {
            return std;
        }
    }
    sample_std(&sample)
}
