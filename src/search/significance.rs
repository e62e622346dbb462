//! Signal detection efficiency of the depth curve
//!
//! Slow trends of the depth curve are removed by a sliding median filter, and the residual is
//! normalized by the local standard deviation:
//! $$
//! \mathrm{SDE}_i = \frac{r_i}{\sigma_{V_i \setminus \{i\}}(r)},
//! \quad r_i = d_i - \mathrm{median}_{W_i}(d),
//! $$
//! where $W_i = [i - h, i + h] \cap [0, N)$ is the median window of half-size $h$ and $V_i$ is
//! the wider noise window, both shrunk at the array edges. The sample itself is excluded from its
//! noise window, and the rest of the window is sigma-clipped, so the peak and its neighbours
//! don't inflate the noise estimate.

use crate::array_stats::{argmax_finite, clipped_std, median};
use crate::error::SearchError;
use crate::params::ScorerParams;

use log::warn;
use ndarray::{Array1, s};
use std::ops::Range;

/// Residuals deviating by more than this number of standard deviations are clipped from the
/// local noise estimate
const CLIP_SIGMA: f64 = 3.0;
const CLIP_ITERATIONS: usize = 5;

/// Significance of every trial period
#[derive(Clone, Debug)]
pub struct Significance {
    /// Depth of the best trial, parts per thousand, positive for the searched polarity
    pub depth_ppt: Array1<f64>,
    /// Depth with the sliding median subtracted
    pub residual: Array1<f64>,
    pub local_std: Array1<f64>,
    pub sde: Array1<f64>,
    /// Index of the maximum SDE
    pub best_index: usize,
    /// Contiguous indices around `best_index` with SDE of at least a half of the maximum
    pub peak: Range<usize>,
    /// Number of periods with zero or non-finite local noise, their SDE is zero
    pub n_degenerate: usize,
}

impl Significance {
    pub fn best_sde(&self) -> f64 {
        self.sde[self.best_index]
    }

    /// Middle of the half-maximum peak
    ///
    /// Depths of neighbouring periods are correlated, so the SDE peak has a flat top and its
    /// maximum could be a few grid steps away from the true period. The grid is uniform in
    /// frequency, so the index midpoint is the frequency midpoint.
    pub fn centre_index(&self) -> usize {
        (self.peak.start + self.peak.end - 1) / 2
    }
}

/// Score the depth curve, depth is relative to the unity baseline
///
/// Periods with degenerate local noise get zero SDE. The error is returned only if all periods
/// are degenerate, so no period could be chosen.
pub fn score(
    depth: impl IntoIterator<Item = f64>,
    params: &ScorerParams,
) -> Result<Significance, SearchError> {
    params.validate()?;
    let depth_ppt: Array1<f64> = depth.into_iter().map(|d| 1e3 * d).collect();
    let n = depth_ppt.len();
    let window = |i: usize, size: usize| {
        let half = size / 2;
        i.saturating_sub(half)..usize::min(n, i + half + 1)
    };

    let residual: Vec<f64> = (0..n)
        .map(|i| {
            let baseline = median(depth_ppt.slice(s![window(i, params.window)]).to_vec());
            depth_ppt[i] - baseline
        })
        .collect();
    let local_std: Vec<f64> = (0..n)
        .map(|i| local_noise(&residual, i, window(i, params.noise_window)))
        .collect();

    let mut n_degenerate = 0;
    let sde: Vec<f64> = residual
        .iter()
        .zip(local_std.iter())
        .map(|(&r, &std)| {
            let sde = r / std;
            if std > 0.0 && sde.is_finite() {
                sde
            } else {
                n_degenerate += 1;
                0.0
            }
        })
        .collect();
    if n_degenerate == n {
        return Err(SearchError::DegenerateStatistic { periods: n });
    }
    if n_degenerate > 0 {
        warn!(
            "Local noise is degenerate for {n_degenerate} of {n} periods, their SDE is set to zero"
        );
    }
    let best_index =
        argmax_finite(&sde).ok_or(SearchError::DegenerateStatistic { periods: n })?;
    let peak = half_maximum(&sde, best_index);

    Ok(Significance {
        depth_ppt,
        residual: residual.into(),
        local_std: local_std.into(),
        sde: sde.into(),
        best_index,
        peak,
        n_degenerate,
    })
}

/// Sigma-clipped standard deviation of the window without its central sample
fn local_noise(residual: &[f64], i: usize, window: Range<usize>) -> f64 {
    let sample: Vec<_> = residual[window.clone()]
        .iter()
        .enumerate()
        .filter(|&(j, _)| window.start + j != i)
        .map(|(_, &r)| r)
        .collect();
    clipped_std(sample, CLIP_SIGMA, CLIP_ITERATIONS)
}

fn half_maximum(sde: &[f64], best_index: usize) -> Range<usize> {
    let half = 0.5 * sde[best_index];
    let start = sde[..best_index]
        .iter()
        .rposition(|&x| x < half)
        .map_or(0, |j| j + 1);
    let end = sde[best_index..]
        .iter()
        .position(|&x| x < half)
        .map_or(sde.len(), |j| best_index + j);
    start..end
}
