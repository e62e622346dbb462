//! Multi-resolution rebinning of the flux series
//!
//! Binning the series to bins with width $\mathrm{duration} / \mathrm{oversampling}$ keeps the
//! number of bins across any trial transit window approximately constant, so trial evaluation
//! cost doesn't depend on the native cadence. $j$-th bin of a level contains finite samples with
//! $t_0 + j w \le t < t_0 + (j + 1) w$, where $t_0$ is the time of the first finite sample, and
//! is described by
//! $$
//! t_j^* = \frac{\sum t_i}{N_j},\quad
//! m_j^* = \frac{\sum m_i}{N_j},\quad
//! \delta_j^* = \frac{\sqrt{\sum \delta_i^2}}{N_j}.
//! $$

use crate::data::FluxSeries;
use crate::error::SearchError;
use crate::params::RebinParams;

use itertools::Itertools;
use log::debug;
use ndarray::{Array1, ArrayView1, ArrayViewMut1};
use unzip3::Unzip3;

/// Rebinned copy of the flux series tuned to a single trial duration
#[derive(Clone, Debug, PartialEq)]
pub struct ResolutionLevel {
    duration: f64,
    bin_width: f64,
    t: Array1<f64>,
    flux: Array1<f64>,
    flux_err: Array1<f64>,
}

impl ResolutionLevel {
    fn from_series(series: &FluxSeries, duration: f64, bin_width: f64) -> Self {
        let (t0, _) = series.time_range();
        let (t, flux, flux_err): (Vec<_>, Vec<_>, Vec<_>) = series
            .iter_finite()
            .chunk_by(|(t, _, _)| ((*t - t0) / bin_width).floor())
            .into_iter()
            .map(|(_, chunk)| {
                let (n, sum_t, sum_m, sum_err2) = chunk.fold(
                    (0.0, 0.0, 0.0, 0.0),
                    |(n, sum_t, sum_m, sum_err2), (t, m, err)| {
                        (n + 1.0, sum_t + t, sum_m + m, sum_err2 + err * err)
                    },
                );
                (sum_t / n, sum_m / n, f64::sqrt(sum_err2) / n)
            })
            .filter(|(t, m, _)| t.is_finite() && m.is_finite())
            .unzip3();
        Self {
            duration,
            bin_width,
            t: t.into(),
            flux: flux.into(),
            flux_err: flux_err.into(),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_arrays(duration: f64, t: Vec<f64>, flux: Vec<f64>) -> Self {
        let flux_err = vec![f64::NAN; t.len()];
        Self {
            duration,
            bin_width: duration,
            t: t.into(),
            flux: flux.into(),
            flux_err: flux_err.into(),
        }
    }

    /// Trial duration this level is tuned to, days
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.t.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn t(&self) -> ArrayView1<'_, f64> {
        self.t.view()
    }

    pub fn flux(&self) -> ArrayView1<'_, f64> {
        self.flux.view()
    }

    pub fn flux_err(&self) -> ArrayView1<'_, f64> {
        self.flux_err.view()
    }

    /// Time and flux for in-place signal subtraction
    pub(crate) fn t_flux_mut(&mut self) -> (ArrayView1<'_, f64>, ArrayViewMut1<'_, f64>) {
        (self.t.view(), self.flux.view_mut())
    }
}

/// Resolution levels ordered by increasing duration
#[derive(Clone, Debug)]
pub struct ResolutionLevels {
    levels: Vec<ResolutionLevel>,
    /// Midpoints between neighbouring level durations
    boundaries: Vec<f64>,
}

impl ResolutionLevels {
    /// Rebin the series for trial durations from `min_duration` to `max_duration`, days
    pub fn build(
        series: &FluxSeries,
        min_duration: f64,
        max_duration: f64,
        params: &RebinParams,
    ) -> Result<Self, SearchError> {
        params.validate()?;
        if !(min_duration > 0.0 && min_duration <= max_duration && max_duration.is_finite()) {
            return Err(SearchError::invalid_parameter(
                "duration_range",
                format!("invalid trial duration range [{min_duration}, {max_duration}]"),
            ));
        }
        let durations = level_durations(min_duration, max_duration, params.n_levels);
        let levels: Vec<_> = durations
            .iter()
            .map(|&duration| {
                ResolutionLevel::from_series(series, duration, duration / params.oversampling)
            })
            .collect();
        for (i, level) in levels.iter().enumerate() {
            debug!(
                "Resolution level {i}: duration {:.3} h, {} bins",
                level.duration * 24.0,
                level.len()
            );
        }
        Ok(Self::from_levels(levels))
    }

    pub(crate) fn from_levels(levels: Vec<ResolutionLevel>) -> Self {
        let boundaries = levels
            .iter()
            .tuple_windows()
            .map(|(a, b)| 0.5 * (a.duration + b.duration))
            .collect();
        Self { levels, boundaries }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn get(&self, i: usize) -> &ResolutionLevel {
        &self.levels[i]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolutionLevel> {
        self.levels.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut ResolutionLevel> {
        self.levels.iter_mut()
    }

    /// Index of the level with the duration closest to the given one
    #[inline]
    pub fn level_for_duration(&self, duration: f64) -> usize {
        self.boundaries.partition_point(|&boundary| boundary < duration)
    }
}

fn level_durations(min_duration: f64, max_duration: f64, n_levels: usize) -> Vec<f64> {
    if n_levels == 1 {
        return vec![0.5 * (min_duration + max_duration)];
    }
    Array1::linspace(min_duration, max_duration, n_levels).to_vec()
}
