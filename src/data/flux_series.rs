use crate::data::sorted_array::SortedArray;
use crate::error::FluxSeriesError;
use crate::types::CowArray1;

use itertools::Itertools;
use ndarray::{Array1, ArrayView1};

/// Minimum number of finite samples a series must have
pub const MIN_FINITE_SAMPLES: usize = 2;

/// Detrended flux time series to search for transits
///
/// `t` is time in days, `flux` is normalized so that unity is the out-of-transit baseline, and
/// `flux_err` is the flux uncertainty. Time must be finite and strictly increasing, while flux
/// and its uncertainty may contain non-finite values: such samples are ignored by every
/// statistic. The series is never mutated by the search.
#[derive(Clone, Debug)]
pub struct FluxSeries<'a> {
    t: CowArray1<'a, f64>,
    flux: CowArray1<'a, f64>,
    flux_err: CowArray1<'a, f64>,
}

impl<'a> FluxSeries<'a> {
    /// Construct [`FluxSeries`] from array-like objects
    ///
    /// Input arrays could be [`ndarray::ArrayView1`], `&[f64]` or `&Vec<f64>`.
    pub fn new(
        t: impl Into<ArrayView1<'a, f64>>,
        flux: impl Into<ArrayView1<'a, f64>>,
        flux_err: impl Into<ArrayView1<'a, f64>>,
    ) -> Result<Self, FluxSeriesError> {
        let t: ArrayView1<'a, f64> = t.into();
        let flux: ArrayView1<'a, f64> = flux.into();
        let flux_err: ArrayView1<'a, f64> = flux_err.into();
        Self::from_cow(t.into(), flux.into(), flux_err.into())
    }

    /// Construct [`FluxSeries`] from time and flux, flux uncertainty is unknown (NaN)
    pub fn new_without_errors(
        t: impl Into<ArrayView1<'a, f64>>,
        flux: impl Into<ArrayView1<'a, f64>>,
    ) -> Result<Self, FluxSeriesError> {
        let t: ArrayView1<'a, f64> = t.into();
        let flux: ArrayView1<'a, f64> = flux.into();
        let flux_err = Array1::from_elem(t.len(), f64::NAN);
        Self::from_cow(t.into(), flux.into(), flux_err.into())
    }

    /// Construct an owning [`FluxSeries`]
    pub fn from_arrays(
        t: Array1<f64>,
        flux: Array1<f64>,
        flux_err: Array1<f64>,
    ) -> Result<FluxSeries<'static>, FluxSeriesError> {
        FluxSeries::from_cow(t.into(), flux.into(), flux_err.into())
    }

    fn from_cow(
        t: CowArray1<'a, f64>,
        flux: CowArray1<'a, f64>,
        flux_err: CowArray1<'a, f64>,
    ) -> Result<Self, FluxSeriesError> {
        if t.len() != flux.len() || t.len() != flux_err.len() {
            return Err(FluxSeriesError::LengthMismatch {
                t: t.len(),
                flux: flux.len(),
                flux_err: flux_err.len(),
            });
        }
        if let Some(index) = t.iter().position(|x| !x.is_finite()) {
            return Err(FluxSeriesError::NonFiniteTime { index });
        }
        if let Some((index, _)) = t
            .iter()
            .tuple_windows()
            .enumerate()
            .find(|(_, (a, b))| a >= b)
        {
            return Err(FluxSeriesError::Unsorted { index: index + 1 });
        }
        let series = Self { t, flux, flux_err };
        let actual = series.iter_finite().count();
        if actual < MIN_FINITE_SAMPLES {
            return Err(FluxSeriesError::ShortTimeSeries {
                actual,
                minimum: MIN_FINITE_SAMPLES,
            });
        }
        Ok(series)
    }

    /// Series length, including non-finite samples
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

    /// Iterator over `(t, flux, flux_err)` of samples with finite flux
    pub fn iter_finite(&self) -> impl Iterator<Item = (f64, f64, f64)> + '_ {
        self.t
            .iter()
            .zip(self.flux.iter())
            .zip(self.flux_err.iter())
            .filter(|((_, m), _)| m.is_finite())
            .map(|((&t, &m), &err)| (t, m, err))
    }

    /// Time of the first and the last finite samples
    pub fn time_range(&self) -> (f64, f64) {
        let (first, last) = self
            .iter_finite()
            .map(|(t, _, _)| t)
            .minmax()
            .into_option()
            .expect("constructor guarantees at least two finite samples");
        (first, last)
    }

    /// Time span between the first and the last finite samples
    pub fn span(&self) -> f64 {
        let (first, last) = self.time_range();
        last - first
    }

    /// Median interval between consequent finite samples
    pub fn cadence(&self) -> f64 {
        let dt: SortedArray = self
            .iter_finite()
            .map(|(t, _, _)| t)
            .tuple_windows()
            .map(|(a, b)| b - a)
            .collect::<Vec<_>>()
            .into();
        dt.median()
    }
}
