use crate::error::SearchError;

use conv::{ConvAsUtil, RoundToZero};
use ndarray::{Array1, ArrayView1};

/// Minimum number of trial periods
pub const MIN_PERIODS: usize = 3;

/// Trial periods on a uniform frequency grid
///
/// Frequencies are $\{f_\mathrm{max} - k \Delta f\}$ for $k = 0 \dots N - 1$, where
/// $f_\mathrm{max} = 1 / P_\mathrm{min}$ and the last frequency is not smaller than
/// $1 / P_\mathrm{max}$. Periods are stored in increasing order, so the grid density decreases
/// with period as $P^{-2}$.
#[derive(Clone, Debug)]
pub struct PeriodGrid {
    periods: Array1<f64>,
    frequency_step: f64,
}

impl PeriodGrid {
    pub fn frequency_uniform(
        min_period: f64,
        max_period: f64,
        frequency_step: f64,
    ) -> Result<Self, SearchError> {
        if !(min_period > 0.0 && min_period < max_period && max_period.is_finite()) {
            return Err(SearchError::InvalidPeriodRange {
                min: min_period,
                max: max_period,
            });
        }
        if !(frequency_step.is_finite() && frequency_step > 0.0) {
            return Err(SearchError::invalid_parameter(
                "frequency_step",
                format!("must be finite and positive, got {frequency_step}"),
            ));
        }
        let max_freq = min_period.recip();
        let min_freq = max_period.recip();
        let size: usize = ((max_freq - min_freq) / frequency_step)
            .approx_by::<RoundToZero>()
            .map_err(|err| {
                SearchError::invalid_parameter("frequency_step", format!("{err:?}"))
            })?;
        let size = size + 1;
        if size < MIN_PERIODS {
            return Err(SearchError::TooFewPeriods {
                actual: size,
                minimum: MIN_PERIODS,
            });
        }
        let periods = (0..size)
            .map(|k| (max_freq - frequency_step * k as f64).recip())
            .collect();
        Ok(Self {
            periods,
            frequency_step,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn periods(&self) -> ArrayView1<'_, f64> {
        self.periods.view()
    }

    #[inline]
    pub fn get(&self, i: usize) -> f64 {
        self.periods[i]
    }

    pub fn frequency_step(&self) -> f64 {
        self.frequency_step
    }

    /// Local distance between neighbouring periods, $P^2 \Delta f$
    pub fn period_step(&self, i: usize) -> f64 {
        self.periods[i].powi(2) * self.frequency_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use itertools::Itertools;

    #[test]
    fn periods_are_positive_and_increasing() {
        let grid = PeriodGrid::frequency_uniform(0.5, 8.0, 1.0 / 1024.0).unwrap();
        assert!(grid.periods().iter().all(|&p| p > 0.0));
        assert!(grid.periods().iter().tuple_windows().all(|(a, b)| a < b));
        assert_relative_eq!(grid.get(0), 0.5);
        assert_relative_eq!(grid.get(grid.len() - 1), 8.0);
        assert_eq!(grid.len(), 1921);
    }

    #[test]
    fn frequencies_are_uniform() {
        let grid = PeriodGrid::frequency_uniform(1.0, 4.0, 0.01).unwrap();
        for (a, b) in grid.periods().iter().tuple_windows() {
            assert_relative_eq!(a.recip() - b.recip(), 0.01, max_relative = 1e-9);
        }
    }

    #[test]
    fn too_few_periods() {
        assert_eq!(
            PeriodGrid::frequency_uniform(1.0, 1.01, 0.1).unwrap_err(),
            SearchError::TooFewPeriods {
                actual: 1,
                minimum: MIN_PERIODS
            }
        );
    }

    #[test]
    fn invalid_period_range() {
        assert!(matches!(
            PeriodGrid::frequency_uniform(2.0, 1.0, 0.1),
            Err(SearchError::InvalidPeriodRange { .. })
        ));
    }
}
