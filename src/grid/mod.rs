//! Trial grid of the transit search
//!
//! The grid is three-level: periods on a uniform frequency grid, log-spaced duty cycles for each
//! period centred on the duty cycle of a central transit for the assumed stellar density, and
//! uniformly spaced epochs for each period and duty cycle.

use crate::data::FluxSeries;
use crate::error::SearchError;
use crate::params::GridParams;

use conv::{ConvAsUtil, RoundToZero};
use log::debug;
use ndarray::{Array1, ArrayView1};

mod period;
pub use period::{MIN_PERIODS, PeriodGrid};

pub mod stellar;
use stellar::{SOLAR_DENSITY, density_invariant_duty_cycle, period_for_semi_major_axis_ratio};

/// Shortest resolvable trial duration in units of cadence
pub const MIN_CADENCES_PER_DURATION: f64 = 2.0;

/// Longest trial duty cycle
pub const MAX_DUTY_CYCLE: f64 = 0.25;

/// Default minimum period corresponds to this semi-major axis in stellar radii
const MIN_SEMI_MAJOR_AXIS_RATIO: f64 = 2.0;

/// Default minimum period is not shorter than this number of cadences
const MIN_PERIOD_CADENCES: f64 = 4.0;

/// Default maximum period is the time span divided by this number
const MIN_TRANSITS: f64 = 2.0;

const HOURS_PER_DAY: f64 = 24.0;

/// Duty cycle and its epoch grid
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DutyCycleTrials {
    /// Transit duration relative to the period
    pub duty_cycle: f64,
    /// Number of epochs uniformly covering one period
    pub n_epochs: usize,
}

impl DutyCycleTrials {
    /// Epoch step in phase units
    #[inline]
    pub fn epoch_step(&self) -> f64 {
        (self.n_epochs as f64).recip()
    }

    /// Epochs in phase units, $[0, 1)$
    #[inline]
    pub fn epoch_phases(&self) -> impl Iterator<Item = f64> + use<> {
        let step = self.epoch_step();
        (0..self.n_epochs).map(move |k| k as f64 * step)
    }

    /// Epochs as time offsets covering one period, days
    pub fn epochs(&self, period: f64) -> Array1<f64> {
        self.epoch_phases().map(|phase| phase * period).collect()
    }

    pub fn duration(&self, period: f64) -> f64 {
        self.duty_cycle * period
    }
}

/// Trial coordinates of the transit search
#[derive(Clone, Debug)]
pub struct TrialGrid {
    periods: PeriodGrid,
    duty_cycles: Vec<Vec<DutyCycleTrials>>,
    cadence: f64,
}

impl TrialGrid {
    /// Build the grid for a time series
    pub fn from_series(series: &FluxSeries, params: &GridParams) -> Result<Self, SearchError> {
        let cadence = params.cadence.unwrap_or_else(|| series.cadence());
        Self::new(series.span(), cadence, params)
    }

    /// Build the grid for a given time span and cadence, both in days
    pub fn new(span: f64, cadence: f64, params: &GridParams) -> Result<Self, SearchError> {
        params.validate()?;
        if !(span.is_finite() && span > 0.0) {
            return Err(SearchError::invalid_parameter(
                "span",
                format!("time span must be finite and positive, got {span}"),
            ));
        }
        if !(cadence.is_finite() && cadence > 0.0) {
            return Err(SearchError::invalid_parameter(
                "cadence",
                format!("must be finite and positive, got {cadence}"),
            ));
        }
        let density = params.stellar_density.unwrap_or(SOLAR_DENSITY);

        let shortest_resolvable = MIN_CADENCES_PER_DURATION * cadence;
        let min_duration = match params.min_duration_hours {
            Some(hours) if hours / HOURS_PER_DAY < shortest_resolvable => {
                return Err(SearchError::UnresolvableDuration {
                    duration_hours: hours,
                    cadence_hours: cadence * HOURS_PER_DAY,
                    minimum_cadences: MIN_CADENCES_PER_DURATION,
                });
            }
            Some(hours) => hours / HOURS_PER_DAY,
            None => shortest_resolvable,
        };
        let max_duration = params
            .max_duration_hours
            .map_or(f64::INFINITY, |hours| hours / HOURS_PER_DAY);

        let min_period = params.min_period.unwrap_or_else(|| {
            f64::max(
                period_for_semi_major_axis_ratio(MIN_SEMI_MAJOR_AXIS_RATIO, density),
                MIN_PERIOD_CADENCES * cadence,
            )
        });
        let max_period = params.max_period.unwrap_or(span / MIN_TRANSITS);

        // (low, central, high) duty cycles clipped to the feasible range
        let duty_cycle_range = |period: f64| -> Result<(f64, f64, f64), SearchError> {
            let floor = min_duration / period;
            let ceil = f64::min(MAX_DUTY_CYCLE, max_duration / period);
            if floor > ceil {
                return Err(SearchError::UnresolvableDuration {
                    duration_hours: ceil * period * HOURS_PER_DAY,
                    cadence_hours: cadence * HOURS_PER_DAY,
                    minimum_cadences: MIN_CADENCES_PER_DURATION,
                });
            }
            let center = density_invariant_duty_cycle(period, density);
            let low = center * 10_f64.powf(-params.log_spread_low);
            let high = center * 10_f64.powf(params.log_spread_high);
            Ok((
                low.clamp(floor, ceil),
                center.clamp(floor, ceil),
                high.clamp(floor, ceil),
            ))
        };

        // The phase drift between neighbouring periods accumulated over the time span must be
        // a fraction of the central duration at the longest period
        let (_, reference_duty_cycle, _) = duty_cycle_range(max_period)?;
        let frequency_step = reference_duty_cycle / (params.oversampling * span);
        let periods = PeriodGrid::frequency_uniform(min_period, max_period, frequency_step)?;

        let duty_cycles = periods
            .periods()
            .iter()
            .map(|&period| {
                let (low, _, high) = duty_cycle_range(period)?;
                log_space(low, high, params.n_duty_cycles)
                    .map(|duty_cycle| {
                        let n_epochs = epoch_count(
                            period,
                            duty_cycle,
                            cadence,
                            params.epoch_duration_fraction,
                        )?;
                        Ok(DutyCycleTrials {
                            duty_cycle,
                            n_epochs,
                        })
                    })
                    .collect::<Result<Vec<_>, SearchError>>()
            })
            .collect::<Result<Vec<_>, SearchError>>()?;

        let grid = Self {
            periods,
            duty_cycles,
            cadence,
        };
        debug!(
            "Trial grid: {} periods in [{:.4}, {:.4}] days, {} trials in total",
            grid.periods.len(),
            grid.periods.get(0),
            grid.periods.get(grid.periods.len() - 1),
            grid.n_trials(),
        );
        Ok(grid)
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
        self.periods.periods()
    }

    #[inline]
    pub fn period(&self, i: usize) -> f64 {
        self.periods.get(i)
    }

    pub fn period_grid(&self) -> &PeriodGrid {
        &self.periods
    }

    pub fn duty_cycles(&self, i: usize) -> &[DutyCycleTrials] {
        &self.duty_cycles[i]
    }

    pub fn cadence(&self) -> f64 {
        self.cadence
    }

    /// Total number of (period, duty cycle, epoch) triples
    pub fn n_trials(&self) -> usize {
        self.duty_cycles
            .iter()
            .flatten()
            .map(|trials| trials.n_epochs)
            .sum()
    }

    /// Shortest and longest trial durations, days
    pub fn duration_range(&self) -> (f64, f64) {
        self.periods()
            .iter()
            .zip(self.duty_cycles.iter())
            .flat_map(|(&period, trials)| trials.iter().map(move |t| t.duration(period)))
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), d| {
                (min.min(d), max.max(d))
            })
    }
}

/// `n` log-uniform values from `low` to `high`, a geometric mean for a single value
fn log_space(low: f64, high: f64, n: usize) -> impl Iterator<Item = f64> {
    let (log_low, log_high) = (low.ln(), high.ln());
    let step = if n > 1 {
        (log_high - log_low) / (n - 1) as f64
    } else {
        0.0
    };
    let start = if n > 1 {
        log_low
    } else {
        0.5 * (log_low + log_high)
    };
    (0..n).map(move |i| f64::exp(start + step * i as f64))
}

/// Number of epochs so the step is the larger of cadence and a fraction of the duration, but
/// never longer than the duration itself
fn epoch_count(
    period: f64,
    duty_cycle: f64,
    cadence: f64,
    duration_fraction: f64,
) -> Result<usize, SearchError> {
    let spacing = f64::max(cadence, duration_fraction * duty_cycle * period);
    let n = f64::max((period / spacing).ceil(), duty_cycle.recip().ceil());
    let n: usize = n
        .approx_by::<RoundToZero>()
        .map_err(|err| SearchError::invalid_parameter("cadence", format!("{err:?}")))?;
    Ok(n.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use itertools::Itertools;

    fn params() -> GridParams {
        let mut params = GridParams::default();
        params.set_period_range(1.0, 5.0);
        params
    }

    #[test]
    fn periods_are_positive_and_increasing() {
        let grid = TrialGrid::new(20.0, 0.02, &params()).unwrap();
        assert!(grid.len() >= MIN_PERIODS);
        assert!(grid.periods().iter().all(|&p| p > 0.0));
        assert!(grid.periods().iter().tuple_windows().all(|(a, b)| a < b));
    }

    #[test]
    fn epochs_cover_one_period() {
        let cadence = 0.02;
        let grid = TrialGrid::new(20.0, cadence, &params()).unwrap();
        for (i, &period) in grid.periods().iter().enumerate() {
            for trials in grid.duty_cycles(i) {
                let epochs = trials.epochs(period);
                assert_eq!(epochs.len(), trials.n_epochs);
                assert_eq!(epochs[0], 0.0);
                let spacing = period / trials.n_epochs as f64;
                assert_relative_eq!(epochs[epochs.len() - 1] + spacing, period, epsilon = 1e-12);
                let max_spacing = f64::max(cadence, 0.5 * trials.duration(period));
                assert!(spacing <= max_spacing * (1.0 + 1e-12));
                // no transit can fall between two epochs
                assert!(spacing <= trials.duration(period) * (1.0 + 1e-12));
            }
        }
    }

    #[test]
    fn duty_cycles_are_feasible() {
        let cadence = 0.02;
        let grid = TrialGrid::new(20.0, cadence, &params()).unwrap();
        for (i, &period) in grid.periods().iter().enumerate() {
            let trials = grid.duty_cycles(i);
            assert_eq!(trials.len(), GridParams::default_n_duty_cycles());
            assert!(
                trials
                    .iter()
                    .tuple_windows()
                    .all(|(a, b)| a.duty_cycle <= b.duty_cycle)
            );
            for t in trials {
                assert!(t.duty_cycle <= MAX_DUTY_CYCLE);
                assert!(t.duration(period) >= MIN_CADENCES_PER_DURATION * cadence * (1.0 - 1e-12));
            }
        }
    }

    #[test]
    fn duty_cycles_follow_stellar_density() {
        let mut dense = params();
        dense.set_stellar_density(20.0).set_log_spread(0.0, 0.0);
        let mut sparse = params();
        sparse.set_stellar_density(0.5).set_log_spread(0.0, 0.0);
        let dense = TrialGrid::new(20.0, 0.001, &dense).unwrap();
        let sparse = TrialGrid::new(20.0, 0.001, &sparse).unwrap();
        assert!(dense.duty_cycles(0)[0].duty_cycle < sparse.duty_cycles(0)[0].duty_cycle);
    }

    #[test]
    fn unresolvable_requested_duration() {
        let mut params = params();
        params.set_duration_range_hours(Some(0.5), None);
        // two cadences are 0.96 hours
        assert!(matches!(
            TrialGrid::new(20.0, 0.02, &params),
            Err(SearchError::UnresolvableDuration { .. })
        ));
    }

    #[test]
    fn too_short_span() {
        let mut params = GridParams::default();
        params.set_period_range(1.0, 1.001);
        assert!(matches!(
            TrialGrid::new(2.0, 0.02, &params),
            Err(SearchError::TooFewPeriods { .. })
        ));
    }

    #[test]
    fn default_period_range() {
        let grid = TrialGrid::new(20.0, 0.02, &GridParams::default()).unwrap();
        assert_relative_eq!(
            grid.period(0),
            period_for_semi_major_axis_ratio(MIN_SEMI_MAJOR_AXIS_RATIO, SOLAR_DENSITY)
        );
        assert!(grid.period(grid.len() - 1) <= 10.0);
    }

    #[test]
    fn log_space_single_value_is_geometric_mean() {
        let v: Vec<_> = log_space(1.0, 4.0, 1).collect();
        assert_relative_eq!(v[0], 2.0, max_relative = 1e-12);
        let v: Vec<_> = log_space(1.0, 4.0, 3).collect();
        all_close_vec(&v, &[1.0, 2.0, 4.0]);
    }

    fn all_close_vec(actual: &[f64], desired: &[f64]) {
        assert_eq!(actual.len(), desired.len());
        for (a, d) in actual.iter().zip(desired) {
            assert_relative_eq!(a, d, max_relative = 1e-12);
        }
    }
}
