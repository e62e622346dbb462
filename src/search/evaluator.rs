//! Trial evaluation: the deepest in-transit mean flux for every trial period
//!
//! For every period each resolution level used by its duty cycles is folded once: bins are
//! sorted by phase and a prefix sum of the flux is built. The in-transit mean of a trial window
//! is then two binary searches per phase interval, so a trial costs $O(\log N)$ regardless of
//! the number of bins inside the window.

use crate::error::SearchError;
use crate::grid::TrialGrid;
use crate::params::Polarity;
use crate::rebin::{ResolutionLevel, ResolutionLevels};
use crate::search::window::{CircularWindow, PhaseIntervals, phase};

use std::ops::Range;

const HOURS_PER_DAY: f64 = 24.0;

/// Read-only inputs shared by all evaluator workers
#[derive(Clone, Copy, Debug)]
pub struct SearchData<'a> {
    pub levels: &'a ResolutionLevels,
    pub grid: &'a TrialGrid,
    pub polarity: Polarity,
}

/// Best trial of every evaluated period
///
/// Periods without any non-empty trial window have NaN in all three arrays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BestTrials {
    /// In-transit mean flux of the best trial
    pub mean: Vec<f64>,
    pub duty_cycle: Vec<f64>,
    /// Epoch of the best trial in phase units
    pub epoch_phase: Vec<f64>,
}

impl BestTrials {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            mean: Vec::with_capacity(capacity),
            duty_cycle: Vec::with_capacity(capacity),
            epoch_phase: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    fn push(&mut self, mean: f64, duty_cycle: f64, epoch_phase: f64) {
        self.mean.push(mean);
        self.duty_cycle.push(duty_cycle);
        self.epoch_phase.push(epoch_phase);
    }

    /// Append results of the following partition
    pub fn append(&mut self, mut other: Self) {
        self.mean.append(&mut other.mean);
        self.duty_cycle.append(&mut other.duty_cycle);
        self.epoch_phase.append(&mut other.epoch_phase);
    }

    /// Signal amplitude of every period, zero for periods without trials
    pub fn excess(&self, polarity: Polarity) -> impl Iterator<Item = f64> + '_ {
        self.mean.iter().map(move |&mean| {
            if mean.is_nan() {
                0.0
            } else {
                polarity.excess(mean)
            }
        })
    }
}

/// Resolution level folded with a single period
#[derive(Default)]
struct FoldedLevel {
    /// Index of the period the level is currently folded with
    period_index: Option<usize>,
    pairs: Vec<(f64, f64)>,
    phase: Vec<f64>,
    /// Prefix sums of flux minus unity, starting with zero
    cumsum: Vec<f64>,
}

impl FoldedLevel {
    fn fold(&mut self, level: &ResolutionLevel, period: f64, period_index: usize) {
        if self.period_index == Some(period_index) {
            return;
        }
        self.period_index = Some(period_index);

        self.pairs.clear();
        self.pairs.extend(
            level
                .t()
                .iter()
                .zip(level.flux().iter())
                .map(|(&t, &flux)| (phase(t, period), flux)),
        );
        self.pairs.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

        self.phase.clear();
        self.phase.extend(self.pairs.iter().map(|&(phase, _)| phase));
        self.cumsum.clear();
        self.cumsum.push(0.0);
        let mut sum = 0.0;
        for &(_, flux) in self.pairs.iter() {
            sum += flux - 1.0;
            self.cumsum.push(sum);
        }
    }

    /// Number of bins and their flux sum relative to unity in $[start, end)$
    #[inline]
    fn interval(&self, start: f64, end: f64) -> (usize, f64) {
        let lo = self.phase.partition_point(|&p| p < start);
        let hi = lo + self.phase[lo..].partition_point(|&p| p < end);
        (hi - lo, self.cumsum[hi] - self.cumsum[lo])
    }

    /// Number of bins inside the window and their mean flux
    #[inline]
    fn window_mean(&self, window: &CircularWindow) -> (usize, f64) {
        let (count, sum) = match window.intervals() {
            PhaseIntervals::Inner(start, end) => self.interval(start, end),
            PhaseIntervals::Wrapped {
                head_end,
                tail_start,
            } => {
                let (head_count, head_sum) = self.interval(0.0, head_end);
                let (tail_count, tail_sum) = self.interval(tail_start, f64::INFINITY);
                (head_count + tail_count, head_sum + tail_sum)
            }
        };
        (count, 1.0 + sum / count as f64)
    }
}

/// Evaluate all trials for periods with indices from `range`
///
/// The data of the resolution levels are never modified. Scratch buffers are allocated once per
/// call and reused by every period of the range.
///
/// Returns [SearchError::NonFiniteInTransitMean] if any in-transit mean is not finite, levels
/// produced by [ResolutionLevels::build] never contain non-finite flux, so this is a sign of
/// corrupted data.
pub fn evaluate(data: &SearchData, range: Range<usize>) -> Result<BestTrials, SearchError> {
    let mut folded: Vec<FoldedLevel> = (0..data.levels.len())
        .map(|_| FoldedLevel::default())
        .collect();
    let mut best = BestTrials::with_capacity(range.len());

    for period_index in range {
        let period = data.grid.period(period_index);
        let mut best_excess = f64::NEG_INFINITY;
        let (mut best_mean, mut best_duty_cycle, mut best_epoch) = (f64::NAN, f64::NAN, f64::NAN);

        for trials in data.grid.duty_cycles(period_index) {
            let duration = trials.duration(period);
            let level_index = data.levels.level_for_duration(duration);
            let level = &mut folded[level_index];
            level.fold(data.levels.get(level_index), period, period_index);

            let half_width = 0.5 * trials.duty_cycle;
            for epoch in trials.epoch_phases() {
                let window = CircularWindow::new(epoch, half_width);
                let (count, mean) = level.window_mean(&window);
                if count == 0 {
                    continue;
                }
                if !mean.is_finite() {
                    return Err(SearchError::NonFiniteInTransitMean {
                        period,
                        duration_hours: duration * HOURS_PER_DAY,
                        level: level_index,
                    });
                }
                let excess = data.polarity.excess(mean);
                if excess > best_excess {
                    best_excess = excess;
                    best_mean = mean;
                    best_duty_cycle = trials.duty_cycle;
                    best_epoch = epoch;
                }
            }
        }
        best.push(best_mean, best_duty_cycle, best_epoch);
    }
    Ok(best)
}

/// Number of transit windows containing at least one bin of the level
pub fn transit_count(
    level: &ResolutionLevel,
    period: f64,
    epoch_phase: f64,
    duty_cycle: f64,
) -> usize {
    let window = CircularWindow::new(epoch_phase, 0.5 * duty_cycle);
    let mut count = 0;
    let mut last_cycle = None;
    for &t in level.t().iter() {
        if !window.contains(phase(t, period)) {
            continue;
        }
        // a window wrapping above unity belongs to the cycle of its center
        let cycle = ((t - epoch_phase * period) / period).round();
        if last_cycle != Some(cycle) {
            count += 1;
            last_cycle = Some(cycle);
        }
    }
    count
}
