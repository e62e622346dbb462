//! Iterative extraction of periodic box signals
//!
//! The extraction is a state machine: every detection is searched on the residual of the
//! previous ones, which are subtracted from every resolution level in place.
//!
//! ```text
//! Search -> Accept -> Subtract -> Search -> ... -> Done
//!             |           |
//!             +-> Done    +-> Done
//! ```

use crate::error::SearchError;
use crate::grid::TrialGrid;
use crate::model::{BoxTransit, ModelComponentTrait};
use crate::params::{ExtractionParams, Polarity, ScorerParams};
use crate::rebin::ResolutionLevels;
use crate::search::evaluator::{BestTrials, SearchData, transit_count};
use crate::search::orchestrator::Orchestrator;
use crate::search::significance::{Significance, score};

use log::info;
use ndarray::Array1;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const HOURS_PER_DAY: f64 = 24.0;

/// Extracted periodic box signal
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DetectionResult {
    /// Period, days
    pub period: f64,
    /// Center of the first transit not earlier than the first observation, days
    pub epoch: f64,
    pub duration_hours: f64,
    /// Box depth relative to the unity baseline, parts per thousand. Negative for brightening
    pub depth_ppt: f64,
    /// Signal detection efficiency
    pub sde: f64,
    /// False alarm probability
    pub fap: f64,
    pub duty_cycle: f64,
    /// Half width at half maximum of the SDE peak but not less than a half of the local period
    /// grid step, days
    pub period_uncertainty: f64,
    /// Number of transit windows containing data
    pub transit_count: usize,
}

impl DetectionResult {
    /// Box model of this detection
    pub fn transit(&self) -> Result<BoxTransit, SearchError> {
        BoxTransit::new(
            self.period,
            self.epoch,
            self.duration_hours / HOURS_PER_DAY,
            1e-3 * self.depth_ppt,
        )
    }
}

/// Why the extraction stopped
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum TerminationReason {
    /// Maximum number of detections is reached
    MaxDetections,
    /// The best SDE is below the detection threshold
    BelowThreshold,
    /// The best period is at the edge of the period grid, the result is inconclusive
    GridEdge,
}

/// Period-indexed diagnostic curves of a search pass
#[derive(Clone, Debug, PartialEq)]
pub struct Periodogram {
    pub periods: Array1<f64>,
    /// Depth of the best trial, parts per thousand, positive for the searched polarity
    pub depth_ppt: Array1<f64>,
    pub residual: Array1<f64>,
    pub local_std: Array1<f64>,
    pub sde: Array1<f64>,
}

impl Periodogram {
    fn new(grid: &TrialGrid, significance: Significance) -> Self {
        Self {
            periods: grid.periods().to_owned(),
            depth_ppt: significance.depth_ppt,
            residual: significance.residual,
            local_std: significance.local_std,
            sde: significance.sde,
        }
    }
}

/// Best trial of a search pass
#[derive(Clone, Copy, Debug, PartialEq)]
struct Candidate {
    /// Centre of the SDE peak, the reported period
    index: usize,
    /// Maximum of the SDE peak
    best_index: usize,
    sde: f64,
    /// Half width at half maximum of the SDE peak, days
    period_uncertainty: f64,
    mean: f64,
    duty_cycle: f64,
    epoch_phase: f64,
}

enum State {
    Search,
    Accept(Candidate),
    Subtract(Candidate),
    Done(TerminationReason),
}

/// Decide whether the best trial of a search pass is a detection
///
/// Returns `None` if the candidate should be accepted.
pub fn termination(
    best_index: usize,
    n_periods: usize,
    sde: f64,
    n_detections: usize,
    params: &ExtractionParams,
) -> Option<TerminationReason> {
    if best_index == 0 || best_index + 1 == n_periods {
        Some(TerminationReason::GridEdge)
    } else if sde < params.sde_threshold {
        Some(TerminationReason::BelowThreshold)
    } else if n_detections >= params.max_detections {
        Some(TerminationReason::MaxDetections)
    } else {
        None
    }
}

/// Probability that pure Gaussian noise reaches the SDE at least at one of `n_periods` periods
///
/// $$
/// \mathrm{FAP} = 1 - (1 - p)^N,\quad p = \frac12 \mathrm{erfc}\frac{\mathrm{SDE}}{\sqrt2}.
/// $$
pub fn false_alarm_probability(sde: f64, n_periods: usize) -> f64 {
    let p = 0.5 * libm::erfc(sde / std::f64::consts::SQRT_2);
    -f64::exp_m1(n_periods as f64 * f64::ln_1p(-p))
}

/// Output of the extraction loop
#[derive(Clone, Debug)]
pub struct Extraction {
    pub detections: Vec<DetectionResult>,
    /// Diagnostic curves of the last search pass
    pub periodogram: Periodogram,
    pub termination: TerminationReason,
}

/// Components of a search run used by the extraction loop
pub struct Extractor<'a> {
    pub grid: &'a TrialGrid,
    pub orchestrator: &'a Orchestrator,
    pub polarity: Polarity,
    pub scorer: &'a ScorerParams,
    pub params: &'a ExtractionParams,
    /// Time of the first observation
    pub series_start: f64,
}

impl Extractor<'_> {
    /// Run the extraction, signals are subtracted from `levels`
    pub fn run(&self, levels: &mut ResolutionLevels) -> Result<Extraction, SearchError> {
        self.params.validate()?;
        let mut detections = vec![];
        let (candidate, mut periodogram) = self.search(levels, 1)?;
        let mut state = State::Accept(candidate);

        let reason = loop {
            state = match state {
                State::Search => {
                    let (candidate, pass_periodogram) =
                        self.search(levels, detections.len() + 1)?;
                    periodogram = pass_periodogram;
                    State::Accept(candidate)
                }
                State::Accept(candidate) => match self.decide(&candidate, detections.len()) {
                    Some(reason) => State::Done(reason),
                    None => {
                        let detection = self.detection(&candidate, levels);
                        info!(
                            "Detection {}: period {:.6} d, epoch {:.6}, duration {:.3} h, depth {:.3} ppt, SDE {:.2}",
                            detections.len() + 1,
                            detection.period,
                            detection.epoch,
                            detection.duration_hours,
                            detection.depth_ppt,
                            detection.sde,
                        );
                        detections.push(detection);
                        State::Subtract(candidate)
                    }
                },
                State::Subtract(candidate) => {
                    subtract(levels, &self.transit(&candidate));
                    if detections.len() >= self.params.max_detections {
                        State::Done(TerminationReason::MaxDetections)
                    } else {
                        State::Search
                    }
                }
                State::Done(reason) => break reason,
            };
        };

        Ok(Extraction {
            detections,
            periodogram,
            termination: reason,
        })
    }

    fn search(
        &self,
        levels: &ResolutionLevels,
        pass: usize,
    ) -> Result<(Candidate, Periodogram), SearchError> {
        let data = SearchData {
            levels,
            grid: self.grid,
            polarity: self.polarity,
        };
        let best = self.orchestrator.evaluate(&data)?;
        let significance = score(best.excess(self.polarity), self.scorer)?;
        let candidate = Candidate::new(&best, &significance, self.grid);
        info!(
            "Search pass {pass}: best period {:.6} d, SDE {:.2}",
            self.grid.period(candidate.index),
            candidate.sde,
        );
        Ok((candidate, Periodogram::new(self.grid, significance)))
    }

    fn decide(&self, candidate: &Candidate, n_detections: usize) -> Option<TerminationReason> {
        // no trial window of the best period contains data
        if candidate.mean.is_nan() {
            return Some(TerminationReason::BelowThreshold);
        }
        termination(
            candidate.best_index,
            self.grid.len(),
            candidate.sde,
            n_detections,
            self.params,
        )
    }

    fn transit(&self, candidate: &Candidate) -> BoxTransit {
        let period = self.grid.period(candidate.index);
        BoxTransit::from_phase(
            period,
            candidate.epoch_phase,
            candidate.duty_cycle,
            1.0 - candidate.mean,
            self.first_epoch(period, candidate.epoch_phase),
        )
    }

    /// Transit center not earlier than the first observation
    fn first_epoch(&self, period: f64, epoch_phase: f64) -> f64 {
        let epoch = epoch_phase * period;
        epoch + ((self.series_start - epoch) / period).ceil() * period
    }

    fn detection(&self, candidate: &Candidate, levels: &ResolutionLevels) -> DetectionResult {
        let period = self.grid.period(candidate.index);
        let transit = self.transit(candidate);
        DetectionResult {
            period,
            epoch: transit.epoch(),
            duration_hours: transit.duration() * HOURS_PER_DAY,
            depth_ppt: 1e3 * transit.depth(),
            sde: candidate.sde,
            fap: false_alarm_probability(candidate.sde, self.grid.len()),
            duty_cycle: candidate.duty_cycle,
            period_uncertainty: candidate.period_uncertainty,
            transit_count: transit_count(
                levels.get(0),
                period,
                candidate.epoch_phase,
                candidate.duty_cycle,
            ),
        }
    }
}

impl Candidate {
    fn new(best: &BestTrials, significance: &Significance, grid: &TrialGrid) -> Self {
        let index = significance.centre_index();
        let peak = &significance.peak;
        let half_width = 0.5 * f64::abs(grid.period(peak.end - 1) - grid.period(peak.start));
        let half_step = 0.5 * grid.period_grid().period_step(index);
        Self {
            index,
            best_index: significance.best_index,
            sde: significance.best_sde(),
            period_uncertainty: f64::max(half_width, half_step),
            mean: best.mean[index],
            duty_cycle: best.duty_cycle[index],
            epoch_phase: best.epoch_phase[index],
        }
    }
}

/// Subtract the box from every level at its own time sampling
fn subtract(levels: &mut ResolutionLevels, transit: &BoxTransit) {
    for level in levels.iter_mut() {
        let (t, mut flux) = level.t_flux_mut();
        flux.zip_mut_with(&t, |flux, &t| *flux -= transit.eval(t));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::rebin::ResolutionLevel;

    use approx::assert_relative_eq;

    #[test]
    fn grid_edge_terminates() {
        let params = ExtractionParams::default();
        assert_eq!(
            termination(0, 100, 50.0, 0, &params),
            Some(TerminationReason::GridEdge)
        );
        assert_eq!(
            termination(99, 100, 50.0, 0, &params),
            Some(TerminationReason::GridEdge)
        );
        assert_eq!(termination(98, 100, 50.0, 0, &params), None);
    }

    #[test]
    fn threshold_and_count_terminate() {
        let params = ExtractionParams {
            sde_threshold: 7.1,
            max_detections: 2,
        };
        assert_eq!(
            termination(10, 100, 7.0, 0, &params),
            Some(TerminationReason::BelowThreshold)
        );
        assert_eq!(termination(10, 100, 7.1, 1, &params), None);
        assert_eq!(
            termination(10, 100, 7.1, 2, &params),
            Some(TerminationReason::MaxDetections)
        );
    }

    #[test]
    fn false_alarm_probability_limits() {
        // one trial at zero SDE is a coin flip
        assert_relative_eq!(false_alarm_probability(0.0, 1), 0.5, epsilon = 1e-15);
        assert!(false_alarm_probability(10.0, 10_000) < 1e-15);
        assert!(false_alarm_probability(2.0, 10_000) > 0.99);
        assert!(false_alarm_probability(5.0, 100) < false_alarm_probability(5.0, 1000));
    }

    #[test]
    fn subtraction_touches_only_in_transit_bins() {
        let t: Vec<_> = (0..100).map(|i| i as f64 * 0.1).collect();
        let flux: Vec<_> = t
            .iter()
            .map(|&t| {
                let offset = (t - 2.5).rem_euclid(5.0);
                if !(0.25..=4.75).contains(&offset) {
                    0.99
                } else {
                    1.0
                }
            })
            .collect();
        let mut levels = ResolutionLevels::from_levels(vec![
            ResolutionLevel::from_arrays(0.5, t.clone(), flux.clone()),
            ResolutionLevel::from_arrays(1.0, t, flux),
        ]);
        let transit = BoxTransit::new(5.0, 2.5, 0.5, 0.01).unwrap();
        subtract(&mut levels, &transit);
        for level in levels.iter() {
            for &flux in level.flux() {
                assert_relative_eq!(flux, 1.0, epsilon = 1e-12);
            }
        }
    }
}
