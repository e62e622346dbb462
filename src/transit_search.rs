use crate::cache::CsvResultCache;
use crate::data::FluxSeries;
use crate::error::{CacheError, SearchError};
use crate::grid::TrialGrid;
use crate::model::{Baseline, ModelComponent, ModelKind, Signal, Total};
use crate::params::{EvaluatorParams, ExtractionParams, GridParams, RebinParams, ScorerParams};
use crate::rebin::ResolutionLevels;
use crate::search::extraction::Extractor;
use crate::search::{DetectionResult, Orchestrator, Periodogram, TerminationReason};

use log::info;
use macro_const::macro_const;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

macro_const! {
    const DOC: &str = r#"
Iterative periodic box transit search

The search scans a three-level trial grid of periods, duty cycles and epochs. For every trial
period it finds the trial box with the largest in-transit flux deviation from the unity baseline,
scores the resulting depth curve with the signal detection efficiency (SDE) and accepts the best
period if its SDE exceeds the threshold. The accepted box is subtracted from the rebinned series
and the search is repeated on the residual, until the SDE drops below the threshold, the
maximum number of detections is reached or the best period lies at the edge of the period grid.

The input flux must be normalized, so unity is the out-of-transit baseline.

- Trial grid: [GridParams]
- Rebinning: [RebinParams]
- Trial evaluation and parallelism: [EvaluatorParams]
- SDE: [ScorerParams]
- Extraction loop: [ExtractionParams]
"#;
}

#[doc = DOC!()]
/// ### Example
/// ```
/// use light_curve_transit::*;
/// use light_curve_transit_test_util::{inject_box, white_noise_series};
///
/// let (t, mut flux, flux_err) = white_noise_series(1000, 0.02, 0.001, 42);
/// inject_box(&t, &mut flux, 3.0, 0.7, 2.0 / 24.0, 0.01);
/// let series = FluxSeries::from_arrays(t, flux, flux_err).unwrap();
///
/// let mut search = TransitSearch::default();
/// search.grid.set_period_range(1.0, 5.5).set_log_spread(0.15, 0.15).set_n_duty_cycles(5);
/// search.extraction.max_detections = 1;
/// let outcome = search.run(&series).unwrap();
/// let detection = &outcome.detections[0];
/// assert!((detection.period - 3.0).abs() < 0.01);
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct TransitSearch {
    pub grid: GridParams,
    pub rebin: RebinParams,
    pub evaluator: EvaluatorParams,
    pub scorer: ScorerParams,
    pub extraction: ExtractionParams,
}

impl TransitSearch {
    pub fn new(
        grid: GridParams,
        rebin: RebinParams,
        evaluator: EvaluatorParams,
        scorer: ScorerParams,
        extraction: ExtractionParams,
    ) -> Self {
        Self {
            grid,
            rebin,
            evaluator,
            scorer,
            extraction,
        }
    }

    pub const fn doc() -> &'static str {
        DOC
    }

    /// Check all parameters before any computation
    pub fn validate(&self) -> Result<(), SearchError> {
        self.grid.validate()?;
        self.rebin.validate()?;
        self.scorer.validate()?;
        self.extraction.validate()
    }

    /// Run the search on a normalized flux series
    ///
    /// A failed run returns no detections.
    pub fn run(&self, series: &FluxSeries) -> Result<SearchOutcome, SearchError> {
        self.validate()?;
        info!(
            "Transit search over {} observations spanning {:.3} days",
            series.len(),
            series.span()
        );
        let grid = TrialGrid::from_series(series, &self.grid)?;
        let (min_duration, max_duration) = grid.duration_range();
        let mut levels = ResolutionLevels::build(series, min_duration, max_duration, &self.rebin)?;
        let orchestrator = Orchestrator::new(&self.evaluator)?;
        let (series_start, _) = series.time_range();

        let extraction = Extractor {
            grid: &grid,
            orchestrator: &orchestrator,
            polarity: self.evaluator.polarity,
            scorer: &self.scorer,
            params: &self.extraction,
            series_start,
        }
        .run(&mut levels)?;
        info!(
            "Transit search finished with {} detections: {:?}",
            extraction.detections.len(),
            extraction.termination
        );

        Ok(SearchOutcome {
            detections: extraction.detections,
            periodogram: Some(extraction.periodogram),
            termination: Some(extraction.termination),
        })
    }

    /// Run the search or load its stored result
    ///
    /// If `cache` has a record for `run_id`, it is returned unchanged and no search is done.
    /// Otherwise the search result is stored under `run_id`, failed runs store nothing.
    pub fn run_cached(
        &self,
        run_id: &str,
        series: &FluxSeries,
        cache: &CsvResultCache,
    ) -> Result<SearchOutcome, CacheError> {
        if let Some(detections) = cache.load(run_id)? {
            info!("Loaded {} cached detections for run {run_id}", detections.len());
            return Ok(SearchOutcome::from_detections(detections));
        }
        let outcome = self.run(series)?;
        cache.store(run_id, &outcome.detections)?;
        Ok(outcome)
    }
}

/// Result of [TransitSearch]
#[derive(Clone, Debug)]
pub struct SearchOutcome {
    /// Detections in order of extraction
    pub detections: Vec<DetectionResult>,
    /// Diagnostic curves of the last search pass, `None` for cached results
    pub periodogram: Option<Periodogram>,
    /// `None` for cached results
    pub termination: Option<TerminationReason>,
}

impl SearchOutcome {
    pub fn from_detections(detections: Vec<DetectionResult>) -> Self {
        Self {
            detections,
            periodogram: None,
            termination: None,
        }
    }

    /// Model component built from the detections, `None` for a non-existent transit
    ///
    /// Detections loaded from outside may describe an invalid box, an error is returned then.
    pub fn model(&self, kind: ModelKind) -> Result<Option<ModelComponent>, SearchError> {
        let component = match kind {
            ModelKind::Baseline => Baseline.into(),
            ModelKind::Transit(i) => match self.detections.get(i) {
                Some(detection) => detection.transit()?.into(),
                None => return Ok(None),
            },
            ModelKind::Signal => self.signal()?.into(),
            ModelKind::Total => Total {
                baseline: Baseline,
                signal: self.signal()?,
            }
            .into(),
        };
        Ok(Some(component))
    }

    fn signal(&self) -> Result<Signal, SearchError> {
        let transits = self
            .detections
            .iter()
            .map(DetectionResult::transit)
            .collect::<Result<_, _>>()?;
        Ok(Signal { transits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::ModelComponentTrait;

    fn detection(period: f64, epoch: f64, depth_ppt: f64) -> DetectionResult {
        DetectionResult {
            period,
            epoch,
            duration_hours: 2.4,
            depth_ppt,
            sde: 10.0,
            fap: 1e-10,
            duty_cycle: 0.1 / period,
            period_uncertainty: 1e-3,
            transit_count: 5,
        }
    }

    #[test]
    fn params_json_round_trip() {
        let mut search = TransitSearch::default();
        search.grid.set_period_range(0.5, 10.0).set_stellar_density(2.0);
        search.evaluator.set_parallel(false);
        let json = serde_json::to_string(&search).unwrap();
        let deserialized: TransitSearch = serde_json::from_str(&json).unwrap();
        assert_eq!(search, deserialized);
    }

    #[test]
    fn empty_json_is_default() {
        let search: TransitSearch = serde_json::from_str("{}").unwrap();
        assert_eq!(search, TransitSearch::default());
    }

    #[test]
    fn model_components() {
        let outcome = SearchOutcome::from_detections(vec![
            detection(3.0, 0.5, 10.0),
            detection(7.0, 1.5, 5.0),
        ]);
        let baseline = outcome.model(ModelKind::Baseline).unwrap().unwrap();
        assert_eq!(baseline.eval(0.5), 1.0);
        let transit = outcome.model(ModelKind::Transit(1)).unwrap().unwrap();
        assert!((transit.eval(1.5) + 0.005).abs() < 1e-12);
        assert_eq!(transit.eval(0.5), 0.0);
        let total = outcome.model(ModelKind::Total).unwrap().unwrap();
        assert!((total.eval(0.5) - 0.99).abs() < 1e-12);
        assert!((total.eval(1.5) - 0.995).abs() < 1e-12);
        assert_eq!(total.eval(2.5), 1.0);
        assert!(outcome.model(ModelKind::Transit(2)).unwrap().is_none());
    }

    #[test]
    fn model_of_invalid_detection_is_error() {
        let mut invalid = detection(0.05, 0.5, 10.0);
        // two hours are longer than the period
        invalid.duration_hours = 2.4;
        let outcome = SearchOutcome::from_detections(vec![detection(3.0, 0.5, 10.0), invalid]);
        assert!(outcome.model(ModelKind::Transit(0)).unwrap().is_some());
        assert!(matches!(
            outcome.model(ModelKind::Transit(1)),
            Err(SearchError::InvalidParameter {
                name: "duration",
                ..
            })
        ));
        assert!(outcome.model(ModelKind::Total).is_err());
    }

    #[test]
    fn invalid_parameters_fail_before_search() {
        let t: Vec<_> = (0..100).map(|i| i as f64).collect();
        let flux = vec![1.0; t.len()];
        let series = FluxSeries::new_without_errors(&t, &flux).unwrap();
        let mut search = TransitSearch::default();
        search.scorer.window = 1;
        assert!(matches!(
            search.run(&series),
            Err(SearchError::InvalidParameter { name: "window", .. })
        ));
    }
}
