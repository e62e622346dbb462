//! Parameters of the transit search components
//!
//! Every component receives its own parameter struct and never looks into parameters of other
//! components. All structs are serializable, so a search configuration could be stored next to
//! its results.

use crate::error::SearchError;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters of the trial grid: periods, duty cycles and epochs
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct GridParams {
    /// Minimum period, days. Derived from stellar density and cadence if `None`
    pub min_period: Option<f64>,
    /// Maximum period, days. Half of the time span if `None`
    pub max_period: Option<f64>,
    /// Frequency grid oversampling factor
    pub oversampling: f64,
    /// Number of duty cycles per period
    pub n_duty_cycles: usize,
    /// Decimal logarithm spread of duty cycles below the central transit duty cycle
    pub log_spread_low: f64,
    /// Decimal logarithm spread of duty cycles above the central transit duty cycle
    pub log_spread_high: f64,
    /// Mean stellar density, g/cm^3. Solar density is assumed if `None`
    pub stellar_density: Option<f64>,
    /// Minimum trial duration, hours. Two cadences if `None`
    pub min_duration_hours: Option<f64>,
    /// Maximum trial duration, hours. Limited by the maximum duty cycle only if `None`
    pub max_duration_hours: Option<f64>,
    /// Epoch step as a fraction of the trial duration
    pub epoch_duration_fraction: f64,
    /// Sampling cadence, days. Median time step of the series if `None`
    pub cadence: Option<f64>,
}

impl GridParams {
    #[inline]
    pub fn default_oversampling() -> f64 {
        3.0
    }

    #[inline]
    pub fn default_n_duty_cycles() -> usize {
        8
    }

    #[inline]
    pub fn default_log_spread_low() -> f64 {
        0.5
    }

    #[inline]
    pub fn default_log_spread_high() -> f64 {
        0.3
    }

    #[inline]
    pub fn default_epoch_duration_fraction() -> f64 {
        0.5
    }

    pub fn set_period_range(&mut self, min_period: f64, max_period: f64) -> &mut Self {
        self.min_period = Some(min_period);
        self.max_period = Some(max_period);
        self
    }

    pub fn set_oversampling(&mut self, oversampling: f64) -> &mut Self {
        self.oversampling = oversampling;
        self
    }

    pub fn set_n_duty_cycles(&mut self, n_duty_cycles: usize) -> &mut Self {
        self.n_duty_cycles = n_duty_cycles;
        self
    }

    pub fn set_log_spread(&mut self, low: f64, high: f64) -> &mut Self {
        self.log_spread_low = low;
        self.log_spread_high = high;
        self
    }

    pub fn set_stellar_density(&mut self, density: f64) -> &mut Self {
        self.stellar_density = Some(density);
        self
    }

    pub fn set_duration_range_hours(&mut self, min: Option<f64>, max: Option<f64>) -> &mut Self {
        self.min_duration_hours = min;
        self.max_duration_hours = max;
        self
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        check_positive_option("min_period", self.min_period)?;
        check_positive_option("max_period", self.max_period)?;
        check_positive("oversampling", self.oversampling)?;
        if self.n_duty_cycles == 0 {
            return Err(SearchError::invalid_parameter(
                "n_duty_cycles",
                "must be at least one",
            ));
        }
        if !(self.log_spread_low.is_finite() && self.log_spread_low >= 0.0) {
            return Err(SearchError::invalid_parameter(
                "log_spread_low",
                "must be finite and non-negative",
            ));
        }
        if !(self.log_spread_high.is_finite() && self.log_spread_high >= 0.0) {
            return Err(SearchError::invalid_parameter(
                "log_spread_high",
                "must be finite and non-negative",
            ));
        }
        check_positive_option("stellar_density", self.stellar_density)?;
        check_positive_option("min_duration_hours", self.min_duration_hours)?;
        check_positive_option("max_duration_hours", self.max_duration_hours)?;
        if let (Some(min), Some(max)) = (self.min_duration_hours, self.max_duration_hours) {
            if min > max {
                return Err(SearchError::invalid_parameter(
                    "max_duration_hours",
                    format!("must not be smaller than min_duration_hours {min}"),
                ));
            }
        }
        check_positive("epoch_duration_fraction", self.epoch_duration_fraction)?;
        check_positive_option("cadence", self.cadence)?;
        Ok(())
    }
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            min_period: None,
            max_period: None,
            oversampling: Self::default_oversampling(),
            n_duty_cycles: Self::default_n_duty_cycles(),
            log_spread_low: Self::default_log_spread_low(),
            log_spread_high: Self::default_log_spread_high(),
            stellar_density: None,
            min_duration_hours: None,
            max_duration_hours: None,
            epoch_duration_fraction: Self::default_epoch_duration_fraction(),
            cadence: None,
        }
    }
}

/// Parameters of the multi-resolution rebinning
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct RebinParams {
    /// Number of resolution levels
    pub n_levels: usize,
    /// Number of bins per level duration
    pub oversampling: f64,
}

impl RebinParams {
    #[inline]
    pub fn default_n_levels() -> usize {
        10
    }

    #[inline]
    pub fn default_oversampling() -> f64 {
        4.0
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.n_levels == 0 {
            return Err(SearchError::invalid_parameter(
                "n_levels",
                "must be at least one",
            ));
        }
        check_positive("oversampling", self.oversampling)
    }
}

impl Default for RebinParams {
    fn default() -> Self {
        Self {
            n_levels: Self::default_n_levels(),
            oversampling: Self::default_oversampling(),
        }
    }
}

/// Direction of the box signal
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum Polarity {
    /// Flux decreases in transit
    #[default]
    Dimming,
    /// Flux increases in transit
    Brightening,
}

impl Polarity {
    /// Signal amplitude of the in-transit mean flux relative to the unity baseline, positive
    /// for the searched direction
    #[inline]
    pub fn excess(self, in_transit_mean: f64) -> f64 {
        match self {
            Self::Dimming => 1.0 - in_transit_mean,
            Self::Brightening => in_transit_mean - 1.0,
        }
    }
}

/// Parameters of the trial evaluation and its parallel execution
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct EvaluatorParams {
    pub polarity: Polarity,
    /// Split the period grid between worker threads
    pub parallel: bool,
    /// Number of worker threads, zero means the number of logical CPUs
    pub n_workers: usize,
}

impl EvaluatorParams {
    pub fn set_polarity(&mut self, polarity: Polarity) -> &mut Self {
        self.polarity = polarity;
        self
    }

    pub fn set_parallel(&mut self, parallel: bool) -> &mut Self {
        self.parallel = parallel;
        self
    }

    pub fn set_n_workers(&mut self, n_workers: usize) -> &mut Self {
        self.n_workers = n_workers;
        self
    }
}

impl Default for EvaluatorParams {
    fn default() -> Self {
        Self {
            polarity: Polarity::default(),
            parallel: true,
            n_workers: 0,
        }
    }
}

/// Parameters of the signal detection efficiency calculation
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct ScorerParams {
    /// Sliding window size of the median filter
    pub window: usize,
    /// Sliding window size of the local standard deviation, it should be several times wider than
    /// the median window because neighbouring periods have strongly correlated depths
    pub noise_window: usize,
}

impl ScorerParams {
    #[inline]
    pub fn default_window() -> usize {
        51
    }

    #[inline]
    pub fn default_noise_window() -> usize {
        255
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if self.window < 3 {
            return Err(SearchError::invalid_parameter(
                "window",
                "must be at least three",
            ));
        }
        if self.noise_window < 3 {
            return Err(SearchError::invalid_parameter(
                "noise_window",
                "must be at least three",
            ));
        }
        Ok(())
    }
}

impl Default for ScorerParams {
    fn default() -> Self {
        Self {
            window: Self::default_window(),
            noise_window: Self::default_noise_window(),
        }
    }
}

/// Parameters of the iterative signal extraction
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ExtractionParams {
    /// Minimum SDE of an accepted detection
    pub sde_threshold: f64,
    /// Maximum number of detections
    pub max_detections: usize,
}

impl ExtractionParams {
    #[inline]
    pub fn default_sde_threshold() -> f64 {
        7.1
    }

    #[inline]
    pub fn default_max_detections() -> usize {
        5
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if !self.sde_threshold.is_finite() {
            return Err(SearchError::invalid_parameter(
                "sde_threshold",
                "must be finite",
            ));
        }
        Ok(())
    }
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            sde_threshold: Self::default_sde_threshold(),
            max_detections: Self::default_max_detections(),
        }
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<(), SearchError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SearchError::invalid_parameter(
            name,
            format!("must be finite and positive, got {value}"),
        ))
    }
}

fn check_positive_option(name: &'static str, value: Option<f64>) -> Result<(), SearchError> {
    value.map_or(Ok(()), |value| check_positive(name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_params_partial_json() {
        let params: GridParams =
            serde_json::from_str(r#"{"min_period": 1.0, "n_duty_cycles": 4}"#).unwrap();
        assert_eq!(params.min_period, Some(1.0));
        assert_eq!(params.n_duty_cycles, 4);
        assert_eq!(params.oversampling, GridParams::default_oversampling());
    }

    #[test]
    fn grid_params_reject_bad_duration_range() {
        let mut params = GridParams::default();
        params.set_duration_range_hours(Some(3.0), Some(2.0));
        assert!(matches!(
            params.validate(),
            Err(SearchError::InvalidParameter {
                name: "max_duration_hours",
                ..
            })
        ));
    }

    #[test]
    fn polarity_excess_sign() {
        assert!(Polarity::Dimming.excess(0.99) > 0.0);
        assert!(Polarity::Brightening.excess(0.99) < 0.0);
    }

    #[test]
    fn scorer_window_too_small() {
        let params = ScorerParams {
            window: 2,
            ..Default::default()
        };
        assert!(params.validate().is_err());
        let params = ScorerParams {
            noise_window: 1,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(SearchError::InvalidParameter {
                name: "noise_window",
                ..
            })
        ));
    }

    #[test]
    fn scorer_params_partial_json() {
        let params: ScorerParams = serde_json::from_str(r#"{"window": 31}"#).unwrap();
        assert_eq!(params.window, 31);
        assert_eq!(params.noise_window, ScorerParams::default_noise_window());
    }
}
