//! Box model of the extracted signals
//!
//! The model is a closed set of components: unity baseline, a single periodic box transit, the
//! sum of all transits and the total flux. Transit components are deviations from the baseline,
//! so $\mathrm{Total} = \mathrm{Baseline} + \mathrm{Signal}$.

use crate::error::SearchError;
use crate::search::{CircularWindow, phase};

use enum_dispatch::enum_dispatch;
use ndarray::{Array1, ArrayView1};

/// Model component evaluated at arbitrary times
#[enum_dispatch]
pub trait ModelComponentTrait {
    fn eval(&self, t: f64) -> f64;

    fn eval_array(&self, t: ArrayView1<f64>) -> Array1<f64> {
        t.mapv(|t| self.eval(t))
    }
}

#[enum_dispatch(ModelComponentTrait)]
#[derive(Clone, Debug, PartialEq)]
pub enum ModelComponent {
    Baseline(Baseline),
    Transit(BoxTransit),
    Signal(Signal),
    Total(Total),
}

/// Selector of a [ModelComponent] built from search results
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    Baseline,
    /// Transit of the detection with the given index
    Transit(usize),
    Signal,
    Total,
}

/// Normalized out-of-transit flux
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Baseline;

impl ModelComponentTrait for Baseline {
    fn eval(&self, _t: f64) -> f64 {
        1.0
    }
}

/// Periodic box transit as a deviation from the baseline
///
/// Positive depth is a dimming, negative depth is a brightening.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxTransit {
    period: f64,
    epoch: f64,
    duration: f64,
    depth: f64,
    window: CircularWindow,
}

impl BoxTransit {
    /// Box centered at `epoch` with period, epoch and duration in days
    ///
    /// Duration must be positive and shorter than the period, otherwise the box covers the whole
    /// phase circle.
    pub fn new(period: f64, epoch: f64, duration: f64, depth: f64) -> Result<Self, SearchError> {
        if !(period.is_finite() && period > 0.0) {
            return Err(SearchError::invalid_parameter(
                "period",
                format!("must be finite and positive, got {period}"),
            ));
        }
        if !(duration > 0.0 && duration < period) {
            return Err(SearchError::invalid_parameter(
                "duration",
                format!("must be in (0, {period}), got {duration}"),
            ));
        }
        if !(epoch.is_finite() && depth.is_finite()) {
            return Err(SearchError::invalid_parameter(
                "epoch",
                "epoch and depth must be finite",
            ));
        }
        Ok(Self::from_phase(
            period,
            phase(epoch, period),
            duration / period,
            depth,
            epoch,
        ))
    }

    pub(crate) fn from_phase(
        period: f64,
        epoch_phase: f64,
        duty_cycle: f64,
        depth: f64,
        epoch: f64,
    ) -> Self {
        Self {
            period,
            epoch,
            duration: duty_cycle * period,
            depth,
            window: CircularWindow::new(epoch_phase, 0.5 * duty_cycle),
        }
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn epoch(&self) -> f64 {
        self.epoch
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn depth(&self) -> f64 {
        self.depth
    }

    #[inline]
    pub fn in_transit(&self, t: f64) -> bool {
        self.window.contains(phase(t, self.period))
    }

    /// Phase-folded model on `n` uniform phases from $[-1/2, 1/2)$, zero phase is the transit
    /// center
    pub fn phase_folded(&self, n: usize) -> (Array1<f64>, Array1<f64>) {
        let phases: Array1<f64> = (0..n).map(|i| i as f64 / n as f64 - 0.5).collect();
        let half_duty_cycle = 0.5 * self.duration / self.period;
        let flux = phases.mapv(|phase| {
            if -half_duty_cycle <= phase && phase < half_duty_cycle {
                1.0 - self.depth
            } else {
                1.0
            }
        });
        (phases, flux)
    }
}

impl ModelComponentTrait for BoxTransit {
    fn eval(&self, t: f64) -> f64 {
        if self.in_transit(t) { -self.depth } else { 0.0 }
    }
}

/// Sum of all transits
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Signal {
    pub transits: Vec<BoxTransit>,
}

impl ModelComponentTrait for Signal {
    fn eval(&self, t: f64) -> f64 {
        self.transits.iter().map(|transit| transit.eval(t)).sum()
    }
}

/// Baseline plus all transits
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Total {
    pub baseline: Baseline,
    pub signal: Signal,
}

impl ModelComponentTrait for Total {
    fn eval(&self, t: f64) -> f64 {
        self.baseline.eval(t) + self.signal.eval(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use light_curve_common::all_close;

    #[test]
    fn box_transit_window() {
        let transit = BoxTransit::new(3.0, 10.5, 0.2, 0.01).unwrap();
        assert_eq!(transit.eval(10.5), -0.01);
        assert_eq!(transit.eval(7.45), -0.01);
        assert_eq!(transit.eval(1.59), -0.01);
        assert_eq!(transit.eval(10.65), 0.0);
        assert_eq!(transit.eval(9.0), 0.0);
    }

    #[test]
    fn transit_wrapping_zero_phase() {
        let transit = BoxTransit::new(2.0, 4.0, 0.2, 0.01).unwrap();
        assert_eq!(transit.eval(3.95), -0.01);
        assert_eq!(transit.eval(6.05), -0.01);
        assert_eq!(transit.eval(5.0), 0.0);
    }

    #[test]
    fn total_is_baseline_plus_signal() {
        let signal = Signal {
            transits: vec![
                BoxTransit::new(3.0, 0.5, 0.2, 0.01).unwrap(),
                BoxTransit::new(5.0, 0.5, 0.2, 0.02).unwrap(),
            ],
        };
        let total: ModelComponent = Total {
            baseline: Baseline,
            signal: signal.clone(),
        }
        .into();
        let t = Array1::linspace(0.0, 20.0, 201);
        let total = total.eval_array(t.view());
        let expected = t.mapv(|t| 1.0 + signal.eval(t));
        all_close(total.as_slice().unwrap(), expected.as_slice().unwrap(), 1e-12);
        // both transits overlap at t = 0.5
        assert_relative_eq!(total[5], 0.97, epsilon = 1e-12);
    }

    #[test]
    fn phase_folded_box() {
        let transit = BoxTransit::new(4.0, 1.0, 0.4, 0.01).unwrap();
        let (phases, flux) = transit.phase_folded(100);
        assert_eq!(phases.len(), 100);
        assert_eq!(phases[0], -0.5);
        assert_relative_eq!(flux[50], 0.99);
        assert_eq!(flux[0], 1.0);
        // duty cycle is 0.1, so ten phases of a hundred are in transit
        assert_eq!(flux.iter().filter(|&&f| f < 1.0).count(), 10);
    }

    #[test]
    fn box_longer_than_period_is_rejected() {
        for duration in [0.0, -0.1, 4.0, 5.0, f64::NAN] {
            assert!(matches!(
                BoxTransit::new(4.0, 1.0, duration, 0.01),
                Err(SearchError::InvalidParameter {
                    name: "duration",
                    ..
                })
            ));
        }
        assert!(matches!(
            BoxTransit::new(0.0, 1.0, 0.1, 0.01),
            Err(SearchError::InvalidParameter { name: "period", .. })
        ));
        assert!(BoxTransit::new(4.0, f64::NAN, 0.1, 0.01).is_err());
        // wide box covering most of the phase circle is valid
        let transit = BoxTransit::new(4.0, 1.0, 3.9, 0.01).unwrap();
        assert_eq!(transit.eval(2.9), -0.01);
        assert_eq!(transit.eval(3.0), 0.0);
    }
}
