//! Synthetic normalized light curves with injected periodic box transits

use lazy_static::lazy_static;
use ndarray::Array1;
use rand::prelude::*;
use rand_distr::Normal;

/// Time, flux and flux uncertainty
pub type LightCurve = (Array1<f64>, Array1<f64>, Array1<f64>);

/// Periodic box dimming, time values are in days
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InjectedBox {
    pub period: f64,
    /// Center of any transit
    pub epoch: f64,
    pub duration: f64,
    /// Flux decrement, negative for brightening
    pub depth: f64,
}

impl InjectedBox {
    pub fn in_transit(&self, t: f64) -> bool {
        let half_period = 0.5 * self.period;
        let offset = (t - self.epoch + half_period).rem_euclid(self.period) - half_period;
        offset.abs() < 0.5 * self.duration
    }
}

/// Unity flux with Gaussian noise on a uniform time grid starting at zero
pub fn white_noise_series(n: usize, cadence: f64, sigma: f64, seed: u64) -> LightCurve {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(1.0, sigma).unwrap();
    let t = Array1::from_shape_fn(n, |i| i as f64 * cadence);
    let flux = Array1::from_shape_fn(n, |_| normal.sample(&mut rng));
    let flux_err = Array1::from_elem(n, sigma);
    (t, flux, flux_err)
}

/// Subtract a periodic box from the flux
pub fn inject_box(
    t: &Array1<f64>,
    flux: &mut Array1<f64>,
    period: f64,
    epoch: f64,
    duration: f64,
    depth: f64,
) {
    let signal = InjectedBox {
        period,
        epoch,
        duration,
        depth,
    };
    flux.zip_mut_with(t, |flux, &t| {
        if signal.in_transit(t) {
            *flux -= depth;
        }
    });
}

/// Noisy light curve with any number of injected boxes
pub fn synthetic_light_curve(
    n: usize,
    cadence: f64,
    sigma: f64,
    seed: u64,
    signals: &[InjectedBox],
) -> LightCurve {
    let (t, mut flux, flux_err) = white_noise_series(n, cadence, sigma, seed);
    for signal in signals {
        inject_box(
            &t,
            &mut flux,
            signal.period,
            signal.epoch,
            signal.duration,
            signal.depth,
        );
    }
    (t, flux, flux_err)
}

lazy_static! {
    /// A single 3-day transit in a 20-day series of 1000 observations
    pub static ref SINGLE_TRANSIT_LIGHT_CURVE: LightCurve = synthetic_light_curve(
        1000,
        0.02,
        1e-3,
        0,
        &[InjectedBox {
            period: 3.0,
            epoch: 0.7,
            duration: 2.0 / 24.0,
            depth: 0.01,
        }],
    );

    /// Two transiting signals with non-commensurate periods in a 20-day series of 2000
    /// observations
    pub static ref TWO_TRANSITS_LIGHT_CURVE: LightCurve = synthetic_light_curve(
        2000,
        0.01,
        1e-3,
        1,
        &[
            InjectedBox {
                period: 2.3,
                epoch: 0.7,
                duration: 2.0 / 24.0,
                depth: 0.01,
            },
            InjectedBox {
                period: 3.7,
                epoch: 2.2,
                duration: 2.5 / 24.0,
                depth: 0.008,
            },
        ],
    );
}
