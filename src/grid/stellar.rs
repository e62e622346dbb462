//! Kepler's third law in stellar-density units
//!
//! For a circular orbit and a planet much smaller than its host star the semi-major axis in
//! stellar radii depends on the orbital period and the mean stellar density only:
//! $$
//! \frac{a}{R_\star} = \left(\frac{G \rho_\star P^2}{3\pi}\right)^{1/3},
//! $$
//! and the duty cycle of a central transit is
//! $q = \arcsin(R_\star / a) / \pi$.

use std::f64::consts::PI;

/// Gravitational constant, m^3 kg^-1 s^-2
const GRAVITATIONAL_CONSTANT: f64 = 6.674_30e-11;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// g/cm^3 to kg/m^3
const DENSITY_CGS_TO_SI: f64 = 1_000.0;

/// Mean solar density, g/cm^3
pub const SOLAR_DENSITY: f64 = 1.41;

/// Semi-major axis in stellar radii for period in days and density in g/cm^3
pub fn semi_major_axis_ratio(period: f64, density: f64) -> f64 {
    let period = period * SECONDS_PER_DAY;
    let density = density * DENSITY_CGS_TO_SI;
    f64::cbrt(GRAVITATIONAL_CONSTANT * density * period.powi(2) / (3.0 * PI))
}

/// Period in days of the orbit with a given semi-major axis in stellar radii
pub fn period_for_semi_major_axis_ratio(a_over_r: f64, density: f64) -> f64 {
    let density = density * DENSITY_CGS_TO_SI;
    f64::sqrt(3.0 * PI * a_over_r.powi(3) / (GRAVITATIONAL_CONSTANT * density)) / SECONDS_PER_DAY
}

/// Duty cycle of a central transit, it doesn't depend on the stellar radius
pub fn density_invariant_duty_cycle(period: f64, density: f64) -> f64 {
    let a_over_r = semi_major_axis_ratio(period, density);
    f64::asin(f64::min(1.0, a_over_r.recip())) / PI
}

/// Duration in days of a central transit
pub fn density_invariant_duration(period: f64, density: f64) -> f64 {
    density_invariant_duty_cycle(period, density) * period
}
