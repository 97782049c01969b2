use super::constants::{CIRCULAR_EPSILON, TWO_PI};

const KEPLER_MAX_ITERATIONS: usize = 10;
const KEPLER_TOLERANCE: f64 = 1e-6;

/// Solves Kepler's equation `M = E - e·sin(E)` for the eccentric anomaly.
///
/// Newton-Raphson starting from `E = M`. The iteration count is bounded, so a
/// non-converged solve returns the last estimate instead of failing.
pub fn solve_kepler(mean_anomaly: f64, eccentricity: f64) -> f64 {
    if eccentricity == 0.0 {
        return mean_anomaly;
    }

    let mut e_anom = mean_anomaly;
    for _ in 0..KEPLER_MAX_ITERATIONS {
        let f = e_anom - eccentricity * e_anom.sin() - mean_anomaly;
        let f_prime = 1.0 - eccentricity * e_anom.cos();
        let next = e_anom - f / f_prime;
        if (next - e_anom).abs() < KEPLER_TOLERANCE {
            return next;
        }
        e_anom = next;
    }
    e_anom
}

/// `tan(ν/2) = sqrt((1+e)/(1-e)) · tan(E/2)`
pub fn true_anomaly_from_eccentric(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    let factor = ((1.0 + eccentricity) / (1.0 - eccentricity)).sqrt();
    2.0 * (factor * (eccentric_anomaly / 2.0).tan()).atan()
}

/// Inverse of the true anomaly relation, normalized into `[0, 2π)`.
pub fn mean_anomaly_from_true(true_anomaly: f64, eccentricity: f64) -> f64 {
    if eccentricity < 1e-6 {
        return true_anomaly.rem_euclid(TWO_PI);
    }

    let factor = ((1.0 - eccentricity) / (1.0 + eccentricity)).sqrt();
    let e_anom = 2.0 * (factor * (true_anomaly / 2.0).tan()).atan();
    let mean = e_anom - eccentricity * e_anom.sin();
    let mean = mean.rem_euclid(TWO_PI);
    // rem_euclid can round up to exactly 2π for tiny negative inputs
    if mean >= TWO_PI {
        0.0
    } else {
        mean
    }
}

/// Orbital radius at a given true anomaly: `a(1 - e²) / (1 + e·cos ν)`.
pub fn orbital_radius(semi_major_axis: f64, eccentricity: f64, true_anomaly: f64) -> f64 {
    semi_major_axis * (1.0 - eccentricity * eccentricity)
        / (1.0 + eccentricity * true_anomaly.cos())
}

/// Phase along the orbit (degrees, `[0, 360)`) and the instantaneous angular
/// rate (degrees per second) `elapsed_sec` after periapsis passage.
pub fn elliptical_orbit_position(
    elapsed_sec: f64,
    period_sec: f64,
    eccentricity: f64,
    periapsis_deg: f64,
) -> (f64, f64) {
    let mean_motion = TWO_PI / period_sec;

    if eccentricity < CIRCULAR_EPSILON {
        let phase = (mean_motion * elapsed_sec).to_degrees() + periapsis_deg;
        return (phase.rem_euclid(360.0), 360.0 / period_sec);
    }

    let mean_anomaly = mean_motion * elapsed_sec;
    let e_anom = solve_kepler(mean_anomaly, eccentricity);
    let nu = true_anomaly_from_eccentric(e_anom, eccentricity);

    let phase = (nu.to_degrees() + periapsis_deg).rem_euclid(360.0);

    let denom = (1.0 + eccentricity * nu.cos()).powi(2);
    let rate = mean_motion * (1.0 - eccentricity * eccentricity).sqrt() / denom;

    (phase, rate.to_degrees())
}
