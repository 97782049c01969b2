use std::time::Duration;

use crate::kernel::constants::TWO_PI;
use crate::kernel::{mean_anomaly_from_true, motor_rates, solve_kepler, true_anomaly_from_eccentric};
use crate::propagate::{DriveAngles, OrbitalParameters};

/// Seconds to dead-reckon over since `saved_ts`.
///
/// Zero when nothing was saved, when the clock went backwards, or when the
/// gap is longer than `window`: a stale snapshot resumes from the current
/// read instead of commanding a large unattended move.
pub fn bounded_elapsed(now_unix: i64, saved_ts: i64, window: Duration) -> f64 {
    if saved_ts <= 0 {
        return 0.0;
    }
    let elapsed = now_unix.saturating_sub(saved_ts);
    if elapsed < 0 || elapsed as u64 > window.as_secs() {
        return 0.0;
    }
    elapsed as f64
}

pub fn extrapolate_circular(angle_deg: f64, rate_deg_per_sec: f64, elapsed_sec: f64) -> f64 {
    angle_deg + rate_deg_per_sec * elapsed_sec
}

/// Advances an AoV angle along an eccentric orbit by moving the mean anomaly
/// forward from the true anomaly implied by the current phase.
pub fn extrapolate_elliptical(aov_deg: f64, params: &OrbitalParameters, elapsed_sec: f64) -> f64 {
    let e = params.eccentricity();
    let period = motor_rates(params.altitude_km(), params.inclination_deg()).period_sec;

    let nu0 = (aov_deg - params.periapsis_deg()).rem_euclid(360.0).to_radians();
    let m0 = mean_anomaly_from_true(nu0, e);
    let m_total = m0 + TWO_PI / period * elapsed_sec;

    let turns = (m_total / TWO_PI).floor();
    let m_wrapped = m_total - turns * TWO_PI;
    let nu1 = true_anomaly_from_eccentric(solve_kepler(m_wrapped, e), e).rem_euclid(TWO_PI);

    aov_deg + (turns * TWO_PI + nu1 - nu0).to_degrees()
}

/// Where a manual orbit should be `elapsed_sec` after `saved` was recorded.
pub fn expected_angles(saved: DriveAngles, params: &OrbitalParameters, elapsed_sec: f64) -> DriveAngles {
    if elapsed_sec <= 0.0 {
        return saved;
    }
    let rates = motor_rates(params.altitude_km(), params.inclination_deg());
    let aov_deg = if params.is_circular() {
        extrapolate_circular(saved.aov_deg, rates.aov_deg_per_sec, elapsed_sec)
    } else {
        extrapolate_elliptical(saved.aov_deg, params, elapsed_sec)
    };
    DriveAngles::new(
        aov_deg,
        extrapolate_circular(saved.eqx_deg, rates.eqx_deg_per_sec, elapsed_sec),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(300);

    #[test]
    fn ten_seconds_at_four_degrees_per_second() {
        let now = 1_700_000_000;
        let elapsed = bounded_elapsed(now, now - 10, WINDOW);
        assert_eq!(elapsed, 10.0);
        let advanced = extrapolate_circular(350.0, 4.0, elapsed);
        assert_eq!(advanced, 390.0);
        assert_eq!((advanced - 350.0).rem_euclid(360.0), 40.0);
    }

    #[test]
    fn stale_snapshot_is_not_extrapolated() {
        let now = 1_700_000_000;
        assert_eq!(bounded_elapsed(now, now - 600, WINDOW), 0.0);
        assert_eq!(extrapolate_circular(123.0, 4.0, bounded_elapsed(now, now - 600, WINDOW)), 123.0);
        assert_eq!(bounded_elapsed(now, now - 300, WINDOW), 300.0);
    }

    #[test]
    fn backwards_clock_and_missing_timestamp() {
        assert_eq!(bounded_elapsed(1_000, 1_050, WINDOW), 0.0);
        assert_eq!(bounded_elapsed(1_000, 0, WINDOW), 0.0);
    }

    #[test]
    fn elliptical_full_period_is_one_turn() {
        let params = OrbitalParameters::new(1_000.0, 63.4, 0.3, 20.0).unwrap();
        let period = motor_rates(1_000.0, 63.4).period_sec;
        let advanced = extrapolate_elliptical(740.0, &params, period);
        assert!((advanced - 1_100.0).abs() < 1e-6, "{advanced}");
    }

    #[test]
    fn elliptical_moves_faster_near_periapsis() {
        let params = OrbitalParameters::new(1_000.0, 63.4, 0.3, 0.0).unwrap();
        let near = extrapolate_elliptical(0.0, &params, 60.0);
        let far = extrapolate_elliptical(180.0, &params, 60.0) - 180.0;
        assert!(near > far * 2.0, "near={near} far={far}");
    }

    #[test]
    fn expected_angles_use_orbit_rates() {
        let params = OrbitalParameters::new(400.0, 51.6, 0.0, 0.0).unwrap();
        let rates = motor_rates(400.0, 51.6);
        let saved = DriveAngles::new(10.0, 20.0);
        let out = expected_angles(saved, &params, 100.0);
        assert!((out.aov_deg - (10.0 + 100.0 * rates.aov_deg_per_sec)).abs() < 1e-9);
        assert!((out.eqx_deg - (20.0 + 100.0 * rates.eqx_deg_per_sec)).abs() < 1e-9);
        assert_eq!(expected_angles(saved, &params, 0.0), saved);
    }
}
