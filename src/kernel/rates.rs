use super::constants::{EARTH_J2, EARTH_MU_KM3_S2, EARTH_RADIUS_KM, SECONDS_PER_DAY, TWO_PI};

const SIDEREAL_DEG_PER_DAY: f64 = 360.985_647_366_29;

/// Drive rates for a circular orbit at a given altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorRates {
    pub aov_deg_per_sec: f64,
    pub eqx_deg_per_sec: f64,
    pub eqx_deg_per_day: f64,
    pub period_sec: f64,
}

/// Kepler's third law, `T = 2π·sqrt(a³/μ)`.
pub fn period_from_altitude(altitude_km: f64) -> f64 {
    let a = altitude_km + EARTH_RADIUS_KM;
    TWO_PI * (a.powi(3) / EARTH_MU_KM3_S2).sqrt()
}

pub fn altitude_from_period(period_sec: f64) -> f64 {
    let a = (EARTH_MU_KM3_S2 * period_sec * period_sec / (TWO_PI * TWO_PI)).cbrt();
    a - EARTH_RADIUS_KM
}

/// Longitude rate of the ascending node in the Earth-fixed frame.
///
/// J2 nodal regression minus Earth's sidereal rotation, the same quantity
/// the TLE model derives as `raan(t) - gmst(t)`.
pub fn eqx_rate_deg_per_day(altitude_km: f64, inclination_deg: f64) -> f64 {
    let a = altitude_km + EARTH_RADIUS_KM;
    let n = (EARTH_MU_KM3_S2 / a.powi(3)).sqrt();
    let ratio = EARTH_RADIUS_KM / a;
    let node_rad_s = -1.5 * n * EARTH_J2 * ratio * ratio * inclination_deg.to_radians().cos();
    node_rad_s.to_degrees() * SECONDS_PER_DAY as f64 - SIDEREAL_DEG_PER_DAY
}

pub fn motor_rates(altitude_km: f64, inclination_deg: f64) -> MotorRates {
    let period_sec = period_from_altitude(altitude_km);
    let eqx_deg_per_day = eqx_rate_deg_per_day(altitude_km, inclination_deg);
    MotorRates {
        aov_deg_per_sec: 360.0 / period_sec,
        eqx_deg_per_sec: eqx_deg_per_day / SECONDS_PER_DAY as f64,
        eqx_deg_per_day,
        period_sec,
    }
}

/// Wraps an angle difference into `[-180, 180)`.
pub fn wrap_to_180(deg: f64) -> f64 {
    (deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Signed shortest rotation taking `from` onto `to`, both read modulo 360.
pub fn shortest_delta(from_deg: f64, to_deg: f64) -> f64 {
    wrap_to_180(to_deg - from_deg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_orbit_period() {
        let minutes = period_from_altitude(400.0) / 60.0;
        assert!((minutes - 92.56).abs() < 0.05, "{minutes}");
    }

    #[test]
    fn altitude_period_round_trip() {
        for alt in [200.0, 420.0, 1200.0, 2000.0] {
            let back = altitude_from_period(period_from_altitude(alt));
            assert!((back - alt).abs() < 1e-6);
        }
    }

    #[test]
    fn prograde_node_drifts_west_faster_than_earth_turns() {
        let rate = eqx_rate_deg_per_day(400.0, 51.6);
        // ~5°/day regression on top of the sidereal day
        assert!(rate < -SIDEREAL_DEG_PER_DAY - 4.0 && rate > -SIDEREAL_DEG_PER_DAY - 6.0);
    }

    #[test]
    fn polar_orbit_has_no_regression() {
        let rate = eqx_rate_deg_per_day(800.0, 90.0);
        assert!((rate + SIDEREAL_DEG_PER_DAY).abs() < 1e-9);
    }

    #[test]
    fn motor_rates_are_consistent() {
        let rates = motor_rates(400.0, 51.6);
        assert!((rates.aov_deg_per_sec * rates.period_sec - 360.0).abs() < 1e-9);
        assert!((rates.eqx_deg_per_sec * 86_400.0 - rates.eqx_deg_per_day).abs() < 1e-9);
    }

    #[test]
    fn wrap_bounds() {
        assert_eq!(wrap_to_180(180.0), -180.0);
        assert_eq!(wrap_to_180(-180.0), -180.0);
        assert_eq!(wrap_to_180(190.0), -170.0);
        assert_eq!(wrap_to_180(-190.0), 170.0);
        assert_eq!(wrap_to_180(725.0), 5.0);
    }

    #[test]
    fn shortest_delta_crosses_zero() {
        assert_eq!(shortest_delta(358.0, 2.0), 4.0);
        assert_eq!(shortest_delta(10.0, 350.0), -20.0);
    }
}
