use crate::kernel::constants::TWO_PI;
use crate::kernel::{elliptical_orbit_position, mean_anomaly_from_true, motor_rates, MotorRates};

use super::types::{DriveAngles, OrbitalParameters, Sample};
use super::Propagate;

/// Manual-orbit propagator anchored at the start of a session.
///
/// The anchors are session-relative, not an absolute zero: `angles_at`
/// returns the anchor plus the motion accumulated since `start_unix`.
#[derive(Debug, Clone)]
pub struct KeplerPropagator {
    params: OrbitalParameters,
    rates: MotorRates,
    start_unix: i64,
    // Seconds already elapsed at `start_unix`; non-zero after an elliptical backdate.
    start_offset_sec: f64,
    start_aov: f64,
    start_eqx: f64,
}

impl KeplerPropagator {
    pub fn new(params: OrbitalParameters, anchors: DriveAngles, start_unix: i64) -> Self {
        Self {
            rates: motor_rates(params.altitude_km(), params.inclination_deg()),
            params,
            start_unix,
            start_offset_sec: 0.0,
            start_aov: anchors.aov_deg,
            start_eqx: anchors.eqx_deg,
        }
    }

    /// Starts from `current` without a jump.
    ///
    /// Circular orbits simply anchor at the current angles. Elliptical orbits
    /// backdate the start so that the current AoV phase is reproduced as the
    /// true anomaly (plus periapsis) reached that long after periapsis.
    pub fn resume(params: OrbitalParameters, current: DriveAngles, now_unix: i64) -> Self {
        let mut propagator = Self::new(params, current, now_unix);
        if params.is_circular() {
            return propagator;
        }

        let true_anomaly = (current.aov_deg - params.periapsis_deg()).rem_euclid(360.0);
        let mean_anomaly = mean_anomaly_from_true(true_anomaly.to_radians(), params.eccentricity());
        let mean_motion = TWO_PI / propagator.rates.period_sec;

        propagator.start_offset_sec = mean_anomaly / mean_motion;
        propagator.start_aov =
            ((current.aov_deg - params.periapsis_deg()) / 360.0).floor() * 360.0;
        propagator
    }

    pub fn params(&self) -> &OrbitalParameters {
        &self.params
    }

    pub fn rates(&self) -> &MotorRates {
        &self.rates
    }

    pub fn start_unix(&self) -> i64 {
        self.start_unix
    }

    pub fn nudge_aov(&mut self, delta_deg: f64) {
        self.start_aov += delta_deg;
    }

    pub fn nudge_eqx(&mut self, delta_deg: f64) {
        self.start_eqx += delta_deg;
    }

    fn elapsed(&self, unix: i64) -> f64 {
        (unix - self.start_unix) as f64 + self.start_offset_sec
    }
}

impl Propagate for KeplerPropagator {
    fn sample(&self, unix: i64) -> Sample {
        let elapsed = self.elapsed(unix);
        let linear = (unix - self.start_unix) as f64;

        let aov_deg = if self.params.is_circular() {
            self.start_aov + self.rates.aov_deg_per_sec * elapsed
        } else {
            let period = self.rates.period_sec;
            let (phase, _) = elliptical_orbit_position(
                elapsed,
                period,
                self.params.eccentricity(),
                self.params.periapsis_deg(),
            );
            // The phase wraps; whole orbits since periapsis are added back so
            // the angle keeps accumulating.
            let periapsis = self.params.periapsis_deg();
            let true_anomaly = (phase - periapsis).rem_euclid(360.0);
            let orbits = (elapsed / period).floor();
            self.start_aov + periapsis + 360.0 * orbits + true_anomaly
        };

        // Node motion is a constant rate in this mode, eccentric or not.
        let eqx_deg = self.start_eqx + self.rates.eqx_deg_per_sec * linear;

        Sample {
            angles: DriveAngles::new(aov_deg, eqx_deg),
            position: None,
        }
    }

    fn altitude_km(&self) -> f64 {
        self.params.altitude_km()
    }
}
