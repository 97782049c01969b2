use serde::{Deserialize, Serialize};

use crate::kernel::constants::{CK2, MINUTES_PER_DAY, TWO_PI, XKE, XKMPER_KM};
use crate::kernel::{
    ecef_to_geodetic, eci_to_ecef, gmst, solve_kepler, tle_epoch_unix, Geodetic, TleEpoch,
};

use super::error::ElementsError;
use super::types::{DriveAngles, Sample};
use super::Propagate;

/// Mean orbital elements as they appear in a TLE (degrees, rev/day).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanElements {
    pub epoch_year: i32,
    pub epoch_day: f64,
    pub bstar: f64,
    pub inclination_deg: f64,
    pub raan_deg: f64,
    pub eccentricity: f64,
    pub arg_perigee_deg: f64,
    pub mean_anomaly_deg: f64,
    pub mean_motion_rev_day: f64,
}

/// Position and drive angles at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundTrack {
    pub t_min: f64,
    pub eci_km: [f64; 3],
    pub radius_km: f64,
    pub gmst_rad: f64,
    pub geodetic: Geodetic,
    pub angles: DriveAngles,
}

#[derive(Debug, Clone, Copy)]
struct SecularState {
    raan: f64,
    argp: f64,
    nu: f64,
    radius_er: f64,
}

/// Reduced-fidelity SGP4: J2 secular drift of the node and perigee on top of
/// a two-body Kepler solve. No drag or deep-space terms.
#[derive(Debug, Clone)]
pub struct Sgp4Propagator {
    elements: MeanElements,
    epoch: TleEpoch,
    inclination: f64,
    raan0: f64,
    argp0: f64,
    mean_anomaly0: f64,
    eccentricity: f64,
    // rad/min, Brouwer mean motion
    mean_motion: f64,
    // earth radii
    semi_major_axis: f64,
    raan_dot: f64,
    argp_dot: f64,
}

impl Sgp4Propagator {
    pub fn new(elements: MeanElements) -> Result<Self, ElementsError> {
        if !(elements.mean_motion_rev_day > 0.0) {
            return Err(ElementsError::MeanMotion(elements.mean_motion_rev_day));
        }
        if !(0.0..1.0).contains(&elements.eccentricity) {
            return Err(ElementsError::Eccentricity(elements.eccentricity));
        }

        let inclination = elements.inclination_deg.to_radians();
        let ecc = elements.eccentricity;
        let n0 = elements.mean_motion_rev_day * TWO_PI / MINUTES_PER_DAY;

        // Recover the Brouwer semi-major axis and mean motion once.
        let cosio = inclination.cos();
        let theta2 = cosio * cosio;
        let x3thm1 = 3.0 * theta2 - 1.0;
        let betao2 = 1.0 - ecc * ecc;
        let betao = betao2.sqrt();

        let a1 = (XKE / n0).powf(2.0 / 3.0);
        let del1 = 1.5 * CK2 * x3thm1 / (a1 * a1 * betao * betao2);
        let ao = a1 * (1.0 - del1 * (1.0 / 3.0 + del1 * (1.0 + 134.0 / 81.0 * del1)));
        let delo = 1.5 * CK2 * x3thm1 / (ao * ao * betao * betao2);
        let mean_motion = n0 / (1.0 + delo);
        let semi_major_axis = ao / (1.0 - delo);

        let secular = CK2 / (semi_major_axis * semi_major_axis * betao2 * betao2) * mean_motion;

        Ok(Self {
            epoch: tle_epoch_unix(elements.epoch_year, elements.epoch_day),
            inclination,
            raan0: elements.raan_deg.to_radians(),
            argp0: elements.arg_perigee_deg.to_radians(),
            mean_anomaly0: elements.mean_anomaly_deg.to_radians(),
            eccentricity: ecc,
            mean_motion,
            semi_major_axis,
            raan_dot: -1.5 * secular * cosio,
            argp_dot: 0.75 * secular * (5.0 * theta2 - 1.0),
            elements,
        })
    }

    pub fn elements(&self) -> &MeanElements {
        &self.elements
    }

    pub fn semi_major_axis_km(&self) -> f64 {
        self.semi_major_axis * XKMPER_KM
    }

    /// Minutes between the TLE epoch and `unix`.
    pub fn minutes_since_epoch(&self, unix: i64) -> f64 {
        self.epoch.minutes_until(unix)
    }

    fn secular_state(&self, t_min: f64) -> SecularState {
        let raan = self.raan0 + self.raan_dot * t_min;
        let argp = self.argp0 + self.argp_dot * t_min;
        let mean_anomaly = self.mean_anomaly0 + self.mean_motion * t_min;

        let e = self.eccentricity;
        let e_anom = solve_kepler(mean_anomaly, e);
        let (sin_e, cos_e) = e_anom.sin_cos();
        let nu = ((1.0 - e * e).sqrt() * sin_e).atan2(cos_e - e);

        SecularState {
            raan,
            argp,
            nu,
            radius_er: self.semi_major_axis * (1.0 - e * cos_e),
        }
    }

    fn to_eci(&self, state: &SecularState) -> [f64; 3] {
        let u = state.argp + state.nu;
        let x_orb = state.radius_er * u.cos();
        let y_orb = state.radius_er * u.sin();

        let (sin_raan, cos_raan) = state.raan.sin_cos();
        let (sin_inc, cos_inc) = self.inclination.sin_cos();

        [
            (x_orb * cos_raan - y_orb * cos_inc * sin_raan) * XKMPER_KM,
            (x_orb * sin_raan + y_orb * cos_inc * cos_raan) * XKMPER_KM,
            y_orb * sin_inc * XKMPER_KM,
        ]
    }

    /// Inertial position in km, `t_min` minutes after epoch.
    pub fn propagate(&self, t_min: f64) -> [f64; 3] {
        self.to_eci(&self.secular_state(t_min))
    }

    /// Ground position and drive angles at `unix`.
    ///
    /// The drive angles come straight from the orbital-plane geometry, not
    /// from latitude/longitude: AoV is the argument of latitude and EQX the
    /// Earth-fixed longitude of the ascending node.
    pub fn ground_track(&self, unix: i64) -> GroundTrack {
        let t_min = self.minutes_since_epoch(unix);
        let state = self.secular_state(t_min);
        let eci = self.to_eci(&state);
        let theta = gmst(unix);

        let [x, y, z] = eci_to_ecef(eci[0], eci[1], eci[2], theta);
        let geodetic = ecef_to_geodetic(x, y, z);

        let aov_deg = (state.nu + state.argp).to_degrees().rem_euclid(360.0);
        let eqx_deg = (state.raan - theta).to_degrees().rem_euclid(360.0);

        GroundTrack {
            t_min,
            eci_km: eci,
            radius_km: state.radius_er * XKMPER_KM,
            gmst_rad: theta,
            geodetic,
            angles: DriveAngles::new(aov_deg, eqx_deg),
        }
    }
}

impl Propagate for Sgp4Propagator {
    fn sample(&self, unix: i64) -> Sample {
        let track = self.ground_track(unix);
        Sample {
            angles: track.angles,
            position: Some(track.geodetic),
        }
    }

    fn altitude_km(&self) -> f64 {
        self.semi_major_axis_km() * (1.0 - self.eccentricity) - XKMPER_KM
    }
}
