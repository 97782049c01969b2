use serde::{Deserialize, Serialize};

use super::error::ParameterError;
use crate::kernel::{Geodetic, CIRCULAR_EPSILON};

pub const ALTITUDE_RANGE_KM: (f64, f64) = (200.0, 2000.0);
pub const INCLINATION_RANGE_DEG: (f64, f64) = (0.0, 180.0);
pub const ECCENTRICITY_RANGE: (f64, f64) = (0.0, 0.9);

/// Where the mechanism should point. Both angles accumulate across
/// revolutions and are never wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DriveAngles {
    pub aov_deg: f64,
    pub eqx_deg: f64,
}

impl DriveAngles {
    pub fn new(aov_deg: f64, eqx_deg: f64) -> Self {
        Self { aov_deg, eqx_deg }
    }

    /// Whole revolutions completed by each axis.
    pub fn turns(&self) -> (i64, i64) {
        (
            (self.aov_deg / 360.0).floor() as i64,
            (self.eqx_deg / 360.0).floor() as i64,
        )
    }
}

/// One propagation result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub angles: DriveAngles,
    pub position: Option<Geodetic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitalParameters {
    altitude_km: f64,
    inclination_deg: f64,
    eccentricity: f64,
    periapsis_deg: f64,
    revolution_count: u64,
}

impl Default for OrbitalParameters {
    fn default() -> Self {
        Self {
            altitude_km: 400.0,
            inclination_deg: 51.6,
            eccentricity: 0.0,
            periapsis_deg: 0.0,
            revolution_count: 0,
        }
    }
}

impl OrbitalParameters {
    pub fn new(
        altitude_km: f64,
        inclination_deg: f64,
        eccentricity: f64,
        periapsis_deg: f64,
    ) -> Result<Self, ParameterError> {
        let mut params = Self::default();
        params.set_altitude_km(altitude_km)?;
        params.set_inclination_deg(inclination_deg)?;
        params.set_eccentricity(eccentricity)?;
        params.set_periapsis_deg(periapsis_deg)?;
        Ok(params)
    }

    pub fn altitude_km(&self) -> f64 {
        self.altitude_km
    }

    pub fn inclination_deg(&self) -> f64 {
        self.inclination_deg
    }

    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }

    pub fn periapsis_deg(&self) -> f64 {
        self.periapsis_deg
    }

    pub fn revolution_count(&self) -> u64 {
        self.revolution_count
    }

    pub fn is_circular(&self) -> bool {
        self.eccentricity < CIRCULAR_EPSILON
    }

    pub fn set_altitude_km(&mut self, value: f64) -> Result<(), ParameterError> {
        self.altitude_km = check_range("altitude_km", value, ALTITUDE_RANGE_KM)?;
        Ok(())
    }

    pub fn set_inclination_deg(&mut self, value: f64) -> Result<(), ParameterError> {
        self.inclination_deg = check_range("inclination_deg", value, INCLINATION_RANGE_DEG)?;
        Ok(())
    }

    pub fn set_eccentricity(&mut self, value: f64) -> Result<(), ParameterError> {
        self.eccentricity = check_range("eccentricity", value, ECCENTRICITY_RANGE)?;
        Ok(())
    }

    pub fn set_periapsis_deg(&mut self, value: f64) -> Result<(), ParameterError> {
        if !value.is_finite() {
            return Err(ParameterError::NotFinite("periapsis_deg"));
        }
        self.periapsis_deg = value.rem_euclid(360.0);
        if self.periapsis_deg >= 360.0 {
            self.periapsis_deg = 0.0;
        }
        Ok(())
    }

    /// The counter only moves forward.
    pub fn add_revolutions(&mut self, count: u64) {
        self.revolution_count = self.revolution_count.saturating_add(count);
    }
}

fn check_range(field: &'static str, value: f64, (min, max): (f64, f64)) -> Result<f64, ParameterError> {
    if !value.is_finite() {
        return Err(ParameterError::NotFinite(field));
    }
    if value < min || value > max {
        return Err(ParameterError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_values() {
        let mut params = OrbitalParameters::default();
        assert!(params.set_altitude_km(50.0).is_err());
        assert!(params.set_eccentricity(0.95).is_err());
        assert!(params.set_inclination_deg(f64::NAN).is_err());
        assert_eq!(params, OrbitalParameters::default());
    }

    #[test]
    fn periapsis_is_normalized() {
        let params = OrbitalParameters::new(500.0, 98.0, 0.1, -30.0).unwrap();
        assert_eq!(params.periapsis_deg(), 330.0);
    }

    #[test]
    fn small_eccentricity_is_circular() {
        let params = OrbitalParameters::new(500.0, 98.0, 0.0005, 0.0).unwrap();
        assert!(params.is_circular());
    }

    #[test]
    fn turns_floor_negative_angles() {
        assert_eq!(DriveAngles::new(-0.5, 725.0).turns(), (-1, 2));
    }
}
