mod error;
mod kepler;
mod sgp4_lite;
mod types;

pub use error::{ElementsError, ParameterError};
pub use kepler::KeplerPropagator;
pub use sgp4_lite::{GroundTrack, MeanElements, Sgp4Propagator};
pub use types::{
    DriveAngles, OrbitalParameters, Sample, ALTITUDE_RANGE_KM, ECCENTRICITY_RANGE,
    INCLINATION_RANGE_DEG,
};

/// Source of drive angles over time.
pub trait Propagate {
    fn sample(&self, unix: i64) -> Sample;

    fn angles_at(&self, unix: i64) -> DriveAngles {
        self.sample(unix).angles
    }

    fn altitude_km(&self) -> f64;
}

/// The propagator a session is currently driven by.
#[derive(Debug, Clone)]
pub enum Propagator {
    Kepler(KeplerPropagator),
    Sgp4(Box<Sgp4Propagator>),
}

impl Propagator {
    pub fn is_satellite(&self) -> bool {
        matches!(self, Propagator::Sgp4(_))
    }
}

impl Propagate for Propagator {
    fn sample(&self, unix: i64) -> Sample {
        match self {
            Propagator::Kepler(p) => p.sample(unix),
            Propagator::Sgp4(p) => p.sample(unix),
        }
    }

    fn altitude_km(&self) -> f64 {
        match self {
            Propagator::Kepler(p) => p.altitude_km(),
            Propagator::Sgp4(p) => p.altitude_km(),
        }
    }
}
