// WGS-84
pub const EARTH_RADIUS_KM: f64 = 6378.137;
pub const EARTH_FLATTENING: f64 = 1.0 / 298.257_223_563;
pub const EARTH_MU_KM3_S2: f64 = 398_600.4418;
pub const EARTH_J2: f64 = 0.001_082_63;

pub const SECONDS_PER_DAY: i64 = 86_400;
pub const EARTH_ROTATION_DEG_DAY: f64 = 360.0;

// WGS-72 constants used by the SGP4 element model
pub const CK2: f64 = 5.413_080e-4;
pub const XKE: f64 = 7.436_691_61e-2;
pub const XKMPER_KM: f64 = 6378.135;
pub const MINUTES_PER_DAY: f64 = 1440.0;

/// 2000-01-01T12:00:00Z
pub const J2000_UNIX: i64 = 946_728_000;

/// Eccentricities below this are propagated as circular.
pub const CIRCULAR_EPSILON: f64 = 0.001;

pub const TWO_PI: f64 = std::f64::consts::TAU;
