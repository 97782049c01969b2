pub mod constants;
mod frames;
mod kepler;
mod rates;
mod time;

pub use constants::CIRCULAR_EPSILON;
pub use frames::{ecef_to_geodetic, eci_to_ecef, Geodetic};
pub use kepler::{
    elliptical_orbit_position, mean_anomaly_from_true, orbital_radius, solve_kepler,
    true_anomaly_from_eccentric,
};
pub use rates::{
    altitude_from_period, eqx_rate_deg_per_day, motor_rates, period_from_altitude,
    shortest_delta, wrap_to_180, MotorRates,
};
pub use time::{gmst, julian_day_number, tle_epoch_unix, TleEpoch};
