use serde::{Deserialize, Serialize};

use super::constants::{EARTH_FLATTENING, EARTH_RADIUS_KM};

const GEODETIC_ITERATIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Geodetic {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

/// Rotates an inertial position about the polar axis by GMST.
pub fn eci_to_ecef(x: f64, y: f64, z: f64, gmst: f64) -> [f64; 3] {
    let (sin_g, cos_g) = gmst.sin_cos();
    [cos_g * x + sin_g * y, -sin_g * x + cos_g * y, z]
}

/// WGS-84 inversion with a fixed number of latitude refinements.
pub fn ecef_to_geodetic(x: f64, y: f64, z: f64) -> Geodetic {
    let e2 = 2.0 * EARTH_FLATTENING - EARTH_FLATTENING * EARTH_FLATTENING;

    let lon = y.atan2(x);
    let p = (x * x + y * y).sqrt();
    let mut lat = z.atan2(p * (1.0 - e2));

    for _ in 0..GEODETIC_ITERATIONS {
        let n = prime_vertical_radius(lat, e2);
        let alt = p / lat.cos() - n;
        lat = z.atan2(p * (1.0 - e2 * n / (n + alt)));
    }

    let n = prime_vertical_radius(lat, e2);
    Geodetic {
        latitude_deg: lat.to_degrees(),
        longitude_deg: lon.to_degrees(),
        altitude_km: p / lat.cos() - n,
    }
}

fn prime_vertical_radius(lat: f64, e2: f64) -> f64 {
    let sin_lat = lat.sin();
    EARTH_RADIUS_KM / (1.0 - e2 * sin_lat * sin_lat).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_ecef(lat_deg: f64, lon_deg: f64, alt_km: f64) -> [f64; 3] {
        let e2 = 2.0 * EARTH_FLATTENING - EARTH_FLATTENING * EARTH_FLATTENING;
        let (lat, lon) = (lat_deg.to_radians(), lon_deg.to_radians());
        let n = prime_vertical_radius(lat, e2);
        [
            (n + alt_km) * lat.cos() * lon.cos(),
            (n + alt_km) * lat.cos() * lon.sin(),
            (n * (1.0 - e2) + alt_km) * lat.sin(),
        ]
    }

    #[test]
    fn geodetic_inversion_recovers_surface_points() {
        for &(lat, lon, alt) in &[
            (0.0, 0.0, 0.0),
            (51.6, -0.1, 420.0),
            (-33.9, 151.2, 35_786.0),
            (78.0, 15.6, 0.5),
        ] {
            let [x, y, z] = to_ecef(lat, lon, alt);
            let g = ecef_to_geodetic(x, y, z);
            assert!((g.latitude_deg - lat).abs() < 1e-6, "lat {lat} -> {g:?}");
            assert!((g.longitude_deg - lon).abs() < 1e-9, "lon {lon} -> {g:?}");
            assert!((g.altitude_km - alt).abs() < 1e-3, "alt {alt} -> {g:?}");
        }
    }

    #[test]
    fn eci_rotation_preserves_radius_and_z() {
        let [x, y, z] = eci_to_ecef(4000.0, 3000.0, 5000.0, 1.234);
        assert!(((x * x + y * y).sqrt() - 5000.0).abs() < 1e-9);
        assert_eq!(z, 5000.0);
    }

    #[test]
    fn eci_rotation_by_quarter_turn() {
        let [x, y, _] = eci_to_ecef(1.0, 0.0, 0.0, std::f64::consts::FRAC_PI_2);
        assert!(x.abs() < 1e-12);
        assert!((y + 1.0).abs() < 1e-12);
    }
}
