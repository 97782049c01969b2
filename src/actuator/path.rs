use crate::kernel::wrap_to_180;

/// Absolute target reaching `target_deg` (read modulo 360) from `current_deg`
/// by the shorter way round, keeping the accumulated turn count.
///
/// The resulting travel is always within `[-180, 180)`.
pub fn shortest_path_target(current_deg: f64, target_deg: f64) -> f64 {
    let wrapped = current_deg.rem_euclid(360.0);
    current_deg + wrap_to_180(target_deg - wrapped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn congruent(a: f64, b: f64) -> bool {
        let d = (a - b).rem_euclid(360.0);
        d < 1e-9 || 360.0 - d < 1e-9
    }

    #[test]
    fn crosses_zero_forward_and_back() {
        assert!((shortest_path_target(358.0, 2.0) - 362.0).abs() < 1e-9);
        assert!((shortest_path_target(10.0, 350.0) - (-10.0)).abs() < 1e-9);
        assert!((shortest_path_target(725.0, 0.0) - 720.0).abs() < 1e-9);
    }

    #[test]
    fn travel_is_bounded_for_any_inputs() {
        let currents = [-1234.5, -360.0, -0.25, 0.0, 17.0, 359.9, 360.0, 1085.0, 99_999.0];
        let targets = [-725.0, -180.0, -1.0, 0.0, 90.0, 179.99, 180.0, 359.0, 1_000_000.0];
        for &current in &currents {
            for &target in &targets {
                let next = shortest_path_target(current, target);
                let delta = next - current;
                assert!((-180.0..=180.0).contains(&delta), "{current} -> {target}: {delta}");
                assert!(congruent(next, target), "{current} -> {target}: {next}");
            }
        }
    }
}
