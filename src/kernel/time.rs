use super::constants::{J2000_UNIX, SECONDS_PER_DAY};

const UNIX_EPOCH_JDN: i64 = 2_440_588;

// GMST = 280.46061837° + 360.98564736629°·d, with d in days since J2000.
const GMST_AT_J2000_DEG: f64 = 280.460_618_37;
const SIDEREAL_EXCESS_DEG_PER_DAY: f64 = 0.985_647_366_29;
const SIDEREAL_DEG_PER_DAY: f64 = 360.0 + SIDEREAL_EXCESS_DEG_PER_DAY;

/// TLE epoch as whole unix seconds plus the sub-second remainder.
///
/// Keeping the integer part separate lets callers difference two instants
/// exactly before converting to floating point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TleEpoch {
    pub seconds: i64,
    pub fraction: f64,
}

impl TleEpoch {
    pub fn minutes_until(&self, unix: i64) -> f64 {
        ((unix - self.seconds) as f64 - self.fraction) / 60.0
    }
}

/// Gregorian calendar date to Julian day number (integer arithmetic only).
pub fn julian_day_number(year: i64, month: i64, day: i64) -> i64 {
    let a = (14 - month) / 12;
    let y = year + 4800 - a;
    let m = month + 12 * a - 3;
    day + (153 * m + 2) / 5 + 365 * y + y / 4 - y / 100 + y / 400 - 32_045
}

/// Converts a TLE epoch (4-digit year, 1-based fractional day of year).
pub fn tle_epoch_unix(year: i32, day_of_year: f64) -> TleEpoch {
    let jan1_days = julian_day_number(i64::from(year), 1, 1) - UNIX_EPOCH_JDN;

    let offset = day_of_year - 1.0;
    let whole_days = offset.floor();
    let day_seconds = (offset - whole_days) * SECONDS_PER_DAY as f64;
    let whole_seconds = day_seconds.floor();

    TleEpoch {
        seconds: (jan1_days + whole_days as i64) * SECONDS_PER_DAY + whole_seconds as i64,
        fraction: day_seconds - whole_seconds,
    }
}

/// Greenwich mean sidereal time in radians, `[0, 2π)`.
///
/// The whole-day count only contributes its excess over 360°/day, so no large
/// product of a day count and the sidereal rate is ever formed.
pub fn gmst(unix: i64) -> f64 {
    let since_j2000 = unix - J2000_UNIX;
    let days = since_j2000.div_euclid(SECONDS_PER_DAY);
    let remainder = since_j2000.rem_euclid(SECONDS_PER_DAY);

    let whole = (SIDEREAL_EXCESS_DEG_PER_DAY * days as f64).rem_euclid(360.0);
    let partial = SIDEREAL_DEG_PER_DAY * (remainder as f64 / SECONDS_PER_DAY as f64);

    (GMST_AT_J2000_DEG + whole + partial)
        .rem_euclid(360.0)
        .to_radians()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_epoch_day_number() {
        assert_eq!(julian_day_number(1970, 1, 1), UNIX_EPOCH_JDN);
        assert_eq!(julian_day_number(2000, 1, 1), 2_451_545);
    }

    #[test]
    fn gmst_at_j2000() {
        let deg = gmst(J2000_UNIX).to_degrees();
        assert!((deg - GMST_AT_J2000_DEG).abs() < 1e-9);
    }

    #[test]
    fn gmst_advances_by_sidereal_excess_per_day() {
        let a = gmst(J2000_UNIX + 10 * SECONDS_PER_DAY).to_degrees();
        let b = gmst(J2000_UNIX + 11 * SECONDS_PER_DAY).to_degrees();
        assert!(((b - a).rem_euclid(360.0) - SIDEREAL_EXCESS_DEG_PER_DAY).abs() < 1e-9);
    }

    #[test]
    fn gmst_matches_direct_formula() {
        // 2024-03-20T12:34:56Z
        let unix = 1_710_938_096;
        let d = (unix - J2000_UNIX) as f64 / SECONDS_PER_DAY as f64;
        let direct = (GMST_AT_J2000_DEG + SIDEREAL_DEG_PER_DAY * d).rem_euclid(360.0);
        let split = gmst(unix).to_degrees();
        assert!((direct - split).abs() < 1e-6, "direct={direct} split={split}");
    }

    #[test]
    fn gmst_before_j2000_is_normalized() {
        let rad = gmst(J2000_UNIX - 12_345);
        assert!((0.0..std::f64::consts::TAU).contains(&rad));
    }

    #[test]
    fn tle_epoch_splits_integer_and_fraction() {
        let epoch = tle_epoch_unix(2020, 194.886_122_69);
        // 2020-07-12T21:16:01Z
        assert_eq!(epoch.seconds, 1_594_588_561);
        assert!(epoch.fraction >= 0.0 && epoch.fraction < 1.0);
        assert!(epoch.minutes_until(epoch.seconds).abs() < 1.0 / 60.0);
    }

    #[test]
    fn tle_epoch_day_one_is_new_year() {
        let epoch = tle_epoch_unix(2024, 1.0);
        assert_eq!(epoch.seconds, 1_704_067_200);
        assert_eq!(epoch.fraction, 0.0);
    }
}
