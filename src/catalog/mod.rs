mod cache;
mod error;
mod parsing;
mod record;

pub use cache::TleCache;
pub use error::CatalogError;
pub use parsing::{parse_multi_tle, parse_tle_lines, TleText};
pub use record::SatelliteRecord;

/// Satellites offered for tracking, with their NORAD catalog numbers.
pub const KNOWN_SATELLITES: &[(&str, u64)] = &[
    ("ISS", 25544),
    ("HUBBLE", 20580),
    ("TIANGONG", 48274),
    ("STARLINK-1007", 44713),
];

pub fn norad_id_for(name: &str) -> Option<u64> {
    KNOWN_SATELLITES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .map(|(_, id)| *id)
}
