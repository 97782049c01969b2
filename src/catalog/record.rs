use std::time::Duration;

use serde::{Deserialize, Serialize};
use sgp4::Elements;

use crate::propagate::{ElementsError, MeanElements, Sgp4Propagator};

use super::error::CatalogError;
use super::parsing::{parse_epoch_field, TleText};

/// One satellite's element set plus when it was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteRecord {
    pub name: String,
    pub norad_id: u64,
    pub epoch_year: i32,
    pub epoch_day: f64,
    pub bstar: f64,
    pub inclination_deg: f64,
    pub raan_deg: f64,
    pub eccentricity: f64,
    pub arg_perigee_deg: f64,
    pub mean_anomaly_deg: f64,
    pub mean_motion_rev_day: f64,
    /// Unix seconds; 0 when never fetched.
    pub last_fetch: i64,
    pub line1: String,
    pub line2: String,
}

impl SatelliteRecord {
    /// Validates the lines (format and checksums) and extracts the elements.
    ///
    /// `fallback_name` is used when the set carries no name line.
    pub fn from_tle(
        tle: &TleText,
        fallback_name: Option<&str>,
        fetched_at: i64,
    ) -> Result<Self, CatalogError> {
        let elements = Elements::from_tle(
            tle.name.clone(),
            tle.line1.as_bytes(),
            tle.line2.as_bytes(),
        )?;
        let (epoch_year, epoch_day) = parse_epoch_field(&tle.line1)?;

        let name = tle
            .name
            .clone()
            .or_else(|| fallback_name.map(str::to_string))
            .unwrap_or_else(|| format!("NORAD {}", elements.norad_id));

        Ok(Self {
            name,
            norad_id: elements.norad_id,
            epoch_year,
            epoch_day,
            bstar: elements.drag_term,
            inclination_deg: elements.inclination,
            raan_deg: elements.right_ascension,
            eccentricity: elements.eccentricity,
            arg_perigee_deg: elements.argument_of_perigee,
            mean_anomaly_deg: elements.mean_anomaly,
            mean_motion_rev_day: elements.mean_motion,
            last_fetch: fetched_at,
            line1: tle.line1.clone(),
            line2: tle.line2.clone(),
        })
    }

    pub fn mean_elements(&self) -> MeanElements {
        MeanElements {
            epoch_year: self.epoch_year,
            epoch_day: self.epoch_day,
            bstar: self.bstar,
            inclination_deg: self.inclination_deg,
            raan_deg: self.raan_deg,
            eccentricity: self.eccentricity,
            arg_perigee_deg: self.arg_perigee_deg,
            mean_anomaly_deg: self.mean_anomaly_deg,
            mean_motion_rev_day: self.mean_motion_rev_day,
        }
    }

    pub fn propagator(&self) -> Result<Sgp4Propagator, ElementsError> {
        Sgp4Propagator::new(self.mean_elements())
    }

    pub fn age_secs(&self, now_unix: i64) -> Option<u64> {
        if self.last_fetch <= 0 {
            return None;
        }
        Some(now_unix.saturating_sub(self.last_fetch).max(0) as u64)
    }

    /// Stale records are still usable; callers only surface the age.
    pub fn is_stale(&self, now_unix: i64, stale_after: Duration) -> bool {
        match self.age_secs(now_unix) {
            Some(age) => age > stale_after.as_secs(),
            None => true,
        }
    }

    /// Coarse age for display: minutes, hours or days.
    pub fn age_label(&self, now_unix: i64) -> String {
        let Some(age) = self.age_secs(now_unix) else {
            return "never".to_string();
        };
        let unit = if age < 3_600 {
            60
        } else if age < 86_400 {
            3_600
        } else {
            86_400
        };
        humantime::format_duration(Duration::from_secs(age / unit * unit)).to_string()
    }
}
