use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::propagate::{DriveAngles, OrbitalParameters, ParameterError};

pub const SNAPSHOT_MAGIC: [u8; 4] = *b"ORRY";
pub const SNAPSHOT_VERSION: u8 = 1;
pub const SNAPSHOT_LEN: usize = 63;
pub const NAME_LEN: usize = 16;

const CHECKSUM_AT: usize = SNAPSHOT_LEN - 1;

#[derive(Debug, Error, PartialEq)]
pub enum SnapshotError {
    #[error("snapshot is {found} bytes, expected {expected}")]
    Length { expected: usize, found: usize },
    #[error("bad magic {0:02x?}")]
    Magic([u8; 4]),
    #[error("unsupported snapshot version {0}")]
    Version(u8),
    #[error("checksum mismatch: stored {stored:#04x}, computed {computed:#04x}")]
    Checksum { stored: u8, computed: u8 },
    #[error("unknown mode id {0}")]
    Mode(u8),
    #[error("satellite name is not valid UTF-8")]
    Name,
    #[error("{field} is not finite")]
    NonFinite { field: &'static str },
}

/// Which propagator the device was following.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SnapshotMode {
    Orbit,
    Sgp4,
}

impl SnapshotMode {
    fn id(self) -> u8 {
        match self {
            SnapshotMode::Orbit => 0,
            SnapshotMode::Sgp4 => 1,
        }
    }

    fn from_id(id: u8) -> Result<Self, SnapshotError> {
        match id {
            0 => Ok(SnapshotMode::Orbit),
            1 => Ok(SnapshotMode::Sgp4),
            other => Err(SnapshotError::Mode(other)),
        }
    }
}

/// Everything needed to put the mechanism back where it belongs.
///
/// Orbital parameters are stored single precision, as on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: i64,
    pub aov_deg: f64,
    pub eqx_deg: f64,
    pub altitude_km: f32,
    pub inclination_deg: f32,
    pub eccentricity: f32,
    pub periapsis_deg: f32,
    pub mode: SnapshotMode,
    pub satellite: Option<String>,
}

impl Snapshot {
    pub fn new(
        timestamp: i64,
        angles: DriveAngles,
        params: &OrbitalParameters,
        mode: SnapshotMode,
        satellite: Option<&str>,
    ) -> Self {
        Self {
            timestamp,
            aov_deg: angles.aov_deg,
            eqx_deg: angles.eqx_deg,
            altitude_km: params.altitude_km() as f32,
            inclination_deg: params.inclination_deg() as f32,
            eccentricity: params.eccentricity() as f32,
            periapsis_deg: params.periapsis_deg() as f32,
            mode,
            satellite: satellite.map(|name| truncate_name(name).to_string()),
        }
    }

    pub fn angles(&self) -> DriveAngles {
        DriveAngles::new(self.aov_deg, self.eqx_deg)
    }

    /// Re-validates the stored parameters; a snapshot can be well formed and
    /// still carry values the setters would refuse.
    pub fn orbital_parameters(&self) -> Result<OrbitalParameters, ParameterError> {
        OrbitalParameters::new(
            f64::from(self.altitude_km),
            f64::from(self.inclination_deg),
            f64::from(self.eccentricity),
            f64::from(self.periapsis_deg),
        )
    }

    pub fn encode(&self) -> [u8; SNAPSHOT_LEN] {
        let mut out = [0u8; SNAPSHOT_LEN];
        out[0..4].copy_from_slice(&SNAPSHOT_MAGIC);
        out[4] = SNAPSHOT_VERSION;
        out[5..13].copy_from_slice(&self.timestamp.to_le_bytes());
        out[13..21].copy_from_slice(&self.aov_deg.to_le_bytes());
        out[21..29].copy_from_slice(&self.eqx_deg.to_le_bytes());
        out[29..33].copy_from_slice(&self.altitude_km.to_le_bytes());
        out[33..37].copy_from_slice(&self.inclination_deg.to_le_bytes());
        out[37..41].copy_from_slice(&self.eccentricity.to_le_bytes());
        out[41..45].copy_from_slice(&self.periapsis_deg.to_le_bytes());
        out[45] = self.mode.id();
        if let Some(name) = &self.satellite {
            let name = truncate_name(name).as_bytes();
            out[46..46 + name.len()].copy_from_slice(name);
        }
        out[CHECKSUM_AT] = checksum(&out[..CHECKSUM_AT]);
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
        if bytes.len() != SNAPSHOT_LEN {
            return Err(SnapshotError::Length {
                expected: SNAPSHOT_LEN,
                found: bytes.len(),
            });
        }

        let magic = array::<4>(bytes, 0);
        if magic != SNAPSHOT_MAGIC {
            return Err(SnapshotError::Magic(magic));
        }
        if bytes[4] != SNAPSHOT_VERSION {
            return Err(SnapshotError::Version(bytes[4]));
        }
        let computed = checksum(&bytes[..CHECKSUM_AT]);
        if bytes[CHECKSUM_AT] != computed {
            return Err(SnapshotError::Checksum {
                stored: bytes[CHECKSUM_AT],
                computed,
            });
        }

        let name_field = &bytes[46..46 + NAME_LEN];
        let name_len = name_field.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        let satellite = match name_len {
            0 => None,
            n => Some(
                std::str::from_utf8(&name_field[..n])
                    .map_err(|_| SnapshotError::Name)?
                    .to_string(),
            ),
        };

        let aov_deg = finite("aov_deg", f64::from_le_bytes(array(bytes, 13)))?;
        let eqx_deg = finite("eqx_deg", f64::from_le_bytes(array(bytes, 21)))?;

        Ok(Self {
            timestamp: i64::from_le_bytes(array(bytes, 5)),
            aov_deg,
            eqx_deg,
            altitude_km: f32::from_le_bytes(array(bytes, 29)),
            inclination_deg: f32::from_le_bytes(array(bytes, 33)),
            eccentricity: f32::from_le_bytes(array(bytes, 37)),
            periapsis_deg: f32::from_le_bytes(array(bytes, 41)),
            mode: SnapshotMode::from_id(bytes[45])?,
            satellite,
        })
    }
}

/// Sum of all bytes, modulo 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

fn finite(field: &'static str, value: f64) -> Result<f64, SnapshotError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SnapshotError::NonFinite { field })
    }
}

// Callers have already checked the overall length.
fn array<const N: usize>(bytes: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[at..at + N]);
    out
}

fn truncate_name(name: &str) -> &str {
    if name.len() <= NAME_LEN {
        return name;
    }
    let mut end = NAME_LEN;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        let params = OrbitalParameters::new(420.5, 51.5, 0.25, 90.0).unwrap();
        Snapshot::new(
            1_700_000_000,
            DriveAngles::new(1234.5678, -98.25),
            &params,
            SnapshotMode::Sgp4,
            Some("ISS"),
        )
    }

    #[test]
    fn layout_is_fixed() {
        let bytes = sample().encode();
        assert_eq!(&bytes[0..4], b"ORRY");
        assert_eq!(bytes[4], 1);
        assert_eq!(i64::from_le_bytes(bytes[5..13].try_into().unwrap()), 1_700_000_000);
        assert_eq!(f32::from_le_bytes(bytes[29..33].try_into().unwrap()), 420.5);
        assert_eq!(bytes[45], 1);
        assert_eq!(&bytes[46..50], b"ISS\0");
        let sum: u32 = bytes[..62].iter().map(|&b| u32::from(b)).sum();
        assert_eq!(bytes[62], (sum % 256) as u8);
    }

    #[test]
    fn decodes_what_it_encodes() {
        let snap = sample();
        let decoded = Snapshot::decode(&snap.encode()).unwrap();
        assert_eq!(decoded, snap);
        assert_eq!(decoded.orbital_parameters().unwrap().eccentricity(), 0.25);
    }

    #[test]
    fn blank_name_is_none() {
        let mut snap = sample();
        snap.satellite = None;
        snap.mode = SnapshotMode::Orbit;
        assert_eq!(Snapshot::decode(&snap.encode()).unwrap().satellite, None);
    }

    #[test]
    fn long_names_are_cut_on_char_boundary() {
        let params = OrbitalParameters::default();
        let snap = Snapshot::new(0, DriveAngles::default(), &params, SnapshotMode::Sgp4, Some("STARLINK-1007-ÆØÅ-EXTRA"));
        let name = snap.satellite.clone().unwrap();
        assert!(name.len() <= NAME_LEN);
        assert!(name.starts_with("STARLINK-1007-"));
        assert_eq!(Snapshot::decode(&snap.encode()).unwrap().satellite, Some(name));
    }

    #[test]
    fn any_single_byte_flip_is_rejected() {
        let bytes = sample().encode();
        for i in 0..SNAPSHOT_LEN {
            let mut corrupt = bytes;
            corrupt[i] ^= 0x5a;
            assert!(Snapshot::decode(&corrupt).is_err(), "flip at {i} accepted");
        }
    }

    #[test]
    fn unknown_version_and_mode_are_rejected() {
        let mut bytes = sample().encode();
        bytes[4] = 2;
        bytes[62] = checksum(&bytes[..62]);
        assert_eq!(Snapshot::decode(&bytes), Err(SnapshotError::Version(2)));

        let mut bytes = sample().encode();
        bytes[45] = 7;
        bytes[62] = checksum(&bytes[..62]);
        assert_eq!(Snapshot::decode(&bytes), Err(SnapshotError::Mode(7)));
    }

    #[test]
    fn non_finite_angles_are_rejected() {
        let mut bytes = sample().encode();
        bytes[13..21].copy_from_slice(&f64::NAN.to_le_bytes());
        bytes[62] = checksum(&bytes[..62]);
        assert_eq!(
            Snapshot::decode(&bytes),
            Err(SnapshotError::NonFinite { field: "aov_deg" })
        );

        let mut bytes = sample().encode();
        bytes[21..29].copy_from_slice(&f64::NEG_INFINITY.to_le_bytes());
        bytes[62] = checksum(&bytes[..62]);
        assert_eq!(
            Snapshot::decode(&bytes),
            Err(SnapshotError::NonFinite { field: "eqx_deg" })
        );
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(matches!(
            Snapshot::decode(&[0u8; 10]),
            Err(SnapshotError::Length { found: 10, .. })
        ));
    }
}
