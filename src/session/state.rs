use serde::Serialize;

use crate::kernel::Geodetic;
use crate::propagate::{DriveAngles, OrbitalParameters};

use super::mode::Mode;

/// Which axis a caller means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Axis {
    Aov,
    Eqx,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfflineAxis {
    pub axis: Axis,
    pub motor_id: u8,
    pub consecutive_failures: u32,
}

/// The one owned copy of everything the outside world can observe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub params: OrbitalParameters,
    pub angles: DriveAngles,
    pub position: Option<Geodetic>,
    pub satellite: Option<String>,
    pub mode: Mode,
    pub tracking: bool,
    pub offline: Option<OfflineAxis>,
    pub last_save_unix: Option<i64>,
}

impl SessionState {
    pub fn new(params: OrbitalParameters, angles: DriveAngles) -> Self {
        Self {
            params,
            angles,
            position: None,
            satellite: None,
            mode: Mode::Menu,
            tracking: false,
            offline: None,
            last_save_unix: None,
        }
    }
}
