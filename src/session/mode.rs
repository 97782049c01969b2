use serde::Serialize;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum Mode {
    Menu,
    Orbit,
    TrackSatellite,
    Calibrate,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ModeEvent {
    EnterOrbit,
    EnterTracking,
    EnterCalibrate,
    CalibrationDone,
    Back,
    AxisOffline,
    Recover,
}

impl Mode {
    /// The mode `event` leads to, or `None` when it is not accepted here.
    pub fn next(self, event: ModeEvent) -> Option<Mode> {
        use Mode::*;
        use ModeEvent::*;

        match (self, event) {
            (_, AxisOffline) => Some(Offline),
            (Offline, Recover) => Some(Menu),
            (Offline, _) => None,
            (Menu, EnterOrbit) => Some(Orbit),
            (Menu, EnterTracking) => Some(TrackSatellite),
            (Menu, EnterCalibrate) => Some(Calibrate),
            (Calibrate, CalibrationDone) => Some(Menu),
            (_, Back) => Some(Menu),
            _ => None,
        }
    }

    /// Modes in which a propagator drives the axes.
    pub fn is_propagating(self) -> bool {
        matches!(self, Mode::Orbit | Mode::TrackSatellite)
    }
}
