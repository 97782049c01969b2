use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::actuator::{ActuatorState, Transport};
use crate::kernel::Geodetic;
use crate::persist::{NvStore, Tier};
use crate::propagate::{DriveAngles, OrbitalParameters};

use super::controller::{ResumeReport, SessionController, TickReport};
use super::error::SessionError;
use super::mode::Mode;
use super::state::{Axis, SessionState};

/// Everything a display or remote client needs, copied out in one lock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub aov: ActuatorState,
    pub eqx: ActuatorState,
    pub catching_up: bool,
}

/// Cloneable, thread-safe entry point to a [`SessionController`].
pub struct SessionHandle<T, S> {
    inner: Arc<Mutex<SessionController<T, S>>>,
}

impl<T, S> Clone for SessionHandle<T, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport, S: NvStore> SessionHandle<T, S> {
    pub fn new(controller: SessionController<T, S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(controller)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut SessionController<T, S>) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn status(&self) -> SessionStatus {
        self.with(|c| {
            let (aov, eqx) = c.actuator_states();
            SessionStatus {
                state: c.state().clone(),
                aov,
                eqx,
                catching_up: c.is_catching_up(),
            }
        })
    }

    pub fn mode(&self) -> Mode {
        self.with(|c| c.mode())
    }

    pub fn angles(&self) -> DriveAngles {
        self.with(|c| c.angles())
    }

    pub fn position(&self) -> Option<Geodetic> {
        self.with(|c| c.position())
    }

    pub fn params(&self) -> OrbitalParameters {
        self.with(|c| c.params())
    }

    /// Ticks at the controller clock's current time.
    pub fn tick_now(&self) -> TickReport {
        self.with(|c| {
            let now = c.clock().now_millis();
            c.tick(now)
        })
    }

    pub fn resume(&self) -> ResumeReport {
        self.with(|c| c.resume())
    }

    pub fn enter_orbit(&self) -> Result<(), SessionError> {
        self.with(|c| c.enter_orbit())
    }

    pub fn enter_tracking(&self, satellite: &str) -> Result<(), SessionError> {
        self.with(|c| c.enter_tracking(satellite))
    }

    pub fn enter_calibrate(&self) -> Result<(), SessionError> {
        self.with(|c| c.enter_calibrate())
    }

    pub fn back(&self) -> Result<(), SessionError> {
        self.with(|c| c.back())
    }

    pub fn recover(&self) -> Result<(), SessionError> {
        self.with(|c| c.recover())
    }

    pub fn set_orbital_parameters(
        &self,
        altitude_km: f64,
        inclination_deg: f64,
        eccentricity: f64,
        periapsis_deg: f64,
    ) -> Result<(), SessionError> {
        self.with(|c| {
            c.set_orbital_parameters(altitude_km, inclination_deg, eccentricity, periapsis_deg)
        })
    }

    pub fn install_tle(&self, tle: &str) -> Result<String, SessionError> {
        self.with(|c| c.install_tle(tle))
    }

    pub fn select_satellite(&self, satellite: &str) -> Result<(), SessionError> {
        self.with(|c| c.select_satellite(satellite))
    }

    pub fn start_tracking(&self) -> Result<(), SessionError> {
        self.with(|c| c.start_tracking())
    }

    pub fn stop_tracking(&self) -> Result<(), SessionError> {
        self.with(|c| c.stop_tracking())
    }

    pub fn nudge(&self, axis: Axis, delta_deg: f64) -> Result<(), SessionError> {
        self.with(|c| c.nudge(axis, delta_deg))
    }

    pub fn force_save(&self) -> Result<Tier, SessionError> {
        self.with(|c| c.force_save())
    }
}
