use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::actuator::{shortest_path_target, Actuator, ActuatorError, ActuatorState, Transport};
use crate::catalog::{norad_id_for, parse_tle_lines, CatalogError, SatelliteRecord, TleCache};
use crate::clock::Clock;
use crate::config::Config;
use crate::kernel::{wrap_to_180, Geodetic};
use crate::persist::{
    bounded_elapsed, expected_angles, resolve_absolute_from_modulo, NvStore, PersistManager,
    Snapshot, SnapshotMode, Tier,
};
use crate::propagate::{
    DriveAngles, KeplerPropagator, OrbitalParameters, ParameterError, Propagate, Propagator,
    Sgp4Propagator,
};

use super::error::SessionError;
use super::mode::{Mode, ModeEvent};
use super::state::{Axis, OfflineAxis, SessionState};

// Consecutive targets further apart than this are reported, unless the gap
// looks like a 0/360 wrap.
const JUMP_ALERT_DEG: f64 = 2.0;
const WRAP_LIKE_DEG: f64 = 350.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
    pub command_interval_ms: i64,
    pub tolerance_deg: f64,
    pub catchup_window: Duration,
    pub catchup_velocity_limit: u32,
    pub aov_velocity_limit: u32,
    pub eqx_velocity_limit: u32,
    pub stale_after: Duration,
    pub default_params: OrbitalParameters,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            command_interval_ms: 1_000,
            tolerance_deg: 2.0,
            catchup_window: Duration::from_secs(300),
            catchup_velocity_limit: 10,
            aov_velocity_limit: 2,
            eqx_velocity_limit: 2,
            stale_after: Duration::from_secs(24 * 3_600),
            default_params: OrbitalParameters::default(),
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Result<Self, ParameterError> {
        Ok(Self {
            command_interval_ms: config.session.command_interval.as_millis() as i64,
            tolerance_deg: config.session.tolerance_deg,
            catchup_window: config.persistence.catchup_window,
            catchup_velocity_limit: config.session.catchup_velocity_limit,
            aov_velocity_limit: config.axes.aov.velocity_limit,
            eqx_velocity_limit: config.axes.eqx.velocity_limit,
            stale_after: config.catalog.stale_after,
            default_params: config.session.default_orbit.parameters()?,
        })
    }
}

/// What one call to [`SessionController::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickReport {
    pub propagated: bool,
    pub commanded: bool,
    pub saved: Option<Tier>,
    pub offline: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResumeReport {
    pub tier: Option<Tier>,
    pub elapsed_sec: f64,
    pub mode: Mode,
}

/// Owns the session state, both axes and the persistence chain.
///
/// Nothing else mutates orbital or mode state; outside callers go through
/// [`super::SessionHandle`].
pub struct SessionController<T, S> {
    state: SessionState,
    aov: Actuator<T>,
    eqx: Actuator<T>,
    persist: PersistManager<S>,
    catalog: TleCache,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
    propagator: Option<Propagator>,
    target: Option<DriveAngles>,
    last_propagated_unix: Option<i64>,
    last_command_ms: Option<i64>,
    last_commanded: Option<DriveAngles>,
    last_turns: (i64, i64),
    homing_sent: bool,
}

impl<T: Transport, S: NvStore> SessionController<T, S> {
    pub fn new(
        aov: Actuator<T>,
        eqx: Actuator<T>,
        persist: PersistManager<S>,
        catalog: TleCache,
        clock: Arc<dyn Clock>,
        settings: SessionSettings,
    ) -> Self {
        let angles = DriveAngles::new(aov.present_deg(), eqx.present_deg());
        Self {
            state: SessionState::new(settings.default_params, angles),
            aov,
            eqx,
            persist,
            catalog,
            clock,
            settings,
            propagator: None,
            target: None,
            last_propagated_unix: None,
            last_command_ms: None,
            last_commanded: None,
            last_turns: angles.turns(),
            homing_sent: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn angles(&self) -> DriveAngles {
        self.state.angles
    }

    pub fn position(&self) -> Option<Geodetic> {
        self.state.position
    }

    pub fn params(&self) -> OrbitalParameters {
        self.state.params
    }

    pub fn catalog(&self) -> &TleCache {
        &self.catalog
    }

    pub fn actuator_states(&self) -> (ActuatorState, ActuatorState) {
        (self.aov.state().clone(), self.eqx.state().clone())
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// True while either axis is further than the tolerance from its target.
    pub fn is_catching_up(&self) -> bool {
        if !self.state.mode.is_propagating() || !self.state.tracking {
            return false;
        }
        match self.target {
            Some(target) => {
                self.off_target(Axis::Aov, target.aov_deg) || self.off_target(Axis::Eqx, target.eqx_deg)
            }
            None => false,
        }
    }

    /// Restores the last saved session at boot.
    pub fn resume(&mut self) -> ResumeReport {
        let now = self.clock.now_unix();
        let Some(loaded) = self.persist.load() else {
            info!("No saved state, starting in {}", self.state.mode);
            return ResumeReport {
                tier: None,
                elapsed_sec: 0.0,
                mode: self.state.mode,
            };
        };
        let snapshot = loaded.snapshot;

        self.state.params = snapshot.orbital_parameters().unwrap_or_else(|e| {
            warn!("Saved orbit rejected ({}), using defaults", e);
            self.settings.default_params
        });

        let saved = snapshot.angles();
        let resolved = DriveAngles::new(
            resolve_axis(&self.aov, saved.aov_deg),
            resolve_axis(&self.eqx, saved.eqx_deg),
        );
        let elapsed_sec = bounded_elapsed(now, snapshot.timestamp, self.settings.catchup_window);
        info!(
            "Resuming {:?} from {} (aov {:.2}° -> {:.2}°, eqx {:.2}° -> {:.2}°, {}s elapsed)",
            snapshot.mode, loaded.tier, saved.aov_deg, resolved.aov_deg, saved.eqx_deg, resolved.eqx_deg, elapsed_sec
        );
        self.state.angles = resolved;

        let entered = match &snapshot.mode {
            SnapshotMode::Orbit => {
                let expected = expected_angles(saved, &self.state.params, elapsed_sec);
                self.state.angles = DriveAngles::new(
                    shortest_path_target(resolved.aov_deg, expected.aov_deg),
                    shortest_path_target(resolved.eqx_deg, expected.eqx_deg),
                );
                self.enter_orbit()
            }
            SnapshotMode::Sgp4 => match &snapshot.satellite {
                Some(name) => self.enter_tracking(name),
                None => Err(CatalogError::NotFound("<unnamed>".to_string()).into()),
            },
        };
        if let Err(e) = entered {
            warn!("Could not resume {:?} mode: {}", snapshot.mode, e);
        }

        ResumeReport {
            tier: Some(loaded.tier),
            elapsed_sec,
            mode: self.state.mode,
        }
    }

    /// One pass of the control loop. Cheap when nothing is due.
    pub fn tick(&mut self, now_ms: i64) -> TickReport {
        let mut report = TickReport::default();
        if self.check_health() {
            report.offline = true;
            return report;
        }

        match self.state.mode {
            Mode::Calibrate => self.tick_calibrate(),
            mode if mode.is_propagating() && self.state.tracking => {
                self.tick_propagating(now_ms, &mut report)
            }
            _ => {}
        }
        report
    }

    pub fn enter_orbit(&mut self) -> Result<(), SessionError> {
        self.ensure_accepts(ModeEvent::EnterOrbit)?;
        let now = self.clock.now_unix();
        let propagator = KeplerPropagator::resume(self.state.params, self.state.angles, now);
        self.transition(ModeEvent::EnterOrbit, Some(Propagator::Kepler(propagator)))?;
        Ok(())
    }

    pub fn enter_tracking(&mut self, satellite: &str) -> Result<(), SessionError> {
        self.ensure_accepts(ModeEvent::EnterTracking)?;
        let (name, propagator) = self.satellite_propagator(satellite)?;
        self.state.satellite = Some(name);
        self.transition(
            ModeEvent::EnterTracking,
            Some(Propagator::Sgp4(Box::new(propagator))),
        )?;
        Ok(())
    }

    pub fn enter_calibrate(&mut self) -> Result<(), SessionError> {
        self.transition(ModeEvent::EnterCalibrate, None)?;
        self.homing_sent = false;
        Ok(())
    }

    pub fn back(&mut self) -> Result<(), SessionError> {
        self.transition(ModeEvent::Back, None)?;
        Ok(())
    }

    /// Clears both failure latches and returns to the menu. The logical
    /// angles are re-resolved from fresh reads.
    pub fn recover(&mut self) -> Result<(), SessionError> {
        self.ensure_accepts(ModeEvent::Recover)?;
        self.aov.reset_health()?;
        self.eqx.reset_health()?;

        let angles = self.state.angles;
        self.state.angles = DriveAngles::new(
            resolve_axis(&self.aov, angles.aov_deg),
            resolve_axis(&self.eqx, angles.eqx_deg),
        );
        self.state.offline = None;
        self.transition(ModeEvent::Recover, None)?;
        Ok(())
    }

    /// Applies all four values or none of them.
    pub fn set_orbital_parameters(
        &mut self,
        altitude_km: f64,
        inclination_deg: f64,
        eccentricity: f64,
        periapsis_deg: f64,
    ) -> Result<(), SessionError> {
        let mut params = self.state.params;
        params.set_altitude_km(altitude_km)?;
        params.set_inclination_deg(inclination_deg)?;
        params.set_eccentricity(eccentricity)?;
        params.set_periapsis_deg(periapsis_deg)?;
        self.state.params = params;

        if self.state.mode == Mode::Orbit {
            let here = self.target.unwrap_or(self.state.angles);
            let now = self.clock.now_unix();
            self.propagator = Some(Propagator::Kepler(KeplerPropagator::resume(params, here, now)));
            self.target = None;
            self.last_propagated_unix = None;
        }
        self.save_logged();
        Ok(())
    }

    /// Chooses the satellite to follow. Takes effect at once when already
    /// tracking.
    pub fn select_satellite(&mut self, satellite: &str) -> Result<(), SessionError> {
        let (name, propagator) = self.satellite_propagator(satellite)?;
        self.state.satellite = Some(name);
        if self.state.mode == Mode::TrackSatellite {
            self.propagator = Some(Propagator::Sgp4(Box::new(propagator)));
            self.target = None;
            self.last_propagated_unix = None;
            self.last_commanded = None;
            self.save_logged();
        }
        Ok(())
    }

    /// Parses and caches a TLE, returning the name it is filed under.
    pub fn install_tle(&mut self, tle: &str) -> Result<String, SessionError> {
        let text = parse_tle_lines(tle)?;
        let record = SatelliteRecord::from_tle(&text, None, self.clock.now_unix())?;
        let name = record.name.clone();
        self.catalog.insert(record);
        if let Err(e) = self.catalog.save() {
            warn!("TLE for {} kept in memory only: {}", name, e);
        }
        info!("Installed TLE for {}", name);
        Ok(name)
    }

    pub fn start_tracking(&mut self) -> Result<(), SessionError> {
        if !self.state.mode.is_propagating() || self.propagator.is_none() {
            return Err(SessionError::WrongMode {
                expected: Mode::Orbit,
                actual: self.state.mode,
            });
        }
        self.state.tracking = true;
        Ok(())
    }

    /// Stops commanding and holds both axes where they are.
    pub fn stop_tracking(&mut self) -> Result<(), SessionError> {
        self.state.tracking = false;
        let aov = self.aov.stop();
        let eqx = self.eqx.stop();
        aov?;
        eqx?;
        Ok(())
    }

    pub fn nudge(&mut self, axis: Axis, delta_deg: f64) -> Result<(), SessionError> {
        let Some(Propagator::Kepler(propagator)) = self.propagator.as_mut() else {
            return Err(SessionError::WrongMode {
                expected: Mode::Orbit,
                actual: self.state.mode,
            });
        };
        match axis {
            Axis::Aov => propagator.nudge_aov(delta_deg),
            Axis::Eqx => propagator.nudge_eqx(delta_deg),
        }
        self.last_propagated_unix = None;
        debug!("Nudged {:?} by {:+.2}°", axis, delta_deg);
        Ok(())
    }

    pub fn force_save(&mut self) -> Result<Tier, SessionError> {
        self.save()
    }

    /// Looks a satellite up by catalog name, or by a well-known short name
    /// such as "iss". Returns the catalog name with the propagator.
    fn satellite_propagator(&self, satellite: &str) -> Result<(String, Sgp4Propagator), SessionError> {
        let record = self
            .catalog
            .get(satellite)
            .or_else(|| {
                let norad_id = norad_id_for(satellite)?;
                self.catalog.records().find(|r| r.norad_id == norad_id)
            })
            .ok_or_else(|| CatalogError::NotFound(satellite.to_string()))?;
        let now = self.clock.now_unix();
        if record.is_stale(now, self.settings.stale_after) {
            warn!("TLE for {} is stale ({} old)", record.name, record.age_label(now));
        }
        Ok((record.name.clone(), record.propagator()?))
    }

    fn ensure_accepts(&self, event: ModeEvent) -> Result<(), SessionError> {
        let from = self.state.mode;
        match from.next(event) {
            Some(_) => Ok(()),
            None => Err(SessionError::InvalidTransition { from, event }),
        }
    }

    fn transition(
        &mut self,
        event: ModeEvent,
        propagator: Option<Propagator>,
    ) -> Result<Mode, SessionError> {
        let from = self.state.mode;
        let to = from
            .next(event)
            .ok_or(SessionError::InvalidTransition { from, event })?;
        info!("Mode {} -> {} on {}", from, to, event);

        self.state.mode = to;
        self.state.tracking = propagator.is_some();
        self.propagator = propagator;
        if to != Mode::TrackSatellite {
            self.state.position = None;
        }
        self.target = None;
        self.last_propagated_unix = None;
        self.last_command_ms = None;
        self.last_commanded = None;
        self.last_turns = self.state.angles.turns();

        self.save_logged();
        Ok(to)
    }

    /// Returns true when the session is (now) offline.
    fn check_health(&mut self) -> bool {
        if self.state.mode == Mode::Offline {
            return true;
        }
        let failed = [(Axis::Aov, &self.aov), (Axis::Eqx, &self.eqx)]
            .into_iter()
            .find(|(_, actuator)| actuator.is_offline())
            .map(|(axis, actuator)| OfflineAxis {
                axis,
                motor_id: actuator.state().motor_id,
                consecutive_failures: actuator.state().consecutive_failures,
            });
        let Some(offline) = failed else {
            return false;
        };

        error!(
            "{:?} axis (motor {}) is offline, motion halted until recovery",
            offline.axis, offline.motor_id
        );
        self.state.offline = Some(offline);
        if let Err(e) = self.transition(ModeEvent::AxisOffline, None) {
            error!("Offline transition refused: {}", e);
        }
        true
    }

    fn tick_propagating(&mut self, now_ms: i64, report: &mut TickReport) {
        let now_unix = now_ms.div_euclid(1_000);

        if self.last_propagated_unix != Some(now_unix) {
            let Some(propagator) = &self.propagator else {
                return;
            };
            let sample = propagator.sample(now_unix);
            let angles = if propagator.is_satellite() {
                let reference = self.target.unwrap_or(self.state.angles);
                DriveAngles::new(
                    unwrap_near(reference.aov_deg, sample.angles.aov_deg),
                    unwrap_near(reference.eqx_deg, sample.angles.eqx_deg),
                )
            } else {
                sample.angles
            };
            self.target = Some(angles);
            self.state.position = sample.position;
            self.last_propagated_unix = Some(now_unix);
            report.propagated = true;
        }

        let due = self
            .last_command_ms
            .map_or(true, |last| now_ms - last >= self.settings.command_interval_ms);
        let Some(target) = self.target else {
            return;
        };
        if !due {
            return;
        }

        self.command(target, now_ms);
        report.commanded = true;
        report.saved = self.check_revolutions();
    }

    fn command(&mut self, target: DriveAngles, now_ms: i64) {
        if let Some(last) = self.last_commanded {
            let d_aov = (target.aov_deg - last.aov_deg).abs();
            let d_eqx = (target.eqx_deg - last.eqx_deg).abs();
            let jumped = |d: f64| d > JUMP_ALERT_DEG && d <= WRAP_LIKE_DEG;
            if jumped(d_aov) || jumped(d_eqx) {
                let dt_ms = self.last_command_ms.map_or(0, |t| now_ms - t);
                warn!(
                    "Motion jump (dt={}ms): aov {:.2} -> {:.2} ({:.2}°, turn {}), eqx {:.2} -> {:.2} ({:.2}°, turn {})",
                    dt_ms,
                    last.aov_deg,
                    target.aov_deg,
                    d_aov,
                    target.turns().0,
                    last.eqx_deg,
                    target.eqx_deg,
                    d_eqx,
                    target.turns().1
                );
            }
        }
        self.last_commanded = Some(target);
        self.last_command_ms = Some(now_ms);

        let catching_up = (
            self.off_target(Axis::Aov, target.aov_deg),
            self.off_target(Axis::Eqx, target.eqx_deg),
        );
        let limits = (
            self.speed_for(catching_up.0, self.settings.aov_velocity_limit),
            self.speed_for(catching_up.1, self.settings.eqx_velocity_limit),
        );

        for (actuator, angle, limit) in [
            (&mut self.aov, target.aov_deg, limits.0),
            (&mut self.eqx, target.eqx_deg, limits.1),
        ] {
            if let Err(e) = actuator.set_speed_limit(limit) {
                debug!("Axis {} speed limit: {}", actuator.name(), e);
            }
            if let Err(e) = actuator.set_nearest(angle) {
                debug!("Axis {} command: {}", actuator.name(), e);
            }
            if let Err(e) = actuator.update_present(false) {
                debug!("Axis {} poll: {}", actuator.name(), e);
            }
        }
        self.state.angles = target;
    }

    fn speed_for(&self, catching_up: bool, normal: u32) -> u32 {
        if catching_up {
            self.settings.catchup_velocity_limit
        } else {
            normal
        }
    }

    fn off_target(&self, axis: Axis, target_deg: f64) -> bool {
        let actuator = match axis {
            Axis::Aov => &self.aov,
            Axis::Eqx => &self.eqx,
        };
        wrap_to_180(target_deg - actuator.present_deg()).abs() > self.settings.tolerance_deg
    }

    fn check_revolutions(&mut self) -> Option<Tier> {
        let turns = self.state.angles.turns();
        if turns == self.last_turns {
            return None;
        }
        let gained = turns.0 - self.last_turns.0;
        self.last_turns = turns;
        if gained > 0 {
            self.state.params.add_revolutions(gained as u64);
        }
        match self.save() {
            Ok(tier) => Some(tier),
            Err(e) => {
                error!("Revolution save failed: {}", e);
                None
            }
        }
    }

    fn tick_calibrate(&mut self) {
        if !self.homing_sent {
            for actuator in [&mut self.aov, &mut self.eqx] {
                if let Err(e) = actuator.home(0.0) {
                    warn!("Axis {} homing: {}", actuator.name(), e);
                }
            }
            self.homing_sent = true;
            return;
        }

        let tolerance = self.settings.tolerance_deg;
        let homed = |reading: Result<f64, ActuatorError>| {
            reading.is_ok_and(|deg| wrap_to_180(deg).abs() < tolerance)
        };
        let aov_home = homed(self.aov.update_present(false));
        let eqx_home = homed(self.eqx.update_present(false));
        if !(aov_home && eqx_home) {
            return;
        }

        let angles = self.state.angles;
        self.state.angles = DriveAngles::new(
            shortest_path_target(angles.aov_deg, 0.0),
            shortest_path_target(angles.eqx_deg, 0.0),
        );
        info!("Homing complete");
        if let Err(e) = self.transition(ModeEvent::CalibrationDone, None) {
            warn!("{}", e);
        }
    }

    fn save(&mut self) -> Result<Tier, SessionError> {
        let now = self.clock.now_unix();
        let (mode, satellite) = match self.state.mode {
            Mode::TrackSatellite => (SnapshotMode::Sgp4, self.state.satellite.as_deref()),
            _ => (SnapshotMode::Orbit, None),
        };
        let snapshot = Snapshot::new(now, self.state.angles, &self.state.params, mode, satellite);
        let tier = self.persist.save(&snapshot)?;
        self.state.last_save_unix = Some(now);
        Ok(tier)
    }

    fn save_logged(&mut self) {
        if let Err(e) = self.save() {
            error!("State save failed: {}", e);
        }
    }
}

/// Lifts a wrapped reading onto the unbounded angle nearest `previous`.
fn unwrap_near(previous: f64, wrapped: f64) -> f64 {
    previous + wrap_to_180(wrapped - previous)
}

fn resolve_axis<T: Transport>(actuator: &Actuator<T>, saved_deg: f64) -> f64 {
    if actuator.is_synced() {
        resolve_absolute_from_modulo(saved_deg, actuator.present_deg())
    } else {
        saved_deg
    }
}
