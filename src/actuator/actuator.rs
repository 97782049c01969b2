use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;

use crate::bus::SharedBus;

use super::path::shortest_path_target;
use super::retry::RetryPolicy;
use super::transport::{Transport, TransportError};

#[derive(Debug, Error, PartialEq)]
pub enum ActuatorError {
    #[error("axis {axis}: {source}")]
    Transport {
        axis: &'static str,
        #[source]
        source: TransportError,
    },
    #[error("axis {0} has no known position")]
    NotSynced(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum Health {
    Online,
    Degraded,
    Offline,
}

/// Static description of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub motor_id: u8,
    /// Output turns per motor turn is `1 / gear_ratio`.
    #[serde(default = "default_gear_ratio")]
    pub gear_ratio: f64,
    #[serde(default = "default_velocity_limit")]
    pub velocity_limit: u32,
}

fn default_gear_ratio() -> f64 {
    1.0
}

fn default_velocity_limit() -> u32 {
    2
}

/// Timing and health thresholds shared by every axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorSettings {
    pub retry: RetryPolicy,
    pub poll_window: Duration,
    pub offline_threshold: u32,
}

impl Default for ActuatorSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            poll_window: Duration::from_millis(500),
            offline_threshold: 5,
        }
    }
}

/// Everything known about one axis. Angles are output-side degrees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActuatorState {
    pub motor_id: u8,
    pub gear_ratio: f64,
    pub present_absolute_degrees: f64,
    pub target_absolute_degrees: f64,
    pub velocity_limit: u32,
    pub consecutive_failures: u32,
    pub health: Health,
    pub synced: bool,
}

/// One logical axis on a shared servo bus.
///
/// Every transport call goes through the retry policy; the failure counter
/// is only touched once per call, after retries are resolved.
pub struct Actuator<T> {
    name: &'static str,
    bus: SharedBus<T>,
    settings: ActuatorSettings,
    state: ActuatorState,
    last_poll: Option<Instant>,
}

impl<T: Transport> Actuator<T> {
    /// Reads the present position to seed the state. A failed read leaves the
    /// axis offline and unsynced until [`Actuator::reset_health`] succeeds.
    pub fn connect(
        name: &'static str,
        bus: SharedBus<T>,
        spec: AxisSpec,
        settings: ActuatorSettings,
    ) -> Self {
        let mut actuator = Self {
            name,
            bus,
            settings,
            state: ActuatorState {
                motor_id: spec.motor_id,
                gear_ratio: spec.gear_ratio,
                present_absolute_degrees: 0.0,
                target_absolute_degrees: 0.0,
                velocity_limit: 0,
                consecutive_failures: 0,
                health: Health::Online,
                synced: false,
            },
            last_poll: None,
        };

        match actuator.read_fresh() {
            Ok(present) => {
                actuator.state.target_absolute_degrees = present;
                actuator.state.synced = true;
                info!(
                    "Axis {} (motor {}) at {:.2}°, gear ratio {:.3}:1",
                    name, spec.motor_id, present, spec.gear_ratio
                );
            }
            Err(e) => {
                actuator.state.health = Health::Offline;
                warn!("Axis {} failed its boot read, holding offline: {}", name, e);
            }
        }

        if actuator.state.synced {
            if let Err(e) = actuator.set_speed_limit(spec.velocity_limit) {
                warn!("Axis {} speed limit not applied: {}", name, e);
            }
        }
        actuator
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> &ActuatorState {
        &self.state
    }

    pub fn health(&self) -> Health {
        self.state.health
    }

    pub fn is_offline(&self) -> bool {
        self.state.health == Health::Offline
    }

    pub fn is_synced(&self) -> bool {
        self.state.synced
    }

    /// Last known output angle, without touching the bus.
    pub fn present_deg(&self) -> f64 {
        self.state.present_absolute_degrees
    }

    pub fn target_deg(&self) -> f64 {
        self.state.target_absolute_degrees
    }

    /// Forces a fresh read, then moves to `target_deg` the short way.
    pub fn home(&mut self, target_deg: f64) -> Result<f64, ActuatorError> {
        self.update_present(true)?;
        self.set_nearest(target_deg)
    }

    /// Moves to `target_deg` (taken modulo 360) by at most half a turn.
    /// Returns the absolute angle commanded.
    pub fn set_nearest(&mut self, target_deg: f64) -> Result<f64, ActuatorError> {
        self.ensure_synced()?;
        let next = shortest_path_target(self.state.present_absolute_degrees, target_deg);
        self.command(next)?;
        Ok(next)
    }

    /// Returns whether a write was issued.
    pub fn set_speed_limit(&mut self, limit: u32) -> Result<bool, ActuatorError> {
        if self.state.velocity_limit == limit {
            return Ok(false);
        }
        let motor_id = self.state.motor_id;
        self.call(|dev| dev.set_velocity_limit(motor_id, limit))?;
        self.state.velocity_limit = limit;
        debug!("Axis {} speed limit {}", self.name, limit);
        Ok(true)
    }

    /// Holds the true present position.
    pub fn stop(&mut self) -> Result<f64, ActuatorError> {
        self.ensure_synced()?;
        let here = self.read_fresh()?;
        self.command(here)?;
        Ok(here)
    }

    /// Present output angle, polling the hardware at most once per poll
    /// window unless `force` is set.
    pub fn update_present(&mut self, force: bool) -> Result<f64, ActuatorError> {
        let fresh_enough = self
            .last_poll
            .is_some_and(|at| at.elapsed() < self.settings.poll_window);
        if !force && fresh_enough {
            return Ok(self.state.present_absolute_degrees);
        }
        self.read_fresh()
    }

    /// Clears the failure latch and re-reads the position.
    pub fn reset_health(&mut self) -> Result<f64, ActuatorError> {
        self.state.consecutive_failures = 0;
        self.state.health = Health::Online;
        let present = self.read_fresh()?;
        if !self.state.synced {
            self.state.target_absolute_degrees = present;
            self.state.synced = true;
        }
        info!("Axis {} recovered at {:.2}°", self.name, present);
        Ok(present)
    }

    fn ensure_synced(&self) -> Result<(), ActuatorError> {
        if self.state.synced {
            Ok(())
        } else {
            Err(ActuatorError::NotSynced(self.name))
        }
    }

    fn read_fresh(&mut self) -> Result<f64, ActuatorError> {
        let motor_id = self.state.motor_id;
        let motor_deg = self.call(|dev| dev.read_absolute(motor_id))?;
        let output = motor_deg / self.state.gear_ratio;
        self.state.present_absolute_degrees = output;
        self.last_poll = Some(Instant::now());
        Ok(output)
    }

    fn command(&mut self, output_deg: f64) -> Result<(), ActuatorError> {
        let motor_id = self.state.motor_id;
        let motor_deg = output_deg * self.state.gear_ratio;
        self.call(|dev| dev.write_absolute(motor_id, motor_deg))?;
        self.state.target_absolute_degrees = output_deg;
        // The servo is assumed to follow; the next real poll corrects this.
        self.state.present_absolute_degrees = output_deg;
        Ok(())
    }

    fn call<R>(
        &mut self,
        mut op: impl FnMut(&mut T) -> Result<R, TransportError>,
    ) -> Result<R, ActuatorError> {
        let bus = &self.bus;
        let result = self
            .settings
            .retry
            .run(|_| bus.transaction(|dev| op(dev)));
        self.record(result.is_ok());
        result.map_err(|source| ActuatorError::Transport {
            axis: self.name,
            source,
        })
    }

    fn record(&mut self, ok: bool) {
        let state = &mut self.state;
        if ok {
            if state.consecutive_failures > 0 {
                info!(
                    "Axis {} communication restored after {} failed call(s)",
                    self.name, state.consecutive_failures
                );
                state.consecutive_failures = 0;
            }
            // Offline is latched; only reset_health clears it.
            if state.health == Health::Degraded {
                state.health = Health::Online;
            }
            return;
        }

        state.consecutive_failures = state.consecutive_failures.saturating_add(1);
        if state.consecutive_failures >= self.settings.offline_threshold {
            if state.health != Health::Offline {
                warn!(
                    "Axis {} offline after {} consecutive failures",
                    self.name, state.consecutive_failures
                );
            }
            state.health = Health::Offline;
        } else if state.health == Health::Online {
            warn!("Axis {} degraded", self.name);
            state.health = Health::Degraded;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::SimulatedTransport;

    fn fast_settings() -> ActuatorSettings {
        ActuatorSettings {
            retry: RetryPolicy {
                attempts: 3,
                base_delay: Duration::ZERO,
            },
            ..ActuatorSettings::default()
        }
    }

    fn axis(position: f64, gear_ratio: f64) -> (Actuator<SimulatedTransport>, SharedBus<SimulatedTransport>) {
        let bus = SharedBus::new(SimulatedTransport::default().with_motor(1, position));
        let spec = AxisSpec {
            motor_id: 1,
            gear_ratio,
            velocity_limit: 4,
        };
        (Actuator::connect("aov", bus.clone(), spec, fast_settings()), bus)
    }

    #[test]
    fn boot_read_seeds_state() {
        let (act, bus) = axis(1090.0, 1.0);
        assert!(act.is_synced());
        assert_eq!(act.present_deg(), 1090.0);
        assert_eq!(act.target_deg(), 1090.0);
        assert_eq!(bus.transaction(|d| d.velocity_limit(1)), Some(4));
    }

    #[test]
    fn failed_boot_read_refuses_motion_until_recovered() {
        let bus = SharedBus::new(SimulatedTransport::default().with_motor(1, 42.0));
        bus.transaction(|d| d.set_unresponsive(true));
        let spec = AxisSpec {
            motor_id: 1,
            gear_ratio: 1.0,
            velocity_limit: 4,
        };
        let mut act = Actuator::connect("eqx", bus.clone(), spec, fast_settings());
        assert!(!act.is_synced());
        assert!(act.is_offline());
        assert_eq!(act.set_nearest(10.0), Err(ActuatorError::NotSynced("eqx")));

        bus.transaction(|d| d.set_unresponsive(false));
        assert_eq!(act.reset_health().unwrap(), 42.0);
        assert!(act.is_synced());
        assert_eq!(act.health(), Health::Online);
        assert!((act.set_nearest(10.0).unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn set_nearest_keeps_turn_count() {
        let (mut act, bus) = axis(718.0, 1.0);
        let commanded = act.set_nearest(5.0).unwrap();
        assert!((commanded - 725.0).abs() < 1e-9);
        assert_eq!(bus.transaction(|d| d.position(1)), Some(725.0));
    }

    #[test]
    fn gear_ratio_scales_motor_side() {
        let (mut act, bus) = axis(0.0, 120.0 / 11.0);
        act.set_nearest(90.0).unwrap();
        let motor = bus.transaction(|d| d.position(1)).unwrap();
        assert!((motor - 90.0 * 120.0 / 11.0).abs() < 1e-9);
        assert!((act.update_present(true).unwrap() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn speed_limit_skips_redundant_writes() {
        let (mut act, bus) = axis(0.0, 1.0);
        let writes = bus.transaction(|d| d.writes());
        assert!(!act.set_speed_limit(4).unwrap());
        assert_eq!(bus.transaction(|d| d.writes()), writes);
        assert!(act.set_speed_limit(10).unwrap());
        assert_eq!(bus.transaction(|d| d.writes()), writes + 1);
    }

    #[test]
    fn present_polls_are_throttled() {
        let (mut act, bus) = axis(15.0, 1.0);
        let reads = bus.transaction(|d| d.reads());
        bus.transaction(|d| d.displace(1, 20.0));
        assert_eq!(act.update_present(false).unwrap(), 15.0);
        assert_eq!(bus.transaction(|d| d.reads()), reads);
        assert_eq!(act.update_present(true).unwrap(), 20.0);
        assert_eq!(bus.transaction(|d| d.reads()), reads + 1);
    }

    #[test]
    fn stop_holds_true_position() {
        let (mut act, bus) = axis(100.0, 1.0);
        act.set_nearest(150.0).unwrap();
        bus.transaction(|d| d.displace(1, 131.0));
        assert_eq!(act.stop().unwrap(), 131.0);
        assert_eq!(act.target_deg(), 131.0);
        assert_eq!(bus.transaction(|d| d.position(1)), Some(131.0));
    }

    #[test]
    fn transient_failure_is_absorbed_by_retries() {
        let (mut act, bus) = axis(0.0, 1.0);
        bus.transaction(|d| d.fail_next(2));
        assert!(act.set_nearest(30.0).is_ok());
        assert_eq!(act.state().consecutive_failures, 0);
        assert_eq!(act.health(), Health::Online);
    }

    #[test]
    fn five_exhausted_calls_latch_offline() {
        let (mut act, bus) = axis(0.0, 1.0);
        bus.transaction(|d| d.set_unresponsive(true));

        for expected in 1..=4 {
            assert!(act.set_nearest(10.0).is_err());
            assert_eq!(act.state().consecutive_failures, expected);
            assert_eq!(act.health(), Health::Degraded);
        }
        assert!(act.set_nearest(10.0).is_err());
        assert_eq!(act.health(), Health::Offline);

        bus.transaction(|d| d.set_unresponsive(false));
        assert!(act.set_nearest(10.0).is_ok());
        assert_eq!(act.state().consecutive_failures, 0);
        assert_eq!(act.health(), Health::Offline);

        act.reset_health().unwrap();
        assert_eq!(act.health(), Health::Online);
    }

    #[test]
    fn degraded_recovers_on_success() {
        let (mut act, bus) = axis(0.0, 1.0);
        bus.transaction(|d| d.fail_next(3));
        assert!(act.set_nearest(10.0).is_err());
        assert_eq!(act.health(), Health::Degraded);
        assert!(act.set_nearest(10.0).is_ok());
        assert_eq!(act.health(), Health::Online);
    }
}
