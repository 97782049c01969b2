use std::collections::BTreeMap;
use std::time::Duration;

use log::debug;

use super::transport::{Transport, TransportError};

#[derive(Debug, Clone, Copy, Default)]
struct SimulatedMotor {
    position_deg: f64,
    velocity_limit: u32,
}

/// In-memory extended-position servos.
///
/// Motors reach commanded positions instantly. A power cycle folds every
/// position back into a single turn, as real multi-turn servos do on reboot.
#[derive(Debug)]
pub struct SimulatedTransport {
    motors: BTreeMap<u8, SimulatedMotor>,
    timeout: Duration,
    latency: Duration,
    fail_next: u32,
    unresponsive: bool,
    reads: u64,
    writes: u64,
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new(Duration::from_millis(150))
    }
}

impl SimulatedTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            motors: BTreeMap::new(),
            timeout,
            latency: Duration::ZERO,
            fail_next: 0,
            unresponsive: false,
            reads: 0,
            writes: 0,
        }
    }

    pub fn with_motor(mut self, motor_id: u8, position_deg: f64) -> Self {
        self.motors.insert(
            motor_id,
            SimulatedMotor {
                position_deg,
                velocity_limit: 0,
            },
        );
        self
    }

    pub fn position(&self, motor_id: u8) -> Option<f64> {
        self.motors.get(&motor_id).map(|m| m.position_deg)
    }

    pub fn velocity_limit(&self, motor_id: u8) -> Option<u32> {
        self.motors.get(&motor_id).map(|m| m.velocity_limit)
    }

    /// Moves a motor without going through the bus, as a hand would.
    pub fn displace(&mut self, motor_id: u8, position_deg: f64) {
        if let Some(motor) = self.motors.get_mut(&motor_id) {
            motor.position_deg = position_deg;
        }
    }

    pub fn power_cycle(&mut self) {
        for motor in self.motors.values_mut() {
            motor.position_deg = motor.position_deg.rem_euclid(360.0);
        }
        debug!("Simulated servos power cycled");
    }

    /// The next `count` calls time out, whatever they are.
    pub fn fail_next(&mut self, count: u32) {
        self.fail_next = count;
    }

    pub fn set_unresponsive(&mut self, unresponsive: bool) {
        self.unresponsive = unresponsive;
    }

    /// Replies slower than the timeout are reported as timeouts.
    pub fn set_latency(&mut self, latency: Duration) {
        self.latency = latency;
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }

    fn motor(&mut self, motor_id: u8) -> Result<&mut SimulatedMotor, TransportError> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(TransportError::Timeout(motor_id));
        }
        if self.unresponsive || self.latency > self.timeout {
            return Err(TransportError::Timeout(motor_id));
        }
        self.motors
            .get_mut(&motor_id)
            .ok_or(TransportError::Timeout(motor_id))
    }
}

impl Transport for SimulatedTransport {
    fn write_absolute(&mut self, motor_id: u8, degrees: f64) -> Result<(), TransportError> {
        self.writes += 1;
        self.motor(motor_id)?.position_deg = degrees;
        Ok(())
    }

    fn read_absolute(&mut self, motor_id: u8) -> Result<f64, TransportError> {
        self.reads += 1;
        Ok(self.motor(motor_id)?.position_deg)
    }

    fn set_velocity_limit(&mut self, motor_id: u8, limit: u32) -> Result<(), TransportError> {
        self.writes += 1;
        self.motor(motor_id)?.velocity_limit = limit;
        Ok(())
    }
}
