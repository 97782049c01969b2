use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("motor {0} did not answer in time")]
    Timeout(u8),
    #[error("motor {motor_id} reported status error {code:#04x}")]
    Status { motor_id: u8, code: u8 },
}

/// Point-to-point link to the servos. Angles are motor-side degrees in the
/// extended (multi-turn) convention.
///
/// Implementations enforce their own per-call timeout; callers only see the
/// outcome.
pub trait Transport: Send {
    fn write_absolute(&mut self, motor_id: u8, degrees: f64) -> Result<(), TransportError>;

    fn read_absolute(&mut self, motor_id: u8) -> Result<f64, TransportError>;

    fn set_velocity_limit(&mut self, motor_id: u8, limit: u32) -> Result<(), TransportError>;
}
