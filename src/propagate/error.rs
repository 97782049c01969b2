use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParameterError {
    #[error("{field} = {value} outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{0} must be finite")]
    NotFinite(&'static str),
}

#[derive(Debug, Error, PartialEq)]
pub enum ElementsError {
    #[error("mean motion must be positive, got {0} rev/day")]
    MeanMotion(f64),
    #[error("eccentricity {0} outside [0, 1)")]
    Eccentricity(f64),
}
