use thiserror::Error;

use crate::actuator::ActuatorError;
use crate::catalog::CatalogError;
use crate::persist::PersistError;
use crate::propagate::{ElementsError, ParameterError};

use super::mode::{Mode, ModeEvent};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{event} not accepted in {from} mode")]
    InvalidTransition { from: Mode, event: ModeEvent },
    #[error("session loop already running")]
    AlreadyRunning,
    #[error("only available in {expected} mode (now {actual})")]
    WrongMode { expected: Mode, actual: Mode },
    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),
    #[error("orbital parameters: {0}")]
    Parameter(#[from] ParameterError),
    #[error("satellite elements: {0}")]
    Elements(#[from] ElementsError),
    #[error("actuator: {0}")]
    Actuator(#[from] ActuatorError),
    #[error("persistence: {0}")]
    Persist(#[from] PersistError),
}
