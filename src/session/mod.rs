mod controller;
mod error;
mod handle;
mod mode;
mod runner;
mod state;

pub use controller::{ResumeReport, SessionController, SessionSettings, TickReport};
pub use error::SessionError;
pub use handle::{SessionHandle, SessionStatus};
pub use mode::{Mode, ModeEvent};
pub use runner::SessionRunner;
pub use state::{Axis, OfflineAxis, SessionState};
