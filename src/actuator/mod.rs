mod actuator;
mod path;
mod retry;
mod simulated;
mod transport;

pub use actuator::{Actuator, ActuatorError, ActuatorSettings, ActuatorState, AxisSpec, Health};
pub use path::shortest_path_target;
pub use retry::RetryPolicy;
pub use simulated::SimulatedTransport;
pub use transport::{Transport, TransportError};
