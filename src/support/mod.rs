pub mod errors;
pub mod ocpp_frame;
pub mod time;

pub use errors::{SimResult, SimulatorError};
pub use ocpp_frame::{OcppFrame, OcppFrameError};
