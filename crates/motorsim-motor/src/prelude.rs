//! Prelude module for convenient imports

pub use crate::controller::MotorController;
pub use crate::error::{MotorError, MotorResult};
pub use crate::state::{Direction, MotorFault, MotorState};
pub use crate::{MAX_SPEED, SPEED_RAMP_RATE};
