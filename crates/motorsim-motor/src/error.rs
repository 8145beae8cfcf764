//! Error types for motor operations.

use thiserror::Error;

use crate::state::MotorFault;

/// Motor operation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MotorError {
    /// The motor is latched in the fault state; start and set-speed
    /// requests are rejected until the fault is cleared.
    #[error("motor fault latched ({0}); clear the fault before commanding the motor")]
    FaultLatched(MotorFault),
}

/// Specialized Result type for motor operations.
pub type MotorResult<T = ()> = Result<T, MotorError>;
