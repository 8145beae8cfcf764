//! Motor state machine with speed ramping and fault latching.
//!
//! The controller owns the motor's run state and mirrors every transition
//! into the shared register file: the control register carries the host's
//! intent (enable, direction, brake), the status register carries the
//! observable state (running, fault bits), and the speed/position registers
//! track the ramp and the position accumulator.
//!
//! Speed changes are never instantaneous: `update()` advances the current
//! speed toward the target by [`SPEED_RAMP_RATE`] per tick, and position
//! accumulates by `current_speed / 100` per tick, signed by direction.
//!
//! Faults latch. Once a fault bit appears in the status register the state
//! machine stops advancing the ramp and refuses new start/set-speed
//! requests until the host explicitly clears the fault or resets the
//! controller.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod controller;
pub mod error;
pub mod prelude;
pub mod state;

pub use controller::MotorController;
pub use error::{MotorError, MotorResult};
pub use state::{Direction, MotorFault, MotorState};

/// Maximum commandable speed in RPM; higher requests are clamped.
pub const MAX_SPEED: u32 = 10_000;

/// Speed ramp rate in RPM per tick.
pub const SPEED_RAMP_RATE: u32 = 500;
